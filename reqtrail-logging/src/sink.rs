//! External sinks for structured events.
//!
//! A sink write is best-effort. The request logger logs a failed write and
//! moves on; it never retries.

use crossbeam_channel::{Sender, TrySendError, bounded};
use reqtrail_core::event::StructuredEvent;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{Level, debug, error, info, trace, warn};

/// Target used for events written through [`TracingSink`].
pub const EVENT_TARGET: &str = "reqtrail::request";

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("sink queue full")]
    Full,

    #[error("sink closed")]
    Closed,

    #[error("sink write failed: {0}")]
    Write(String),
}

/// Receives one event per logged request.
pub trait EventSink: Send + Sync {
    fn write(&self, event: StructuredEvent) -> Result<(), SinkError>;
}

/// Writes events through `tracing`, rendered message plus JSON properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn write(&self, event: StructuredEvent) -> Result<(), SinkError> {
        let message = event.render();
        let properties = event.properties_json();
        let template = event.template.text();
        let level = event.level;
        if level == Level::ERROR {
            error!(target: EVENT_TARGET, %properties, template, "{message}");
        } else if level == Level::WARN {
            warn!(target: EVENT_TARGET, %properties, template, "{message}");
        } else if level == Level::INFO {
            info!(target: EVENT_TARGET, %properties, template, "{message}");
        } else if level == Level::DEBUG {
            debug!(target: EVENT_TARGET, %properties, template, "{message}");
        } else {
            trace!(target: EVENT_TARGET, %properties, template, "{message}");
        }
        Ok(())
    }
}

/// Detached sink: hands events to a dedicated thread through a bounded queue.
///
/// `write` never blocks. When the queue is full the event is rejected with
/// [`SinkError::Full`]. Dropping the sink drains what is queued and joins the
/// thread.
pub struct ChannelSink {
    sender: Option<Sender<StructuredEvent>>,
    worker: Option<JoinHandle<()>>,
}

impl ChannelSink {
    pub fn new(inner: Arc<dyn EventSink>, capacity: usize) -> std::io::Result<Self> {
        let (tx, rx) = bounded::<StructuredEvent>(capacity.max(1));
        let worker = std::thread::Builder::new()
            .name("reqtrail-sink".to_string())
            .spawn(move || {
                for event in rx {
                    if let Err(e) = inner.write(event) {
                        warn!(error = %e, "Detached sink write failed");
                    }
                }
                debug!("Detached sink drained");
            })?;

        Ok(Self {
            sender: Some(tx),
            worker: Some(worker),
        })
    }
}

impl EventSink for ChannelSink {
    fn write(&self, event: StructuredEvent) -> Result<(), SinkError> {
        let Some(sender) = &self.sender else {
            return Err(SinkError::Closed);
        };
        sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Full,
            TrySendError::Disconnected(_) => SinkError::Closed,
        })
    }
}

impl Drop for ChannelSink {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop once the queue is empty.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Detached sink worker panicked");
            }
        }
    }
}

/// Keeps events in memory. Used by embedders that inspect events directly.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<StructuredEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StructuredEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn write(&self, event: StructuredEvent) -> Result<(), SinkError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}
