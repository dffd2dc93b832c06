pub mod builder;
pub mod emitter;
pub mod evaluator;
pub mod request_logger;
pub mod sink;

pub use request_logger::RequestLogger;
pub use sink::{ChannelSink, EventSink, MemorySink, SinkError, TracingSink};
