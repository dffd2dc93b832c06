pub mod config;
pub mod context;
pub mod entry;
pub mod error;
pub mod event;
pub mod policy;

pub use config::TrailConfig;
pub use context::{ErrorStatus, Failure, Fault, RequestContext, RequestPayload, ResponsePayload, Session};
pub use entry::{ErrorSummary, LogEntry};
pub use error::TrailError;
pub use event::{EventProperty, MessageTemplate, PropertyValue, StructuredEvent};
pub use policy::{Inclusion, Policy};
