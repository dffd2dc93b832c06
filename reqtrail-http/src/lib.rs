pub mod capture;
pub mod error;
pub mod feature;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use capture::{CaptureState, RequestItems, capture_requests};
pub use error::ApiError;
pub use feature::RequestLogsFeature;
pub use server::{AdminState, build_admin_router};
