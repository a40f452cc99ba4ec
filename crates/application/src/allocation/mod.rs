mod service;
pub mod validator;

pub use service::{AllocationService, AllocationSettings};
pub use validator::ValidationOutcome;
