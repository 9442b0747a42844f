//! Resilience layer around external volume accessors: nested retry and
//! byte-budget gating.

pub mod resource_manager;
pub mod retry;
pub mod retrying_accessor;

pub use resource_manager::ResourceManagerClient;
pub use retry::{with_retry, RetryPolicy};
pub use retrying_accessor::RetryingAccessor;
