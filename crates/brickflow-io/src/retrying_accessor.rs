//! A [`VolumeAccessor`] wrapper that adds retry and resource-budget
//! gating around an inner accessor, so callers can compose any concrete
//! service implementation with the same resilience policy.

use crate::resource_manager::ResourceManagerClient;
use crate::retry::{with_retry, RetryPolicy};
use brickflow_core::{Box3, Dtype, Result, VolumeAccessor, VoxelBuffer};
use std::sync::Arc;

/// Wraps an inner [`VolumeAccessor`] with a [`RetryPolicy`] and a byte
/// budget from a [`ResourceManagerClient`].
pub struct RetryingAccessor {
    inner: Arc<dyn VolumeAccessor>,
    policy: RetryPolicy,
    resource_manager: Arc<ResourceManagerClient>,
}

impl RetryingAccessor {
    #[must_use]
    pub fn new(
        inner: Arc<dyn VolumeAccessor>,
        policy: RetryPolicy,
        resource_manager: Arc<ResourceManagerClient>,
    ) -> Self {
        Self {
            inner,
            policy,
            resource_manager,
        }
    }
}

impl VolumeAccessor for RetryingAccessor {
    fn fetch(&self, b: Box3) -> Result<VoxelBuffer> {
        let req_bytes = b.volume() * self.inner.dtype().size_of() as u64;
        with_retry(&self.policy, || {
            self.resource_manager
                .access(req_bytes, || self.inner.fetch(b))
        })
    }

    fn dtype(&self) -> Dtype {
        self.inner.dtype()
    }
}
