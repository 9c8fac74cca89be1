//! `PoolBuilder`: a thin, validating wrapper over `Attributes` +
//! `WorkerPool::create`, modeled on the runtime's own `SchedulerConfig`
//! style of builder (construct a plain config value, validate once, hand
//! it to the engine).

use std::time::Duration;

use wpool_core::{Attributes, CancelType, CreatePolicy, PoolResult};
use wpool_runtime::WorkerPool;

/// Builds a [`WorkerPool`] from an [`Attributes`] value, validating once
/// at `build()` rather than on every setter call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolBuilder {
    attrs: Attributes,
}

impl PoolBuilder {
    /// Start from the documented defaults.
    pub fn new() -> Self {
        Self {
            attrs: Attributes::default(),
        }
    }

    pub fn thread_count(mut self, count: u32) -> Self {
        self.attrs = self.attrs.thread_count(count);
        self
    }

    pub fn queue_size(mut self, capacity: u32) -> Self {
        self.attrs = self.attrs.queue_size(capacity);
        self
    }

    pub fn unlimited_queue(mut self) -> Self {
        self.attrs = self.attrs.unlimited_queue();
        self
    }

    pub fn timed_wait(mut self, enabled: bool) -> Self {
        self.attrs = self.attrs.timed_wait(enabled);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.attrs = self.attrs.timeout(timeout);
        self
    }

    pub fn block_on_add(mut self, enabled: bool) -> Self {
        self.attrs = self.attrs.block_on_add(enabled);
        self
    }

    pub fn block_on_err(mut self, enabled: bool) -> Self {
        self.attrs = self.attrs.block_on_err(enabled);
        self
    }

    pub fn cancel_type(mut self, cancel_type: CancelType) -> Self {
        self.attrs = self.attrs.cancel_type(cancel_type);
        self
    }

    pub fn create_policy(mut self, policy: CreatePolicy) -> Self {
        self.attrs = self.attrs.create_policy(policy);
        self
    }

    /// Start from a fully assembled `Attributes` value instead of the
    /// individual setters above.
    pub fn from_attributes(attrs: Attributes) -> Self {
        Self { attrs }
    }

    /// Validate the accumulated attributes and spawn the pool.
    pub fn build(self) -> PoolResult<WorkerPool> {
        WorkerPool::create(self.attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpool_core::WPoolError;

    #[test]
    fn test_default_builder_matches_attribute_defaults() {
        let pool = PoolBuilder::new().build().unwrap();
        pool.destroy(wpool_core::ShutdownMode::Graceful).unwrap();
    }

    #[test]
    fn test_rejects_zero_thread_count() {
        let err = PoolBuilder::new().thread_count(0).build();
        assert_eq!(err.unwrap_err(), WPoolError::InvalidArgument);
    }

    #[test]
    fn test_chained_setters_apply() {
        let pool = PoolBuilder::new()
            .thread_count(2)
            .queue_size(4)
            .block_on_add(true)
            .create_policy(CreatePolicy::Strict)
            .build()
            .unwrap();
        assert_eq!(pool.thread_status_all().len(), 2);
        pool.destroy(wpool_core::ShutdownMode::Graceful).unwrap();
    }
}
