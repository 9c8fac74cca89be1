//! Pool construction attributes

use crate::error::{PoolResult, WPoolError};
use crate::status::{CancelType, CreatePolicy};
use std::time::Duration;

/// Maximum number of worker threads a single pool may have
pub const MAX_THREADS: u32 = 64;

/// Attributes governing a pool's construction and default runtime policy
///
/// Attributes are immutable once passed to `WorkerPool::create` — mutating
/// the value afterwards (it's just a plain struct, so nothing stops you)
/// has no effect on an already-constructed pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    pub(crate) cancel_type: CancelType,
    pub(crate) timed_wait: bool,
    pub(crate) timeout: Duration,
    pub(crate) block_on_add: bool,
    pub(crate) block_on_err: bool,
    pub(crate) thread_count: u32,
    pub(crate) queue_capacity: Option<u32>,
    pub(crate) create_policy: CreatePolicy,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            cancel_type: CancelType::Deferred,
            timed_wait: false,
            timeout: Duration::from_secs(10),
            block_on_add: false,
            block_on_err: true,
            thread_count: 4,
            queue_capacity: Some(16),
            create_policy: CreatePolicy::Lazy,
        }
    }
}

impl Attributes {
    /// Start from the documented defaults (4 threads, queue of 16, 10s
    /// default wait, deferred cancellation, lazy spawn, block-on-err on).
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancellation mode applied by `destroy(Forceful)`
    pub fn cancel_type(mut self, cancel_type: CancelType) -> Self {
        self.cancel_type = cancel_type;
        self
    }

    /// Whether blocking pool APIs (`add_work`, `wait`) fall back to the
    /// configured `timeout` instead of blocking indefinitely
    pub fn timed_wait(mut self, enabled: bool) -> Self {
        self.timed_wait = enabled;
        self
    }

    /// Default wait duration, independent of whether `timed_wait` is
    /// enabled — setting one does not reset the other
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether `add_work` blocks (rather than returning `QueueFull`) when
    /// the queue is at capacity
    pub fn block_on_add(mut self, enabled: bool) -> Self {
        self.block_on_add = enabled;
        self
    }

    /// Whether a routine returning non-zero latches its worker into
    /// `Status::Blocked` until `restart_thread` is called
    pub fn block_on_err(mut self, enabled: bool) -> Self {
        self.block_on_err = enabled;
        self
    }

    /// Number of worker threads, clamped to `[1, MAX_THREADS]` by `validate`
    pub fn thread_count(mut self, count: u32) -> Self {
        self.thread_count = count;
        self
    }

    /// Bounded queue capacity (must be `>= 1`)
    pub fn queue_size(mut self, capacity: u32) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Disable the queue's capacity check entirely (the FIFO's `UNLIMITED`
    /// sentinel). `is_full`/`wait_for_is_full` become unsupported.
    pub fn unlimited_queue(mut self) -> Self {
        self.queue_capacity = None;
        self
    }

    /// Worker-spawn policy: `Strict` (all up front) or `Lazy` (on demand)
    pub fn create_policy(mut self, policy: CreatePolicy) -> Self {
        self.create_policy = policy;
        self
    }

    pub fn get_cancel_type(&self) -> CancelType {
        self.cancel_type
    }

    pub fn get_timed_wait(&self) -> bool {
        self.timed_wait
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    pub fn get_block_on_add(&self) -> bool {
        self.block_on_add
    }

    pub fn get_block_on_err(&self) -> bool {
        self.block_on_err
    }

    pub fn get_thread_count(&self) -> u32 {
        self.thread_count
    }

    /// `None` means the queue is UNLIMITED
    pub fn get_queue_capacity(&self) -> Option<u32> {
        self.queue_capacity
    }

    pub fn get_create_policy(&self) -> CreatePolicy {
        self.create_policy
    }

    /// Validate the attribute set before it's handed to `WorkerPool::create`
    pub fn validate(&self) -> PoolResult<()> {
        if self.thread_count == 0 || self.thread_count > MAX_THREADS {
            return Err(WPoolError::InvalidArgument);
        }
        if let Some(cap) = self.queue_capacity {
            if cap == 0 {
                return Err(WPoolError::InvalidArgument);
            }
        }
        if self.timeout.is_zero() {
            return Err(WPoolError::InvalidArgument);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let attr = Attributes::default();
        assert_eq!(attr.get_thread_count(), 4);
        assert_eq!(attr.get_queue_capacity(), Some(16));
        assert_eq!(attr.get_timeout(), Duration::from_secs(10));
        assert_eq!(attr.get_cancel_type(), CancelType::Deferred);
        assert!(!attr.get_timed_wait());
        assert!(!attr.get_block_on_add());
        assert!(attr.get_block_on_err());
        assert_eq!(attr.get_create_policy(), CreatePolicy::Lazy);
    }

    #[test]
    fn test_builder_chaining() {
        let attr = Attributes::new()
            .thread_count(8)
            .queue_size(32)
            .block_on_add(true)
            .create_policy(CreatePolicy::Strict);
        assert_eq!(attr.get_thread_count(), 8);
        assert_eq!(attr.get_queue_capacity(), Some(32));
        assert!(attr.get_block_on_add());
        assert_eq!(attr.get_create_policy(), CreatePolicy::Strict);
    }

    #[test]
    fn test_validate_rejects_bad_thread_count() {
        assert!(Attributes::new().thread_count(0).validate().is_err());
        assert!(Attributes::new().thread_count(MAX_THREADS + 1).validate().is_err());
        assert!(Attributes::new().thread_count(MAX_THREADS).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_queue_size() {
        assert!(Attributes::new().queue_size(0).validate().is_err());
    }

    #[test]
    fn test_unlimited_queue() {
        let attr = Attributes::new().unlimited_queue();
        assert_eq!(attr.get_queue_capacity(), None);
        assert!(attr.validate().is_ok());
    }
}
