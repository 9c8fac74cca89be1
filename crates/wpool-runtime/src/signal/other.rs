//! Non-Unix fallback: per-thread signal delivery is unavailable.

use wpool_core::{PoolResult, WPoolError};

/// No-op: there is no per-thread signal delivery to guard against here.
pub fn install_cancel_handler() {}

pub fn send_signal(_raw_pthread: usize, _sig: i32) -> PoolResult<()> {
    Err(WPoolError::NotSupported)
}
