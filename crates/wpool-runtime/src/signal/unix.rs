//! Unix signal delivery via the worker thread's raw `pthread_t`, through
//! `nix::sys::pthread::pthread_kill`.

use std::sync::Once;

use wpool_core::{PoolResult, WPoolError};

/// Signal `destroy(Forceful)`'s `CancelType::Async` path delivers to
/// running workers. `SIGURG`'s default disposition is already `Ignore` on
/// Unix (the same reason the teacher workspace reaches for it to preempt
/// CPU-bound threads) rather than `Term` — unlike `SIGUSR1`, sending it to
/// a thread that hasn't installed a handler does not kill the process.
pub const CANCEL_SIGNAL: i32 = libc::SIGURG;

static HANDLER_INSTALLED: Once = Once::new();

extern "C" fn noop_handler(_: libc::c_int) {}

/// Install a no-op handler for [`CANCEL_SIGNAL`], idempotently. `SIGURG`
/// already defaults to `Ignore`, but installing an explicit handler makes
/// that independent of the platform default and of whatever else in the
/// process touches signal disposition. Called once from `WorkerPool::create`.
pub fn install_cancel_handler() {
    HANDLER_INSTALLED.call_once(|| {
        let handler = nix::sys::signal::SigHandler::Handler(noop_handler);
        let action = nix::sys::signal::SigAction::new(
            handler,
            nix::sys::signal::SaFlags::empty(),
            nix::sys::signal::SigSet::empty(),
        );
        // SAFETY: `noop_handler` is async-signal-safe (it does nothing)
        // and `Signal::SIGURG` is a valid, representable signal.
        unsafe {
            let _ = nix::sys::signal::sigaction(nix::sys::signal::Signal::SIGURG, &action);
        }
    });
}

pub fn send_signal(raw_pthread: usize, sig: i32) -> PoolResult<()> {
    let thread = raw_pthread as libc::pthread_t;
    let signal = nix::sys::signal::Signal::try_from(sig).map_err(|_| WPoolError::InvalidArgument)?;
    nix::sys::pthread::pthread_kill(thread, signal).map_err(|_| WPoolError::NotSupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_signal_number_is_invalid_argument() {
        // 0 is not representable as a `nix::sys::signal::Signal`.
        assert_eq!(send_signal(0, 0), Err(WPoolError::InvalidArgument));
    }
}
