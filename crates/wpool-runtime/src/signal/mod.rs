//! Per-thread OS signal delivery for `WorkerPool::signal`/`signal_all`.
//!
//! Delivering a signal to one specific OS thread (not the process) needs
//! host support; where the platform doesn't have it, `send_signal` simply
//! returns `NotSupported`.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::{install_cancel_handler, send_signal, CANCEL_SIGNAL};
    } else {
        mod other;
        pub use other::{install_cancel_handler, send_signal};
    }
}
