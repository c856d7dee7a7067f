//! Stop requests delivered by SIGINT and polled between epochs.

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared stop request. Cloning shares the underlying flag.
#[derive(Clone, Debug, Default)]
pub struct StopFlag {
    flag: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

static SIGNAL_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Route SIGINT to `stop`. Only the first installed flag receives signals.
#[cfg(not(target_os = "windows"))]
pub fn install_sigint_handler(stop: &StopFlag) -> bool {
    if SIGNAL_FLAG.set(Arc::clone(&stop.flag)).is_err() {
        return false;
    }
    let handler = on_sigint as extern "C" fn(libc::c_int);
    // SAFETY: the handler only performs an atomic store.
    let previous = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
    previous != libc::SIG_ERR
}

#[cfg(target_os = "windows")]
pub fn install_sigint_handler(stop: &StopFlag) -> bool {
    let _ = SIGNAL_FLAG.set(Arc::clone(&stop.flag));
    tracing::warn!("Interrupt handling is not supported on this platform");
    false
}

#[cfg(not(target_os = "windows"))]
extern "C" fn on_sigint(_signal: libc::c_int) {
    if let Some(flag) = SIGNAL_FLAG.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_request() {
        let stop = StopFlag::new();
        let observer = stop.clone();
        assert!(!observer.is_stop_requested());
        stop.request_stop();
        assert!(observer.is_stop_requested());
    }
}
