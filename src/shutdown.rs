//! Interrupt-safe shutdown path.
//!
//! A process-wide stop flag, writable from signal-handler context with no
//! allocation or blocking, per the Design Notes: the only process-wide cell
//! this rewrite keeps is the one the plugin ABI's signal handler needs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle to the stop flag. Cheap to clone; all clones observe the same
/// underlying flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> ShutdownFlag {
        ShutdownFlag(Arc::new(AtomicBool::new(false)))
    }

    /// Registers `SIGINT`/`SIGTERM` handlers that set this flag. The
    /// handlers only ever store a bool; nothing is allocated on the signal
    /// path.
    pub fn register_signals(&self) -> Result<(), std::io::Error> {
        signal_hook::flag::register(signal_hook::SIGINT, self.0.clone())?;
        signal_hook::flag::register(signal_hook::SIGTERM, self.0.clone())?;
        Ok(())
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sets the flag directly. Exposed for tests and for a host embedding
    /// the Gateway Facade that wants to request a graceful stop itself.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}
