//! The bus-facing side of the core: [`Adapter`] and [`AdapterModel`].
//!
//! The wire protocol itself is out of scope (spec §1/§6); what the core owns
//! is the `connect`/`register`/`ready`/`interrupt`/`exit` surface an adapter
//! must expose, and the per-instance [`AdapterModel`] view the Marshaller
//! and Step Coordinator read and write. [`LoopbackAdapter`] is the
//! in-process test double used by the test suite and by the Gateway
//! Facade's embedded mode; a real deployment swaps in a TCP or
//! shared-memory adapter behind the same trait.

mod loopback;

pub use loopback::LoopbackAdapter;

use crate::error::{ErrorKind, Result};
use crate::shutdown::ShutdownFlag;
use crate::signal::SignalTable;
use std::collections::HashMap;
use std::thread;
use std::time::Duration;

/// Number of endpoint connect attempts before giving up, per spec §4.7.
const CONNECT_RETRIES: u32 = 60;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Per-instance, bus-facing view: current/next time and the channel signal
/// tables the Marshaller operates on.
#[derive(Debug, Clone)]
pub struct AdapterModel {
    pub uid: u32,
    pub model_time: f64,
    pub stop_time: f64,
    pub table: HashMap<String, SignalTable>,
}

impl AdapterModel {
    pub fn new(uid: u32, step_size: f64) -> AdapterModel {
        AdapterModel {
            uid,
            model_time: 0.0,
            stop_time: step_size,
            table: HashMap::new(),
        }
    }

    /// Allocates slots for any signal names not yet seen on `channel`.
    pub fn init_channel(&mut self, channel: &str, signal_names: &[String]) {
        let table = self.table.entry(channel.to_string()).or_default();
        crate::signal::ensure_slots(table, signal_names);
    }
}

/// The bus-facing operations a transport must expose. The wire framing and
/// schema belong to the transport implementation; this trait is the
/// boundary the core depends on.
pub trait Adapter {
    /// Establishes the underlying connection. Called once, wrapped by
    /// [`bring_up`] for the retry policy.
    fn connect(&mut self) -> Result<()>;

    /// Registers a model instance's [`AdapterModel`] with the bus, reachable
    /// thereafter by its UID.
    fn register(&mut self, model: AdapterModel) -> Result<()>;

    /// Publishes the registered instance's pending values and blocks until
    /// the bus grants the next start. Returns [`ErrorKind::BusTimeout`] if
    /// the peer publication wait exceeds the instance's timeout.
    fn ready(&mut self, uid: u32) -> Result<()>;

    /// Async-signal-safe interrupt: wakes any blocked `ready` call. Must not
    /// allocate or block.
    fn interrupt(&self);

    /// Tears down the instance's bus presence.
    fn exit(&mut self, uid: u32) -> Result<()>;

    fn model(&self, uid: u32) -> Option<&AdapterModel>;
    fn model_mut(&mut self, uid: u32) -> Option<&mut AdapterModel>;
}

/// Brings up the endpoint, retrying connect failures up to [`CONNECT_RETRIES`]
/// times with a one-second sleep between attempts, to ride out peer
/// start-up races. A stop request observed mid-retry is a fatal `Cancelled`
/// condition.
pub fn bring_up<A: Adapter>(adapter: &mut A, stop: &ShutdownFlag) -> Result<()> {
    for attempt in 0..CONNECT_RETRIES {
        if stop.is_set() {
            return Err(ErrorKind::Cancelled.into());
        }
        match adapter.connect() {
            Ok(()) => return Ok(()),
            Err(_) if attempt + 1 < CONNECT_RETRIES => {
                thread::sleep(CONNECT_RETRY_DELAY);
            }
            Err(e) => return Err(e),
        }
    }
    Err(ErrorKind::Cancelled.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFails;

    impl Adapter for AlwaysFails {
        fn connect(&mut self) -> Result<()> {
            Err(ErrorKind::Configuration("refused".into()).into())
        }
        fn register(&mut self, _model: AdapterModel) -> Result<()> {
            unreachable!()
        }
        fn ready(&mut self, _uid: u32) -> Result<()> {
            unreachable!()
        }
        fn interrupt(&self) {}
        fn exit(&mut self, _uid: u32) -> Result<()> {
            Ok(())
        }
        fn model(&self, _uid: u32) -> Option<&AdapterModel> {
            None
        }
        fn model_mut(&mut self, _uid: u32) -> Option<&mut AdapterModel> {
            None
        }
    }

    #[test]
    fn stop_flag_set_before_retry_loop_is_cancelled_not_retried() {
        let mut adapter = AlwaysFails;
        let stop = ShutdownFlag::new();
        stop.set();
        let result = bring_up(&mut adapter, &stop);
        assert!(matches!(result.unwrap_err().kind(), ErrorKind::Cancelled));
    }

    #[test]
    fn successful_connect_brings_up_immediately() {
        let mut adapter = LoopbackAdapter::new();
        let stop = ShutdownFlag::new();
        assert!(bring_up(&mut adapter, &stop).is_ok());
    }
}
