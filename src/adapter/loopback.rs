//! In-process loopback bus, used by the test suite and the embedded
//! Gateway Facade.

use super::{Adapter, AdapterModel};
use crate::error::{inv_arg, ErrorKind, Result};
use std::collections::{HashMap, HashSet};

/// An in-process stand-in for a SimBus transport. All registered
/// [`AdapterModel`]s live in one process; once every registered instance has
/// called `ready` for the current tick, their pending scalar/binary writes
/// are published into every instance sharing the same channel and signal
/// name, simulating the bus publish step without any real wire I/O.
#[derive(Debug, Default)]
pub struct LoopbackAdapter {
    instances: HashMap<u32, AdapterModel>,
    connected: bool,
    /// UIDs that have called `ready` so far this tick. The actual publish
    /// is deferred until every registered instance has checked in.
    ready_this_round: HashSet<u32>,
    /// When set, the next `ready()` call for this UID returns a bus
    /// timeout instead of publishing. Used to exercise the timeout path in
    /// tests.
    force_timeout: Option<u32>,
}

impl LoopbackAdapter {
    pub fn new() -> LoopbackAdapter {
        LoopbackAdapter::default()
    }

    /// Test hook: make the next `ready(uid)` call fail with `BusTimeout`.
    pub fn force_timeout_once(&mut self, uid: u32) {
        self.force_timeout = Some(uid);
    }

    /// Publishes every instance's pending values in one barrier pass: first
    /// every instance echoes its own `final_val` back to itself, then every
    /// instance's value is delivered to its peers. Doing the foreign
    /// delivery as a second, separate pass (rather than echo-then-propagate
    /// one instance at a time) matters: if instance B merely passes its last
    /// received value back through unchanged, a same-round echo of B's own
    /// stale value must not be allowed to land after — and so clobber — a
    /// fresh value instance A delivers to B this same round.
    fn publish_round(&mut self) {
        let snapshot: Vec<(u32, String, String, f64, Vec<u8>)> = self
            .instances
            .iter()
            .flat_map(|(&src, model)| {
                model.table.iter().flat_map(move |(channel, table)| {
                    table.iter().map(move |(name, slot)| {
                        (src, channel.clone(), name.clone(), slot.final_val, slot.bin.clone())
                    })
                })
            })
            .collect();

        for (src, channel, name, val, _) in &snapshot {
            if let Some(slot) = self
                .instances
                .get_mut(src)
                .and_then(|model| model.table.get_mut(channel))
                .and_then(|table| table.get_mut(name))
            {
                slot.val = *val;
            }
        }

        for (src, channel, name, val, bin) in &snapshot {
            for (&dst, model) in self.instances.iter_mut() {
                if dst == *src {
                    continue;
                }
                let slot = match model.table.get_mut(channel).and_then(|t| t.get_mut(name)) {
                    Some(slot) => slot,
                    None => continue,
                };
                slot.val = *val;
                if !bin.is_empty() {
                    slot.append_bin(bin);
                }
            }
        }
    }
}

impl Adapter for LoopbackAdapter {
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    fn register(&mut self, model: AdapterModel) -> Result<()> {
        if self.instances.contains_key(&model.uid) {
            return inv_arg(format!("uid {} already registered", model.uid));
        }
        self.instances.insert(model.uid, model);
        Ok(())
    }

    fn ready(&mut self, uid: u32) -> Result<()> {
        if !self.instances.contains_key(&uid) {
            return inv_arg(format!("uid {} not registered", uid));
        }
        if self.force_timeout == Some(uid) {
            self.force_timeout = None;
            return Err(ErrorKind::BusTimeout.into());
        }

        self.ready_this_round.insert(uid);
        if self.ready_this_round.len() >= self.instances.len() {
            self.ready_this_round.clear();
            self.publish_round();
        }
        Ok(())
    }

    fn interrupt(&self) {
        // No blocked I/O to wake in the loopback adapter; the Step
        // Coordinator checks the shutdown flag between ticks instead.
    }

    fn exit(&mut self, uid: u32) -> Result<()> {
        self.instances.remove(&uid);
        Ok(())
    }

    fn model(&self, uid: u32) -> Option<&AdapterModel> {
        self.instances.get(&uid)
    }

    fn model_mut(&mut self, uid: u32) -> Option<&mut AdapterModel> {
        self.instances.get_mut(&uid)
    }
}
