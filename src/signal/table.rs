//! Signal Table and Signal Slot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Storage for one signal's current value, pending value, and binary
/// payload.
///
/// `bin` doubles as both the buffer and its occupied size: `bin.len()` is
/// `bin_size` and `bin.capacity()` is `bin_buffer_size` from the data model.
/// Clearing with [`Vec::clear`] zeroes the size while retaining capacity,
/// which is exactly the "consumed" convention the spec calls for.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SignalSlot {
    pub name: String,
    /// Current scalar value, visible to peers as of the last `adapter_ready`.
    pub val: f64,
    /// Pending outbound scalar value, written by the model this tick.
    pub final_val: f64,
    /// Binary payload. Non-empty means "new data present".
    pub bin: Vec<u8>,
}

impl SignalSlot {
    pub fn new(name: impl Into<String>) -> SignalSlot {
        SignalSlot {
            name: name.into(),
            val: 0.0,
            final_val: 0.0,
            bin: Vec::new(),
        }
    }

    /// Appends `src` to the slot's binary buffer, growing capacity as
    /// needed but never shrinking it afterwards.
    pub fn append_bin(&mut self, src: &[u8]) {
        self.bin.extend_from_slice(src);
    }

    /// Zeroes the occupied size while retaining the buffer's capacity.
    pub fn clear_bin(&mut self) {
        self.bin.clear();
    }
}

/// Per-channel map of signal name to slot.
pub type SignalTable = HashMap<String, SignalSlot>;

/// Ensures a slot exists for every name in `names`, creating empty ones for
/// any not yet seen. This is what backs `init_channel`'s allocation of slots
/// for previously-unseen signals.
pub fn ensure_slots(table: &mut SignalTable, names: &[String]) {
    for name in names {
        table
            .entry(name.clone())
            .or_insert_with(|| SignalSlot::new(name.clone()));
    }
}
