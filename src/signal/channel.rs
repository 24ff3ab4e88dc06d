//! Channel bindings and the per-instance channel registry.

use crate::error::{inv_arg, Result};
use std::collections::HashMap;

/// A model function's binding to one channel (`ModelFunctionChannel` in the
/// data model): the channel name, the signal names it carries, and parallel
/// scalar/binary buffers.
///
/// Invariant: `signal_names.len() == signal_count`; `scalars` and
/// `binaries`, when present, have the same length.
#[derive(Debug, Clone, Default)]
pub struct ChannelBinding {
    pub channel: String,
    pub signal_names: Vec<String>,
    pub scalars: Option<Vec<f64>>,
    pub binaries: Option<Vec<Vec<u8>>>,
}

impl ChannelBinding {
    /// Constructs a binding, allocating zeroed scalar and/or binary arrays
    /// as requested. Fails if the caller asks for arrays of the wrong
    /// length.
    pub fn new(
        channel: impl Into<String>,
        signal_names: Vec<String>,
        with_scalars: bool,
        with_binaries: bool,
    ) -> ChannelBinding {
        let n = signal_names.len();
        ChannelBinding {
            channel: channel.into(),
            signal_names,
            scalars: if with_scalars { Some(vec![0.0; n]) } else { None },
            binaries: if with_binaries {
                Some(vec![Vec::new(); n])
            } else {
                None
            },
        }
    }

    pub fn signal_count(&self) -> usize {
        self.signal_names.len()
    }

    /// Validates the invariant relating `signal_names` to the scalar/binary
    /// arrays. Called once after construction and whenever a binding is
    /// deserialized from a descriptor.
    pub fn validate(&self) -> Result<()> {
        let n = self.signal_count();
        if let Some(scalars) = &self.scalars {
            if scalars.len() != n {
                return inv_arg(format!(
                    "channel {:?}: scalar array length {} does not match {} signal names",
                    self.channel,
                    scalars.len(),
                    n
                ));
            }
        }
        if let Some(binaries) = &self.binaries {
            if binaries.len() != n {
                return inv_arg(format!(
                    "channel {:?}: binary array length {} does not match {} signal names",
                    self.channel,
                    binaries.len(),
                    n
                ));
            }
        }
        Ok(())
    }
}

/// Per-instance map of channel name to the signal-name vector it exposes.
#[derive(Debug, Clone, Default)]
pub struct ChannelRegistry {
    channels: HashMap<String, Vec<String>>,
}

impl ChannelRegistry {
    pub fn new() -> ChannelRegistry {
        ChannelRegistry::default()
    }

    /// Declares (or extends) a channel with the given signal names.
    pub fn declare(&mut self, channel: impl Into<String>, signal_names: &[String]) {
        let entry = self.channels.entry(channel.into()).or_default();
        for name in signal_names {
            if !entry.contains(name) {
                entry.push(name.clone());
            }
        }
    }

    pub fn signals_of(&self, channel: &str) -> Option<&[String]> {
        self.channels.get(channel).map(|v| v.as_slice())
    }

    pub fn channels(&self) -> impl Iterator<Item = &String> {
        self.channels.keys()
    }
}
