//! Simulator-wide configuration: transport, timing, timeout.

use crate::error::{cfg_err, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default per-model timeout, substituted when the configured value is
/// `<= 0`, per spec §4.1 "Setup default timeout".
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Top-level simulation configuration: transport, step size, end time, and
/// per-model timeout. Carried by [`crate::lifecycle::Simulation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfiguration {
    pub transport_kind: String,
    pub transport_uri: String,
    #[serde(default)]
    pub uid: u32,
    pub step_size: f64,
    pub end_time: f64,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
}

impl SimulatorConfiguration {
    pub fn new(transport_kind: impl Into<String>, transport_uri: impl Into<String>) -> Self {
        SimulatorConfiguration {
            transport_kind: transport_kind.into(),
            transport_uri: transport_uri.into(),
            uid: 0,
            step_size: 1.0,
            end_time: 0.0,
            timeout: default_timeout(),
        }
    }

    /// Substitutes the default timeout when none (or a non-positive one)
    /// was configured, and rejects a step size larger than a positive end
    /// time. A zero or negative `end_time` disables termination entirely
    /// (see DESIGN.md for the Open Question this resolves).
    pub fn normalize(&mut self) -> Result<()> {
        if self.timeout.as_secs_f64() <= 0.0 {
            self.timeout = default_timeout();
        }
        if self.end_time > 0.0 && self.step_size > self.end_time {
            return cfg_err(format!(
                "step size {} exceeds end time {}",
                self.step_size, self.end_time
            ));
        }
        Ok(())
    }

    /// Whether the run should end once `model_time` exceeds `end_time`.
    /// False for open-ended simulations (`end_time <= 0`).
    pub fn has_end_time(&self) -> bool {
        self.end_time > 0.0
    }
}

/// Minimal humantime-backed (de)serializer for `Duration`, mirroring the
/// teacher crate's use of `humantime` for log/time configuration fields.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        humantime::format_duration(*d).to_string().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(d)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
