//! `Model` document shape (spec §6).

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct ModelDoc {
    pub metadata: ModelMetadata,
    pub spec: ModelSpecBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    #[serde(default)]
    pub annotations: ModelAnnotations,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelAnnotations {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSpecBody {
    pub runtime: ModelRuntime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelRuntime {
    #[serde(default)]
    pub dynlib: Vec<DynlibEntry>,
    /// Presence (any value, including `null`) selects gateway mode.
    #[serde(default)]
    pub gateway: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DynlibEntry {
    pub os: String,
    pub arch: String,
    pub path: String,
}

impl ModelRuntime {
    /// Selects the dynlib entry for the given `(os, arch)` pair, per
    /// configure step 4.
    pub fn dynlib_for(&self, os: &str, arch: &str) -> Option<&DynlibEntry> {
        self.dynlib.iter().find(|e| e.os == os && e.arch == arch)
    }
}
