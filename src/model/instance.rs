//! Model Instance and Model Definition.

use crate::model::ControllerModel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resolved plug-in definition: where the shared library lives and which
/// file backs it for the current `(os, arch)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    pub search_path: PathBuf,
    pub file: String,
    pub full_path: Option<PathBuf>,
    /// Present when the Model document declares `spec.runtime.gateway`
    /// instead of a dynlib entry.
    pub gateway: bool,
}

impl ModelDefinition {
    pub fn resolve(&mut self) {
        self.full_path = Some(self.search_path.join(&self.file));
    }
}

/// One configured, running model within a [`crate::lifecycle::Simulation`].
#[derive(Debug)]
pub struct ModelInstance {
    pub name: String,
    pub uid: u32,
    pub definition: ModelDefinition,
    pub controller: ControllerModel,
}

impl ModelInstance {
    pub fn new(name: impl Into<String>, definition: ModelDefinition) -> ModelInstance {
        ModelInstance {
            name: name.into(),
            uid: 0,
            definition,
            controller: ControllerModel::new(),
        }
    }
}

/// Computes the derived UID for an instance at `position` (0-based) within
/// a simulation whose own UID is `sim_uid`, per spec §3: `(position *
/// 10000) + sim_uid`. Only used when the caller did not supply a UID and
/// the bus did not assign one (i.e. both are zero).
pub fn derive_uid(position: usize, sim_uid: u32) -> u32 {
    (position as u32) * 10000 + sim_uid
}
