//! Configuration: the `Stack`/`Model` YAML document shapes and the
//! simulator-wide settings built from them.
//!
//! The core reads, but (per spec's scope note) treats the YAML grammar
//! itself as an external collaborator; `serde_yaml` is simply the idiomatic
//! way to turn text into the typed documents below, the way the teacher
//! crate's own configuration types are `serde`-derived.

mod model;
mod simulation;
mod stack;

pub use model::{DynlibEntry, ModelAnnotations, ModelDoc, ModelMetadata, ModelRuntime, ModelSpecBody};
pub use simulation::SimulatorConfiguration;
pub use stack::{StackDoc, StackModelEntry, StackModelRef, StackSpec};

use crate::error::Result;

pub fn parse_stack(text: &str) -> Result<StackDoc> {
    Ok(serde_yaml::from_str(text)?)
}

pub fn parse_model(text: &str) -> Result<ModelDoc> {
    Ok(serde_yaml::from_str(text)?)
}
