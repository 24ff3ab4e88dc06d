//! `Stack` document shape (spec §6).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct StackDoc {
    pub spec: StackSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StackSpec {
    pub models: Vec<StackModelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StackModelEntry {
    pub name: String,
    #[serde(default)]
    pub uid: u32,
    pub model: StackModelRef,
    #[serde(default)]
    pub propagators: Vec<serde_yaml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StackModelRef {
    pub name: String,
}

impl StackSpec {
    /// Locates `spec.models[name==N]`, per configure step 1.
    pub fn find(&self, name: &str) -> Option<&StackModelEntry> {
        self.models.iter().find(|m| m.name == name)
    }
}
