//! Controller Model: the plug-in-facing view of one instance.

use crate::error::{inv_op, Result};
use crate::model::ModelFunction;
use std::collections::HashMap;

/// Internal name of the function the Gateway Facade registers for its
/// external-time-source model (spec §4.6). Excluded from
/// [`ControllerModel::user_functions`].
pub const GATEWAY_STEP_FUNCTION: &str = "__gateway_advance";

/// Per-instance map of function name to [`ModelFunction`], as seen from the
/// plug-in side.
#[derive(Debug, Default)]
pub struct ControllerModel {
    functions: HashMap<String, ModelFunction>,
}

impl ControllerModel {
    pub fn new() -> ControllerModel {
        ControllerModel::default()
    }

    /// Registers a Model Function. Fails with an invalid-operation error if
    /// the name is already taken, matching the `already-exists` failure
    /// mode in spec §4.5.
    pub fn register_model_function(&mut self, function: ModelFunction) -> Result<()> {
        if self.functions.contains_key(&function.name) {
            return inv_op(format!(
                "model function {:?} already registered",
                function.name
            ));
        }
        self.functions.insert(function.name.clone(), function);
        Ok(())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ModelFunction> {
        self.functions.get_mut(name)
    }

    pub fn functions_mut(&mut self) -> impl Iterator<Item = &mut ModelFunction> {
        self.functions.values_mut()
    }

    pub fn functions(&self) -> impl Iterator<Item = &ModelFunction> {
        self.functions.values()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Function names excluding the gateway's internal advance step; useful
    /// for diagnostics and reproduction logging.
    pub fn user_functions(&self) -> impl Iterator<Item = &str> {
        self.functions
            .keys()
            .map(String::as_str)
            .filter(|n| *n != GATEWAY_STEP_FUNCTION)
    }
}
