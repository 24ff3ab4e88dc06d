//! Model Function: a named unit that runs during a step.

use crate::signal::ChannelBinding;
use std::collections::HashMap;
use std::fmt;

/// The step handler signature: `(model_time, stop_time, bindings) ->
/// status`, matching `do_step` in the data model (0 = ok, >0 = end, <0 =
/// error). `bindings` is the function's own channel bindings — a step
/// handler reads the scalars/binaries marshalled in this tick and writes
/// the values to be marshalled out next tick through the same map.
pub type DoStep = Box<dyn FnMut(&mut f64, f64, &mut HashMap<String, ChannelBinding>) -> i32 + Send>;

/// A registered unit that runs during a step: a name, a step size, its
/// `do_step` handler, and the channel bindings it reads and writes.
pub struct ModelFunction {
    pub name: String,
    pub step_size: f64,
    pub do_step: DoStep,
    pub bindings: HashMap<String, ChannelBinding>,
}

impl ModelFunction {
    pub fn new(name: impl Into<String>, step_size: f64, do_step: DoStep) -> ModelFunction {
        ModelFunction {
            name: name.into(),
            step_size,
            do_step,
            bindings: HashMap::new(),
        }
    }

    pub fn bind_channel(&mut self, binding: ChannelBinding) {
        self.bindings.insert(binding.channel.clone(), binding);
    }
}

impl fmt::Debug for ModelFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ModelFunction")
            .field("name", &self.name)
            .field("step_size", &self.step_size)
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}
