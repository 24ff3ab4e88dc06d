//! Signal Marshalling Engine (spec §4.4): bidirectional transfer between
//! per-function channel bindings and the adapter's signal table.

use crate::adapter::AdapterModel;
use crate::model::ControllerModel;
use crate::signal::ensure_slots;

/// Copies every function's pending outbound values into the adapter's
/// Signal Table: scalars into `final_val`, binary payloads appended to
/// `bin`. Source binary buffers are cleared after the copy, the "consumed"
/// convention from spec §4.4.
pub fn marshal_out(controller: &mut ControllerModel, adapter_model: &mut AdapterModel) {
    for function in controller.functions_mut() {
        for binding in function.bindings.values_mut() {
            let table = adapter_model.table.entry(binding.channel.clone()).or_default();
            ensure_slots(table, &binding.signal_names);

            if let Some(scalars) = &binding.scalars {
                for (name, value) in binding.signal_names.iter().zip(scalars.iter()) {
                    table.get_mut(name).unwrap().final_val = *value;
                }
            }
            if let Some(binaries) = &mut binding.binaries {
                for (name, payload) in binding.signal_names.iter().zip(binaries.iter_mut()) {
                    if !payload.is_empty() {
                        table.get_mut(name).unwrap().append_bin(payload);
                        payload.clear();
                    }
                }
            }
        }
    }
}

/// Copies the adapter's Signal Table contents back into every function's
/// local buffers: `val` into scalars, `bin` appended to the binding's
/// binary buffer. Consumed slot binary payloads are cleared after the
/// copy — the peer side of the same "consumed" convention.
pub fn marshal_in(controller: &mut ControllerModel, adapter_model: &mut AdapterModel) {
    for function in controller.functions_mut() {
        for binding in function.bindings.values_mut() {
            let table = match adapter_model.table.get_mut(&binding.channel) {
                Some(table) => table,
                None => continue,
            };

            if let Some(scalars) = &mut binding.scalars {
                for (name, value) in binding.signal_names.iter().zip(scalars.iter_mut()) {
                    if let Some(slot) = table.get(name) {
                        *value = slot.val;
                    }
                }
            }
            if let Some(binaries) = &mut binding.binaries {
                for (name, buf) in binding.signal_names.iter().zip(binaries.iter_mut()) {
                    if let Some(slot) = table.get_mut(name) {
                        if !slot.bin.is_empty() {
                            buf.extend_from_slice(&slot.bin);
                            slot.clear_bin();
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ControllerModel, ModelFunction};
    use crate::signal::ChannelBinding;

    fn instance_with_binding(channel: &str, names: &[&str]) -> ControllerModel {
        let mut ctrl = ControllerModel::new();
        let do_step: crate::model::DoStep = Box::new(|_, _, _| 0);
        let mut function = ModelFunction::new("f", 1.0, do_step);
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        function.bind_channel(ChannelBinding::new(channel, names, true, true));
        ctrl.register_model_function(function).unwrap();
        ctrl
    }

    #[test]
    fn round_trip_identity_on_scalars() {
        let mut ctrl = instance_with_binding("data", &["x"]);
        let mut adapter_model = AdapterModel::new(1, 1.0);

        ctrl.get_mut("f").unwrap().bindings.get_mut("data").unwrap().scalars = Some(vec![42.0]);
        marshal_out(&mut ctrl, &mut adapter_model);

        // Stand in for the bus publish a real tick performs between the two
        // marshal passes (`LoopbackAdapter::publish_round`): copy `final_val`
        // into `val` for every slot, per spec §8 property 6.
        for table in adapter_model.table.values_mut() {
            for slot in table.values_mut() {
                slot.val = slot.final_val;
            }
        }

        marshal_in(&mut ctrl, &mut adapter_model);

        let scalars = ctrl.get_mut("f").unwrap().bindings.get_mut("data").unwrap().scalars.clone();
        assert_eq!(scalars, Some(vec![42.0]));
    }

    #[test]
    fn marshal_out_clears_source_binary_and_grows_slot() {
        let mut ctrl = instance_with_binding("data", &["payload"]);
        let mut adapter_model = AdapterModel::new(1, 1.0);

        {
            let binding = ctrl.get_mut("f").unwrap().bindings.get_mut("data").unwrap();
            binding.binaries.as_mut().unwrap()[0] = vec![0xDE, 0xAD, 0xBE, 0xEF];
        }
        marshal_out(&mut ctrl, &mut adapter_model);

        let binding = ctrl.get_mut("f").unwrap().bindings.get_mut("data").unwrap();
        assert!(binding.binaries.as_ref().unwrap()[0].is_empty());
        let slot = adapter_model.table.get("data").unwrap().get("payload").unwrap();
        assert_eq!(slot.bin, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }
}
