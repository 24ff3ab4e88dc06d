//! Step Coordination Engine (spec §4.3): the per-tick state machine that
//! drives every model instance in a simulation through marshal-out →
//! bus-ready → marshal-in → step → advance.

use crate::adapter::Adapter;
use crate::config::SimulatorConfiguration;
use crate::error::{ErrorKind, Result};
use crate::marshal;
use crate::model::ModelInstance;
use log::{debug, warn};

/// What one tick produced. `Faulted` carries the offending Model
/// Function's name so a caller never loses which plug-in misbehaved (the
/// Open Question in spec §9 about `hashmap_iterator` losing this
/// identity).
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Continue,
    EndOfRun,
    Faulted { function: String, code: i32 },
}

/// Runs one full tick across every instance. Marshalling and stepping are
/// phase-separated across the whole instance list (not interleaved
/// per-instance): all `marshal_out` calls complete before any `ready`,
/// all `ready` calls complete before any `marshal_in`, and so on — this is
/// what spec §4.3's ordering guarantee ("no model may observe another
/// model's in-tick writes") rests on.
pub fn tick(
    instances: &mut [ModelInstance],
    config: &SimulatorConfiguration,
    adapter: &mut dyn Adapter,
) -> Result<TickOutcome> {
    for instance in instances.iter_mut() {
        let model = adapter_model_mut(adapter, instance)?;
        marshal::marshal_out(&mut instance.controller, model);
    }

    for instance in instances.iter() {
        if let Err(e) = adapter.ready(instance.uid) {
            if let ErrorKind::BusTimeout = e.kind() {
                warn!("instance {:?} (uid {}): bus timeout", instance.name, instance.uid);
            }
            return Err(e);
        }
    }

    for instance in instances.iter_mut() {
        let model = adapter_model_mut(adapter, instance)?;
        marshal::marshal_in(&mut instance.controller, model);
    }

    for instance in instances.iter_mut() {
        let (mut model_time, stop_time) = {
            let model = adapter_model_mut(adapter, instance)?;
            (model.model_time, model.stop_time)
        };

        for function in instance.controller.functions_mut() {
            let code = (function.do_step)(&mut model_time, stop_time, &mut function.bindings);
            if code < 0 {
                return Ok(TickOutcome::Faulted {
                    function: function.name.clone(),
                    code,
                });
            }
            if code > 0 {
                debug!(
                    "instance {:?}: function {:?} signalled end-of-run",
                    instance.name, function.name
                );
                return Ok(TickOutcome::EndOfRun);
            }
        }

        let model = adapter_model_mut(adapter, instance)?;
        model.model_time = stop_time;
        model.stop_time = stop_time + config.step_size;
    }

    // `>=`, not the strict `<` some renderings of this check use: see
    // DESIGN.md for why the boundary tick itself must end the run.
    if config.has_end_time() {
        for instance in instances.iter() {
            let model = adapter.model(instance.uid).ok_or_else(|| unregistered(instance))?;
            if model.model_time >= config.end_time {
                return Ok(TickOutcome::EndOfRun);
            }
        }
    }

    Ok(TickOutcome::Continue)
}

fn adapter_model_mut<'a>(
    adapter: &'a mut dyn Adapter,
    instance: &ModelInstance,
) -> Result<&'a mut crate::adapter::AdapterModel> {
    adapter.model_mut(instance.uid).ok_or_else(|| unregistered(instance))
}

fn unregistered(instance: &ModelInstance) -> crate::error::Error {
    ErrorKind::InvalidOperation(format!(
        "instance {:?}: uid {} not registered with adapter",
        instance.name, instance.uid
    ))
    .into()
}
