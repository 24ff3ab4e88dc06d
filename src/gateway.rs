//! Gateway Facade (spec §4.6): lets an external time source drive the
//! tick loop via `setup → sync(t) → exit`.

use crate::adapter::Adapter;
use crate::config::{ModelDoc, SimulatorConfiguration, StackDoc};
use crate::coordinator::{self, TickOutcome};
use crate::error::{Error, ErrorKind, Result};
use crate::lifecycle::Simulation;
use crate::model::{ControllerModel, ModelFunction, GATEWAY_STEP_FUNCTION};
use crate::plugin::Plugin;
use crate::shutdown::ShutdownFlag;
use crate::signal::ChannelRegistry;
use std::path::PathBuf;

/// The built-in plug-in the gateway registers for its own instance: its
/// `do_step` has no physics of its own, it just lets the coordinator's
/// per-tick advance carry `model_time` forward to `stop_time` — the
/// external driver supplies the actual physics through `sync`.
#[derive(Debug, Default)]
pub struct GatewayPlugin;

impl GatewayPlugin {
    pub fn new() -> GatewayPlugin {
        GatewayPlugin
    }
}

impl Plugin for GatewayPlugin {
    fn create(&mut self, ctrl: &mut ControllerModel, _channels: &mut ChannelRegistry) -> Result<()> {
        let do_step: crate::model::DoStep = Box::new(|model_time, stop_time, _bindings| {
            *model_time = stop_time;
            0
        });
        let function = ModelFunction::new(GATEWAY_STEP_FUNCTION, 0.0, do_step);
        ctrl.register_model_function(function)
    }

    fn destroy(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Embedded-mode facade wrapping one [`Simulation`] and the adapter it
/// runs against. `simulation` is `None` both before `setup` and after
/// `exit`, which is what makes a second `exit()` call a no-op (spec §8
/// property 5).
pub struct Gateway<A: Adapter> {
    simulation: Option<Simulation>,
    adapter: A,
    stop: ShutdownFlag,
}

impl<A: Adapter> Gateway<A> {
    pub fn new(adapter: A) -> Gateway<A> {
        Gateway {
            simulation: None,
            adapter,
            stop: ShutdownFlag::new(),
        }
    }

    /// Synthesises an argv-shaped invocation (`"gateway" --name=<name>
    /// <yaml paths>`), parses it through the same CLI surface the
    /// standalone binary uses, configures the simulation, and starts it
    /// in async mode (a single bus-ready handshake, no tick loop).
    pub fn setup(
        &mut self,
        name: &str,
        yaml_paths: &[PathBuf],
        stack: &StackDoc,
        models: &[(String, ModelDoc)],
        step_size: f64,
        end_time: f64,
    ) -> Result<()> {
        let resolved_name = resolve_name_via_cli(name, yaml_paths)?;

        let mut config = SimulatorConfiguration::new("gateway", "embedded");
        config.step_size = step_size;
        config.end_time = end_time;

        let mut simulation = Simulation::configure(config, stack, models, &resolved_name)?;
        simulation.run(&mut self.adapter, &self.stop, false)?;
        self.simulation = Some(simulation);
        Ok(())
    }

    /// The heart of the facade. If the caller's time is behind the bus,
    /// returns [`ErrorKind::GatewayBehind`] without doing any work — the
    /// caller must advance its own time and retry. Otherwise repeatedly
    /// invokes the step coordinator until the bus time strictly exceeds
    /// `t_caller` (see DESIGN.md for why the loop stops on strict `>`
    /// rather than `>=`).
    pub fn sync(&mut self, t_caller: f64) -> Result<()> {
        let simulation = self
            .simulation
            .as_mut()
            .ok_or_else(|| gateway_not_set_up())?;

        let t_bus = bus_time(simulation, &self.adapter);
        if t_caller < t_bus {
            return Err(ErrorKind::GatewayBehind.into());
        }

        loop {
            if bus_time(simulation, &self.adapter) > t_caller {
                return Ok(());
            }
            match coordinator::tick(&mut simulation.instances, &simulation.config, &mut self.adapter)? {
                TickOutcome::Continue => continue,
                TickOutcome::EndOfRun => return Ok(()),
                TickOutcome::Faulted { function, code } => {
                    return Err(ErrorKind::Step { function, code }.into())
                }
            }
        }
    }

    /// Tears down in the order spec §4.6 names: simulation exit (which
    /// destroys the instance), then drops the simulation record itself.
    /// Idempotent: a second call finds `simulation` already `None`.
    pub fn exit(&mut self) -> Result<()> {
        if let Some(mut simulation) = self.simulation.take() {
            simulation.exit(&mut self.adapter)?;
        }
        Ok(())
    }
}

fn gateway_not_set_up() -> Error {
    ErrorKind::InvalidOperation("gateway not set up".into()).into()
}

fn bus_time<A: Adapter>(simulation: &Simulation, adapter: &A) -> f64 {
    simulation
        .instances
        .first()
        .and_then(|instance| adapter.model(instance.uid))
        .map(|model| model.model_time)
        .unwrap_or(0.0)
}

#[cfg(feature = "cli")]
fn resolve_name_via_cli(name: &str, yaml_paths: &[PathBuf]) -> Result<String> {
    use structopt::StructOpt;
    let mut argv = vec!["gateway".to_string(), format!("--name={}", name)];
    argv.extend(yaml_paths.iter().map(|p| p.display().to_string()));
    let opt = crate::cli::Opt::from_iter_safe(&argv)
        .map_err(|e| ErrorKind::Configuration(e.to_string()))?;
    Ok(opt.name)
}

#[cfg(not(feature = "cli"))]
fn resolve_name_via_cli(name: &str, _yaml_paths: &[PathBuf]) -> Result<String> {
    Ok(name.to_string())
}
