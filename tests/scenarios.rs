//! Integration tests for the concrete scenarios and boundary behaviours.
//!
//! These exercise the public `Simulation`/`Gateway` API the way a real
//! caller would, using `Simulation::run_with` to inject native in-process
//! plug-ins instead of loading a compiled dynlib — there is no compiled
//! `.so` fixture available to this test binary.

use modelc::adapter::LoopbackAdapter;
use modelc::config::{self, ModelDoc, StackDoc};
use modelc::error::ErrorKind;
use modelc::gateway::Gateway;
use modelc::lifecycle::Simulation;
use modelc::model::{ControllerModel, DoStep, ModelFunction, ModelInstance};
use modelc::plugin::Plugin;
use modelc::shutdown::ShutdownFlag;
use modelc::signal::{ChannelBinding, ChannelRegistry};
use std::env::consts::{ARCH, OS};

/// A `Stack`/`Model` document pair naming one non-gateway instance, with a
/// dynlib entry for the host `(os, arch)` so `Simulation::configure`'s
/// resolution step succeeds. The path is never opened — `run_with`'s
/// `plugin_for` closure supplies the real plug-in instead of the loader.
fn single_instance_docs(instance_name: &str, model_name: &str) -> (StackDoc, Vec<(String, ModelDoc)>) {
    let stack_yaml = format!(
        "spec:\n  models:\n    - name: {instance_name}\n      model:\n        name: {model_name}\n",
        instance_name = instance_name,
        model_name = model_name,
    );
    let model_yaml = format!(
        "metadata:\n  name: {model_name}\nspec:\n  runtime:\n    dynlib:\n      - os: {os}\n        arch: {arch}\n        path: unused.so\n",
        model_name = model_name,
        os = OS,
        arch = ARCH,
    );
    let stack = config::parse_stack(&stack_yaml).unwrap();
    let model = config::parse_model(&model_yaml).unwrap();
    (stack, vec![(model_name.to_string(), model)])
}

/// A single gateway-mode instance: `spec.runtime.gateway` is present instead
/// of a `dynlib` table, so `resolve_definition` selects the in-process
/// [`modelc::gateway::GatewayPlugin`] rather than a dynlib load.
fn gateway_instance_docs(instance_name: &str, model_name: &str) -> (StackDoc, Vec<(String, ModelDoc)>) {
    let stack_yaml = format!(
        "spec:\n  models:\n    - name: {instance_name}\n      model:\n        name: {model_name}\n",
        instance_name = instance_name,
        model_name = model_name,
    );
    let model_yaml = format!(
        "metadata:\n  name: {model_name}\nspec:\n  runtime:\n    gateway: true\n",
        model_name = model_name,
    );
    let stack = config::parse_stack(&stack_yaml).unwrap();
    let model = config::parse_model(&model_yaml).unwrap();
    (stack, vec![(model_name.to_string(), model)])
}

fn two_instance_docs(
    a_name: &str,
    a_model: &str,
    b_name: &str,
    b_model: &str,
) -> (StackDoc, Vec<(String, ModelDoc)>) {
    let stack_yaml = format!(
        "spec:\n  models:\n    - name: {a_name}\n      model:\n        name: {a_model}\n    - name: {b_name}\n      model:\n        name: {b_model}\n",
    );
    let model_yaml = |name: &str| {
        format!(
            "metadata:\n  name: {name}\nspec:\n  runtime:\n    dynlib:\n      - os: {os}\n        arch: {arch}\n        path: unused.so\n",
            name = name,
            os = OS,
            arch = ARCH,
        )
    };
    let stack = config::parse_stack(&stack_yaml).unwrap();
    let models = vec![
        (a_model.to_string(), config::parse_model(&model_yaml(a_model)).unwrap()),
        (b_model.to_string(), config::parse_model(&model_yaml(b_model)).unwrap()),
    ];
    (stack, models)
}

/// S1: declares one channel `"data"` with scalar `"counter"`, incremented by
/// one every step.
#[derive(Debug, Default)]
struct CounterPlugin;

impl Plugin for CounterPlugin {
    fn create(&mut self, ctrl: &mut ControllerModel, channels: &mut ChannelRegistry) -> modelc::error::Result<()> {
        let names = vec!["counter".to_string()];
        channels.declare("data", &names);

        let do_step: DoStep = Box::new(|model_time, stop_time, bindings| {
            *model_time = stop_time;
            if let Some(binding) = bindings.get_mut("data") {
                if let Some(scalars) = &mut binding.scalars {
                    scalars[0] += 1.0;
                }
            }
            0
        });
        let mut function = ModelFunction::new("counter", 1.0, do_step);
        function.bind_channel(ChannelBinding::new("data", names, true, false));
        ctrl.register_model_function(function)
    }

    fn destroy(&mut self) -> modelc::error::Result<()> {
        Ok(())
    }
}

/// S3: writes a fixed 4-byte payload into its own binding at construction
/// time (an initial condition, not a per-step write). Its own binary
/// binding is read-capable too (required for the bus to marshal it out at
/// all), so by the time marshal_in runs its local buffer holds back its
/// own bytes; `do_step` clears them, leaving the "sent" buffer at size 0.
#[derive(Debug, Default)]
struct ProducerPlugin;

impl Plugin for ProducerPlugin {
    fn create(&mut self, ctrl: &mut ControllerModel, channels: &mut ChannelRegistry) -> modelc::error::Result<()> {
        let names = vec!["payload".to_string()];
        channels.declare("data", &names);

        let do_step: DoStep = Box::new(|model_time, stop_time, bindings| {
            *model_time = stop_time;
            if let Some(binding) = bindings.get_mut("data") {
                if let Some(binaries) = &mut binding.binaries {
                    binaries[0].clear();
                }
            }
            0
        });
        let mut function = ModelFunction::new("producer", 1.0, do_step);
        let mut binding = ChannelBinding::new("data", names, false, true);
        binding.binaries.as_mut().unwrap()[0] = vec![0xDE, 0xAD, 0xBE, 0xEF];
        function.bind_channel(binding);
        ctrl.register_model_function(function)
    }

    fn destroy(&mut self) -> modelc::error::Result<()> {
        Ok(())
    }
}

/// S3's peer: binds the same channel/signal, writes nothing, just lets the
/// Marshaller fill its binary buffer.
#[derive(Debug, Default)]
struct ConsumerPlugin;

impl Plugin for ConsumerPlugin {
    fn create(&mut self, ctrl: &mut ControllerModel, channels: &mut ChannelRegistry) -> modelc::error::Result<()> {
        let names = vec!["payload".to_string()];
        channels.declare("data", &names);

        let do_step: DoStep = Box::new(|model_time, stop_time, _bindings| {
            *model_time = stop_time;
            0
        });
        let mut function = ModelFunction::new("consumer", 1.0, do_step);
        function.bind_channel(ChannelBinding::new("data", names, false, true));
        ctrl.register_model_function(function)
    }

    fn destroy(&mut self) -> modelc::error::Result<()> {
        Ok(())
    }
}

/// S6: publishes a constant scalar `1.0` on every step, regardless of what
/// it reads back.
#[derive(Debug, Default)]
struct WriterPlugin;

impl Plugin for WriterPlugin {
    fn create(&mut self, ctrl: &mut ControllerModel, channels: &mut ChannelRegistry) -> modelc::error::Result<()> {
        let names = vec!["x".to_string()];
        channels.declare("data", &names);

        let do_step: DoStep = Box::new(|model_time, stop_time, bindings| {
            *model_time = stop_time;
            if let Some(binding) = bindings.get_mut("data") {
                if let Some(scalars) = &mut binding.scalars {
                    scalars[0] = 1.0;
                }
            }
            0
        });
        let mut function = ModelFunction::new("writer", 1.0, do_step);
        function.bind_channel(ChannelBinding::new("data", names, true, false));
        ctrl.register_model_function(function)
    }

    fn destroy(&mut self) -> modelc::error::Result<()> {
        Ok(())
    }
}

/// S6's peer: a pass-through reader. Its `do_step` never touches its own
/// scalar, so marshal_out simply republishes whatever it last received.
#[derive(Debug, Default)]
struct ReaderPlugin;

impl Plugin for ReaderPlugin {
    fn create(&mut self, ctrl: &mut ControllerModel, channels: &mut ChannelRegistry) -> modelc::error::Result<()> {
        let names = vec!["x".to_string()];
        channels.declare("data", &names);

        let do_step: DoStep = Box::new(|model_time, stop_time, _bindings| {
            *model_time = stop_time;
            0
        });
        let mut function = ModelFunction::new("reader", 1.0, do_step);
        function.bind_channel(ChannelBinding::new("data", names, true, false));
        ctrl.register_model_function(function)
    }

    fn destroy(&mut self) -> modelc::error::Result<()> {
        Ok(())
    }
}

fn sim_config(step_size: f64, end_time: f64) -> modelc::config::SimulatorConfiguration {
    let mut config = modelc::config::SimulatorConfiguration::new("loopback", "embedded");
    config.step_size = step_size;
    config.end_time = end_time;
    config
}

fn binding_scalar(instance: &mut ModelInstance, function: &str, channel: &str) -> f64 {
    instance
        .controller
        .get_mut(function)
        .unwrap()
        .bindings
        .get(channel)
        .unwrap()
        .scalars
        .as_ref()
        .unwrap()[0]
}

fn binding_binary(instance: &mut ModelInstance, function: &str, channel: &str) -> Vec<u8> {
    instance
        .controller
        .get_mut(function)
        .unwrap()
        .bindings
        .get(channel)
        .unwrap()
        .binaries
        .as_ref()
        .unwrap()[0]
        .clone()
}

/// S1: single instance, Δ=1.0, T_end=3.0 — 3 ticks, final counter value 3.
#[test]
fn s1_single_model_loopback_counts_three_ticks() {
    let (stack, models) = single_instance_docs("counter", "counter-model");
    let mut simulation = Simulation::configure(sim_config(1.0, 3.0), &stack, &models, "counter").unwrap();
    let mut adapter = LoopbackAdapter::new();
    let stop = ShutdownFlag::new();

    let outcome = simulation
        .run_with(&mut adapter, &stop, true, |_instance| Ok(Box::new(CounterPlugin) as Box<dyn Plugin>))
        .unwrap();

    assert_eq!(outcome, modelc::coordinator::TickOutcome::EndOfRun);
    assert_eq!(binding_scalar(&mut simulation.instances[0], "counter", "data"), 3.0);
    simulation.exit(&mut adapter).unwrap();
}

/// S2 (adapted to the literal §4.6 rule — see DESIGN.md): a caller time
/// behind the bus is rejected with `GatewayBehind` without ticking; a caller
/// time ahead of the bus drives the coordinator until the bus passes it.
#[test]
fn s2_gateway_catch_up() {
    let (stack, models) = gateway_instance_docs("gw", "gw-model");
    let mut gateway = Gateway::new(LoopbackAdapter::new());
    gateway
        .setup("gw", &[], &stack, &models, 0.1, 10.0)
        .unwrap();

    // Bus starts at 0.0; 0.05 is not behind it, so this ticks forward until
    // the bus exceeds 0.05 (one Δ=0.1 tick) and succeeds.
    gateway.sync(0.05).unwrap();

    // The bus is now at 0.1. A caller asking for an earlier time is behind.
    let err = gateway.sync(0.02).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::GatewayBehind));

    // Catching up to 0.5 ticks forward several times and succeeds once the
    // bus passes it.
    gateway.sync(0.5).unwrap();

    gateway.exit().unwrap();
    // Idempotent per property 5.
    gateway.exit().unwrap();
}

/// S3: a 4-byte payload set at configure time is visible to a peer sharing
/// the same channel/signal after one tick, and the producer's own buffer is
/// left empty (the "consumed" convention).
#[test]
fn s3_binary_payload_handoff() {
    let (stack, models) = two_instance_docs("producer", "producer-model", "consumer", "consumer-model");
    let mut simulation = Simulation::configure(sim_config(1.0, 1.0), &stack, &models, "producer;consumer").unwrap();
    let mut adapter = LoopbackAdapter::new();
    let stop = ShutdownFlag::new();

    simulation
        .run_with(&mut adapter, &stop, true, |instance| -> modelc::error::Result<Box<dyn Plugin>> {
            if instance.name == "producer" {
                Ok(Box::new(ProducerPlugin))
            } else {
                Ok(Box::new(ConsumerPlugin))
            }
        })
        .unwrap();

    let producer_idx = simulation.instances.iter().position(|i| i.name == "producer").unwrap();
    let consumer_idx = simulation.instances.iter().position(|i| i.name == "consumer").unwrap();

    assert!(binding_binary(&mut simulation.instances[producer_idx], "producer", "data").is_empty());
    assert_eq!(
        binding_binary(&mut simulation.instances[consumer_idx], "consumer", "data"),
        vec![0xDE, 0xAD, 0xBE, 0xEF],
    );
    simulation.exit(&mut adapter).unwrap();
}

/// S4 stand-in: no compiled dynlib fixture is available in this sandbox, so
/// this exercises the same failure path — `DynlibPlugin::load` on a file
/// that cannot be opened as a shared library — through the lifecycle's real
/// (non-injected) loader rather than through a `model_create`/`model_step`-less
/// `.so`.
#[test]
fn s4_plugin_load_failure_reports_plugin_load_error() {
    let stack_yaml = "spec:\n  models:\n    - name: broken\n      model:\n        name: broken-model\n";
    let model_yaml = format!(
        "metadata:\n  name: broken-model\nspec:\n  runtime:\n    dynlib:\n      - os: {os}\n        arch: {arch}\n        path: Cargo.toml\n",
        os = OS,
        arch = ARCH,
    );
    let stack = config::parse_stack(stack_yaml).unwrap();
    let models = vec![("broken-model".to_string(), config::parse_model(&model_yaml).unwrap())];

    let mut simulation = Simulation::configure(sim_config(1.0, 0.0), &stack, &models, "broken").unwrap();
    let mut adapter = LoopbackAdapter::new();
    let stop = ShutdownFlag::new();

    let err = simulation.run(&mut adapter, &stop, true).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::PluginLoad(_)));
}

/// S5: a graceful interrupt requested partway through a run — here, by the
/// first tick's own step handler — is observed before the next tick starts
/// and aborts with `cancelled` rather than running to completion. The
/// already-applied first tick's state is left in place: exit still
/// releases it without aborting (spec's "no leaks" requirement for S5).
#[test]
fn s5_graceful_interrupt_cancels_run() {
    let (stack, models) = single_instance_docs("counter", "counter-model");
    let mut simulation = Simulation::configure(sim_config(1.0, 100.0), &stack, &models, "counter").unwrap();
    let mut adapter = LoopbackAdapter::new();
    let stop = ShutdownFlag::new();

    let interrupt_after_one_tick = stop.clone();
    let plugin_for = move |_instance: &ModelInstance| -> modelc::error::Result<Box<dyn Plugin>> {
        let stop = interrupt_after_one_tick.clone();
        Ok(Box::new(InterruptingCounterPlugin { stop }) as Box<dyn Plugin>)
    };

    let err = simulation.run_with(&mut adapter, &stop, true, plugin_for).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Cancelled));
    assert_eq!(binding_scalar(&mut simulation.instances[0], "counter", "data"), 1.0);

    // Exit still tears the instance down cleanly after a cancelled run.
    simulation.exit(&mut adapter).unwrap();
}

/// Like [`CounterPlugin`], but requests a stop from inside its own
/// `do_step` after the first call — modeling an external interrupt that
/// arrives mid-run rather than before the endpoint comes up.
struct InterruptingCounterPlugin {
    stop: ShutdownFlag,
}

impl Plugin for InterruptingCounterPlugin {
    fn create(&mut self, ctrl: &mut ControllerModel, channels: &mut ChannelRegistry) -> modelc::error::Result<()> {
        let names = vec!["counter".to_string()];
        channels.declare("data", &names);

        let stop = self.stop.clone();
        let do_step: DoStep = Box::new(move |model_time, stop_time, bindings| {
            *model_time = stop_time;
            if let Some(binding) = bindings.get_mut("data") {
                if let Some(scalars) = &mut binding.scalars {
                    scalars[0] += 1.0;
                }
            }
            stop.set();
            0
        });
        let mut function = ModelFunction::new("counter", 1.0, do_step);
        function.bind_channel(ChannelBinding::new("data", names, true, false));
        ctrl.register_model_function(function)
    }

    fn destroy(&mut self) -> modelc::error::Result<()> {
        Ok(())
    }
}

/// S6: `A` writes 1.0 at tick k; `B` — a pass-through reader on the same
/// channel/signal — only observes it at tick k+1, never within the same
/// tick.
#[test]
fn s6_two_instances_cross_tick_visibility() {
    let (stack, models) = two_instance_docs("a", "a-model", "b", "b-model");
    let mut simulation = Simulation::configure(sim_config(1.0, 1.0), &stack, &models, "a;b").unwrap();
    let mut adapter = LoopbackAdapter::new();
    let stop = ShutdownFlag::new();

    // One tick: A publishes 1.0 during this tick's Stepping phase, which
    // only reaches the bus at the *next* tick's marshal_out — so after a
    // single tick B must still read 0.0.
    simulation
        .run_with(&mut adapter, &stop, true, |instance| -> modelc::error::Result<Box<dyn Plugin>> {
            if instance.name == "a" {
                Ok(Box::new(WriterPlugin))
            } else {
                Ok(Box::new(ReaderPlugin))
            }
        })
        .unwrap();

    let b_idx = simulation.instances.iter().position(|i| i.name == "b").unwrap();
    assert_eq!(binding_scalar(&mut simulation.instances[b_idx], "reader", "data"), 0.0);
    simulation.exit(&mut adapter).unwrap();

    // A second run (fresh simulation, two ticks this time) shows B catching
    // up to A's value by the following tick.
    let mut simulation = Simulation::configure(sim_config(1.0, 2.0), &stack, &models, "a;b").unwrap();
    let mut adapter = LoopbackAdapter::new();
    simulation
        .run_with(&mut adapter, &stop, true, |instance| -> modelc::error::Result<Box<dyn Plugin>> {
            if instance.name == "a" {
                Ok(Box::new(WriterPlugin))
            } else {
                Ok(Box::new(ReaderPlugin))
            }
        })
        .unwrap();
    let b_idx = simulation.instances.iter().position(|i| i.name == "b").unwrap();
    assert_eq!(binding_scalar(&mut simulation.instances[b_idx], "reader", "data"), 1.0);
    simulation.exit(&mut adapter).unwrap();
}

/// Boundary property 7: `step_size > end_time` is rejected at configure time.
#[test]
fn step_size_exceeding_end_time_is_rejected() {
    let (stack, models) = single_instance_docs("counter", "counter-model");
    let err = Simulation::configure(sim_config(2.0, 1.0), &stack, &models, "counter").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Configuration(_)));
}

/// Boundary property 8: a model with no registered channels completes
/// setup → step → exit cleanly.
#[test]
fn no_channel_model_completes_lifecycle_cleanly() {
    #[derive(Debug, Default)]
    struct SilentPlugin;
    impl Plugin for SilentPlugin {
        fn create(&mut self, ctrl: &mut ControllerModel, _channels: &mut ChannelRegistry) -> modelc::error::Result<()> {
            let do_step: DoStep = Box::new(|model_time, stop_time, _bindings| {
                *model_time = stop_time;
                0
            });
            ctrl.register_model_function(ModelFunction::new("silent", 1.0, do_step))
        }
        fn destroy(&mut self) -> modelc::error::Result<()> {
            Ok(())
        }
    }

    let (stack, models) = single_instance_docs("silent", "silent-model");
    let mut simulation = Simulation::configure(sim_config(1.0, 2.0), &stack, &models, "silent").unwrap();
    let mut adapter = LoopbackAdapter::new();
    let stop = ShutdownFlag::new();

    let outcome = simulation
        .run_with(&mut adapter, &stop, true, |_instance| Ok(Box::new(SilentPlugin) as Box<dyn Plugin>))
        .unwrap();
    assert_eq!(outcome, modelc::coordinator::TickOutcome::EndOfRun);
    simulation.exit(&mut adapter).unwrap();
}

/// Boundary property 9: a stop request observed during endpoint retry
/// aborts with cancelled, never a successful run — exercised here at the
/// pre-bring-up check, since `LoopbackAdapter::connect` never fails on its
/// own to drive a real retry loop.
#[test]
fn stop_request_before_bring_up_is_cancelled() {
    let (stack, models) = single_instance_docs("counter", "counter-model");
    let mut simulation = Simulation::configure(sim_config(1.0, 3.0), &stack, &models, "counter").unwrap();
    let mut adapter = LoopbackAdapter::new();
    let stop = ShutdownFlag::new();
    stop.set();

    let err = simulation
        .run_with(&mut adapter, &stop, true, |_instance| Ok(Box::new(CounterPlugin) as Box<dyn Plugin>))
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Cancelled));
}
