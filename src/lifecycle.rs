//! Model Instance Lifecycle Manager (spec §4.1): configure, run, exit.

use crate::adapter::{bring_up, Adapter, AdapterModel};
use crate::coordinator::{self, TickOutcome};
use crate::config::{ModelDoc, SimulatorConfiguration, StackDoc};
use crate::error::{Error, ErrorKind, Result};
use crate::model::{derive_uid, ModelDefinition, ModelInstance};
use crate::plugin::Plugin;
use crate::shutdown::ShutdownFlag;
use crate::signal::ChannelRegistry;
use log::{debug, info, trace};
use std::env::consts::{ARCH, OS};
use std::path::PathBuf;

/// The top-level container (spec §3): configuration, instances, and the
/// per-instance channel registries built up during `configure`.
pub struct Simulation {
    pub config: SimulatorConfiguration,
    pub instances: Vec<ModelInstance>,
    plugins: Vec<Box<dyn Plugin>>,
    channels: Vec<ChannelRegistry>,
}

impl Simulation {
    /// Parses `stack` and `models`, resolves each requested instance name
    /// (semicolon-separated) against the Stack document, and allocates
    /// Controller Model / channel registry views. Mirrors spec §4.1's
    /// six configure steps.
    pub fn configure(
        config: SimulatorConfiguration,
        stack: &StackDoc,
        models: &[(String, ModelDoc)],
        names: &str,
    ) -> Result<Simulation> {
        let mut config = config;
        config.normalize()?;

        let mut instances = Vec::new();
        let mut channels = Vec::new();

        for (position, name) in names.split(';').filter(|s| !s.is_empty()).enumerate() {
            let entry = stack
                .spec
                .find(name)
                .ok_or_else(|| config_error(format!("no stack entry named {:?}", name)))?;

            let (_, model_doc) = models
                .iter()
                .find(|(model_name, _)| model_name == &entry.model.name)
                .ok_or_else(|| config_error(format!("no model document named {:?}", entry.model.name)))?;

            let mut definition = resolve_definition(model_doc)?;
            definition.resolve();

            let mut instance = ModelInstance::new(entry.name.clone(), definition);
            instance.uid = if entry.uid != 0 {
                entry.uid
            } else {
                derive_uid(position, config.uid)
            };

            trace!("configured instance {:?} (uid {})", instance.name, instance.uid);
            instances.push(instance);
            channels.push(ChannelRegistry::new());
        }

        Ok(Simulation {
            config,
            instances,
            plugins: Vec::new(),
            channels,
        })
    }

    /// Brings up the endpoint, loads each instance's plug-in via the
    /// dynlib/gateway loader in [`load_plugin`], and either returns after a
    /// bus-ready handshake (async/gateway use) or drives the synchronous
    /// tick loop to completion.
    pub fn run<A: Adapter>(&mut self, adapter: &mut A, stop: &ShutdownFlag, synchronous: bool) -> Result<TickOutcome> {
        self.run_with(adapter, stop, synchronous, load_plugin)
    }

    /// As [`Simulation::run`], but resolves each instance's plug-in through
    /// `plugin_for` instead of the dynlib/gateway loader — the seam a test
    /// harness uses to hand a simulation an in-process plug-in without a
    /// shared-library file on disk.
    pub fn run_with<A: Adapter>(
        &mut self,
        adapter: &mut A,
        stop: &ShutdownFlag,
        synchronous: bool,
        mut plugin_for: impl FnMut(&ModelInstance) -> Result<Box<dyn Plugin>>,
    ) -> Result<TickOutcome> {
        bring_up(adapter, stop)?;
        info!("endpoint up, loading {} instance(s)", self.instances.len());

        for (instance, channels) in self.instances.iter_mut().zip(self.channels.iter_mut()) {
            let mut plugin = plugin_for(instance)?;
            plugin.create(&mut instance.controller, channels)?;

            let mut adapter_model = AdapterModel::new(instance.uid, self.config.step_size);
            for channel in channels.channels() {
                if let Some(names) = channels.signals_of(channel) {
                    adapter_model.init_channel(channel, names);
                }
            }
            adapter.register(adapter_model)?;

            self.plugins.push(plugin);
            debug!("instance {:?}: plug-in created", instance.name);
        }

        if !synchronous {
            // Async mode returns immediately after a bus-ready handshake
            // (spec §4.1): every instance checks in once so the bus
            // considers the endpoint live before the caller starts driving
            // ticks itself (e.g. through the Gateway Facade's `sync`).
            for instance in self.instances.iter() {
                adapter.ready(instance.uid)?;
            }
            return Ok(TickOutcome::Continue);
        }

        loop {
            if stop.is_set() {
                return Err(ErrorKind::Cancelled.into());
            }
            match coordinator::tick(&mut self.instances, &self.config, adapter)? {
                TickOutcome::Continue => continue,
                other => return Ok(other),
            }
        }
    }

    /// Tears down in reverse instantiation order: each plug-in's destroy,
    /// then the adapter registration, per spec §4.1.
    pub fn exit<A: Adapter>(&mut self, adapter: &mut A) -> Result<()> {
        for (instance, plugin) in self.instances.iter().zip(self.plugins.iter_mut()).rev() {
            plugin.destroy()?;
            adapter.exit(instance.uid)?;
            info!("instance {:?}: torn down", instance.name);
        }
        self.plugins.clear();
        Ok(())
    }
}

fn config_error(msg: impl Into<String>) -> Error {
    ErrorKind::Configuration(msg.into()).into()
}

fn load_plugin(instance: &ModelInstance) -> Result<Box<dyn Plugin>> {
    if instance.definition.gateway {
        return Ok(Box::new(crate::gateway::GatewayPlugin::new()));
    }
    let path = instance
        .definition
        .full_path
        .as_ref()
        .ok_or_else(|| config_error("model definition has no resolved path"))?;
    Ok(Box::new(crate::plugin::DynlibPlugin::load(instance.name.clone(), path)?))
}

/// Resolves a Model document's definition for the current `(os, arch)`
/// pair (CLI overrides are not modeled here; see spec §4.1 step 4).
fn resolve_definition(model_doc: &ModelDoc) -> Result<ModelDefinition> {
    if model_doc.spec.runtime.gateway.is_some() {
        return Ok(ModelDefinition {
            name: model_doc.metadata.name.clone(),
            search_path: PathBuf::new(),
            file: String::new(),
            full_path: None,
            gateway: true,
        });
    }

    let entry = model_doc
        .spec
        .runtime
        .dynlib_for(OS, ARCH)
        .ok_or_else(|| config_error(format!("no dynlib entry for {}/{}", OS, ARCH)))?;

    let search_path = model_doc
        .metadata
        .annotations
        .path
        .clone()
        .unwrap_or_default();

    Ok(ModelDefinition {
        name: model_doc.metadata.name.clone(),
        search_path,
        file: entry.path.clone(),
        full_path: None,
        gateway: false,
    })
}
