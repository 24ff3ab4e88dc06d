//! Standalone runner: parses the CLI surface from spec §6 and drives one
//! synchronous simulation run to completion.

use modelc::adapter::LoopbackAdapter;
use modelc::cli::Opt;
use modelc::config::{self, SimulatorConfiguration};
use modelc::lifecycle::Simulation;
use modelc::shutdown::ShutdownFlag;
use std::fs;
use std::process;
use structopt::StructOpt;

fn main() {
    let opt = Opt::from_args();
    modelc::logging::init(opt.level_filter());

    if let Err(e) = run(&opt) {
        log::error!("{}", e);
        process::exit(1);
    }
}

fn run(opt: &Opt) -> modelc::error::Result<()> {
    let stop = ShutdownFlag::new();
    stop.register_signals()?;

    let mut stack = None;
    let mut models = Vec::new();
    for path in &opt.yaml {
        let text = fs::read_to_string(path)?;
        if let Ok(doc) = config::parse_stack(&text) {
            stack = Some(doc);
        } else {
            let doc = config::parse_model(&text)?;
            models.push((doc.metadata.name.clone(), doc));
        }
    }
    let stack = stack.ok_or_else(|| -> modelc::error::Error {
        modelc::error::ErrorKind::Configuration("no Stack document among the given YAML files".into()).into()
    })?;

    let config = SimulatorConfiguration::new("loopback", "embedded");
    let mut simulation = Simulation::configure(config, &stack, &models, &opt.name)?;

    let mut adapter = LoopbackAdapter::new();
    simulation.run(&mut adapter, &stop, true)?;
    simulation.exit(&mut adapter)
}
