//! CLI surface (spec §6, §4.9): shared by the standalone binary and the
//! Gateway Facade's synthesised invocation, so the two entry points parse
//! argv identically.

use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "modelc", about = "Model Controller Core runner")]
pub struct Opt {
    /// Instance name(s) to run, semicolon-separated.
    #[structopt(long)]
    pub name: String,

    /// Log level filter.
    #[structopt(long, default_value = "info")]
    pub log_level: String,

    /// Stack/Model YAML documents.
    #[structopt(parse(from_os_str))]
    pub yaml: Vec<PathBuf>,
}

impl Opt {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
