//! Structured logging sink for the Model Controller Core.
//!
//! The core itself treats the logger as an external collaborator (per the
//! spec's scope note); this module only wires the `log` facade to a colored
//! stderr sink so the rest of the crate can use `log::{trace,debug,info,
//! warn,error}!` the way the teacher crate's modules do.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::Write;

struct StderrLogger {
    filter: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = term::stderr();
        let line = format!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        match &mut stderr {
            Some(t) => {
                let _ = t.fg(level_color(record.level()));
                let _ = writeln!(t, "{}", line);
                let _ = t.reset();
            }
            None => eprintln!("{}", line),
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_color(level: Level) -> term::color::Color {
    match level {
        Level::Error => term::color::RED,
        Level::Warn => term::color::YELLOW,
        Level::Info => term::color::GREEN,
        Level::Debug => term::color::CYAN,
        Level::Trace => term::color::WHITE,
    }
}

/// Installs the stderr logger at the given verbosity. Idempotent: a second
/// call is a no-op, since `log::set_logger` can only succeed once per
/// process.
pub fn init(filter: LevelFilter) {
    let logger = Box::new(StderrLogger { filter });
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(filter);
    }
}
