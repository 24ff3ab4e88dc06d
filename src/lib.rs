//! Model Controller core for a distributed co-simulation runtime.
//!
//! One process hosts one or more model instances (each a plug-in
//! implementing a fixed ABI) that exchange time-varying signals over a
//! shared bus under a globally coordinated stepping protocol. This crate
//! is the per-process core: it loads plug-ins, marshals signals between
//! plug-in-local buffers and the bus-facing signal table, drives the
//! per-tick state machine, and exposes a Gateway Facade for embedding in
//! an external time source.
//!
//! The wire protocol, transport, YAML grammar, and plug-ins themselves are
//! external collaborators; [`adapter::Adapter`] and [`plugin::Plugin`] are
//! the boundaries this crate depends on rather than implements.

pub mod adapter;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod logging;
pub mod marshal;
pub mod model;
pub mod plugin;
pub mod shutdown;
pub mod signal;
