//! Plug-in loading and the C ABI boundary (spec §4.2, §6).

pub mod abi;
mod loader;

pub use loader::{DynlibPlugin, Plugin};
