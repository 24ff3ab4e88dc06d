//! Plug-in loading: resolves a dynlib against either ABI generation named
//! in spec §6/§9 and exposes both behind one [`Plugin`] trait so the
//! Lifecycle Manager never needs to know which generation it loaded.

use crate::error::{inv_op, ErrorKind, Result};
use crate::model::{ControllerModel, DoStep, ModelFunction};
use crate::plugin::abi::{
    ActiveRegistration, ModelCreateFn, ModelDestroyFn, ModelExitFn, ModelSetupFn, ModelStepFn,
};
use crate::signal::ChannelRegistry;
use libloading::{Library, Symbol};
use std::ffi::c_void;
use std::fmt;
use std::path::Path;
use std::ptr;

/// What a plug-in does during `create`/`destroy`, common to a loaded dynlib
/// and the in-process Gateway plug-in.
pub trait Plugin: fmt::Debug {
    /// Registers this plug-in's Model Functions and channels against `ctrl`
    /// and `channels`.
    fn create(&mut self, ctrl: &mut ControllerModel, channels: &mut ChannelRegistry) -> Result<()>;

    /// Releases any plug-in-held resources. Called once, in reverse
    /// instantiation order, during teardown.
    fn destroy(&mut self) -> Result<()>;
}

/// A dynlib resolved against the newer vtable-style ABI: `model_create`
/// returns an opaque descriptor that `model_step` advances directly, one
/// combined step per instance.
struct ModernAbi {
    step: ModelStepFn,
    destroy: ModelDestroyFn,
    desc: *mut c_void,
}

/// A dynlib resolved against the legacy ABI: `model_setup` calls back into
/// [`crate::plugin::abi`]'s host callbacks to register its own functions
/// and channels, under the [`ActiveRegistration`] guard.
struct LegacyAbi {
    setup: ModelSetupFn,
    exit: Option<ModelExitFn>,
}

enum ResolvedAbi {
    Modern(ModernAbi),
    Legacy(LegacyAbi),
}

/// A loaded dynamic library bound to one resolved ABI generation. The
/// [`Library`] handle is kept alive for as long as any resolved symbol from
/// it might still be called.
pub struct DynlibPlugin {
    name: String,
    _library: Library,
    abi: ResolvedAbi,
}

impl fmt::Debug for DynlibPlugin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DynlibPlugin").field("name", &self.name).finish()
    }
}

impl DynlibPlugin {
    /// Opens `path` and resolves symbols, preferring the modern
    /// `model_create`/`model_step`/`model_destroy` triple and falling back
    /// to `model_setup`/`model_exit` when it is absent.
    pub fn load(name: impl Into<String>, path: &Path) -> Result<DynlibPlugin> {
        let name = name.into();
        let library = Library::new(path)
            .map_err(|e| ErrorKind::PluginLoad(format!("{}: {}", path.display(), e)))?;

        let modern: libloading::Result<Symbol<ModelCreateFn>> =
            unsafe { library.get(b"model_create\0") };

        let abi = match modern {
            Ok(create) => {
                let step: Symbol<ModelStepFn> = unsafe {
                    library.get(b"model_step\0").map_err(|e| {
                        ErrorKind::PluginLoad(format!("{}: missing model_step ({})", path.display(), e))
                    })?
                };
                let destroy: Symbol<ModelDestroyFn> = unsafe {
                    library.get(b"model_destroy\0").map_err(|e| {
                        ErrorKind::PluginLoad(format!("{}: missing model_destroy ({})", path.display(), e))
                    })?
                };
                let desc = unsafe { create(ptr::null_mut()) };
                if desc.is_null() {
                    return Err(
                        ErrorKind::PluginLoad(format!("{}: model_create returned null", path.display())).into(),
                    );
                }
                ResolvedAbi::Modern(ModernAbi {
                    step: unsafe { step.into_raw().into_raw() },
                    destroy: unsafe { destroy.into_raw().into_raw() },
                    desc,
                })
            }
            Err(_) => {
                let setup: Symbol<ModelSetupFn> = unsafe {
                    library.get(b"model_setup\0").map_err(|e| {
                        ErrorKind::PluginLoad(format!(
                            "{}: neither model_create nor model_setup found ({})",
                            path.display(),
                            e
                        ))
                    })?
                };
                let exit: Option<Symbol<ModelExitFn>> = unsafe { library.get(b"model_exit\0").ok() };
                ResolvedAbi::Legacy(LegacyAbi {
                    setup: unsafe { setup.into_raw().into_raw() },
                    exit: exit.map(|s| unsafe { s.into_raw().into_raw() }),
                })
            }
        };

        Ok(DynlibPlugin {
            name,
            _library: library,
            abi,
        })
    }
}

impl Plugin for DynlibPlugin {
    fn create(&mut self, ctrl: &mut ControllerModel, channels: &mut ChannelRegistry) -> Result<()> {
        match &self.abi {
            ResolvedAbi::Modern(modern) => {
                // The modern ABI has no callback surface: the loaded
                // library already declared its own channels when it built
                // the descriptor `model_create` returned. All this core
                // does is wrap the combined step in one Model Function
                // named after the instance itself.
                let step = modern.step;
                let desc = modern.desc;
                let do_step: DoStep = Box::new(move |model_time, stop_time, _bindings| unsafe {
                    step(desc, model_time, stop_time)
                });
                let function = ModelFunction::new(self.name.clone(), 0.0, do_step);
                ctrl.register_model_function(function)
            }
            ResolvedAbi::Legacy(legacy) => {
                let guard = ActiveRegistration::enter(ctrl, channels);
                let status = unsafe { (legacy.setup)(ptr::null_mut()) };
                drop(guard);
                if status != 0 {
                    return inv_op(format!("model_setup returned {}", status));
                }
                Ok(())
            }
        }
    }

    fn destroy(&mut self) -> Result<()> {
        match &self.abi {
            ResolvedAbi::Modern(modern) => {
                unsafe { (modern.destroy)(modern.desc) };
                Ok(())
            }
            ResolvedAbi::Legacy(legacy) => {
                if let Some(exit) = legacy.exit {
                    let status = unsafe { exit(ptr::null_mut()) };
                    if status != 0 {
                        return inv_op(format!("model_exit returned {}", status));
                    }
                }
                Ok(())
            }
        }
    }
}
