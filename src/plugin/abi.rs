//! The C plug-in ABI: exact symbol signatures from spec §6, plus the host
//! callbacks a plugin's `create`/`setup` uses to register its functions and
//! channels.
//!
//! The plugin ABI passes no context parameter (it predates this rewrite),
//! so the callbacks below reach the in-flight [`ControllerModel`] and
//! [`ChannelRegistry`] through a module-private thread-local cell, scoped
//! by [`ActiveRegistration`] to the duration of one `create`/`setup` call —
//! the "confine the singleton to a module-private cell with explicit
//! init/teardown" option from the Design Notes.

use crate::error::Result;
use crate::model::{ControllerModel, DoStep, ModelFunction};
use crate::signal::{ChannelBinding, ChannelRegistry};
use std::cell::RefCell;
use std::ffi::CStr;
use std::os::raw::{c_char, c_void};

/// `model_create(ModelDesc*) -> ModelDesc*`
pub type ModelCreateFn = unsafe extern "C" fn(desc: *mut c_void) -> *mut c_void;
/// `model_step(ModelDesc*, double*, double) -> int`
pub type ModelStepFn = unsafe extern "C" fn(desc: *mut c_void, model_time: *mut f64, stop_time: f64) -> i32;
/// `model_destroy(ModelDesc*) -> void`
pub type ModelDestroyFn = unsafe extern "C" fn(desc: *mut c_void);

/// `model_setup(ModelInstanceSpec*) -> int` (older ABI, spec §6/§9)
pub type ModelSetupFn = unsafe extern "C" fn(spec: *mut c_void) -> i32;
/// `model_exit(ModelInstanceSpec*) -> int` (older ABI, optional)
pub type ModelExitFn = unsafe extern "C" fn(spec: *mut c_void) -> i32;

/// A plugin-supplied step callback bound to a registered Model Function via
/// [`modelc_register_function`], carrying the plugin's own opaque user data.
pub type LegacyStepFn =
    unsafe extern "C" fn(user_data: *mut c_void, model_time: *mut f64, stop_time: f64) -> i32;

/// Wraps a raw pointer to assert it is safe to move into the boxed step
/// closure. Soundness is the plugin's responsibility, the same trust
/// boundary any C plugin ABI has.
struct SendPtr(*mut c_void);
unsafe impl Send for SendPtr {}

thread_local! {
    static ACTIVE: RefCell<Option<(*mut ControllerModel, *mut ChannelRegistry)>> =
        RefCell::new(None);
}

/// RAII guard making `(ctrl, channels)` reachable to the host callbacks for
/// the lifetime of one `create`/`setup` invocation.
pub struct ActiveRegistration;

impl ActiveRegistration {
    pub fn enter(ctrl: &mut ControllerModel, channels: &mut ChannelRegistry) -> ActiveRegistration {
        ACTIVE.with(|cell| {
            *cell.borrow_mut() = Some((ctrl as *mut ControllerModel, channels as *mut ChannelRegistry));
        });
        ActiveRegistration
    }
}

impl Drop for ActiveRegistration {
    fn drop(&mut self) {
        ACTIVE.with(|cell| *cell.borrow_mut() = None);
    }
}

fn with_active<R>(f: impl FnOnce(&mut ControllerModel, &mut ChannelRegistry) -> R) -> Option<R> {
    ACTIVE.with(|cell| {
        let guard = cell.borrow();
        let (ctrl, channels) = (*guard)?;
        // Safe: valid only while an `ActiveRegistration` guard is alive on
        // the same thread, which is exactly the lifetime of the pointers.
        Some(f(unsafe { &mut *ctrl }, unsafe { &mut *channels }))
    })
}

/// Host callback: declares a channel and the signal names it carries.
#[no_mangle]
pub unsafe extern "C" fn modelc_init_channel(
    channel_name: *const c_char,
    signal_names: *const *const c_char,
    count: usize,
) -> i32 {
    let channel = match CStr::from_ptr(channel_name).to_str() {
        Ok(s) => s.to_string(),
        Err(_) => return -1,
    };
    let mut names = Vec::with_capacity(count);
    for i in 0..count {
        let ptr = *signal_names.add(i);
        match CStr::from_ptr(ptr).to_str() {
            Ok(s) => names.push(s.to_string()),
            Err(_) => return -1,
        }
    }
    match with_active(|_, channels| channels.declare(channel, &names)) {
        Some(()) => 0,
        None => -1,
    }
}

/// Host callback: registers a Model Function bound to one channel, wrapping
/// the plugin-supplied step pointer.
#[no_mangle]
pub unsafe extern "C" fn modelc_register_function(
    name: *const c_char,
    step_size: f64,
    channel_name: *const c_char,
    with_scalars: i32,
    with_binaries: i32,
    step: LegacyStepFn,
    user_data: *mut c_void,
) -> i32 {
    let name = match CStr::from_ptr(name).to_str() {
        Ok(s) => s.to_string(),
        Err(_) => return -1,
    };
    let channel = match CStr::from_ptr(channel_name).to_str() {
        Ok(s) => s.to_string(),
        Err(_) => return -1,
    };
    let user_data = SendPtr(user_data);

    let result: Option<Result<()>> = with_active(|ctrl, channels| {
        let signal_names = channels
            .signals_of(&channel)
            .map(|s| s.to_vec())
            .unwrap_or_default();
        let do_step: DoStep = Box::new(move |model_time, stop_time, _bindings| unsafe {
            step(user_data.0, model_time, stop_time)
        });
        let mut function = ModelFunction::new(name.clone(), step_size, do_step);
        function.bind_channel(ChannelBinding::new(
            channel.clone(),
            signal_names,
            with_scalars != 0,
            with_binaries != 0,
        ));
        ctrl.register_model_function(function)
    });

    match result {
        Some(Ok(())) => 0,
        _ => -1,
    }
}
