//! Error handling.
//!
//! Error taxonomy for the Model Controller Core, based on the [`failure`]
//! crate. [`Error`] wraps a [`Context<ErrorKind>`], the way the rest of this
//! family of crates does it.
//!
//! [`failure`]: ../../failure/index.html
//! [`Context<ErrorKind>`]: ../../failure/struct.Context.html

use failure::{Backtrace, Context, Fail};
use std::{fmt, fmt::Display, result};

/// Crate-wide [`Result`] alias.
pub type Result<T> = result::Result<T, Error>;

pub use failure::ResultExt;

/// Error type for this crate. Implements [`Fail`].
#[derive(Debug)]
pub struct Error {
    ctx: Context<ErrorKind>,
}

/// The error taxonomy from the design's error handling table.
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
    /// Missing descriptor node, unresolved path, bad dynlib table entry.
    #[fail(display = "configuration error: {}", _0)]
    Configuration(String),

    /// Dynlib open or symbol resolution failure.
    #[fail(display = "plugin load error: {}", _0)]
    PluginLoad(String),

    /// `adapter_ready` reported a bus timeout. Recoverable by the caller.
    #[fail(display = "bus timeout")]
    BusTimeout,

    /// Gateway `sync(t)` called with `t` behind the bus. Recoverable.
    #[fail(display = "gateway is behind the bus")]
    GatewayBehind,

    /// A `do_step` handler returned a negative status.
    #[fail(display = "step error in function {:?}: code {}", function, code)]
    Step { function: String, code: i32 },

    /// The stop flag fired; the run was cancelled, not failed.
    #[fail(display = "cancelled")]
    Cancelled,

    /// Generic invalid argument.
    #[fail(display = "invalid argument: {}", _0)]
    InvalidArgument(String),

    /// Generic invalid operation.
    #[fail(display = "invalid operation: {}", _0)]
    InvalidOperation(String),

    #[fail(display = "channel error: {}", _0)]
    Channel(String),

    #[fail(display = "io error: {}", _0)]
    Io(String),

    #[fail(display = "yaml error: {}", _0)]
    Yaml(String),
}

/// Shorthand for an invalid-argument error.
pub fn inv_arg<T>(s: impl Into<String>) -> Result<T> {
    Err(ErrorKind::InvalidArgument(s.into()).into())
}

/// Shorthand for an invalid-operation error.
pub fn inv_op<T>(s: impl Into<String>) -> Result<T> {
    Err(ErrorKind::InvalidOperation(s.into()).into())
}

/// Shorthand for a configuration error.
pub fn cfg_err<T>(s: impl Into<String>) -> Result<T> {
    Err(ErrorKind::Configuration(s.into()).into())
}

impl Error {
    /// Returns the underlying [`ErrorKind`] of this error.
    pub fn kind(&self) -> &ErrorKind {
        self.ctx.get_context()
    }
}

impl Fail for Error {
    fn cause(&self) -> Option<&dyn Fail> {
        self.ctx.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.ctx.backtrace()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.ctx.fmt(f)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            ctx: Context::new(kind),
        }
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(ctx: Context<ErrorKind>) -> Error {
        Error { ctx }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error {
            ctx: Context::new(ErrorKind::Io(error.to_string())),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Error {
        Error {
            ctx: Context::new(ErrorKind::Yaml(error.to_string())),
        }
    }
}

impl<T> From<crossbeam_channel::SendError<T>> for Error {
    fn from(error: crossbeam_channel::SendError<T>) -> Error {
        Error {
            ctx: Context::new(ErrorKind::Channel(error.to_string())),
        }
    }
}

impl From<crossbeam_channel::RecvError> for Error {
    fn from(error: crossbeam_channel::RecvError) -> Error {
        Error {
            ctx: Context::new(ErrorKind::Channel(error.to_string())),
        }
    }
}

impl From<libloading::Error> for Error {
    fn from(error: libloading::Error) -> Error {
        Error {
            ctx: Context::new(ErrorKind::PluginLoad(error.to_string())),
        }
    }
}
