//! Local byte-stream transport for telemetry pipes.
//!
//! Provides the connected stream type that a parent process creates before
//! forking and that its children inherit. Everything else in telepipe builds
//! on top of the [`IpcStream`] type provided here.

pub mod error;
pub mod stream;

pub use error::{Result, TransportError};
pub use stream::{current_pid, IpcStream};
