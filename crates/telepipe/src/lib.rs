//! Fork-safe telemetry pipes and trace-context propagation.
//!
//! telepipe covers two pieces of a multi-process monitoring agent's data
//! plane: relaying collected telemetry from a forked worker to its parent
//! over a private channel, and carrying distributed-trace identity between
//! processes as a compact delimited string.
//!
//! # Crate Structure
//!
//! - [`transport`]: Connected local byte streams that survive `fork()`
//! - [`frame`]: Length-prefixed, version-tagged framing
//! - [`service`]: Channels, the channel registry and the pipe-backed collector service
//! - [`tracectx`]: Trace context payload codec and supportability counters

/// Re-export transport types.
pub mod transport {
    pub use telepipe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use telepipe_frame::*;
}

/// Re-export service types.
pub mod service {
    pub use telepipe_service::*;
}

/// Re-export trace context types.
pub mod tracectx {
    pub use telepipe_tracectx::*;
}
