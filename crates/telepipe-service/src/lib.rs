//! Telemetry reporting through a process-local pipe.
//!
//! A forked worker reports through [`PipeService`] exactly as it would
//! through a network collector client. Each call boxes its batch into an
//! [`Envelope`] and writes it as one frame on a [`Channel`] that the parent
//! created before forking and registered in a [`ChannelRegistry`].

pub mod channel;
pub mod collector;
pub mod envelope;
pub mod error;
pub mod pipe;
pub mod registry;
pub mod service;

pub use channel::{Channel, ChannelId};
pub use collector::{CollectorService, MetricDataResponse};
pub use envelope::{Endpoint, Envelope, ReceivedEnvelope};
pub use error::{Result, ServiceError};
#[cfg(unix)]
pub use pipe::PipeChannel;
pub use registry::ChannelRegistry;
pub use service::{PipeService, PipeServiceConfig, MARSHAL_CHECK_PATH};
