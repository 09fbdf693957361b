//! Length-prefixed message framing for telemetry pipes.
//!
//! Every envelope written into a pipe is framed with:
//! - A 2-byte magic number ("TP") for stream synchronization
//! - A 4-byte little-endian payload length
//! - A 2-byte little-endian wire version
//!
//! One frame is one channel write. Readers always get complete frames.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE, WIRE_VERSION,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
