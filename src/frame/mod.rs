//! Frame layer: wire format, byte accumulation, and the pure decoder
//!
//! The frame is the atomic decodable unit of the stream. [`FrameBuffer`]
//! accumulates raw transport bytes, [`decode_frames`] extracts complete
//! frames from its pending region, and [`format`] defines the wire layout
//! shared with the recording reader and test fixtures.

pub mod buffer;
pub mod decoder;
pub mod format;

pub use buffer::FrameBuffer;
pub use decoder::{DecodeOutcome, decode_frames};
pub use format::{FrameHeader, HEADER_SIZE, MAX_SAMPLES_PER_FRAME, encode_frame};
