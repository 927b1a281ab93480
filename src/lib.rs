//! Type-safe Rust library for multi-axis position streaming.
//!
//! Fringe decodes the raw byte stream of a network-attached interferometric
//! sensor head into per-axis signed 64-bit position samples, with optional
//! raw-byte recording for offline replay.
//!
//! # Features
//!
//! - **Live Streaming**: pull-style read/decode sessions over TCP
//! - **Whole-Frame Decoding**: partial frames are buffered, never half-decoded
//! - **Recording**: raw byte mirroring to disk, replayable through the same decoder
//! - **Acquisition Driver**: background task publishing decoded batches as a stream
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fringe::{AxisMask, SampleRate, SessionConfig, StreamSession};
//!
//! #[tokio::main]
//! async fn main() -> fringe::Result<()> {
//!     let config = SessionConfig::new(
//!         "192.168.1.1:7230",
//!         true,
//!         SampleRate::KHZ_100,
//!         AxisMask::from_channels(&[1, 3]),
//!     )?;
//!
//!     let mut session = StreamSession::open(config).await?;
//!     let columns = session.read_samples(5000).await?;
//!     println!("axis 1 first position: {}", columns[0][0]);
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod config;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Stream decoding architecture
pub mod driver;
pub mod frame;
pub mod session;
pub mod transport;

// Recording and replay
pub mod recording;

// Core exports
pub use config::{DEFAULT_READ_TIMEOUT, SessionConfig};
pub use error::{Result, StreamError};
pub use types::*;

// Frame layer exports
pub use frame::{DecodeOutcome, FrameBuffer, MAX_SAMPLES_PER_FRAME, decode_frames, encode_frame};

// Session and driver exports
pub use driver::{Acquisition, AcquisitionChannels};
pub use session::StreamSession;
pub use transport::{TcpTransport, Transport};

// Recording exports
pub use recording::{Recorder, RecordingReader};

/// Unified entry point for stream sessions and recording replay.
///
/// # Examples
///
/// ## Live streaming
/// ```rust,no_run
/// use fringe::{AxisMask, Fringe, SampleRate, SessionConfig};
///
/// #[tokio::main]
/// async fn main() -> fringe::Result<()> {
///     let config = SessionConfig::new(
///         "192.168.1.1:7230",
///         false,
///         SampleRate::KHZ_100,
///         AxisMask::from_channels(&[1]),
///     )?;
///     let session = Fringe::open(config).await?;
///     // Use session...
///     Ok(())
/// }
/// ```
///
/// ## Recording replay (offline)
/// ```rust,no_run
/// use fringe::{AxisMask, Fringe};
///
/// fn main() -> fringe::Result<()> {
///     let mut reader = Fringe::replay("session.raw", AxisMask::from_channels(&[1]))?;
///     while let Some(batch) = reader.next_batch()? {
///         println!("{} samples", batch.len());
///     }
///     Ok(())
/// }
/// ```
pub struct Fringe;

impl Fringe {
    /// Open a live session against the configured sensor head.
    pub async fn open(config: SessionConfig) -> Result<StreamSession> {
        StreamSession::open(config).await
    }

    /// Open a recorded raw stream for offline replay.
    pub fn replay<P: AsRef<std::path::Path>>(
        path: P,
        axis_mask: AxisMask,
    ) -> Result<RecordingReader> {
        RecordingReader::open(path, axis_mask)
    }
}
