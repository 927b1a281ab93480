//! Error types for position stream processing.
//!
//! All errors implement the `std::error::Error` trait and carry structured
//! context for debugging and recovery decisions.
//!
//! ## Error Categories
//!
//! - **Configuration Errors**: Invalid open parameters (empty axis mask, zero rate)
//! - **Transport Errors**: Connection lost or broken mid-stream
//! - **Capacity Errors**: Destination buffers too small for a frame's sample count
//! - **State Errors**: Operation invalid in the current session state
//! - **Frame Errors**: Malformed frame data on the wire
//! - **Recording Errors**: Failures in the raw-byte recording sink
//! - **Invariant Errors**: Internal contract violations (programming bugs)
//!
//! Partial frames are never errors: a decode call that finds no complete frame
//! returns zero consumed bytes and zero samples, signalling "not enough data yet".
//!
//! ## Recovery
//!
//! ```rust
//! use fringe::StreamError;
//!
//! let error = StreamError::transport_lost("connection reset by peer");
//! if error.is_retryable() {
//!     println!("Session must be reopened, but the endpoint may come back");
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for stream operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Main error type for position stream operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    #[error("Invalid stream configuration: {reason}")]
    Configuration { reason: String },

    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(
        "Destination capacity {capacity} too small for frame with {required} samples per axis"
    )]
    Capacity { required: usize, capacity: usize },

    #[error("Operation '{operation}' invalid while session is {state}")]
    State { operation: String, state: String },

    #[error("Malformed frame in {context}: {details}")]
    Frame { context: String, details: String },

    #[error("Recording error: {path}")]
    Recording {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Read timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Internal invariant violated: {details}")]
    Invariant { details: String },
}

impl StreamError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// Transport and timeout failures can clear once the sensor head comes back;
    /// configuration, frame, and invariant failures will recur unchanged. A
    /// capacity error is retryable by the caller with larger destinations since
    /// the offending frame is left unconsumed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Transport { .. } => true,
            StreamError::Timeout { .. } => true,
            StreamError::Capacity { .. } => true,
            StreamError::Configuration { .. } => false,
            StreamError::State { .. } => false,
            StreamError::Frame { .. } => false,
            StreamError::Recording { .. } => false,
            StreamError::Invariant { .. } => false,
        }
    }

    /// Helper constructor for configuration errors.
    pub fn configuration(reason: impl Into<String>) -> Self {
        StreamError::Configuration { reason: reason.into() }
    }

    /// Helper constructor for transport errors without a source.
    pub fn transport_lost(reason: impl Into<String>) -> Self {
        StreamError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with a source.
    pub fn transport_lost_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        StreamError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for invalid-state errors.
    pub fn invalid_state(operation: impl Into<String>, state: impl Into<String>) -> Self {
        StreamError::State { operation: operation.into(), state: state.into() }
    }

    /// Helper constructor for malformed frame errors.
    pub fn malformed_frame(context: impl Into<String>, details: impl Into<String>) -> Self {
        StreamError::Frame { context: context.into(), details: details.into() }
    }

    /// Helper constructor for recording sink errors.
    pub fn recording_error(path: PathBuf, source: std::io::Error) -> Self {
        StreamError::Recording { path, source }
    }

    /// Helper constructor for internal invariant violations.
    pub fn invariant(details: impl Into<String>) -> Self {
        StreamError::Invariant { details: details.into() }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Transport { reason: err.kind().to_string(), source: Some(Box::new(err)) }
    }
}
