//! Session configuration surface

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{AxisMask, SampleRate};
use crate::{Result, StreamError};

/// Default bound on how long a single raw read may wait for transport data.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for opening a stream session.
///
/// Mirrors the open call of the sensor head's streaming interface: target
/// address, recording flag, sampling rate, and the axis selection bitmask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Network endpoint of the sensor head, e.g. `192.168.1.1:7230`
    pub address: String,

    /// Whether raw-byte recording may be started on this session
    pub recording_enabled: bool,

    /// Sampling rate requested from the sensor head
    pub rate: SampleRate,

    /// Channels to decode into destination slots
    pub axis_mask: AxisMask,

    /// Bound on how long a single `read_raw` may wait for data
    #[serde(default = "default_read_timeout")]
    pub read_timeout: Duration,
}

fn default_read_timeout() -> Duration {
    DEFAULT_READ_TIMEOUT
}

impl SessionConfig {
    /// Create a validated configuration.
    ///
    /// Fails with a configuration error when the axis mask is empty; a zero
    /// rate is unrepresentable by [`SampleRate`] and needs no check here.
    pub fn new(
        address: impl Into<String>,
        recording_enabled: bool,
        rate: SampleRate,
        axis_mask: AxisMask,
    ) -> Result<Self> {
        let config = Self {
            address: address.into(),
            recording_enabled,
            rate,
            axis_mask,
            read_timeout: DEFAULT_READ_TIMEOUT,
        };
        config.validate()?;
        Ok(config)
    }

    /// Override the read timeout bound.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Validate the configuration invariants.
    pub fn validate(&self) -> Result<()> {
        if self.axis_mask.is_empty() {
            return Err(StreamError::configuration("axis mask selects no channels"));
        }
        if self.address.trim().is_empty() {
            return Err(StreamError::configuration("target address is empty"));
        }
        if self.read_timeout.is_zero() {
            return Err(StreamError::configuration("read timeout must be non-zero"));
        }
        Ok(())
    }
}
