//! Sampling rate for position streams

use serde::{Deserialize, Serialize};

/// Sampling rate of a position stream in hertz.
///
/// The rate is carried verbatim in frame headers so recorded streams stay
/// self-describing. Construction rejects zero, keeping the "positive rate"
/// invariant out of every downstream check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRate(u32);

impl SampleRate {
    /// 10 kHz streaming rate.
    pub const KHZ_10: SampleRate = SampleRate(10_000);

    /// 100 kHz streaming rate, the reference acquisition rate.
    pub const KHZ_100: SampleRate = SampleRate(100_000);

    /// 1 MHz streaming rate.
    pub const MHZ_1: SampleRate = SampleRate(1_000_000);

    /// Create a rate from hertz. Returns `None` for zero.
    pub fn from_hz(hz: u32) -> Option<Self> {
        if hz == 0 { None } else { Some(Self(hz)) }
    }

    /// Rate in hertz.
    pub fn hz(&self) -> u32 {
        self.0
    }

    /// Interval between consecutive samples.
    pub fn sample_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.0 as f64)
    }
}

impl std::fmt::Display for SampleRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 % 1_000_000 == 0 {
            write!(f, "{} MHz", self.0 / 1_000_000)
        } else if self.0 % 1_000 == 0 {
            write!(f, "{} kHz", self.0 / 1_000)
        } else {
            write!(f, "{} Hz", self.0)
        }
    }
}
