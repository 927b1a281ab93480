//! Sample batch types for the acquisition driver

use super::{AxisMask, ChannelId, SampleRate};

/// One batch of decoded position samples flowing out of the acquisition task.
///
/// Columns are index-aligned: `samples[a][i]` for every axis slot `a` refers
/// to the same sampling instant. Axis slots follow ascending channel order
/// within the session's axis mask.
#[derive(Debug, Clone)]
pub struct SampleBatch {
    /// Requested channels, in destination-slot order
    pub axes: Vec<ChannelId>,

    /// One column of signed 64-bit positions per axis slot
    pub samples: Vec<Vec<i64>>,

    /// Sampling rate the batch was acquired at
    pub rate: SampleRate,
}

impl SampleBatch {
    /// Build a batch from per-axis columns.
    ///
    /// Callers guarantee one column per channel in `mask`, all of equal length.
    pub fn new(mask: AxisMask, samples: Vec<Vec<i64>>, rate: SampleRate) -> Self {
        debug_assert_eq!(mask.count(), samples.len());
        Self { axes: mask.channels().collect(), samples, rate }
    }

    /// Number of samples per axis in this batch.
    pub fn len(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    /// True when the batch carries no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column for a specific channel, if it is part of this batch.
    pub fn channel(&self, channel: ChannelId) -> Option<&[i64]> {
        let slot = self.axes.iter().position(|&c| c == channel)?;
        Some(&self.samples[slot])
    }
}
