//! Axis selection bitmask for multi-channel streams

use serde::{Deserialize, Serialize};

/// Identifier of one measurement channel (position axis).
///
/// Channels are numbered from 1, matching the sensor head's front panel.
/// Channel `n` occupies bit `n - 1` in an [`AxisMask`].
pub type ChannelId = u8;

/// Highest channel id representable in the 32-bit mask.
pub const MAX_CHANNEL_ID: ChannelId = 32;

/// Bitset selecting which channels a session requests.
///
/// The mask is fixed for the lifetime of a session. Destination slots for
/// decoded samples follow ascending channel order within the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisMask(u32);

impl AxisMask {
    /// Create a mask directly from raw bits.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Create a mask selecting the given channels.
    ///
    /// Channel ids outside `1..=32` are ignored.
    pub fn from_channels(channels: &[ChannelId]) -> Self {
        let mut bits = 0u32;
        for &channel in channels {
            if (1..=MAX_CHANNEL_ID).contains(&channel) {
                bits |= 1 << (channel - 1);
            }
        }
        Self(bits)
    }

    /// Check whether a specific channel is selected.
    pub fn contains(&self, channel: ChannelId) -> bool {
        if !(1..=MAX_CHANNEL_ID).contains(&channel) {
            return false;
        }
        (self.0 & (1 << (channel - 1))) != 0
    }

    /// Number of selected channels.
    pub fn count(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// True when no channel is selected.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Intersection with another mask.
    pub fn intersection(&self, other: AxisMask) -> AxisMask {
        AxisMask(self.0 & other.0)
    }

    /// Iterate the selected channels in ascending order.
    pub fn channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        (1..=MAX_CHANNEL_ID).filter(|&channel| self.contains(channel))
    }

    /// Get the raw u32 value as carried in frame headers.
    pub fn bits(&self) -> u32 {
        self.0
    }
}
