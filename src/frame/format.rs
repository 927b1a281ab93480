//! Frame wire format structures and parsing
//!
//! Defines the length-delimited binary frame carrying multi-channel position
//! samples, and provides the parsing and encoding functions shared by the
//! live decoder, the recording reader, and the test fixtures.
//!
//! ## Frame Structure
//!
//! Each frame is a 20-byte little-endian header followed by one sample block
//! per carried channel:
//!
//! 1. **Header** (20 bytes) - magic, version, channel mask, sample count, rate
//! 2. **Sample Blocks** - for each set channel bit in ascending order,
//!    `sample_count` signed 64-bit little-endian position values
//!
//! A frame is decodable iff the header and the full declared payload are
//! present; there is no partial decode.
//!
//! ## Robustness
//!
//! - Explicit little-endian byte order handling throughout
//! - Bounds checking on all field reads
//! - Header-declared payload length is cross-checked against the channel
//!   mask and sample count before any sample is copied

use tracing::trace;

use crate::types::{AxisMask, ChannelId, SampleRate};
use crate::{Result, StreamError};

/// Magic bytes opening every frame header.
pub const FRAME_MAGIC: u16 = 0x4652;

/// Current frame format version.
pub const FORMAT_VERSION: u8 = 1;

/// Size of the frame header in bytes.
pub const HEADER_SIZE: usize = 20;

/// Maximum number of samples one frame may carry per channel.
pub const MAX_SAMPLES_PER_FRAME: usize = 1023;

/// Parsed frame header.
///
/// Field layout (little-endian):
///
/// | offset | size | field         |
/// |--------|------|---------------|
/// | 0      | 2    | magic         |
/// | 2      | 1    | version       |
/// | 3      | 1    | flags         |
/// | 4      | 4    | channel mask  |
/// | 8      | 2    | sample count  |
/// | 10     | 2    | reserved      |
/// | 12     | 4    | rate in Hz    |
/// | 16     | 4    | payload bytes |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub channel_mask: AxisMask,
    pub sample_count: usize,
    pub rate_hz: u32,
    pub payload_len: usize,
}

impl FrameHeader {
    /// Total frame length including the header.
    pub fn total_len(&self) -> usize {
        HEADER_SIZE + self.payload_len
    }

    /// Parse a header from the start of `window`.
    ///
    /// Returns `Ok(None)` when fewer than [`HEADER_SIZE`] bytes are available,
    /// the normal "not enough data yet" condition. Malformed headers are a
    /// frame error: the stream is length-delimited, so a corrupt header makes
    /// resynchronization unsafe.
    pub fn parse(window: &[u8]) -> Result<Option<Self>> {
        if window.len() < HEADER_SIZE {
            return Ok(None);
        }

        let magic = parse_u16_le(window, 0)?;
        if magic != FRAME_MAGIC {
            return Err(StreamError::malformed_frame(
                "header",
                format!("bad magic {magic:#06x}, expected {FRAME_MAGIC:#06x}"),
            ));
        }

        let version = window[2];
        if version != FORMAT_VERSION {
            return Err(StreamError::malformed_frame(
                "header",
                format!("unsupported format version {version}, expected {FORMAT_VERSION}"),
            ));
        }

        let channel_mask = AxisMask::from_bits(parse_u32_le(window, 4)?);
        let sample_count = parse_u16_le(window, 8)? as usize;
        let rate_hz = parse_u32_le(window, 12)?;
        let payload_len = parse_u32_le(window, 16)? as usize;

        let header = Self { channel_mask, sample_count, rate_hz, payload_len };
        header.validate()?;

        trace!(
            channels = header.channel_mask.count(),
            samples = header.sample_count,
            payload = header.payload_len,
            "parsed frame header"
        );

        Ok(Some(header))
    }

    /// Validate header field consistency.
    pub fn validate(&self) -> Result<()> {
        if self.channel_mask.is_empty() {
            return Err(StreamError::malformed_frame("header", "frame carries no channels"));
        }

        if self.sample_count == 0 || self.sample_count > MAX_SAMPLES_PER_FRAME {
            return Err(StreamError::malformed_frame(
                "header",
                format!(
                    "sample count {} outside 1..={}",
                    self.sample_count, MAX_SAMPLES_PER_FRAME
                ),
            ));
        }

        if self.rate_hz == 0 {
            return Err(StreamError::malformed_frame("header", "rate marker is zero"));
        }

        let expected_payload = self
            .channel_mask
            .count()
            .checked_mul(self.sample_count)
            .and_then(|n| n.checked_mul(8))
            .ok_or_else(|| {
                StreamError::malformed_frame("header", "payload length calculation overflowed")
            })?;

        if self.payload_len != expected_payload {
            return Err(StreamError::malformed_frame(
                "header",
                format!(
                    "declared payload {} bytes, but {} channels x {} samples requires {}",
                    self.payload_len,
                    self.channel_mask.count(),
                    self.sample_count,
                    expected_payload
                ),
            ));
        }

        Ok(())
    }

    /// Byte offset of a channel's sample block within the frame.
    ///
    /// The channel must be present in the frame's mask.
    pub fn channel_block_offset(&self, channel: ChannelId) -> Option<usize> {
        if !self.channel_mask.contains(channel) {
            return None;
        }
        let preceding = self.channel_mask.channels().take_while(|&c| c != channel).count();
        Some(HEADER_SIZE + preceding * self.sample_count * 8)
    }
}

/// Encode one frame from per-channel sample columns.
///
/// Blocks are written in ascending channel order regardless of input order.
/// All columns must be the same length, between 1 and
/// [`MAX_SAMPLES_PER_FRAME`]. This is the synthetic counterpart of the live
/// stream, used by fixtures, benches, and offline tooling.
pub fn encode_frame(channels: &[(ChannelId, &[i64])], rate: SampleRate) -> Result<Vec<u8>> {
    let first = channels
        .first()
        .ok_or_else(|| StreamError::configuration("cannot encode a frame with no channels"))?;
    let sample_count = first.1.len();

    if sample_count == 0 || sample_count > MAX_SAMPLES_PER_FRAME {
        return Err(StreamError::configuration(format!(
            "sample count {sample_count} outside 1..={MAX_SAMPLES_PER_FRAME}"
        )));
    }

    let mut ids: Vec<ChannelId> = Vec::with_capacity(channels.len());
    for (channel, samples) in channels {
        if samples.len() != sample_count {
            return Err(StreamError::configuration(format!(
                "channel {channel} has {} samples, expected {sample_count}",
                samples.len()
            )));
        }
        ids.push(*channel);
    }
    let mask = AxisMask::from_channels(&ids);
    if mask.count() != channels.len() {
        return Err(StreamError::configuration("duplicate or out-of-range channel ids"));
    }

    let payload_len = channels.len() * sample_count * 8;
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload_len);

    frame.extend_from_slice(&FRAME_MAGIC.to_le_bytes());
    frame.push(FORMAT_VERSION);
    frame.push(0); // flags
    frame.extend_from_slice(&mask.bits().to_le_bytes());
    frame.extend_from_slice(&(sample_count as u16).to_le_bytes());
    frame.extend_from_slice(&0u16.to_le_bytes()); // reserved
    frame.extend_from_slice(&rate.hz().to_le_bytes());
    frame.extend_from_slice(&(payload_len as u32).to_le_bytes());

    for channel in mask.channels() {
        let samples = channels
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, s)| *s)
            .ok_or_else(|| StreamError::invariant("channel vanished between mask and encode"))?;
        for sample in samples {
            frame.extend_from_slice(&sample.to_le_bytes());
        }
    }

    Ok(frame)
}

/// Safe byte parsing helpers with bounds checking
fn parse_u16_le(data: &[u8], offset: usize) -> Result<u16> {
    if offset + 2 > data.len() {
        return Err(StreamError::malformed_frame(
            "field parsing",
            format!("need 2 bytes at offset {offset}, have {}", data.len() - offset),
        ));
    }
    Ok(u16::from_le_bytes([data[offset], data[offset + 1]]))
}

fn parse_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    if offset + 4 > data.len() {
        return Err(StreamError::malformed_frame(
            "field parsing",
            format!("need 4 bytes at offset {offset}, have {}", data.len() - offset),
        ));
    }
    Ok(u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]))
}

/// Read one i64 sample from a payload position.
pub(crate) fn parse_i64_le(data: &[u8], offset: usize) -> Result<i64> {
    if offset + 8 > data.len() {
        return Err(StreamError::malformed_frame(
            "sample parsing",
            format!("need 8 bytes at offset {offset}, have {}", data.len() - offset),
        ));
    }
    Ok(i64::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
        data[offset + 4],
        data[offset + 5],
        data[offset + 6],
        data[offset + 7],
    ]))
}
