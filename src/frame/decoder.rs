//! Pure frame decoder over a pending byte window
//!
//! The decoder is a function of (byte window, axis mask, destinations) with
//! no hidden state: identical inputs always produce identical outputs. It
//! consumes whole frames or nothing - a partial frame at the end of the
//! window is left untouched for the next read cycle.

use tracing::trace;

use super::format::{self, FrameHeader};
use crate::types::AxisMask;
use crate::{Result, StreamError};

/// Counts returned by one decode pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOutcome {
    /// Raw bytes consumed from the window (whole frames only)
    pub bytes_consumed: usize,

    /// Samples written per requested axis
    pub samples_decoded: usize,
}

/// Decode as many complete frames from `window` as the destinations can hold.
///
/// `dests` carries one destination slice per channel in `axis_mask`, in
/// ascending channel order; the usable capacity is the shortest slice.
/// Samples are written from index 0 upward, so callers resuming a longer
/// acquisition pass re-sliced destinations, as the reference polling loop
/// does.
///
/// Behavior per frame, front to back:
/// - header or payload incomplete: stop, leaving the fragment unconsumed
/// - no channel overlap with `axis_mask`: consume the frame, produce nothing
/// - overlap, but the frame's samples exceed the remaining capacity: stop
///   before the frame, or fail with a capacity error when it is the first
///   producing frame (nothing consumed, so the caller retries it unchanged)
/// - otherwise: write `sample_count` values for every requested axis, in
///   arrival order; requested axes missing from the frame are zero-filled to
///   keep the destinations index-aligned
pub fn decode_frames(
    window: &[u8],
    axis_mask: AxisMask,
    dests: &mut [&mut [i64]],
) -> Result<DecodeOutcome> {
    if dests.len() != axis_mask.count() {
        return Err(StreamError::configuration(format!(
            "{} destination slices for {} requested axes",
            dests.len(),
            axis_mask.count()
        )));
    }
    let capacity = dests.iter().map(|dest| dest.len()).min().unwrap_or(0);

    let mut outcome = DecodeOutcome::default();

    loop {
        let remaining = &window[outcome.bytes_consumed..];
        let Some(header) = FrameHeader::parse(remaining)? else {
            break;
        };
        if remaining.len() < header.total_len() {
            // Payload not fully buffered yet
            break;
        }

        let produces = !header.channel_mask.intersection(axis_mask).is_empty();
        if produces {
            let free = capacity - outcome.samples_decoded;
            if header.sample_count > free {
                if outcome.samples_decoded == 0 {
                    return Err(StreamError::Capacity {
                        required: header.sample_count,
                        capacity,
                    });
                }
                // Later frame that no longer fits: return the progress so far
                break;
            }

            copy_frame_samples(remaining, &header, axis_mask, dests, outcome.samples_decoded)?;
            outcome.samples_decoded += header.sample_count;
        } else {
            trace!(
                frame_channels = header.channel_mask.bits(),
                requested = axis_mask.bits(),
                "discarding frame outside the requested axis mask"
            );
        }

        outcome.bytes_consumed += header.total_len();
    }

    Ok(outcome)
}

/// Copy one frame's sample blocks into the destinations at `write_at`.
fn copy_frame_samples(
    frame: &[u8],
    header: &FrameHeader,
    axis_mask: AxisMask,
    dests: &mut [&mut [i64]],
    write_at: usize,
) -> Result<()> {
    for (slot, channel) in axis_mask.channels().enumerate() {
        let dest = &mut dests[slot][write_at..write_at + header.sample_count];

        match header.channel_block_offset(channel) {
            Some(block) => {
                for (i, value) in dest.iter_mut().enumerate() {
                    *value = format::parse_i64_le(frame, block + i * 8)?;
                }
            }
            // Requested axis not carried by this frame: zero-fill so the
            // per-axis destinations stay index-aligned
            None => dest.fill(0),
        }
    }
    Ok(())
}
