//! Core types for position stream representation.
//!
//! - [`AxisMask`] selects which channels a session decodes, fixed at open time
//! - [`SampleRate`] is the positive sampling rate carried in frame headers
//! - [`SampleBatch`] is the decoded unit flowing out of the acquisition driver
//!
//! Decoded positions are plain signed 64-bit integers in the sensor head's
//! native length unit; no scaling happens in this crate.

mod axis_mask;
mod batch;
mod sample_rate;

pub use axis_mask::{AxisMask, ChannelId, MAX_CHANNEL_ID};
pub use batch::SampleBatch;
pub use sample_rate::SampleRate;
