//! Offline reader for recorded raw streams
//!
//! A recording is the byte-for-byte concatenation of frames as they arrived
//! from the transport, so replaying one is just running the same frame
//! decoder over a file instead of a socket. The reader loads the recording
//! into memory and hands out decoded batches sequentially, mirroring how a
//! live session drains its frame buffer.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::frame::{FrameHeader, decode_frames};
use crate::types::{AxisMask, SampleBatch, SampleRate};
use crate::{Result, StreamError};

/// Sequential decoder over a recorded raw stream.
pub struct RecordingReader {
    data: Vec<u8>,
    cursor: usize,
    path: PathBuf,
    axis_mask: AxisMask,
}

impl RecordingReader {
    /// Open a recording file for replay, decoding the channels in `axis_mask`.
    pub fn open<P: AsRef<Path>>(path: P, axis_mask: AxisMask) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data =
            std::fs::read(&path).map_err(|e| StreamError::recording_error(path.clone(), e))?;
        info!("Opened recording {} ({} bytes)", path.display(), data.len());
        Self::from_bytes_with_path(data, path, axis_mask)
    }

    /// Build a reader over in-memory recording bytes (for testing).
    pub fn from_bytes(data: Vec<u8>, axis_mask: AxisMask) -> Result<Self> {
        Self::from_bytes_with_path(data, PathBuf::from("<memory>"), axis_mask)
    }

    fn from_bytes_with_path(data: Vec<u8>, path: PathBuf, axis_mask: AxisMask) -> Result<Self> {
        if axis_mask.is_empty() {
            return Err(StreamError::configuration("axis mask selects no channels"));
        }
        Ok(Self { data, cursor: 0, path, axis_mask })
    }

    /// The file this reader was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes not yet decoded.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Decode the next frame into a batch.
    ///
    /// Returns `Ok(None)` at the end of the recording. A trailing fragment
    /// (recording stopped mid-frame) also ends the replay; the leftover byte
    /// count stays observable via [`remaining`](Self::remaining).
    pub fn next_batch(&mut self) -> Result<Option<SampleBatch>> {
        loop {
            let window = &self.data[self.cursor..];
            let Some(header) = FrameHeader::parse(window)? else {
                return Ok(None);
            };
            if window.len() < header.total_len() {
                debug!(
                    "Recording {} ends with a {}-byte fragment",
                    self.path.display(),
                    window.len()
                );
                return Ok(None);
            }

            let rate = SampleRate::from_hz(header.rate_hz).ok_or_else(|| {
                StreamError::malformed_frame("recording", "frame rate marker is zero")
            })?;

            let axes = self.axis_mask.count();
            let mut columns: Vec<Vec<i64>> = vec![vec![0i64; header.sample_count]; axes];
            let mut dests: Vec<&mut [i64]> =
                columns.iter_mut().map(|column| column.as_mut_slice()).collect();

            let outcome = decode_frames(
                &window[..header.total_len()],
                self.axis_mask,
                dests.as_mut_slice(),
            )?;
            self.cursor += outcome.bytes_consumed;

            if outcome.samples_decoded == 0 {
                // Frame outside the requested mask; keep scanning
                continue;
            }

            return Ok(Some(SampleBatch::new(self.axis_mask, columns, rate)));
        }
    }

    /// Decode the whole remaining recording, one batch per matching frame.
    pub fn read_all(&mut self) -> Result<Vec<SampleBatch>> {
        let mut batches = Vec::new();
        while let Some(batch) = self.next_batch()? {
            batches.push(batch);
        }
        Ok(batches)
    }
}
