//! Raw-byte recorder mirroring the live stream to disk
//!
//! The recorder taps the byte stream between transport and decoder: chunks
//! are appended to the destination file exactly as they were read, with no
//! transformation, so the recording can later be replayed through the same
//! frame decoder.
//!
//! Disk writes run in a dedicated task fed by an in-order channel, keeping
//! the read/decode loop free of disk latency. Recording and decoding are
//! independent failure domains: a failed write raises a fault that callers
//! observe out-of-band, while decoding continues untouched.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{Result, StreamError};

/// Active recording of raw stream bytes.
pub struct Recorder {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    fault_rx: watch::Receiver<Option<String>>,
    task: JoinHandle<()>,
    path: PathBuf,
}

impl Recorder {
    /// Start recording to `path`, truncating any existing file.
    ///
    /// The file is opened eagerly so an unusable destination fails the start
    /// call instead of surfacing later as a write fault.
    pub async fn start<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .await
            .map_err(|e| StreamError::recording_error(path.clone(), e))?;

        info!("Recording raw stream to {}", path.display());
        Ok(Self::with_sink(Box::new(file), path))
    }

    /// Start recording into an arbitrary byte sink.
    ///
    /// This is the substitution seam mirroring
    /// [`Transport`](crate::transport::Transport): tests drive the recorder
    /// into failing or in-memory sinks instead of a file. `path` is only
    /// used for diagnostics and error reporting.
    pub fn with_sink(sink: Box<dyn AsyncWrite + Send + Unpin>, path: PathBuf) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (fault_tx, fault_rx) = watch::channel(None);

        let task_path = path.clone();
        let task = tokio::spawn(async move {
            Self::writer_task(sink, rx, fault_tx, task_path).await;
        });

        Self { tx: Some(tx), fault_rx, task, path }
    }

    /// Writer task: drains chunks in arrival order, flushes on shutdown.
    async fn writer_task(
        sink: Box<dyn AsyncWrite + Send + Unpin>,
        mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
        fault_tx: watch::Sender<Option<String>>,
        path: PathBuf,
    ) {
        let mut writer = BufWriter::new(sink);
        let mut written = 0u64;
        let mut faulted = false;

        while let Some(chunk) = rx.recv().await {
            if faulted {
                // Keep draining so the sender never blocks, but stop writing:
                // a gap in the middle would corrupt the frame sequence
                continue;
            }
            match writer.write_all(&chunk).await {
                Ok(()) => written += chunk.len() as u64,
                Err(e) => {
                    warn!("Recording write to {} failed: {e}", path.display());
                    let _ = fault_tx.send(Some(e.to_string()));
                    faulted = true;
                }
            }
        }

        if !faulted {
            // shutdown flushes the buffer through to the sink
            if let Err(e) = writer.shutdown().await {
                warn!("Recording flush to {} failed: {e}", path.display());
                let _ = fault_tx.send(Some(e.to_string()));
            }
        }

        debug!("Recorder task for {} ended ({written} bytes)", path.display());
    }

    /// Mirror one chunk of raw bytes.
    ///
    /// Never fails and never blocks; if the writer has faulted the chunk is
    /// silently dropped and the fault stays observable via [`fault`](Self::fault).
    pub fn write(&self, bytes: &[u8]) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(bytes.to_vec());
        }
    }

    /// Current recording fault, if any write has failed.
    pub fn fault(&self) -> Option<String> {
        self.fault_rx.borrow().clone()
    }

    /// Destination path of this recording.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop recording: flush buffered chunks and release the file.
    ///
    /// Reports a recording error if any write or the final flush failed.
    pub async fn stop(mut self) -> Result<()> {
        // Closing the channel lets the writer task drain and flush
        self.tx.take();
        if let Err(e) = (&mut self.task).await {
            return Err(StreamError::recording_error(
                self.path.clone(),
                std::io::Error::other(format!("recorder task panicked: {e}")),
            ));
        }

        match self.fault_rx.borrow().clone() {
            Some(fault) => Err(StreamError::recording_error(
                self.path.clone(),
                std::io::Error::other(fault),
            )),
            None => {
                info!("Recording to {} stopped", self.path.display());
                Ok(())
            }
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        // Close the channel so an abandoned recorder still flushes in the
        // background instead of leaking its task
        self.tx.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FailingSink;

    #[tokio::test]
    async fn recorded_bytes_match_written_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.raw");

        let recorder = Recorder::start(&path).await.expect("start recording");
        assert_eq!(recorder.path(), path);
        recorder.write(b"first ");
        recorder.write(b"second ");
        recorder.write(b"third");
        recorder.stop().await.expect("stop recording");

        let contents = std::fs::read(&path).expect("read recording");
        assert_eq!(contents, b"first second third");
    }

    #[tokio::test]
    async fn write_failure_raises_fault_and_fails_stop() {
        let recorder = Recorder::with_sink(Box::new(FailingSink), PathBuf::from("<sink>"));
        let mut fault_rx = recorder.fault_rx.clone();

        // Larger than the internal write buffer, so the sink sees it at once
        recorder.write(&vec![0u8; 16 * 1024]);
        fault_rx.changed().await.expect("fault is published");
        assert!(recorder.fault().is_some());

        // Writes after the fault are dropped without blocking
        recorder.write(b"after the fault");

        let result = recorder.stop().await;
        assert!(matches!(result, Err(StreamError::Recording { .. })));
    }

    #[tokio::test]
    async fn unwritable_destination_fails_at_start() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("session.raw");

        let result = Recorder::start(&path).await;
        assert!(matches!(result, Err(StreamError::Recording { .. })));
    }

    #[tokio::test]
    async fn stop_with_no_writes_produces_empty_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.raw");

        let recorder = Recorder::start(&path).await.expect("start");
        assert!(recorder.fault().is_none());
        recorder.stop().await.expect("stop");

        assert_eq!(std::fs::read(&path).expect("read").len(), 0);
    }
}
