//! Acquisition driver: continuous read/decode loop as a background task
//!
//! For callers that want a push-style feed instead of driving the polling
//! loop themselves, `Acquisition::spawn` moves a session into a tokio task
//! that alternates raw reads and decodes, publishing each decoded batch over
//! a bounded channel. Batches are never dropped: backpressure pauses the
//! reader instead, since position samples are not a latest-wins quantity.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::StreamError;
use crate::frame::MAX_SAMPLES_PER_FRAME;
use crate::session::StreamSession;
use crate::types::SampleBatch;

/// Raw read size per loop iteration.
const READ_CHUNK: usize = 16 * 1024;

/// Samples of headroom per decode pass: a chunk can carry several frames.
const BATCH_CAPACITY: usize = 4 * MAX_SAMPLES_PER_FRAME;

/// Consecutive retryable failures tolerated before giving up.
const MAX_ERRORS: u32 = 10;

/// Result of spawning the acquisition task.
pub struct AcquisitionChannels {
    /// Receiver for decoded sample batches
    pub batches: mpsc::Receiver<Arc<SampleBatch>>,

    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

impl AcquisitionChannels {
    /// Consume the receiver as a `Stream` of batches.
    pub fn batch_stream(self) -> impl Stream<Item = Arc<SampleBatch>> + Send + 'static {
        ReceiverStream::new(self.batches)
    }
}

/// Spawns and manages the acquisition task for one session.
pub struct Acquisition;

impl Acquisition {
    /// Move `session` into a background acquisition task.
    ///
    /// Returns the batch receiver plus the session's cancellation token;
    /// cancelling it interrupts an in-flight read and ends the task, which
    /// closes the session on its way out.
    pub fn spawn(session: StreamSession) -> AcquisitionChannels {
        let (batch_tx, batch_rx) = mpsc::channel(64);
        let cancel = session.cancellation_token();
        let cancel_task = cancel.clone();

        tokio::spawn(async move {
            Self::reader_task(session, batch_tx, cancel_task).await;
        });

        AcquisitionChannels { batches: batch_rx, cancel }
    }

    /// Reader task: read, decode everything buffered, publish, repeat.
    async fn reader_task(
        mut session: StreamSession,
        batch_tx: mpsc::Sender<Arc<SampleBatch>>,
        cancel: CancellationToken,
    ) {
        info!("Acquisition task started for {}", session.config().address);
        let mask = session.config().axis_mask;
        let rate = session.config().rate;
        let axes = mask.count();

        let mut batch_count = 0u64;
        let mut error_count = 0u32;

        'outer: loop {
            if cancel.is_cancelled() {
                info!("Acquisition cancelled");
                break;
            }

            // read_raw selects on the session token internally, so
            // cancellation surfaces here as a closure state error
            match session.read_raw(READ_CHUNK).await {
                Ok(_) => error_count = 0,
                Err(StreamError::State { .. }) => {
                    info!("Acquisition interrupted during read");
                    break;
                }
                Err(StreamError::Transport { reason, .. }) => {
                    // A lost connection ends the session; reopening is the
                    // caller's decision, not the driver's
                    info!("Stream ended: {reason}");
                    break;
                }
                Err(StreamError::Timeout { duration }) => {
                    error_count += 1;
                    warn!(
                        "Read timed out after {duration:?} ({error_count}/{MAX_ERRORS})"
                    );
                    if error_count >= MAX_ERRORS {
                        error!("Too many stalled reads, shutting down");
                        break;
                    }
                    // Exponential backoff: 100ms, 200ms, 400ms, ...
                    let backoff =
                        std::time::Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                Err(e) => {
                    error!("Fatal acquisition error: {e}");
                    break;
                }
            }

            // Drain every complete frame the read made available
            loop {
                let mut columns: Vec<Vec<i64>> = vec![vec![0i64; BATCH_CAPACITY]; axes];
                let outcome = {
                    let mut dests: Vec<&mut [i64]> =
                        columns.iter_mut().map(|column| column.as_mut_slice()).collect();
                    match session.decode(&mut dests) {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            error!("Fatal decode error: {e}");
                            break 'outer;
                        }
                    }
                };
                if outcome.samples_decoded == 0 {
                    break;
                }

                for column in &mut columns {
                    column.truncate(outcome.samples_decoded);
                }
                let batch = Arc::new(SampleBatch::new(mask, columns, rate));
                batch_count += 1;

                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Acquisition cancelled while publishing");
                        break 'outer;
                    }
                    sent = batch_tx.send(batch) => {
                        if sent.is_err() {
                            debug!("Batch receiver dropped, shutting down");
                            break 'outer;
                        }
                    }
                }
            }

            if let Some(fault) = session.recording_fault() {
                warn!("Recording fault during acquisition: {fault}");
            }
        }

        if let Err(e) = session.close().await {
            warn!("Session close at acquisition end failed: {e}");
        }
        info!("Acquisition task ended ({batch_count} batches published)");
    }
}
