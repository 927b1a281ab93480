//! Stream session: one open connection with its buffer, decoder, and recorder
//!
//! A session owns exactly one transport and one frame buffer, plus an
//! optional recorder tapping the raw byte stream. The reference usage is a
//! single owning task alternating [`read_raw`](StreamSession::read_raw) and
//! [`decode`](StreamSession::decode); independent sessions are freely usable
//! from separate tasks since they share no state.
//!
//! `read_raw` is the only awaiting operation. It is bounded by the
//! configured read timeout and cancellation-safe: cancelling the session's
//! token makes an in-flight read return promptly with a closure indication
//! instead of hanging.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::frame::{DecodeOutcome, FrameBuffer, MAX_SAMPLES_PER_FRAME, decode_frames};
use crate::recording::Recorder;
use crate::transport::{TcpTransport, Transport};
use crate::{Result, StreamError};

/// Default raw read size for the built-in acquisition loop.
const READ_CHUNK: usize = 16 * 1024;

/// One open position stream.
pub struct StreamSession {
    config: SessionConfig,
    transport: Box<dyn Transport>,
    buffer: FrameBuffer,
    recorder: Option<Recorder>,
    cancel: CancellationToken,
    closed: bool,
    scratch: Vec<u8>,
}

impl StreamSession {
    /// Open a session against the configured sensor head address.
    pub async fn open(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "Opening stream session to {} at {} on mask {:#010x}",
            config.address,
            config.rate,
            config.axis_mask.bits()
        );
        let transport = TcpTransport::connect(&config.address).await?;
        Self::with_transport(config, Box::new(transport))
    }

    /// Open a session over an already-established transport.
    ///
    /// This is the substitution seam: tests drive sessions from scripted
    /// transports instead of a live sensor head.
    pub fn with_transport(config: SessionConfig, transport: Box<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            buffer: FrameBuffer::with_capacity(READ_CHUNK * 2),
            recorder: None,
            cancel: CancellationToken::new(),
            closed: false,
            scratch: Vec::new(),
        })
    }

    /// The configuration this session was opened with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Token that cancels an in-flight `read_raw` when triggered.
    ///
    /// Clone it before moving the session elsewhere to retain a way of
    /// interrupting a blocked read prior to closing.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Bytes buffered but not yet consumed by decoding.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.pending_len()
    }

    /// Whether a recorder is currently attached.
    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Fault raised by the recording sink, if any.
    ///
    /// Recording failures never interrupt decoding; they surface here.
    pub fn recording_fault(&self) -> Option<String> {
        self.recorder.as_ref().and_then(Recorder::fault)
    }

    /// Begin mirroring raw bytes to `path`.
    pub async fn start_recording<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.ensure_can_record("start_recording")?;
        self.recorder = Some(Recorder::start(path).await?);
        Ok(())
    }

    /// Attach an already-started recorder to this session.
    ///
    /// Same state rules as [`start_recording`](Self::start_recording); lets
    /// tests tap the raw byte stream into a non-file sink via
    /// [`Recorder::with_sink`].
    pub fn attach_recorder(&mut self, recorder: Recorder) -> Result<()> {
        self.ensure_can_record("attach_recorder")?;
        self.recorder = Some(recorder);
        Ok(())
    }

    fn ensure_can_record(&self, operation: &'static str) -> Result<()> {
        if self.closed {
            return Err(StreamError::invalid_state(operation, "closed"));
        }
        if !self.config.recording_enabled {
            return Err(StreamError::invalid_state(operation, "opened with recording disabled"));
        }
        if self.recorder.is_some() {
            return Err(StreamError::invalid_state(operation, "already recording"));
        }
        Ok(())
    }

    /// Stop recording, flushing buffered bytes. No-op when not recording.
    pub async fn stop_recording(&mut self) -> Result<()> {
        match self.recorder.take() {
            Some(recorder) => recorder.stop().await,
            None => Ok(()),
        }
    }

    /// Read up to `max_bytes` raw bytes into the frame buffer.
    ///
    /// Awaits until at least one byte arrives, bounded by the configured
    /// read timeout. Returns the byte count, mirrors the bytes to the
    /// recorder when active, and fails with a transport error on
    /// disconnect. Cancelling the session token ends the wait promptly with
    /// a closure state error.
    pub async fn read_raw(&mut self, max_bytes: usize) -> Result<usize> {
        if self.closed {
            return Err(StreamError::invalid_state("read_raw", "closed"));
        }
        if max_bytes == 0 {
            return Err(StreamError::configuration("read_raw requires a non-zero byte budget"));
        }

        self.scratch.resize(max_bytes, 0);
        let timeout = self.config.read_timeout;

        let read = tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!("read_raw interrupted by session cancellation");
                return Err(StreamError::invalid_state("read_raw", "closed"));
            }
            result = tokio::time::timeout(timeout, self.transport.read(&mut self.scratch)) => {
                result.map_err(|_| StreamError::Timeout { duration: timeout })?
            }
        };

        let count = read?;
        if count == 0 {
            return Err(StreamError::transport_lost("stream closed by sensor head"));
        }

        let bytes = &self.scratch[..count];
        self.buffer.append(bytes);
        if let Some(recorder) = &self.recorder {
            recorder.write(bytes);
        }

        Ok(count)
    }

    /// Decode buffered bytes into the per-axis destinations.
    ///
    /// Non-blocking: runs purely against the pending region. One slice per
    /// channel in the session's axis mask, in ascending channel order; the
    /// shortest slice bounds the capacity. Whole frames only - an empty or
    /// fragment-only pending region yields `(0, 0)`.
    pub fn decode(&mut self, dests: &mut [&mut [i64]]) -> Result<DecodeOutcome> {
        if self.closed {
            return Err(StreamError::invalid_state("decode", "closed"));
        }

        let outcome = decode_frames(self.buffer.pending(), self.config.axis_mask, dests)?;
        self.buffer.consume(outcome.bytes_consumed)?;
        Ok(outcome)
    }

    /// Acquire at least `target` samples per axis with the reference
    /// read-then-decode polling loop.
    ///
    /// Destinations are over-allocated by one frame's worth of samples so a
    /// frame straddling the target never starves the loop; all decoded
    /// samples are returned, which may exceed `target` by up to
    /// [`MAX_SAMPLES_PER_FRAME`]` - 1`.
    pub async fn read_samples(&mut self, target: usize) -> Result<Vec<Vec<i64>>> {
        if target == 0 {
            return Err(StreamError::configuration("sample target must be non-zero"));
        }

        let axes = self.config.axis_mask.count();
        let capacity = target + MAX_SAMPLES_PER_FRAME - 1;
        let mut columns: Vec<Vec<i64>> = vec![vec![0i64; capacity]; axes];
        let mut filled = 0usize;

        while filled < target {
            self.read_raw(READ_CHUNK).await?;

            let mut dests: Vec<&mut [i64]> =
                columns.iter_mut().map(|column| &mut column[filled..]).collect();
            let outcome =
                decode_frames(self.buffer.pending(), self.config.axis_mask, &mut dests)?;
            self.buffer.consume(outcome.bytes_consumed)?;
            filled += outcome.samples_decoded;
        }

        for column in &mut columns {
            column.truncate(filled);
        }
        Ok(columns)
    }

    /// Close the session: stop recording, release transport and buffer.
    ///
    /// Idempotent, and safe to call whether or not recording was ever
    /// started. Cleanup problems are logged rather than raised so close
    /// always leaves the session in a terminal state.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.cancel.cancel();

        if let Some(recorder) = self.recorder.take() {
            if let Err(e) = recorder.stop().await {
                warn!("Recording did not stop cleanly on close: {e}");
            }
        }
        if let Err(e) = self.transport.shutdown().await {
            warn!("Transport did not shut down cleanly on close: {e}");
        }

        self.buffer.clear();
        self.closed = true;
        info!("Stream session to {} closed", self.config.address);
        Ok(())
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        debug!("Dropping stream session to {}", self.config.address);
        // Unblocks any task still waiting on this session's token
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_frame;
    use crate::test_utils::{FailingSink, FakeTransport, config_for, frame_of};
    use crate::types::{AxisMask, SampleRate};
    use std::time::Duration;

    #[tokio::test]
    async fn read_then_decode_extracts_frames() {
        let frame = frame_of(&[(1, 100)], 8);
        let transport = FakeTransport::scripted(vec![frame.clone()]);
        let mut session =
            StreamSession::with_transport(config_for(&[1]), Box::new(transport)).unwrap();

        let read = session.read_raw(4096).await.expect("read");
        assert_eq!(read, frame.len());
        assert_eq!(session.pending_bytes(), frame.len());

        let mut x = [0i64; 8];
        let outcome = session.decode(&mut [&mut x]).expect("decode");
        assert_eq!(outcome.samples_decoded, 8);
        assert_eq!(outcome.bytes_consumed, frame.len());
        assert_eq!(session.pending_bytes(), 0);
        assert_eq!(x[0], 100);
    }

    #[tokio::test]
    async fn decode_with_empty_buffer_is_zero_zero() {
        let transport = FakeTransport::scripted(vec![]);
        let mut session =
            StreamSession::with_transport(config_for(&[1]), Box::new(transport)).unwrap();

        let mut x = [0i64; 4];
        let outcome = session.decode(&mut [&mut x]).expect("empty decode never errors");
        assert_eq!(outcome, DecodeOutcome::default());
    }

    #[tokio::test]
    async fn chunked_delivery_assembles_split_frames() {
        // One frame delivered in three arbitrary chunks
        let frame = frame_of(&[(2, -5)], 32);
        let chunks =
            vec![frame[..7].to_vec(), frame[7..40].to_vec(), frame[40..].to_vec()];
        let transport = FakeTransport::scripted(chunks);
        let mut session =
            StreamSession::with_transport(config_for(&[2]), Box::new(transport)).unwrap();

        let mut dest = [0i64; 32];

        session.read_raw(4096).await.unwrap();
        let outcome = session.decode(&mut [&mut dest]).unwrap();
        assert_eq!(outcome, DecodeOutcome::default(), "header fragment decodes nothing");

        session.read_raw(4096).await.unwrap();
        session.read_raw(4096).await.unwrap();
        let outcome = session.decode(&mut [&mut dest]).unwrap();
        assert_eq!(outcome.samples_decoded, 32);
        assert_eq!(dest[0], -5);
    }

    #[tokio::test]
    async fn read_samples_implements_overallocation_policy() {
        // Five 1023-sample frames against a 5000-sample target: the loop
        // decodes all five, returning 5115 samples
        let frames: Vec<Vec<u8>> =
            (0..5).map(|n| frame_of(&[(1, n as i64 * 10_000)], 1023)).collect();
        let transport = FakeTransport::scripted(frames);
        let mut session =
            StreamSession::with_transport(config_for(&[1]), Box::new(transport)).unwrap();

        let columns = session.read_samples(5000).await.expect("acquisition");
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].len(), 5 * 1023);
        assert_eq!(columns[0][0], 0);
        assert_eq!(columns[0][1023], 10_000);
    }

    #[tokio::test]
    async fn disconnect_surfaces_as_transport_error() {
        let transport = FakeTransport::scripted(vec![]);
        let mut session =
            StreamSession::with_transport(config_for(&[1]), Box::new(transport)).unwrap();

        let result = session.read_raw(1024).await;
        assert!(matches!(result, Err(StreamError::Transport { .. })));
    }

    #[tokio::test]
    async fn stalled_transport_times_out() {
        let transport = FakeTransport::stalled();
        let config = config_for(&[1]).with_read_timeout(Duration::from_millis(20));
        let mut session = StreamSession::with_transport(config, Box::new(transport)).unwrap();

        let result = session.read_raw(1024).await;
        assert!(matches!(result, Err(StreamError::Timeout { .. })));
    }

    #[tokio::test]
    async fn cancellation_interrupts_blocked_read() {
        let transport = FakeTransport::stalled();
        let mut session =
            StreamSession::with_transport(config_for(&[1]), Box::new(transport)).unwrap();

        let token = session.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let result = session.read_raw(1024).await;
        assert!(matches!(result, Err(StreamError::State { .. })));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_terminal() {
        use std::sync::atomic::Ordering;

        let transport = FakeTransport::scripted(vec![]);
        let shutdowns = transport.shutdown_counter();
        let mut session =
            StreamSession::with_transport(config_for(&[1]), Box::new(transport)).unwrap();

        session.close().await.expect("first close");
        session.close().await.expect("second close is a no-op");
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1, "transport shuts down exactly once");

        let mut x = [0i64; 1];
        assert!(matches!(session.decode(&mut [&mut x]), Err(StreamError::State { .. })));
        assert!(matches!(session.read_raw(1).await, Err(StreamError::State { .. })));
    }

    #[tokio::test]
    async fn recording_state_transitions_are_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.raw");

        let transport = FakeTransport::scripted(vec![]);
        let mut session =
            StreamSession::with_transport(config_for(&[1]), Box::new(transport)).unwrap();

        // Stop without start is a no-op
        session.stop_recording().await.expect("no-op stop");

        session.start_recording(&path).await.expect("start");
        assert!(session.is_recording());

        let again = session.start_recording(&path).await;
        assert!(matches!(again, Err(StreamError::State { .. })));

        session.stop_recording().await.expect("stop");
        assert!(!session.is_recording());
    }

    #[tokio::test]
    async fn recording_disabled_config_rejects_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(&[1]);
        config.recording_enabled = false;

        let transport = FakeTransport::scripted(vec![]);
        let mut session = StreamSession::with_transport(config, Box::new(transport)).unwrap();

        let result = session.start_recording(dir.path().join("r.raw")).await;
        assert!(matches!(result, Err(StreamError::State { .. })));
    }

    #[tokio::test]
    async fn recorder_mirrors_exact_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.raw");

        let frame_a = frame_of(&[(1, 1)], 4);
        let frame_b = frame_of(&[(1, 2)], 4);
        let mut stream = frame_a.clone();
        stream.extend_from_slice(&frame_b);

        let transport =
            FakeTransport::scripted(vec![frame_a.clone(), frame_b.clone()]);
        let mut session =
            StreamSession::with_transport(config_for(&[1]), Box::new(transport)).unwrap();

        session.start_recording(&path).await.unwrap();
        session.read_raw(4096).await.unwrap();
        session.read_raw(4096).await.unwrap();
        session.stop_recording().await.unwrap();

        let recorded = std::fs::read(&path).unwrap();
        assert_eq!(recorded, stream);
    }

    #[tokio::test]
    async fn recording_fault_never_interrupts_decoding() {
        use std::path::PathBuf;

        // A full frame exceeds the recorder's internal write buffer, so the
        // failing sink rejects it on the first mirrored read
        let frame = frame_of(&[(1, 0)], 1023);
        let transport = FakeTransport::scripted(vec![frame.clone(), frame.clone()]);
        let mut session =
            StreamSession::with_transport(config_for(&[1]), Box::new(transport)).unwrap();
        session
            .attach_recorder(Recorder::with_sink(Box::new(FailingSink), PathBuf::from("<sink>")))
            .expect("attach");

        session.read_raw(16 * 1024).await.expect("read survives the sink failure");

        // The fault is raised by the writer task, out-of-band
        for _ in 0..100 {
            if session.recording_fault().is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(session.recording_fault().is_some());

        // Decoding and further reads are unaffected
        let mut dest = vec![0i64; 1023];
        let outcome = session.decode(&mut [&mut dest]).expect("decode unaffected");
        assert_eq!(outcome.samples_decoded, 1023);
        session.read_raw(16 * 1024).await.expect("later reads unaffected");

        let result = session.stop_recording().await;
        assert!(matches!(result, Err(StreamError::Recording { .. })));
    }

    #[tokio::test]
    async fn close_without_recording_started_is_safe() {
        // Close must be safe even when recording was never started
        let transport = FakeTransport::scripted(vec![]);
        let mut session =
            StreamSession::with_transport(config_for(&[1]), Box::new(transport)).unwrap();
        session.close().await.expect("clean close");
    }

    #[tokio::test]
    async fn capacity_error_leaves_frame_retryable() {
        let frame = frame_of(&[(1, 0)], 100);
        let transport = FakeTransport::scripted(vec![frame.clone()]);
        let mut session =
            StreamSession::with_transport(config_for(&[1]), Box::new(transport)).unwrap();

        session.read_raw(4096).await.unwrap();

        let mut small = [0i64; 50];
        let result = session.decode(&mut [&mut small]);
        assert!(matches!(result, Err(StreamError::Capacity { .. })));
        // Nothing consumed: the same frame decodes once capacity suffices
        assert_eq!(session.pending_bytes(), frame.len());

        let mut large = [0i64; 100];
        let outcome = session.decode(&mut [&mut large]).expect("retry succeeds");
        assert_eq!(outcome.samples_decoded, 100);
    }

    #[test]
    fn with_transport_validates_config() {
        let mut config = config_for(&[1]);
        config.axis_mask = AxisMask::from_bits(0);
        let result = StreamSession::with_transport(
            config,
            Box::new(FakeTransport::scripted(vec![])),
        );
        assert!(matches!(result, Err(StreamError::Configuration { .. })));
    }

    #[test]
    fn synthetic_frames_carry_session_rate() {
        let frame = frame_of(&[(1, 0)], 4);
        let header = crate::frame::FrameHeader::parse(&frame).unwrap().unwrap();
        assert_eq!(header.rate_hz, SampleRate::KHZ_100.hz());
        // frame_of and encode_frame agree on layout
        assert_eq!(frame, encode_frame(&[(1, &[0, 1, 2, 3])], SampleRate::KHZ_100).unwrap());
    }
}
