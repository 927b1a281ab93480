//! Test utilities: synthetic frames and scripted transports
//!
//! Shared fixture helpers for unit tests and benches. Synthetic frames are
//! produced through the public encoder so fixtures and production code can
//! never disagree about the wire layout.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use crate::config::SessionConfig;
use crate::frame::encode_frame;
use crate::transport::Transport;
use crate::types::{AxisMask, ChannelId, SampleRate};
use crate::{Result, StreamError};

/// Build one frame of ramp data: channel values start at the given base and
/// increase by one per sample.
pub fn frame_of(channels: &[(ChannelId, i64)], count: usize) -> Vec<u8> {
    let columns: Vec<(ChannelId, Vec<i64>)> = channels
        .iter()
        .map(|&(channel, base)| (channel, (0..count as i64).map(|i| base + i).collect()))
        .collect();
    let refs: Vec<(ChannelId, &[i64])> =
        columns.iter().map(|(channel, column)| (*channel, column.as_slice())).collect();
    encode_frame(&refs, SampleRate::KHZ_100).expect("fixture frame must encode")
}

/// Standard test configuration: 100 kHz, recording enabled, loopback-ish address.
pub fn config_for(channels: &[ChannelId]) -> SessionConfig {
    SessionConfig::new(
        "192.168.1.1:7230",
        true,
        SampleRate::KHZ_100,
        AxisMask::from_channels(channels),
    )
    .expect("fixture config must validate")
}

/// Scripted transport serving canned chunks, then signalling orderly closure.
pub struct FakeTransport {
    chunks: VecDeque<Vec<u8>>,
    stalled: bool,
    shutdowns: Arc<AtomicUsize>,
}

impl FakeTransport {
    /// Serve the given chunks one `read` at a time, then report closure.
    pub fn scripted(chunks: Vec<Vec<u8>>) -> Self {
        Self { chunks: chunks.into(), stalled: false, shutdowns: Arc::default() }
    }

    /// Never produce data: every read pends until cancelled or timed out.
    pub fn stalled() -> Self {
        Self { chunks: VecDeque::new(), stalled: true, shutdowns: Arc::default() }
    }

    /// Shared count of `shutdown` calls, observable after the transport has
    /// been moved into a session.
    pub fn shutdown_counter(&self) -> Arc<AtomicUsize> {
        self.shutdowns.clone()
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.stalled {
            futures::future::pending::<()>().await;
            unreachable!("pending future never resolves");
        }

        match self.chunks.pop_front() {
            Some(mut chunk) => {
                if chunk.len() > buf.len() {
                    // Deliver what fits, keep the rest for the next read
                    let rest = chunk.split_off(buf.len());
                    self.chunks.push_front(rest);
                }
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
            None => Ok(0),
        }
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Byte sink that rejects every write, for recording fault tests.
pub struct FailingSink;

impl tokio::io::AsyncWrite for FailingSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::StorageFull,
            "no space left on device",
        )))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Transport that fails every read, for connection-loss tests.
pub struct FailingTransport;

#[async_trait::async_trait]
impl Transport for FailingTransport {
    async fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(StreamError::transport_lost("injected failure"))
    }

    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}
