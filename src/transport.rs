//! Transport trait for raw byte sources
//!
//! The session treats its data source as an abstract ordered byte stream.
//! The trait is the substitution seam for testing: integration tests drive
//! sessions from scripted fakes or loopback sockets instead of a sensor head.

use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::{Result, StreamError};

/// Bound on how long establishing the TCP connection may take.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Abstract reliable, ordered byte source feeding a session.
///
/// Implementations handle their own I/O details; the session only needs
/// two operations:
/// - `read` awaits data and returns the byte count, `0` meaning the remote
///   end closed the stream in an orderly way
/// - `shutdown` releases the underlying resource
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Read up to `buf.len()` bytes, awaiting until at least one is
    /// available or the stream closes.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Release the transport. Called once from session close.
    async fn shutdown(&mut self) -> Result<()>;
}

/// TCP transport to a network-attached sensor head.
pub struct TcpTransport {
    stream: TcpStream,
    peer: String,
}

impl TcpTransport {
    /// Connect to the sensor head at `address` (`host:port`).
    pub async fn connect(address: &str) -> Result<Self> {
        debug!("Connecting to sensor head at {address}");

        let connect = TcpStream::connect(address);
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, connect)
            .await
            .map_err(|_| StreamError::Timeout { duration: CONNECT_TIMEOUT })?
            .map_err(|e| {
                StreamError::transport_lost_with_source(
                    format!("failed to connect to {address}"),
                    Box::new(e),
                )
            })?;

        stream.set_nodelay(true).map_err(|e| {
            StreamError::transport_lost_with_source("failed to set TCP_NODELAY", Box::new(e))
        })?;

        info!("Connected to sensor head at {address}");
        Ok(Self { stream, peer: address.to_string() })
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.stream.read(buf).await.map_err(|e| {
            StreamError::transport_lost_with_source(
                format!("read from {} failed", self.peer),
                Box::new(e),
            )
        })
    }

    async fn shutdown(&mut self) -> Result<()> {
        use tokio::io::AsyncWriteExt;
        debug!("Shutting down transport to {}", self.peer);
        // Orderly shutdown; a peer that already vanished is not an error here
        let _ = self.stream.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn tcp_transport_reads_written_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
        let address = listener.local_addr().expect("local addr").to_string();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            socket.write_all(b"position data").await.expect("write");
        });

        let mut transport = TcpTransport::connect(&address).await.expect("connect");
        let mut buf = [0u8; 64];
        let mut received = Vec::new();
        loop {
            let n = transport.read(&mut buf).await.expect("read");
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        assert_eq!(received, b"position data");

        transport.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn connect_to_unreachable_address_is_a_transport_error() {
        // Nothing listens on the discard port locally; refusal is immediate
        let result = TcpTransport::connect("127.0.0.1:1").await;
        assert!(matches!(
            result,
            Err(StreamError::Transport { .. }) | Err(StreamError::Timeout { .. })
        ));
    }
}
