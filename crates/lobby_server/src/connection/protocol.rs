//! Hook points for the application protocol.
//!
//! The lobby core does not know what clients say. It hands each admitted
//! stream to a [`Protocol`] implementation one step at a time and only
//! cares whether the step asks to continue, reports completion, or fails.

use super::client::ConnectionInfo;
use crate::error::ConnectionError;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

const READ_BUFFER_SIZE: usize = 4096;

/// Any bidirectional byte stream a client can be served over.
pub trait ClientStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> ClientStream for T where T: AsyncRead + AsyncWrite + Unpin + Send + ?Sized {}

/// Outcome of one protocol step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep the connection open and call `step` again
    Continue,
    /// The protocol is done with this client
    Finished,
}

/// Application protocol spoken with each admitted client.
///
/// `step` may block on I/O for as long as it likes; the handler races it
/// against the shutdown signal and drops the step future when shutdown
/// wins. Implementations should therefore only await cancel-safe
/// operations between observable state changes.
#[async_trait]
pub trait Protocol: Send + Sync + 'static {
    /// Short name used in log output
    fn name(&self) -> &'static str;

    /// Called once after admission, before the first `step`.
    async fn on_admitted(
        &self,
        _stream: &mut dyn ClientStream,
        _info: &ConnectionInfo,
    ) -> Result<(), ConnectionError> {
        Ok(())
    }

    /// Performs one unit of protocol I/O.
    async fn step(
        &self,
        stream: &mut dyn ClientStream,
        info: &ConnectionInfo,
    ) -> Result<Step, ConnectionError>;
}

/// Placeholder protocol: reads and discards client input until EOF.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleProtocol;

#[async_trait]
impl Protocol for IdleProtocol {
    fn name(&self) -> &'static str {
        "idle"
    }

    async fn step(
        &self,
        stream: &mut dyn ClientStream,
        info: &ConnectionInfo,
    ) -> Result<Step, ConnectionError> {
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        let read = stream.read(&mut buffer).await?;
        if read == 0 {
            return Ok(Step::Finished);
        }
        trace!("Discarded {} byte(s) from connection {}", read, info.id);
        Ok(Step::Continue)
    }
}

/// Writes every chunk it reads straight back to the client.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoProtocol;

#[async_trait]
impl Protocol for EchoProtocol {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn step(
        &self,
        stream: &mut dyn ClientStream,
        info: &ConnectionInfo,
    ) -> Result<Step, ConnectionError> {
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        let read = stream.read(&mut buffer).await?;
        if read == 0 {
            return Ok(Step::Finished);
        }
        stream.write_all(&buffer[..read]).await?;
        stream.flush().await?;
        trace!("Echoed {} byte(s) to connection {}", read, info.id);
        Ok(Step::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::peer_addr;

    fn info() -> ConnectionInfo {
        ConnectionInfo {
            id: 7,
            peer: peer_addr(7),
        }
    }

    #[tokio::test]
    async fn test_idle_protocol_discards_until_eof() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"hello").await.unwrap();

        let step = IdleProtocol.step(&mut server, &info()).await.unwrap();
        assert_eq!(step, Step::Continue);

        drop(client);
        let step = IdleProtocol.step(&mut server, &info()).await.unwrap();
        assert_eq!(step, Step::Finished);
    }

    #[tokio::test]
    async fn test_echo_protocol_writes_back() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"ping").await.unwrap();

        let step = EchoProtocol.step(&mut server, &info()).await.unwrap();
        assert_eq!(step, Step::Continue);

        let mut reply = [0u8; 4];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"ping");
    }

    #[tokio::test]
    async fn test_echo_protocol_reports_broken_pipe() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"late").await.unwrap();
        drop(client);

        let result = EchoProtocol.step(&mut server, &info()).await;
        assert!(matches!(result, Err(ConnectionError::Io(_))));
    }
}
