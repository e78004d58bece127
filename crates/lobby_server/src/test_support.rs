//! Shared fixtures for unit tests.

use crate::server::acceptor::Listener;
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::mpsc;

pub(crate) fn peer_addr(n: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, n], 40000 + u16::from(n)))
}

/// Observes how often a [`CountingStream`] was shut down.
#[derive(Debug, Clone, Default)]
pub(crate) struct ShutdownProbe(Arc<AtomicUsize>);

impl ShutdownProbe {
    pub(crate) fn shutdowns(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Duplex stream that counts completed shutdowns and can be told to fail them.
#[derive(Debug)]
pub(crate) struct CountingStream {
    inner: DuplexStream,
    probe: ShutdownProbe,
    fail_shutdown: bool,
}

impl CountingStream {
    /// Returns the server half, the client half and a probe.
    pub(crate) fn pair() -> (Self, DuplexStream, ShutdownProbe) {
        Self::build(false)
    }

    /// Like [`CountingStream::pair`], but every shutdown reports an error.
    pub(crate) fn failing_pair() -> (Self, DuplexStream, ShutdownProbe) {
        Self::build(true)
    }

    fn build(fail_shutdown: bool) -> (Self, DuplexStream, ShutdownProbe) {
        let (client, server) = tokio::io::duplex(1024);
        let probe = ShutdownProbe::default();
        let stream = Self {
            inner: server,
            probe: probe.clone(),
            fail_shutdown,
        };
        (stream, client, probe)
    }
}

impl AsyncRead for CountingStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for CountingStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let result = match Pin::new(&mut self.inner).poll_shutdown(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(result) => result,
        };
        self.probe.0.fetch_add(1, Ordering::SeqCst);
        if self.fail_shutdown {
            return Poll::Ready(Err(io::Error::other("injected close failure")));
        }
        Poll::Ready(result)
    }
}

/// In-memory listener fed by a [`ListenerScript`].
///
/// Blocks forever once the script is exhausted, like a real listener with
/// no pending clients.
pub(crate) struct ScriptedListener {
    incoming: mpsc::UnboundedReceiver<io::Result<(DuplexStream, SocketAddr)>>,
}

/// Test-side control of a [`ScriptedListener`].
#[derive(Clone)]
pub(crate) struct ListenerScript {
    incoming: mpsc::UnboundedSender<io::Result<(DuplexStream, SocketAddr)>>,
    next_peer: Arc<AtomicUsize>,
}

pub(crate) fn scripted_listener() -> (ScriptedListener, ListenerScript) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ScriptedListener { incoming: rx },
        ListenerScript {
            incoming: tx,
            next_peer: Arc::new(AtomicUsize::new(1)),
        },
    )
}

impl ListenerScript {
    /// Queues a pending client and returns its end of the stream.
    pub(crate) fn connect(&self) -> DuplexStream {
        let (client, server) = tokio::io::duplex(1024);
        let n = self.next_peer.fetch_add(1, Ordering::SeqCst) as u8;
        let _ = self.incoming.send(Ok((server, peer_addr(n))));
        client
    }

    /// Makes the next accept call fail.
    pub(crate) fn fail(&self, kind: io::ErrorKind) {
        let _ = self.incoming.send(Err(io::Error::new(kind, "injected accept failure")));
    }
}

#[async_trait]
impl Listener for ScriptedListener {
    type Stream = DuplexStream;

    async fn accept(&mut self) -> io::Result<(DuplexStream, SocketAddr)> {
        match self.incoming.recv().await {
            Some(next) => next,
            None => std::future::pending().await,
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(SocketAddr::from(([127, 0, 0, 1], 0)))
    }
}
