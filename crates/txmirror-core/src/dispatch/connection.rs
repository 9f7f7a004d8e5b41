//! Connection tagging for the backend pool.
//!
//! Every connection the pool establishes is wrapped in a [`TrackedStream`] that carries a
//! [`ConnectionTag`]. The tag is exposed to requests through hyper-util's connection
//! metadata, so an attempt that captured its connection can tell whether an earlier
//! attempt already used it.

use hyper::{
    rt::{Read, ReadBufCursor, Write},
    Uri,
};
use hyper_util::client::legacy::connect::{
    capture_connection, CaptureConnection, Connected, Connection,
};
use std::{
    fmt,
    future::Future,
    io,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    task::{Context, Poll},
    time::Duration,
};
use tower::Service;
use tracing::trace;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Identity and use counter of one pooled connection.
#[derive(Debug, Clone)]
pub struct ConnectionTag {
    id: u64,
    uses: Arc<AtomicU64>,
}

impl ConnectionTag {
    fn new(id: u64) -> Self {
        Self { id, uses: Arc::new(AtomicU64::new(0)) }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Records one more attempt on this connection. Returns `true` when an earlier
    /// attempt had already used it.
    pub fn mark_used(&self) -> bool {
        self.uses.fetch_add(1, Ordering::AcqRel) > 0
    }

    #[cfg(test)]
    fn uses(&self) -> u64 {
        self.uses.load(Ordering::Acquire)
    }
}

/// Raised by [`TrackingConnector`] when establishing a connection takes too long.
#[derive(Debug)]
pub struct HandshakeTimeout(Duration);

impl fmt::Display for HandshakeTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection handshake timed out after {}ms", self.0.as_millis())
    }
}

impl std::error::Error for HandshakeTimeout {}

/// Connector wrapper that tags every new connection and bounds the handshake.
#[derive(Debug, Clone)]
pub struct TrackingConnector<C> {
    inner: C,
    handshake_timeout: Duration,
    next_id: Arc<AtomicU64>,
}

impl<C> TrackingConnector<C> {
    pub fn new(inner: C, handshake_timeout: Duration) -> Self {
        Self { inner, handshake_timeout, next_id: Arc::new(AtomicU64::new(1)) }
    }

    /// Number of connections established so far.
    #[cfg(test)]
    fn established(&self) -> u64 {
        self.next_id.load(Ordering::Acquire) - 1
    }
}

impl<C> Service<Uri> for TrackingConnector<C>
where
    C: Service<Uri> + Clone + Send + 'static,
    C::Response: Send + 'static,
    C::Future: Send + 'static,
    C::Error: Into<BoxError>,
{
    type Response = TrackedStream<C::Response>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let connecting = self.inner.call(uri);
        let handshake_timeout = self.handshake_timeout;
        let next_id = Arc::clone(&self.next_id);

        Box::pin(async move {
            let stream = tokio::time::timeout(handshake_timeout, connecting)
                .await
                .map_err(|_| Box::new(HandshakeTimeout(handshake_timeout)) as BoxError)?
                .map_err(Into::into)?;

            let id = next_id.fetch_add(1, Ordering::AcqRel);
            trace!(connection_id = id, "established backend connection");

            Ok(TrackedStream { inner: stream, tag: ConnectionTag::new(id) })
        })
    }
}

/// Stream wrapper carrying the tag of its connection.
#[derive(Debug)]
pub struct TrackedStream<T> {
    inner: T,
    tag: ConnectionTag,
}

impl<T: Connection> Connection for TrackedStream<T> {
    fn connected(&self) -> Connected {
        self.inner.connected().extra(self.tag.clone())
    }
}

impl<T: Read + Unpin> Read for TrackedStream<T> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<T: Write + Unpin> Write for TrackedStream<T> {
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
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }
}

/// Observes which pooled connection a request ends up on.
pub(crate) struct ConnectionCapture {
    captured: CaptureConnection,
}

impl ConnectionCapture {
    pub(crate) fn attach<B>(request: &mut http::Request<B>) -> Self {
        Self { captured: capture_connection(request) }
    }

    /// Marks the captured connection as used by this attempt.
    ///
    /// Returns `None` while no connection has been bound to the request, otherwise
    /// whether the connection had served an earlier attempt.
    pub(crate) fn observe(&self) -> Option<bool> {
        let metadata = self.captured.connection_metadata();
        let connected = metadata.as_ref()?;

        let mut extras = http::Extensions::new();
        connected.get_extras(&mut extras);
        let tag = extras.get::<ConnectionTag>()?;

        let reused = tag.mark_used();
        trace!(connection_id = tag.id(), reused, "request bound to connection");
        Some(reused)
    }
}
