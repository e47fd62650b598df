//! Adapters between HTTP bodies and blob streams.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::body::Body;
use cas_store::BlobBody;
use futures::TryStreamExt;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf, Take};
use tokio_util::io::StreamReader;

/// Turn a request body into a stream the store can consume.
pub fn request_reader(body: Body) -> BlobBody {
    let stream = body.into_data_stream().map_err(io::Error::other);
    Box::pin(StreamReader::new(stream))
}

/// Yields exactly `length` bytes from `inner`.
///
/// Extra bytes are never read. If `inner` ends early the read fails with
/// `UnexpectedEof` instead of quietly producing a short body.
pub struct ExactReader<R> {
    inner: Take<R>,
    remaining: u64,
}

impl<R: AsyncRead + Unpin> ExactReader<R> {
    pub fn new(inner: R, length: u64) -> Self {
        Self {
            inner: inner.take(length),
            remaining: length,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ExactReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.remaining == 0 || buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        let n = (buf.filled().len() - before) as u64;

        if n == 0 {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("blob ended {} bytes early", this.remaining),
            )));
        }
        this.remaining -= n;
        Poll::Ready(Ok(()))
    }
}
