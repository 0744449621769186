use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use futures_util::stream::{FusedStream, Stream, StreamExt};
use tracing::{debug, info};

use crate::decoder::TextStreamDecoder;
use crate::error::SahayakApiError;

/// Boxed byte source feeding a [`TokenStream`].
pub type ByteSource = Pin<Box<dyn Stream<Item = Result<Bytes, SahayakApiError>> + Send>>;

/// Lazy sequence of text tokens decoded from a generation response body.
///
/// The byte source is read only when the consumer polls for a token and is
/// dropped as soon as iteration ends, whether by exhaustion or by the first
/// error. Once it has yielded an error or `None`, the stream stays terminated.
pub struct TokenStream {
    source: Option<ByteSource>,
    decoder: TextStreamDecoder,
    terminated: bool,
    started: Instant,
    bytes_received: usize,
    tokens: usize,
}

impl TokenStream {
    pub fn new<S, E>(source: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<SahayakApiError>,
    {
        Self {
            source: Some(source.map(|chunk| chunk.map_err(Into::into)).boxed()),
            decoder: TextStreamDecoder::new(),
            terminated: false,
            started: Instant::now(),
            bytes_received: 0,
            tokens: 0,
        }
    }

    /// Decode a `reqwest` response body.
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(response.bytes_stream())
    }

    /// True while the underlying byte source is still held.
    pub fn holds_source(&self) -> bool {
        self.source.is_some()
    }

    /// Drain the remaining tokens into one string.
    pub async fn collect_text(mut self) -> Result<String, SahayakApiError> {
        let mut text = String::new();
        while let Some(token) = self.next().await {
            text.push_str(&token?);
        }
        Ok(text)
    }

    fn release(&mut self) {
        if self.source.take().is_some() {
            debug!("token stream released its byte source");
        }
    }

    fn terminate(&mut self) {
        self.release();
        self.terminated = true;
        info!(
            "token stream finished after {:?}: {} tokens, {} bytes",
            self.started.elapsed(),
            self.tokens,
            self.bytes_received
        );
    }
}

impl Stream for TokenStream {
    type Item = Result<String, SahayakApiError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.terminated {
                return Poll::Ready(None);
            }

            match this.decoder.next_token() {
                Some(Ok(token)) => {
                    this.tokens += 1;
                    return Poll::Ready(Some(Ok(token)));
                }
                Some(Err(error)) => {
                    this.terminate();
                    return Poll::Ready(Some(Err(error)));
                }
                None => {}
            }

            let Some(source) = this.source.as_mut() else {
                // Source gone and decoder drained.
                this.terminate();
                return Poll::Ready(None);
            };

            match source.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => {
                    this.bytes_received += chunk.len();
                    debug!(
                        "stream chunk: {} bytes (total: {} bytes)",
                        chunk.len(),
                        this.bytes_received
                    );
                    this.decoder.feed(&chunk);
                }
                Poll::Ready(Some(Err(error))) => {
                    this.terminate();
                    return Poll::Ready(Some(Err(error)));
                }
                Poll::Ready(None) => {
                    this.release();
                    this.decoder.finish();
                }
            }
        }
    }
}

impl FusedStream for TokenStream {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl fmt::Debug for TokenStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStream")
            .field("holds_source", &self.source.is_some())
            .field("terminated", &self.terminated)
            .field("bytes_received", &self.bytes_received)
            .field("tokens", &self.tokens)
            .finish()
    }
}
