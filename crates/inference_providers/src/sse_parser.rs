use crate::{ChatCompletionChunk, CompletionError};
use bytes::Bytes;
use futures_util::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// SSE (Server-Sent Events) stream parser that properly handles
/// buffering of incomplete events across HTTP chunks.
///
/// A malformed `data:` frame is skipped with a warning rather than
/// failing the stream; a transport error from the inner stream ends it
/// with [`CompletionError::Stream`].
pub struct SseParser<S> {
    inner: S,
    buffer: String,
    pending: VecDeque<ChatCompletionChunk>,
    done: bool,
}

impl<S> SseParser<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: String::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Parse a single `data:` payload. `None` marks the end-of-stream
    /// sentinel; malformed payloads are dropped.
    fn parse_data(&mut self, data: &str) -> Option<ChatCompletionChunk> {
        if data == "[DONE]" {
            self.done = true;
            return None;
        }

        match serde_json::from_str::<ChatCompletionChunk>(data) {
            Ok(chunk) => Some(chunk),
            Err(e) => {
                // Skip the frame rather than aborting the whole stream
                tracing::warn!(error = %e, "skipping malformed SSE chunk");
                None
            }
        }
    }

    /// Drain complete lines out of the buffer into the pending queue
    fn process_buffer(&mut self) {
        while let Some(newline_pos) = self.buffer.find('\n') {
            let line = self.buffer.drain(..=newline_pos).collect::<String>();
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            if let Some(data) = line.strip_prefix("data: ") {
                let data = data.to_string();
                if let Some(chunk) = self.parse_data(&data) {
                    self.pending.push_back(chunk);
                }
            }
        }
    }
}

impl<S> Stream for SseParser<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    type Item = Result<ChatCompletionChunk, CompletionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Poll::Ready(Some(Ok(chunk)));
            }
            if self.done {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let text = String::from_utf8_lossy(&bytes);
                    self.buffer.push_str(&text);
                    self.process_buffer();
                    // Loop back to emit anything the buffer produced
                }
                Poll::Ready(Some(Err(e))) => {
                    self.done = true;
                    return Poll::Ready(Some(Err(CompletionError::Stream(e.to_string()))));
                }
                Poll::Ready(None) => {
                    if !self.buffer.trim().is_empty() {
                        tracing::warn!("incomplete SSE data in buffer at stream end");
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn byte_stream(
        parts: Vec<&'static str>,
    ) -> impl Stream<Item = Result<Bytes, reqwest::Error>> + Unpin {
        futures_util::stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))))
    }

    fn chunk_json(content: &str) -> String {
        format!(
            r#"{{"id":"c1","object":"chat.completion.chunk","created":1,"model":"m","choices":[{{"index":0,"delta":{{"content":"{content}"}}}}]}}"#
        )
    }

    #[tokio::test]
    async fn test_parses_complete_events() {
        let body = format!("data: {}\n\ndata: {}\n\ndata: [DONE]\n\n", chunk_json("a"), chunk_json("b"));
        let body: &'static str = Box::leak(body.into_boxed_str());
        let mut parser = SseParser::new(byte_stream(vec![body]));

        let first = parser.next().await.unwrap().unwrap();
        assert_eq!(first.content_delta(), Some("a"));
        let second = parser.next().await.unwrap().unwrap();
        assert_eq!(second.content_delta(), Some("b"));
        assert!(parser.next().await.is_none());
    }

    #[tokio::test]
    async fn test_event_split_across_http_chunks() {
        let full = format!("data: {}\n\ndata: [DONE]\n\n", chunk_json("hello"));
        let full: &'static str = Box::leak(full.into_boxed_str());
        let (head, tail) = full.split_at(20);
        let mut parser = SseParser::new(byte_stream(vec![head, tail]));

        let chunk = parser.next().await.unwrap().unwrap();
        assert_eq!(chunk.content_delta(), Some("hello"));
        assert!(parser.next().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_frame_is_skipped() {
        let body = format!(
            "data: {{not json}}\n\ndata: {}\n\ndata: [DONE]\n\n",
            chunk_json("ok")
        );
        let body: &'static str = Box::leak(body.into_boxed_str());
        let mut parser = SseParser::new(byte_stream(vec![body]));

        // The bad frame is dropped; the good one still comes through
        let chunk = parser.next().await.unwrap().unwrap();
        assert_eq!(chunk.content_delta(), Some("ok"));
        assert!(parser.next().await.is_none());
    }

    #[tokio::test]
    async fn test_comments_and_blank_lines_ignored() {
        let body = format!(": keepalive\n\n\ndata: {}\n\ndata: [DONE]\n\n", chunk_json("x"));
        let body: &'static str = Box::leak(body.into_boxed_str());
        let mut parser = SseParser::new(byte_stream(vec![body]));

        let chunk = parser.next().await.unwrap().unwrap();
        assert_eq!(chunk.content_delta(), Some("x"));
        assert!(parser.next().await.is_none());
    }
}
