//! Server-sent events framing.

use std::pin::Pin;

use {futures::StreamExt, tokio_stream::Stream, tracing::trace};

use crate::error::{AgentError, Result};

/// Incremental SSE decoder yielding the `data:` payload of each event.
///
/// Events are separated by a blank line. Multiple `data:` lines within one
/// event are joined with `\n`. Comment lines and other fields are ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: String,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes and return every complete event payload.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.push_str(&String::from_utf8_lossy(chunk));
        if self.buf.contains('\r') {
            self.buf = self.buf.replace("\r\n", "\n");
        }

        let mut out = Vec::new();
        while let Some(pos) = self.buf.find("\n\n") {
            let block: String = self.buf.drain(..pos + 2).collect();
            if let Some(data) = block_data(&block) {
                out.push(data);
            }
        }
        out
    }

    /// Flush a trailing event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        let block = std::mem::take(&mut self.buf);
        block_data(&block)
    }
}

fn block_data(block: &str) -> Option<String> {
    let lines: Vec<&str> = block
        .lines()
        .filter_map(|line| {
            line.strip_prefix("data:")
                .map(|d| d.strip_prefix(' ').unwrap_or(d))
        })
        .collect();
    if lines.is_empty() {
        return None;
    }
    let data = lines.join("\n");
    (!data.trim().is_empty()).then_some(data)
}

/// Turn a streaming HTTP response into a stream of event payloads.
pub fn data_stream(
    resp: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<String>> + Send>> {
    Box::pin(async_stream::stream! {
        let mut byte_stream = resp.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(AgentError::Stream(e.to_string()));
                    return;
                },
            };
            for data in decoder.push(&chunk) {
                trace!(data = %data, "sse event");
                yield Ok(data);
            }
        }

        if let Some(data) = decoder.finish() {
            yield Ok(data);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_events_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"a\":").is_empty());
        let events = decoder.push(b"1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(events, vec!["{\"a\":1}", "{\"b\":2}"]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn handles_crlf_and_comments() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keep-alive\r\n\r\nevent: message\r\ndata: x\r\n\r\n");
        assert_eq!(events, vec!["x"]);
    }

    #[test]
    fn joins_multiline_data() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: line one\ndata:line two\n\n");
        assert_eq!(events, vec!["line one\nline two"]);
    }

    #[test]
    fn flushes_unterminated_tail() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: last").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("last"));
    }
}
