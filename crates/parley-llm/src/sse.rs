//! Server-Sent Events parsing for the chat completions stream.
//!
//! The upstream API streams newline-delimited `data: {...}` lines and
//! closes with a `data: [DONE]` marker. This parser buffers raw bytes,
//! splits complete lines, and yields the JSON payload strings.

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio_stream::StreamExt;
use tracing::warn;

/// Parse SSE lines from a byte stream and yield JSON data strings.
///
/// Buffers incoming chunks, splits on newlines, strips the `data: `
/// prefix, and skips comments, empty payloads, and the `[DONE]` marker.
/// A transport read error is yielded to the caller and terminates the
/// stream; only a clean close of the byte stream ends it with `None`.
pub fn parse_sse_lines<S, E>(byte_stream: S) -> impl Stream<Item = Result<String, E>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Send + 'static,
{
    futures::stream::unfold(
        Some((byte_stream, BytesMut::with_capacity(8192))),
        move |state| async move {
            let (mut stream, mut buffer) = state?;
            loop {
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line_bytes = buffer.split_to(newline_pos + 1);
                    line_bytes.truncate(line_bytes.len() - 1);
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.truncate(line_bytes.len() - 1);
                    }

                    let Ok(line) = std::str::from_utf8(&line_bytes) else {
                        continue;
                    };
                    if let Some(data) = extract_sse_data(line) {
                        return Some((Ok(data), Some((stream, buffer))));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    // State is dropped so the error is the final item.
                    Some(Err(e)) => return Some((Err(e), None)),
                    // The upstream terminates with an explicit [DONE], so a
                    // partial trailing line is discarded.
                    None => return None,
                }
            }
        },
    )
}

/// Extract the data payload from one SSE line.
///
/// Returns `Some(data)` for data lines, `None` for comments, empty
/// lines, and `[DONE]` markers.
fn extract_sse_data(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))?
        .trim();

    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data.to_string())
}

/// Parse JSON from an SSE data string, logging and skipping on failure.
pub fn parse_sse_data<T: serde::de::DeserializeOwned>(data: &str) -> Option<T> {
    match serde_json::from_str(data) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(
                error = %e,
                data_preview = parley_core::text::truncate_str(data, 100),
                "failed to parse SSE data"
            );
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_data_line() {
        assert_eq!(
            extract_sse_data("data: {\"type\":\"chunk\"}"),
            Some("{\"type\":\"chunk\"}".into())
        );
    }

    #[test]
    fn extract_data_line_no_space() {
        assert_eq!(
            extract_sse_data("data:{\"type\":\"chunk\"}"),
            Some("{\"type\":\"chunk\"}".into())
        );
    }

    #[test]
    fn extract_skips_done_marker() {
        assert_eq!(extract_sse_data("data: [DONE]"), None);
    }

    #[test]
    fn extract_skips_empty_and_comments() {
        assert_eq!(extract_sse_data(""), None);
        assert_eq!(extract_sse_data("data: "), None);
        assert_eq!(extract_sse_data(": keep-alive"), None);
        assert_eq!(extract_sse_data("event: message"), None);
    }

    #[test]
    fn parse_invalid_json_returns_none() {
        let result: Option<serde_json::Value> = parse_sse_data("{broken");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn parses_lines_across_chunk_boundaries() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"data: {\"a\"")),
            Ok(Bytes::from_static(b":1}\ndata: {\"b\":2}\n")),
            Ok(Bytes::from_static(b"data: [DONE]\n")),
        ];
        let stream = parse_sse_lines(futures::stream::iter(chunks));
        let lines: Vec<String> = stream.map(Result::unwrap).collect().await;
        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[tokio::test]
    async fn handles_crlf_lines() {
        let chunks: Vec<Result<Bytes, std::io::Error>> =
            vec![Ok(Bytes::from_static(b"data: {\"a\":1}\r\n"))];
        let stream = parse_sse_lines(futures::stream::iter(chunks));
        let lines: Vec<String> = stream.map(Result::unwrap).collect().await;
        assert_eq!(lines, vec!["{\"a\":1}"]);
    }

    #[tokio::test]
    async fn read_error_is_yielded_and_ends_the_stream() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"data: {\"a\":1}\n")),
            Err(std::io::Error::from(std::io::ErrorKind::ConnectionReset)),
            Ok(Bytes::from_static(b"data: {\"b\":2}\n")),
        ];
        let stream = parse_sse_lines(futures::stream::iter(chunks));
        futures::pin_mut!(stream);
        assert_eq!(stream.next().await.unwrap().unwrap(), "{\"a\":1}");
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionReset);
        // Nothing after the error, including the buffered later chunk.
        assert!(stream.next().await.is_none());
    }
}
