//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! This module handles parsing of `text/event-stream` bodies returned by
//! `streamGenerateContent?alt=sse`, converting raw byte streams into
//! structured [`GenerateContentResponse`] chunks.

use std::error;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS};
use crate::types::{ErrorBody, GenerateContentResponse};
use crate::{Error, Result};

/// Process a stream of bytes into a stream of response chunks.
///
/// Events are delimited by a blank line.  Carriage returns are discarded so
/// both `\n\n` and `\r\n\r\n` delimiters work.  Each event is decoded as UTF-8
/// only once it is complete, so multi-byte characters split across network
/// reads decode correctly.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<GenerateContentResponse>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: error::Error + Send + Sync + 'static,
{
    stream::unfold(
        (byte_stream, Vec::<u8>::new(), false),
        move |(mut stream, mut buffer, mut done)| async move {
            loop {
                // First check if we have a complete event in the buffer
                if let Some(event) = take_event(&mut buffer) {
                    match parse_event(&event) {
                        Some(item) => return Some((item, (stream, buffer, done))),
                        None => continue,
                    }
                }

                if done {
                    return None;
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend(bytes.iter().copied().filter(|b| *b != b'\r'));
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((
                            Err(Error::streaming(
                                format!("Error in HTTP stream: {e}"),
                                Some(Box::new(e)),
                            )),
                            (stream, buffer, done),
                        ));
                    }
                    None => {
                        // End of stream; flush an unterminated trailing event.
                        done = true;
                        let rest = std::mem::take(&mut buffer);
                        if let Some(item) = parse_event(&rest) {
                            return Some((item, (stream, buffer, done)));
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Remove and return the first complete event from the buffer.
fn take_event(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = buffer.windows(2).position(|w| w == b"\n\n")?;
    let mut event: Vec<u8> = buffer.drain(..end + 2).collect();
    event.truncate(end);
    Some(event)
}

/// Parse one event.  Returns `None` for events that carry nothing to yield:
/// comments, keep-alives, and the `[DONE]` marker.
fn parse_event(event: &[u8]) -> Option<Result<GenerateContentResponse>> {
    let text = match std::str::from_utf8(event) {
        Ok(text) => text,
        Err(e) => {
            STREAM_ERRORS.click();
            return Some(Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            )));
        }
    };

    let mut data: Option<String> = None;
    for line in text.lines() {
        let Some(value) = line.strip_prefix("data:") else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match data.as_mut() {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }

    let data = data?;
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    STREAM_EVENTS.click();
    Some(parse_data(data))
}

fn parse_data(data: &str) -> Result<GenerateContentResponse> {
    let value: serde_json::Value = serde_json::from_str(data).map_err(|e| {
        Error::serialization(
            format!("Failed to parse event JSON: {e}"),
            Some(Box::new(e)),
        )
    })?;
    if value.get("error").is_some() {
        STREAM_ERRORS.click();
        let body: ErrorBody = serde_json::from_value(value)?;
        return Err(body.error.into_error(500, "error event in stream", None));
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn chunks(
        parts: &[&[u8]],
    ) -> impl Stream<Item = std::result::Result<Bytes, io::Error>> + Unpin + use<> {
        stream::iter(
            parts
                .iter()
                .map(|part| Ok(Bytes::copy_from_slice(part)))
                .collect::<Vec<_>>(),
        )
    }

    fn text_event(text: &str) -> String {
        format!(
            "data: {{\"candidates\":[{{\"content\":{{\"parts\":[{{\"text\":\"{text}\"}}],\"role\":\"model\"}}}}]}}\r\n\r\n"
        )
    }

    #[tokio::test]
    async fn parse_single_event() {
        let data = text_event("Hello");
        let mut sse_stream = Box::pin(process_sse(chunks(&[data.as_bytes()])));
        let event = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(event.text(), "Hello");
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn parse_multiple_events_in_order() {
        let data = format!("{}{}", text_event("Hel"), text_event("lo"));
        let sse_stream = process_sse(chunks(&[data.as_bytes()]));
        let texts: Vec<String> = sse_stream.map(|event| event.unwrap().text()).collect().await;
        assert_eq!(texts, vec!["Hel".to_string(), "lo".to_string()]);
    }

    #[tokio::test]
    async fn handle_split_event() {
        let data = text_event("split");
        let (first, second) = data.as_bytes().split_at(17);
        let mut sse_stream = Box::pin(process_sse(chunks(&[first, second])));
        let event = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(event.text(), "split");
    }

    #[tokio::test]
    async fn handle_multibyte_character_split_across_chunks() {
        let data = text_event("héllo");
        let bytes = data.as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut sse_stream = Box::pin(process_sse(chunks(&[&bytes[..split], &bytes[split..]])));
        let event = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(event.text(), "héllo");
    }

    #[tokio::test]
    async fn skips_comments_and_done_marker() {
        let data = format!(": keep-alive\n\n{}data: [DONE]\n\n", text_event("x"));
        let sse_stream = process_sse(chunks(&[data.as_bytes()]));
        let events: Vec<_> = sse_stream.collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().text(), "x");
    }

    #[tokio::test]
    async fn flushes_unterminated_trailing_event() {
        let data = text_event("tail");
        let trimmed = data.trim_end();
        let mut sse_stream = Box::pin(process_sse(chunks(&[trimmed.as_bytes()])));
        let event = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(event.text(), "tail");
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn handle_malformed_event() {
        let data = b"data: {not json\n\n";
        let mut sse_stream = Box::pin(process_sse(chunks(&[&data[..]])));
        let event = sse_stream.next().await.unwrap();
        assert!(matches!(event, Err(Error::Serialization { .. })));
    }

    #[tokio::test]
    async fn error_event_becomes_error() {
        let data = b"data: {\"error\":{\"code\":503,\"message\":\"The model is overloaded.\",\"status\":\"UNAVAILABLE\"}}\n\n";
        let mut sse_stream = Box::pin(process_sse(chunks(&[&data[..]])));
        let err = sse_stream.next().await.unwrap().unwrap_err();
        assert!(err.is_server_error());
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn transport_error_is_streaming_error() {
        let parts: Vec<std::result::Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from(text_event("Par"))),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];
        let mut sse_stream = Box::pin(process_sse(stream::iter(parts)));
        assert_eq!(sse_stream.next().await.unwrap().unwrap().text(), "Par");
        let err = sse_stream.next().await.unwrap().unwrap_err();
        assert!(err.is_streaming());
    }
}
