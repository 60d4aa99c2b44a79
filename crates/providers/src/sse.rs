//! Server-sent-event framing for streaming completions.
//!
//! The response body is buffered, split into `\n\n`-delimited event blocks,
//! and every `data:` payload is handed to a parser that turns it into zero
//! or more [`StreamEvent`]s.

use crate::util::from_reqwest;
use felos_domain::error::Result;
use felos_domain::stream::{BoxStream, StreamEvent};

/// Pull every complete `data:` payload out of `buffer`.
///
/// Consumed blocks are removed; a trailing partial block stays in place for
/// the next chunk. `\r\n` line endings are normalized first.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    if buffer.contains('\r') {
        *buffer = buffer.replace("\r\n", "\n");
    }

    let mut payloads = Vec::new();
    while let Some(end) = buffer.find("\n\n") {
        let block: String = buffer.drain(..end + 2).collect();
        payloads.extend(
            block
                .lines()
                .filter_map(|line| line.trim().strip_prefix("data:"))
                .map(str::trim)
                .filter(|data| !data.is_empty())
                .map(str::to_owned),
        );
    }
    payloads
}

/// Turn an SSE `reqwest::Response` into a [`BoxStream`] of events.
///
/// Guarantees a terminal `Done` even when the parser never produced one.
/// Dropping the returned stream drops the response and with it the
/// upstream connection.
pub(crate) fn sse_response_stream<F>(
    response: reqwest::Response,
    mut parse_data: F,
) -> BoxStream<'static, Result<StreamEvent>>
where
    F: FnMut(&str) -> Vec<Result<StreamEvent>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut response = response;
        let mut buffer = String::new();
        let mut saw_done = false;

        loop {
            let finished = match response.chunk().await {
                Ok(Some(bytes)) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));
                    false
                }
                Ok(None) => {
                    if !buffer.trim().is_empty() {
                        buffer.push_str("\n\n");
                    }
                    true
                }
                Err(e) => {
                    yield Err(from_reqwest(e));
                    break;
                }
            };

            for data in drain_data_lines(&mut buffer) {
                for event in parse_data(&data) {
                    saw_done |= matches!(&event, Ok(StreamEvent::Done { .. }));
                    yield event;
                }
            }

            if finished {
                break;
            }
        }

        if !saw_done {
            yield Ok(StreamEvent::Done {
                usage: None,
                finish_reason: Some("stop".into()),
            });
        }
    };

    Box::pin(stream)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
