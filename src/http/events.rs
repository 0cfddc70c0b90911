//! Server-Sent Events progress stream.
//!
//! A new subscriber first receives a `snapshot` event with the current
//! status board, then one event per `MintEvent` (`progress`, `completed`,
//! `failed`). The stream ends on shutdown.
//!
//! `SseDecoder` reads the stream back on the client side.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::http::server::AppState;
use crate::minting::MintEvent;

struct Feed {
    events: broadcast::Receiver<MintEvent>,
    shutdown: broadcast::Receiver<()>,
}

/// Build an SSE event with a JSON payload.
fn json_event<T: Serialize>(name: &'static str, data: &T) -> Event {
    Event::default()
        .event(name)
        .json_data(data)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

/// `GET /api/events`
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let board = state.minter.board();
    let feed = Feed {
        events: board.subscribe(),
        shutdown: state.shutdown.subscribe(),
    };
    let snapshot = json_event("snapshot", &board.snapshot());

    let updates = stream::unfold(feed, |mut feed| async move {
        loop {
            tokio::select! {
                _ = feed.shutdown.recv() => return None,
                received = feed.events.recv() => match received {
                    Ok(event) => {
                        let sse = json_event(event.kind(), &event);
                        return Some((Ok::<_, Infallible>(sse), feed));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Event subscriber lagged");
                    }
                    Err(RecvError::Closed) => return None,
                },
            }
        }
    });

    Sse::new(stream::once(async move { Ok::<_, Infallible>(snapshot) }).chain(updates))
        .keep_alive(KeepAlive::default())
}

/// One `event:`/`data:` pair read back from an event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental reader for a `text/event-stream` body.
///
/// Bytes are buffered until a full line arrives, so a UTF-8 sequence split
/// across chunks decodes intact.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw[..end]);
            let line = line.trim_end_matches('\r');
            if let Some(name) = line.strip_prefix("event:") {
                self.event = name.trim().to_string();
            } else if let Some(data) = line.strip_prefix("data:") {
                frames.push(SseFrame {
                    event: self.event.clone(),
                    data: data.trim().to_string(),
                });
            }
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_joins_split_lines() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: progress\r\nda").is_empty());
        let frames = decoder.push(b"ta: {\"message\":\"Creating mint...\"}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "progress".to_string(),
                data: r#"{"message":"Creating mint..."}"#.to_string(),
            }]
        );
    }

    #[test]
    fn test_decoder_keeps_multibyte_chars_split_across_chunks() {
        let body = "event: completed\ndata: {\"name\":\"Jeton \u{e9}t\u{e9} \u{1f680}\"}\n".as_bytes();
        let mut decoder = SseDecoder::new();
        let mut frames = Vec::new();
        for chunk in body.chunks(3) {
            frames.extend(decoder.push(chunk));
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "completed");
        assert_eq!(frames[0].data, "{\"name\":\"Jeton \u{e9}t\u{e9} \u{1f680}\"}");
        assert!(!frames[0].data.contains('\u{fffd}'));
    }
}
