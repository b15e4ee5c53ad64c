//! Chat endpoints
//!
//! Messages run through translation and the command router exactly like a
//! voice command; exit phrases are not honoured here.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::post,
};
use futures::Stream;
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::router::Reply;

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// One server-sent event of a streamed reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamChunk {
    pub content: String,
    pub done: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: &'static str,
    pub message: &'static str,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn validate(request: &ChatRequest) -> Result<&str, ApiError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "No message provided".to_string(),
            }),
        ));
    }
    Ok(message)
}

/// Split a reply into stream events
///
/// Command replies arrive whole in a single final event; chat replies are
/// sent word by word followed by an empty final event.
#[must_use]
pub fn stream_chunks(reply: &Reply) -> Vec<StreamChunk> {
    if !reply.is_chat() {
        return vec![StreamChunk {
            content: reply.text.clone(),
            done: true,
        }];
    }

    let words: Vec<&str> = reply.text.split_whitespace().collect();
    let last = words.len().saturating_sub(1);
    let mut chunks: Vec<StreamChunk> = words
        .iter()
        .enumerate()
        .map(|(i, word)| StreamChunk {
            content: if i < last {
                format!("{word} ")
            } else {
                (*word).to_string()
            },
            done: false,
        })
        .collect();
    chunks.push(StreamChunk {
        content: String::new(),
        done: true,
    });
    chunks
}

async fn chat(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = validate(&request)?;
    tracing::debug!(message, "web chat");

    let reply = state.session.reply(message).await;
    Ok(Json(ChatResponse {
        response: reply.text,
        status: "success",
    }))
}

async fn chat_stream(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let message = validate(&request)?;
    tracing::debug!(message, "web chat (streamed)");

    let reply = state.session.reply(message).await;
    let events: Vec<Result<Event, Infallible>> = stream_chunks(&reply)
        .into_iter()
        .filter_map(|chunk| match Event::default().json_data(&chunk) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode stream event");
                None
            }
        })
        .collect();

    Ok(Sse::new(futures::stream::iter(events)).keep_alive(KeepAlive::default()))
}

async fn reset(State(state): State<Arc<ApiState>>) -> Json<ResetResponse> {
    state.session.router().services().brain.reset();
    Json(ResetResponse {
        status: "success",
        message: "Conversation reset",
    })
}

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/chat/stream", post(chat_stream))
        .route("/api/reset", post(reset))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::ReplySource;

    #[test]
    fn test_command_reply_is_single_event() {
        let reply = Reply {
            text: "Music stopped.".to_string(),
            source: ReplySource::Command,
        };
        assert_eq!(
            stream_chunks(&reply),
            vec![StreamChunk {
                content: "Music stopped.".to_string(),
                done: true,
            }]
        );
    }

    #[test]
    fn test_chat_reply_streams_words() {
        let reply = Reply {
            text: "Hi there friend".to_string(),
            source: ReplySource::Chat,
        };
        let chunks = stream_chunks(&reply);
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();

        assert_eq!(contents, vec!["Hi ", "there ", "friend", ""]);
        assert!(chunks[..3].iter().all(|c| !c.done));
        assert!(chunks[3].done);
    }

    #[test]
    fn test_blank_message_rejected() {
        let request = ChatRequest {
            message: "   ".to_string(),
        };
        let (status, Json(body)) = validate(&request).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "No message provided");
    }
}
