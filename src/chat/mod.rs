//! 禁煙コーチとのチャット
//!
//! 会話モデル、ストリームデコーダ、リモート/オフラインのコーチ実装、
//! およびチャットセッションを提供する。

pub mod frame_decoder;
pub mod offline;
pub mod quotes;
pub mod session;
pub mod streamer;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config_manager::CoachConfig;

pub use frame_decoder::{DecoderStats, Frame, LineFrameDecoder, StreamAssembler};
pub use offline::{FixedPicker, KeywordResponder, OfflineCoach, RandomPicker, ReplyPicker};
pub use quotes::{Quote, QuoteRotation, MOTIVATIONAL_QUOTES};
pub use session::{ChatEvent, ChatSession, GREETING, QUICK_REPLIES};
pub use streamer::{assemble_stream, RemoteCoach};

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Request form: ids and timestamps stripped
    pub fn to_wire(&self) -> WireMessage {
        WireMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Message as sent to the coach endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl WireMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Chat request and stream failures.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Transport failure (connect, TLS, read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("Coach endpoint returned status {0}")]
    Status(u16),

    /// Response carried no body at all
    #[error("Coach endpoint returned an empty body")]
    EmptyBody,

    /// A reply is already being streamed for this session
    #[error("A reply is already in progress")]
    Busy,

    /// Coach implementation specific failure
    #[error("Coach backend error: {0}")]
    Backend(String),
}

impl ChatError {
    /// Whether retrying the same request later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ChatError::Http(_) | ChatError::EmptyBody => true,
            ChatError::Status(status) => *status == 429 || *status >= 500,
            ChatError::Busy | ChatError::Backend(_) => false,
        }
    }
}

/// Something that can answer a conversation.
///
/// `on_update` receives the full reply text accumulated so far, every time it
/// grows. The returned string is the final reply.
#[async_trait]
pub trait Coach: Send + Sync {
    async fn stream_reply(
        &self,
        history: &[WireMessage],
        on_update: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<String, ChatError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Picks the coach for a conversation.
///
/// The remote coach is used only when it is enabled in the config and the
/// user is entitled to it; otherwise (or if the HTTP client cannot be built)
/// the offline keyword coach answers.
pub fn select_coach(
    config: &CoachConfig,
    entitled: bool,
    bearer_token: Option<String>,
) -> Box<dyn Coach> {
    if !config.use_remote {
        tracing::debug!("💬 [CHAT] Remote coach disabled, using offline coach");
        return Box::new(OfflineCoach::default());
    }
    if !entitled {
        tracing::info!("💬 [CHAT] Not entitled to remote coach, using offline coach");
        return Box::new(OfflineCoach::default());
    }

    match RemoteCoach::new(config) {
        Ok(coach) => {
            tracing::debug!("💬 [CHAT] Using remote coach at {}", coach.endpoint());
            match bearer_token {
                Some(token) => Box::new(coach.with_bearer_token(token)),
                None => Box::new(coach),
            }
        }
        Err(e) => {
            tracing::warn!("⚠️ [CHAT] Remote coach unavailable, using offline coach: {}", e);
            Box::new(OfflineCoach::default())
        }
    }
}
