//! リモートコーチ
//!
//! 会話履歴をPOSTし、ストリームで返ってくる応答を組み立てる。

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::Serialize;

use super::frame_decoder::StreamAssembler;
use super::{ChatError, Coach, WireMessage};
use crate::config_manager::CoachConfig;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: &'a [WireMessage],
}

/// Coach backed by the streaming HTTP endpoint.
#[derive(Debug, Clone)]
pub struct RemoteCoach {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl RemoteCoach {
    /// 新しいインスタンスを作成
    pub fn new(config: &CoachConfig) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self::with_client(client, config))
    }

    /// 既存のHTTPクライアントを使う
    pub fn with_client(client: reqwest::Client, config: &CoachConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            bearer_token: None,
        }
    }

    /// Credential of the signed-in user
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Coach for RemoteCoach {
    async fn stream_reply(
        &self,
        history: &[WireMessage],
        on_update: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<String, ChatError> {
        tracing::debug!(
            "💬 [CHAT] Sending {} messages to {}",
            history.len(),
            self.endpoint
        );

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { messages: history });
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("⚠️ [CHAT] Coach endpoint returned {}", status);
            return Err(ChatError::Status(status.as_u16()));
        }

        let content = assemble_stream(response.bytes_stream(), on_update).await?;
        tracing::info!("💬 [CHAT] Reply complete ({} chars)", content.chars().count());
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

/// Drive the read loop over a chunked body, one chunk at a time.
///
/// `on_update` is called with the accumulated content whenever a chunk added
/// text. Reading stops at `[DONE]` or when the stream ends. A body that
/// produced no bytes at all is [`ChatError::EmptyBody`].
pub async fn assemble_stream<S, B, E>(
    stream: S,
    on_update: &mut (dyn for<'s> FnMut(&'s str) + Send),
) -> Result<String, ChatError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ChatError>,
{
    futures_util::pin_mut!(stream);

    let mut assembler = StreamAssembler::new();
    let mut received_bytes = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::into)?;
        let bytes = chunk.as_ref();
        received_bytes += bytes.len();

        if assembler.push_chunk(bytes) {
            on_update(assembler.content());
        }
        if assembler.is_done() {
            break;
        }
    }

    if received_bytes == 0 {
        return Err(ChatError::EmptyBody);
    }

    if assembler.finish() {
        on_update(assembler.content());
    }

    let stats = assembler.decoder_stats();
    tracing::debug!(
        "💬 [STREAM] {} bytes, {} deltas, {} ignored, {} malformed",
        received_bytes,
        stats.deltas,
        stats.ignored,
        stats.malformed
    );

    Ok(assembler.into_content())
}
