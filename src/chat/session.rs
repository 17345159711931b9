//! チャットセッション
//!
//! - 会話は追記のみ（最初の1件はコーチの挨拶）
//! - 応答中は次の送信を受け付けない
//! - 失敗時は空のプレースホルダーを取り除き、通知を1件だけ出す

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{ChatError, ChatMessage, Coach, WireMessage};

pub const GREETING: &str = "Hi! I'm your smoke-free companion 🌟 I'm here to help you with cravings, motivation, or any questions about your quit journey. How can I support you today?";

/// Suggested first questions
pub const QUICK_REPLIES: [&str; 3] = [
    "I'm having a craving",
    "Need motivation",
    "What are the benefits?",
];

/// Shown when a reply could not be produced
pub const UNAVAILABLE_NOTICE: &str = "Sorry, I'm unable to respond right now. Please try again.";

/// Quick replies are offered while the conversation is shorter than this
const QUICK_REPLY_LIMIT: usize = 3;

/// Conversation changes pushed to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    MessageAppended(ChatMessage),
    MessageUpdated { id: String, content: String },
    MessageRemoved { id: String },
    /// User-visible notification
    Notice(String),
}

/// One conversation with the coach.
pub struct ChatSession {
    messages: Mutex<Vec<ChatMessage>>,
    in_flight: AtomicBool,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ChatEvent>>>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(vec![ChatMessage::assistant(GREETING)]),
            in_flight: AtomicBool::new(false),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Receive every change made to the conversation from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChatEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// A reply is being produced
    pub fn is_responding(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn quick_replies(&self) -> &'static [&'static str] {
        if self.len() < QUICK_REPLY_LIMIT {
            &QUICK_REPLIES
        } else {
            &[]
        }
    }

    /// Send a user message and stream the coach's reply into the conversation.
    ///
    /// Blank input is ignored (`Ok(None)`). A successful reply with no text
    /// leaves no assistant message behind and also returns `Ok(None)`.
    pub async fn send(
        &self,
        text: &str,
        coach: &dyn Coach,
    ) -> Result<Option<ChatMessage>, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("💬 [CHAT] Send rejected, reply already in progress");
            return Err(ChatError::Busy);
        }

        self.append(ChatMessage::user(text));
        let history: Vec<WireMessage> = self
            .messages
            .lock()
            .iter()
            .map(ChatMessage::to_wire)
            .collect();

        let placeholder = ChatMessage::assistant("");
        let placeholder_id = placeholder.id.clone();
        self.append(placeholder);

        // 中断（futureのdrop）時もここで後始末される
        let _in_flight = InFlight {
            session: self,
            placeholder_id: &placeholder_id,
        };

        tracing::debug!("💬 [CHAT] Asking {} coach", coach.name());
        let mut on_update = |content: &str| self.set_content(&placeholder_id, content);
        let result = coach.stream_reply(&history, &mut on_update).await;

        match result {
            Ok(content) if content.trim().is_empty() => {
                tracing::debug!("💬 [CHAT] Empty reply, dropping placeholder");
                self.remove(&placeholder_id);
                Ok(None)
            }
            Ok(content) => {
                self.set_content(&placeholder_id, &content);
                Ok(self.find(&placeholder_id))
            }
            Err(e) => {
                tracing::warn!("⚠️ [CHAT] {} coach failed: {}", coach.name(), e);
                self.remove(&placeholder_id);
                self.emit(ChatEvent::Notice(UNAVAILABLE_NOTICE.to_string()));
                Err(e)
            }
        }
    }

    fn append(&self, message: ChatMessage) {
        self.messages.lock().push(message.clone());
        self.emit(ChatEvent::MessageAppended(message));
    }

    fn set_content(&self, id: &str, content: &str) {
        let changed = {
            let mut messages = self.messages.lock();
            match messages.iter_mut().find(|m| m.id == id) {
                Some(message) if message.content != content => {
                    message.content = content.to_string();
                    true
                }
                _ => false,
            }
        };

        if changed {
            self.emit(ChatEvent::MessageUpdated {
                id: id.to_string(),
                content: content.to_string(),
            });
        }
    }

    fn remove(&self, id: &str) {
        let removed = {
            let mut messages = self.messages.lock();
            let before = messages.len();
            messages.retain(|m| m.id != id);
            messages.len() != before
        };

        if removed {
            self.emit(ChatEvent::MessageRemoved { id: id.to_string() });
        }
    }

    fn remove_if_empty(&self, id: &str) {
        let empty = self
            .messages
            .lock()
            .iter()
            .any(|m| m.id == id && m.content.is_empty());
        if empty {
            self.remove(id);
        }
    }

    fn find(&self, id: &str) -> Option<ChatMessage> {
        self.messages.lock().iter().find(|m| m.id == id).cloned()
    }

    fn emit(&self, event: ChatEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// 応答中フラグの解除と空プレースホルダーの掃除
struct InFlight<'a> {
    session: &'a ChatSession,
    placeholder_id: &'a str,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.session.remove_if_empty(self.placeholder_id);
        self.session.in_flight.store(false, Ordering::Release);
    }
}
