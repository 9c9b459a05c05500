//! Chat flow: the message list, the draft, and one backend exchange per send.
//!
//! State is hydrated from the session store on creation. A successful send
//! appends the user turn and the assistant reply, in that order, to memory
//! and to the store. A failed send appends an assistant notice to memory only
//! and keeps the draft so the user can retry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::backend::Backend;
use crate::store::{ChatMessage, Role, SessionStore};

/// Notice shown when the backend gives no description of its failure.
pub const FALLBACK_ERROR_MESSAGE: &str = "Sorry, there was an error processing your message.";

/// Placeholder rendered for an empty conversation.
pub const EMPTY_PLACEHOLDER: &str = "No messages yet";

/// Result of a `send_message` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Input was blank; nothing happened.
    Ignored,
    /// A send is already in flight; the Send control is disabled.
    Busy,
    /// Both turns were appended and persisted; the draft was cleared.
    Delivered,
    /// The request failed; `notice` was appended to memory only.
    Failed { notice: String },
}

/// What the message list renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatView {
    Empty,
    Messages(Vec<ChatMessage>),
}

impl std::fmt::Display for ChatView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "{EMPTY_PLACEHOLDER}"),
            Self::Messages(messages) => {
                for (i, msg) in messages.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", render_message(msg))?;
                }
                Ok(())
            }
        }
    }
}

/// One message as a line of the list, labelled by role.
pub fn render_message(msg: &ChatMessage) -> String {
    let label = match msg.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    format!("[{label}] {}", msg.content)
}

#[derive(Debug, Default)]
struct ChatState {
    messages: Vec<ChatMessage>,
    draft: String,
}

/// Owns the in-memory conversation and is its only writer to the store.
pub struct ChatFlow {
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn Backend>,
    state: RwLock<ChatState>,
    sending: AtomicBool,
}

/// Clears the in-flight flag however the send ends.
struct SendingGuard<'a>(&'a AtomicBool);

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ChatFlow {
    /// Create the flow, loading any history already in the session.
    pub async fn hydrate(store: Arc<dyn SessionStore>, backend: Arc<dyn Backend>) -> Self {
        let messages = store.get_chat_history().await;
        debug!(count = messages.len(), "Chat history hydrated");
        Self {
            store,
            backend,
            state: RwLock::new(ChatState {
                messages,
                draft: String::new(),
            }),
            sending: AtomicBool::new(false),
        }
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.read().await.messages.clone()
    }

    pub async fn draft(&self) -> String {
        self.state.read().await.draft.clone()
    }

    pub async fn set_draft(&self, text: impl Into<String>) {
        self.state.write().await.draft = text.into();
    }

    /// Whether a send is in flight (the Send control should be disabled).
    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst)
    }

    /// Send the current draft.
    pub async fn submit_draft(&self) -> SendOutcome {
        let draft = self.draft().await;
        self.send_message(&draft).await
    }

    /// Send `text` to the backend and merge the outcome into the conversation.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let content = text.trim();
        if content.is_empty() {
            return SendOutcome::Ignored;
        }

        if self
            .sending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Send ignored: another message is in flight");
            return SendOutcome::Busy;
        }
        let _guard = SendingGuard(&self.sending);

        debug!(content = %content, "Sending chat message");
        match self.backend.send_chat_message(content).await {
            Ok(reply) => {
                let user_message = ChatMessage::user(text);
                let ai_message = ChatMessage::assistant(reply.response);
                {
                    let mut state = self.state.write().await;
                    state.messages.push(user_message.clone());
                    state.messages.push(ai_message.clone());
                    state.draft.clear();
                }
                self.store.save_chat_message(&user_message).await;
                self.store.save_chat_message(&ai_message).await;
                SendOutcome::Delivered
            }
            Err(e) => {
                error!(
                    error = %e,
                    status = ?e.status(),
                    request_content = %content,
                    "Error sending message"
                );
                let notice = e
                    .user_message()
                    .unwrap_or(FALLBACK_ERROR_MESSAGE)
                    .to_string();
                self.state
                    .write()
                    .await
                    .messages
                    .push(ChatMessage::assistant(notice.clone()));
                SendOutcome::Failed { notice }
            }
        }
    }

    /// Empty the conversation in memory and in the store.
    ///
    /// A send already in flight is not cancelled; its reply lands in
    /// whatever state exists when it resolves.
    pub async fn clear_chat(&self) {
        self.state.write().await.messages.clear();
        self.store.clear_chat_history().await;
        info!("Chat cleared");
    }

    pub async fn view(&self) -> ChatView {
        let state = self.state.read().await;
        if state.messages.is_empty() {
            ChatView::Empty
        } else {
            ChatView::Messages(state.messages.clone())
        }
    }
}
