use tracing::warn;

use crate::api::chatbot::send_message;
use crate::session::history::{MessageRecord, Role};
use crate::session::render::Renderer;
use crate::session::storage::KeyValueStorage;
use crate::session::store::HistoryStore;

pub const NETWORK_ERROR_REPLY: &str = "Network error — please try again.";
pub const EMPTY_REPLY: &str = "Sorry — something went wrong.";

/// The chat panel: renders turns, persists them when history is enabled and
/// talks to the chatbot endpoint.
pub struct ChatSession<S, R> {
    client: reqwest::Client,
    server_url: String,
    history: Option<HistoryStore<S>>,
    renderer: R,
}

impl<S: KeyValueStorage, R: Renderer> ChatSession<S, R> {
    pub fn new(
        client: reqwest::Client,
        server_url: impl Into<String>,
        history: Option<HistoryStore<S>>,
        renderer: R,
    ) -> Self {
        Self { client, server_url: server_url.into(), history, renderer }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn history(&self) -> Option<&HistoryStore<S>> {
        self.history.as_ref()
    }

    pub fn into_parts(self) -> (Option<HistoryStore<S>>, R) {
        (self.history, self.renderer)
    }

    /// Replays stored turns into the renderer. Returns how many were shown.
    pub fn open(&mut self) -> usize {
        match &self.history {
            Some(store) => store.replay(&mut self.renderer),
            None => 0,
        }
    }

    /// Sends one line of user input and returns the bot turn that was shown.
    /// Blank input is ignored.
    pub async fn send(&mut self, text: &str) -> Option<MessageRecord> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.push(Role::User, text);

        self.renderer.show_typing();
        let outcome = send_message(&self.client, &self.server_url, text).await;
        self.renderer.hide_typing();

        let reply = match outcome {
            Ok(resp) => match resp.reply {
                Some(reply) if !reply.trim().is_empty() => reply,
                _ => EMPTY_REPLY.to_string(),
            },
            Err(e) => {
                warn!(server = %self.server_url, error = %e, "chatbot request rejected");
                NETWORK_ERROR_REPLY.to_string()
            }
        };

        Some(self.push(Role::Bot, &reply))
    }

    fn push(&mut self, role: Role, text: &str) -> MessageRecord {
        let record = MessageRecord::now(role, text);
        self.renderer.render(&record);
        if let Some(store) = self.history.as_mut() {
            store.append_record(record.clone());
        }
        record
    }
}
