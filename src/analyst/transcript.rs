use crate::model::{ChatMessage, ChatRole};

pub const WELCOME: &str =
    "Welcome! I'm your AI Portfolio Analyst. Ask me about performance, risk, or asset allocation.";

/// Chat history of the AI analyst panel.
///
/// A reply is streamed into an empty assistant entry pushed at submit time;
/// only one question may be outstanding.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    loading: bool,
}

impl Default for Transcript {
    fn default() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(WELCOME)],
            loading: false,
        }
    }
}

impl Transcript {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Record a user question. Returns the question to send, or `None` when
    /// the input is blank or a reply is still streaming.
    pub fn submit(&mut self, input: &str) -> Option<String> {
        if input.trim().is_empty() || self.loading {
            return None;
        }
        self.messages.push(ChatMessage::user(input));
        self.messages.push(ChatMessage::assistant(""));
        self.loading = true;
        Some(input.to_string())
    }

    pub fn append_chunk(&mut self, chunk: &str) {
        if let Some(last) = self.messages.last_mut() {
            if last.role == ChatRole::Assistant {
                last.content.push_str(chunk);
            }
        }
    }

    /// Replace the pending reply with an apology carrying the error.
    pub fn fail(&mut self, error: &str) {
        if let Some(last) = self.messages.last_mut() {
            if last.role == ChatRole::Assistant {
                last.content = format!("Sorry, I encountered an error: {error}");
            }
        }
        self.loading = false;
    }

    pub fn finish(&mut self) {
        self.loading = false;
    }

    /// True while the newest reply has not produced any text yet.
    pub fn awaiting_first_chunk(&self) -> bool {
        self.loading
            && self
                .messages
                .last()
                .is_some_and(|m| m.role == ChatRole::Assistant && m.content.is_empty())
    }
}
