use std::fmt;

use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Local>,
}

impl Turn {
    fn new(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            at: Local::now(),
        }
    }
}

/// Token for the one assistant turn still being streamed into.
///
/// Only the holder of a `LiveTurn` may rewrite that turn's content.
#[derive(Debug)]
pub struct LiveTurn {
    index: usize,
}

/// Chronological, append-only list of turns.
pub struct ConversationState {
    messages: Vec<Turn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn add_user_message(&mut self, message: &str) {
        self.messages.push(Turn::new(Role::User, message));
    }

    pub fn add_assistant_message(&mut self, message: &str) {
        self.messages.push(Turn::new(Role::Assistant, message));
    }

    /// Append an assistant turn that later chunks will replace in place.
    pub fn begin_live_message(&mut self, message: &str) -> LiveTurn {
        self.add_assistant_message(message);
        LiveTurn {
            index: self.messages.len() - 1,
        }
    }

    pub fn update_live_message(&mut self, live: &LiveTurn, message: &str) {
        if let Some(turn) = self.messages.get_mut(live.index) {
            turn.content.clear();
            turn.content.push_str(message);
        }
    }

    pub fn get_messages(&self) -> &[Turn] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}
