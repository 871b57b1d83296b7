use serde::{Deserialize, Serialize};

use crate::event::PostEvent;

use std::sync::Arc;

pub const MAX_PREV_MSGS: usize = 100;

/// Each editor walks the shared history with its own cursor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Post,
    Comment,
}

/// Bounded list of previously sent messages, oldest first.
///
/// A cursor equal to the number of messages points past the newest entry,
/// which is where a fresh draft sits.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageHistory {
    messages: Arc<Vec<String>>,
    post_index: usize,
    comment_index: usize,
    capacity: usize,
}

impl Default for MessageHistory {
    fn default() -> Self {
        MessageHistory::with_capacity(MAX_PREV_MSGS)
    }
}

impl MessageHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        MessageHistory {
            messages: Arc::default(),
            post_index: 0,
            comment_index: 0,
            capacity,
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn index(&self, kind: HistoryKind) -> usize {
        match kind {
            HistoryKind::Post => self.post_index,
            HistoryKind::Comment => self.comment_index,
        }
    }

    /// The message under the cursor, `None` when positioned on a fresh draft.
    pub fn current(&self, kind: HistoryKind) -> Option<&str> {
        self.messages.get(self.index(kind)).map(String::as_str)
    }

    pub fn add(&self, message: &str) -> Self {
        let mut messages = Arc::clone(&self.messages);
        {
            let list = Arc::make_mut(&mut messages);
            list.push(message.to_string());
            if list.len() > self.capacity {
                let excess = list.len() - self.capacity;
                list.drain(..excess);
            }
        }

        let len = messages.len();
        MessageHistory {
            messages,
            post_index: len,
            comment_index: len,
            capacity: self.capacity,
        }
    }

    pub fn reset_index(&self, kind: HistoryKind) -> Self {
        self.with_index(kind, self.messages.len())
    }

    pub fn move_back(&self, kind: HistoryKind) -> Self {
        let index = self.index(kind);
        if index == 0 {
            return self.clone();
        }
        self.with_index(kind, index - 1)
    }

    pub fn move_forward(&self, kind: HistoryKind) -> Self {
        let index = self.index(kind);
        if index >= self.messages.len() {
            return self.clone();
        }
        self.with_index(kind, index + 1)
    }

    /// Moves both cursors back onto a fresh draft.
    pub fn reset(&self) -> Self {
        self.reset_index(HistoryKind::Post)
            .reset_index(HistoryKind::Comment)
    }

    pub fn reduce(&self, event: &PostEvent) -> Self {
        match event {
            PostEvent::AddMessageIntoHistory(message) => self.add(message),
            PostEvent::ResetHistoryIndex(kind) => self.reset_index(*kind),
            PostEvent::MoveHistoryIndexBack(kind) => self.move_back(*kind),
            PostEvent::MoveHistoryIndexForward(kind) => self.move_forward(*kind),
            PostEvent::ChannelDeleted {
                view_archived_channels: true,
                ..
            } => self.reset(),
            PostEvent::LogoutSuccess => MessageHistory::with_capacity(self.capacity),
            _ => self.clone(),
        }
    }

    fn with_index(&self, kind: HistoryKind, index: usize) -> Self {
        let mut next = self.clone();
        match kind {
            HistoryKind::Post => next.post_index = index,
            HistoryKind::Comment => next.comment_index = index,
        }
        next
    }
}
