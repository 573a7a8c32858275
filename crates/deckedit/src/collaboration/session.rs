use std::collections::BTreeMap;

use super::protocol::WireMessage;

const ID_LEN: usize = 16;

/// Random lowercase hex identifier.
pub fn generate_id() -> String {
    (0..ID_LEN)
        .map(|_| {
            let nibble = fastrand::u8(0..16);
            char::from_digit(nibble as u32, 16).unwrap_or('0')
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorPosition {
    pub x: f32,
    pub y: f32,
}

/// Identity of this editor within a shared session, plus the last known
/// pointer position of every peer. Cursor entries are overwritten on update
/// and never expire.
#[derive(Debug, Clone)]
pub struct Session {
    session_id: String,
    user_id: String,
    remote_cursors: BTreeMap<String, CursorPosition>,
}

impl Session {
    /// Join `session_id`, or start a fresh session when none is given. The
    /// user id is always new.
    pub fn new(session_id: Option<String>) -> Self {
        let session_id = session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(generate_id);
        Self::with_ids(session_id, generate_id())
    }

    pub fn with_ids(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            remote_cursors: BTreeMap::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn join_message(&self) -> WireMessage {
        WireMessage::Join {
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
        }
    }

    /// True for messages from a peer in this session. Our own echoes and
    /// traffic for other sessions are rejected.
    pub fn accepts(&self, message: &WireMessage) -> bool {
        message.session_id() == self.session_id && message.user_id() != self.user_id
    }

    pub fn upsert_cursor(&mut self, user_id: &str, position: CursorPosition) {
        self.remote_cursors.insert(user_id.to_string(), position);
    }

    pub fn cursor(&self, user_id: &str) -> Option<CursorPosition> {
        self.remote_cursors.get(user_id).copied()
    }

    pub fn remote_cursors(&self) -> impl Iterator<Item = (&str, CursorPosition)> {
        self.remote_cursors.iter().map(|(id, pos)| (id.as_str(), *pos))
    }

    pub fn remote_cursor_count(&self) -> usize {
        self.remote_cursors.len()
    }
}
