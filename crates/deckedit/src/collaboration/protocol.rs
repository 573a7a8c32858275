//! Wire messages exchanged between editing sessions.
//!
//! Every frame is one UTF-8 JSON object with a `type` discriminator and
//! camelCase fields:
//!
//! ```json
//! {"type":"join","sessionId":"…","userId":"…"}
//! {"type":"slideUpdate","sessionId":"…","userId":"…","slideIndex":0,"documentFragment":{…}}
//! {"type":"cursorMove","sessionId":"…","userId":"…","x":120,"y":48}
//! {"type":"documentSnapshot","sessionId":"…","userId":"…","slides":[…]}
//! ```

use serde::{Deserialize, Serialize};

use crate::model::Slide;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WireMessage {
    /// Sent first on every (re)connect.
    Join { session_id: String, user_id: String },

    /// Replace slide `slide_index` wholesale. An index equal to the
    /// receiver's slide count appends.
    SlideUpdate {
        session_id: String,
        user_id: String,
        slide_index: usize,
        document_fragment: Slide,
    },

    /// Ephemeral pointer position; only the latest value matters.
    CursorMove {
        session_id: String,
        user_id: String,
        x: f32,
        y: f32,
    },

    /// Replace the whole slide list, for edits that change slide count or
    /// restore a history entry.
    DocumentSnapshot {
        session_id: String,
        user_id: String,
        slides: Vec<Slide>,
    },
}

impl WireMessage {
    pub fn session_id(&self) -> &str {
        match self {
            WireMessage::Join { session_id, .. }
            | WireMessage::SlideUpdate { session_id, .. }
            | WireMessage::CursorMove { session_id, .. }
            | WireMessage::DocumentSnapshot { session_id, .. } => session_id,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            WireMessage::Join { user_id, .. }
            | WireMessage::SlideUpdate { user_id, .. }
            | WireMessage::CursorMove { user_id, .. }
            | WireMessage::DocumentSnapshot { user_id, .. } => user_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Join { .. } => "join",
            WireMessage::SlideUpdate { .. } => "slideUpdate",
            WireMessage::CursorMove { .. } => "cursorMove",
            WireMessage::DocumentSnapshot { .. } => "documentSnapshot",
        }
    }

    /// Ephemeral messages are never queued and may be dropped.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, WireMessage::CursorMove { .. })
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColorSpec, Element, ElementId, FontSpec, SlideElement};

    #[test]
    fn test_join_wire_format() {
        let join = WireMessage::Join {
            session_id: "s1".into(),
            user_id: "u1".into(),
        };
        let value: serde_json::Value = serde_json::from_str(&join.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "join", "sessionId": "s1", "userId": "u1"})
        );
    }

    #[test]
    fn test_slide_update_wire_format() {
        let slide = Slide {
            elements: vec![SlideElement {
                id: ElementId(1),
                element: Element::text(
                    "Hi",
                    10.0,
                    20.0,
                    FontSpec::new("Arial", 18.0),
                    ColorSpec::BLACK,
                ),
            }],
            background: ColorSpec::WHITE,
            template_id: None,
        };
        let msg = WireMessage::SlideUpdate {
            session_id: "s".into(),
            user_id: "u".into(),
            slide_index: 2,
            document_fragment: slide.clone(),
        };
        let value: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value["type"], "slideUpdate");
        assert_eq!(value["slideIndex"], 2);
        assert_eq!(value["documentFragment"]["background"], "#ffffff");
        assert_eq!(value["documentFragment"]["elements"][0]["content"], "Hi");

        assert_eq!(WireMessage::decode(&msg.encode().unwrap()).unwrap(), msg);
    }

    #[test]
    fn test_decode_cursor_from_peer() {
        let text = r#"{"type":"cursorMove","sessionId":"s","userId":"peer","x":12,"y":30.5}"#;
        let msg = WireMessage::decode(text).unwrap();
        assert!(msg.is_ephemeral());
        assert_eq!(msg.user_id(), "peer");
        assert_eq!(
            msg,
            WireMessage::CursorMove {
                session_id: "s".into(),
                user_id: "peer".into(),
                x: 12.0,
                y: 30.5
            }
        );
    }

    #[test]
    fn test_decode_rejects_unknown_and_malformed() {
        assert!(WireMessage::decode(r#"{"type":"chat","sessionId":"s","userId":"u"}"#).is_err());
        assert!(WireMessage::decode(r#"{"type":"join","sessionId":"s"}"#).is_err());
        assert!(WireMessage::decode("not json").is_err());
    }
}
