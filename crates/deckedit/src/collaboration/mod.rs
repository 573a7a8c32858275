//! Real-time collaboration between editing sessions.
//!
//! [`CollaborationChannel`] is the editor-side endpoint. It never touches a
//! socket: it queues outbound messages and drains inbound ones, and a
//! [`TransportLink`] carries them to whatever transport is attached (the
//! WebSocket task in [`client`], or a test harness).
//!
//! Durable messages (`slideUpdate`, `documentSnapshot`) go through an
//! unbounded queue and survive disconnects. Cursor moves go through a
//! latest-value slot: a newer position replaces one not yet sent.

pub mod client;
pub mod protocol;
pub mod session;

use tokio::sync::{mpsc, watch};

use crate::model::Slide;

pub use protocol::{ProtocolError, WireMessage};
pub use session::{CursorPosition, Session, generate_id};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed(String),
}

/// What a transport reports back to the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connecting,
    Opened,
    Closed,
    Failed(String),
    Message(WireMessage),
}

/// Transport side of a [`CollaborationChannel`].
#[derive(Debug)]
pub struct TransportLink {
    /// Must be the first frame on every connection.
    pub join: WireMessage,
    pub outbound: mpsc::UnboundedReceiver<WireMessage>,
    pub cursor: watch::Receiver<Option<WireMessage>>,
    pub events: mpsc::UnboundedSender<ChannelEvent>,
}

#[derive(Debug)]
pub struct CollaborationChannel {
    session: Session,
    state: ConnectionState,
    outbound: mpsc::UnboundedSender<WireMessage>,
    cursor: watch::Sender<Option<WireMessage>>,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// Create a channel and the link a transport drives it through.
pub fn pair(session: Session) -> (CollaborationChannel, TransportLink) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (cursor_tx, cursor_rx) = watch::channel(None);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let link = TransportLink {
        join: session.join_message(),
        outbound: outbound_rx,
        cursor: cursor_rx,
        events: events_tx,
    };
    let channel = CollaborationChannel {
        session,
        state: ConnectionState::Disconnected,
        outbound: outbound_tx,
        cursor: cursor_tx,
        events: events_rx,
    };
    (channel, link)
}

impl CollaborationChannel {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    fn send_durable(&self, message: WireMessage) {
        log::debug!("Queueing {} for broadcast", message.kind());
        if self.outbound.send(message).is_err() {
            log::error!("Collaboration transport is gone; update not sent");
        }
    }

    pub fn broadcast_slide(&self, slide_index: usize, slide: &Slide) {
        self.send_durable(WireMessage::SlideUpdate {
            session_id: self.session.session_id().to_string(),
            user_id: self.session.user_id().to_string(),
            slide_index,
            document_fragment: slide.clone(),
        });
    }

    pub fn broadcast_snapshot(&self, slides: &[Slide]) {
        self.send_durable(WireMessage::DocumentSnapshot {
            session_id: self.session.session_id().to_string(),
            user_id: self.session.user_id().to_string(),
            slides: slides.to_vec(),
        });
    }

    /// Publish the local pointer position. Replaces any position the
    /// transport has not sent yet.
    pub fn move_cursor(&self, x: f32, y: f32) {
        let message = WireMessage::CursorMove {
            session_id: self.session.session_id().to_string(),
            user_id: self.session.user_id().to_string(),
            x,
            y,
        };
        // send_replace keeps the value even with no live receiver.
        self.cursor.send_replace(Some(message));
    }

    /// Process everything the transport delivered since the last call.
    /// Connection events update [`state`](Self::state), cursor moves update
    /// the session, and the durable messages for the document are returned
    /// in arrival order.
    pub fn drain(&mut self) -> Vec<WireMessage> {
        let mut durable = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            match event {
                ChannelEvent::Connecting => self.state = ConnectionState::Connecting,
                ChannelEvent::Opened => {
                    log::info!("Joined session {}", self.session.session_id());
                    self.state = ConnectionState::Connected;
                }
                ChannelEvent::Closed => {
                    log::info!("Disconnected from session {}", self.session.session_id());
                    self.state = ConnectionState::Disconnected;
                }
                ChannelEvent::Failed(reason) => {
                    log::warn!("Collaboration connection failed: {reason}");
                    self.state = ConnectionState::Failed(reason);
                }
                ChannelEvent::Message(message) => {
                    if !self.session.accepts(&message) {
                        log::trace!("Ignoring {} from {}", message.kind(), message.user_id());
                        continue;
                    }
                    match message {
                        WireMessage::CursorMove { user_id, x, y, .. } => {
                            self.session.upsert_cursor(&user_id, CursorPosition { x, y });
                        }
                        WireMessage::Join { user_id, .. } => {
                            log::info!("Peer {user_id} joined");
                        }
                        other => durable.push(other),
                    }
                }
            }
        }
        durable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor_from(user: &str, x: f32) -> WireMessage {
        WireMessage::CursorMove {
            session_id: "s".into(),
            user_id: user.into(),
            x,
            y: 0.0,
        }
    }

    #[test]
    fn test_link_carries_join() {
        let (_channel, link) = pair(Session::with_ids("s", "me"));
        assert_eq!(
            link.join,
            WireMessage::Join {
                session_id: "s".into(),
                user_id: "me".into()
            }
        );
    }

    #[test]
    fn test_durable_messages_queue_in_order() {
        let (channel, mut link) = pair(Session::with_ids("s", "me"));
        channel.broadcast_slide(0, &Slide::blank());
        channel.broadcast_snapshot(&[Slide::blank(), Slide::blank()]);

        let first = link.outbound.try_recv().unwrap();
        assert!(matches!(first, WireMessage::SlideUpdate { slide_index: 0, .. }));
        let second = link.outbound.try_recv().unwrap();
        match second {
            WireMessage::DocumentSnapshot { slides, user_id, .. } => {
                assert_eq!(slides.len(), 2);
                assert_eq!(user_id, "me");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(link.outbound.try_recv().is_err());
    }

    #[test]
    fn test_cursor_slot_keeps_latest_only() {
        let (channel, mut link) = pair(Session::with_ids("s", "me"));
        channel.move_cursor(1.0, 1.0);
        channel.move_cursor(2.0, 3.0);
        assert!(link.cursor.has_changed().unwrap());
        let latest = link.cursor.borrow_and_update().clone();
        assert!(matches!(latest, Some(WireMessage::CursorMove { x, y, .. }) if x == 2.0 && y == 3.0));
        assert!(link.outbound.try_recv().is_err());
    }

    #[test]
    fn test_drain_tracks_state_and_filters() {
        let (mut channel, link) = pair(Session::with_ids("s", "me"));
        link.events.send(ChannelEvent::Connecting).unwrap();
        link.events.send(ChannelEvent::Opened).unwrap();
        link.events.send(ChannelEvent::Message(cursor_from("peer", 4.0))).unwrap();
        link.events.send(ChannelEvent::Message(cursor_from("me", 9.0))).unwrap();
        link.events
            .send(ChannelEvent::Message(WireMessage::SlideUpdate {
                session_id: "s".into(),
                user_id: "peer".into(),
                slide_index: 0,
                document_fragment: Slide::blank(),
            }))
            .unwrap();
        link.events
            .send(ChannelEvent::Message(WireMessage::SlideUpdate {
                session_id: "elsewhere".into(),
                user_id: "peer".into(),
                slide_index: 0,
                document_fragment: Slide::blank(),
            }))
            .unwrap();

        let durable = channel.drain();
        assert!(channel.is_connected());
        assert_eq!(durable.len(), 1);
        assert_eq!(channel.session().cursor("peer"), Some(CursorPosition { x: 4.0, y: 0.0 }));
        assert!(channel.session().cursor("me").is_none());

        link.events.send(ChannelEvent::Failed("reset".into())).unwrap();
        channel.drain();
        assert_eq!(channel.state(), &ConnectionState::Failed("reset".into()));
    }
}
