//! WebSocket transport for a [`CollaborationChannel`](super::CollaborationChannel).
//!
//! One task per channel. It connects, sends `join`, then shuttles frames in
//! both directions until the socket drops, and reconnects after a delay.
//! The task ends when the channel is dropped.

use std::collections::VecDeque;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{ChannelEvent, TransportLink, WireMessage};
use crate::error::{EditorError, EditorResult};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay server URL (ws:// or wss://).
    pub url: String,
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    /// Fails for anything but a `ws://` or `wss://` URL, which could never
    /// connect.
    pub fn new(url: impl Into<String>, reconnect_delay: Duration) -> EditorResult<Self> {
        let url = url.into();
        if !url.starts_with("ws://") && !url.starts_with("wss://") {
            return Err(EditorError::Transport(format!(
                "{url} is not a ws:// or wss:// URL"
            )));
        }
        Ok(Self {
            url,
            reconnect_delay,
        })
    }
}

/// How a connection ended.
enum Ended {
    /// Socket closed or failed; try again later.
    Lost(Option<String>),
    /// The channel was dropped; stop for good.
    Shutdown,
}

/// Start the transport task on the current tokio runtime.
pub fn spawn(config: ClientConfig, link: TransportLink) -> JoinHandle<()> {
    tokio::spawn(run(config, link))
}

async fn run(config: ClientConfig, mut link: TransportLink) {
    // Durable messages taken off the queue but not yet written.
    let mut unsent: VecDeque<WireMessage> = VecDeque::new();

    loop {
        let _ = link.events.send(ChannelEvent::Connecting);
        log::info!("Connecting to collaboration server: {}", config.url);

        let ended = match connect_async(config.url.as_str()).await {
            Ok((stream, _)) => connection(stream, &mut link, &mut unsent).await,
            Err(e) => Ended::Lost(Some(e.to_string())),
        };

        match ended {
            Ended::Shutdown => break,
            Ended::Lost(reason) => {
                let event = match reason {
                    Some(reason) => ChannelEvent::Failed(reason),
                    None => ChannelEvent::Closed,
                };
                if link.events.send(event).is_err() {
                    break;
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_delay) => {}
            _ = link.events.closed() => break,
        }
    }
    log::debug!("Collaboration transport for {} stopped", config.url);
}

async fn connection<S>(
    stream: tokio_tungstenite::WebSocketStream<S>,
    link: &mut TransportLink,
    unsent: &mut VecDeque<WireMessage>,
) -> Ended
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut write, mut read) = stream.split();

    if let Err(e) = send_message(&mut write, &link.join).await {
        return Ended::Lost(Some(e));
    }
    let _ = link.events.send(ChannelEvent::Opened);

    while let Some(message) = unsent.pop_front() {
        if let Err(e) = send_message(&mut write, &message).await {
            unsent.push_front(message);
            return Ended::Lost(Some(e));
        }
    }

    loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => match WireMessage::decode(text.as_str()) {
                    Ok(message) => {
                        if link.events.send(ChannelEvent::Message(message)).is_err() {
                            let _ = write.close().await;
                            return Ended::Shutdown;
                        }
                    }
                    Err(e) => log::warn!("Ignoring frame: {e}"),
                },
                Some(Ok(Message::Close(_))) | None => return Ended::Lost(None),
                Some(Err(e)) => return Ended::Lost(Some(e.to_string())),
                Some(Ok(_)) => {}
            },

            outgoing = link.outbound.recv() => match outgoing {
                Some(message) => {
                    if let Err(e) = send_message(&mut write, &message).await {
                        log::error!("Failed to send {}: {e}", message.kind());
                        unsent.push_back(message);
                        return Ended::Lost(Some(e));
                    }
                }
                None => {
                    let _ = write.close().await;
                    return Ended::Shutdown;
                }
            },

            changed = link.cursor.changed() => {
                if changed.is_err() {
                    let _ = write.close().await;
                    return Ended::Shutdown;
                }
                let latest = link.cursor.borrow_and_update().clone();
                if let Some(message) = latest {
                    // Never requeued: the next move supersedes it.
                    if let Err(e) = send_message(&mut write, &message).await {
                        log::debug!("Cursor update dropped: {e}");
                        return Ended::Lost(Some(e));
                    }
                }
            }
        }
    }
}

/// Write one message as a text frame. A message that cannot be encoded is
/// logged and skipped.
async fn send_message<W>(write: &mut W, message: &WireMessage) -> Result<(), String>
where
    W: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = match message.encode() {
        Ok(text) => text,
        Err(e) => {
            log::error!("Failed to encode {}: {e}", message.kind());
            return Ok(());
        }
    };
    write
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaboration::{CollaborationChannel, Session, pair};
    use crate::model::Slide;
    use tokio::net::TcpListener;

    async fn next_text<S>(ws: &mut tokio_tungstenite::WebSocketStream<S>) -> WireMessage
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => return WireMessage::decode(text.as_str()).unwrap(),
                _ => continue,
            }
        }
    }

    async fn wait_for(channel: &mut CollaborationChannel, done: impl Fn(&CollaborationChannel) -> bool) {
        for _ in 0..500 {
            channel.drain();
            if done(channel) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("channel never reached the expected state: {:?}", channel.state());
    }

    #[test]
    fn test_rejects_urls_that_are_not_websockets() {
        let err = ClientConfig::new("http://localhost:9000", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, EditorError::Transport(_)));
        assert_eq!(err.category(), crate::error::ErrorCategory::ExternalService);
        assert!(ClientConfig::new("wss://relay.example.com", Duration::from_secs(1)).is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_join_precedes_queued_updates_and_peers_are_delivered() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());

        let (mut channel, link) = pair(Session::with_ids("s", "me"));
        // Queued before any connection exists.
        channel.broadcast_slide(0, &Slide::blank());

        let task = spawn(ClientConfig::new(url, Duration::from_millis(50)).unwrap(), link);

        let (tcp, _) = listener.accept().await.unwrap();
        let mut server = tokio_tungstenite::accept_async(tcp).await.unwrap();

        assert!(matches!(next_text(&mut server).await, WireMessage::Join { .. }));
        assert!(matches!(next_text(&mut server).await, WireMessage::SlideUpdate { .. }));

        let peer = WireMessage::SlideUpdate {
            session_id: "s".into(),
            user_id: "peer".into(),
            slide_index: 1,
            document_fragment: Slide::blank(),
        };
        server.send(Message::Text(peer.encode().unwrap().into())).await.unwrap();

        let mut received = Vec::new();
        for _ in 0..100 {
            received.extend(channel.drain());
            if !received.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(received, vec![peer]);
        assert!(channel.is_connected());

        drop(channel);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reconnect_sends_join_again() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let (mut channel, link) = pair(Session::with_ids("s", "me"));
        let _task = spawn(ClientConfig::new(url, Duration::from_millis(20)).unwrap(), link);

        let (tcp, _) = listener.accept().await.unwrap();
        let mut first = tokio_tungstenite::accept_async(tcp).await.unwrap();
        assert!(matches!(next_text(&mut first).await, WireMessage::Join { .. }));
        wait_for(&mut channel, |c| c.is_connected()).await;

        first.close(None).await.unwrap();
        drop(first);
        wait_for(&mut channel, |c| !c.is_connected()).await;

        channel.broadcast_slide(0, &Slide::blank());

        let (tcp, _) = listener.accept().await.unwrap();
        let mut second = tokio_tungstenite::accept_async(tcp).await.unwrap();
        assert!(matches!(next_text(&mut second).await, WireMessage::Join { .. }));
        assert!(matches!(next_text(&mut second).await, WireMessage::SlideUpdate { .. }));
    }
}
