use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use neon_types::api::SendChatRequest;
use neon_types::events::{GatewayCommand, GatewayEvent, Topic};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Receives chat messages that clients send over the gateway.
///
/// Implementations persist the message and publish the outcome on the
/// conversation's topic themselves; nothing is reported back to the socket.
pub trait ChatInbound: Send + Sync {
    fn send_chat(&self, conversation_id: Uuid, message: SendChatRequest);
}

type Subscriptions = Arc<RwLock<HashSet<Topic>>>;

/// Handle a single WebSocket connection until it closes.
///
/// Connections are anonymous: a client may subscribe to any topic.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, inbound: Arc<dyn ChatInbound>) {
    let (mut sender, mut receiver) = socket.split();
    let session_id = Uuid::new_v4();

    let Some(ready) = encode(&GatewayEvent::Ready { session_id }) else {
        return;
    };
    if sender.send(ready).await.is_err() {
        return;
    }

    let open = dispatcher.connection_opened();
    info!("Gateway session {} connected ({} open)", session_id, open);

    let mut broadcast_rx = dispatcher.subscribe();

    // Replies addressed to this connection only (subscription acks)
    let (direct_tx, mut direct_rx) = mpsc::unbounded_channel::<GatewayEvent>();

    let subscriptions: Subscriptions = Arc::new(RwLock::new(HashSet::new()));
    let send_subscriptions = subscriptions.clone();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward subscribed deliveries + direct replies -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let delivery = match result {
                        Ok(delivery) => delivery,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Session {} lagged by {} events", session_id, n);
                            continue;
                        }
                        Err(_) => break,
                    };

                    let subscribed = send_subscriptions
                        .read()
                        .unwrap_or_else(|e| e.into_inner())
                        .contains(&delivery.topic);
                    if !subscribed {
                        continue;
                    }

                    let Some(msg) = encode(&delivery) else { continue };
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
                result = direct_rx.recv() => {
                    let Some(event) = result else { break };
                    let Some(msg) = encode(&event) else { continue };
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping session {}", missed_heartbeats, session_id);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let recv_subscriptions = subscriptions.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(session_id, cmd, &recv_subscriptions, &direct_tx, inbound.as_ref());
                    }
                    Err(e) => {
                        warn!(
                            "Session {} bad command: {} -- raw: {}",
                            session_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    let open = dispatcher.connection_closed();
    info!("Gateway session {} disconnected ({} open)", session_id, open);
}

fn handle_command(
    session_id: Uuid,
    cmd: GatewayCommand,
    subscriptions: &Subscriptions,
    direct_tx: &mpsc::UnboundedSender<GatewayEvent>,
    inbound: &dyn ChatInbound,
) {
    match cmd {
        GatewayCommand::Subscribe { topics } => {
            let current = apply_subscriptions(subscriptions, |subs| subs.extend(topics.iter().copied()));
            debug!("Session {} subscribed to {} topics", session_id, topics.len());
            let _ = direct_tx.send(GatewayEvent::Subscribed { topics: current });
        }

        GatewayCommand::Unsubscribe { topics } => {
            let current = apply_subscriptions(subscriptions, |subs| {
                for topic in &topics {
                    subs.remove(topic);
                }
            });
            debug!("Session {} unsubscribed from {} topics", session_id, topics.len());
            let _ = direct_tx.send(GatewayEvent::Subscribed { topics: current });
        }

        GatewayCommand::SendChat { conversation_id, message } => {
            debug!(
                "Session {} sending chat to conversation {} as {}",
                session_id, conversation_id, message.from_user_id
            );
            inbound.send_chat(conversation_id, message);
        }
    }
}

/// Mutates the subscription set and returns a sorted snapshot of it.
fn apply_subscriptions(subscriptions: &Subscriptions, f: impl FnOnce(&mut HashSet<Topic>)) -> Vec<Topic> {
    let mut subs = subscriptions.write().unwrap_or_else(|e| e.into_inner());
    f(&mut subs);
    let mut current: Vec<Topic> = subs.iter().copied().collect();
    current.sort_by_key(|t| t.to_string());
    current
}

fn encode<T: Serialize>(value: &T) -> Option<Message> {
    match serde_json::to_string(value) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            warn!("Failed to encode gateway message: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingInbound {
        sent: Mutex<Vec<(Uuid, SendChatRequest)>>,
    }

    impl ChatInbound for RecordingInbound {
        fn send_chat(&self, conversation_id: Uuid, message: SendChatRequest) {
            self.sent.lock().unwrap().push((conversation_id, message));
        }
    }

    #[test]
    fn subscribe_and_unsubscribe_ack_current_topics() {
        let subs: Subscriptions = Arc::new(RwLock::new(HashSet::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let inbound = RecordingInbound::default();
        let user = Topic::User(Uuid::new_v4());
        let chat = Topic::Chat(Uuid::new_v4());

        handle_command(Uuid::nil(), GatewayCommand::Subscribe { topics: vec![user, chat] }, &subs, &tx, &inbound);
        handle_command(Uuid::nil(), GatewayCommand::Unsubscribe { topics: vec![chat] }, &subs, &tx, &inbound);

        match rx.try_recv().unwrap() {
            GatewayEvent::Subscribed { topics } => assert_eq!(topics.len(), 2),
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.try_recv().unwrap() {
            GatewayEvent::Subscribed { topics } => assert_eq!(topics, vec![user]),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(subs.read().unwrap().contains(&user));
    }

    #[test]
    fn send_chat_is_forwarded_to_inbound() {
        let subs: Subscriptions = Arc::new(RwLock::new(HashSet::new()));
        let (tx, _rx) = mpsc::unbounded_channel();
        let inbound = RecordingInbound::default();
        let conversation_id = Uuid::new_v4();

        let cmd = GatewayCommand::SendChat {
            conversation_id,
            message: SendChatRequest {
                from_user_id: Uuid::new_v4(),
                content: "hi".to_string(),
                sent_at: None,
                temp_id: Some("tmp-7".to_string()),
            },
        };
        handle_command(Uuid::nil(), cmd, &subs, &tx, &inbound);

        let sent = inbound.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, conversation_id);
        assert_eq!(sent[0].1.temp_id.as_deref(), Some("tmp-7"));
    }
}
