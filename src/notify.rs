//! Async notification exchange with attached nodes: request out, at most one
//! reply back per correlation id, unordered. Replies are re-injected as app
//! events so panel state is only ever touched from the UI task.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::event::{AppEvent, Event};
use crate::log;

/// Per-endpoint inbox depth. Saves here are operator-paced, so this never
/// fills in practice; a full inbox fails the dispatch instead of blocking.
const ENDPOINT_QUEUE: usize = 16;

const DEMO_REPLY_DELAY: std::time::Duration = std::time::Duration::from_millis(150);

/// What a notification asks the node to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationType {
    ChangeConfig,
    LogLevel,
    ReloadRules,
    Stop,
}

impl NotificationType {
    /// Tag for logs and wire payloads.
    #[must_use]
    pub fn get_str(&self) -> &str {
        match self {
            NotificationType::ChangeConfig => "change-config",
            NotificationType::LogLevel => "log-level",
            NotificationType::ReloadRules => "reload-rules",
            NotificationType::Stop => "stop",
        }
    }
}

/// Request half of the exchange.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationType,
    /// Opaque payload; a JSON config document for ChangeConfig.
    pub data: String,
    /// Rule names affected, unused by config changes.
    pub rules: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCode {
    Ok,
    Error,
}

/// Reply half, keyed back to the request by id.
#[derive(Debug, Clone)]
pub struct NotificationReply {
    pub id: u64,
    pub code: ReplyCode,
    pub data: String,
}

/// Dispatch failed before reaching the node.
#[derive(Debug)]
pub struct DispatchError {
    pub addr: String,
    pub reason: String,
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dispatch to {} failed: {}", self.addr, self.reason)
    }
}

impl std::error::Error for DispatchError {}

/// The seam the panel saves through. Production hands notifications to
/// per-node endpoint tasks; tests record them.
pub trait NotificationChannel {
    /// Hands `notification` to the endpoint for `addr`. Returns the
    /// correlation id the eventual reply will carry.
    fn dispatch(&mut self, addr: &str, notification: Notification) -> Result<u64, DispatchError>;
}

/// Monotonically increasing correlation ids. Never reused within a run, so
/// two saves in the same instant can't collide and every dispatch in an
/// apply-to-all batch stays individually trackable.
#[derive(Debug, Default)]
pub struct IdSource {
    last: u64,
}

impl IdSource {
    pub fn next_id(&mut self) -> u64 {
        self.last += 1;
        self.last
    }
}

/// Channel over per-node mpsc endpoints. Senders are registered when a node
/// attaches and dropped when it goes away.
#[derive(Debug, Default)]
pub struct MpscChannel {
    endpoints: HashMap<String, mpsc::Sender<Notification>>,
}

impl MpscChannel {
    pub fn attach(&mut self, addr: String, endpoint: mpsc::Sender<Notification>) {
        self.endpoints.insert(addr, endpoint);
    }

    pub fn detach(&mut self, addr: &str) {
        self.endpoints.remove(addr);
    }
}

impl NotificationChannel for MpscChannel {
    fn dispatch(&mut self, addr: &str, notification: Notification) -> Result<u64, DispatchError> {
        let Some(endpoint) = self.endpoints.get(addr) else {
            return Err(DispatchError {
                addr: String::from(addr),
                reason: String::from("no endpoint attached"),
            });
        };
        let id = notification.id;
        log::debug(&format!(
            "notification {id} ({}) -> {addr}",
            notification.kind.get_str()
        ));
        endpoint
            .try_send(notification)
            .map_err(|err| DispatchError {
                addr: String::from(addr),
                reason: err.to_string(),
            })?;
        Ok(id)
    }
}

/// Spawns a simulated node endpoint: it acks whatever it receives after a
/// short delay, so the panel can be driven without a live daemon. Replies
/// come back through the app event channel like any real endpoint's would.
pub fn spawn_demo_endpoint(
    addr: String,
    events: mpsc::UnboundedSender<Event>,
) -> mpsc::Sender<Notification> {
    let (endpoint, mut inbox) = mpsc::channel(ENDPOINT_QUEUE);
    tokio::spawn(async move {
        loop {
            match inbox.recv().await {
                Some(notification) => {
                    tokio::time::sleep(DEMO_REPLY_DELAY).await;
                    let reply = answer(&notification);
                    let _ = events.send(Event::App(Box::new(AppEvent::ConfigReply {
                        addr: addr.clone(),
                        reply,
                    })));
                }
                None => {
                    let _ = events.send(Event::App(Box::new(AppEvent::NodeDetached {
                        addr: addr.clone(),
                    })));
                    break;
                }
            }
        }
    });
    endpoint
}

/// What the simulated node answers: config changes are validated as JSON
/// objects, everything else is acked blindly.
fn answer(notification: &Notification) -> NotificationReply {
    let code = match notification.kind {
        NotificationType::ChangeConfig => {
            match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(
                &notification.data,
            ) {
                Ok(_) => ReplyCode::Ok,
                Err(err) => {
                    return NotificationReply {
                        id: notification.id,
                        code: ReplyCode::Error,
                        data: format!("invalid config: {err}"),
                    };
                }
            }
        }
        _ => ReplyCode::Ok,
    };
    NotificationReply {
        id: notification.id,
        code,
        data: String::new(),
    }
}
