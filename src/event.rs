//! Event plumbing between the terminal, the notification endpoints and the
//! UI loop. Everything that touches widget state funnels through this
//! channel, so the panel only ever runs on the UI task.

use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;

use crate::notify::NotificationReply;

const TICK_INTERVAL: std::time::Duration = std::time::Duration::from_millis(1000);

#[derive(Debug)]
pub enum Event {
    Tick,
    Crossterm(crossterm::event::Event),
    App(Box<AppEvent>),
}

#[derive(Debug)]
pub enum AppEvent {
    /// A node answered a dispatched notification. Delivered here so the
    /// handler runs on the UI task, never on the endpoint's.
    ConfigReply {
        addr: String,
        reply: NotificationReply,
    },
    /// A node's endpoint went away.
    NodeDetached { addr: String },
    Quit,
}

#[derive(Debug)]
pub struct EventHandler {
    /// Cloneable handle for endpoint tasks to inject events with.
    pub sender: mpsc::UnboundedSender<Event>,
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let task_sender = sender.clone();
        tokio::spawn(async move { event_task(task_sender).await });
        Self { sender, receiver }
    }

    /// Next event, whichever source produces one first.
    /// # Errors
    /// Only when the channel is closed, which means the app is going down.
    pub async fn next(&mut self) -> color_eyre::Result<Event> {
        self.receiver
            .recv()
            .await
            .ok_or_else(|| color_eyre::eyre::eyre!("event channel closed"))
    }

    pub fn send(&mut self, app_event: AppEvent) {
        let _ = self.sender.send(Event::App(Box::new(app_event)));
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

async fn event_task(sender: mpsc::UnboundedSender<Event>) {
    let mut reader = crossterm::event::EventStream::new();
    let mut tick = tokio::time::interval(TICK_INTERVAL);
    loop {
        let tick_delay = tick.tick();
        let crossterm_event = reader.next().fuse();
        tokio::select! {
            _ = sender.closed() => break,
            _ = tick_delay => {
                let _ = sender.send(Event::Tick);
            }
            Some(Ok(evt)) = crossterm_event => {
                let _ = sender.send(Event::Crossterm(evt));
            }
        }
    }
}
