use std::path::PathBuf;

use ratatui::DefaultTerminal;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::Config;
use crate::constants::{self, DefaultAction, Duration, LogLevel, MonitorMethod, Target};
use crate::event::{AppEvent, Event, EventHandler};
use crate::log;
use crate::node::{NodeEntry, NodeRegistry};
use crate::notify::{self, MpscChannel};
use crate::prefs::{PrefsPanel, SaveStatus, Tab};

/// Upper bound for the popup timeout spinner, in seconds.
const MAX_TIMEOUT: u32 = 300;

/// Selectable rows on the Global tab, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalField {
    Action,
    Duration,
    Target,
    Timeout,
}

pub const GLOBAL_FIELDS: [GlobalField; 4] = [
    GlobalField::Action,
    GlobalField::Duration,
    GlobalField::Target,
    GlobalField::Timeout,
];

/// Selectable rows on the Nodes tab, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeField {
    Selector,
    Action,
    Duration,
    MonitorMethod,
    LogLevel,
    InterceptUnknown,
    ApplyToAll,
}

pub const NODE_FIELDS: [NodeField; 7] = [
    NodeField::Selector,
    NodeField::Action,
    NodeField::Duration,
    NodeField::MonitorMethod,
    NodeField::LogLevel,
    NodeField::InterceptUnknown,
    NodeField::ApplyToAll,
];

/// Application.
#[derive(Debug)]
pub struct App {
    /// Is the application running?
    pub running: bool,
    /// Event handler.
    pub events: EventHandler,
    /// Local settings store ("global/*" keys).
    pub cfg: Config,
    /// Nodes currently attached.
    pub registry: NodeRegistry,
    /// Outbound half of the notification exchange.
    pub channel: MpscChannel,
    /// The preferences panel itself.
    pub panel: PrefsPanel,
    /// Field cursor per tab, so flipping tabs doesn't lose the position.
    pub global_cursor: usize,
    pub node_cursor: usize,
}

impl App {
    /// Constructs the app, attaches `demo_nodes` simulated nodes and points
    /// the panel at the result.
    #[must_use]
    pub fn new(config_dir: PathBuf, demo_nodes: u64) -> Self {
        let cfg = Config::load(&config_dir);
        let events = EventHandler::new();
        let mut registry = NodeRegistry::default();
        let mut channel = MpscChannel::default();
        for i in 0..demo_nodes {
            let addr = format!("10.0.0.{}:50051", i + 1);
            let endpoint = notify::spawn_demo_endpoint(addr.clone(), events.sender.clone());
            channel.attach(addr.clone(), endpoint);
            registry.insert(addr, demo_entry(i));
        }

        let mut panel = PrefsPanel::new();
        panel.show(&cfg, &registry);

        Self {
            running: true,
            events,
            cfg,
            registry,
            channel,
            panel,
            global_cursor: 0,
            node_cursor: 0,
        }
    }

    /// Run the application's main loop.
    /// # Errors
    /// Only on terminal draw failures or a torn-down event channel.
    pub async fn run(mut self, mut terminal: DefaultTerminal) -> color_eyre::Result<()> {
        // Only need a draw if:
        // * This is the first cycle (see default value below)
        // * Tick needs to refresh the applying-since counter
        // * Some key was pressed
        // * A reply or detach came in from an endpoint
        let mut draw_needed = true;
        while self.running {
            match self.events.next().await? {
                Event::Tick => draw_needed |= self.tick(),
                Event::Crossterm(event) => match event {
                    crossterm::event::Event::Key(key_event)
                        if key_event.kind == crossterm::event::KeyEventKind::Press =>
                    {
                        draw_needed = true;
                        self.handle_key_events(key_event);
                    }
                    crossterm::event::Event::Resize(_, _) => draw_needed = true,
                    _ => {}
                },
                Event::App(app_event) => {
                    draw_needed = true;
                    match *app_event {
                        AppEvent::ConfigReply { addr, reply } => {
                            self.panel.handle_reply(&addr, &reply);
                        }
                        AppEvent::NodeDetached { addr } => self.node_detached(&addr),
                        AppEvent::Quit => self.quit(),
                    }
                }
            }
            if draw_needed {
                terminal.draw(|frame| frame.render_widget(&self, frame.area()))?;
                draw_needed = false;
            }
        }
        Ok(())
    }

    /// Handles the key events and updates the state of [`App`].
    pub fn handle_key_events(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Char('c' | 'C') if key_event.modifiers == KeyModifiers::CONTROL => {
                self.events.send(AppEvent::Quit);
            }
            KeyCode::Char('q' | 'Q') => self.events.send(AppEvent::Quit),
            KeyCode::Tab | KeyCode::BackTab => self.switch_tab(),
            KeyCode::Up => self.move_cursor(false),
            KeyCode::Down => self.move_cursor(true),
            KeyCode::Left => self.adjust_field(false),
            KeyCode::Right => self.adjust_field(true),
            KeyCode::Char(' ') => self.toggle_field(),
            KeyCode::Enter => self.apply(),
            KeyCode::Char('r' | 'R') => self.reload(),
            _ => {}
        }
    }

    /// Handles the tick event of the terminal. Returns whether a re-render
    /// is warranted; only the applying-since counter needs one.
    pub fn tick(&mut self) -> bool {
        matches!(self.panel.status, SaveStatus::Applying { .. })
    }

    /// Set running to false to quit the application.
    pub fn quit(&mut self) {
        self.running = false;
    }

    fn switch_tab(&mut self) {
        self.panel.tab = match self.panel.tab {
            Tab::Global => Tab::Node,
            Tab::Node => Tab::Global,
        };
    }

    fn move_cursor(&mut self, down: bool) {
        let (cursor, len) = match self.panel.tab {
            Tab::Global => (&mut self.global_cursor, GLOBAL_FIELDS.len()),
            Tab::Node => (&mut self.node_cursor, NODE_FIELDS.len()),
        };
        *cursor = if down {
            (*cursor + 1) % len
        } else {
            (*cursor + len - 1) % len
        };
    }

    /// Left/right on the selected row: cycle the value.
    fn adjust_field(&mut self, forward: bool) {
        match self.panel.tab {
            Tab::Global => match GLOBAL_FIELDS[self.global_cursor] {
                GlobalField::Action => {
                    self.panel.global.action =
                        constants::step(&DefaultAction::ALL, self.panel.global.action, forward);
                }
                GlobalField::Duration => {
                    self.panel.global.duration =
                        constants::step(&Duration::ALL, self.panel.global.duration, forward);
                }
                GlobalField::Target => {
                    self.panel.global.target =
                        constants::step(&Target::ALL, self.panel.global.target, forward);
                }
                GlobalField::Timeout => {
                    let t = self.panel.global.timeout;
                    self.panel.global.timeout = if forward {
                        (t + 1).min(MAX_TIMEOUT)
                    } else {
                        t.saturating_sub(1)
                    };
                }
            },
            Tab::Node => match NODE_FIELDS[self.node_cursor] {
                NodeField::Selector => self.panel.cycle_node(forward, &self.registry),
                NodeField::Action => {
                    let v = constants::step(&DefaultAction::ALL, self.panel.node.action, forward);
                    self.panel.node.set_action(v);
                }
                NodeField::Duration => {
                    let v = constants::step(&Duration::ALL, self.panel.node.duration, forward);
                    self.panel.node.set_duration(v);
                }
                NodeField::MonitorMethod => {
                    let v = constants::step(
                        &MonitorMethod::ALL,
                        self.panel.node.monitor_method,
                        forward,
                    );
                    self.panel.node.set_monitor_method(v);
                }
                NodeField::LogLevel => {
                    let v = constants::step(&LogLevel::ALL, self.panel.node.log_level, forward);
                    self.panel.node.set_log_level(v);
                }
                NodeField::InterceptUnknown => {
                    let v = !self.panel.node.intercept_unknown;
                    self.panel.node.set_intercept_unknown(v);
                }
                NodeField::ApplyToAll => {
                    let v = !self.panel.node.apply_to_all;
                    self.panel.node.set_apply_to_all(v);
                }
            },
        }
    }

    /// Space: flip the selected checkbox. No-op on other rows.
    fn toggle_field(&mut self) {
        if self.panel.tab != Tab::Node {
            return;
        }
        match NODE_FIELDS[self.node_cursor] {
            NodeField::InterceptUnknown => {
                let v = !self.panel.node.intercept_unknown;
                self.panel.node.set_intercept_unknown(v);
            }
            NodeField::ApplyToAll => {
                let v = !self.panel.node.apply_to_all;
                self.panel.node.set_apply_to_all(v);
            }
            _ => {}
        }
    }

    fn apply(&mut self) {
        self.panel
            .save(&mut self.cfg, &mut self.registry, &mut self.channel);
    }

    fn reload(&mut self) {
        self.panel.show(&self.cfg, &self.registry);
    }

    fn node_detached(&mut self, addr: &str) {
        log::info(&format!("node {addr} detached"));
        self.channel.detach(addr);
        if self.registry.remove(addr).is_some() {
            self.panel.node_departed(&self.registry);
        }
    }
}

const DEMO_VERSION: &str = "1.6.9";

/// A plausible daemon state for a simulated node, including settings the
/// form never touches so merge behavior is visible end to end.
fn demo_entry(index: u64) -> NodeEntry {
    let action = if index % 2 == 0 { "allow" } else { "deny" };
    let config = serde_json::json!({
        "Server": {
            "Address": "unix:///tmp/osui.sock",
            "LogFile": "/var/log/opensnitchd.log"
        },
        "DefaultAction": action,
        "DefaultDuration": "once",
        "ProcMonitorMethod": "ebpf",
        "LogLevel": 1,
        "InterceptUnknown": false,
        "Firewall": "nftables"
    });
    NodeEntry {
        name: format!("node-{}", index + 1),
        version: String::from(DEMO_VERSION),
        log_level: 1,
        config: config.to_string(),
    }
}
