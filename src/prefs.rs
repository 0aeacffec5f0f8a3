//! The preferences panel: form state, dirty tracking, the pending
//! notification table and the status line state machine. Widget-free, so
//! the whole save/reply cycle is testable without a terminal.

use std::collections::HashMap;
use std::time::Instant;

use crate::config::{self, Config};
use crate::constants::{DefaultAction, Duration, LogLevel, MonitorMethod, Target};
use crate::daemon_json::{DaemonConfigPatch, PartialDaemonConfig};
use crate::log;
use crate::node::NodeRegistry;
use crate::notify::{
    IdSource, Notification, NotificationChannel, NotificationReply, NotificationType, ReplyCode,
};

/// Which tab the operator is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Global,
    Node,
}

/// Status line state machine: Idle -> Applying -> {Success, Error} -> Idle.
/// The fall back to Idle happens on the next show or the next save; replies
/// that never arrive leave the panel in Applying.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Applying { since: Instant },
    Success,
    Error(String),
}

/// Global-tab form values. Saved unconditionally, so no dirty flag.
#[derive(Debug)]
pub struct GlobalForm {
    pub action: DefaultAction,
    pub duration: Duration,
    pub target: Target,
    pub timeout: u32,
}

impl Default for GlobalForm {
    fn default() -> Self {
        GlobalForm {
            action: DefaultAction::Allow,
            duration: Duration::Seconds30,
            target: Target::Command,
            timeout: 15,
        }
    }
}

/// Node-tab form values. Operator edits go through the setters, which record
/// the dirty transition; population during a load is guarded so programmatic
/// writes don't count as edits.
#[derive(Debug, Default)]
pub struct NodeForm {
    pub action: DefaultAction,
    pub duration: Duration,
    pub monitor_method: MonitorMethod,
    pub log_level: LogLevel,
    pub intercept_unknown: bool,
    pub apply_to_all: bool,
    /// Read-only labels from the node's metadata.
    pub name: String,
    pub version: String,
    dirty: bool,
    loading: bool,
}

impl NodeForm {
    pub fn set_action(&mut self, v: DefaultAction) {
        self.action = v;
        self.touch();
    }

    pub fn set_duration(&mut self, v: Duration) {
        self.duration = v;
        self.touch();
    }

    pub fn set_monitor_method(&mut self, v: MonitorMethod) {
        self.monitor_method = v;
        self.touch();
    }

    pub fn set_log_level(&mut self, v: LogLevel) {
        self.log_level = v;
        self.touch();
    }

    pub fn set_intercept_unknown(&mut self, v: bool) {
        self.intercept_unknown = v;
        self.touch();
    }

    pub fn set_apply_to_all(&mut self, v: bool) {
        self.apply_to_all = v;
        self.touch();
    }

    #[must_use]
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    fn touch(&mut self) {
        if !self.loading {
            self.dirty = true;
        }
    }

    fn begin_load(&mut self) {
        self.loading = true;
    }

    fn end_load(&mut self) {
        self.loading = false;
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Back to first variants and empty labels. Apply-to-all is an operator
    /// intent, not node state, so it stays.
    fn reset(&mut self) {
        self.action = DefaultAction::ALL[0];
        self.duration = Duration::ALL[0];
        self.monitor_method = MonitorMethod::ALL[0];
        self.log_level = LogLevel::ALL[0];
        self.intercept_unknown = false;
        self.name.clear();
        self.version.clear();
    }

    fn to_patch(&self) -> DaemonConfigPatch {
        DaemonConfigPatch {
            default_action: String::from(self.action.get_str()),
            default_duration: String::from(self.duration.get_str()),
            proc_monitor_method: String::from(self.monitor_method.get_str()),
            log_level: self.log_level.index(),
            intercept_unknown: self.intercept_unknown,
        }
    }
}

#[derive(Debug, Default)]
pub struct PrefsPanel {
    pub tab: Tab,
    pub global: GlobalForm,
    pub node: NodeForm,
    /// Registry snapshot backing the node selector.
    pub node_addrs: Vec<String>,
    pub selected: usize,
    pub status: SaveStatus,
    /// Outstanding notifications, keyed per (node, correlation id) so every
    /// dispatch in an apply-to-all batch is individually trackable.
    pending: HashMap<(String, u64), NotificationType>,
    ids: IdSource,
}

impl PrefsPanel {
    #[must_use]
    pub fn new() -> PrefsPanel {
        PrefsPanel::default()
    }

    /// Entry point whenever the panel becomes visible (startup and reloads).
    /// Re-snapshots the registry, loads both forms and starts clean.
    pub fn show(&mut self, cfg: &Config, registry: &NodeRegistry) {
        self.status = SaveStatus::Idle;
        self.refresh_nodes(registry);
        self.load_global(cfg);
        if self.node_addrs.is_empty() {
            self.node.begin_load();
            self.node.reset();
            self.node.end_load();
        } else {
            self.load_node_settings(registry);
        }
        self.node.clear_dirty();
    }

    /// Re-snapshots the selector without touching form dirtiness or status.
    pub fn refresh_nodes(&mut self, registry: &NodeRegistry) {
        self.node_addrs = registry.addresses();
        if self.selected >= self.node_addrs.len() {
            self.selected = 0;
        }
    }

    #[must_use]
    pub fn selected_addr(&self) -> Option<&str> {
        self.node_addrs.get(self.selected).map(String::as_str)
    }

    /// Operator picked another node: point the form at it.
    pub fn select_node(&mut self, index: usize, registry: &NodeRegistry) {
        if index < self.node_addrs.len() {
            self.selected = index;
            self.load_node_settings(registry);
        }
    }

    pub fn cycle_node(&mut self, forward: bool, registry: &NodeRegistry) {
        let len = self.node_addrs.len();
        if len == 0 {
            return;
        }
        let next = if forward {
            (self.selected + 1) % len
        } else {
            (self.selected + len - 1) % len
        };
        self.select_node(next, registry);
    }

    /// A node dropped off the registry; re-snapshot and re-point the form.
    pub fn node_departed(&mut self, registry: &NodeRegistry) {
        self.refresh_nodes(registry);
        if self.node_addrs.is_empty() {
            self.node.begin_load();
            self.node.reset();
            self.node.end_load();
        } else {
            self.load_node_settings(registry);
        }
    }

    fn load_global(&mut self, cfg: &Config) {
        // Each key falls back to whatever the form already shows when the
        // stored value is mangled.
        match DefaultAction::new(&cfg.get(config::CFG_DEFAULT_ACTION)) {
            Ok(v) => self.global.action = v,
            Err(err) => log::warn(&format!("settings: default action: {err}")),
        }
        match Duration::new(&cfg.get(config::CFG_DEFAULT_DURATION)) {
            Ok(v) => self.global.duration = v,
            Err(err) => log::warn(&format!("settings: default duration: {err}")),
        }
        let raw_target = cfg.get(config::CFG_DEFAULT_TARGET);
        match raw_target
            .parse::<u32>()
            .ok()
            .and_then(|i| Target::from_index(i).ok())
        {
            Some(v) => self.global.target = v,
            None => log::warn(&format!("settings: bad target index '{raw_target}'")),
        }
        let raw_timeout = cfg.get(config::CFG_DEFAULT_TIMEOUT);
        match raw_timeout.parse::<u32>() {
            Ok(v) => self.global.timeout = v,
            Err(_) => log::warn(&format!("settings: bad timeout '{raw_timeout}'")),
        }
    }

    /// Pulls the selected node's metadata and config document into the form.
    /// Fields the document doesn't carry keep whatever the form shows; an
    /// unreadable document only updates the metadata side.
    pub fn load_node_settings(&mut self, registry: &NodeRegistry) {
        let Some(addr) = self.selected_addr().map(str::to_string) else {
            return;
        };
        let Some(entry) = registry.entry(&addr) else {
            log::warn(&format!("no registry entry for {addr}"));
            return;
        };

        self.node.begin_load();
        self.node.name = entry.name.clone();
        self.node.version = entry.version.clone();
        match LogLevel::from_index(entry.log_level) {
            Ok(v) => self.node.set_log_level(v),
            Err(err) => log::warn(&format!("node {addr}: metadata log level: {err}")),
        }

        match PartialDaemonConfig::parse(&entry.config) {
            Ok(doc) => {
                if let Some(raw) = doc.default_action {
                    match DefaultAction::new(&raw) {
                        Ok(v) => self.node.set_action(v),
                        Err(err) => log::warn(&format!("node {addr}: default action: {err}")),
                    }
                }
                if let Some(raw) = doc.default_duration {
                    match Duration::new(&raw) {
                        Ok(v) => self.node.set_duration(v),
                        Err(err) => log::warn(&format!("node {addr}: default duration: {err}")),
                    }
                }
                if let Some(raw) = doc.proc_monitor_method {
                    match MonitorMethod::new(&raw) {
                        Ok(v) => self.node.set_monitor_method(v),
                        Err(err) => log::warn(&format!("node {addr}: monitor method: {err}")),
                    }
                }
                // The document's log level wins over the metadata field.
                if let Some(raw) = doc.log_level {
                    match LogLevel::from_index(raw) {
                        Ok(v) => self.node.set_log_level(v),
                        Err(err) => log::warn(&format!("node {addr}: log level: {err}")),
                    }
                }
                if let Some(v) = doc.intercept_unknown {
                    self.node.set_intercept_unknown(v);
                }
            }
            Err(err) => log::error(&format!("node {addr}: unreadable config document: {err}")),
        }
        self.node.end_load();
    }

    /// Saves per the active tab. Global settings always persist; node
    /// settings only go out when the form was edited or apply-to-all is on.
    pub fn save(
        &mut self,
        cfg: &mut Config,
        registry: &mut NodeRegistry,
        channel: &mut dyn NotificationChannel,
    ) {
        self.status = SaveStatus::Applying {
            since: Instant::now(),
        };
        match self.tab {
            Tab::Global => self.save_global(cfg),
            Tab::Node => self.save_node(registry, channel),
        }
    }

    fn save_global(&mut self, cfg: &mut Config) {
        cfg.set(
            config::CFG_DEFAULT_ACTION,
            String::from(self.global.action.get_str()),
        );
        cfg.set(
            config::CFG_DEFAULT_DURATION,
            String::from(self.global.duration.get_str()),
        );
        cfg.set(
            config::CFG_DEFAULT_TARGET,
            self.global.target.index().to_string(),
        );
        cfg.set(
            config::CFG_DEFAULT_TIMEOUT,
            self.global.timeout.to_string(),
        );
    }

    fn save_node(&mut self, registry: &mut NodeRegistry, channel: &mut dyn NotificationChannel) {
        let Some(selected) = self.selected_addr().map(str::to_string) else {
            return;
        };
        if !(self.node.dirty() || self.node.apply_to_all) {
            return;
        }

        let targets = if self.node.apply_to_all {
            registry.addresses()
        } else {
            vec![selected]
        };
        let patch = self.node.to_patch();

        for addr in targets {
            // Merge the shared form values over this node's own prior
            // document, so fields the form doesn't manage stay per-node.
            let Some(prior) = registry.get_node_config(&addr) else {
                log::warn(&format!("node {addr}: no config on record, skipping"));
                continue;
            };
            let merged = match patch.merge_over(&prior) {
                Ok(doc) => doc,
                Err(err) => {
                    log::error(&format!("node {addr}: cannot merge config: {err}"));
                    continue;
                }
            };
            registry.save_node_config(&addr, merged.clone());

            let notification = Notification {
                id: self.ids.next_id(),
                kind: NotificationType::ChangeConfig,
                data: merged,
                rules: Vec::new(),
            };
            match channel.dispatch(&addr, notification) {
                Ok(id) => {
                    self.pending.insert((addr, id), NotificationType::ChangeConfig);
                }
                Err(err) => log::error(&format!("{err}")),
            }
        }
        self.node.clear_dirty();
    }

    /// Reply delivery, already marshaled onto the UI task by the event loop.
    /// Unknown (node, id) pairs are ignored; known ones are drained whatever
    /// the outcome.
    pub fn handle_reply(&mut self, addr: &str, reply: &NotificationReply) {
        if self
            .pending
            .remove(&(String::from(addr), reply.id))
            .is_none()
        {
            log::debug(&format!(
                "reply {} from {addr} matches nothing outstanding",
                reply.id
            ));
            return;
        }
        self.status = match reply.code {
            ReplyCode::Ok => SaveStatus::Success,
            ReplyCode::Error => SaveStatus::Error(reply.data.clone()),
        };
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeEntry;
    use crate::notify::DispatchError;
    use std::path::PathBuf;

    const ADDR_A: &str = "10.0.0.1:50051";
    const ADDR_B: &str = "10.0.0.2:50051";

    /// Channel double that records dispatches instead of delivering them.
    #[derive(Default)]
    struct RecordingChannel {
        sent: Vec<(String, Notification)>,
        fail: bool,
    }

    impl NotificationChannel for RecordingChannel {
        fn dispatch(
            &mut self,
            addr: &str,
            notification: Notification,
        ) -> Result<u64, DispatchError> {
            if self.fail {
                return Err(DispatchError {
                    addr: String::from(addr),
                    reason: String::from("endpoint closed"),
                });
            }
            let id = notification.id;
            self.sent.push((String::from(addr), notification));
            Ok(id)
        }
    }

    fn temp_config(name: &str) -> (PathBuf, Config) {
        let dir = std::env::temp_dir().join(format!(
            "opensnitch-prefs-panel-{name}-{}",
            std::process::id()
        ));
        let cfg = Config::load(&dir);
        (dir, cfg)
    }

    fn two_node_registry() -> NodeRegistry {
        let mut registry = NodeRegistry::default();
        registry.insert(
            String::from(ADDR_A),
            NodeEntry {
                name: String::from("alpha"),
                version: String::from("1.6.9"),
                // Stale metadata on purpose: the document's LogLevel wins.
                log_level: 3,
                config: String::from(
                    r#"{"DefaultAction":"allow","DefaultDuration":"once","ProcMonitorMethod":"proc","LogLevel":1,"InterceptUnknown":false,"Server":{"Address":"unix:///tmp/a.sock"}}"#,
                ),
            },
        );
        registry.insert(
            String::from(ADDR_B),
            NodeEntry {
                name: String::from("beta"),
                version: String::from("1.6.8"),
                log_level: 2,
                config: String::from(
                    r#"{"DefaultAction":"deny","DefaultDuration":"1h","ProcMonitorMethod":"audit","LogLevel":4,"InterceptUnknown":true,"Firewall":"iptables"}"#,
                ),
            },
        );
        registry
    }

    fn cleanup(dir: &PathBuf) {
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn show_with_empty_registry_resets_node_form() {
        let (dir, cfg) = temp_config("empty-reset");
        let registry = NodeRegistry::default();
        let mut panel = PrefsPanel::new();

        // Pre-dirty the form so the reset is observable.
        panel.node.set_action(DefaultAction::Reject);
        panel.node.set_intercept_unknown(true);
        panel.node.name = String::from("stale");
        panel.node.version = String::from("0.0.0");
        assert!(panel.node.dirty());

        panel.show(&cfg, &registry);

        assert_eq!(panel.node.action, DefaultAction::Allow);
        assert_eq!(panel.node.duration, Duration::UntilRestart);
        assert_eq!(panel.node.monitor_method, MonitorMethod::Proc);
        assert_eq!(panel.node.log_level, LogLevel::Debug);
        assert!(!panel.node.intercept_unknown);
        assert!(panel.node.name.is_empty());
        assert!(panel.node.version.is_empty());
        assert!(!panel.node.dirty());
        assert!(panel.selected_addr().is_none());
        assert_eq!(panel.status, SaveStatus::Idle);
        cleanup(&dir);
    }

    #[test]
    fn show_loads_the_first_node_clean() {
        let (dir, cfg) = temp_config("show-loads");
        let registry = two_node_registry();
        let mut panel = PrefsPanel::new();
        panel.show(&cfg, &registry);

        assert_eq!(panel.selected_addr(), Some(ADDR_A));
        assert_eq!(panel.node.name, "alpha");
        assert_eq!(panel.node.version, "1.6.9");
        assert_eq!(panel.node.action, DefaultAction::Allow);
        assert_eq!(panel.node.duration, Duration::Once);
        assert_eq!(panel.node.monitor_method, MonitorMethod::Proc);
        // Document value (1) wins over the stale metadata field (3).
        assert_eq!(panel.node.log_level, LogLevel::Info);
        assert!(!panel.node.intercept_unknown);
        assert!(!panel.node.dirty());
        cleanup(&dir);
    }

    #[test]
    fn selecting_another_node_reloads_without_dirtying() {
        let (dir, cfg) = temp_config("select");
        let registry = two_node_registry();
        let mut panel = PrefsPanel::new();
        panel.show(&cfg, &registry);

        panel.select_node(1, &registry);
        assert_eq!(panel.selected_addr(), Some(ADDR_B));
        assert_eq!(panel.node.name, "beta");
        assert_eq!(panel.node.action, DefaultAction::Deny);
        assert_eq!(panel.node.duration, Duration::Hours1);
        assert_eq!(panel.node.monitor_method, MonitorMethod::Audit);
        assert_eq!(panel.node.log_level, LogLevel::Error);
        assert!(panel.node.intercept_unknown);
        assert!(!panel.node.dirty());
        cleanup(&dir);
    }

    #[test]
    fn load_keeps_prior_values_for_missing_fields() {
        let mut registry = NodeRegistry::default();
        registry.insert(
            String::from(ADDR_A),
            NodeEntry {
                name: String::from("sparse"),
                version: String::from("1.5.0"),
                log_level: 5,
                config: String::from(r#"{"DefaultAction":"reject"}"#),
            },
        );
        let mut panel = PrefsPanel::new();
        panel.refresh_nodes(&registry);

        // Known prior state on the form.
        panel.node.set_duration(Duration::Hours12);
        panel.node.set_monitor_method(MonitorMethod::Ebpf);
        panel.node.set_intercept_unknown(true);

        panel.load_node_settings(&registry);

        // The one present field lands; the rest stay put. The log level
        // falls back to the metadata field because the document has none.
        assert_eq!(panel.node.action, DefaultAction::Reject);
        assert_eq!(panel.node.duration, Duration::Hours12);
        assert_eq!(panel.node.monitor_method, MonitorMethod::Ebpf);
        assert!(panel.node.intercept_unknown);
        assert_eq!(panel.node.log_level, LogLevel::Fatal);
    }

    #[test]
    fn load_survives_an_unreadable_document() {
        let mut registry = NodeRegistry::default();
        registry.insert(
            String::from(ADDR_A),
            NodeEntry {
                name: String::from("broken"),
                version: String::from("1.0.0"),
                log_level: 2,
                config: String::from("not a config"),
            },
        );
        let mut panel = PrefsPanel::new();
        panel.refresh_nodes(&registry);
        panel.node.set_action(DefaultAction::Deny);

        panel.load_node_settings(&registry);

        // Metadata side still lands, the document side is untouched.
        assert_eq!(panel.node.name, "broken");
        assert_eq!(panel.node.log_level, LogLevel::Important);
        assert_eq!(panel.node.action, DefaultAction::Deny);
    }

    #[test]
    fn global_save_writes_exactly_four_keys() {
        let (dir, mut cfg) = temp_config("four-keys");
        let mut registry = NodeRegistry::default();
        let mut channel = RecordingChannel::default();
        let mut panel = PrefsPanel::new();
        panel.show(&cfg, &registry);
        panel.tab = Tab::Global;

        panel.global.action = DefaultAction::Deny;
        panel.global.timeout = 30;
        panel.save(&mut cfg, &mut registry, &mut channel);

        let mut keys = cfg.stored_keys();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                config::CFG_DEFAULT_ACTION,
                config::CFG_DEFAULT_DURATION,
                config::CFG_DEFAULT_TARGET,
                config::CFG_DEFAULT_TIMEOUT,
            ]
        );
        assert_eq!(cfg.get(config::CFG_DEFAULT_ACTION), "deny");
        assert_eq!(cfg.get(config::CFG_DEFAULT_TIMEOUT), "30");
        assert!(channel.sent.is_empty());
        cleanup(&dir);
    }

    #[test]
    fn global_defaults_survive_a_load_save_cycle() {
        let (dir, mut cfg) = temp_config("defaults-cycle");
        let mut registry = NodeRegistry::default();
        let mut channel = RecordingChannel::default();
        let mut panel = PrefsPanel::new();

        panel.show(&cfg, &registry);
        panel.tab = Tab::Global;
        panel.save(&mut cfg, &mut registry, &mut channel);

        assert_eq!(cfg.get(config::CFG_DEFAULT_ACTION), "allow");
        assert_eq!(cfg.get(config::CFG_DEFAULT_DURATION), "30s");
        assert_eq!(cfg.get(config::CFG_DEFAULT_TARGET), "1");
        assert_eq!(cfg.get(config::CFG_DEFAULT_TIMEOUT), "15");
        cleanup(&dir);
    }

    #[test]
    fn clean_node_form_saves_nothing() {
        let (dir, mut cfg) = temp_config("clean-noop");
        let mut registry = two_node_registry();
        let mut channel = RecordingChannel::default();
        let mut panel = PrefsPanel::new();
        panel.show(&cfg, &registry);
        panel.tab = Tab::Node;

        panel.save(&mut cfg, &mut registry, &mut channel);

        assert!(channel.sent.is_empty());
        assert_eq!(panel.pending_len(), 0);
        cleanup(&dir);
    }

    #[test]
    fn dirty_form_without_nodes_saves_nothing() {
        let (dir, mut cfg) = temp_config("no-selection");
        let mut registry = NodeRegistry::default();
        let mut channel = RecordingChannel::default();
        let mut panel = PrefsPanel::new();
        panel.show(&cfg, &registry);
        panel.tab = Tab::Node;
        panel.node.set_action(DefaultAction::Deny);

        panel.save(&mut cfg, &mut registry, &mut channel);

        assert!(channel.sent.is_empty());
        assert_eq!(panel.pending_len(), 0);
        cleanup(&dir);
    }

    #[test]
    fn single_node_save_merges_and_dispatches() {
        let (dir, mut cfg) = temp_config("single-save");
        let mut registry = two_node_registry();
        let mut channel = RecordingChannel::default();
        let mut panel = PrefsPanel::new();
        panel.show(&cfg, &registry);
        panel.tab = Tab::Node;

        panel.node.set_action(DefaultAction::Deny);
        panel.save(&mut cfg, &mut registry, &mut channel);

        assert_eq!(channel.sent.len(), 1);
        let (addr, notification) = &channel.sent[0];
        assert_eq!(addr, ADDR_A);
        assert_eq!(notification.kind, NotificationType::ChangeConfig);
        assert!(notification.rules.is_empty());

        let doc = PartialDaemonConfig::parse(&notification.data).unwrap();
        assert_eq!(doc.default_action.as_deref(), Some("deny"));
        // Unmanaged fields from the prior document are still there.
        assert!(notification.data.contains("unix:///tmp/a.sock"));

        // The registry copy tracks what was sent.
        assert_eq!(
            registry.get_node_config(ADDR_A),
            Some(notification.data.clone())
        );

        assert_eq!(panel.pending_len(), 1);
        assert!(!panel.node.dirty());
        assert!(matches!(panel.status, SaveStatus::Applying { .. }));
        cleanup(&dir);
    }

    #[test]
    fn apply_to_all_sends_one_patch_per_node() {
        let (dir, mut cfg) = temp_config("apply-all");
        let mut registry = two_node_registry();
        let mut channel = RecordingChannel::default();
        let mut panel = PrefsPanel::new();
        panel.show(&cfg, &registry);
        panel.tab = Tab::Node;

        panel.node.set_action(DefaultAction::Reject);
        panel.node.set_duration(Duration::Minutes5);
        panel.node.set_monitor_method(MonitorMethod::Ftrace);
        panel.node.set_log_level(LogLevel::Warning);
        panel.node.set_intercept_unknown(true);
        panel.node.set_apply_to_all(true);

        panel.save(&mut cfg, &mut registry, &mut channel);

        assert_eq!(channel.sent.len(), 2);
        let addrs: Vec<&str> = channel.sent.iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(addrs, vec![ADDR_A, ADDR_B]);

        // Every dispatch carries its own correlation id.
        assert_ne!(channel.sent[0].1.id, channel.sent[1].1.id);
        assert_eq!(panel.pending_len(), 2);

        for (addr, notification) in &channel.sent {
            let doc = PartialDaemonConfig::parse(&notification.data).unwrap();
            assert_eq!(doc.default_action.as_deref(), Some("reject"));
            assert_eq!(doc.default_duration.as_deref(), Some("5m"));
            assert_eq!(doc.proc_monitor_method.as_deref(), Some("ftrace"));
            assert_eq!(doc.log_level, Some(3));
            assert_eq!(doc.intercept_unknown, Some(true));
            // Per-node leftovers prove each patch merged over that node's
            // own prior document, not a shared one.
            if addr == ADDR_A {
                assert!(notification.data.contains("unix:///tmp/a.sock"));
                assert!(!notification.data.contains("iptables"));
            } else {
                assert!(notification.data.contains("iptables"));
                assert!(!notification.data.contains("unix:///tmp/a.sock"));
            }
        }
        cleanup(&dir);
    }

    #[test]
    fn apply_to_all_works_without_other_edits() {
        let (dir, mut cfg) = temp_config("apply-all-clean");
        let mut registry = two_node_registry();
        let mut channel = RecordingChannel::default();
        let mut panel = PrefsPanel::new();
        panel.show(&cfg, &registry);
        panel.tab = Tab::Node;

        panel.node.set_apply_to_all(true);
        // Clear the dirty bit the toggle just set; the checkbox alone must
        // still push the current form out.
        panel.node.clear_dirty();
        panel.save(&mut cfg, &mut registry, &mut channel);

        assert_eq!(channel.sent.len(), 2);
        cleanup(&dir);
    }

    #[test]
    fn ok_reply_drains_pending_and_reports_success() {
        let (dir, mut cfg) = temp_config("ok-reply");
        let mut registry = two_node_registry();
        let mut channel = RecordingChannel::default();
        let mut panel = PrefsPanel::new();
        panel.show(&cfg, &registry);
        panel.tab = Tab::Node;
        panel.node.set_action(DefaultAction::Deny);
        panel.save(&mut cfg, &mut registry, &mut channel);

        let id = channel.sent[0].1.id;
        panel.handle_reply(
            ADDR_A,
            &NotificationReply {
                id,
                code: ReplyCode::Ok,
                data: String::new(),
            },
        );

        assert_eq!(panel.status, SaveStatus::Success);
        assert_eq!(panel.pending_len(), 0);
        cleanup(&dir);
    }

    #[test]
    fn error_reply_surfaces_the_remote_message() {
        let (dir, mut cfg) = temp_config("error-reply");
        let mut registry = two_node_registry();
        let mut channel = RecordingChannel::default();
        let mut panel = PrefsPanel::new();
        panel.show(&cfg, &registry);
        panel.tab = Tab::Node;
        panel.node.set_action(DefaultAction::Deny);
        panel.save(&mut cfg, &mut registry, &mut channel);

        let id = channel.sent[0].1.id;
        panel.handle_reply(
            ADDR_A,
            &NotificationReply {
                id,
                code: ReplyCode::Error,
                data: String::from("fw: cannot reload"),
            },
        );

        assert_eq!(
            panel.status,
            SaveStatus::Error(String::from("fw: cannot reload"))
        );
        assert_eq!(panel.pending_len(), 0);
        cleanup(&dir);
    }

    #[test]
    fn unknown_replies_are_ignored() {
        let (dir, mut cfg) = temp_config("unknown-reply");
        let mut registry = two_node_registry();
        let mut channel = RecordingChannel::default();
        let mut panel = PrefsPanel::new();
        panel.show(&cfg, &registry);
        panel.tab = Tab::Node;
        panel.node.set_action(DefaultAction::Deny);
        panel.save(&mut cfg, &mut registry, &mut channel);

        let id = channel.sent[0].1.id;
        // Right id, wrong node.
        panel.handle_reply(
            ADDR_B,
            &NotificationReply {
                id,
                code: ReplyCode::Ok,
                data: String::new(),
            },
        );
        // Right node, unknown id.
        panel.handle_reply(
            ADDR_A,
            &NotificationReply {
                id: id + 1000,
                code: ReplyCode::Ok,
                data: String::new(),
            },
        );

        assert!(matches!(panel.status, SaveStatus::Applying { .. }));
        assert_eq!(panel.pending_len(), 1);
        cleanup(&dir);
    }

    #[test]
    fn dispatch_failure_skips_the_node_without_tracking_it() {
        let (dir, mut cfg) = temp_config("dispatch-fail");
        let mut registry = two_node_registry();
        let mut channel = RecordingChannel {
            fail: true,
            ..RecordingChannel::default()
        };
        let mut panel = PrefsPanel::new();
        panel.show(&cfg, &registry);
        panel.tab = Tab::Node;
        panel.node.set_action(DefaultAction::Deny);

        panel.save(&mut cfg, &mut registry, &mut channel);

        assert_eq!(panel.pending_len(), 0);
        assert!(!panel.node.dirty());
        assert!(matches!(panel.status, SaveStatus::Applying { .. }));
        cleanup(&dir);
    }
}
