//! Daemon configuration documents. A daemon owns many more settings than
//! the form edits (Server block, firewall options, stats limits, ...), so a
//! save must round-trip the document and only overlay the managed fields.
//! Serialized field names follow the daemon's default-config.json.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const FIELD_DEFAULT_ACTION: &str = "DefaultAction";
const FIELD_DEFAULT_DURATION: &str = "DefaultDuration";
const FIELD_PROC_MONITOR_METHOD: &str = "ProcMonitorMethod";
const FIELD_LOG_LEVEL: &str = "LogLevel";
const FIELD_INTERCEPT_UNKNOWN: &str = "InterceptUnknown";

/// The five daemon settings the preferences form manages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DaemonConfigPatch {
    pub default_action: String,
    pub default_duration: String,
    pub proc_monitor_method: String,
    pub log_level: u32,
    pub intercept_unknown: bool,
}

impl DaemonConfigPatch {
    /// Overlays the managed fields onto `prior` and serializes the result.
    /// Everything else in the prior document survives untouched.
    pub fn merge_over(&self, prior: &str) -> Result<String, serde_json::Error> {
        let mut doc: Map<String, Value> = serde_json::from_str(prior)?;
        doc.insert(
            String::from(FIELD_DEFAULT_ACTION),
            Value::from(self.default_action.clone()),
        );
        doc.insert(
            String::from(FIELD_DEFAULT_DURATION),
            Value::from(self.default_duration.clone()),
        );
        doc.insert(
            String::from(FIELD_PROC_MONITOR_METHOD),
            Value::from(self.proc_monitor_method.clone()),
        );
        doc.insert(String::from(FIELD_LOG_LEVEL), Value::from(self.log_level));
        doc.insert(
            String::from(FIELD_INTERCEPT_UNKNOWN),
            Value::from(self.intercept_unknown),
        );
        serde_json::to_string(&doc)
    }
}

/// The managed fields as far as a document actually carries them. Documents
/// in the wild omit fields or carry odd types; whatever doesn't read cleanly
/// stays None so the caller can keep its prior value.
#[derive(Debug, Default, PartialEq)]
pub struct PartialDaemonConfig {
    pub default_action: Option<String>,
    pub default_duration: Option<String>,
    pub proc_monitor_method: Option<String>,
    pub log_level: Option<u32>,
    pub intercept_unknown: Option<bool>,
}

impl PartialDaemonConfig {
    /// Errors only when `doc` is not a JSON object at all.
    pub fn parse(doc: &str) -> Result<PartialDaemonConfig, serde_json::Error> {
        let doc: Map<String, Value> = serde_json::from_str(doc)?;
        Ok(PartialDaemonConfig {
            default_action: doc
                .get(FIELD_DEFAULT_ACTION)
                .and_then(Value::as_str)
                .map(str::to_string),
            default_duration: doc
                .get(FIELD_DEFAULT_DURATION)
                .and_then(Value::as_str)
                .map(str::to_string),
            proc_monitor_method: doc
                .get(FIELD_PROC_MONITOR_METHOD)
                .and_then(Value::as_str)
                .map(str::to_string),
            log_level: doc
                .get(FIELD_LOG_LEVEL)
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok()),
            intercept_unknown: doc.get(FIELD_INTERCEPT_UNKNOWN).and_then(Value::as_bool),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch() -> DaemonConfigPatch {
        DaemonConfigPatch {
            default_action: String::from("deny"),
            default_duration: String::from("until restart"),
            proc_monitor_method: String::from("ebpf"),
            log_level: 3,
            intercept_unknown: true,
        }
    }

    #[test]
    fn merge_preserves_unknown_fields() {
        let prior = r#"{
            "Server": {"Address": "unix:///tmp/osui.sock", "LogFile": "/var/log/opensnitchd.log"},
            "Firewall": "nftables",
            "DefaultAction": "allow",
            "DefaultDuration": "once",
            "ProcMonitorMethod": "proc",
            "LogLevel": 1,
            "InterceptUnknown": false,
            "Stats": {"MaxEvents": 150}
        }"#;

        let merged = patch().merge_over(prior).unwrap();
        let doc: Map<String, Value> = serde_json::from_str(&merged).unwrap();

        // Managed fields carry the patch.
        assert_eq!(doc["DefaultAction"], "deny");
        assert_eq!(doc["DefaultDuration"], "until restart");
        assert_eq!(doc["ProcMonitorMethod"], "ebpf");
        assert_eq!(doc["LogLevel"], 3);
        assert_eq!(doc["InterceptUnknown"], true);

        // Everything else is byte-for-byte the prior document's content.
        assert_eq!(doc["Server"]["Address"], "unix:///tmp/osui.sock");
        assert_eq!(doc["Server"]["LogFile"], "/var/log/opensnitchd.log");
        assert_eq!(doc["Firewall"], "nftables");
        assert_eq!(doc["Stats"]["MaxEvents"], 150);
        assert_eq!(doc.len(), 8);
    }

    #[test]
    fn merge_fills_fields_the_prior_document_lacked() {
        let merged = patch().merge_over("{}").unwrap();
        let parsed = PartialDaemonConfig::parse(&merged).unwrap();
        assert_eq!(parsed.default_action.as_deref(), Some("deny"));
        assert_eq!(parsed.log_level, Some(3));
        assert_eq!(parsed.intercept_unknown, Some(true));
    }

    #[test]
    fn merge_rejects_a_non_object_document() {
        assert!(patch().merge_over("[1, 2]").is_err());
        assert!(patch().merge_over("not json").is_err());
    }

    #[test]
    fn partial_parse_tolerates_missing_and_mistyped_fields() {
        let parsed =
            PartialDaemonConfig::parse(r#"{"DefaultAction": "reject", "LogLevel": "high"}"#)
                .unwrap();
        assert_eq!(parsed.default_action.as_deref(), Some("reject"));
        // Wrong type reads as absent rather than failing the whole document.
        assert_eq!(parsed.log_level, None);
        assert_eq!(parsed.default_duration, None);
        assert_eq!(parsed.intercept_unknown, None);
    }

    #[test]
    fn patch_serializes_with_daemon_field_names() {
        let raw = serde_json::to_string(&patch()).unwrap();
        let doc: Map<String, Value> = serde_json::from_str(&raw).unwrap();
        for field in [
            "DefaultAction",
            "DefaultDuration",
            "ProcMonitorMethod",
            "LogLevel",
            "InterceptUnknown",
        ] {
            assert!(doc.contains_key(field), "missing {field}");
        }
    }
}
