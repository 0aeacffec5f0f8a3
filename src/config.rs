//! Local key/value settings store for UI-side defaults (the "global/*"
//! scope). Values load once at startup and write through to disk on every
//! set, so a crash never loses an applied preference.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::log;

pub const CFG_DEFAULT_ACTION: &str = "global/default_action";
pub const CFG_DEFAULT_DURATION: &str = "global/default_duration";
pub const CFG_DEFAULT_TARGET: &str = "global/default_target";
pub const CFG_DEFAULT_TIMEOUT: &str = "global/default_timeout";

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug)]
pub struct Config {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl Config {
    /// Loads the settings file from `dir`, creating the directory when
    /// missing. An unreadable or mangled file degrades to built-in defaults.
    #[must_use]
    pub fn load(dir: &Path) -> Config {
        if let Err(err) = fs::create_dir_all(dir) {
            log::warn(&format!(
                "unable to create config dir {}: {err}",
                dir.display()
            ));
        }
        let path = dir.join(SETTINGS_FILE);
        let values = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(values) => values,
                Err(err) => {
                    log::error(&format!(
                        "settings file {} is unreadable, starting from defaults: {err}",
                        path.display()
                    ));
                    BTreeMap::new()
                }
            },
            // First run.
            Err(_) => BTreeMap::new(),
        };
        Config { path, values }
    }

    /// Stored value for `key`, or its built-in default.
    #[must_use]
    pub fn get(&self, key: &str) -> String {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| String::from(default_for(key)))
    }

    /// Updates `key` and persists the whole store immediately.
    pub fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
        self.save();
    }

    /// Keys with an explicitly stored value (defaults excluded).
    #[must_use]
    pub fn stored_keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn save(&self) {
        match serde_json::to_string_pretty(&self.values) {
            Ok(raw) => {
                if let Err(err) = fs::write(&self.path, raw) {
                    log::error(&format!(
                        "unable to write settings file {}: {err}",
                        self.path.display()
                    ));
                }
            }
            Err(err) => log::error(&format!("unable to serialize settings: {err}")),
        }
    }
}

fn default_for(key: &str) -> &'static str {
    match key {
        CFG_DEFAULT_ACTION => "allow",
        CFG_DEFAULT_DURATION => "30s",
        CFG_DEFAULT_TARGET => "1",
        CFG_DEFAULT_TIMEOUT => "15",
        _ => "",
    }
}
