//! TOML-based application configuration.
//!
//! Stores planner preferences:
//! - The owner id used when no identity layer supplies one
//! - Validation minimums for blocks and sub-items
//! - The day window scanned for gaps
//! - Default colour and icon for new blocks
//!
//! Configuration is stored at `~/.config/dayblocks/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::block::ValidationRules;
use crate::error::ConfigError;
use crate::time::parse_hhmm;

/// Planner behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_owner_id")]
    pub owner_id: String,
    #[serde(default = "default_min_block_minutes")]
    pub min_block_minutes: i32,
    #[serde(default = "default_min_sub_item_minutes")]
    pub min_sub_item_minutes: i32,
    /// HH:MM where gap detection starts
    #[serde(default = "default_day_start")]
    pub day_start: String,
    /// HH:MM where gap detection stops
    #[serde(default = "default_day_end")]
    pub day_end: String,
    /// Shorter free stretches are not reported as gaps
    #[serde(default = "default_min_gap_minutes")]
    pub min_gap_minutes: i32,
}

/// Defaults for new blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppearanceConfig {
    #[serde(default = "default_color")]
    pub default_color: String,
    #[serde(default = "default_icon")]
    pub default_icon: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub appearance: AppearanceConfig,
}

// Default functions
fn default_owner_id() -> String {
    "local".into()
}
fn default_min_block_minutes() -> i32 {
    5
}
fn default_min_sub_item_minutes() -> i32 {
    1
}
fn default_day_start() -> String {
    "06:00".into()
}
fn default_day_end() -> String {
    "23:00".into()
}
fn default_min_gap_minutes() -> i32 {
    15
}
fn default_color() -> String {
    "#3b82f6".into()
}
fn default_icon() -> String {
    "clock".into()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            owner_id: default_owner_id(),
            min_block_minutes: default_min_block_minutes(),
            min_sub_item_minutes: default_min_sub_item_minutes(),
            day_start: default_day_start(),
            day_end: default_day_end(),
            min_gap_minutes: default_min_gap_minutes(),
        }
    }
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            default_color: default_color(),
            default_icon: default_icon(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<i64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("not a leaf value".to_string()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Location of the config file.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing the defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Every leaf key with its current value, in dot-path form.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(serde_json::Value::Object(sections)) = serde_json::to_value(self) {
            for (section, fields) in sections {
                if let serde_json::Value::Object(fields) = fields {
                    for (field, value) in fields {
                        let rendered = match value {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        };
                        out.push((format!("{section}.{field}"), rendered));
                    }
                }
            }
        }
        out
    }

    /// Set a value in memory without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is invalid for it.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Restore defaults and save.
    pub fn reset() -> Result<Self, ConfigError> {
        let cfg = Self::default();
        cfg.save()?;
        Ok(cfg)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Reject values the planner cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        if self.planner.owner_id.trim().is_empty() {
            return Err(invalid("planner.owner_id", "must not be empty".into()));
        }
        if self.planner.min_block_minutes < 1 {
            return Err(invalid("planner.min_block_minutes", "must be at least 1".into()));
        }
        if self.planner.min_sub_item_minutes < 1 {
            return Err(invalid("planner.min_sub_item_minutes", "must be at least 1".into()));
        }
        if self.planner.min_gap_minutes < 1 {
            return Err(invalid("planner.min_gap_minutes", "must be at least 1".into()));
        }
        self.day_window()?;
        Ok(())
    }

    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules {
            min_block_minutes: self.planner.min_block_minutes,
            min_sub_item_minutes: self.planner.min_sub_item_minutes,
        }
    }

    /// `(day_start, day_end)` in minutes since midnight.
    ///
    /// # Errors
    /// Returns an error if either bound is malformed or the window is empty.
    pub fn day_window(&self) -> Result<(i32, i32), ConfigError> {
        let start = parse_hhmm(&self.planner.day_start).map_err(|e| ConfigError::InvalidValue {
            key: "planner.day_start".to_string(),
            message: e.to_string(),
        })?;
        let end = parse_hhmm(&self.planner.day_end).map_err(|e| ConfigError::InvalidValue {
            key: "planner.day_end".to_string(),
            message: e.to_string(),
        })?;
        if end <= start {
            return Err(ConfigError::InvalidValue {
                key: "planner.day_end".to_string(),
                message: format!(
                    "{} must be later than day_start {}",
                    self.planner.day_end, self.planner.day_start
                ),
            });
        }
        Ok((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("[planner]\nowner_id = \"alice\"\n").unwrap();
        assert_eq!(parsed.planner.owner_id, "alice");
        assert_eq!(parsed.planner.min_gap_minutes, 15);
        assert_eq!(parsed.appearance.default_icon, "clock");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("planner.owner_id").as_deref(), Some("local"));
        assert_eq!(cfg.get("planner.min_block_minutes").as_deref(), Some("5"));
        assert!(cfg.get("planner.missing_key").is_none());
        assert!(cfg.get("planner").is_none());
    }

    #[test]
    fn set_value_updates_number_and_string() {
        let mut cfg = Config::default();
        cfg.set_value("planner.min_gap_minutes", "30").unwrap();
        cfg.set_value("appearance.default_color", "#FF5733").unwrap();
        assert_eq!(cfg.planner.min_gap_minutes, 30);
        assert_eq!(cfg.appearance.default_color, "#FF5733");
    }

    #[test]
    fn set_value_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set_value("planner.nonexistent_key", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn set_value_rejects_invalid_type_and_range() {
        let mut cfg = Config::default();
        assert!(cfg.set_value("planner.min_block_minutes", "five").is_err());
        assert!(cfg.set_value("planner.min_block_minutes", "0").is_err());
        assert!(cfg.set_value("planner.day_end", "05:00").is_err());
        assert!(cfg.set_value("planner.day_start", "25:00").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn day_window_parses_defaults() {
        assert_eq!(Config::default().day_window().unwrap(), (360, 1380));
    }

    #[test]
    fn entries_lists_every_leaf() {
        let keys: Vec<String> = Config::default().entries().into_iter().map(|(k, _)| k).collect();
        assert!(keys.contains(&"planner.day_start".to_string()));
        assert!(keys.contains(&"appearance.default_icon".to_string()));
        assert_eq!(keys.len(), 8);
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set_value("planner.owner_id", "bob").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().planner.owner_id, "bob");
    }

    #[test]
    fn load_from_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "planner = 3").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
