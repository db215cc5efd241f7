use crate::{host::protocol::DEFAULT_ACTION_UUID, poller::Timings, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod loader;

pub const DEFAULT_REFRESH_INTERVAL: Duration = crate::poller::DEFAULT_REFRESH_INTERVAL;
pub const DEFAULT_LONG_PRESS: Duration = crate::poller::DEFAULT_LONG_PRESS;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_AWS_CLI: &str = "aws";
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5);
pub const MIN_LONG_PRESS: Duration = Duration::from_millis(100);
pub const MAX_LONG_PRESS: Duration = Duration::from_secs(10);
const CONFIG_DIR_NAME: &str = ".pipeline_deck";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Daemon settings loaded from the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginConfig {
    #[serde(default = "default_action_uuid")]
    pub action_uuid: String,
    #[serde(default = "default_refresh_interval", with = "duration_str")]
    pub refresh_interval: Duration,
    #[serde(default = "default_long_press", with = "duration_str")]
    pub long_press: Duration,
    #[serde(default = "default_fetch_timeout", with = "duration_str")]
    pub fetch_timeout: Duration,
    #[serde(default = "default_aws_cli")]
    pub aws_cli: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            action_uuid: default_action_uuid(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            long_press: DEFAULT_LONG_PRESS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            aws_cli: default_aws_cli(),
        }
    }
}

impl PluginConfig {
    pub fn load_or_default() -> Result<Self> {
        loader::load_or_default()
    }

    /// Like [`PluginConfig::load_or_default`], also returning the path when the file was created.
    pub fn load_or_create() -> Result<(Self, Option<PathBuf>)> {
        loader::load_or_create()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        loader::load_from_path(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        loader::save_to_path(self, path)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        loader::parse(raw)
    }

    pub fn timings(&self) -> Timings {
        Timings {
            refresh_interval: self.refresh_interval,
            long_press: self.long_press,
        }
    }
}

pub(crate) fn validate(cfg: &PluginConfig) -> Result<()> {
    if cfg.action_uuid.trim().is_empty() {
        return Err(Error::Config("action_uuid must not be empty".into()));
    }
    if cfg.aws_cli.trim().is_empty() {
        return Err(Error::Config("aws_cli must not be empty".into()));
    }
    if cfg.refresh_interval < MIN_REFRESH_INTERVAL {
        return Err(Error::Config(format!(
            "refresh_interval must be at least {}",
            humantime::format_duration(MIN_REFRESH_INTERVAL)
        )));
    }
    if cfg.long_press < MIN_LONG_PRESS || cfg.long_press > MAX_LONG_PRESS {
        return Err(Error::Config(format!(
            "long_press must be between {} and {}",
            humantime::format_duration(MIN_LONG_PRESS),
            humantime::format_duration(MAX_LONG_PRESS)
        )));
    }
    if cfg.fetch_timeout.is_zero() {
        return Err(Error::Config("fetch_timeout must be greater than zero".into()));
    }
    Ok(())
}

fn default_action_uuid() -> String {
    DEFAULT_ACTION_UUID.to_string()
}

fn default_refresh_interval() -> Duration {
    DEFAULT_REFRESH_INTERVAL
}

fn default_long_press() -> Duration {
    DEFAULT_LONG_PRESS
}

fn default_fetch_timeout() -> Duration {
    DEFAULT_FETCH_TIMEOUT
}

fn default_aws_cli() -> String {
    DEFAULT_AWS_CLI.to_string()
}

/// Durations as humantime strings ("60s", "1s 300ms").
mod duration_str {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = PluginConfig::default();
        validate(&cfg).unwrap();
        assert_eq!(cfg.timings(), Timings::default());
        assert_eq!(cfg.action_uuid, DEFAULT_ACTION_UUID);
    }

    #[test]
    fn parses_humantime_durations() {
        let cfg = PluginConfig::parse(
            r#"
            refresh_interval = "2m"
            long_press = "1s 500ms"
            fetch_timeout = "45s"
            aws_cli = "/usr/local/bin/aws"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.refresh_interval, Duration::from_secs(120));
        assert_eq!(cfg.long_press, Duration::from_millis(1500));
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(45));
        assert_eq!(cfg.aws_cli, "/usr/local/bin/aws");
        assert_eq!(cfg.action_uuid, DEFAULT_ACTION_UUID);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = PluginConfig::parse("device = \"/dev/ttyUSB0\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{err:?}");
        assert!(err.to_string().contains("device"), "{err}");
    }

    #[test]
    fn rejects_out_of_range_values() {
        for raw in [
            "refresh_interval = \"1s\"",
            "long_press = \"50ms\"",
            "long_press = \"11s\"",
            "fetch_timeout = \"0s\"",
            "aws_cli = \"  \"",
            "action_uuid = \"\"",
        ] {
            let err = PluginConfig::parse(raw).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{raw}: {err:?}");
        }
    }

    #[test]
    fn rejects_bad_duration_strings() {
        let err = PluginConfig::parse("refresh_interval = \"soon\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{err:?}");
    }
}
