use std::{env, fs, path::Path};

use anyhow::Context;
use overlaycore::SyncConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

const CONFIG_NAME: &str = "overlay-sync.toml";
const SYSTEM_CONFIG: &str = "/etc/overlay-sync/overlay-sync.toml";

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub timeline: Timeline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    /// Longest pause between two sightings that still counts as one interval
    #[serde(default = "default_gap_ms")]
    pub gap_ms: u64,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            gap_ms: default_gap_ms(),
        }
    }
}

fn default_log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

fn default_gap_ms() -> u64 {
    timeline::DEFAULT_GAP_MS
}

impl Config {
    /// Loads `path` if given, otherwise the first of `overlay-sync.toml` and
    /// `/etc/overlay-sync/overlay-sync.toml` that exists, otherwise defaults.
    pub fn parse(path: Option<String>) -> anyhow::Result<Self> {
        let cfg = match path {
            Some(path) => Self::from_file(&path)?,
            None => match [CONFIG_NAME, SYSTEM_CONFIG]
                .into_iter()
                .find(|p| Path::new(p).is_file())
            {
                Some(path) => Self::from_file(path)?,
                None => {
                    debug!("no config file found, using defaults");
                    Self::default()
                }
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        debug!("config loaded from {}", path.display());
        toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.log.level.trim().is_empty() {
            anyhow::bail!("log level cannot be empty");
        }
        self.sync
            .validate()
            .map_err(|e| anyhow::anyhow!("sync config error: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlaycore::FilterMode;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.timeline.gap_ms, 3000);
        assert_eq!(cfg.sync.frame_rate, 1.0);
        assert_eq!(cfg.sync.queue_capacity, 240);
        assert!(cfg.sync.flush_on_reload);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_overrides_from_file() {
        let file = write_config(
            r#"
[log]
level = "trace"

[sync]
frame_rate = 30.0
stall_budget = 5.0
filter = "Selection"

[timeline]
gap_ms = 1500
"#,
        );
        let cfg = Config::parse(Some(file.path().display().to_string())).unwrap();
        assert_eq!(cfg.log.level, "trace");
        assert_eq!(cfg.sync.frame_rate, 30.0);
        assert_eq!(cfg.sync.stall_budget, 5.0);
        assert_eq!(cfg.sync.filter, FilterMode::Selection);
        assert_eq!(cfg.sync.segment_duration, 2.0);
        assert_eq!(cfg.timeline.gap_ms, 1500);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let file = write_config("[sync]\nframe_rate = 0.0\n");
        let err = Config::parse(Some(file.path().display().to_string())).unwrap_err();
        assert!(err.to_string().contains("sync config error"));

        let file = write_config("[sync]\nframe_rate = \"fast\"\n");
        assert!(Config::parse(Some(file.path().display().to_string())).is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(Config::parse(Some(path.display().to_string())).is_err());
    }
}
