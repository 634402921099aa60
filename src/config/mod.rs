//! Runtime tunables.
//!
//! Defaults are compiled in; a TOML file at `~/.stepshot/config.toml`
//! overrides individual values. Durations are given in milliseconds on
//! disk.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::util::paths::config_path;

/// Resolved configuration used by every context.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default deadline for a bridge call.
    pub request_timeout: Duration,
    /// Short deadline for the installation probe.
    pub ping_deadline: Duration,
    /// Recorder data-available flush cadence.
    pub flush_interval: Duration,
    /// Capacity of the runtime request queues.
    pub channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            ping_deadline: Duration::from_millis(800),
            flush_interval: Duration::from_millis(1000),
            channel_capacity: 64,
        }
    }
}

/// On-disk shape; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TomlConfig {
    request_timeout_ms: Option<u64>,
    ping_deadline_ms: Option<u64>,
    flush_interval_ms: Option<u64>,
    channel_capacity: Option<usize>,
}

impl Config {
    /// Load defaults merged with the user's config file, if present. A
    /// missing file is not an error; an unreadable one is logged and
    /// ignored.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let mut config = Self::default();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read config file");
                return config;
            }
        };
        let parsed: TomlConfig = match toml::from_str(&contents) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring malformed config file");
                return config;
            }
        };

        if let Some(ms) = parsed.request_timeout_ms {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parsed.ping_deadline_ms {
            config.ping_deadline = Duration::from_millis(ms);
        }
        if let Some(ms) = parsed.flush_interval_ms {
            config.flush_interval = Duration::from_millis(ms);
        }
        if let Some(capacity) = parsed.channel_capacity {
            config.channel_capacity = capacity.max(1);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/stepshot/config.toml"));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.ping_deadline, Duration::from_millis(800));
    }

    #[test]
    fn file_values_override_defaults_individually() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "ping-deadline-ms = 250").unwrap();
        writeln!(file, "channel-capacity = 8").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.ping_deadline, Duration::from_millis(250));
        assert_eq!(config.channel_capacity, 8);
        // Untouched values keep their defaults.
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn malformed_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "ping-deadline-ms = \"soon\"").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.ping_deadline, Duration::from_millis(800));
    }
}
