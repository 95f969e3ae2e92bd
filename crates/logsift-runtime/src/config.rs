use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolve the data directory used for default file locations:
/// 1. Explicit path (with tilde expansion)
/// 2. LOGSIFT_PATH environment variable (with tilde expansion)
/// 3. XDG data directory
/// 4. ~/.logsift (fallback for systems without XDG)
pub fn resolve_data_dir(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("LOGSIFT_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("logsift"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".logsift"));
    }

    Err(Error::Config(
        "Could not determine data directory: no HOME directory or XDG data directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// Configuration for one pipeline instance.
///
/// Passed into [`RunController::new`](crate::RunController::new)
/// explicitly; there is no process-global settings object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Source file: one log line per record.
    pub log_file: PathBuf,

    /// Result store location, auto-created on first use.
    pub db_path: PathBuf,

    /// Courtesy delay between lines, easing load on the gateway.
    #[serde(default = "default_line_delay_ms")]
    pub line_delay_ms: u64,

    /// How often a paused worker re-checks its flags.
    #[serde(default = "default_pause_poll_ms")]
    pub pause_poll_ms: u64,

    /// How long `stop()` waits for the worker before marking the run
    /// stopped anyway.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,

    /// How many recent runs `statistics()` includes.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_line_delay_ms() -> u64 {
    500
}

fn default_pause_poll_ms() -> u64 {
    1000
}

fn default_stop_grace_ms() -> u64 {
    3000
}

fn default_recent_limit() -> usize {
    5
}

impl PipelineConfig {
    /// Config with default timings, rooted at the given data directory.
    pub fn with_data_dir(data_dir: &Path) -> Self {
        PipelineConfig {
            log_file: data_dir.join("logs_to_agent.txt"),
            db_path: data_dir.join("log_results.db"),
            line_delay_ms: default_line_delay_ms(),
            pause_poll_ms: default_pause_poll_ms(),
            stop_grace_ms: default_stop_grace_ms(),
            recent_limit: default_recent_limit(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn line_delay(&self) -> Duration {
        Duration::from_millis(self.line_delay_ms)
    }

    pub fn pause_poll(&self) -> Duration {
        Duration::from_millis(self.pause_poll_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_round_trips_through_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let config = PipelineConfig {
            log_file: PathBuf::from("/var/log/app.log"),
            db_path: dir.path().join("results.db"),
            line_delay_ms: 100,
            pause_poll_ms: 50,
            stop_grace_ms: 1000,
            recent_limit: 3,
        };
        config.save_to(&config_path).unwrap();

        let loaded = PipelineConfig::load_from(&config_path).unwrap();
        assert_eq!(loaded.log_file, config.log_file);
        assert_eq!(loaded.line_delay_ms, 100);
        assert_eq!(loaded.recent_limit, 3);
    }

    #[test]
    fn missing_timing_fields_fall_back_to_defaults() {
        let parsed: PipelineConfig =
            toml::from_str("log_file = \"a.log\"\ndb_path = \"r.db\"\n").unwrap();
        assert_eq!(parsed.line_delay_ms, 500);
        assert_eq!(parsed.pause_poll_ms, 1000);
        assert_eq!(parsed.stop_grace_ms, 3000);
        assert_eq!(parsed.recent_limit, 5);
    }

    #[test]
    fn explicit_data_dir_wins() {
        let dir = resolve_data_dir(Some("/tmp/logsift-test")).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/logsift-test"));
    }
}
