use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "config/anon_chat.json";
pub const DEFAULT_INVITE_BASE: &str = "https://anon-chat.local/";

const MIN_POLL_INTERVAL_MS: u64 = 50;

fn default_database_path() -> String {
    "data/chat.db".to_string()
}

fn default_session_path() -> String {
    "data/session.db".to_string()
}

fn default_invite_base_url() -> String {
    DEFAULT_INVITE_BASE.to_string()
}

fn default_poll_interval_ms() -> u64 {
    750
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Shared chat store every client on this machine talks to.
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Per-identity auth session.
    #[serde(default = "default_session_path")]
    pub session_path: String,
    #[serde(default = "default_invite_base_url")]
    pub invite_base_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            session_path: default_session_path(),
            invite_base_url: default_invite_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl AppConfig {
    pub fn invite_base(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.invite_base_url)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}

/// Reads the config at `path`. A missing file is seeded with the defaults
/// so there is something to edit after the first launch; an unreadable or
/// malformed one is reported and replaced by defaults for this run only.
pub fn load_config(path: impl AsRef<Path>) -> AppConfig {
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let config = AppConfig::default();
            match save_config(path, &config) {
                Ok(()) => log::info!("Wrote default config to {}", path.display()),
                Err(err) => {
                    log::warn!("Could not write default config {}: {err}", path.display())
                }
            }
            return config;
        }
        Err(err) => {
            log::warn!("Could not read config {}: {err}", path.display());
            return AppConfig::default();
        }
    };

    serde_json::from_str(&content).unwrap_or_else(|err| {
        log::warn!("Ignoring malformed config {}: {err}", path.display());
        AppConfig::default()
    })
}

fn save_config(path: &Path, config: &AppConfig) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(config)?)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn path_in(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        dir.path().join(name)
    }

    #[test]
    fn missing_file_is_seeded_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_in(&dir, "config/absent.json");

        assert_eq!(load_config(&path), AppConfig::default());
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(serde_json::from_str::<AppConfig>(&written).unwrap(), AppConfig::default());
    }

    #[test]
    fn seeded_file_is_not_overwritten_on_next_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_in(&dir, "anon_chat.json");
        load_config(&path);

        fs::write(&path, r#"{ "poll_interval_ms": 300 }"#).unwrap();
        assert_eq!(load_config(&path).poll_interval_ms, 300);
    }

    #[test]
    fn malformed_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_in(&dir, "broken.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(load_config(&path), AppConfig::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_in(&dir, "partial.json");
        fs::write(&path, r#"{ "session_path": "alt/session.db" }"#).unwrap();

        let config = load_config(&path);
        assert_eq!(config.session_path, "alt/session.db");
        assert_eq!(config.database_path, "data/chat.db");
        assert_eq!(config.poll_interval_ms, 750);
    }

    #[test]
    fn save_then_load_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_in(&dir, "nested/config/anon_chat.json");
        let config = AppConfig {
            invite_base_url: "https://chat.example/app".to_string(),
            poll_interval_ms: 200,
            ..AppConfig::default()
        };

        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path), config);
    }

    #[test]
    fn invite_base_is_validated() {
        assert_eq!(AppConfig::default().invite_base().unwrap().as_str(), DEFAULT_INVITE_BASE);
        let config = AppConfig {
            invite_base_url: "not a url".to_string(),
            ..AppConfig::default()
        };
        assert!(config.invite_base().is_err());
    }

    #[test]
    fn poll_interval_has_a_floor() {
        let config = AppConfig {
            poll_interval_ms: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(MIN_POLL_INTERVAL_MS));
    }
}
