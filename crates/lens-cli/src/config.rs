//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory scanned for sessions.
    pub session_root: PathBuf,

    /// Command used to run the analysis agent for insight reports.
    pub agent_command: String,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            session_root: home.join(".copilot").join("session-state"),
            agent_command: "copilot".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Precedence, lowest to highest: built-in defaults, the platform
    /// config file, the explicit `--config` file, then `LENS_*`
    /// environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("LENS_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for lens.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("lens"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_root_is_under_home() {
        let config = Config::default();
        assert!(config.session_root.ends_with(".copilot/session-state"));
    }

    #[test]
    fn test_default_agent_command() {
        assert_eq!(Config::default().agent_command, "copilot");
    }

    #[test]
    fn test_explicit_config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "session_root = \"/srv/sessions\"\nagent_command = \"my-agent\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.session_root, PathBuf::from("/srv/sessions"));
        assert_eq!(config.agent_command, "my-agent");
    }
}
