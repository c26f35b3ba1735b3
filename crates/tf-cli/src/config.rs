//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the local state document.
    pub state_path: PathBuf,
    /// Path to the `SQLite` store that holds per-user documents for sync.
    pub database_path: PathBuf,
    /// Owner of the remote document. Unset means local-only.
    pub user: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("state_path", &self.state_path)
            .field("database_path", &self.database_path)
            .field("user", &self.user)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            state_path: data_dir.join("state.json"),
            database_path: data_dir.join("remote.db"),
            user: None,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TF_*)
        figment = figment.merge(Env::prefixed("TF_"));

        let mut config: Self = figment.extract()?;
        config.user = checked_user(config.user.as_deref())?;
        Ok(config)
    }

    /// Sets the owner of the remote document, e.g. from `--user`.
    pub fn set_user(&mut self, user: &str) -> Result<(), String> {
        self.user = checked_user(Some(user))?;
        Ok(())
    }

    /// The local document path, namespaced by user when one is configured.
    ///
    /// `state.json` becomes `state-<user>.json`.
    pub fn local_state_path(&self) -> PathBuf {
        let Some(user) = self.user.as_deref().filter(|u| !u.trim().is_empty()) else {
            return self.state_path.clone();
        };
        let stem = self
            .state_path
            .file_stem()
            .map_or_else(|| "state".to_string(), |s| s.to_string_lossy().into_owned());
        let file_name = match self.state_path.extension() {
            Some(ext) => format!("{stem}-{user}.{}", ext.to_string_lossy()),
            None => format!("{stem}-{user}"),
        };
        self.state_path.with_file_name(file_name)
    }
}

/// Trims a user name; blank names mean no user.
///
/// The name becomes part of a file name, so path separators and the
/// `.`/`..` components are rejected.
fn checked_user(user: Option<&str>) -> Result<Option<String>, String> {
    let Some(user) = user.map(str::trim).filter(|u| !u.is_empty()) else {
        return Ok(None);
    };
    if matches!(user, "." | "..") || user.contains(['/', '\\']) || user.chars().any(char::is_control)
    {
        return Err(format!(
            "invalid user '{user}': use a plain name without path separators"
        ));
    }
    Ok(Some(user.to_string()))
}

/// Returns the platform-specific config directory for tf.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("timeflow"))
}

/// Returns the platform-specific data directory for tf.
///
/// On Linux: `~/.local/share/timeflow`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("timeflow"))
}
