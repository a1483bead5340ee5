use crate::agents::package_manager::DEFAULT_INSTALL_COMMAND;
use crate::agents::update::task::LOCK_FILE_NAME;
use crate::error::{ExtMgrError, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pvtextmgr.toml";

/// Pause between consecutive extensions in milliseconds.
pub const DEFAULT_PAUSE_MS: u64 = 250;

const DEFAULT_EXTENSIONS_DIR: &str = "~/.vscode/extensions";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ManagerConfig {
    /// Extension name to source-location string, in file order.
    pub extensions: IndexMap<String, String>,
    pub clean: bool,
    pub keep_log: bool,
    #[serde(alias = "runAsync")]
    pub out_of_process: bool,
    pub extensions_dir: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub pause_ms: u64,
    pub install_command: Vec<String>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            extensions: IndexMap::new(),
            clean: false,
            keep_log: false,
            out_of_process: false,
            extensions_dir: None,
            log_dir: None,
            pause_ms: DEFAULT_PAUSE_MS,
            install_command: DEFAULT_INSTALL_COMMAND.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ManagerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ExtMgrError::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ManagerConfig = toml::from_str(content)?;
        if config.install_command.is_empty() {
            return Err(ExtMgrError::Config(
                "installCommand must name at least a program".to_string(),
            ));
        }
        Ok(config)
    }

    /// Install root, preferring `override_dir` over the configured value. `~` is expanded.
    pub fn resolve_extensions_dir(&self, override_dir: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = override_dir {
            return expand_home(&dir.to_string_lossy());
        }
        expand_home(self.extensions_dir.as_deref().unwrap_or(DEFAULT_EXTENSIONS_DIR))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(default_log_dir)
    }

    /// Lock file guarding against concurrent runs; lives next to the run logs.
    pub fn lock_file(&self) -> PathBuf {
        self.log_dir().join(LOCK_FILE_NAME)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

/// `$XDG_DATA_HOME/pvtextmgr/logs`, falling back to `~/.local/share/pvtextmgr/logs`.
pub fn default_log_dir() -> PathBuf {
    log_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

fn log_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("pvtextmgr").join("logs")
}

fn expand_home(raw: &str) -> Result<PathBuf> {
    expand_home_with(raw, dirs::home_dir())
}

fn expand_home_with(raw: &str, home_dir: Option<PathBuf>) -> Result<PathBuf> {
    let rest = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return Ok(PathBuf::from(raw)),
    };

    let home = home_dir.ok_or_else(|| {
        ExtMgrError::Config(format!("Cannot expand '{}': home directory unknown", raw))
    })?;
    Ok(if rest.is_empty() { home } else { home.join(rest) })
}
