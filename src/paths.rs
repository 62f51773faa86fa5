//! Default file locations
//!
//! - **Working directory**: a `config.yaml` in the current directory wins,
//!   which keeps `cargo run` next to a checkout working unchanged.
//! - **User config dir** (default): `<config_dir>/knob-gw/config.yaml`
//!   (`~/.config` on Linux, `%APPDATA%` on Windows).

use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name used under the platform config/data dirs
const APP_DIR: &str = "knob-gw";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Path to the configuration file
    pub config: PathBuf,
    /// Default directory for rolling log files
    pub logs_dir: PathBuf,
}

impl AppPaths {
    /// Resolve paths relative to `cwd`, falling back to the user dirs
    ///
    /// Called before logging is initialized.
    pub fn detect() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::resolve(&cwd, dirs::config_dir(), dirs::data_local_dir())
    }

    fn resolve(cwd: &Path, config_dir: Option<PathBuf>, data_dir: Option<PathBuf>) -> Self {
        let local = cwd.join(CONFIG_FILE);
        if local.exists() {
            return Self {
                config: local,
                logs_dir: cwd.join("logs"),
            };
        }

        let config = config_dir
            .map(|d| d.join(APP_DIR).join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        let logs_dir = data_dir
            .map(|d| d.join(APP_DIR).join("logs"))
            .unwrap_or_else(|| cwd.join("logs"));

        Self { config, logs_dir }
    }

    /// Create the log directory if it is missing
    pub fn ensure_logs_dir(dir: &Path) -> anyhow::Result<()> {
        if !dir.exists() {
            debug!("Creating logs directory: {}", dir.display());
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
