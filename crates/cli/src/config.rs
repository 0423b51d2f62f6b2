// CLI configuration
// Precedence (lowest first): defaults, --config file, DIRQUEUE_* env, flags

use anyhow::{Context, Result};
use dirqueue_core::domain::QueueConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ROOT: &str = "~/.dirqueue";
const ENV_PREFIX: &str = "DIRQUEUE";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Queue root; `~` is expanded
    pub root: String,
    /// `pretty` or `json`
    pub log_format: String,
    /// Per-item limit for `process`, unset = wait forever
    pub action_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn load(file: Option<&Path>, root_override: Option<&Path>) -> Result<Self> {
        Self::load_from(file, root_override, true)
    }

    fn load_from(file: Option<&Path>, root_override: Option<&Path>, with_env: bool) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("root", DEFAULT_ROOT)?
            .set_default("log_format", "pretty")?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        if with_env {
            builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX));
        }
        if let Some(root) = root_override {
            builder = builder.set_override("root", root.to_string_lossy().into_owned())?;
        }

        builder
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.root).into_owned())
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::new(self.root_path())
    }

    pub fn action_timeout(&self) -> Option<Duration> {
        self.action_timeout_secs.map(Duration::from_secs)
    }
}
