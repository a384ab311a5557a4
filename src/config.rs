// Context store: `~/.yatai.yaml` holds one context per registry the user
// has logged into, plus the name of the current one.

use crate::api::ApiClient;
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONTEXT_NAME: &str = "default";

/// `~/.yatai.yaml`, or `./.yatai.yaml` without a home dir.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".yatai.yaml")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub name: String,
    pub endpoint: String,
    pub api_token: String,
    /// Organization every bento call of this context is scoped to.
    #[serde(default)]
    pub organization: String,
}

impl Context {
    pub fn client(&self) -> Result<ApiClient> {
        ApiClient::new(&self.endpoint, &self.api_token)
    }

    pub fn organization(&self) -> Result<&str> {
        if self.organization.is_empty() {
            return Err(CliError::Config(format!(
                "context {} has no organization, please login again",
                self.name
            )));
        }
        Ok(&self.organization)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub contexts: Vec<Context>,
    pub current_context_name: String,
}

impl Config {
    /// Load the store, creating it with an empty `default` context
    /// selection when the file does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config {
                contexts: Vec::new(),
                current_context_name: DEFAULT_CONTEXT_NAME.to_string(),
            };
            config.store(path)?;
            return Ok(config);
        }
        debug!(path = %path.display(), "loading config");
        let raw = std::fs::read_to_string(path)?;
        if raw.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(&raw)?)
    }

    pub fn store(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        debug!(path = %path.display(), "stored config");
        Ok(())
    }

    /// Replace the context with the same name, or append it.
    pub fn add_context(&mut self, context: Context) {
        match self.contexts.iter_mut().find(|c| c.name == context.name) {
            Some(existing) => *existing = context,
            None => self.contexts.push(context),
        }
    }

    pub fn current_context(&self) -> Result<&Context> {
        self.contexts
            .iter()
            .find(|c| c.name == self.current_context_name)
            .ok_or_else(|| {
                CliError::Config(format!(
                    "Not found {} yatai context, please login!",
                    self.current_context_name
                ))
            })
    }
}
