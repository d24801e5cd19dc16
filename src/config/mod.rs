//! Configuration loading and management
//!
//! Values come from an optional YAML file and are then overridden by the
//! environment variables the CMS deployment already sets:
//!
//! | variable | field |
//! |---|---|
//! | `CMS_AUTOMATION_CONFIG` | path of the YAML file |
//! | `FRONT_END_LINK` | `frontend_link` |
//! | `PAGE_WEB_HOOK_API_KEY` | `webhook_api_key` |
//! | `DATABASE_URL` | `database_url` |
//! | `BIND_ADDRESS` | `bind_address` |

use crate::core::error::ConfigError;
use crate::core::page::PageStatus;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Variable naming the YAML configuration file
pub const CONFIG_PATH_VAR: &str = "CMS_AUTOMATION_CONFIG";

/// Runtime configuration of the automation hooks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Base URL of the frontend receiving page webhooks
    pub frontend_link: Option<String>,

    /// Sent as `x-api-key` on every webhook call
    pub webhook_api_key: Option<String>,

    /// Collection holding form definitions
    pub forms_collection: String,

    /// Collection holding pages
    pub pages_collection: String,

    /// Database schema form collections are created in
    pub schema: String,

    /// Rows per metadata batch insert
    pub batch_chunk_size: usize,

    /// Statuses that cascade from a root page to its descendants
    pub cascade_statuses: Vec<PageStatus>,

    pub bind_address: String,

    pub database_url: Option<String>,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            frontend_link: None,
            webhook_api_key: None,
            forms_collection: "forms".to_string(),
            pages_collection: "pages".to_string(),
            schema: "public".to_string(),
            batch_chunk_size: 30,
            cascade_statuses: vec![PageStatus::Archived],
            bind_address: "0.0.0.0:3000".to_string(),
            database_url: None,
        }
    }
}

impl AutomationConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the process environment
    ///
    /// See [`AutomationConfig::from_vars`].
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Load from environment-style pairs
    ///
    /// The YAML file named by `CMS_AUTOMATION_CONFIG` is read first when set,
    /// defaults are used otherwise, then the remaining variables override it.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        let path = vars
            .iter()
            .find(|(name, value)| name == CONFIG_PATH_VAR && !value.trim().is_empty())
            .map(|(_, value)| value.clone());

        let mut config = match path {
            Some(path) => Self::from_yaml_file(&path)?,
            None => Self::default(),
        };
        config.merge_env(vars);
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment-style pairs
    ///
    /// Empty values are treated as unset.
    pub fn merge_env(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .collect();

        if let Some(link) = vars.get("FRONT_END_LINK") {
            self.frontend_link = Some(link.clone());
        }
        if let Some(key) = vars.get("PAGE_WEB_HOOK_API_KEY") {
            self.webhook_api_key = Some(key.clone());
        }
        if let Some(url) = vars.get("DATABASE_URL") {
            self.database_url = Some(url.clone());
        }
        if let Some(addr) = vars.get("BIND_ADDRESS") {
            self.bind_address = addr.clone();
        }
    }

    /// Check values that would otherwise fail later at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "batch_chunk_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.forms_collection.is_empty() || self.pages_collection.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "collections".to_string(),
                message: "collection names cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Frontend base URL, `None` when unset or blank
    pub fn frontend_link(&self) -> Option<&str> {
        self.frontend_link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
    }

    /// Log what is missing for page notifications to work
    pub fn warn_missing(&self) {
        if self.frontend_link().is_none() {
            tracing::warn!("FRONT_END_LINK is not set, page webhooks will be skipped");
        }
        if self.webhook_api_key.is_none() {
            tracing::warn!("PAGE_WEB_HOOK_API_KEY is not set, webhooks are sent without x-api-key");
        }
    }
}
