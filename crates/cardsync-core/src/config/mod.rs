//! Application configuration.
//!
//! Settings are read from a JSON file and then overridden by environment
//! variables. Unknown fields are ignored so files written by newer versions
//! keep loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::extract::DEFAULT_FENCE_TAG;
use crate::reconcile::{ReconcileOptions, DEFAULT_CALL_SPACING};
use crate::remote::{RetryPolicy, DEFAULT_API_BASE_URL};
use crate::sync::SyncOptions;
use crate::util::{is_http_url, normalize_text_option, write_atomic};
use crate::{Error, Result};

pub const ENV_API_KEY: &str = "CARDSYNC_API_KEY";
pub const ENV_API_BASE_URL: &str = "CARDSYNC_API_BASE_URL";
pub const ENV_DEFAULT_DECK: &str = "CARDSYNC_DEFAULT_DECK";
pub const ENV_DOCUMENTS: &str = "CARDSYNC_DOCUMENTS";
pub const ENV_STATE_PATH: &str = "CARDSYNC_STATE_PATH";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub default_deck_id: Option<String>,
    #[serde(default)]
    pub documents_root: Option<PathBuf>,
    #[serde(default)]
    pub state_path: Option<PathBuf>,
    #[serde(default = "default_fence_tag")]
    pub fence_tag: String,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_call_spacing_ms")]
    pub call_spacing_ms: u64,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_fence_tag() -> String {
    DEFAULT_FENCE_TAG.to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

#[allow(clippy::cast_possible_truncation)] // 500ms fits in u64
const fn default_call_spacing_ms() -> u64 {
    DEFAULT_CALL_SPACING.as_millis() as u64
}

fn default_retry_max_attempts() -> u32 {
    RetryPolicy::default().max_attempts
}

#[allow(clippy::cast_possible_truncation)] // 1s fits in u64
fn default_retry_base_delay_ms() -> u64 {
    RetryPolicy::default().base_delay.as_millis() as u64
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_key: None,
            default_deck_id: None,
            documents_root: None,
            state_path: None,
            fence_tag: default_fence_tag(),
            extensions: default_extensions(),
            call_spacing_ms: default_call_spacing_ms(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl AppConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            Error::Config(format!("Failed to read config at {}: {error}", path.display()))
        })?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::Config(format!("Failed to parse config at {}: {error}", path.display()))
        })?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)?;
        write_atomic(path, serialized.as_bytes()).map_err(|error| {
            Error::Config(format!("Failed to write config at {}: {error}", path.display()))
        })
    }

    /// Apply overrides from a key lookup, usually `std::env::var`.
    ///
    /// Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| normalize_text_option(lookup(key));

        if let Some(api_key) = get(ENV_API_KEY) {
            self.api_key = Some(api_key);
        }
        if let Some(base_url) = get(ENV_API_BASE_URL) {
            self.api_base_url = base_url;
        }
        if let Some(deck) = get(ENV_DEFAULT_DECK) {
            self.default_deck_id = Some(deck);
        }
        if let Some(root) = get(ENV_DOCUMENTS) {
            self.documents_root = Some(PathBuf::from(root));
        }
        if let Some(state_path) = get(ENV_STATE_PATH) {
            self.state_path = Some(PathBuf::from(state_path));
        }
        self.normalize();
    }

    /// Check values that would otherwise fail deep inside a run.
    pub fn validate(&self) -> Result<()> {
        if !is_http_url(&self.api_base_url) {
            return Err(Error::Config(format!(
                "api_base_url '{}' must include http:// or https://",
                self.api_base_url
            )));
        }
        if self.fence_tag.is_empty() || self.fence_tag.chars().any(char::is_whitespace) {
            return Err(Error::Config(format!(
                "fence_tag '{}' must be a single word",
                self.fence_tag
            )));
        }
        if self.retry_max_attempts == 0 {
            return Err(Error::Config(
                "retry_max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    #[must_use]
    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            call_spacing: Duration::from_millis(self.call_spacing_ms),
            default_deck_id: self.default_deck_id.clone(),
        }
    }

    #[must_use]
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            fence_tag: self.fence_tag.clone(),
            reconcile: self.reconcile_options(),
        }
    }

    /// Copy safe to print: the API key is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            api_key: self.api_key.as_ref().map(|_| "[REDACTED]".to_string()),
            ..self.clone()
        }
    }

    fn normalize(&mut self) {
        self.api_base_url = normalize_text_option(Some(self.api_base_url.clone()))
            .map_or_else(default_api_base_url, |url| {
                url.trim_end_matches('/').to_string()
            });
        self.api_key = normalize_text_option(self.api_key.take());
        self.default_deck_id = normalize_text_option(self.default_deck_id.take());
        self.fence_tag =
            normalize_text_option(Some(self.fence_tag.clone())).unwrap_or_else(default_fence_tag);
        self.extensions = self
            .extensions
            .iter()
            .filter_map(|extension| {
                normalize_text_option(Some(extension.trim_start_matches('.').to_lowercase()))
            })
            .collect();
        if self.extensions.is_empty() {
            self.extensions = default_extensions();
        }
        self.documents_root = self
            .documents_root
            .take()
            .filter(|path| !path.as_os_str().is_empty());
        self.state_path = self
            .state_path
            .take()
            .filter(|path| !path.as_os_str().is_empty());
    }
}
