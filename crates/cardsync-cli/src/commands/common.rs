use std::env;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use cardsync_core::config::AppConfig;
use cardsync_core::documents::FsDocumentStore;
use cardsync_core::remote::{HttpCardService, RetryingService};
use cardsync_core::state::JsonFileStateStore;
use cardsync_core::sync::SyncReport;
use chrono::{DateTime, Utc};
use fs2::FileExt;

use crate::cli::GlobalArgs;
use crate::error::CliError;

const APP_DIR_NAME: &str = "cardsync";
const CONFIG_FILE_NAME: &str = "config.json";
const STATE_FILE_NAME: &str = "state.json";

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve config directory".to_string()))
}

pub fn default_state_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(STATE_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve data directory".to_string()))
}

pub fn resolve_config_path(args: &GlobalArgs) -> Result<PathBuf, CliError> {
    args.config.clone().map_or_else(default_config_path, Ok)
}

/// Config file, then environment, then command-line flags.
pub fn load_config(args: &GlobalArgs) -> Result<AppConfig, CliError> {
    let path = resolve_config_path(args)?;
    load_config_with(args, &path, |key| env::var(key).ok())
}

pub fn load_config_with<F>(args: &GlobalArgs, path: &Path, lookup: F) -> Result<AppConfig, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = AppConfig::load_from_path(path)?;
    config.apply_env(lookup);

    if let Some(documents) = &args.documents {
        config.documents_root = Some(documents.clone());
    }
    if let Some(state) = &args.state {
        config.state_path = Some(state.clone());
    }

    config.validate()?;
    Ok(config)
}

pub fn documents_root(config: &AppConfig) -> Result<PathBuf, CliError> {
    config
        .documents_root
        .clone()
        .ok_or(CliError::MissingDocumentsRoot)
}

pub fn state_path(config: &AppConfig) -> Result<PathBuf, CliError> {
    config.state_path.clone().map_or_else(default_state_path, Ok)
}

pub fn document_store(config: &AppConfig) -> Result<FsDocumentStore, CliError> {
    Ok(FsDocumentStore::new(documents_root(config)?).with_extensions(&config.extensions))
}

pub fn state_store(config: &AppConfig) -> Result<JsonFileStateStore, CliError> {
    Ok(JsonFileStateStore::new(state_path(config)?))
}

pub fn remote_service(config: &AppConfig) -> Result<RetryingService<HttpCardService>, CliError> {
    let api_key = config.api_key.clone().ok_or(CliError::MissingApiKey)?;
    let service = HttpCardService::new(config.api_base_url.clone(), api_key)?;
    Ok(RetryingService::new(service, config.retry_policy()))
}

/// Exclusive advisory lock on `<state>.lock`, released when dropped.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    _file: File,
}

impl RunLock {
    pub fn acquire(state_path: &Path) -> Result<Self, CliError> {
        let mut lock_name = state_path.as_os_str().to_owned();
        lock_name.push(".lock");
        let path = PathBuf::from(lock_name);

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(CliError::RunInProgress(path));
        }

        Ok(Self { path, _file: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |datetime| datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_report_lines(report: &SyncReport) -> Vec<String> {
    let summary = &report.summary;
    let mut lines = vec![
        format!(
            "Scanned {} document(s), wrote identifiers into {}",
            report.documents_scanned, report.documents_rewritten
        ),
        format!(
            "Cards: {} found, {} created, {} updated, {} unchanged, {} failed",
            summary.total_found, summary.created, summary.updated, summary.unchanged, summary.failed
        ),
    ];

    for handle in &report.documents_skipped {
        lines.push(format!("  skipped document {handle}"));
    }
    for failure in &summary.failures {
        lines.push(format!(
            "  failed {} ({}): {}",
            failure.local_id, failure.source, failure.error
        ));
    }
    lines
}
