use std::path::Path;

use cardsync_core::config::AppConfig;
use cardsync_core::util::{is_http_url, normalize_text_option};

use crate::cli::{ConfigCommands, GlobalArgs};
use crate::commands::common::{load_config, resolve_config_path};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, args: &GlobalArgs) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_key,
            api_base_url,
            default_deck,
            fence_tag,
            call_spacing_ms,
        } => {
            let path = resolve_config_path(args)?;
            let updates = ConfigUpdates {
                api_key,
                api_base_url,
                default_deck,
                fence_tag,
                call_spacing_ms,
            };
            let config = run_config_init(&path, args, updates)?;
            println!("Saved config to {}", path.display());
            if config.api_key.is_none() {
                println!("Note: no API key set yet; pass --api-key or set CARDSYNC_API_KEY.");
            }
            Ok(())
        }
        ConfigCommands::Show { json } => {
            let path = resolve_config_path(args)?;
            let config = load_config(args)?.redacted();
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("# {}", path.display());
                for line in format_config_lines(&config) {
                    println!("{line}");
                }
            }
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
pub struct ConfigUpdates {
    pub api_key: Option<String>,
    pub api_base_url: Option<String>,
    pub default_deck: Option<String>,
    pub fence_tag: Option<String>,
    pub call_spacing_ms: Option<u64>,
}

/// Merge `updates` into the file at `path`, keeping values not mentioned.
///
/// Path flags (`--documents`, `--state`) are stored too.
pub fn run_config_init(
    path: &Path,
    args: &GlobalArgs,
    updates: ConfigUpdates,
) -> Result<AppConfig, CliError> {
    let mut config = AppConfig::load_from_path(path)?;

    if let Some(api_key) = normalize_text_option(updates.api_key) {
        config.api_key = Some(api_key);
    }
    if let Some(api_base_url) = normalize_text_option(updates.api_base_url) {
        if !is_http_url(&api_base_url) {
            return Err(CliError::Config(
                "--api-base-url must include http:// or https://".to_string(),
            ));
        }
        config.api_base_url = api_base_url;
    }
    if let Some(default_deck) = normalize_text_option(updates.default_deck) {
        config.default_deck_id = Some(default_deck);
    }
    if let Some(fence_tag) = normalize_text_option(updates.fence_tag) {
        config.fence_tag = fence_tag;
    }
    if let Some(call_spacing_ms) = updates.call_spacing_ms {
        config.call_spacing_ms = call_spacing_ms;
    }
    if let Some(documents) = &args.documents {
        config.documents_root = Some(documents.clone());
    }
    if let Some(state) = &args.state {
        config.state_path = Some(state.clone());
    }

    config.validate()?;
    config.save_to_path(path)?;
    Ok(config)
}

pub fn format_config_lines(config: &AppConfig) -> Vec<String> {
    let unset = || "(not set)".to_string();
    let display_path = |path: Option<&Path>| path.map_or_else(unset, |path| path.display().to_string());

    vec![
        format!("api_base_url = {}", config.api_base_url),
        format!(
            "api_key = {}",
            config.api_key.clone().unwrap_or_else(unset)
        ),
        format!(
            "default_deck_id = {}",
            config.default_deck_id.clone().unwrap_or_else(unset)
        ),
        format!(
            "documents_root = {}",
            display_path(config.documents_root.as_deref())
        ),
        format!("state_path = {}", display_path(config.state_path.as_deref())),
        format!("fence_tag = {}", config.fence_tag),
        format!("extensions = {}", config.extensions.join(", ")),
        format!("call_spacing_ms = {}", config.call_spacing_ms),
        format!("retry_max_attempts = {}", config.retry_max_attempts),
        format!("retry_base_delay_ms = {}", config.retry_base_delay_ms),
    ]
}
