use cardsync_core::remote::{RemoteDeck, RemoteService};

use crate::cli::GlobalArgs;
use crate::commands::common::{load_config, remote_service};
use crate::error::CliError;

pub async fn run_decks(args: &GlobalArgs, as_json: bool) -> Result<(), CliError> {
    let config = load_config(args)?;
    let service = remote_service(&config)?;
    let mut decks = service.list_decks().await?;
    decks.sort_by(|left, right| left.name.cmp(&right.name));

    if as_json {
        println!("{}", serde_json::to_string_pretty(&decks)?);
        return Ok(());
    }

    for line in format_deck_lines(&decks, config.default_deck_id.as_deref()) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_deck_lines(decks: &[RemoteDeck], default_deck_id: Option<&str>) -> Vec<String> {
    if decks.is_empty() {
        return vec!["No decks found.".to_string()];
    }

    decks
        .iter()
        .map(|deck| {
            let marker = if Some(deck.id.as_str()) == default_deck_id {
                " (default)"
            } else {
                ""
            };
            format!("{}  {}{}", deck.id, deck.name, marker)
        })
        .collect()
}
