use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "cardsync")]
#[command(about = "Keep flashcards written in your notes in sync with a remote card service")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Root directory of the documents to scan
    #[arg(long, global = true, value_name = "DIR")]
    pub documents: Option<PathBuf>,

    /// Path to the sync state file
    #[arg(long, global = true, value_name = "PATH")]
    pub state: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Path overrides shared by every command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub documents: Option<PathBuf>,
    pub state: Option<PathBuf>,
}

impl Cli {
    pub fn global_args(&self) -> GlobalArgs {
        GlobalArgs {
            config: self.config.clone(),
            documents: self.documents.clone(),
            state: self.state.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assign identifiers, push new and changed cards, save state
    Sync {
        /// Output the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the cards found in the documents without changing anything
    Scan {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what the next sync would do
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List decks known to the remote service
    Decks {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// API key for the remote card service
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
        /// Base URL of the remote card service API
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Deck id used for cards without a `Deck:` line
        #[arg(long, value_name = "ID")]
        default_deck: Option<String>,
        /// Fence tag that marks card blocks
        #[arg(long, value_name = "TAG")]
        fence_tag: Option<String>,
        /// Delay between remote calls in milliseconds
        #[arg(long, value_name = "MS")]
        call_spacing_ms: Option<u64>,
    },
    /// Print the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
