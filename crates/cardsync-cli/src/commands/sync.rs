use cardsync_core::config::AppConfig;
use cardsync_core::documents::DocumentStore;
use cardsync_core::remote::RemoteService;
use cardsync_core::state::StateStore;
use cardsync_core::sync::{run_sync, SyncReport};

use crate::cli::GlobalArgs;
use crate::commands::common::{
    document_store, format_report_lines, load_config, remote_service, state_store, RunLock,
};
use crate::error::CliError;

pub async fn run_sync_command(args: &GlobalArgs, as_json: bool) -> Result<(), CliError> {
    let config = load_config(args)?;
    let documents = document_store(&config)?;
    let states = state_store(&config)?;
    let service = remote_service(&config)?;

    let lock = RunLock::acquire(states.path())?;
    tracing::debug!(lock = %lock.path().display(), "Holding run lock");
    let report = sync_with(&config, &documents, &states, &service).await?;
    print_report(&report, as_json)
}

pub async fn sync_with<D, T, S>(
    config: &AppConfig,
    documents: &D,
    states: &T,
    service: &S,
) -> Result<SyncReport, CliError>
where
    D: DocumentStore + ?Sized,
    T: StateStore + ?Sized,
    S: RemoteService + ?Sized,
{
    tracing::info!("Starting sync");
    Ok(run_sync(documents, states, service, &config.sync_options()).await?)
}

pub fn print_report(report: &SyncReport, as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        for line in format_report_lines(report) {
            println!("{line}");
        }
    }

    if report.summary.has_failures() {
        return Err(CliError::CardsFailed(report.summary.failed));
    }
    Ok(())
}
