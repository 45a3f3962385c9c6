use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod capture;
mod fetch;
mod greetings;
mod shutdown;
mod store;

#[derive(Debug, Parser)]
#[command(name = "bday")]
#[command(about = "Collect friends' birthdays through an authenticated browser session")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Capture a session, fetch this month's birthdays and store new ones.
    Fetch {
        /// Print the extracted birthdays instead of writing them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Run session capture only and report which tokens were found.
    Capture,
    /// List stored birthdays that have not been greeted yet.
    Pending,
    /// Mark a stored birthday as greeted.
    MarkPosted {
        id: i64,
        #[arg(long, default_value = bday_core::PersistedProfile::POSTED_MARKER)]
        card_url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = bday_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Fetch { dry_run } => {
            let shutdown = shutdown::ShutdownSignal::install(config.stop_file.clone());
            let outcome = fetch::run_fetch(&config, &shutdown, dry_run).await?;
            if outcome == fetch::FetchOutcome::Interrupted {
                shutdown.cleanup();
            }
            tracing::info!(?outcome, "fetch finished");
            Ok(outcome.exit_code())
        }
        Commands::Capture => {
            let complete = capture::run_capture(&config).await?;
            Ok(if complete {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Pending => {
            let store = store::open_store(&config).await?;
            let rows = greetings::pending_profiles(store.as_ref()).await?;
            greetings::print_pending(&rows);
            Ok(ExitCode::SUCCESS)
        }
        Commands::MarkPosted { id, card_url } => {
            let store = store::open_store(&config).await?;
            greetings::mark_posted(store.as_ref(), id, &card_url).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests;
