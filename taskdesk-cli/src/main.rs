//! # TaskDesk Shell
//!
//! Interactive, line-oriented front end for the TaskDesk core: log in, list
//! and edit tasks, administer users.
//!
//! ## Architecture
//!
//! The binary:
//! - Loads configuration from the environment (and `.env`)
//! - Builds the stores, auth service and query engines, seeding default data
//! - Restores the persisted session, if any
//! - Runs background loggers for statistics and the live task list
//! - Reads commands from stdin until `quit` or end of input
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskdesk-cli
//! ```

use std::sync::Arc;

use taskdesk_cli::app::App;
use taskdesk_cli::commands::{Outcome, Shell};
use taskdesk_cli::config::Config;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskdesk_cli=info,taskdesk_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("TaskDesk v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    tracing::debug!(
        session_file = %config.session.file.display(),
        seed = config.seed,
        "Configuration loaded"
    );

    let app = Arc::new(App::build(config).await?);

    let cancel = CancellationToken::new();
    let stats_logger = app.spawn_statistics_logger(cancel.clone()).await?;
    let (feed_controls, feed_logger) = app.spawn_task_feed_logger(cancel.clone());

    let mut shell = Shell::new(Arc::clone(&app));
    shell.attach_feed(feed_controls);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all(b"TaskDesk - type 'help' for commands\n").await?;
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received, exiting...");
                None
            }
        };
        let Some(line) = line else { break };

        match shell.execute(&line).await {
            Ok(Outcome::Quit) => break,
            Ok(Outcome::Output(text)) if text.is_empty() => {}
            Ok(Outcome::Output(text)) => {
                stdout.write_all(text.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
            }
            Err(err) => {
                stdout.write_all(format!("{}\n", err).as_bytes()).await?;
            }
        }
    }

    cancel.cancel();
    let _ = tokio::join!(stats_logger, feed_logger);
    tracing::info!("Goodbye");

    Ok(())
}
