//! thread-dl - command-line interface
//!
//! `download` runs one thread to completion; `serve` starts the REST API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use thread_dl::downloader::NoopReporter;
use thread_dl::{Config, RunStatus, ThreadDownloader, ThreadId};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "thread-dl", version, about = "Archive imageboard thread attachments")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root folder for thread downloads
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    /// Address the API server binds to
    #[arg(long, global = true)]
    bind: Option<SocketAddr>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download one thread and print its result as JSON
    Download {
        /// Numeric thread identifier
        thread_id: String,
    },
    /// Serve the REST API until interrupted
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "thread-dl failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> thread_dl::Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(dir) = cli.download_dir {
        config.download.download_dir = dir;
    }
    if let Some(bind) = cli.bind {
        config.server.api.bind_address = bind;
    }

    let downloader = ThreadDownloader::new(config)?;

    match cli.command {
        Command::Download { thread_id } => {
            let thread_id = ThreadId::parse(&thread_id)?;
            let result = downloader.download_thread(&thread_id, &NoopReporter).await;

            println!("{}", serde_json::to_string_pretty(&result)?);

            Ok(match result.status() {
                RunStatus::Failed => ExitCode::FAILURE,
                _ => ExitCode::SUCCESS,
            })
        }
        Command::Serve => {
            thread_dl::run_with_shutdown(downloader).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
