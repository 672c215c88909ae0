//! FileDock CLI - Command-line client for a FileDock server
//!
//! Provides commands for:
//! - Listing stored files with statistics
//! - Uploading, downloading and deleting files
//! - Watching the store for changes via long polling

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod client;
mod commands;
mod output;

use client::{FileDockClient, DEFAULT_SERVER_URL};
use commands::{
    delete::DeleteCommand, download::DownloadCommand, list::ListCommand, upload::UploadCommand,
    watch::WatchCommand,
};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "filedock", version, about = "Client for the FileDock file service")]
pub struct Cli {
    /// URL of the server's files endpoint
    #[arg(long, global = true, default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List stored files
    List(ListCommand),
    /// Upload a local file
    Upload(UploadCommand),
    /// Download a stored file
    Download(DownloadCommand),
    /// Delete a stored file
    Delete(DeleteCommand),
    /// Follow changes until interrupted
    Watch(WatchCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let client = FileDockClient::new(cli.server);

    let result = match cli.command {
        Commands::List(cmd) => cmd.execute(&client, format).await,
        Commands::Upload(cmd) => cmd.execute(&client, format).await,
        Commands::Download(cmd) => cmd.execute(&client, format).await,
        Commands::Delete(cmd) => cmd.execute(&client, format).await,
        Commands::Watch(cmd) => cmd.execute(&client, format).await,
    };

    if let Err(e) = &result {
        get_formatter(cli.json).error(&format!("{e:#}"));
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_download_with_output() {
        let cli = Cli::try_parse_from([
            "filedock",
            "--server",
            "http://example.test/files",
            "download",
            "a.txt",
            "-o",
            "/tmp/a.txt",
        ])
        .unwrap();

        assert_eq!(cli.server, "http://example.test/files");
        match cli.command {
            Commands::Download(cmd) => {
                assert_eq!(cmd.name, "a.txt");
                assert_eq!(cmd.output, Some(std::path::PathBuf::from("/tmp/a.txt")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
