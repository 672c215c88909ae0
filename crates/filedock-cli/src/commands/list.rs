//! List command - Show stored files and statistics
//!
//! Provides the `filedock list` CLI command which prints every stored file
//! with its human-readable size and modification time, followed by totals
//! (count, size, average size, distinct and most common extension).

use anyhow::Result;
use chrono::Local;
use clap::Args;
use filedock_core::api::ListResponse;

use crate::client::FileDockClient;
use crate::output::{format_file_size, get_formatter, FileStatistics, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct ListCommand {
    /// Hide the statistics summary
    #[arg(long)]
    pub no_stats: bool,
}

impl ListCommand {
    pub async fn execute(&self, client: &FileDockClient, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let listing = client.list().await?;
        render_listing(&listing, !self.no_stats, format, &*formatter);
        Ok(())
    }
}

/// Prints a listing; shared with `filedock watch`.
pub fn render_listing(
    listing: &ListResponse,
    with_stats: bool,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) {
    let stats = FileStatistics::from_files(&listing.files);

    if format == OutputFormat::Json {
        let mut value = serde_json::json!({
            "files": listing.files,
            "timestamp": listing.timestamp,
        });
        if with_stats {
            value["statistics"] = serde_json::json!(stats);
        }
        formatter.print_json(&value);
        return;
    }

    if listing.files.is_empty() {
        formatter.info("No files stored");
    } else {
        let width = listing
            .files
            .iter()
            .map(|f| f.name.as_str().len())
            .max()
            .unwrap_or(0)
            .max("NAME".len());

        println!("{:<width$}  {:>12}  MODIFIED", "NAME", "SIZE");
        for file in &listing.files {
            println!(
                "{:<width$}  {:>12}  {}",
                file.name.as_str(),
                format_file_size(file.size),
                file.modified.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            );
        }
    }

    if with_stats {
        println!();
        formatter.info(&format!("Total files:  {}", stats.total_files));
        formatter.info(&format!("Total size:   {}", format_file_size(stats.total_size)));
        formatter.info(&format!(
            "Average size: {}",
            format_file_size(stats.average_size.round() as u64)
        ));
        formatter.info(&format!("File types:   {}", stats.file_types));
        formatter.info(&format!(
            "Most common:  {} ({} files)",
            stats.most_common_type, stats.most_common_count
        ));
    }
}
