//! Download command - Fetch a stored file

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::client::FileDockClient;
use crate::output::{format_file_size, get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct DownloadCommand {
    /// Name of the stored file
    pub name: String,

    /// Where to write the file (defaults to the file name in the current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl DownloadCommand {
    pub async fn execute(&self, client: &FileDockClient, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let data = client.download(&self.name).await?;
        let target = self.target();
        tokio::fs::write(&target, &data)
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;

        if format == OutputFormat::Json {
            formatter.print_json(&serde_json::json!({
                "name": self.name,
                "path": target.display().to_string(),
                "size": data.len(),
            }));
        } else {
            formatter.success(&format!(
                "Downloaded {} to {} ({})",
                self.name,
                target.display(),
                format_file_size(data.len() as u64)
            ));
        }
        Ok(())
    }

    fn target(&self) -> PathBuf {
        // Only the last path component of the remote name is used locally.
        self.output.clone().unwrap_or_else(|| {
            std::path::Path::new(&self.name)
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("download"))
        })
    }
}
