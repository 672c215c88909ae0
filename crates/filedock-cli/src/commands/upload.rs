//! Upload command - Send a local file to the server

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::client::FileDockClient;
use crate::output::{format_file_size, get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct UploadCommand {
    /// Local file to upload
    pub path: PathBuf,

    /// Name to store the file under (defaults to the local file name)
    #[arg(long)]
    pub name: Option<String>,
}

impl UploadCommand {
    pub async fn execute(&self, client: &FileDockClient, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let name = match &self.name {
            Some(name) => name.clone(),
            None => self
                .path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_owned)
                .with_context(|| format!("No usable file name in {}", self.path.display()))?,
        };

        let data = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        let uploaded = client.upload(&name, data).await?;

        if format == OutputFormat::Json {
            formatter.print_json(&serde_json::json!(uploaded));
        } else {
            formatter.success(&format!(
                "Uploaded {} ({})",
                uploaded.file.name,
                format_file_size(uploaded.file.size)
            ));
            if uploaded.file.name.as_str() != name {
                formatter.warn(&format!("Stored as '{}'", uploaded.file.name));
            }
        }
        Ok(())
    }
}
