//! Delete command - Remove a stored file

use anyhow::Result;
use clap::Args;

use crate::client::FileDockClient;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Name of the stored file
    pub name: String,
}

impl DeleteCommand {
    pub async fn execute(&self, client: &FileDockClient, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let deleted = client.delete(&self.name).await?;

        if format == OutputFormat::Json {
            formatter.print_json(&serde_json::json!(deleted));
        } else {
            formatter.success(&format!("Deleted {}", self.name));
        }
        Ok(())
    }
}
