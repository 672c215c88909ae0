//! Watch command - Follow changes with long polling
//!
//! Lists the files once, then keeps a poll outstanding with the last seen
//! timestamp. A poll answering `changes: true` triggers a fresh listing; a
//! timed-out poll is simply reissued. Runs until Ctrl-C.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use filedock_core::api::PollResponse;
use tracing::{debug, warn};

use super::list::render_listing;
use crate::client::FileDockClient;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Pause before retrying after a failed request
const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Hide the statistics summary on each refresh
    #[arg(long)]
    pub no_stats: bool,
}

/// What the watch loop should do after a poll answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    /// Re-list, then poll from the listing's timestamp
    Refresh,
    /// Poll again from this timestamp
    Poll(i64),
}

fn next_step(polled: PollResponse) -> Next {
    if polled.changes {
        Next::Refresh
    } else {
        Next::Poll(polled.timestamp)
    }
}

impl WatchCommand {
    pub async fn execute(&self, client: &FileDockClient, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        formatter.info(&format!("Watching {} (Ctrl-C to stop)", client.endpoint()));

        tokio::select! {
            result = self.watch_loop(client, format, &*formatter) => result,
            _ = tokio::signal::ctrl_c() => {
                debug!("Watch interrupted");
                Ok(())
            }
        }
    }

    async fn watch_loop(
        &self,
        client: &FileDockClient,
        format: OutputFormat,
        formatter: &dyn OutputFormatter,
    ) -> Result<()> {
        let mut next = Next::Refresh;

        loop {
            next = match next {
                Next::Refresh => match client.list().await {
                    Ok(listing) => {
                        render_listing(&listing, !self.no_stats, format, formatter);
                        Next::Poll(listing.timestamp)
                    }
                    Err(e) => {
                        warn!(error = %e, "List failed; retrying");
                        tokio::time::sleep(RETRY_DELAY).await;
                        Next::Refresh
                    }
                },
                Next::Poll(since) => match client.poll(since).await {
                    Ok(polled) => next_step(polled),
                    Err(e) => {
                        warn!(error = %e, "Poll failed; retrying");
                        tokio::time::sleep(RETRY_DELAY).await;
                        Next::Poll(since)
                    }
                },
            };
        }
    }
}
