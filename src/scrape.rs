use anyhow::Result;
use async_trait::async_trait;
use derive_builder::Builder;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::extract::SearchOutcome;
use crate::model::{QueryKind, RunResult};

/// A live search page: type a key, read back what the site rendered.
#[async_trait]
pub trait SearchSession: Send + Sized {
    /// Search for one key.
    ///
    /// Timeouts and unreadable results come back as
    /// [`SearchOutcome::Failed`]; an `Err` means the session itself is broken.
    async fn search(&mut self, key: &str) -> Result<SearchOutcome>;

    async fn close(self) -> Result<()>;
}

#[async_trait]
pub trait SessionLauncher: Sync {
    type Session: SearchSession;

    async fn launch(&self) -> Result<Self::Session>;
}

#[derive(Debug, Clone, Builder)]
pub struct ScrapeOptions {
    #[builder(default)]
    kind: QueryKind,
    /// Pause after each key.
    #[builder(default)]
    settle: Duration,
}

impl ScrapeOptions {
    pub fn kind(&self) -> QueryKind {
        self.kind
    }
}

/// Search every key in order, folding outcomes into `result`.
///
/// `result` is filled as the loop goes, so whatever was collected before an
/// error or a cancellation stays available to the caller.
pub async fn collect<S: SearchSession>(
    session: &mut S,
    keys: &[String],
    options: &ScrapeOptions,
    result: &mut RunResult,
) -> Result<()> {
    let total = keys.len();
    for (i, key) in keys.iter().enumerate() {
        let outcome = session.search(key).await?;
        match &outcome {
            SearchOutcome::NoResults => info!(%key, "no result"),
            SearchOutcome::Failed(reason) => warn!(%key, %reason, "search failed"),
            SearchOutcome::Entries(entries) => {
                for entry in entries.iter().filter(|e| !e.is_usable()) {
                    debug!(
                        %key,
                        name = %entry.name,
                        logo = %entry.logo_url,
                        "skipping incomplete entry"
                    );
                }
            }
        }

        let stored = result.record(key, options.kind, outcome);
        info!(%key, stored, done = i + 1, total, "searched");

        if !options.settle.is_zero() {
            tokio::time::sleep(options.settle).await;
        }
    }
    Ok(())
}
