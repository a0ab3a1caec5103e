use anyhow::{anyhow, Result};
use std::{future::Future, io};
use tracing::{error, info, warn};

use crate::model::RunResult;
use crate::output::{report_failed, OutputWriter};
use crate::scrape::{collect, ScrapeOptions, SearchSession, SessionLauncher};
use crate::store::RemoteStore;

/// One run: open a session, search every key, then flush what was found.
pub struct Runner<L> {
    launcher: L,
    options: ScrapeOptions,
    output: OutputWriter,
    store: Option<RemoteStore>,
}

impl<L: SessionLauncher> Runner<L> {
    pub fn new(
        launcher: L,
        options: ScrapeOptions,
        output: OutputWriter,
        store: Option<RemoteStore>,
    ) -> Self {
        Self {
            launcher,
            options,
            output,
            store,
        }
    }

    /// Search `keys` and save the result, stopping early on Ctrl-C.
    pub async fn run(&self, keys: Vec<String>) -> Result<RunResult> {
        self.run_until(keys, interrupted()).await
    }

    /// Search `keys` until done or until `cancel` resolves.
    ///
    /// Without keys nothing is launched and the output file is left alone.
    /// Once the session is up, the session is closed and the output flushed
    /// whatever happens in the loop; the loop error wins over a flush error.
    pub async fn run_until<F>(&self, keys: Vec<String>, cancel: F) -> Result<RunResult>
    where
        F: Future<Output = ()>,
    {
        if keys.is_empty() {
            info!("no query keys, nothing to do");
            return Ok(RunResult::default());
        }

        info!(kind = %self.options.kind(), keys = keys.len(), "starting search");
        let mut session = self.launcher.launch().await?;
        let mut result = RunResult::default();

        let scraped = tokio::select! {
            r = collect(&mut session, &keys, &self.options, &mut result) => r,
            _ = cancel => {
                warn!("interrupted, saving what was collected");
                Err(anyhow!("interrupted"))
            }
        };

        let flushed = self.finish(session, &result).await;
        match (scraped, flushed) {
            (Ok(()), Ok(())) => Ok(result),
            (Ok(()), Err(e)) => Err(e),
            (Err(e), flushed) => {
                if let Err(flush) = flushed {
                    error!("failed to save results: {flush:#}");
                }
                Err(e)
            }
        }
    }

    /// Close, write, upload, report: every step runs, the first error is
    /// returned and later ones are logged.
    async fn finish(&self, session: L::Session, result: &RunResult) -> Result<()> {
        if let Err(e) = session.close().await {
            warn!("{e:#}");
        }

        let mut first_error = None;
        let mut keep = |step: Result<()>| {
            if let Err(e) = step {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    error!("{e:#}");
                }
            }
        };

        keep(self.output.write(&result.logos));
        if let Some(store) = &self.store {
            keep(store.insert_all(&result.logos).await.map(|_| ()));
        }
        keep(report_failed(&mut io::stdout().lock(), &result.failed).map_err(Into::into));

        first_error.map_or(Ok(()), Err)
    }
}

async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
