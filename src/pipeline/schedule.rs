// src/pipeline/schedule.rs

//! Periodic crawl loop.

use std::future::Future;
use std::pin::pin;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};

use crate::pipeline::crawl::{CrawlContext, run_crawl};

/// Run a crawl every `period` until `shutdown` resolves.
///
/// Runs never overlap: a run that outlasts the period delays the next tick
/// instead of stacking. Shutdown takes effect between runs or by dropping
/// the run in flight. Returns the number of completed runs.
pub async fn run_scheduled(
    ctx: &CrawlContext,
    period: Duration,
    shutdown: impl Future<Output = ()>,
) -> usize {
    let mut shutdown = pin!(shutdown);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut completed = 0;
    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            biased;

            _ = &mut shutdown => {
                log::info!("Shutdown requested, abandoning crawl in progress");
                break;
            }
            stats = run_crawl(ctx) => {
                completed += 1;
                log::info!(
                    "Crawl #{} done: {} transition(s); next in {}s",
                    completed,
                    stats.transitions,
                    period.as_secs()
                );
            }
        }
    }

    log::info!("Scheduler stopped after {} run(s)", completed);
    completed
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::Config;
    use crate::services::LogMailer;
    use crate::storage::SqliteStore;
    use crate::utils::http::testing::StaticFetcher;

    fn context(fetcher: Arc<StaticFetcher>) -> CrawlContext {
        let mut config = Config::default();
        config.catalog.entry_url = "https://catalog.test/academics/".to_string();
        CrawlContext::new(
            Arc::new(config),
            fetcher,
            Arc::new(SqliteStore::in_memory().unwrap()),
            Arc::new(LogMailer),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_until_shutdown() {
        let fetcher = Arc::new(StaticFetcher::new());
        let ctx = context(Arc::clone(&fetcher));

        // Ticks at 0s, 10s and 20s; shutdown at 25s.
        let runs = run_scheduled(
            &ctx,
            Duration::from_secs(10),
            tokio::time::sleep(Duration::from_secs(25)),
        )
        .await;

        assert_eq!(runs, 3);
        assert_eq!(fetcher.hits("https://catalog.test/academics/"), 3);
    }

    #[tokio::test]
    async fn test_immediate_shutdown() {
        let fetcher = Arc::new(StaticFetcher::new());
        let ctx = context(Arc::clone(&fetcher));

        let runs = run_scheduled(&ctx, Duration::from_secs(60), std::future::ready(())).await;

        assert_eq!(runs, 0);
        assert_eq!(fetcher.total_hits(), 0);
    }
}
