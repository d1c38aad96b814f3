// src/pipeline/crawl.rs

//! Course crawling pipeline.
//!
//! One run walks the catalog, parses every course page through a bounded
//! worker pool and feeds the parsed batches to a single reconciling consumer.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::models::{Config, CourseRecord, CrawlRun, CrawlStats};
use crate::pipeline::{ReconcileOutcome, Reconciler};
use crate::services::{CatalogCrawler, Mailer, SeatSampler, TransitionNotifier};
use crate::storage::CourseStore;
use crate::utils::http::PageFetcher;
use crate::utils::log::{header, summary};

/// Everything a crawl run needs, wired once and reused across runs.
pub struct CrawlContext {
    pub config: Arc<Config>,
    pub catalog: CatalogCrawler,
    pub store: Arc<dyn CourseStore>,
    pub notifier: TransitionNotifier,
    pub sampler: SeatSampler,
}

impl CrawlContext {
    pub fn new(
        config: Arc<Config>,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn CourseStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self> {
        let catalog = CatalogCrawler::new(fetcher, config.catalog.clone())?;
        let notifier = TransitionNotifier::new(mailer, &config.notify);
        let sampler = SeatSampler::from_config(&config.availability);
        Ok(Self {
            config,
            catalog,
            store,
            notifier,
            sampler,
        })
    }
}

/// Run one full crawl.
///
/// Failures are isolated: a bad page costs that page, a failed reconcile
/// costs that batch, a failed delivery costs that recipient. The run itself
/// always completes and reports what happened.
pub async fn run_crawl(ctx: &CrawlContext) -> CrawlStats {
    let mut stats = CrawlStats::started(Utc::now());
    header("Course crawl starting");

    let roots = ctx.catalog.department_roots().await;
    stats.department_count = roots.len();
    log::info!("Found {} department listing(s)", roots.len());

    let concurrency = ctx.config.crawler.max_concurrent.max(1);

    // Stage 1: resolve course URLs per department, keeping department order.
    let mut run = CrawlRun::new();
    let mut queue = Vec::new();
    let mut listings = stream::iter(roots.iter())
        .map(|root| ctx.catalog.course_urls(root))
        .buffered(concurrency);

    while let Some(urls) = listings.next().await {
        for url in urls {
            if run.visit(&url) {
                queue.push(url);
            } else {
                stats.duplicate_urls += 1;
                log::debug!("Already queued in this run: {}", url);
            }
        }
    }
    stats.course_url_count = queue.len();
    log::info!(
        "Queued {} course page(s), {} duplicate link(s) skipped",
        queue.len(),
        stats.duplicate_urls
    );

    // Stage 2: fetch and parse concurrently, reconcile one page at a time.
    let mut pages = stream::iter(queue)
        .map(|url| async move {
            let result = ctx.catalog.course_records(&url, &ctx.sampler).await;
            (url, result)
        })
        .buffer_unordered(concurrency);

    while let Some((url, result)) = pages.next().await {
        let records = match result {
            Ok(records) => {
                stats.pages_parsed += 1;
                records
            }
            Err(e) => {
                stats.page_failures += 1;
                log::warn!("Skipping course page {}: {}", url, e);
                continue;
            }
        };

        stats.records_seen += records.len();
        if records.is_empty() {
            continue;
        }

        let outcome = match reconcile_page(Arc::clone(&ctx.store), records).await {
            Ok(outcome) => outcome,
            Err(e) => {
                stats.reconcile_failures += 1;
                log::error!("Failed to store sections from {}: {}", url, e);
                continue;
            }
        };
        stats.sections_inserted += outcome.inserted;
        stats.sections_updated += outcome.updated;
        stats.transitions += outcome.transitions.len();

        for transition in &outcome.transitions {
            let delivered = ctx.notifier.notify(&ctx.store, transition).await;
            stats.notifications_sent += delivered.sent;
            stats.notification_failures += delivered.failed;
        }
    }

    stats.end_time = Utc::now();
    log_summary(&stats);
    stats
}

/// Reconcile one page's batch on the blocking pool.
///
/// Dropping the returned future does not abort the batch: the blocking task
/// still commits or rolls back as a whole.
async fn reconcile_page(
    store: Arc<dyn CourseStore>,
    records: Vec<CourseRecord>,
) -> Result<ReconcileOutcome> {
    tokio::task::spawn_blocking(move || Reconciler::new(store.as_ref()).reconcile(&records))
        .await?
}

fn log_summary(stats: &CrawlStats) {
    let elapsed = stats.end_time - stats.start_time;
    summary(
        "Course crawl finished",
        &[
            ("departments", stats.department_count.to_string()),
            ("course pages", stats.course_url_count.to_string()),
            ("duplicates skipped", stats.duplicate_urls.to_string()),
            ("pages parsed", stats.pages_parsed.to_string()),
            ("page failures", stats.page_failures.to_string()),
            ("sections seen", stats.records_seen.to_string()),
            ("inserted", stats.sections_inserted.to_string()),
            ("updated", stats.sections_updated.to_string()),
            ("reconcile failures", stats.reconcile_failures.to_string()),
            ("transitions", stats.transitions.to_string()),
            ("notified", stats.notifications_sent.to_string()),
            ("notify failures", stats.notification_failures.to_string()),
            ("elapsed", format!("{} ms", elapsed.num_milliseconds())),
        ],
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::AppError;
    use crate::models::{CatalogConfig, CourseSection, SectionKey, Subscriber};
    use crate::services::MailMessage;
    use crate::storage::{CourseTx, SqliteStore};
    use crate::utils::http::testing::StaticFetcher;

    const ENTRY: &str = "https://catalog.test/academics/";
    const CAS: &str = "https://catalog.test/academics/cas/courses/";
    const ENG: &str = "https://catalog.test/academics/eng/courses/";

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<MailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &MailMessage) -> Result<()> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn config() -> Arc<Config> {
        let mut config = Config::default();
        config.catalog = CatalogConfig {
            entry_url: ENTRY.to_string(),
            site_root: "https://catalog.test".to_string(),
            ..CatalogConfig::default()
        };
        config.crawler.max_concurrent = 2;
        config.availability.hidden_seat_percent = 0;
        config.availability.seed = Some(7);
        Arc::new(config)
    }

    fn listing(slugs: &[&str]) -> String {
        let items: String = slugs
            .iter()
            .map(|href| format!(r#"<li><a href="{href}">course</a></li>"#))
            .collect();
        format!(r#"<html><body><ul class="course-feed">{items}</ul></body></html>"#)
    }

    fn detail(code: &str, notes: &str) -> String {
        format!(
            r#"<html><body><div class="main">
                 <h1>Course {code}</h1><h2>{code}</h2>
                 <div id="info-box"><dl><dt>Credits:</dt><dd>4</dd></dl></div>
                 <h4>Fall 2024</h4>
                 <table>
                   <tr><th>Section</th><th>Instructor</th><th>Location</th><th>Schedule</th><th>Notes</th></tr>
                   <tr><td>A1</td><td>Smith</td><td>CAS 211</td><td>MWF</td><td>{notes}</td></tr>
                 </table>
               </div></body></html>"#
        )
    }

    /// Two departments; CAS lists three courses, ENG repeats one of them.
    fn catalog_site(cs112_notes: &str) -> StaticFetcher {
        StaticFetcher::new()
            .page(
                ENTRY,
                r#"<a class="button" href="/academics/cas/">CAS</a>
                   <a class="button" href="/academics/eng/">ENG</a>"#,
            )
            .page(
                CAS,
                listing(&[
                    "/academics/cas/courses/cs-111/",
                    "/academics/cas/courses/cs-112/",
                    "/academics/cas/courses/cs-210/",
                ]),
            )
            .page(ENG, listing(&["/academics/cas/courses/cs-111/"]))
            .page(&format!("{CAS}cs-111/"), detail("CAS CS 111", "12/20 seats"))
            .page(&format!("{CAS}cs-112/"), detail("CAS CS 112", cs112_notes))
            .page(&format!("{CAS}cs-210/"), detail("CAS CS 210", "3/40"))
    }

    fn context(
        fetcher: Arc<StaticFetcher>,
        store: Arc<SqliteStore>,
        mailer: Arc<RecordingMailer>,
    ) -> CrawlContext {
        CrawlContext::new(config(), fetcher, store, mailer).unwrap()
    }

    #[tokio::test]
    async fn test_run_crawl_stores_every_section() {
        let fetcher = Arc::new(catalog_site("0/25"));
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let ctx = context(Arc::clone(&fetcher), Arc::clone(&store), Arc::default());

        let stats = run_crawl(&ctx).await;

        assert_eq!(stats.department_count, 2);
        assert_eq!(stats.course_url_count, 3);
        assert_eq!(stats.duplicate_urls, 1);
        assert_eq!(stats.pages_parsed, 3);
        assert_eq!(stats.sections_inserted, 3);
        assert_eq!(stats.transitions, 0);
        assert_eq!(store.section_count().unwrap(), 3);
        assert_eq!(fetcher.hits(&format!("{CAS}cs-111/")), 1);
    }

    #[tokio::test]
    async fn test_failing_page_does_not_stop_the_run() {
        // cs-112 is not served, so its fetch fails with a 404.
        let fetcher = Arc::new(
            StaticFetcher::new()
                .page(ENTRY, r#"<a class="button" href="/academics/cas/">CAS</a>"#)
                .page(
                    CAS,
                    listing(&[
                        "/academics/cas/courses/cs-111/",
                        "/academics/cas/courses/cs-112/",
                        "/academics/cas/courses/cs-210/",
                    ]),
                )
                .page(&format!("{CAS}cs-111/"), detail("CAS CS 111", "12/20"))
                .page(&format!("{CAS}cs-210/"), detail("CAS CS 210", "3/40")),
        );
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let ctx = context(fetcher, Arc::clone(&store), Arc::default());

        let stats = run_crawl(&ctx).await;

        // The failed URL was still queued and marked visited.
        assert_eq!(stats.course_url_count, 3);
        assert_eq!(stats.pages_parsed, 2);
        assert_eq!(stats.page_failures, 1);
        assert_eq!(store.section_count().unwrap(), 2);
    }

    /// Store that refuses to insert sections of one course.
    struct RejectingStore {
        inner: SqliteStore,
        code: String,
    }

    struct RejectingTx<'a> {
        inner: &'a mut dyn CourseTx,
        code: &'a str,
    }

    impl CourseTx for RejectingTx<'_> {
        fn find(&mut self, key: &SectionKey) -> Result<Option<CourseSection>> {
            self.inner.find(key)
        }

        fn insert(&mut self, record: &CourseRecord) -> Result<i64> {
            if record.code == self.code {
                return Err(AppError::validation("database is locked"));
            }
            self.inner.insert(record)
        }

        fn update(&mut self, id: i64, record: &CourseRecord) -> Result<()> {
            self.inner.update(id, record)
        }
    }

    impl CourseStore for RejectingStore {
        fn transaction(
            &self,
            work: &mut dyn FnMut(&mut dyn CourseTx) -> Result<()>,
        ) -> Result<()> {
            self.inner.transaction(&mut |tx: &mut dyn CourseTx| {
                let mut rejecting = RejectingTx {
                    inner: tx,
                    code: &self.code,
                };
                work(&mut rejecting)
            })
        }

        fn find_section(&self, key: &SectionKey) -> Result<Option<CourseSection>> {
            self.inner.find_section(key)
        }

        fn interested_subscribers(&self, course_id: i64) -> Result<Vec<Subscriber>> {
            self.inner.interested_subscribers(course_id)
        }

        fn section_count(&self) -> Result<usize> {
            self.inner.section_count()
        }
    }

    #[tokio::test]
    async fn test_failed_reconcile_does_not_stop_the_run() {
        let store = Arc::new(RejectingStore {
            inner: SqliteStore::in_memory().unwrap(),
            code: "CAS CS 112".to_string(),
        });
        let ctx = CrawlContext::new(
            config(),
            Arc::new(catalog_site("4/25")),
            Arc::clone(&store) as Arc<dyn CourseStore>,
            Arc::new(RecordingMailer::default()),
        )
        .unwrap();

        let stats = run_crawl(&ctx).await;

        assert_eq!(stats.pages_parsed, 3);
        assert_eq!(stats.reconcile_failures, 1);
        assert_eq!(stats.sections_inserted, 2);
        assert_eq!(store.section_count().unwrap(), 2);
        let rejected = SectionKey {
            code: "CAS CS 112".to_string(),
            section: "A1".to_string(),
            semester: "Fall 2024".to_string(),
        };
        assert!(store.find_section(&rejected).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_opening_section_notifies_subscribers() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mailer = Arc::new(RecordingMailer::default());

        let first = context(
            Arc::new(catalog_site("0/25")),
            Arc::clone(&store),
            Arc::clone(&mailer),
        );
        run_crawl(&first).await;

        let cs112 = store
            .search_sections(&crate::storage::SectionQuery {
                code: Some("CS 112".to_string()),
                ..Default::default()
            })
            .unwrap()
            .remove(0);
        assert_eq!(cs112.record.available, 25);

        // Seats are the ratio's total, so "0/25" already counts as open.
        // Close the section, then reopen it.
        let closed = context(
            Arc::new(catalog_site("closed")),
            Arc::clone(&store),
            Arc::clone(&mailer),
        );
        run_crawl(&closed).await;
        let subscriber = store.add_subscriber("student@example.com").unwrap();
        store.add_interest(subscriber.id, cs112.id).unwrap();

        let reopened = context(
            Arc::new(catalog_site("5/25")),
            Arc::clone(&store),
            Arc::clone(&mailer),
        );
        let stats = run_crawl(&reopened).await;

        assert_eq!(stats.transitions, 1);
        assert_eq!(stats.notifications_sent, 1);
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "student@example.com");
        assert_eq!(sent[0].body, "The course CAS CS 112 A1 is available now!");
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_an_empty_run() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let ctx = context(Arc::new(StaticFetcher::new()), Arc::clone(&store), Arc::default());

        let stats = run_crawl(&ctx).await;

        assert_eq!(stats.department_count, 0);
        assert_eq!(stats.course_url_count, 0);
        assert_eq!(store.section_count().unwrap(), 0);
    }
}
