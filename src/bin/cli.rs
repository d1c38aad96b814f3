//! Seat watcher CLI
//!
//! Local execution entry point: one-off crawls, the periodic watcher and
//! subscriber management against the local database.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use seatwatch::{
    error::{AppError, Result},
    models::{Config, CourseSection},
    pipeline::{self, CrawlContext},
    services::{LogMailer, Mailer, OutboxMailer},
    storage::{CourseStore, SectionQuery, SqliteStore},
    utils::http::HttpFetcher,
};

/// seatwatch - University Course Seat Watcher
#[derive(Parser, Debug)]
#[command(
    name = "seatwatch",
    version,
    about = "Watches a course catalog and reports sections that open up"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Database file (overrides storage.database_path)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log notifications instead of writing them to the outbox
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the catalog once
    Crawl,

    /// Crawl periodically until interrupted
    Watch {
        /// Seconds between runs (default: schedule.interval_secs)
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Search stored sections
    Search {
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        instructor: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Follow a section by its id
    Subscribe {
        #[arg(long)]
        email: String,
        #[arg(long)]
        course_id: i64,
    },

    /// Stop following a section
    Unsubscribe {
        #[arg(long)]
        email: String,
        #[arg(long)]
        course_id: i64,
    },

    /// List the sections a subscriber follows
    Interests {
        #[arg(long)]
        email: String,
        /// Only sections with open seats
        #[arg(long)]
        available: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show configuration and database info
    Info,
}

/// Initialize logging from the configured level unless verbose is set.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn load_config(path: &Path, verbose: bool) -> Config {
    // Parse before the logger exists, report after.
    let loaded = if path.exists() {
        Some(Config::load(path))
    } else {
        None
    };
    let config = match &loaded {
        Some(Ok(config)) => config.clone(),
        _ => Config::default(),
    };
    init_logging(verbose, &config.logging.level);

    match loaded {
        Some(Ok(_)) => log::info!("Loaded configuration from {}", path.display()),
        Some(Err(e)) => log::warn!("Ignoring {}: {}; using defaults", path.display(), e),
        None => log::info!("No config at {}, using defaults", path.display()),
    }
    config
}

fn print_sections(sections: &[CourseSection]) {
    if sections.is_empty() {
        println!("No sections found.");
        return;
    }
    println!(
        "{:>6}  {:<14} {:<6} {:<14} {:>5}  {}",
        "ID", "CODE", "SECT", "SEMESTER", "SEATS", "INSTRUCTOR"
    );
    for s in sections {
        println!(
            "{:>6}  {:<14} {:<6} {:<14} {:>5}  {}",
            s.id,
            s.record.code,
            s.record.section,
            s.record.semester,
            s.record.available,
            s.record.instructor
        );
    }
}

/// Wire the live fetcher, database and mailer for crawling.
fn crawl_context(config: Config, database: &Path, dry_run: bool) -> Result<CrawlContext> {
    config.validate()?;

    let store = Arc::new(SqliteStore::open(database)?);
    let fetcher = Arc::new(HttpFetcher::new(&config.crawler)?);
    let mailer: Arc<dyn Mailer> = if dry_run {
        Arc::new(LogMailer)
    } else {
        Arc::new(OutboxMailer::new(&config.notify.outbox_path))
    };

    CrawlContext::new(Arc::new(config), fetcher, store, mailer)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Ctrl-C received");
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config, cli.verbose);

    let database = cli
        .database
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.storage.database_path));

    match cli.command {
        Command::Crawl => {
            let ctx = crawl_context(config, &database, cli.dry_run)?;
            pipeline::run_crawl(&ctx).await;
            log::info!("Crawl complete!");
        }

        Command::Watch { interval_secs } => {
            let secs = interval_secs.unwrap_or(config.schedule.interval_secs);
            if secs == 0 {
                return Err(AppError::validation("--interval-secs must be > 0"));
            }

            let ctx = crawl_context(config, &database, cli.dry_run)?;
            log::info!("Watching every {}s, Ctrl-C to stop", secs);
            pipeline::run_scheduled(&ctx, Duration::from_secs(secs), shutdown_signal()).await;
        }

        Command::Search {
            code,
            name,
            instructor,
            json,
        } => {
            let store = SqliteStore::open(&database)?;
            let sections = store.search_sections(&SectionQuery {
                code,
                name,
                instructor,
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&sections)?);
            } else {
                print_sections(&sections);
            }
        }

        Command::Subscribe { email, course_id } => {
            let store = SqliteStore::open(&database)?;
            let subscriber = store.add_subscriber(&email)?;
            if store.add_interest(subscriber.id, course_id)? {
                log::info!("{} now follows course {}", subscriber.email, course_id);
            } else {
                log::info!("{} already follows course {}", subscriber.email, course_id);
            }
        }

        Command::Unsubscribe { email, course_id } => {
            let store = SqliteStore::open(&database)?;
            let subscriber = store
                .find_subscriber(&email)?
                .ok_or_else(|| AppError::validation(format!("unknown subscriber {email}")))?;
            if store.remove_interest(subscriber.id, course_id)? {
                log::info!("{} no longer follows course {}", subscriber.email, course_id);
            } else {
                log::warn!("{} did not follow course {}", subscriber.email, course_id);
            }
        }

        Command::Interests { email, available } => {
            let store = SqliteStore::open(&database)?;
            let sections = match store.find_subscriber(&email)? {
                Some(subscriber) => store.subscriber_sections(subscriber.id, available)?,
                None => Vec::new(),
            };
            print_sections(&sections);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }

        Command::Info => {
            log::info!("Config file: {}", cli.config.display());
            log::info!("Catalog entry: {}", config.catalog.entry_url);
            log::info!("Crawl interval: {}s", config.schedule.interval_secs);
            log::info!("Outbox: {}", config.notify.outbox_path);
            log::info!("Database: {}", database.display());

            if database.exists() {
                let store = SqliteStore::open(&database)?;
                log::info!("Stored sections: {}", store.section_count()?);
            } else {
                log::info!("No database yet.");
            }
        }
    }

    Ok(())
}
