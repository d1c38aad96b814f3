// src/models/config.rs

//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Catalog location and link recognition rules
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Seat inference settings
    #[serde(default)]
    pub availability: AvailabilityConfig,

    /// Database location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Notification message templates and outbox
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Periodic crawl settings
    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if !(1..=32).contains(&self.crawler.max_concurrent) {
            return Err(AppError::validation(
                "crawler.max_concurrent must be between 1 and 32",
            ));
        }
        url::Url::parse(&self.catalog.entry_url)
            .map_err(|e| AppError::validation(format!("catalog.entry_url: {e}")))?;
        url::Url::parse(&self.catalog.site_root)
            .map_err(|e| AppError::validation(format!("catalog.site_root: {e}")))?;
        if self.catalog.department_prefix.is_empty() || self.catalog.course_prefix.is_empty() {
            return Err(AppError::validation(
                "catalog.department_prefix and catalog.course_prefix must not be empty",
            ));
        }
        let pattern = regex::Regex::new(&self.catalog.pagination_pattern)
            .map_err(|e| AppError::validation(format!("catalog.pagination_pattern: {e}")))?;
        if pattern.captures_len() < 3 {
            return Err(AppError::validation(
                "catalog.pagination_pattern needs a base group and a page number group",
            ));
        }
        if self.availability.hidden_seat_percent > 100 {
            return Err(AppError::validation(
                "availability.hidden_seat_percent must be <= 100",
            ));
        }
        if self.schedule.interval_secs == 0 {
            return Err(AppError::validation("schedule.interval_secs must be > 0"));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay before each request in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent page fetches
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Where the catalog lives and how its links are recognized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Page listing every department catalog
    #[serde(default = "defaults::entry_url")]
    pub entry_url: String,

    /// Origin that relative links are resolved against
    #[serde(default = "defaults::site_root")]
    pub site_root: String,

    /// Path prefix of department links on the entry page
    #[serde(default = "defaults::department_prefix")]
    pub department_prefix: String,

    /// Appended to a department link to reach its course listing
    #[serde(default = "defaults::listing_suffix")]
    pub listing_suffix: String,

    /// Path prefix of course detail links on listing pages
    #[serde(default = "defaults::course_prefix")]
    pub course_prefix: String,

    #[serde(default = "defaults::department_link_selector")]
    pub department_link_selector: String,

    #[serde(default = "defaults::pagination_selector")]
    pub pagination_selector: String,

    /// Regex with a base-URL group and a page-number group
    #[serde(default = "defaults::pagination_pattern")]
    pub pagination_pattern: String,

    #[serde(default = "defaults::course_link_selector")]
    pub course_link_selector: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            entry_url: defaults::entry_url(),
            site_root: defaults::site_root(),
            department_prefix: defaults::department_prefix(),
            listing_suffix: defaults::listing_suffix(),
            course_prefix: defaults::course_prefix(),
            department_link_selector: defaults::department_link_selector(),
            pagination_selector: defaults::pagination_selector(),
            pagination_pattern: defaults::pagination_pattern(),
            course_link_selector: defaults::course_link_selector(),
        }
    }
}

/// Seat inference for rows whose notes hide the real capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityConfig {
    /// Chance (0-100) that a "Full" or blank row is reported as one open seat
    #[serde(default = "defaults::hidden_seat_percent")]
    pub hidden_seat_percent: u8,

    /// Fixed RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            hidden_seat_percent: defaults::hidden_seat_percent(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file
    #[serde(default = "defaults::database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: defaults::database_path(),
        }
    }
}

/// Notification templates.
///
/// Body placeholders: `{code}`, `{section}`, `{semester}`, `{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "defaults::subject")]
    pub subject: String,

    #[serde(default = "defaults::body_template")]
    pub body_template: String,

    /// JSON-lines file picked up by the mail relay
    #[serde(default = "defaults::outbox_path")]
    pub outbox_path: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            subject: defaults::subject(),
            body_template: defaults::body_template(),
            outbox_path: defaults::outbox_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between crawl runs
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when RUST_LOG is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; seatwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        0
    }
    pub fn max_concurrent() -> usize {
        8
    }

    // Catalog defaults
    pub fn entry_url() -> String {
        "https://www.bu.edu/academics/".into()
    }
    pub fn site_root() -> String {
        "https://www.bu.edu".into()
    }
    pub fn department_prefix() -> String {
        "/academics".into()
    }
    pub fn listing_suffix() -> String {
        "courses/".into()
    }
    pub fn course_prefix() -> String {
        "/academics".into()
    }
    pub fn department_link_selector() -> String {
        "a.button".into()
    }
    pub fn pagination_selector() -> String {
        "div.pagination a".into()
    }
    pub fn pagination_pattern() -> String {
        r"(.*/courses/)(\d+)".into()
    }
    pub fn course_link_selector() -> String {
        "ul.course-feed a".into()
    }

    pub fn hidden_seat_percent() -> u8 {
        5
    }

    pub fn database_path() -> String {
        "data/courses.db".into()
    }

    // Notify defaults
    pub fn subject() -> String {
        "Course Available".into()
    }
    pub fn body_template() -> String {
        "The course {code} {section} is available now!".into()
    }
    pub fn outbox_path() -> String {
        "data/outbox.jsonl".into()
    }

    pub fn interval() -> u64 {
        600
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
