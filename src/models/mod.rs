// src/models/mod.rs

//! Domain models for the seat watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod course;

// Re-export all public types
pub use config::{
    AvailabilityConfig, CatalogConfig, Config, CrawlerConfig, LoggingConfig, NotifyConfig,
    ScheduleConfig, StorageConfig,
};
pub use course::{CourseRecord, CourseSection, SectionKey, Subscriber, Transition};

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Course detail URLs already handled during one crawl run.
#[derive(Debug, Default)]
pub struct CrawlRun {
    visited: HashSet<String>,
}

impl CrawlRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a URL visited. Returns `false` if it was already visited in this run.
    pub fn visit(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// Statistics for a single crawl run.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStats {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub department_count: usize,
    /// Detail URLs queued after de-duplication
    pub course_url_count: usize,
    pub duplicate_urls: usize,
    pub pages_parsed: usize,
    pub page_failures: usize,
    pub records_seen: usize,
    pub sections_inserted: usize,
    pub sections_updated: usize,
    pub reconcile_failures: usize,
    pub transitions: usize,
    pub notifications_sent: usize,
    pub notification_failures: usize,
}

impl CrawlStats {
    pub fn started(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time: start_time,
            department_count: 0,
            course_url_count: 0,
            duplicate_urls: 0,
            pages_parsed: 0,
            page_failures: 0,
            records_seen: 0,
            sections_inserted: 0,
            sections_updated: 0,
            reconcile_failures: 0,
            transitions: 0,
            notifications_sent: 0,
            notification_failures: 0,
        }
    }
}
