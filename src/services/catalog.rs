// src/services/catalog.rs

//! Catalog crawler service.
//!
//! Walks the catalog from the entry page down to course detail pages:
//! entry page → department listing roots → paginated listings → detail URLs.
//! Every fetch failure here is best effort and only costs the page involved.

use std::sync::Arc;

use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{CatalogConfig, CourseRecord};
use crate::services::listing::{self, PageRange};
use crate::services::{SeatSampler, parse_course_detail};
use crate::utils::http::PageFetcher;

/// Service for discovering and reading course pages.
pub struct CatalogCrawler {
    fetcher: Arc<dyn PageFetcher>,
    catalog: CatalogConfig,
    pagination: Regex,
}

impl CatalogCrawler {
    /// Create a crawler for the configured catalog.
    pub fn new(fetcher: Arc<dyn PageFetcher>, catalog: CatalogConfig) -> Result<Self> {
        let pagination = Regex::new(&catalog.pagination_pattern)
            .map_err(|e| AppError::config(format!("invalid pagination pattern: {e}")))?;
        Ok(Self {
            fetcher,
            catalog,
            pagination,
        })
    }

    /// Listing roots of every department on the entry page.
    ///
    /// A failed fetch yields no roots for this run.
    pub async fn department_roots(&self) -> Vec<String> {
        let url = &self.catalog.entry_url;
        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                log::warn!("Failed to fetch catalog index {}: {}", url, e);
                return Vec::new();
            }
        };

        listing::department_roots(&html, &self.catalog).unwrap_or_else(|e| {
            log::warn!("Failed to read department links on {}: {}", url, e);
            Vec::new()
        })
    }

    /// Every course detail URL reachable from a department listing root.
    ///
    /// Pages are visited in order and links keep their on-page order. Without
    /// a usable pagination control the root page is the only listing page.
    pub async fn course_urls(&self, root: &str) -> Vec<String> {
        let html = match self.fetcher.fetch(root).await {
            Ok(html) => html,
            Err(e) => {
                log::warn!("Failed to fetch department listing {}: {}", root, e);
                return Vec::new();
            }
        };

        let Some(range) = self.page_range(root, &html) else {
            return self.links_on(root, &html);
        };

        let mut urls = Vec::new();
        for page_url in range.page_urls(root) {
            match self.fetcher.fetch(&page_url).await {
                Ok(body) => urls.extend(self.links_on(&page_url, &body)),
                Err(e) => log::warn!("Failed to fetch listing page {}: {}", page_url, e),
            }
        }

        log::debug!(
            "{}: pages {}..={} gave {} course links",
            root,
            range.first,
            range.last,
            urls.len()
        );
        urls
    }

    /// Fetch and parse one course detail page.
    pub async fn course_records(
        &self,
        url: &str,
        sampler: &SeatSampler,
    ) -> Result<Vec<CourseRecord>> {
        let html = self.fetcher.fetch(url).await?;
        parse_course_detail(&html, sampler).map_err(|e| match e {
            AppError::Parse { message, .. } => AppError::parse(url, message),
            other => other,
        })
    }

    fn page_range(&self, root: &str, html: &str) -> Option<PageRange> {
        listing::page_range(html, &self.catalog.pagination_selector, &self.pagination)
            .unwrap_or_else(|e| {
                log::warn!("Ignoring pagination on {}: {}", root, e);
                None
            })
    }

    fn links_on(&self, page_url: &str, html: &str) -> Vec<String> {
        listing::course_links(html, &self.catalog).unwrap_or_else(|e| {
            log::warn!("Failed to read course links on {}: {}", page_url, e);
            Vec::new()
        })
    }
}
