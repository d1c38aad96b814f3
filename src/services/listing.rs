// src/services/listing.rs

//! Link extraction for the catalog entry page and course listing pages.

use regex::Regex;
use scraper::Html;

use crate::error::Result;
use crate::models::CatalogConfig;
use crate::services::detail::parse_selector;
use crate::utils::{resolve, with_trailing_slash};

/// Contiguous range of listing pages advertised by a pagination control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRange {
    /// URL prefix the page number is appended to
    pub base: String,
    pub first: u32,
    pub last: u32,
}

impl PageRange {
    /// Every listing page URL in order, resolved against `root`.
    pub fn page_urls(&self, root: &str) -> Vec<String> {
        (self.first..=self.last)
            .map(|page| {
                let href = format!("{}{}", self.base, page);
                resolve(root, &href).unwrap_or(href)
            })
            .collect()
    }
}

/// Department course-listing roots linked from the catalog entry page.
///
/// Keeps links under `department_prefix`, rewrites each to its listing root
/// and drops repeats while keeping first-seen order.
pub fn department_roots(html: &str, catalog: &CatalogConfig) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let link_sel = parse_selector(&catalog.department_link_selector)?;

    let mut roots: Vec<String> = Vec::new();
    for href in document
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.starts_with(&catalog.department_prefix))
    {
        let Some(department) = resolve(&catalog.site_root, href) else {
            continue;
        };
        let root = format!("{}{}", with_trailing_slash(&department), catalog.listing_suffix);
        if !roots.contains(&root) {
            roots.push(root);
        }
    }
    Ok(roots)
}

/// Scan the pagination control for the range of listing pages.
///
/// Both bounds start at 1 and widen with every page number found. Returns
/// `None` when no link matches `pattern`, i.e. the listing is not paginated
/// or the control is malformed.
pub fn page_range(html: &str, selector: &str, pattern: &Regex) -> Result<Option<PageRange>> {
    let document = Html::parse_document(html);
    let link_sel = parse_selector(selector)?;

    let mut base: Option<String> = None;
    let mut first = 1;
    let mut last = 1;

    for href in document
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
    {
        let Some(caps) = pattern.captures(href) else {
            continue;
        };
        let (Some(prefix), Some(number)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let Ok(page) = number.as_str().parse::<u32>() else {
            continue;
        };

        first = first.min(page);
        last = last.max(page);
        base = Some(prefix.as_str().to_string());
    }

    Ok(base.map(|base| PageRange { base, first, last }))
}

/// Course detail links on one listing page, in page order.
pub fn course_links(html: &str, catalog: &CatalogConfig) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let link_sel = parse_selector(&catalog.course_link_selector)?;

    let links = document
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.starts_with(&catalog.course_prefix))
        .filter_map(|href| resolve(&catalog.site_root, href))
        .collect();
    Ok(links)
}
