// src/pipeline/mod.rs

//! Pipeline entry points for seat watching.
//!
//! - `run_crawl`: one pass over the catalog, reconciling and notifying
//! - `run_scheduled`: repeat `run_crawl` on a fixed period
//! - `Reconciler`: transactional upsert of one page's sections

pub mod crawl;
pub mod reconcile;
pub mod schedule;

pub use crawl::{CrawlContext, run_crawl};
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use schedule::run_scheduled;
