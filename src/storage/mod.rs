// src/storage/mod.rs

//! Storage abstractions for course section persistence.
//!
//! The crawl writes only through `CourseStore::transaction`, so each batch
//! of upserts commits or rolls back as a unit. Subscribers and their
//! interests belong to the surrounding application; the crawl only reads them.
//!
//! ## Schema
//!
//! ```text
//! course               one row per (code, section, semester)
//! subscriber           id, email
//! subscriber_course    interest relation (subscriber_id, course_id)
//! ```

pub mod sqlite;

use crate::error::Result;
use crate::models::{CourseRecord, CourseSection, SectionKey, Subscriber};

// Re-export for convenience
pub use sqlite::{SectionQuery, SqliteStore};

/// Operations available inside a storage transaction.
pub trait CourseTx {
    /// Look up a section by its natural key.
    fn find(&mut self, key: &SectionKey) -> Result<Option<CourseSection>>;

    /// Insert a new section, returning its id.
    fn insert(&mut self, record: &CourseRecord) -> Result<i64>;

    /// Overwrite every mutable field of an existing section.
    fn update(&mut self, id: i64, record: &CourseRecord) -> Result<()>;
}

/// Trait for course storage backends.
pub trait CourseStore: Send + Sync {
    /// Run `work` inside one transaction.
    ///
    /// Commits if `work` returns `Ok`, rolls back everything it wrote otherwise.
    fn transaction(&self, work: &mut dyn FnMut(&mut dyn CourseTx) -> Result<()>) -> Result<()>;

    /// Look up a section outside any batch.
    fn find_section(&self, key: &SectionKey) -> Result<Option<CourseSection>>;

    /// Subscribers interested in a section.
    fn interested_subscribers(&self, course_id: i64) -> Result<Vec<Subscriber>>;

    /// Number of stored sections.
    fn section_count(&self) -> Result<usize>;
}
