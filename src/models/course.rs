// src/models/course.rs

//! Course section data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Natural key of a course offering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionKey {
    pub code: String,
    pub section: String,
    pub semester: String,
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.code, self.section, self.semester)
    }
}

/// One (section, semester) row parsed from a course detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Course display name, e.g. "Introduction to Computer Science"
    pub name: String,

    /// Course code, e.g. "CAS CS 111"
    pub code: String,

    /// Section label, e.g. "A1"
    pub section: String,

    /// Semester heading the table sat under
    pub semester: String,

    pub instructor: String,
    pub location: String,
    pub schedule: String,

    /// Free-text remark from the source row
    pub notes: String,

    /// Credit count, if the page lists one
    pub credits: Option<u32>,

    /// Undergraduate prerequisites, if the page lists them
    pub prerequisites: Option<String>,

    /// Open seat count inferred from the notes
    pub available: u32,
}

impl CourseRecord {
    /// The (code, section, semester) key of this record.
    pub fn key(&self) -> SectionKey {
        SectionKey {
            code: self.code.clone(),
            section: self.section.clone(),
            semester: self.semester.clone(),
        }
    }

    /// Format the record using a template.
    ///
    /// Supported placeholders: `{code}`, `{section}`, `{semester}`, `{name}`,
    /// `{instructor}`, `{available}`.
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{code}", &self.code)
            .replace("{section}", &self.section)
            .replace("{semester}", &self.semester)
            .replace("{name}", &self.name)
            .replace("{instructor}", &self.instructor)
            .replace("{available}", &self.available.to_string())
    }
}

/// A course section as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSection {
    pub id: i64,

    #[serde(flatten)]
    pub record: CourseRecord,

    /// When a crawl last wrote this row
    pub last_seen: DateTime<Utc>,
}

/// A zero-to-positive availability change detected during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Storage id of the section that changed
    pub course_id: i64,

    /// The record as written
    pub record: CourseRecord,

    pub became_available: bool,
}

/// Someone who can register interest in sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> CourseRecord {
        CourseRecord {
            name: "Introduction to Computer Science".to_string(),
            code: "CAS CS 111".to_string(),
            section: "A1".to_string(),
            semester: "Fall 2024".to_string(),
            instructor: "Smith".to_string(),
            location: "CAS 211".to_string(),
            schedule: "MWF 10:10 am-11:00 am".to_string(),
            notes: "12/20 seats".to_string(),
            credits: Some(4),
            prerequisites: None,
            available: 20,
        }
    }

    #[test]
    fn test_key() {
        let key = sample_record().key();
        assert_eq!(key.code, "CAS CS 111");
        assert_eq!(key.section, "A1");
        assert_eq!(key.semester, "Fall 2024");
        assert_eq!(key.to_string(), "CAS CS 111 A1 (Fall 2024)");
    }

    #[test]
    fn test_format() {
        let record = sample_record();
        let result = record.format("The course {code} {section} is available now!");
        assert_eq!(result, "The course CAS CS 111 A1 is available now!");
    }
}
