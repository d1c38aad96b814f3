// src/storage/sqlite.rs

//! SQLite storage implementation.
//!
//! One connection guarded by a mutex. All crawl writes go through
//! `CourseStore::transaction`; the remaining methods serve the surrounding
//! application (search, subscribers, interests).

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use crate::error::{AppError, Result};
use crate::models::{CourseRecord, CourseSection, SectionKey, Subscriber};
use crate::storage::{CourseStore, CourseTx};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS course (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        code          TEXT    NOT NULL,
        name          TEXT    NOT NULL,
        section       TEXT    NOT NULL,
        semester      TEXT    NOT NULL,
        instructor    TEXT    NOT NULL DEFAULT '',
        location      TEXT    NOT NULL DEFAULT '',
        schedule      TEXT    NOT NULL DEFAULT '',
        notes         TEXT    NOT NULL DEFAULT '',
        credits       INTEGER,
        prerequisites TEXT,
        available     INTEGER NOT NULL DEFAULT 0,
        last_seen     TEXT    NOT NULL,
        CONSTRAINT code_section_semester_uc UNIQUE (code, section, semester)
    );
    CREATE INDEX IF NOT EXISTS course_name_idx ON course (name);
    CREATE INDEX IF NOT EXISTS course_instructor_idx ON course (instructor);

    CREATE TABLE IF NOT EXISTS subscriber (
        id    INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS subscriber_course (
        subscriber_id INTEGER NOT NULL REFERENCES subscriber (id) ON DELETE CASCADE,
        course_id     INTEGER NOT NULL REFERENCES course (id) ON DELETE CASCADE,
        PRIMARY KEY (subscriber_id, course_id)
    );
";

const SECTION_COLUMNS: &str = "course.id, course.code, course.name, course.section, \
     course.semester, course.instructor, course.location, course.schedule, course.notes, \
     course.credits, course.prerequisites, course.available, course.last_seen";

const SECTION_ORDER: &str = "ORDER BY course.code, course.semester, course.section";

/// Substring filters for section search; set fields are OR-ed together.
#[derive(Debug, Clone, Default)]
pub struct SectionQuery {
    pub code: Option<String>,
    pub name: Option<String>,
    pub instructor: Option<String>,
}

/// SQLite-backed course store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::bootstrap(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // A panic mid-transaction drops the rusqlite Transaction, which rolls
    // back, so a poisoned connection is still consistent.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Case-insensitive substring search; an empty query lists everything.
    pub fn search_sections(&self, query: &SectionQuery) -> Result<Vec<CourseSection>> {
        let filters = [
            ("course.code", &query.code),
            ("course.name", &query.name),
            ("course.instructor", &query.instructor),
        ];

        let mut conditions = Vec::new();
        let mut values = Vec::new();
        for (column, value) in filters {
            let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
                continue;
            };
            values.push(like_pattern(value));
            conditions.push(format!("{column} LIKE ?{} ESCAPE '\\'", values.len()));
        }

        let mut sql = format!("SELECT {SECTION_COLUMNS} FROM course");
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" OR "));
        }
        sql.push(' ');
        sql.push_str(SECTION_ORDER);

        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let sections = stmt
            .query_map(params_from_iter(values.iter()), map_section)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sections)
    }

    /// Register a subscriber, or return the existing one for this email.
    pub fn add_subscriber(&self, email: &str) -> Result<Subscriber> {
        let email = email.trim();
        if !email.contains('@') {
            return Err(AppError::validation(format!(
                "invalid email address: {email:?}"
            )));
        }

        let conn = self.lock();
        conn.execute(
            "INSERT INTO subscriber (email) VALUES (?1) ON CONFLICT (email) DO NOTHING",
            params![email],
        )?;
        let id = conn.query_row(
            "SELECT id FROM subscriber WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        Ok(Subscriber {
            id,
            email: email.to_string(),
        })
    }

    pub fn find_subscriber(&self, email: &str) -> Result<Option<Subscriber>> {
        let conn = self.lock();
        let subscriber = conn
            .query_row(
                "SELECT id, email FROM subscriber WHERE email = ?1",
                params![email.trim()],
                map_subscriber,
            )
            .optional()?;
        Ok(subscriber)
    }

    /// Record interest in a section. Returns `false` if it was already recorded.
    pub fn add_interest(&self, subscriber_id: i64, course_id: i64) -> Result<bool> {
        let conn = self.lock();
        if !exists(&conn, "subscriber", subscriber_id)? {
            return Err(AppError::validation(format!(
                "no subscriber with id {subscriber_id}"
            )));
        }
        if !exists(&conn, "course", course_id)? {
            return Err(AppError::validation(format!("no course with id {course_id}")));
        }

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO subscriber_course (subscriber_id, course_id) VALUES (?1, ?2)",
            params![subscriber_id, course_id],
        )?;
        Ok(inserted == 1)
    }

    /// Drop interest in a section. Returns `false` if there was none.
    pub fn remove_interest(&self, subscriber_id: i64, course_id: i64) -> Result<bool> {
        let conn = self.lock();
        let removed = conn.execute(
            "DELETE FROM subscriber_course WHERE subscriber_id = ?1 AND course_id = ?2",
            params![subscriber_id, course_id],
        )?;
        Ok(removed > 0)
    }

    /// Sections a subscriber follows, optionally only those with open seats.
    pub fn subscriber_sections(
        &self,
        subscriber_id: i64,
        only_available: bool,
    ) -> Result<Vec<CourseSection>> {
        let filter = if only_available {
            " AND course.available > 0"
        } else {
            ""
        };
        let sql = format!(
            "SELECT {SECTION_COLUMNS} FROM course \
             JOIN subscriber_course ON subscriber_course.course_id = course.id \
             WHERE subscriber_course.subscriber_id = ?1{filter} {SECTION_ORDER}"
        );

        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let sections = stmt
            .query_map(params![subscriber_id], map_section)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sections)
    }
}

impl CourseStore for SqliteStore {
    fn transaction(&self, work: &mut dyn FnMut(&mut dyn CourseTx) -> Result<()>) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let mut handle = SqliteTx {
            conn: &tx,
            seen: Utc::now(),
        };
        // Returning early drops `tx`, which rolls back.
        work(&mut handle)?;

        tx.commit()?;
        Ok(())
    }

    fn find_section(&self, key: &SectionKey) -> Result<Option<CourseSection>> {
        find_by_key(&self.lock(), key)
    }

    fn interested_subscribers(&self, course_id: i64) -> Result<Vec<Subscriber>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT subscriber.id, subscriber.email FROM subscriber \
             JOIN subscriber_course ON subscriber_course.subscriber_id = subscriber.id \
             WHERE subscriber_course.course_id = ?1 ORDER BY subscriber.id",
        )?;
        let subscribers = stmt
            .query_map(params![course_id], map_subscriber)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(subscribers)
    }

    fn section_count(&self) -> Result<usize> {
        let count: i64 = self
            .lock()
            .query_row("SELECT COUNT(*) FROM course", [], |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| AppError::validation(format!("section count {count} out of range")))
    }
}

/// Transaction handle; every write in one batch shares the same timestamp.
struct SqliteTx<'a> {
    conn: &'a Connection,
    seen: DateTime<Utc>,
}

impl CourseTx for SqliteTx<'_> {
    fn find(&mut self, key: &SectionKey) -> Result<Option<CourseSection>> {
        find_by_key(self.conn, key)
    }

    fn insert(&mut self, record: &CourseRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO course (code, name, section, semester, instructor, location, schedule, \
             notes, credits, prerequisites, available, last_seen) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.code,
                record.name,
                record.section,
                record.semester,
                record.instructor,
                record.location,
                record.schedule,
                record.notes,
                record.credits,
                record.prerequisites,
                record.available,
                self.seen,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&mut self, id: i64, record: &CourseRecord) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE course SET name = ?2, instructor = ?3, location = ?4, schedule = ?5, \
             notes = ?6, credits = ?7, prerequisites = ?8, available = ?9, last_seen = ?10 \
             WHERE id = ?1",
            params![
                id,
                record.name,
                record.instructor,
                record.location,
                record.schedule,
                record.notes,
                record.credits,
                record.prerequisites,
                record.available,
                self.seen,
            ],
        )?;
        if changed == 0 {
            return Err(AppError::validation(format!("no course with id {id}")));
        }
        Ok(())
    }
}

fn find_by_key(conn: &Connection, key: &SectionKey) -> Result<Option<CourseSection>> {
    let sql = format!(
        "SELECT {SECTION_COLUMNS} FROM course \
         WHERE course.code = ?1 AND course.section = ?2 AND course.semester = ?3"
    );
    let section = conn
        .query_row(
            &sql,
            params![key.code, key.section, key.semester],
            map_section,
        )
        .optional()?;
    Ok(section)
}

/// Substring pattern with `LIKE` wildcards in the input taken literally.
fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn exists(conn: &Connection, table: &str, id: i64) -> Result<bool> {
    let sql = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = ?1)");
    Ok(conn.query_row(&sql, params![id], |row| row.get(0))?)
}

fn map_section(row: &Row<'_>) -> rusqlite::Result<CourseSection> {
    Ok(CourseSection {
        id: row.get(0)?,
        record: CourseRecord {
            code: row.get(1)?,
            name: row.get(2)?,
            section: row.get(3)?,
            semester: row.get(4)?,
            instructor: row.get(5)?,
            location: row.get(6)?,
            schedule: row.get(7)?,
            notes: row.get(8)?,
            credits: row.get(9)?,
            prerequisites: row.get(10)?,
            available: row.get(11)?,
        },
        last_seen: row.get(12)?,
    })
}

fn map_subscriber(row: &Row<'_>) -> rusqlite::Result<Subscriber> {
    Ok(Subscriber {
        id: row.get(0)?,
        email: row.get(1)?,
    })
}
