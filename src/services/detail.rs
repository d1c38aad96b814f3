// src/services/detail.rs

//! Course detail page parser.
//!
//! A detail page carries course-level metadata once (name, code, credits,
//! prerequisites) followed by one enrollment table per semester. Each table
//! row becomes one `CourseRecord`.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::CourseRecord;
use crate::services::SeatSampler;

/// Semester label for tables with no preceding heading.
pub const UNKNOWN_SEMESTER: &str = "Unknown Semester";

const CREDITS_LABEL: &str = "Credits:";
const PREREQUISITES_LABEL: &str = "Undergraduate Prerequisites:";

/// Cells per enrollment row: section, instructor, location, schedule, notes.
const ROW_CELLS: usize = 5;

/// Course-level fields shared by every row of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CourseHeader {
    name: String,
    code: String,
    credits: Option<u32>,
    prerequisites: Option<String>,
}

/// Parse a course detail page into one record per (section, semester) row.
///
/// Fails with `AppError::Parse` when the info box, the main container or its
/// `h1`/`h2` pair is missing.
pub fn parse_course_detail(html: &str, sampler: &SeatSampler) -> Result<Vec<CourseRecord>> {
    let document = Html::parse_document(html);
    let header = parse_header(&document)?;

    let anchor_sel = parse_selector("h4, table")?;
    let row_sel = parse_selector("tr")?;
    let cell_sel = parse_selector("td")?;

    let mut records = Vec::new();
    let mut semester: Option<String> = None;

    // Document order: every table takes the latest h4 seen before it.
    for element in document.select(&anchor_sel) {
        if element.value().name() == "h4" {
            semester = Some(element_text(element));
            continue;
        }

        let semester = semester.as_deref().unwrap_or(UNKNOWN_SEMESTER);
        for row in element.select(&row_sel).skip(1) {
            let cells: Vec<String> = row.select(&cell_sel).map(element_text).collect();
            if cells.len() < ROW_CELLS {
                log::debug!(
                    "Skipping row with {} cells in {} ({})",
                    cells.len(),
                    header.code,
                    semester
                );
                continue;
            }
            records.push(build_record(&header, semester, &cells, sampler));
        }
    }

    Ok(records)
}

fn build_record(
    header: &CourseHeader,
    semester: &str,
    cells: &[String],
    sampler: &SeatSampler,
) -> CourseRecord {
    let notes = cells[4].clone();
    let available = sampler.infer(&notes);

    CourseRecord {
        name: header.name.clone(),
        code: header.code.clone(),
        section: cells[0].clone(),
        semester: semester.to_string(),
        instructor: cells[1].clone(),
        location: cells[2].clone(),
        schedule: cells[3].clone(),
        notes,
        credits: header.credits,
        prerequisites: header.prerequisites.clone(),
        available,
    }
}

fn parse_header(document: &Html) -> Result<CourseHeader> {
    let info_box = select_first(document, "div#info-box")?
        .ok_or_else(|| AppError::parse("course page", "missing div#info-box"))?;

    let credits = labeled_value(info_box, CREDITS_LABEL)?.and_then(|text| parse_credits(&text));
    let prerequisites = labeled_value(info_box, PREREQUISITES_LABEL)?;

    let main = select_first(document, "div.main")?
        .ok_or_else(|| AppError::parse("course page", "missing div.main"))?;
    let name = child_text(main, "h1")?
        .ok_or_else(|| AppError::parse("course page", "missing h1 in div.main"))?;
    let code = child_text(main, "h2")?
        .ok_or_else(|| AppError::parse("course page", "missing h2 in div.main"))?;

    Ok(CourseHeader {
        name,
        code,
        credits,
        prerequisites,
    })
}

/// Text of the `dd` following the `dt` labelled `label`.
fn labeled_value(container: ElementRef, label: &str) -> Result<Option<String>> {
    let dt_sel = parse_selector("dt")?;

    let value = container
        .select(&dt_sel)
        .find(|dt| element_text(*dt) == label)
        .and_then(|dt| {
            dt.next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|sibling| sibling.value().name() == "dd")
        })
        .map(element_text);

    Ok(value)
}

/// Leading integer of a credits value such as "4" or "4 credits".
fn parse_credits(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Result<Option<ElementRef<'a>>> {
    let sel = parse_selector(selector)?;
    Ok(document.select(&sel).next())
}

fn child_text(parent: ElementRef, selector: &str) -> Result<Option<String>> {
    let sel = parse_selector(selector)?;
    Ok(parent.select(&sel).next().map(element_text))
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
