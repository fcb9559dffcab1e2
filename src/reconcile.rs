//! Turns an uploaded sheet into long-format records and swaps them into the
//! store as one (department, semester) slice.

use std::collections::HashSet;

use rusqlite::Connection;
use serde::Serialize;

use crate::error::UploadError;
use crate::model::{Department, ResultRecord, Semester};
use crate::sheet::SheetTable;
use crate::store;

/// Headers that carry student/exam metadata and are never subjects.
pub const RESERVED_COLUMNS: [&str; 5] = [
    "enrollment",
    "name",
    "department",
    "exam_name",
    "academic_year",
];

/// Metadata columns every data row is read from.
const REQUIRED_COLUMNS: [&str; 4] = ["enrollment", "name", "exam_name", "academic_year"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub department: Department,
    pub semester: Semester,
    pub records_written: usize,
    /// Distinct enrollments, not rows.
    pub students: usize,
    pub subjects: Vec<String>,
    pub blank_cells: usize,
    pub non_numeric_cells: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marks {
    Value(i64),
    Blank,
    NonNumeric,
}

impl Marks {
    pub fn value(self) -> i64 {
        match self {
            Marks::Value(v) => v,
            Marks::Blank | Marks::NonNumeric => 0,
        }
    }
}

/// Reads a marks cell. Decimals are truncated toward zero; blank and
/// unparseable cells count as zero and are reported as such.
pub fn coerce_marks(cell: Option<&str>) -> Marks {
    let raw = cell.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Marks::Blank;
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Marks::Value(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.abs() < i64::MAX as f64 => Marks::Value(v.trunc() as i64),
        _ => Marks::NonNumeric,
    }
}

/// Subject columns as (column index, label), in sheet order.
///
/// Blank headers are ignored. A header repeated under the same normalized
/// name keeps its first column only.
pub fn subject_columns(table: &SheetTable) -> Vec<(usize, String)> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (idx, col) in table.columns().iter().enumerate() {
        if col.key.is_empty() || RESERVED_COLUMNS.contains(&col.key.as_str()) {
            continue;
        }
        if !seen.insert(col.key.clone()) {
            tracing::warn!(subject = %col.label, column = idx, "duplicate subject column ignored");
            continue;
        }
        out.push((idx, col.label.clone()));
    }
    out
}

/// Builds the slice's records without touching the store.
pub fn build_records(
    department: Department,
    semester: Semester,
    table: &SheetTable,
) -> Result<(Vec<ResultRecord>, UploadReport), UploadError> {
    let subjects = subject_columns(table);
    if table.row_count() > 0 {
        if let Some(missing) = REQUIRED_COLUMNS
            .into_iter()
            .find(|c| table.column_index(c).is_none())
        {
            return Err(UploadError::MissingColumn(missing));
        }
    }

    let mut records = Vec::with_capacity(table.row_count() * subjects.len());
    let mut enrollments = HashSet::new();
    let mut blank_cells = 0usize;
    let mut non_numeric_cells = 0usize;

    for row in table.rows() {
        let enrollment = row.get("enrollment").unwrap_or_default();
        if !enrollments.insert(enrollment.to_string()) {
            tracing::warn!(enrollment, "enrollment appears on more than one row");
        }
        let name = row.get("name").unwrap_or_default();
        let exam_name = row.get("exam_name").unwrap_or_default();
        let academic_year = row.get("academic_year").unwrap_or_default();

        for (idx, subject) in &subjects {
            let cell = row.cell(*idx);
            let marks = coerce_marks(cell);
            match marks {
                Marks::Blank => blank_cells += 1,
                Marks::NonNumeric => {
                    non_numeric_cells += 1;
                    tracing::warn!(
                        enrollment,
                        subject = %subject,
                        cell = cell.unwrap_or_default(),
                        "non-numeric marks recorded as 0"
                    );
                }
                Marks::Value(_) => {}
            }
            records.push(ResultRecord {
                enrollment: enrollment.to_string(),
                name: name.to_string(),
                department,
                semester,
                subject: subject.clone(),
                marks: marks.value(),
                exam_name: exam_name.to_string(),
                academic_year: academic_year.to_string(),
            });
        }
    }

    let report = UploadReport {
        department,
        semester,
        records_written: records.len(),
        students: enrollments.len(),
        subjects: subjects.into_iter().map(|(_, s)| s).collect(),
        blank_cells,
        non_numeric_cells,
    };
    Ok((records, report))
}

/// Replaces the (department, semester) slice with the contents of `table`.
pub fn reconcile(
    conn: &Connection,
    department: Department,
    semester: Semester,
    table: &SheetTable,
) -> Result<UploadReport, UploadError> {
    let (records, report) = build_records(department, semester, table)?;
    if report.subjects.is_empty() {
        tracing::warn!(%department, %semester, "sheet has no subject columns; slice will be emptied");
    }
    if report.blank_cells > 0 {
        tracing::info!(count = report.blank_cells, "blank marks cells recorded as 0");
    }
    store::replace_slice(conn, department, semester, &records)?;
    Ok(report)
}
