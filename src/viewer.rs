use indexmap::IndexMap;
use rusqlite::Connection;

use crate::error::StoreError;
use crate::model::{Department, Semester, StudentInfo, StudentResult};
use crate::store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome {
    Found(StudentResult),
    NotFound,
}

/// Loads one student's slice and folds it into a subject table.
///
/// The identity header is taken from the first stored row. A subject that
/// appears twice keeps its first position and its last value.
pub fn view(
    conn: &Connection,
    enrollment: &str,
    department: Department,
    semester: Semester,
) -> Result<ViewOutcome, StoreError> {
    let records = store::query(conn, enrollment, department, semester)?;
    let Some(first) = records.first() else {
        tracing::debug!(enrollment, %department, %semester, "no result found");
        return Ok(ViewOutcome::NotFound);
    };

    let student = StudentInfo {
        name: first.name.clone(),
        enrollment: first.enrollment.clone(),
        department: first.department,
        semester: first.semester,
        exam_name: first.exam_name.clone(),
        academic_year: first.academic_year.clone(),
    };
    let mut marks = IndexMap::new();
    for r in records {
        marks.insert(r.subject, r.marks);
    }
    Ok(ViewOutcome::Found(StudentResult { student, marks }))
}
