use rusqlite::{Connection, Row};

use crate::error::StoreError;
use crate::model::{Department, ResultRecord, Semester};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceStats {
    pub records: i64,
    pub students: i64,
    pub subjects: i64,
}

fn record_from_row(row: &Row<'_>) -> Result<ResultRecord, StoreError> {
    let department: Option<String> = row.get(2)?;
    let department = department
        .as_deref()
        .unwrap_or_default()
        .parse::<Department>()
        .map_err(|e| StoreError::InvalidState(e.to_string()))?;
    let semester: Option<i64> = row.get(3)?;
    let semester = Semester::new(semester.unwrap_or_default())
        .map_err(|e| StoreError::InvalidState(e.to_string()))?;
    Ok(ResultRecord {
        enrollment: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
        name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        department,
        semester,
        subject: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        marks: row.get::<_, Option<i64>>(5)?.unwrap_or_default(),
        exam_name: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        academic_year: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
    })
}

/// Records matching all three keys exactly, in insertion order.
pub fn query(
    conn: &Connection,
    enrollment: &str,
    department: Department,
    semester: Semester,
) -> Result<Vec<ResultRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT enrollment, name, department, semester, subject, marks, exam_name, academic_year
         FROM results
         WHERE enrollment = ? AND department = ? AND semester = ?
         ORDER BY id",
    )?;
    let mut rows = stmt.query((enrollment, department.as_str(), semester.get()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(record_from_row(row)?);
    }
    Ok(out)
}

/// Deletes the (department, semester) slice and inserts `records` in its place.
///
/// Both steps run in one transaction: either the new slice is committed in
/// full or the old slice is left untouched. Each record is written under the
/// call's department and semester, whatever it carries itself.
pub fn replace_slice(
    conn: &Connection,
    department: Department,
    semester: Semester,
    records: &[ResultRecord],
) -> Result<usize, StoreError> {
    let tx = conn.unchecked_transaction()?;
    let removed = tx.execute(
        "DELETE FROM results WHERE department = ? AND semester = ?",
        (department.as_str(), semester.get()),
    )?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO results(enrollment, name, department, semester, subject, marks, exam_name, academic_year)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        for r in records {
            stmt.execute((
                &r.enrollment,
                &r.name,
                department.as_str(),
                semester.get(),
                &r.subject,
                r.marks,
                &r.exam_name,
                &r.academic_year,
            ))?;
        }
    }
    tx.commit()?;

    tracing::info!(
        department = %department,
        semester = %semester,
        removed,
        inserted = records.len(),
        "replaced result slice"
    );
    Ok(records.len())
}

pub fn slice_stats(
    conn: &Connection,
    department: Department,
    semester: Semester,
) -> Result<SliceStats, StoreError> {
    let stats = conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT enrollment), COUNT(DISTINCT subject)
         FROM results
         WHERE department = ? AND semester = ?",
        (department.as_str(), semester.get()),
        |r| {
            Ok(SliceStats {
                records: r.get(0)?,
                students: r.get(1)?,
                subjects: r.get(2)?,
            })
        },
    )?;
    Ok(stats)
}
