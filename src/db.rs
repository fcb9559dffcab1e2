use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE: &str = "results.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.to_string_lossy()))?;
    init_schema(&conn)?;
    tracing::debug!(path = %db_path.display(), "opened results database");
    Ok(conn)
}

/// Creates the results table when absent. An existing table is left as is.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS results(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            enrollment TEXT,
            name TEXT,
            department TEXT,
            semester INTEGER,
            subject TEXT,
            marks INTEGER,
            exam_name TEXT,
            academic_year TEXT
        )",
        [],
    )?;
    Ok(())
}
