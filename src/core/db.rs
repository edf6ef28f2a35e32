use crate::core::error::PlanactError;
use crate::core::schemas;
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};

pub fn db_connect(db_path: &str) -> Result<Connection, PlanactError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(PlanactError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(PlanactError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(PlanactError::RusqliteError)?;
    Ok(conn)
}

pub fn plan_db_path(root: &Path) -> PathBuf {
    root.join(schemas::PLAN_DB_NAME)
}

pub fn connect_plan_db(root: &Path) -> Result<Connection, PlanactError> {
    let db_path = plan_db_path(root);
    let conn = db_connect(&db_path.to_string_lossy())?;
    ensure_schema(&conn)?;
    Ok(conn)
}

pub fn initialize_plan_db(root: &Path) -> Result<(), PlanactError> {
    fs::create_dir_all(root).map_err(PlanactError::IoError)?;
    let db_path = plan_db_path(root);
    let conn = db_connect(&db_path.to_string_lossy())?;
    ensure_schema(&conn)?;
    Ok(())
}

pub fn ensure_schema(conn: &Connection) -> Result<(), PlanactError> {
    conn.execute(schemas::PLAN_DB_SCHEMA_META, [])?;

    let current: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(PlanactError::RusqliteError)?;

    let current_version: u32 = current
        .as_deref()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);

    if current_version >= schemas::PLAN_SCHEMA_VERSION {
        return Ok(());
    }

    conn.execute(schemas::PLAN_DB_SCHEMA_PLANS, [])?;
    conn.execute(schemas::PLAN_DB_SCHEMA_VARIABLE_ACTIONS, [])?;
    conn.execute(schemas::PLAN_DB_SCHEMA_ORDINAL_MARKS, [])?;
    conn.execute(schemas::PLAN_DB_SCHEMA_AUDITS, [])?;
    conn.execute(schemas::PLAN_DB_SCHEMA_INDEX_VA_PARENT, [])?;
    conn.execute(schemas::PLAN_DB_SCHEMA_INDEX_VA_PLAN, [])?;
    conn.execute(schemas::PLAN_DB_SCHEMA_INDEX_AUDITS_ENTITY, [])?;

    conn.execute(
        "INSERT INTO meta(key, value) VALUES('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [schemas::PLAN_SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}
