//! Audit trail: structured descriptions of every structural mutation.
//!
//! The engine only *produces* entries; the sink decides where they land. The
//! SQLite sink dual-writes each entry: one row in the `audits` table (inside
//! the mutation's transaction) and one JSON line in the append-only
//! `planact.events.jsonl` log.

use crate::core::error::PlanactError;
use crate::core::schemas;
use crate::core::time::{days_ago, new_event_id, now_epoch_z};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub ts: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub actor_id: String,
    /// Human-readable summary of exactly the fields that changed.
    pub details: String,
}

impl AuditEntry {
    pub fn new(action: &str, entity_type: &str, entity_id: &str, actor_id: &str, details: String) -> Self {
        Self {
            id: new_event_id(),
            ts: now_epoch_z(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            actor_id: actor_id.to_string(),
            details,
        }
    }
}

/// Receives the engine's mutation descriptions.
pub trait AuditSink {
    fn record(&self, entry: &AuditEntry) -> Result<(), PlanactError>;
}

pub struct SqliteAuditLog<'a> {
    conn: &'a Connection,
    events_path: PathBuf,
}

impl<'a> SqliteAuditLog<'a> {
    pub fn new(conn: &'a Connection, root: &Path) -> Self {
        Self {
            conn,
            events_path: root.join(schemas::PLAN_EVENTS_NAME),
        }
    }
}

impl AuditSink for SqliteAuditLog<'_> {
    fn record(&self, entry: &AuditEntry) -> Result<(), PlanactError> {
        self.conn.execute(
            "INSERT INTO audits(id, ts, action, entity_type, entity_id, actor_id, details)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.ts,
                entry.action,
                entry.entity_type,
                entry.entity_id,
                entry.actor_id,
                entry.details,
            ],
        )?;

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.events_path)
            .map_err(PlanactError::IoError)?;
        let line = serde_json::to_string(entry)
            .map_err(|e| PlanactError::ValidationError(format!("audit serialization: {}", e)))?;
        writeln!(f, "{}", line).map_err(PlanactError::IoError)?;
        Ok(())
    }
}

/// Entries for one entity, newest first.
pub fn audits_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<AuditEntry>, PlanactError> {
    let mut stmt = conn.prepare(
        "SELECT id, ts, action, entity_type, entity_id, actor_id, details
         FROM audits WHERE entity_type = ?1 AND entity_id = ?2 ORDER BY ts DESC, id DESC",
    )?;
    let rows = stmt.query_map(params![entity_type, entity_id], |row| {
        Ok(AuditEntry {
            id: row.get(0)?,
            ts: row.get(1)?,
            action: row.get(2)?,
            entity_type: row.get(3)?,
            entity_id: row.get(4)?,
            actor_id: row.get(5)?,
            details: row.get(6)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(PlanactError::RusqliteError)
}

/// Display shape for trail listings: relative date, actor, action, details.
pub fn format_for_display(entries: &[AuditEntry]) -> Vec<serde_json::Value> {
    entries
        .iter()
        .map(|e| {
            serde_json::json!({
                "date": days_ago(&e.ts),
                "actor": e.actor_id,
                "action": e.action,
                "details": e.details,
            })
        })
        .collect()
}
