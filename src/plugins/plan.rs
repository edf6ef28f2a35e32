//! Action plan management: the owning aggregates for variable-action trees.
//!
//! Deliberately thin. Plans exist so the tree engine has something to hang
//! root sibling sets on; everything interesting happens in `core::hierarchy`.

use crate::core::audit::{AuditEntry, AuditSink, SqliteAuditLog};
use crate::core::db;
use crate::core::error::PlanactError;
use crate::core::model::ActionPlan;
use crate::core::time::{new_event_id, now_epoch_z};
use clap::{Parser, Subcommand};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

#[derive(Parser, Debug)]
#[clap(name = "plan", about = "Manage action plans.")]
pub struct PlanCli {
    #[clap(subcommand)]
    pub command: PlanCommand,
}

#[derive(Subcommand, Debug)]
pub enum PlanCommand {
    /// Create a new action plan.
    Add {
        /// Plan title (positional argument)
        #[clap(value_name = "TITLE")]
        title: String,
        #[clap(long, default_value = "")]
        description: String,
    },
    /// List all plans.
    List,
    /// Get a plan by ID.
    Get {
        #[clap(long)]
        id: String,
    },
}

pub fn add_plan(
    root: &Path,
    title: &str,
    description: &str,
    actor_id: &str,
) -> Result<ActionPlan, PlanactError> {
    let mut conn = db::connect_plan_db(root)?;
    let tx = conn.transaction()?;
    let plan = ActionPlan {
        id: new_event_id(),
        title: title.to_string(),
        description: description.to_string(),
        locked: false,
        created_at: now_epoch_z(),
    };
    tx.execute(
        "INSERT INTO plans(id, title, description, locked, created_at)
         VALUES(?1, ?2, ?3, ?4, ?5)",
        params![
            plan.id,
            plan.title,
            plan.description,
            plan.locked as i64,
            plan.created_at
        ],
    )?;
    let audit = SqliteAuditLog::new(&tx, root);
    audit.record(&AuditEntry::new(
        "plan_created",
        "PlanAction",
        &plan.id,
        actor_id,
        format!("Created action plan \"{}\"", plan.title),
    ))?;
    tx.commit()?;
    Ok(plan)
}

pub fn list_plans(root: &Path) -> Result<Vec<ActionPlan>, PlanactError> {
    let conn = db::connect_plan_db(root)?;
    let mut stmt = conn.prepare(
        "SELECT id, title, description, locked, created_at FROM plans ORDER BY created_at",
    )?;
    let rows = stmt.query_map([], row_to_plan)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(PlanactError::RusqliteError)
}

pub fn get_plan(root: &Path, id: &str) -> Result<ActionPlan, PlanactError> {
    let conn = db::connect_plan_db(root)?;
    find_plan(&conn, id)?
        .ok_or_else(|| PlanactError::NotFound(format!("action plan with id {}", id)))
}

pub fn find_plan(conn: &Connection, id: &str) -> Result<Option<ActionPlan>, PlanactError> {
    conn.query_row(
        "SELECT id, title, description, locked, created_at FROM plans WHERE id = ?1",
        params![id],
        row_to_plan,
    )
    .optional()
    .map_err(PlanactError::RusqliteError)
}

fn row_to_plan(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActionPlan> {
    Ok(ActionPlan {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        locked: row.get::<_, i64>(3)? != 0,
        created_at: row.get(4)?,
    })
}

pub fn run(root: &Path, cli: PlanCli, actor_id: &str) -> Result<(), PlanactError> {
    match cli.command {
        PlanCommand::Add { title, description } => {
            let plan = add_plan(root, &title, &description, actor_id)?;
            println!(
                "{}",
                serde_json::json!({
                    "ts": now_epoch_z(),
                    "cmd": "plan.add",
                    "status": "ok",
                    "id": plan.id,
                    "title": plan.title,
                })
            );
        }
        PlanCommand::List => {
            let plans = list_plans(root)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&plans)
                    .map_err(|e| PlanactError::ValidationError(e.to_string()))?
            );
        }
        PlanCommand::Get { id } => {
            let plan = get_plan(root, &id)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&plan)
                    .map_err(|e| PlanactError::ValidationError(e.to_string()))?
            );
        }
    }
    Ok(())
}
