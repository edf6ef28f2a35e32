//! Variable action operations: the caller-facing surface of the tree engine.
//!
//! Each operation opens one connection, wraps the whole mutation in a single
//! transaction, and runs it through the [`HierarchyMutator`]. The engine's
//! reads and writes (code allocation, weight redistribution, audit insert)
//! all commit or roll back together.

use crate::core::audit::{self, SqliteAuditLog};
use crate::core::db;
use crate::core::error::PlanactError;
use crate::core::hierarchy::{CreateVariable, HierarchyMutator, UpdateVariable, ENTITY_TYPE};
use crate::core::model::{VariableAction, VariableNode};
use crate::core::store::SqliteTreeStore;
use crate::core::time::now_epoch_z;
use clap::{Parser, Subcommand};
use std::path::Path;

#[derive(Parser, Debug)]
#[clap(name = "va", about = "Manage a plan's variable-action tree.")]
pub struct VariableCli {
    #[clap(subcommand)]
    pub command: VariableCommand,
}

#[derive(Subcommand, Debug)]
pub enum VariableCommand {
    /// Add a variable action (root when --parent is omitted).
    Add {
        /// Description (positional argument)
        #[clap(value_name = "DESCRIPTION")]
        description: String,
        #[clap(long)]
        plan: String,
        #[clap(long)]
        parent: Option<String>,
        #[clap(long)]
        frozen: bool,
        #[clap(long)]
        responsible: Option<String>,
    },
    /// Edit a variable action's fields (partial update).
    Edit {
        #[clap(long)]
        id: String,
        #[clap(long)]
        description: Option<String>,
        #[clap(long)]
        frozen: Option<bool>,
        #[clap(long)]
        responsible: Option<String>,
        /// Move under a new parent while editing.
        #[clap(long, conflicts_with = "to_root")]
        parent: Option<String>,
        /// Detach to root level while editing.
        #[clap(long)]
        to_root: bool,
    },
    /// Move a variable action under a new parent (or to root).
    Move {
        #[clap(long)]
        id: String,
        #[clap(long, conflicts_with = "to_root")]
        parent: Option<String>,
        #[clap(long)]
        to_root: bool,
    },
    /// Delete a variable action and its subtree.
    Rm {
        #[clap(long)]
        id: String,
    },
    /// Set or clear the advisory frozen flag.
    Freeze {
        #[clap(long)]
        id: String,
        /// Clear the flag instead of setting it.
        #[clap(long)]
        unfreeze: bool,
    },
    /// Re-run weight redistribution over one sibling set.
    Reweigh {
        #[clap(long)]
        plan: String,
        #[clap(long)]
        parent: Option<String>,
    },
    /// Get a variable action with its audit trail.
    Get {
        #[clap(long)]
        id: String,
    },
    /// Print a plan's full tree.
    Tree {
        #[clap(long)]
        plan: String,
    },
}

/// Runs `f` against a mutator whose store and audit sink share one
/// transaction; commits on success, rolls back on error.
fn with_mutator<T>(
    root: &Path,
    f: impl FnOnce(&HierarchyMutator) -> Result<T, PlanactError>,
) -> Result<T, PlanactError> {
    let mut conn = db::connect_plan_db(root)?;
    let tx = conn.transaction()?;
    let out = {
        let store = SqliteTreeStore::new(&tx);
        let audit = SqliteAuditLog::new(&tx, root);
        let mutator = HierarchyMutator::new(&store, &audit);
        f(&mutator)?
    };
    tx.commit()?;
    Ok(out)
}

pub fn create_variable(
    root: &Path,
    req: &CreateVariable,
    actor_id: &str,
) -> Result<VariableAction, PlanactError> {
    with_mutator(root, |m| m.create(req, actor_id))
}

pub fn update_variable(
    root: &Path,
    id: &str,
    req: &UpdateVariable,
    actor_id: &str,
) -> Result<VariableAction, PlanactError> {
    with_mutator(root, |m| m.update(id, req, actor_id))
}

pub fn move_variable(
    root: &Path,
    id: &str,
    new_parent_id: Option<&str>,
    actor_id: &str,
) -> Result<VariableAction, PlanactError> {
    with_mutator(root, |m| m.move_variable(id, new_parent_id, actor_id))
}

pub fn delete_variable(root: &Path, id: &str, actor_id: &str) -> Result<(), PlanactError> {
    with_mutator(root, |m| m.delete(id, actor_id))
}

pub fn set_frozen(
    root: &Path,
    id: &str,
    frozen: bool,
    actor_id: &str,
) -> Result<VariableAction, PlanactError> {
    with_mutator(root, |m| m.set_frozen(id, frozen, actor_id))
}

pub fn recalculate_weights(
    root: &Path,
    plan_id: &str,
    parent_id: Option<&str>,
) -> Result<usize, PlanactError> {
    with_mutator(root, |m| m.recalculate(plan_id, parent_id))
}

pub fn get_variable(root: &Path, id: &str) -> Result<VariableAction, PlanactError> {
    with_mutator(root, |m| m.get(id))
}

pub fn plan_hierarchy(root: &Path, plan_id: &str) -> Result<Vec<VariableNode>, PlanactError> {
    with_mutator(root, |m| m.hierarchy(plan_id))
}

/// A node plus its formatted audit trail, for `va get`.
pub fn get_variable_with_audits(
    root: &Path,
    id: &str,
) -> Result<serde_json::Value, PlanactError> {
    let node = get_variable(root, id)?;
    let conn = db::connect_plan_db(root)?;
    let trail = audit::audits_for_entity(&conn, ENTITY_TYPE, id)?;
    Ok(serde_json::json!({
        "variable": node,
        "audit_log": audit::format_for_display(&trail),
    }))
}

pub fn run(root: &Path, cli: VariableCli, actor_id: &str) -> Result<(), PlanactError> {
    match cli.command {
        VariableCommand::Add {
            description,
            plan,
            parent,
            frozen,
            responsible,
        } => {
            let req = CreateVariable {
                plan_id: plan,
                parent_id: parent,
                description,
                frozen,
                responsible,
            };
            let node = create_variable(root, &req, actor_id)?;
            println!("{}", envelope("va.add", &node));
        }
        VariableCommand::Edit {
            id,
            description,
            frozen,
            responsible,
            parent,
            to_root,
        } => {
            let reparent = if to_root {
                Some(None)
            } else {
                parent.map(Some)
            };
            let req = UpdateVariable {
                description,
                frozen,
                responsible,
                reparent,
            };
            let node = update_variable(root, &id, &req, actor_id)?;
            println!("{}", envelope("va.edit", &node));
        }
        VariableCommand::Move { id, parent, to_root } => {
            if parent.is_none() && !to_root {
                return Err(PlanactError::ValidationError(
                    "specify --parent <ID> or --to-root".to_string(),
                ));
            }
            let node = move_variable(root, &id, parent.as_deref(), actor_id)?;
            println!("{}", envelope("va.move", &node));
        }
        VariableCommand::Rm { id } => {
            delete_variable(root, &id, actor_id)?;
            println!(
                "{}",
                serde_json::json!({
                    "ts": now_epoch_z(),
                    "cmd": "va.rm",
                    "status": "ok",
                    "id": id,
                })
            );
        }
        VariableCommand::Freeze { id, unfreeze } => {
            let node = set_frozen(root, &id, !unfreeze, actor_id)?;
            println!("{}", envelope("va.freeze", &node));
        }
        VariableCommand::Reweigh { plan, parent } => {
            let count = recalculate_weights(root, &plan, parent.as_deref())?;
            println!(
                "{}",
                serde_json::json!({
                    "ts": now_epoch_z(),
                    "cmd": "va.reweigh",
                    "status": "ok",
                    "siblings": count,
                })
            );
        }
        VariableCommand::Get { id } => {
            let value = get_variable_with_audits(root, &id)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&value)
                    .map_err(|e| PlanactError::ValidationError(e.to_string()))?
            );
        }
        VariableCommand::Tree { plan } => {
            let tree = plan_hierarchy(root, &plan)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&tree)
                    .map_err(|e| PlanactError::ValidationError(e.to_string()))?
            );
        }
    }
    Ok(())
}

fn envelope(cmd: &str, node: &VariableAction) -> serde_json::Value {
    serde_json::json!({
        "ts": now_epoch_z(),
        "cmd": cmd,
        "status": "ok",
        "id": node.id,
        "code": node.code,
        "level": node.level,
        "weight": node.weight,
    })
}
