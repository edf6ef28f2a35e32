//! Tree store contract and its SQLite implementation.
//!
//! The engine talks to persistence exclusively through [`TreeStore`]. The
//! SQLite implementation borrows a connection, so one mutation's reads and
//! writes all land inside whatever transaction the caller opened.

use crate::core::error::PlanactError;
use crate::core::model::VariableAction;
use rusqlite::{Connection, OptionalExtension, Row, params};

/// Persistence contract the hierarchy engine depends on.
///
/// Sibling lookups always come back ordered by `ordinal` so callers see a
/// stable sibling ordering without re-sorting.
pub trait TreeStore {
    fn find_by_id(&self, id: &str) -> Result<Option<VariableAction>, PlanactError>;
    /// Children of `parent_id`, ordered by ordinal.
    fn children_of(&self, parent_id: &str) -> Result<Vec<VariableAction>, PlanactError>;
    /// Root nodes of a plan, ordered by ordinal.
    fn roots_of_plan(&self, plan_id: &str) -> Result<Vec<VariableAction>, PlanactError>;
    /// Every node of a plan, ordered by code.
    fn nodes_of_plan(&self, plan_id: &str) -> Result<Vec<VariableAction>, PlanactError>;
    /// Whether any node in the whole store already carries `code`.
    fn code_exists(&self, code: &str) -> Result<bool, PlanactError>;
    fn max_order_under(&self, parent_id: &str) -> Result<i64, PlanactError>;
    fn max_order_at_root(&self, plan_id: &str) -> Result<i64, PlanactError>;
    fn plan_exists(&self, plan_id: &str) -> Result<bool, PlanactError>;
    /// Insert-or-update by id.
    fn save(&self, node: &VariableAction) -> Result<(), PlanactError>;
    /// Delete a node; descendants go with it (cascade contract).
    fn delete_by_id(&self, id: &str) -> Result<(), PlanactError>;
}

pub struct SqliteTreeStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteTreeStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn ordinal_mark(&self, scope: &str) -> Result<i64, PlanactError> {
        self.conn
            .query_row(
                "SELECT COALESCE(MAX(last), 0) FROM ordinal_marks WHERE scope = ?1",
                params![scope],
                |row| row.get(0),
            )
            .map_err(PlanactError::RusqliteError)
    }

    fn bump_ordinal_mark(&self, scope: &str, ordinal: i64) -> Result<(), PlanactError> {
        self.conn.execute(
            "INSERT INTO ordinal_marks(scope, last) VALUES(?1, ?2)
             ON CONFLICT(scope) DO UPDATE SET last = MAX(last, excluded.last)",
            params![scope, ordinal],
        )?;
        Ok(())
    }
}

/// Ordinal-mark scope for a plan's root sibling set.
fn root_scope(plan_id: &str) -> String {
    format!("plan:{}", plan_id)
}

const VA_COLUMNS: &str = "id, description, code, level, weight, frozen, ordinal, \
     parent_id, plan_id, responsible, created_at, updated_at";

fn row_to_action(row: &Row<'_>) -> rusqlite::Result<VariableAction> {
    Ok(VariableAction {
        id: row.get(0)?,
        description: row.get(1)?,
        code: row.get(2)?,
        level: row.get(3)?,
        weight: row.get(4)?,
        frozen: row.get::<_, i64>(5)? != 0,
        ordinal: row.get(6)?,
        parent_id: row.get(7)?,
        plan_id: row.get(8)?,
        responsible: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

impl TreeStore for SqliteTreeStore<'_> {
    fn find_by_id(&self, id: &str) -> Result<Option<VariableAction>, PlanactError> {
        self.conn
            .query_row(
                &format!("SELECT {VA_COLUMNS} FROM variable_actions WHERE id = ?1"),
                params![id],
                row_to_action,
            )
            .optional()
            .map_err(PlanactError::RusqliteError)
    }

    fn children_of(&self, parent_id: &str) -> Result<Vec<VariableAction>, PlanactError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VA_COLUMNS} FROM variable_actions WHERE parent_id = ?1 ORDER BY ordinal"
        ))?;
        let rows = stmt.query_map(params![parent_id], row_to_action)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(PlanactError::RusqliteError)
    }

    fn roots_of_plan(&self, plan_id: &str) -> Result<Vec<VariableAction>, PlanactError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VA_COLUMNS} FROM variable_actions
             WHERE plan_id = ?1 AND parent_id IS NULL ORDER BY ordinal"
        ))?;
        let rows = stmt.query_map(params![plan_id], row_to_action)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(PlanactError::RusqliteError)
    }

    fn nodes_of_plan(&self, plan_id: &str) -> Result<Vec<VariableAction>, PlanactError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VA_COLUMNS} FROM variable_actions WHERE plan_id = ?1 ORDER BY code"
        ))?;
        let rows = stmt.query_map(params![plan_id], row_to_action)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(PlanactError::RusqliteError)
    }

    fn code_exists(&self, code: &str) -> Result<bool, PlanactError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM variable_actions WHERE code = ?1",
            params![code],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn max_order_under(&self, parent_id: &str) -> Result<i64, PlanactError> {
        let live: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(ordinal), 0) FROM variable_actions WHERE parent_id = ?1",
            params![parent_id],
            |row| row.get(0),
        )?;
        Ok(live.max(self.ordinal_mark(parent_id)?))
    }

    fn max_order_at_root(&self, plan_id: &str) -> Result<i64, PlanactError> {
        let live: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(ordinal), 0) FROM variable_actions
             WHERE plan_id = ?1 AND parent_id IS NULL",
            params![plan_id],
            |row| row.get(0),
        )?;
        Ok(live.max(self.ordinal_mark(&root_scope(plan_id))?))
    }

    fn plan_exists(&self, plan_id: &str) -> Result<bool, PlanactError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM plans WHERE id = ?1",
            params![plan_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn save(&self, node: &VariableAction) -> Result<(), PlanactError> {
        self.conn.execute(
            "INSERT INTO variable_actions(id, description, code, level, weight, frozen,
                 ordinal, parent_id, plan_id, responsible, created_at, updated_at)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET
                 description = excluded.description,
                 code = excluded.code,
                 level = excluded.level,
                 weight = excluded.weight,
                 frozen = excluded.frozen,
                 ordinal = excluded.ordinal,
                 parent_id = excluded.parent_id,
                 responsible = excluded.responsible,
                 updated_at = excluded.updated_at",
            params![
                node.id,
                node.description,
                node.code,
                node.level,
                node.weight,
                node.frozen as i64,
                node.ordinal,
                node.parent_id,
                node.plan_id,
                node.responsible,
                node.created_at,
                node.updated_at,
            ],
        )?;
        let scope = match &node.parent_id {
            Some(pid) => pid.clone(),
            None => root_scope(&node.plan_id),
        };
        self.bump_ordinal_mark(&scope, node.ordinal)?;
        Ok(())
    }

    fn delete_by_id(&self, id: &str) -> Result<(), PlanactError> {
        self.conn
            .execute("DELETE FROM variable_actions WHERE id = ?1", params![id])?;
        Ok(())
    }
}
