//! Core data model: action plans and the weighted variable-action tree.

use serde::{Deserialize, Serialize};

/// Top-level aggregate owning a tree of variable actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlan {
    pub id: String,
    pub title: String,
    pub description: String,
    pub locked: bool,
    pub created_at: String,
}

/// One weighted sub-goal in a plan's tree.
///
/// `code`, `level`, `ordinal`, and `weight` are engine-owned derived fields:
/// they are written only by the hierarchy mutator and never accepted as
/// client input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableAction {
    pub id: String,
    pub description: String,
    /// Hierarchical code, e.g. `VA1`, `VA12`. Globally unique, stable across
    /// field edits, reassigned only on create and move.
    pub code: String,
    /// Tree depth: 1 for roots, parent level + 1 for children. Ceiling 15.
    pub level: i64,
    /// Share of 100 within the node's sibling set.
    pub weight: f64,
    /// Advisory finalization flag; the engine records it but does not block
    /// mutation of frozen nodes.
    pub frozen: bool,
    /// Sibling ordering key: max+1 on insert, never reused after deletion.
    pub ordinal: i64,
    pub parent_id: Option<String>,
    pub plan_id: String,
    /// Optional user reference, carried for reporting only.
    pub responsible: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl VariableAction {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// A node may acquire children only below the level ceiling.
    pub fn can_have_children(&self) -> bool {
        self.level < crate::core::codes::MAX_LEVEL
    }

    /// Indented `code - description` label for listings.
    pub fn display_name(&self) -> String {
        let indent = "  ".repeat(self.level.saturating_sub(1) as usize);
        format!("{}{} - {}", indent, self.code, self.description)
    }
}

/// One node of the rendered hierarchy: the persisted fields plus ordered
/// children, for `va tree` style consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableNode {
    #[serde(flatten)]
    pub action: VariableAction,
    pub children: Vec<VariableNode>,
}
