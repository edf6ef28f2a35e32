//! Hierarchy mutator: the single writer of the variable-action tree.
//!
//! Every structural operation (create, update, move, delete, freeze,
//! recalculate) runs through here. The mutator validates invariants before
//! the first write, delegates code assignment to [`codes`] and weight
//! redistribution to [`weights`], persists through the [`TreeStore`], and
//! hands one [`AuditEntry`] per mutation to the [`AuditSink`]. The acting
//! user is always an explicit `actor_id` parameter.

use crate::core::audit::{AuditEntry, AuditSink};
use crate::core::codes;
use crate::core::error::PlanactError;
use crate::core::model::{VariableAction, VariableNode};
use crate::core::store::TreeStore;
use crate::core::time::{new_event_id, now_epoch_z};
use crate::core::weights;
use rustc_hash::FxHashMap;

pub const ENTITY_TYPE: &str = "VariableAction";

#[derive(Debug, Clone)]
pub struct CreateVariable {
    pub plan_id: String,
    pub parent_id: Option<String>,
    pub description: String,
    pub frozen: bool,
    pub responsible: Option<String>,
}

/// Partial update: `None` leaves a field untouched. `reparent` is the one
/// exception to the object-typed rule, since "move to root" must be
/// expressible: `Some(None)` detaches to root, `Some(Some(id))` reparents.
#[derive(Debug, Clone, Default)]
pub struct UpdateVariable {
    pub description: Option<String>,
    pub frozen: Option<bool>,
    pub responsible: Option<String>,
    pub reparent: Option<Option<String>>,
}

pub struct HierarchyMutator<'a> {
    store: &'a dyn TreeStore,
    audit: &'a dyn AuditSink,
}

impl<'a> HierarchyMutator<'a> {
    pub fn new(store: &'a dyn TreeStore, audit: &'a dyn AuditSink) -> Self {
        Self { store, audit }
    }

    // ----- reads -----

    pub fn get(&self, id: &str) -> Result<VariableAction, PlanactError> {
        self.require(id)
    }

    /// The plan's full tree: roots in sibling order, children nested.
    pub fn hierarchy(&self, plan_id: &str) -> Result<Vec<VariableNode>, PlanactError> {
        if !self.store.plan_exists(plan_id)? {
            return Err(PlanactError::NotFound(format!(
                "action plan with id {}",
                plan_id
            )));
        }
        let mut by_parent: FxHashMap<String, Vec<VariableAction>> = FxHashMap::default();
        let mut roots: Vec<VariableAction> = Vec::new();
        for node in self.store.nodes_of_plan(plan_id)? {
            match node.parent_id.clone() {
                Some(pid) => by_parent.entry(pid).or_default().push(node),
                None => roots.push(node),
            }
        }
        roots.sort_by_key(|n| n.ordinal);
        Ok(roots
            .into_iter()
            .map(|r| build_node(r, &mut by_parent))
            .collect())
    }

    // ----- mutations -----

    pub fn create(
        &self,
        req: &CreateVariable,
        actor_id: &str,
    ) -> Result<VariableAction, PlanactError> {
        if !self.store.plan_exists(&req.plan_id)? {
            return Err(PlanactError::NotFound(format!(
                "action plan with id {}",
                req.plan_id
            )));
        }

        let parent = match &req.parent_id {
            Some(pid) => {
                let parent = self.require(pid)?;
                if parent.plan_id != req.plan_id {
                    return Err(PlanactError::InvariantViolation(format!(
                        "parent {} belongs to a different plan",
                        parent.code
                    )));
                }
                if !parent.can_have_children() {
                    return Err(PlanactError::InvariantViolation(format!(
                        "parent {} is at the maximum level ({}) and cannot have children",
                        parent.code,
                        codes::MAX_LEVEL
                    )));
                }
                Some(parent)
            }
            None => None,
        };

        let siblings = self.sibling_set(&req.plan_id, req.parent_id.as_deref())?;
        let code = codes::allocate(self.store, parent.as_ref(), &siblings)?;
        let level = codes::derive_level(parent.as_ref());
        let ordinal = self.next_ordinal(&req.plan_id, req.parent_id.as_deref())?;
        let ts = now_epoch_z();

        let node = VariableAction {
            id: new_event_id(),
            description: req.description.clone(),
            code,
            level,
            weight: weights::equal_share(siblings.len() + 1),
            frozen: req.frozen,
            ordinal,
            parent_id: req.parent_id.clone(),
            plan_id: req.plan_id.clone(),
            responsible: req.responsible.clone(),
            created_at: ts.clone(),
            updated_at: ts,
        };
        self.store.save(&node)?;

        let mut set = self.sibling_set(&req.plan_id, req.parent_id.as_deref())?;
        weights::redistribute(self.store, &mut set)?;

        let mut details = format!(
            "Created variable action \"{}\" (code {}, level {})",
            node.description, node.code, node.level
        );
        if let Some(p) = &parent {
            details.push_str(&format!(" under {}", p.code));
        }
        if let Some(r) = &node.responsible {
            details.push_str(&format!(", responsible: {}", r));
        }
        self.audit.record(&AuditEntry::new(
            "variable_created",
            ENTITY_TYPE,
            &node.id,
            actor_id,
            details,
        ))?;

        self.require(&node.id)
    }

    pub fn update(
        &self,
        id: &str,
        req: &UpdateVariable,
        actor_id: &str,
    ) -> Result<VariableAction, PlanactError> {
        let mut node = self.require(id)?;
        let mut changes: Vec<String> = Vec::new();

        if let Some(description) = &req.description {
            if *description != node.description {
                changes.push(format!(
                    "description changed from \"{}\" to \"{}\"",
                    node.description, description
                ));
                node.description = description.clone();
            }
        }
        if let Some(frozen) = req.frozen {
            if frozen != node.frozen {
                changes.push(format!(
                    "frozen status changed from {} to {}",
                    frozen_label(node.frozen),
                    frozen_label(frozen)
                ));
                node.frozen = frozen;
            }
        }
        if let Some(responsible) = &req.responsible {
            if node.responsible.as_deref() != Some(responsible.as_str()) {
                changes.push(format!(
                    "responsible changed from \"{}\" to \"{}\"",
                    node.responsible.as_deref().unwrap_or("unassigned"),
                    responsible
                ));
                node.responsible = Some(responsible.clone());
            }
        }

        let wants_move = match &req.reparent {
            Some(target) => *target != node.parent_id,
            None => false,
        };

        if !changes.is_empty() {
            node.updated_at = now_epoch_z();
            self.store.save(&node)?;
        }

        if wants_move {
            let target = req.reparent.clone().unwrap_or(None);
            let old_code = node.code.clone();
            let old_parent_code = self.parent_code_label(node.parent_id.as_deref())?;
            node = self.relocate(node, target.as_deref())?;
            changes.push(format!(
                "parent changed from {} to {}",
                old_parent_code,
                self.parent_code_label(node.parent_id.as_deref())?
            ));
            changes.push(format!(
                "code changed from \"{}\" to \"{}\"",
                old_code, node.code
            ));
        }

        if !changes.is_empty() {
            self.audit.record(&AuditEntry::new(
                "variable_updated",
                ENTITY_TYPE,
                &node.id,
                actor_id,
                format!("Updated variable action: {}", changes.join("; ")),
            ))?;
        }

        self.require(&node.id)
    }

    /// Reparent a node (or detach it to root). Moving under the current
    /// parent is an idempotent no-op.
    pub fn move_variable(
        &self,
        id: &str,
        new_parent_id: Option<&str>,
        actor_id: &str,
    ) -> Result<VariableAction, PlanactError> {
        let node = self.require(id)?;
        if node.parent_id.as_deref() == new_parent_id {
            return Ok(node);
        }

        let old_code = node.code.clone();
        let old_parent_label = self.parent_code_label(node.parent_id.as_deref())?;
        let node = self.relocate(node, new_parent_id)?;

        self.audit.record(&AuditEntry::new(
            "variable_moved",
            ENTITY_TYPE,
            &node.id,
            actor_id,
            format!(
                "Moved variable action \"{}\": parent changed from {} to {}; code changed from \"{}\" to \"{}\"",
                node.description,
                old_parent_label,
                self.parent_code_label(node.parent_id.as_deref())?,
                old_code,
                node.code
            ),
        ))?;

        self.require(&node.id)
    }

    /// Delete a node and its whole subtree, then redistribute the surviving
    /// sibling set.
    pub fn delete(&self, id: &str, actor_id: &str) -> Result<(), PlanactError> {
        let node = self.require(id)?;
        self.store.delete_by_id(id)?;

        let mut remaining = self.sibling_set(&node.plan_id, node.parent_id.as_deref())?;
        weights::redistribute(self.store, &mut remaining)?;

        self.audit.record(&AuditEntry::new(
            "variable_deleted",
            ENTITY_TYPE,
            id,
            actor_id,
            format!(
                "Deleted variable action \"{}\" (code {})",
                node.description, node.code
            ),
        ))?;
        Ok(())
    }

    /// Toggle the advisory frozen flag, with its own audit record.
    pub fn set_frozen(
        &self,
        id: &str,
        frozen: bool,
        actor_id: &str,
    ) -> Result<VariableAction, PlanactError> {
        let mut node = self.require(id)?;
        let old = node.frozen;
        if old != frozen {
            node.frozen = frozen;
            node.updated_at = now_epoch_z();
            self.store.save(&node)?;
            self.audit.record(&AuditEntry::new(
                "variable_frozen_updated",
                ENTITY_TYPE,
                &node.id,
                actor_id,
                format!(
                    "Changed frozen status of \"{}\" from {} to {}",
                    node.description,
                    frozen_label(old),
                    frozen_label(frozen)
                ),
            ))?;
        }
        Ok(node)
    }

    /// Re-run equal-share redistribution over one sibling set. Repair
    /// surface for stores edited out-of-band; returns the set size.
    pub fn recalculate(
        &self,
        plan_id: &str,
        parent_id: Option<&str>,
    ) -> Result<usize, PlanactError> {
        if let Some(pid) = parent_id {
            self.require(pid)?;
        } else if !self.store.plan_exists(plan_id)? {
            return Err(PlanactError::NotFound(format!(
                "action plan with id {}",
                plan_id
            )));
        }
        let mut set = self.sibling_set(plan_id, parent_id)?;
        weights::redistribute(self.store, &mut set)?;
        Ok(set.len())
    }

    // ----- internals -----

    fn require(&self, id: &str) -> Result<VariableAction, PlanactError> {
        self.store.find_by_id(id)?.ok_or_else(|| {
            PlanactError::NotFound(format!("variable action with id {}", id))
        })
    }

    /// Siblings under `parent_id`, or the plan's root set.
    fn sibling_set(
        &self,
        plan_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<VariableAction>, PlanactError> {
        match parent_id {
            Some(pid) => self.store.children_of(pid),
            None => self.store.roots_of_plan(plan_id),
        }
    }

    fn next_ordinal(
        &self,
        plan_id: &str,
        parent_id: Option<&str>,
    ) -> Result<i64, PlanactError> {
        let max = match parent_id {
            Some(pid) => self.store.max_order_under(pid)?,
            None => self.store.max_order_at_root(plan_id)?,
        };
        Ok(max + 1)
    }

    fn parent_code_label(&self, parent_id: Option<&str>) -> Result<String, PlanactError> {
        match parent_id {
            Some(pid) => Ok(format!("\"{}\"", self.require(pid)?.code)),
            None => Ok("root".to_string()),
        }
    }

    /// Shared move path: validates, detaches, reassigns code/level/ordinal,
    /// recodes the subtree, and redistributes both touched sibling sets.
    fn relocate(
        &self,
        mut node: VariableAction,
        new_parent_id: Option<&str>,
    ) -> Result<VariableAction, PlanactError> {
        let new_parent = match new_parent_id {
            Some(pid) => {
                if pid == node.id {
                    return Err(PlanactError::InvariantViolation(format!(
                        "variable action {} cannot become its own parent",
                        node.code
                    )));
                }
                let parent = self.require(pid)?;
                if parent.plan_id != node.plan_id {
                    return Err(PlanactError::InvariantViolation(format!(
                        "cannot move {} across plans",
                        node.code
                    )));
                }
                if self.is_descendant(&parent, &node.id)? {
                    return Err(PlanactError::InvariantViolation(format!(
                        "moving {} under {} would create a cycle",
                        node.code, parent.code
                    )));
                }
                if !parent.can_have_children() {
                    return Err(PlanactError::InvariantViolation(format!(
                        "parent {} is at the maximum level ({}) and cannot have children",
                        parent.code,
                        codes::MAX_LEVEL
                    )));
                }
                Some(parent)
            }
            None => None,
        };

        // The whole subtree shifts down with the node; its deepest level must
        // still clear the ceiling.
        let height = self.subtree_height(&node.id)?;
        let new_level = codes::derive_level(new_parent.as_ref());
        if new_level + height - 1 > codes::MAX_LEVEL {
            return Err(PlanactError::InvariantViolation(format!(
                "moving {} would push its subtree past the maximum level ({})",
                node.code,
                codes::MAX_LEVEL
            )));
        }

        let old_parent_id = node.parent_id.clone();
        let new_siblings = self.sibling_set(&node.plan_id, new_parent_id)?;
        node.parent_id = new_parent_id.map(|s| s.to_string());
        node.code = codes::allocate(self.store, new_parent.as_ref(), &new_siblings)?;
        node.level = new_level;
        node.ordinal = self.next_ordinal(&node.plan_id, new_parent_id)?;
        node.updated_at = now_epoch_z();
        self.store.save(&node)?;
        self.recode_children(&node)?;

        let mut old_set = self.sibling_set(&node.plan_id, old_parent_id.as_deref())?;
        weights::redistribute(self.store, &mut old_set)?;
        let mut new_set = self.sibling_set(&node.plan_id, new_parent_id)?;
        weights::redistribute(self.store, &mut new_set)?;

        self.require(&node.id)
    }

    /// Reassigns codes and levels below a moved node so every descendant's
    /// code keeps the prefix chain. Sibling sets below the moved node do not
    /// change membership, so weights and ordinals stay as they are.
    fn recode_children(&self, parent: &VariableAction) -> Result<(), PlanactError> {
        let children = self.store.children_of(&parent.id)?;
        let mut placed: Vec<VariableAction> = Vec::new();
        for mut child in children {
            child.code = codes::allocate(self.store, Some(parent), &placed)?;
            child.level = parent.level + 1;
            child.updated_at = now_epoch_z();
            self.store.save(&child)?;
            self.recode_children(&child)?;
            placed.push(child);
        }
        Ok(())
    }

    /// Walks `candidate`'s ancestor chain looking for `of_id`.
    fn is_descendant(
        &self,
        candidate: &VariableAction,
        of_id: &str,
    ) -> Result<bool, PlanactError> {
        let mut current = candidate.parent_id.clone();
        while let Some(pid) = current {
            if pid == of_id {
                return Ok(true);
            }
            current = self.require(&pid)?.parent_id;
        }
        Ok(false)
    }

    fn subtree_height(&self, id: &str) -> Result<i64, PlanactError> {
        let children = self.store.children_of(id)?;
        let mut deepest = 0;
        for child in children {
            deepest = deepest.max(self.subtree_height(&child.id)?);
        }
        Ok(1 + deepest)
    }
}

fn frozen_label(frozen: bool) -> &'static str {
    if frozen { "frozen" } else { "not frozen" }
}

fn build_node(
    action: VariableAction,
    by_parent: &mut FxHashMap<String, Vec<VariableAction>>,
) -> VariableNode {
    let mut children = by_parent.remove(&action.id).unwrap_or_default();
    children.sort_by_key(|c| c.ordinal);
    VariableNode {
        action,
        children: children
            .into_iter()
            .map(|c| build_node(c, by_parent))
            .collect(),
    }
}
