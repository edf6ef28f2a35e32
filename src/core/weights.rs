//! Equal-weight redistribution over a sibling set.
//!
//! Weights are meaningful only relative to siblings and must sum to 100 per
//! set after any mutation that touches the set. The share is the same
//! repeating decimal for every member; equality across siblings is the
//! contract, not equality to a terminating decimal.

use crate::core::error::PlanactError;
use crate::core::model::VariableAction;
use crate::core::store::TreeStore;
use crate::core::time::now_epoch_z;

pub fn equal_share(count: usize) -> f64 {
    100.0 / count as f64
}

/// Assigns `100 / k` to every member of `siblings` and persists each one.
/// The caller passes the set as it stands *after* the pending mutation (new
/// node included, removed node excluded). An empty set is a no-op.
pub fn redistribute(
    store: &dyn TreeStore,
    siblings: &mut [VariableAction],
) -> Result<(), PlanactError> {
    if siblings.is_empty() {
        return Ok(());
    }
    let share = equal_share(siblings.len());
    let ts = now_epoch_z();
    for sibling in siblings.iter_mut() {
        sibling.weight = share;
        sibling.updated_at = ts.clone();
        store.save(sibling)?;
    }
    Ok(())
}
