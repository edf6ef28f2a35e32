//! Hierarchical code allocation.
//!
//! Codes look like `VA1`, `VA12`, `VA121`: the root prefix plus one numeric
//! segment per tree level. Allocation scans the sibling set for the highest
//! numeric suffix under the prefix, proposes max+1, and steps past any code
//! already taken elsewhere in the store. The store check is the only impure
//! part; persistence stays with the mutator.

use crate::core::error::PlanactError;
use crate::core::model::VariableAction;
use crate::core::store::TreeStore;

/// Root code prefix; children use their parent's full code as prefix.
pub const CODE_PREFIX: &str = "VA";

/// A node may acquire children only while its level is below this ceiling.
pub const MAX_LEVEL: i64 = 15;

/// Leading decimal run of `code` after `prefix`. Codes that do not carry the
/// prefix, or whose remainder does not start with a digit, count as 0 and are
/// ignored for max-finding.
pub fn numeric_suffix(code: &str, prefix: &str) -> i64 {
    let Some(rest) = code.strip_prefix(prefix) else {
        return 0;
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Next available code under `parent` (or the root prefix), given the current
/// sibling set. Collision-safe: the candidate is checked against the whole
/// store, not just the siblings, and incremented until unused.
pub fn allocate(
    store: &dyn TreeStore,
    parent: Option<&VariableAction>,
    siblings: &[VariableAction],
) -> Result<String, PlanactError> {
    let prefix = match parent {
        Some(p) => p.code.as_str(),
        None => CODE_PREFIX,
    };

    let max_used = siblings
        .iter()
        .map(|s| numeric_suffix(&s.code, prefix))
        .max()
        .unwrap_or(0);

    let mut n = max_used + 1;
    loop {
        let candidate = format!("{}{}", prefix, n);
        if !store.code_exists(&candidate)? {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Depth encoded by a node's position: 1 for roots, parent + 1 below.
pub fn derive_level(parent: Option<&VariableAction>) -> i64 {
    match parent {
        Some(p) => p.level + 1,
        None => 1,
    }
}
