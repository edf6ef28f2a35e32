//! SQL schema constants for the plan database.
//!
//! One database holds all three tables: `plans` (owning aggregates),
//! `variable_actions` (the tree), and `audits` (the mutation trail).
//! `meta.schema_version` gates migrations the same way every other table
//! bump does.

pub const PLAN_DB_NAME: &str = "planact.db";
pub const PLAN_EVENTS_NAME: &str = "planact.events.jsonl";
pub const PLAN_SCHEMA_VERSION: u32 = 1;

pub const PLAN_DB_SCHEMA_META: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

pub const PLAN_DB_SCHEMA_PLANS: &str = "
    CREATE TABLE IF NOT EXISTS plans (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT DEFAULT '',
        locked INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
";

// parent_id cascade is the engine's delete contract: removing a node removes
// its whole subtree. UNIQUE(code) backs the global code-uniqueness policy
// under concurrent writers.
pub const PLAN_DB_SCHEMA_VARIABLE_ACTIONS: &str = "
    CREATE TABLE IF NOT EXISTS variable_actions (
        id TEXT PRIMARY KEY,
        description TEXT NOT NULL,
        code TEXT NOT NULL UNIQUE,
        level INTEGER NOT NULL,
        weight REAL NOT NULL,
        frozen INTEGER NOT NULL DEFAULT 0,
        ordinal INTEGER NOT NULL,
        parent_id TEXT,
        plan_id TEXT NOT NULL,
        responsible TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY(parent_id) REFERENCES variable_actions(id) ON DELETE CASCADE,
        FOREIGN KEY(plan_id) REFERENCES plans(id) ON DELETE CASCADE
    )
";

// High-water mark of ordinals handed out per sibling set (scope is the
// parent id, or `plan:<id>` for a root set). Ordinal slots are never reused,
// even after the node that held the set's maximum is deleted or moved away.
pub const PLAN_DB_SCHEMA_ORDINAL_MARKS: &str = "
    CREATE TABLE IF NOT EXISTS ordinal_marks (
        scope TEXT PRIMARY KEY,
        last INTEGER NOT NULL
    )
";

pub const PLAN_DB_SCHEMA_AUDITS: &str = "
    CREATE TABLE IF NOT EXISTS audits (
        id TEXT PRIMARY KEY,
        ts TEXT NOT NULL,
        action TEXT NOT NULL,
        entity_type TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        actor_id TEXT NOT NULL,
        details TEXT NOT NULL
    )
";

pub const PLAN_DB_SCHEMA_INDEX_VA_PARENT: &str =
    "CREATE INDEX IF NOT EXISTS idx_va_parent ON variable_actions(parent_id)";
pub const PLAN_DB_SCHEMA_INDEX_VA_PLAN: &str =
    "CREATE INDEX IF NOT EXISTS idx_va_plan ON variable_actions(plan_id)";
pub const PLAN_DB_SCHEMA_INDEX_AUDITS_ENTITY: &str =
    "CREATE INDEX IF NOT EXISTS idx_audits_entity ON audits(entity_type, entity_id)";
