use planact::core::audit::{self, AuditEntry};
use planact::core::db;
use planact::core::error::PlanactError;
use planact::core::hierarchy::CreateVariable;
use planact::plugins::plan::{add_plan, get_plan, list_plans};
use planact::plugins::variable::{create_variable, delete_variable, move_variable};
use std::fs;
use tempfile::tempdir;

fn root_req(plan_id: &str, description: &str) -> CreateVariable {
    CreateVariable {
        plan_id: plan_id.to_string(),
        parent_id: None,
        description: description.to_string(),
        frozen: false,
        responsible: None,
    }
}

#[test]
fn init_is_idempotent_and_sets_pragmas() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();

    db::initialize_plan_db(root).expect("first init");
    db::initialize_plan_db(root).expect("second init is safe");
    assert!(db::plan_db_path(root).exists());

    let conn = db::connect_plan_db(root).expect("connect");
    let fk_on: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .expect("pragma foreign_keys");
    assert_eq!(fk_on, 1);

    let version: String = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .expect("schema_version present");
    assert!(version.parse::<u32>().unwrap() >= 1);
}

#[test]
fn plan_round_trip_with_audit() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    db::initialize_plan_db(root).unwrap();

    let plan = add_plan(root, "Security program", "annual goals", "u1").unwrap();
    let fetched = get_plan(root, &plan.id).unwrap();
    assert_eq!(fetched.title, "Security program");
    assert!(!fetched.locked);

    let all = list_plans(root).unwrap();
    assert_eq!(all.len(), 1);

    let conn = db::connect_plan_db(root).unwrap();
    let trail = audit::audits_for_entity(&conn, "PlanAction", &plan.id).unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, "plan_created");
    assert_eq!(trail[0].actor_id, "u1");

    assert!(matches!(
        get_plan(root, "missing"),
        Err(PlanactError::NotFound(_))
    ));
}

#[test]
fn audit_table_and_event_log_agree() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    db::initialize_plan_db(root).unwrap();

    let plan = add_plan(root, "P", "", "u1").unwrap();
    let node = create_variable(root, &root_req(&plan.id, "Security"), "u2").unwrap();

    let conn = db::connect_plan_db(root).unwrap();
    let trail = audit::audits_for_entity(&conn, "VariableAction", &node.id).unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, "variable_created");
    assert_eq!(trail[0].actor_id, "u2");
    assert!(trail[0].details.contains("VA1"));
    assert!(!trail[0].details.contains("frozen"));

    let log_path = root.join("planact.events.jsonl");
    let logged: Vec<AuditEntry> = fs::read_to_string(&log_path)
        .expect("event log exists")
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid audit json"))
        .collect();
    let from_log = logged
        .iter()
        .find(|e| e.entity_id == node.id)
        .expect("creation event in log");
    assert_eq!(from_log.id, trail[0].id);
    assert_eq!(from_log.details, trail[0].details);
}

#[test]
fn code_allocation_is_globally_unique_across_plans() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    db::initialize_plan_db(root).unwrap();

    let plan_a = add_plan(root, "A", "", "u1").unwrap();
    let plan_b = add_plan(root, "B", "", "u1").unwrap();

    let a1 = create_variable(root, &root_req(&plan_a.id, "a1"), "u1").unwrap();
    assert_eq!(a1.code, "VA1");

    // Plan B has no roots of its own, but VA1 is taken system-wide; the
    // allocator steps past the collision.
    let b1 = create_variable(root, &root_req(&plan_b.id, "b1"), "u1").unwrap();
    assert_eq!(b1.code, "VA2");
}

#[test]
fn failures_are_specific_and_actionable() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    db::initialize_plan_db(root).unwrap();
    let plan = add_plan(root, "P", "", "u1").unwrap();

    let missing_plan = create_variable(root, &root_req("nope", "x"), "u1");
    match missing_plan {
        Err(PlanactError::NotFound(msg)) => assert!(msg.contains("nope")),
        other => panic!("expected NotFound, got {:?}", other.map(|n| n.code)),
    }

    let node = create_variable(root, &root_req(&plan.id, "a"), "u1").unwrap();
    let self_parent = move_variable(root, &node.id, Some(&node.id), "u1");
    match self_parent {
        Err(PlanactError::InvariantViolation(msg)) => {
            assert!(msg.contains("own parent"), "msg: {}", msg)
        }
        other => panic!("expected InvariantViolation, got {:?}", other.map(|n| n.code)),
    }

    assert!(matches!(
        delete_variable(root, "missing", "u1"),
        Err(PlanactError::NotFound(_))
    ));
}

#[test]
fn failed_mutation_persists_nothing() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    db::initialize_plan_db(root).unwrap();
    let plan = add_plan(root, "P", "", "u1").unwrap();

    let before = create_variable(root, &root_req(&plan.id, "only"), "u1").unwrap();
    // Invalid move: no rows or audit entries may survive the rollback.
    assert!(move_variable(root, &before.id, Some(&before.id), "u1").is_err());

    let conn = db::connect_plan_db(root).unwrap();
    let nodes: i64 = conn
        .query_row("SELECT COUNT(*) FROM variable_actions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(nodes, 1);
    let moves: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM audits WHERE action = 'variable_moved'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(moves, 0);
}
