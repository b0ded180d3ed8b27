use rusqlite::types::Value;
use taskdb::core::error::{MigrationError, StoreError};
use taskdb::core::memory::MemoryStore;
use taskdb::core::migration::{MigrationEngine, StepRegistry, UpgradeStep, builtin_registry};
use taskdb::core::schemas::{self, TASKS, tasks};
use taskdb::core::sqlite::SqliteStore;
use taskdb::core::store::{ColumnSpec, Predicate, RowView, Session, TableSpec, VersionedStore};
use taskdb::upgrade;

const STEP_LOG: &str = "StepLog";

fn step_log_table() -> TableSpec {
    TableSpec {
        name: STEP_LOG,
        columns: vec![ColumnSpec::row_id(schemas::ROW_ID), ColumnSpec::text("step")],
    }
}

fn log_step(session: &mut dyn Session, name: &str) -> Result<(), StoreError> {
    session.create_table(&step_log_table())?;
    session.insert_row(STEP_LOG, &[("step", Value::Text(name.to_string()))])?;
    Ok(())
}

fn step_a(session: &mut dyn Session) -> Result<(), StoreError> {
    // the target version is stamped only after every step ran
    if session.version()? != 0 {
        return Err(StoreError::ConstraintViolation("version stamped early".to_string()));
    }
    log_step(session, "a")
}

fn step_b(session: &mut dyn Session) -> Result<(), StoreError> {
    log_step(session, "b")
}

fn step_c(session: &mut dyn Session) -> Result<(), StoreError> {
    log_step(session, "c")
}

fn touch_then_fail(session: &mut dyn Session) -> Result<(), StoreError> {
    for row in session.select_rows(TASKS, &Predicate::All)? {
        session.update_column(TASKS, row.id, tasks::TITLE, Value::Text("touched".to_string()))?;
    }
    Err(StoreError::ConstraintViolation("injected failure".to_string()))
}

fn write_to_missing_table(session: &mut dyn Session) -> Result<(), StoreError> {
    session.update_column("NoSuchTable", 1, tasks::TITLE, Value::Null)
}

fn noop(_: &mut dyn Session) -> Result<(), StoreError> {
    Ok(())
}

fn clear_all_day_zones() -> UpgradeStep {
    *builtin_registry()
        .unwrap()
        .step_from(19)
        .expect("19 -> 20 step")
}

fn logged_steps<S: VersionedStore>(store: &mut S) -> Vec<String> {
    let mut session = store.begin_exclusive_session().unwrap();
    if !session.has_table(STEP_LOG).unwrap() {
        return Vec::new();
    }
    session
        .select_rows(STEP_LOG, &Predicate::All)
        .unwrap()
        .iter()
        .filter_map(|r| r.get_text("step").map(str::to_string))
        .collect()
}

fn tasks_of<S: VersionedStore>(store: &mut S) -> Vec<RowView> {
    let mut session = store.begin_exclusive_session().unwrap();
    session.select_rows(TASKS, &Predicate::All).unwrap()
}

fn seed_tasks<S: VersionedStore>(store: &mut S) {
    let mut session = store.begin_exclusive_session().unwrap();
    for (all_day, zone) in [("1", "UTC"), ("0", "Europe/Paris")] {
        session
            .insert_row(
                TASKS,
                &[
                    (tasks::LIST_ID, Value::Integer(1)),
                    (tasks::TITLE, Value::Text("original".to_string())),
                    (tasks::IS_ALLDAY, Value::Text(all_day.to_string())),
                    (tasks::TZ, Value::Text(zone.to_string())),
                ],
            )
            .unwrap();
    }
    session.commit().unwrap();
}

fn memory_at_19() -> MemoryStore {
    let mut store = MemoryStore::new();
    upgrade(&mut store, 19).unwrap();
    seed_tasks(&mut store);
    store
}

#[test]
fn steps_run_in_ascending_order_whatever_the_registration_order() {
    let registry = StepRegistry::new(vec![
        UpgradeStep::new(2, 3, "c", step_c),
        UpgradeStep::new(0, 1, "a", step_a),
        UpgradeStep::new(1, 2, "b", step_b),
    ])
    .unwrap();
    let engine = MigrationEngine::new(&registry);

    let mut memory = MemoryStore::empty();
    engine.upgrade(&mut memory, 3).unwrap();
    assert_eq!(memory.current_version().unwrap(), 3);
    assert_eq!(logged_steps(&mut memory), vec!["a", "b", "c"]);
    assert_eq!(memory.sessions_opened(), 2, "one migration session plus the read");

    let mut sqlite = SqliteStore::open_in_memory().unwrap();
    engine.upgrade(&mut sqlite, 3).unwrap();
    assert_eq!(sqlite.current_version().unwrap(), 3);
    assert_eq!(logged_steps(&mut sqlite), vec!["a", "b", "c"]);
}

#[test]
fn upgrade_to_current_version_touches_nothing() {
    let mut store = memory_at_19();
    let sessions = store.sessions_opened();
    let writes = store.row_writes();

    upgrade(&mut store, 19).unwrap();

    assert_eq!(store.current_version().unwrap(), 19);
    assert_eq!(store.sessions_opened(), sessions);
    assert_eq!(store.row_writes(), writes);
}

#[test]
fn downgrade_is_rejected_without_opening_a_session() {
    let mut store = memory_at_19();
    let sessions = store.sessions_opened();

    let err = upgrade(&mut store, 12).unwrap_err();

    assert!(
        matches!(
            err,
            MigrationError::DowngradeNotSupported {
                current: 19,
                target: 12
            }
        ),
        "{err}"
    );
    assert_eq!(store.current_version().unwrap(), 19);
    assert_eq!(store.sessions_opened(), sessions);
}

#[test]
fn missing_step_is_reported_before_anything_changes() {
    let registry = StepRegistry::new(vec![
        UpgradeStep::new(18, 19, "earlier", noop),
        UpgradeStep::new(20, 21, "later", noop),
    ])
    .unwrap();
    let mut store = memory_at_19();
    let before = tasks_of(&mut store);
    let sessions = store.sessions_opened();

    let err = MigrationEngine::new(&registry)
        .upgrade(&mut store, 21)
        .unwrap_err();

    assert!(matches!(err, MigrationError::MissingUpgradePath(20)), "{err}");
    assert!(err.is_path_error());
    assert_eq!(store.sessions_opened(), sessions);
    assert_eq!(store.current_version().unwrap(), 19);
    assert_eq!(tasks_of(&mut store), before);
}

#[test]
fn failing_step_discards_every_step_of_the_call_in_memory() {
    let registry = StepRegistry::new(vec![
        clear_all_day_zones(),
        UpgradeStep::new(20, 21, "touch then fail", touch_then_fail),
    ])
    .unwrap();
    let mut store = memory_at_19();
    let before = tasks_of(&mut store);
    let writes = store.row_writes();

    let err = MigrationEngine::new(&registry)
        .upgrade(&mut store, 21)
        .unwrap_err();

    match &err {
        MigrationError::StepFailed {
            from, to, cause, ..
        } => {
            assert_eq!((*from, *to), (20, 21));
            assert!(matches!(cause, StoreError::ConstraintViolation(_)), "{cause}");
        }
        other => panic!("expected StepFailed, got {other}"),
    }
    assert_eq!(store.current_version().unwrap(), 19);
    assert_eq!(store.row_writes(), writes);
    let after = tasks_of(&mut store);
    assert_eq!(after, before);
    assert_eq!(after[0].get_text(tasks::TZ), Some("UTC"));
}

#[test]
fn failing_step_rolls_back_the_sqlite_transaction() {
    let registry = StepRegistry::new(vec![
        clear_all_day_zones(),
        UpgradeStep::new(20, 21, "write to a missing table", write_to_missing_table),
    ])
    .unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.initialize().unwrap();
    upgrade(&mut store, 19).unwrap();
    seed_tasks(&mut store);
    let before = tasks_of(&mut store);

    let err = MigrationEngine::new(&registry)
        .upgrade(&mut store, 21)
        .unwrap_err();

    assert!(
        matches!(
            &err,
            MigrationError::StepFailed {
                from: 20,
                to: 21,
                cause: StoreError::UnknownTable(_),
                ..
            }
        ),
        "{err}"
    );
    assert!(err.to_string().contains("20 -> 21"), "{err}");
    assert_eq!(store.current_version().unwrap(), 19);
    assert_eq!(tasks_of(&mut store), before);
}

#[test]
fn retry_after_failure_succeeds_once_the_step_is_fixed() {
    let broken = StepRegistry::new(vec![
        clear_all_day_zones(),
        UpgradeStep::new(20, 21, "touch then fail", touch_then_fail),
    ])
    .unwrap();
    let fixed = StepRegistry::new(vec![
        clear_all_day_zones(),
        UpgradeStep::new(20, 21, "noop", noop),
    ])
    .unwrap();
    let mut store = memory_at_19();

    assert!(MigrationEngine::new(&broken).upgrade(&mut store, 21).is_err());
    MigrationEngine::new(&fixed).upgrade(&mut store, 21).unwrap();

    assert_eq!(store.current_version().unwrap(), 21);
    let rows = tasks_of(&mut store);
    assert_eq!(rows[0].get(tasks::TZ), &Value::Null);
    assert_eq!(rows[1].get_text(tasks::TZ), Some("Europe/Paris"));
    assert_eq!(rows[0].get_text(tasks::TITLE), Some("original"));
}

#[test]
fn upgrade_past_the_registry_is_a_missing_path() {
    let mut store = MemoryStore::new();
    let err = upgrade(&mut store, schemas::LATEST_VERSION + 1).unwrap_err();
    assert!(
        matches!(err, MigrationError::MissingUpgradePath(v) if v == schemas::LATEST_VERSION),
        "{err}"
    );
    assert_eq!(store.current_version().unwrap(), schemas::BASE_VERSION);
}

#[test]
fn conflicting_registrations_fail_at_construction() {
    let err = StepRegistry::new(vec![
        clear_all_day_zones(),
        UpgradeStep::new(19, 21, "overlaps", noop),
    ])
    .unwrap_err();
    assert!(matches!(err, MigrationError::ConflictingUpgradeSteps(19)), "{err}");
    assert!(err.is_path_error());
}
