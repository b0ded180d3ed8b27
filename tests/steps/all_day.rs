use proptest::prelude::*;
use rusqlite::types::Value;
use std::collections::BTreeMap;
use taskdb::core::memory::MemoryStore;
use taskdb::core::migration::builtin_registry;
use taskdb::core::schemas::{TASKS, tasks};
use taskdb::core::sqlite::SqliteStore;
use taskdb::core::store::{Predicate, Session, VersionedStore};
use taskdb::core::task::AllDayFlag;
use taskdb::upgrade;

const LIST_ID: i64 = 7;

fn tz(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::Text(s.to_string()))
}

/// Insert `(is_allday, tz)` rows in one committed session; returns their ids.
fn seed<S: VersionedStore>(store: &mut S, rows: &[(Value, Value)]) -> Vec<i64> {
    let mut session = store.begin_exclusive_session().expect("session");
    let ids = rows
        .iter()
        .map(|(all_day, zone)| {
            session
                .insert_row(
                    TASKS,
                    &[
                        (tasks::LIST_ID, Value::Integer(LIST_ID)),
                        (tasks::IS_ALLDAY, all_day.clone()),
                        (tasks::TZ, zone.clone()),
                    ],
                )
                .expect("insert task")
        })
        .collect();
    session.commit().expect("commit seed");
    ids
}

/// `_id -> (is_allday, tz)` as currently stored.
fn snapshot<S: VersionedStore>(store: &mut S) -> BTreeMap<i64, (Value, Value)> {
    let mut session = store.begin_exclusive_session().expect("session");
    session
        .select_rows(TASKS, &Predicate::All)
        .expect("select tasks")
        .into_iter()
        .map(|row| {
            (
                row.id,
                (row.get(tasks::IS_ALLDAY).clone(), row.get(tasks::TZ).clone()),
            )
        })
        .collect()
}

fn sqlite_at_19() -> SqliteStore {
    let mut store = SqliteStore::open_in_memory().expect("open");
    store.initialize().expect("initialize");
    upgrade(&mut store, 19).expect("upgrade to 19");
    store
}

fn memory_at_19() -> MemoryStore {
    let mut store = MemoryStore::new();
    upgrade(&mut store, 19).expect("upgrade to 19");
    store
}

fn reference_rows() -> Vec<(Value, Value)> {
    vec![
        (AllDayFlag::Yes.to_stored(), tz(Some("UTC"))),
        (AllDayFlag::Yes.to_stored(), tz(Some("Europe/Berlin"))),
        (AllDayFlag::Yes.to_stored(), tz(None)),
        (AllDayFlag::No.to_stored(), tz(Some("Europe/Paris"))),
        (AllDayFlag::Unset.to_stored(), tz(Some("America/Chicago"))),
        (AllDayFlag::Unset.to_stored(), tz(None)),
    ]
}

fn expected_reference_zones() -> Vec<Value> {
    vec![
        Value::Null,
        Value::Null,
        Value::Null,
        tz(Some("Europe/Paris")),
        tz(Some("America/Chicago")),
        Value::Null,
    ]
}

fn zones_in_order<S: VersionedStore>(store: &mut S, ids: &[i64]) -> Vec<Value> {
    let snap = snapshot(store);
    ids.iter().map(|id| snap[id].1.clone()).collect()
}

#[test]
fn all_day_tasks_lose_their_time_zone_on_sqlite() {
    let mut store = sqlite_at_19();
    let ids = seed(&mut store, &reference_rows());

    upgrade(&mut store, 20).expect("upgrade to 20");

    assert_eq!(store.current_version().unwrap(), 20);
    assert_eq!(zones_in_order(&mut store, &ids), expected_reference_zones());
}

#[test]
fn all_day_tasks_lose_their_time_zone_in_memory() {
    let mut store = memory_at_19();
    let ids = seed(&mut store, &reference_rows());

    upgrade(&mut store, 20).expect("upgrade to 20");

    assert_eq!(store.current_version().unwrap(), 20);
    assert_eq!(zones_in_order(&mut store, &ids), expected_reference_zones());
}

#[test]
fn row_identity_and_other_columns_survive() {
    let mut store = sqlite_at_19();
    let ids = seed(&mut store, &reference_rows());
    upgrade(&mut store, 20).expect("upgrade to 20");

    let mut session = store.begin_exclusive_session().unwrap();
    let rows = session.select_rows(TASKS, &Predicate::All).unwrap();
    let after: Vec<i64> = rows.iter().map(|r| r.id).collect();
    assert_eq!(after, ids);
    for row in &rows {
        assert_eq!(row.get_i64(tasks::LIST_ID), Some(LIST_ID));
    }
}

#[test]
fn step_applied_twice_matches_applied_once() {
    let registry = builtin_registry().unwrap();
    let step = registry.step_from(19).expect("19 -> 20 step");
    assert_eq!(step.to_version, 20);

    let mut store = memory_at_19();
    seed(&mut store, &reference_rows());

    let mut session = store.begin_exclusive_session().unwrap();
    step.run(&mut session).expect("first run");
    let once = session.select_rows(TASKS, &Predicate::All).unwrap();
    step.run(&mut session).expect("second run");
    let twice = session.select_rows(TASKS, &Predicate::All).unwrap();
    assert_eq!(once, twice);
    session.commit().unwrap();
}

#[test]
fn second_pass_writes_nothing() {
    let registry = builtin_registry().unwrap();
    let step = registry.step_from(19).expect("19 -> 20 step");

    let mut store = memory_at_19();
    seed(&mut store, &reference_rows());
    {
        let mut session = store.begin_exclusive_session().unwrap();
        step.run(&mut session).unwrap();
        session.commit().unwrap();
    }
    let writes = store.row_writes();
    let mut session = store.begin_exclusive_session().unwrap();
    step.run(&mut session).unwrap();
    session.commit().unwrap();
    assert_eq!(store.row_writes(), writes);
}

#[test]
fn integer_markers_count_as_all_day() {
    let mut store = memory_at_19();
    let ids = seed(
        &mut store,
        &[
            (Value::Integer(1), tz(Some("UTC"))),
            (Value::Integer(0), tz(Some("UTC"))),
            (Value::Text("true".to_string()), tz(Some("UTC"))),
        ],
    );
    upgrade(&mut store, 20).unwrap();
    assert_eq!(
        zones_in_order(&mut store, &ids),
        vec![Value::Null, tz(Some("UTC")), tz(Some("UTC"))]
    );
}

fn arb_all_day() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Text("1".to_string())),
        Just(Value::Text("0".to_string())),
        Just(Value::Integer(1)),
        Just(Value::Integer(0)),
        Just(Value::Null),
        Just(Value::Text("yes".to_string())),
        Just(Value::Integer(2)),
    ]
}

fn arb_tz() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        "[A-Za-z_]{1,12}(/[A-Za-z_]{1,12})?".prop_map(Value::Text),
    ]
}

fn arb_rows() -> impl Strategy<Value = Vec<(Value, Value)>> {
    proptest::collection::vec((arb_all_day(), arb_tz()), 0..24)
}

fn check_postcondition(
    before: &BTreeMap<i64, (Value, Value)>,
    after: &BTreeMap<i64, (Value, Value)>,
) -> Result<(), TestCaseError> {
    prop_assert_eq!(before.len(), after.len());
    for (id, (all_day, zone_before)) in before {
        let (all_day_after, zone_after) = &after[id];
        prop_assert_eq!(all_day, all_day_after);
        if AllDayFlag::from_stored(all_day).is_all_day() {
            prop_assert_eq!(zone_after, &Value::Null);
        } else {
            prop_assert_eq!(zone_after, zone_before);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn only_all_day_rows_change_in_memory(rows in arb_rows()) {
        let mut store = memory_at_19();
        seed(&mut store, &rows);
        let before = snapshot(&mut store);
        upgrade(&mut store, 20).unwrap();
        check_postcondition(&before, &snapshot(&mut store))?;
    }

    #[test]
    fn only_all_day_rows_change_on_sqlite(rows in arb_rows()) {
        let mut store = sqlite_at_19();
        seed(&mut store, &rows);
        let before = snapshot(&mut store);
        upgrade(&mut store, 20).unwrap();
        check_postcondition(&before, &snapshot(&mut store))?;
    }

    #[test]
    fn insertion_order_does_not_matter(rows in arb_rows()) {
        let mut forward = memory_at_19();
        let forward_ids = seed(&mut forward, &rows);
        upgrade(&mut forward, 20).unwrap();

        let reversed_rows: Vec<_> = rows.iter().rev().cloned().collect();
        let mut backward = memory_at_19();
        let mut backward_ids = seed(&mut backward, &reversed_rows);
        upgrade(&mut backward, 20).unwrap();
        backward_ids.reverse();

        prop_assert_eq!(
            zones_in_order(&mut forward, &forward_ids),
            zones_in_order(&mut backward, &backward_ids)
        );
    }
}
