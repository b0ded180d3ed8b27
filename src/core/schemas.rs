//! Table and column names of the task store, plus the first-ever schema.
//!
//! Names are the stored external format and must not change: rows written by
//! older software are read back through exactly these identifiers.

use crate::core::store::{ColumnSpec, TableSpec};

pub const TASKS_DB_NAME: &str = "tasks.db";

/// Version stamped on a freshly initialized store.
pub const BASE_VERSION: u32 = 1;

/// Version the running software expects; the built-in registry tiles
/// `[BASE_VERSION, LATEST_VERSION)`.
pub const LATEST_VERSION: u32 = 22;

/// Primary key column shared by every table.
pub const ROW_ID: &str = "_id";

// --- Lists ---
pub const LISTS: &str = "Lists";

pub mod lists {
    pub const ACCOUNT_NAME: &str = "account_name";
    pub const ACCOUNT_TYPE: &str = "account_type";
    pub const LIST_NAME: &str = "list_name";
    pub const LIST_COLOR: &str = "list_color";
    pub const VISIBLE: &str = "visible";
    pub const SYNC_ENABLED: &str = "sync_enabled";
    pub const OWNER: &str = "list_owner";
    pub const DIRTY: &str = "_dirty";
    pub const SYNC_ID: &str = "_sync_id";

    /// Account type of lists that are never synced.
    pub const LOCAL_ACCOUNT_TYPE: &str = "org.dmfs.account.LOCAL";
    /// Account type used for local lists before version 12.
    pub const LEGACY_LOCAL_ACCOUNT_TYPE: &str = "LOCAL";
}

// --- Tasks ---
pub const TASKS: &str = "Tasks";

pub mod tasks {
    pub const LIST_ID: &str = "list_id";
    pub const TITLE: &str = "title";
    pub const LOCATION: &str = "location";
    pub const DESCRIPTION: &str = "description";
    pub const PRIORITY: &str = "priority";
    pub const STATUS: &str = "status";
    pub const DTSTART: &str = "dtstart";
    pub const DUE: &str = "due";
    pub const DURATION: &str = "duration";
    pub const IS_ALLDAY: &str = "is_allday";
    pub const TZ: &str = "tz";
    pub const COMPLETED: &str = "completed";
    pub const PERCENT_COMPLETE: &str = "percent_complete";
    pub const RRULE: &str = "rrule";
    pub const DIRTY: &str = "_dirty";
    pub const DELETED: &str = "_deleted";
    pub const SYNC_ID: &str = "_sync_id";

    // v2
    pub const IS_NEW: &str = "is_new";
    pub const IS_CLOSED: &str = "is_closed";
    // v6
    pub const PARENT_ID: &str = "parent_id";
    pub const HAS_ALARMS: &str = "has_alarms";
    pub const SORTING: &str = "sorting";
    // v11
    pub const UID: &str = "_uid";
    pub const PINNED: &str = "pinned";
    pub const HAS_PROPERTIES: &str = "has_properties";
    // v22
    pub const VERSION: &str = "version";

    pub const STATUS_NEEDS_ACTION: i64 = 0;
    pub const STATUS_IN_PROCESS: i64 = 1;
    pub const STATUS_COMPLETED: i64 = 2;
    pub const STATUS_CANCELLED: i64 = 3;
    pub const STATUS_DEFAULT: i64 = STATUS_NEEDS_ACTION;
}

// --- Instances ---
pub const INSTANCES: &str = "Instances";

pub mod instances {
    pub const TASK_ID: &str = "task_id";
    pub const INSTANCE_START: &str = "instance_start";
    pub const INSTANCE_DUE: &str = "instance_due";
    pub const INSTANCE_DURATION: &str = "instance_duration";
    // v3
    pub const INSTANCE_START_SORTING: &str = "instance_start_sorting";
    pub const INSTANCE_DUE_SORTING: &str = "instance_due_sorting";
    // v17
    pub const INSTANCE_ORIGINAL_TIME: &str = "instance_original_time";
    // v18
    pub const DISTANCE_FROM_CURRENT: &str = "distance_from_current";
}

// --- SyncState (v13) ---
pub const SYNCSTATE: &str = "SyncState";

pub mod syncstate {
    pub const ACCOUNT_NAME: &str = "account_name";
    pub const ACCOUNT_TYPE: &str = "account_type";
    pub const DATA: &str = "data";
}

pub fn base_lists_table() -> TableSpec {
    TableSpec {
        name: LISTS,
        columns: vec![
            ColumnSpec::row_id(ROW_ID),
            ColumnSpec::text(lists::ACCOUNT_NAME),
            ColumnSpec::text(lists::ACCOUNT_TYPE),
            ColumnSpec::text(lists::LIST_NAME),
            ColumnSpec::integer(lists::LIST_COLOR),
            ColumnSpec::integer(lists::VISIBLE),
            ColumnSpec::integer(lists::SYNC_ENABLED),
            ColumnSpec::text(lists::OWNER),
            ColumnSpec::integer(lists::DIRTY).with_default(0i64),
            ColumnSpec::text(lists::SYNC_ID),
        ],
    }
}

pub fn base_tasks_table() -> TableSpec {
    TableSpec {
        name: TASKS,
        columns: vec![
            ColumnSpec::row_id(ROW_ID),
            ColumnSpec::integer(tasks::LIST_ID).required(),
            ColumnSpec::text(tasks::TITLE),
            ColumnSpec::text(tasks::LOCATION),
            ColumnSpec::text(tasks::DESCRIPTION),
            ColumnSpec::integer(tasks::PRIORITY),
            ColumnSpec::integer(tasks::STATUS).with_default(tasks::STATUS_DEFAULT),
            ColumnSpec::integer(tasks::DTSTART),
            ColumnSpec::integer(tasks::DUE),
            ColumnSpec::text(tasks::DURATION),
            ColumnSpec::integer(tasks::IS_ALLDAY),
            ColumnSpec::text(tasks::TZ),
            ColumnSpec::integer(tasks::COMPLETED),
            ColumnSpec::integer(tasks::PERCENT_COMPLETE),
            ColumnSpec::text(tasks::RRULE),
            // a new task is always dirty
            ColumnSpec::integer(tasks::DIRTY).with_default(1i64),
            ColumnSpec::integer(tasks::DELETED).with_default(0i64),
            ColumnSpec::text(tasks::SYNC_ID),
        ],
    }
}

pub fn base_instances_table() -> TableSpec {
    TableSpec {
        name: INSTANCES,
        columns: vec![
            ColumnSpec::row_id(ROW_ID),
            ColumnSpec::integer(instances::TASK_ID).required(),
            ColumnSpec::integer(instances::INSTANCE_START),
            ColumnSpec::integer(instances::INSTANCE_DUE),
            ColumnSpec::integer(instances::INSTANCE_DURATION),
        ],
    }
}

/// Tables of the version-1 schema, in creation order.
pub fn base_schema() -> Vec<TableSpec> {
    vec![base_lists_table(), base_tasks_table(), base_instances_table()]
}

pub fn syncstate_table() -> TableSpec {
    TableSpec {
        name: SYNCSTATE,
        columns: vec![
            ColumnSpec::row_id(ROW_ID),
            ColumnSpec::text(syncstate::ACCOUNT_NAME),
            ColumnSpec::text(syncstate::ACCOUNT_TYPE),
            ColumnSpec::text(syncstate::DATA),
        ],
    }
}
