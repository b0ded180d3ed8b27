//! Event stamps and the JSON envelope printed by `taskdb --format json`.
//!
//! Audit events and command envelopes carry the same `ts` / `event_id` pair,
//! so a CLI response can be matched with the audit line it produced.

use serde::{Deserialize, Serialize};
use std::path::Path;
use ulid::Ulid;

/// Unix-epoch seconds with a `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{secs}Z")
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// When something happened and a unique id for it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EventStamp {
    pub ts: String,
    pub event_id: String,
}

impl EventStamp {
    pub fn now() -> Self {
        Self {
            ts: now_epoch_z(),
            event_id: new_event_id(),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Ok,
    Error,
}

/// JSON response of one CLI command: stamp, command name, outcome, the
/// database it ran against (if any), then the command's own fields.
#[derive(Serialize, Debug)]
pub struct CommandEnvelope<'a, T: Serialize> {
    #[serde(flatten)]
    pub stamp: EventStamp,
    pub cmd: &'a str,
    pub status: EnvelopeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<&'a Path>,
    #[serde(flatten)]
    pub body: T,
}

impl<'a, T: Serialize> CommandEnvelope<'a, T> {
    pub fn ok(cmd: &'a str, db: Option<&'a Path>, body: T) -> Self {
        Self::new(cmd, EnvelopeStatus::Ok, db, body)
    }

    pub fn error(cmd: &'a str, db: Option<&'a Path>, body: T) -> Self {
        Self::new(cmd, EnvelopeStatus::Error, db, body)
    }

    fn new(cmd: &'a str, status: EnvelopeStatus, db: Option<&'a Path>, body: T) -> Self {
        Self {
            stamp: EventStamp::now(),
            cmd,
            status,
            db,
            body,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
