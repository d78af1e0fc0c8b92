use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::TaskId;
use crate::timer::SessionRecord;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(String);

impl LogId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl From<&str> for LogId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Time spent on a task during one work session.
///
/// `duration` is in minutes and is the authoritative value: it comes from the
/// ticked seconds of the session, not from `end_time - start_time`. It is
/// signed so that damaged records survive loading and can be reported by the
/// statistics instead of failing the whole file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLogEntry {
    pub id: LogId,
    pub user_id: String,
    pub task_id: TaskId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: i64,
}

impl TimeLogEntry {
    pub fn from_session(record: SessionRecord, user_id: impl Into<String>, id: LogId) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            task_id: record.task_id,
            start_time: record.start_time,
            end_time: record.end_time,
            duration: i64::try_from(record.duration_minutes).unwrap_or(i64::MAX),
        }
    }

    /// Duration usable in sums, `None` for negative (corrupt) values.
    pub fn valid_minutes(&self) -> Option<u64> {
        u64::try_from(self.duration).ok()
    }
}
