//! Persistence for tasks and time logs.
//!
//! The statistics and timer code never touch storage directly; callers go
//! through [`TaskStore`] and get committed records back.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};
use crate::time_log::{LogId, TimeLogEntry};
use crate::timer::SessionRecord;

pub trait TaskStore {
    fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>>;

    fn get_task(&self, id: &TaskId) -> Result<Task>;

    fn create_task(&mut self, user_id: &str, draft: TaskDraft, now: DateTime<Utc>)
    -> Result<Task>;

    fn update_task(&mut self, id: &TaskId, patch: TaskPatch) -> Result<Task>;

    /// Removes the task. Its time logs are kept on record but drop out of
    /// `list_time_logs`.
    fn delete_task(&mut self, id: &TaskId) -> Result<Task>;

    /// Logs on tasks that `user_id` still owns. Logs of deleted tasks stay
    /// stored but are no longer listed.
    fn list_time_logs(&self, user_id: &str) -> Result<Vec<TimeLogEntry>>;

    fn create_time_log(&mut self, user_id: &str, record: SessionRecord) -> Result<TimeLogEntry>;
}

/// Records kept in insertion order, the same shape that is written to disk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    time_logs: Vec<TimeLogEntry>,
}

impl MemoryStore {
    fn position(&self, id: &TaskId) -> Result<usize> {
        self.tasks
            .iter()
            .position(|task| &task.id == id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }
}

impl TaskStore for MemoryStore {
    fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .iter()
            .filter(|task| task.user_id == user_id)
            .cloned()
            .collect())
    }

    fn get_task(&self, id: &TaskId) -> Result<Task> {
        let index = self.position(id)?;
        Ok(self.tasks[index].clone())
    }

    fn create_task(
        &mut self,
        user_id: &str,
        draft: TaskDraft,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        let task = Task::from_draft(draft, user_id, TaskId::generate(), now)?;
        self.tasks.push(task.clone());
        Ok(task)
    }

    fn update_task(&mut self, id: &TaskId, patch: TaskPatch) -> Result<Task> {
        let index = self.position(id)?;
        let task = &mut self.tasks[index];
        task.apply(patch)?;
        Ok(task.clone())
    }

    fn delete_task(&mut self, id: &TaskId) -> Result<Task> {
        let index = self.position(id)?;
        Ok(self.tasks.remove(index))
    }

    fn list_time_logs(&self, user_id: &str) -> Result<Vec<TimeLogEntry>> {
        let owned: HashSet<&TaskId> = self
            .tasks
            .iter()
            .filter(|task| task.user_id == user_id)
            .map(|task| &task.id)
            .collect();
        Ok(self
            .time_logs
            .iter()
            .filter(|log| owned.contains(&log.task_id))
            .cloned()
            .collect())
    }

    fn create_time_log(&mut self, user_id: &str, record: SessionRecord) -> Result<TimeLogEntry> {
        if record.end_time < record.start_time {
            return Err(Error::Validation(
                "time log cannot end before it starts".into(),
            ));
        }
        let entry = TimeLogEntry::from_session(record, user_id, LogId::generate());
        self.time_logs.push(entry.clone());
        Ok(entry)
    }
}

/// Whole-state JSON file, rewritten after every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: MemoryStore,
    /// The file on disk could not be parsed and has not been moved aside yet.
    unreadable: bool,
}

impl JsonFileStore {
    /// Opens the file at `path`. A missing or unreadable file starts empty;
    /// nothing is written until the first change, and an unreadable file is
    /// then kept as `<name>.corrupt` next to the new one.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut unreadable = false;
        let data = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str(&raw) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "State file is not valid JSON, starting empty"
                    );
                    unreadable = true;
                    MemoryStore::default()
                }
            }
        } else {
            MemoryStore::default()
        };

        tracing::debug!(
            path = %path.display(),
            tasks = data.tasks.len(),
            time_logs = data.time_logs.len(),
            "Opened state file"
        );
        Ok(Self {
            path,
            data,
            unreadable,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&mut self, data: &MemoryStore) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        if self.unreadable {
            let aside = sibling(&self.path, "corrupt");
            fs::rename(&self.path, &aside)?;
            tracing::warn!(path = %aside.display(), "Moved unreadable state file aside");
            self.unreadable = false;
        }

        // The rename replaces the previous state in one step.
        let temp_path = sibling(&self.path, "tmp");
        let payload = serde_json::to_string_pretty(data)?;
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(payload.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Applies `change` to a copy and keeps it only once it is on disk.
    fn commit<T>(&mut self, change: impl FnOnce(&mut MemoryStore) -> Result<T>) -> Result<T> {
        let mut next = self.data.clone();
        let value = change(&mut next)?;
        self.save(&next)?;
        self.data = next;
        Ok(value)
    }
}

/// `state.json` -> `state.json.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

impl TaskStore for JsonFileStore {
    fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        self.data.list_tasks(user_id)
    }

    fn get_task(&self, id: &TaskId) -> Result<Task> {
        self.data.get_task(id)
    }

    fn create_task(
        &mut self,
        user_id: &str,
        draft: TaskDraft,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        let task = self.commit(|data| data.create_task(user_id, draft, now))?;
        tracing::info!(task_id = %task.id, "Task created");
        Ok(task)
    }

    fn update_task(&mut self, id: &TaskId, patch: TaskPatch) -> Result<Task> {
        self.commit(|data| data.update_task(id, patch))
    }

    fn delete_task(&mut self, id: &TaskId) -> Result<Task> {
        let task = self.commit(|data| data.delete_task(id))?;
        tracing::info!(task_id = %task.id, "Task deleted");
        Ok(task)
    }

    fn list_time_logs(&self, user_id: &str) -> Result<Vec<TimeLogEntry>> {
        self.data.list_time_logs(user_id)
    }

    fn create_time_log(&mut self, user_id: &str, record: SessionRecord) -> Result<TimeLogEntry> {
        let entry = self.commit(|data| data.create_time_log(user_id, record))?;
        tracing::info!(
            log_id = %entry.id,
            task_id = %entry.task_id,
            minutes = entry.duration,
            "Time logged"
        );
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{Period, compute_statistics};
    use crate::task::Status;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 8, 12, 0, 0).unwrap()
    }

    fn record(task_id: &TaskId, minutes: u64) -> SessionRecord {
        SessionRecord {
            task_id: task_id.clone(),
            start_time: now(),
            end_time: now() + Duration::minutes(minutes as i64),
            duration_minutes: minutes,
        }
    }

    #[test]
    fn tasks_are_scoped_to_their_user() {
        let mut store = MemoryStore::default();
        store
            .create_task("ana", TaskDraft::new("Draft slides"), now())
            .unwrap();
        store
            .create_task("ben", TaskDraft::new("Review PR"), now())
            .unwrap();

        let tasks = store.list_tasks("ana").unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Draft slides");
    }

    #[test]
    fn update_returns_committed_task() {
        let mut store = MemoryStore::default();
        let task = store
            .create_task("ana", TaskDraft::new("Draft slides"), now())
            .unwrap();

        let updated = store
            .update_task(&task.id, TaskPatch::status(Status::InProgress))
            .unwrap();
        assert_eq!(updated.status, Status::InProgress);
        assert_eq!(store.get_task(&task.id).unwrap(), updated);
    }

    #[test]
    fn unknown_task_is_reported() {
        let mut store = MemoryStore::default();
        let missing = TaskId::from("missing");

        assert!(matches!(
            store.delete_task(&missing),
            Err(Error::TaskNotFound(_))
        ));
        assert!(matches!(
            store.update_task(&missing, TaskPatch::default()),
            Err(Error::TaskNotFound(_))
        ));
    }

    #[test]
    fn deleted_task_time_drops_out_of_statistics() {
        let mut store = MemoryStore::default();
        let kept = store
            .create_task("ana", TaskDraft::new("Review PR"), now())
            .unwrap();
        let task = store
            .create_task("ana", TaskDraft::new("Draft slides"), now())
            .unwrap();
        store.create_time_log("ana", record(&task.id, 25)).unwrap();
        store.create_time_log("ana", record(&kept.id, 10)).unwrap();

        store.delete_task(&task.id).unwrap();

        let logs = store.list_time_logs("ana").unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].task_id, kept.id);
        assert_eq!(store.time_logs.len(), 2);

        let tasks = store.list_tasks("ana").unwrap();
        let stats = compute_statistics(&tasks, &logs, Period::Day, &now());
        assert_eq!(stats.total_minutes, 10);
        assert_eq!(stats.daily_data.values().sum::<u64>(), 10);
    }

    #[test]
    fn only_deleted_task_leaves_nothing_to_count() {
        let mut store = MemoryStore::default();
        let task = store
            .create_task("ana", TaskDraft::new("Draft slides"), now())
            .unwrap();
        store.create_time_log("ana", record(&task.id, 25)).unwrap();
        store.delete_task(&task.id).unwrap();

        let logs = store.list_time_logs("ana").unwrap();
        let stats = compute_statistics(&[], &logs, Period::Day, &now());
        assert_eq!(stats.total_minutes, 0);
        assert!(stats.daily_data.is_empty());
        assert_eq!(stats.productivity_score, 0);
    }

    #[test]
    fn logs_follow_task_ownership() {
        let mut store = MemoryStore::default();
        let task = store
            .create_task("ana", TaskDraft::new("Draft slides"), now())
            .unwrap();
        store.create_time_log("ana", record(&task.id, 25)).unwrap();

        assert_eq!(store.list_time_logs("ana").unwrap().len(), 1);
        assert!(store.list_time_logs("ben").unwrap().is_empty());
    }

    #[test]
    fn backwards_log_is_rejected() {
        let mut store = MemoryStore::default();
        let mut bad = record(&TaskId::from("t1"), 5);
        bad.end_time = bad.start_time - Duration::minutes(1);

        assert!(store.create_time_log("ana", bad).unwrap_err().is_validation());
        assert!(store.list_time_logs("ana").unwrap().is_empty());
    }

    #[test]
    fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state.json");

        let task_id = {
            let mut store = JsonFileStore::open(&path).unwrap();
            let task = store
                .create_task("ana", TaskDraft::new("Draft slides"), now())
                .unwrap();
            store.create_time_log("ana", record(&task.id, 50)).unwrap();
            task.id
        };

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get_task(&task_id).unwrap().title, "Draft slides");
        assert_eq!(store.list_time_logs("ana").unwrap()[0].duration, 50);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.list_tasks("ana").unwrap().is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn corrupt_file_is_moved_aside_on_first_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let mut store = JsonFileStore::open(&path).unwrap();
        store
            .create_task("ana", TaskDraft::new("Start over"), now())
            .unwrap();

        let aside = dir.path().join("state.json.corrupt");
        assert_eq!(fs::read_to_string(aside).unwrap(), "{ not json");
        assert!(!dir.path().join("state.json.tmp").exists());

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.list_tasks("ana").unwrap()[0].title, "Start over");
    }

    #[test]
    fn failed_save_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let mut store = JsonFileStore::open(blocker.join("state.json")).unwrap();
        let result = store.create_task("ana", TaskDraft::new("Draft slides"), now());

        assert!(matches!(result, Err(Error::Io(_))));
        assert!(store.list_tasks("ana").unwrap().is_empty());
    }
}
