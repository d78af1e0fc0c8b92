//! # taskflow-core
//!
//! Core library for taskflow, a personal task tracker with a pomodoro timer.
//!
//! - [`timer`]: the work / break rotation, advanced one second at a time
//! - [`analytics`]: statistics and dashboard views computed from tasks and logs
//! - [`store`]: persistence behind the [`TaskStore`] trait
//! - [`clock`]: the current instant and a one-second ticker
//!
//! ```rust
//! use chrono::Utc;
//! use taskflow_core::{MemoryStore, Period, TaskDraft, TaskStore, compute_statistics};
//!
//! let mut store = MemoryStore::default();
//! store.create_task("default", TaskDraft::new("Write release notes"), Utc::now()).unwrap();
//!
//! let tasks = store.list_tasks("default").unwrap();
//! let logs = store.list_time_logs("default").unwrap();
//! let stats = compute_statistics(&tasks, &logs, Period::Day, &Utc::now());
//! assert_eq!(stats.status.todo_tasks, 1);
//! ```

pub use analytics::{DashboardOverview, Period, StatsView, compute_statistics, dashboard_overview};
pub use clock::{Clock, SystemClock, Ticker};
pub use config::{Config, TimerSettings};
pub use error::{Error, Result};
pub use store::{JsonFileStore, MemoryStore, TaskStore};
pub use task::{Priority, Status, Task, TaskDraft, TaskFilter, TaskId, TaskPatch};
pub use time_log::TimeLogEntry;
pub use timer::{PomodoroTimer, SessionRecord, TimerEvent, TimerMode};

pub mod analytics;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod store;
pub mod task;
pub mod time_log;
pub mod timer;
