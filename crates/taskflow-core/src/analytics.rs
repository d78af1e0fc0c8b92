//! Statistics derived from tasks and time logs.
//!
//! Everything here is a pure function of its arguments. The current instant
//! is passed in, and its time zone is the one used for calendar days and
//! months.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::{Priority, Status, Task, TaskId};
use crate::time_log::TimeLogEntry;

const TOP_TASKS: usize = 5;
const RECENT_TASKS: usize = 5;
/// Two hours of logged time per active day earns the full time half of the score.
const TARGET_MINUTES_PER_DAY: f64 = 120.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    #[default]
    Week,
    Month,
}

impl Period {
    /// First instant included in the reporting window.
    ///
    /// `Day` and `Month` are calendar aligned in the zone of `now`; `Week` is
    /// the rolling seven days before `now`.
    pub fn window_start<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let today = now.date_naive();
        match self {
            Period::Day => local_midnight(&tz, today),
            Period::Week => now.clone() - Duration::days(7),
            Period::Month => {
                let first =
                    NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
                local_midnight(&tz, first)
            }
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
        };
        f.write_str(label)
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" | "today" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            other => Err(Error::Validation(format!("unknown period: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub completed_tasks: usize,
    pub in_progress_tasks: usize,
    pub todo_tasks: usize,
}

impl StatusCounts {
    fn tally<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut counts = Self::default();
        for task in tasks {
            match task.status {
                Status::Completed => counts.completed_tasks += 1,
                Status::InProgress => counts.in_progress_tasks += 1,
                Status::Todo => counts.todo_tasks += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.completed_tasks + self.in_progress_tasks + self.todo_tasks
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TaskTime {
    pub task: Task,
    pub minutes: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatsView {
    pub period: Period,
    pub window_start: DateTime<Utc>,
    pub total_minutes: u64,
    pub total_hours: u64,
    pub remaining_minutes: u64,
    #[serde(flatten)]
    pub status: StatusCounts,
    pub time_by_task: BTreeMap<TaskId, u64>,
    pub top_tasks: Vec<TaskTime>,
    pub daily_data: BTreeMap<NaiveDate, u64>,
    pub completion_rate: u8,
    pub productivity_score: u8,
}

/// Computes the statistics view for one reporting window.
///
/// Logs count when they start inside the window, tasks when they were
/// created inside it. A log whose task is not in `tasks` adds to the totals
/// but not to `time_by_task`; [`TaskStore::list_time_logs`] already leaves
/// out logs of deleted tasks. Logs with a negative duration are reported and
/// skipped.
///
/// [`TaskStore::list_time_logs`]: crate::store::TaskStore::list_time_logs
pub fn compute_statistics<Tz: TimeZone>(
    tasks: &[Task],
    logs: &[TimeLogEntry],
    period: Period,
    now: &DateTime<Tz>,
) -> StatsView {
    let tz = now.timezone();
    let window_start = period.window_start(now).with_timezone(&Utc);

    let period_logs: Vec<(&TimeLogEntry, u64)> = valid_logs(logs)
        .filter(|(log, _)| log.start_time >= window_start)
        .collect();
    let total_minutes: u64 = period_logs.iter().map(|(_, minutes)| minutes).sum();

    let status = StatusCounts::tally(tasks.iter().filter(|task| task.created_at >= window_start));

    let mut by_id: HashMap<&TaskId, &Task> = HashMap::new();
    for task in tasks {
        by_id.entry(&task.id).or_insert(task);
    }

    // First-appearance order doubles as the tie-break for top tasks.
    let mut ranked: Vec<(&Task, u64)> = Vec::new();
    let mut slots: HashMap<&TaskId, usize> = HashMap::new();
    let mut daily_data: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for (log, minutes) in &period_logs {
        if let Some(&task) = by_id.get(&log.task_id) {
            let slot = *slots.entry(&task.id).or_insert_with(|| {
                ranked.push((task, 0));
                ranked.len() - 1
            });
            ranked[slot].1 += minutes;
        }

        let day = log.start_time.with_timezone(&tz).date_naive();
        *daily_data.entry(day).or_default() += minutes;
    }

    let time_by_task = ranked
        .iter()
        .map(|(task, minutes)| (task.id.clone(), *minutes))
        .collect();

    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let top_tasks = ranked
        .into_iter()
        .take(TOP_TASKS)
        .map(|(task, minutes)| TaskTime {
            task: task.clone(),
            minutes,
        })
        .collect();

    let completion_rate = completion_rate(status.completed_tasks, status.total());
    let productivity_score = productivity_score(completion_rate, total_minutes, daily_data.len());

    StatsView {
        period,
        window_start,
        total_minutes,
        total_hours: total_minutes / 60,
        remaining_minutes: total_minutes % 60,
        status,
        time_by_task,
        top_tasks,
        daily_data,
        completion_rate,
        productivity_score,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DashboardOverview {
    pub total_tasks: usize,
    #[serde(flatten)]
    pub status: StatusCounts,
    pub total_minutes: u64,
    pub total_hours: u64,
    pub remaining_minutes: u64,
    pub due_today: Vec<Task>,
    pub overdue: Vec<Task>,
    pub high_priority_open: Vec<Task>,
    pub recent: Vec<Task>,
}

/// Whole-history overview: no reporting window applies.
pub fn dashboard_overview<Tz: TimeZone>(
    tasks: &[Task],
    logs: &[TimeLogEntry],
    now: &DateTime<Tz>,
) -> DashboardOverview {
    let today = now.date_naive();
    let total_minutes: u64 = valid_logs(logs).map(|(_, minutes)| minutes).sum();

    DashboardOverview {
        total_tasks: tasks.len(),
        status: StatusCounts::tally(tasks),
        total_minutes,
        total_hours: total_minutes / 60,
        remaining_minutes: total_minutes % 60,
        due_today: matching(tasks, |task| task.deadline == Some(today)),
        overdue: matching(tasks, |task| task.is_overdue(today)),
        high_priority_open: matching(tasks, |task| {
            task.priority == Priority::High && !task.is_completed()
        }),
        recent: tasks.iter().take(RECENT_TASKS).cloned().collect(),
    }
}

/// `95` -> `"1h 35m"`
pub fn format_minutes(minutes: u64) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// `754` -> `"12:34"`
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn matching(tasks: &[Task], keep: impl Fn(&Task) -> bool) -> Vec<Task> {
    tasks.iter().filter(|task| keep(task)).cloned().collect()
}

fn valid_logs(logs: &[TimeLogEntry]) -> impl Iterator<Item = (&TimeLogEntry, u64)> {
    logs.iter().filter_map(|log| match log.valid_minutes() {
        Some(minutes) => Some((log, minutes)),
        None => {
            tracing::warn!(
                log_id = %log.id,
                duration = log.duration,
                "Skipping time log with negative duration"
            );
            None
        }
    })
}

fn completion_rate(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (completed as f64 / total as f64 * 100.0).round() as u8
}

fn productivity_score(completion_rate: u8, total_minutes: u64, active_days: usize) -> u8 {
    let avg_per_day = if active_days > 0 {
        total_minutes as f64 / active_days as f64
    } else {
        0.0
    };
    let time_share = (avg_per_day / TARGET_MINUTES_PER_DAY).min(1.0);
    let score = f64::from(completion_rate) * 0.5 + time_share * 50.0;
    score.round().clamp(0.0, 100.0) as u8
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(start) => start,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // Midnight skipped by a DST jump; the day starts at the first valid hour.
        LocalResult::None => tz
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&midnight)),
    }
}
