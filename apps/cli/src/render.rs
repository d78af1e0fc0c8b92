//! Plain-text views for the terminal.

use std::collections::HashMap;
use std::fmt::Write;

use chrono::{Local, NaiveDate};
use taskflow_core::analytics::format_minutes;
use taskflow_core::{DashboardOverview, Period, StatsView, Task, TaskId, TimeLogEntry};

const SHORT_ID: usize = 8;
const PREVIEW: usize = 3;

fn short_id(id: &TaskId) -> &str {
    let id = id.as_str();
    id.get(..SHORT_ID).unwrap_or(id)
}

pub fn task_line(task: &Task) -> String {
    format!("[{}] {}", short_id(&task.id), task.title)
}

pub fn task_row(task: &Task, today: NaiveDate) -> String {
    let mut row = format!(
        "{}  {:<11} {:<6}  {}",
        short_id(&task.id),
        task.status.as_str(),
        task.priority.as_str(),
        task.title
    );
    if let Some(deadline) = task.deadline {
        let _ = write!(row, "  due {deadline}");
        if task.is_overdue(today) {
            row.push_str(" (overdue)");
        }
    }
    row
}

pub fn time_logs(tasks: &[Task], logs: &[TimeLogEntry]) -> String {
    if logs.is_empty() {
        return "No time logged yet. Start one with `taskflow timer <task>`.\n".to_string();
    }

    let titles: HashMap<&TaskId, &str> = tasks
        .iter()
        .map(|task| (&task.id, task.title.as_str()))
        .collect();

    let mut out = String::new();
    for log in logs {
        let title = titles
            .get(&log.task_id)
            .copied()
            .unwrap_or("(deleted task)");
        let started = log.start_time.with_timezone(&Local);
        let _ = writeln!(
            out,
            "{}  {:>4} min  {}",
            started.format("%Y-%m-%d %H:%M"),
            log.duration,
            title
        );
    }
    out
}

fn period_label(period: Period) -> &'static str {
    match period {
        Period::Day => "Today",
        Period::Week => "Last 7 days",
        Period::Month => "This month",
    }
}

pub fn stats(stats: &StatsView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", period_label(stats.period));
    let _ = writeln!(
        out,
        "  Total time logged   {}",
        format_minutes(stats.total_minutes)
    );
    let _ = writeln!(out, "  Completed tasks     {}", stats.status.completed_tasks);
    let _ = writeln!(out, "  In progress         {}", stats.status.in_progress_tasks);
    let _ = writeln!(out, "  To do               {}", stats.status.todo_tasks);
    let _ = writeln!(out, "  Completion rate     {}%", stats.completion_rate);
    let _ = writeln!(out, "  Productivity score  {}/100", stats.productivity_score);

    if !stats.daily_data.is_empty() {
        let _ = writeln!(out, "\nDaily distribution");
        for (day, minutes) in &stats.daily_data {
            let _ = writeln!(out, "  {day}  {}", format_minutes(*minutes));
        }
    }

    let _ = writeln!(out, "\nTop tasks");
    if stats.top_tasks.is_empty() {
        let _ = writeln!(out, "  No time logged in this period.");
    }
    for (rank, entry) in stats.top_tasks.iter().enumerate() {
        let _ = writeln!(
            out,
            "  #{} {}  {}",
            rank + 1,
            entry.task.title,
            format_minutes(entry.minutes)
        );
    }
    out
}

fn preview(out: &mut String, heading: &str, tasks: &[Task]) {
    let _ = writeln!(out, "\n{heading} ({})", tasks.len());
    for task in tasks.iter().take(PREVIEW) {
        let _ = writeln!(out, "  {}", task_line(task));
    }
    if tasks.len() > PREVIEW {
        let _ = writeln!(out, "  +{} more", tasks.len() - PREVIEW);
    }
}

pub fn dashboard(overview: &DashboardOverview) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} tasks: {} completed, {} in progress, {} to do",
        overview.total_tasks,
        overview.status.completed_tasks,
        overview.status.in_progress_tasks,
        overview.status.todo_tasks
    );
    let _ = writeln!(
        out,
        "Time logged: {}",
        format_minutes(overview.total_minutes)
    );

    if !overview.overdue.is_empty() {
        let _ = writeln!(
            out,
            "\n! {} overdue task(s) need attention",
            overview.overdue.len()
        );
    }
    preview(&mut out, "Due today", &overview.due_today);
    preview(&mut out, "High priority", &overview.high_priority_open);

    let _ = writeln!(out, "\nRecent tasks");
    if overview.recent.is_empty() {
        let _ = writeln!(out, "  No tasks yet.");
    }
    for task in &overview.recent {
        let _ = writeln!(out, "  {}  {}", task_line(task), task.status);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use taskflow_core::analytics::dashboard_overview;
    use taskflow_core::{Priority, Status, TaskDraft, compute_statistics};

    fn task(id: &str, title: &str) -> Task {
        let created = Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap();
        Task::from_draft(TaskDraft::new(title), "ana", TaskId::from(id), created).unwrap()
    }

    fn log(task_id: &str, minutes: i64) -> TimeLogEntry {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        TimeLogEntry {
            id: "log-1".into(),
            user_id: "ana".into(),
            task_id: TaskId::from(task_id),
            start_time: start,
            end_time: start + Duration::minutes(minutes),
            duration: minutes,
        }
    }

    #[test]
    fn row_shortens_id_and_flags_overdue() {
        let mut task = task("0123456789abcdef", "Ship it");
        task.deadline = NaiveDate::from_ymd_opt(2024, 3, 1);
        let today = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

        let row = task_row(&task, today);
        assert!(row.starts_with("01234567  todo"));
        assert!(row.ends_with("due 2024-03-01 (overdue)"));
    }

    #[test]
    fn logs_for_deleted_tasks_are_labelled() {
        let tasks = vec![task("a", "Write docs")];
        let logs = vec![log("a", 25), log("gone", 10)];

        let text = time_logs(&tasks, &logs);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with("Write docs"));
        assert!(lines[1].ends_with("(deleted task)"));
    }

    #[test]
    fn stats_lists_ranked_tasks() {
        let tasks = vec![task("a", "Write docs"), task("b", "Fix bug")];
        let logs = vec![log("a", 25), log("b", 95)];
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 18, 0, 0).unwrap();
        let view = compute_statistics(&tasks, &logs, Period::Day, &now);

        let text = stats(&view);
        assert!(text.contains("Total time logged   2h 0m"));
        assert!(text.contains("#1 Fix bug  1h 35m"));
        assert!(text.contains("#2 Write docs  0h 25m"));
    }

    #[test]
    fn dashboard_truncates_long_lists() {
        let tasks: Vec<Task> = (0..5)
            .map(|i| {
                let mut task = task(&format!("t{i}"), &format!("Urgent {i}"));
                task.priority = Priority::High;
                task
            })
            .collect();
        let mut done = task("done", "Old");
        done.status = Status::Completed;
        let mut all = tasks;
        all.push(done);

        let now = Utc.with_ymd_and_hms(2024, 3, 4, 18, 0, 0).unwrap();
        let text = dashboard(&dashboard_overview(&all, &[], &now));

        assert!(text.starts_with("6 tasks: 1 completed, 0 in progress, 5 to do"));
        assert!(text.contains("High priority (5)"));
        assert!(text.contains("+2 more"));
        assert!(!text.contains("overdue"));
    }
}
