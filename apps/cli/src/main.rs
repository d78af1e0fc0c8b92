//! taskflow - task tracker with a pomodoro timer
//!
//! Every command loads the JSON state file, works on the tasks and logs of
//! one user, and writes the file back when something changed.

mod render;
mod session;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use taskflow_core::{
    Clock, Config, JsonFileStore, Period, PomodoroTimer, Priority, Status, SystemClock, Task,
    TaskDraft, TaskFilter, TaskId, TaskPatch, TaskStore, Ticker, compute_statistics,
    dashboard_overview,
};

use crate::session::{DesktopNotifier, Notifier, SilentNotifier};

#[derive(Parser)]
#[command(name = "taskflow")]
#[command(about = "Track tasks, focus with a pomodoro timer, and review where the time went")]
#[command(version)]
struct Cli {
    /// User whose tasks and logs to use (defaults to `user` in config.toml)
    #[arg(long, global = true)]
    user: Option<String>,

    /// State file to read and write instead of the XDG data location
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create, list, edit and delete tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// List logged work sessions
    Logs,

    /// Time and completion statistics for a period
    Stats {
        /// day, week (last 7 days) or month
        #[arg(short, long, default_value = "week")]
        period: Period,

        #[arg(long)]
        json: bool,
    },

    /// Overview of all tasks and logged time
    Dashboard {
        #[arg(long)]
        json: bool,
    },

    /// Run pomodoros on a task, logging the time worked
    Timer(TimerArgs),
}

#[derive(Subcommand)]
enum TaskCommand {
    Add {
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long, default_value = "medium")]
        priority: Priority,

        #[arg(short, long, default_value = "todo")]
        status: Status,

        /// Due date, YYYY-MM-DD
        #[arg(long)]
        deadline: Option<NaiveDate>,
    },

    List {
        #[arg(short, long)]
        status: Option<Status>,

        #[arg(short, long)]
        priority: Option<Priority>,
    },

    Edit {
        /// Task id or a unique prefix of it
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        /// New description; an empty string clears it
        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        priority: Option<Priority>,

        #[arg(short, long)]
        status: Option<Status>,

        #[arg(long, conflicts_with = "clear_deadline")]
        deadline: Option<NaiveDate>,

        #[arg(long)]
        clear_deadline: bool,
    },

    /// Move a task to todo, inprogress or completed
    Status { id: String, status: Status },

    Rm { id: String },
}

#[derive(Args)]
struct TimerArgs {
    /// Task id or a unique prefix of it
    task: String,

    /// Stop after this many completed pomodoros
    #[arg(short, long, default_value_t = 1)]
    cycles: u32,

    #[arg(long)]
    work_minutes: Option<u64>,

    #[arg(long)]
    short_break_minutes: Option<u64>,

    #[arg(long)]
    long_break_minutes: Option<u64>,

    /// Do not show desktop notifications
    #[arg(long)]
    no_notify: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = taskflow_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    let user = cli.user.clone().unwrap_or_else(|| config.user.clone());
    let data_path = cli.data_file.clone().unwrap_or_else(Config::data_path);
    tracing::debug!(user = %user, path = %data_path.display(), "Opening state file");

    let mut store = JsonFileStore::open(&data_path)
        .with_context(|| format!("failed to open {}", data_path.display()))?;

    match cli.command {
        Command::Task(command) => run_task_command(&mut store, &user, command),
        Command::Logs => {
            let tasks = store.list_tasks(&user)?;
            let logs = store.list_time_logs(&user)?;
            print!("{}", render::time_logs(&tasks, &logs));
            Ok(())
        }
        Command::Stats { period, json } => {
            let tasks = store.list_tasks(&user)?;
            let logs = store.list_time_logs(&user)?;
            let stats = compute_statistics(&tasks, &logs, period, &Local::now());
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{}", render::stats(&stats));
            }
            Ok(())
        }
        Command::Dashboard { json } => {
            let tasks = store.list_tasks(&user)?;
            let logs = store.list_time_logs(&user)?;
            let overview = dashboard_overview(&tasks, &logs, &Local::now());
            if json {
                println!("{}", serde_json::to_string_pretty(&overview)?);
            } else {
                print!("{}", render::dashboard(&overview));
            }
            Ok(())
        }
        Command::Timer(args) => run_timer(&mut store, &user, &config, args),
    }
}

fn run_task_command(store: &mut JsonFileStore, user: &str, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::Add {
            title,
            description,
            priority,
            status,
            deadline,
        } => {
            let draft = TaskDraft {
                title,
                description,
                priority,
                status,
                deadline,
            };
            let task = store.create_task(user, draft, SystemClock.now())?;
            println!("Created {}", render::task_line(&task));
        }
        TaskCommand::List { status, priority } => {
            let filter = TaskFilter { status, priority };
            let all = store.list_tasks(user)?;
            let shown: Vec<&Task> = all.iter().filter(|task| filter.matches(task)).collect();
            if all.is_empty() {
                println!("No tasks yet. Create your first task with `taskflow task add`.");
            } else if shown.is_empty() {
                println!("No tasks match your filters.");
            } else {
                let today = Local::now().date_naive();
                for task in shown {
                    println!("{}", render::task_row(task, today));
                }
            }
        }
        TaskCommand::Edit {
            id,
            title,
            description,
            priority,
            status,
            deadline,
            clear_deadline,
        } => {
            let task = resolve_task(store, user, &id)?;
            let patch = TaskPatch {
                title,
                description,
                priority,
                status,
                deadline: if clear_deadline {
                    Some(None)
                } else {
                    deadline.map(Some)
                },
            };
            if patch.is_empty() {
                bail!("nothing to change; pass at least one field to edit");
            }
            let task = store.update_task(&task.id, patch)?;
            println!("Updated {}", render::task_line(&task));
        }
        TaskCommand::Status { id, status } => {
            let task = resolve_task(store, user, &id)?;
            let task = store.update_task(&task.id, TaskPatch::status(status))?;
            println!("Updated {}", render::task_line(&task));
        }
        TaskCommand::Rm { id } => {
            let task = resolve_task(store, user, &id)?;
            let task = store.delete_task(&task.id)?;
            println!("Deleted {}", render::task_line(&task));
        }
    }
    Ok(())
}

fn run_timer(
    store: &mut JsonFileStore,
    user: &str,
    config: &Config,
    args: TimerArgs,
) -> Result<()> {
    let task = resolve_task(store, user, &args.task)?;
    if task.is_completed() {
        bail!("task \"{}\" is already completed", task.title);
    }

    let mut settings = config.timer_settings();
    if let Some(minutes) = args.work_minutes {
        settings.work_seconds = minutes.saturating_mul(60);
    }
    if let Some(minutes) = args.short_break_minutes {
        settings.short_break_seconds = minutes.saturating_mul(60);
    }
    if let Some(minutes) = args.long_break_minutes {
        settings.long_break_seconds = minutes.saturating_mul(60);
    }
    settings.validate()?;
    if args.cycles == 0 {
        bail!("--cycles must be at least 1");
    }

    let mut timer = PomodoroTimer::new(settings);
    timer.select_task(Some(task.id.clone()))?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;

    let notifier: Box<dyn Notifier> = if config.notifications.desktop && !args.no_notify {
        Box::new(DesktopNotifier)
    } else {
        Box::new(SilentNotifier)
    };

    println!(
        "Focusing on \"{}\" for {} pomodoro(s). Ctrl-C stops and saves.",
        task.title, args.cycles
    );
    let ticker = Ticker::every_second();
    let summary = session::run(
        &mut timer,
        &task,
        session::Collaborators {
            store,
            user,
            clock: &SystemClock,
            notifier: notifier.as_ref(),
            cycles: args.cycles,
        },
        session::live_signals(ticker, interrupted),
        &mut std::io::stdout(),
    )?;

    println!(
        "\nDone: {} pomodoro(s), {} minute(s) logged.",
        summary.pomodoros, summary.minutes_logged
    );
    Ok(())
}

/// Finds a task of `user` by exact id or unique id prefix.
fn resolve_task(store: &JsonFileStore, user: &str, id: &str) -> Result<Task> {
    let tasks = store.list_tasks(user)?;
    if let Some(task) = tasks.iter().find(|task| task.id == TaskId::from(id)) {
        return Ok(task.clone());
    }

    let mut matches = tasks
        .into_iter()
        .filter(|task| !id.is_empty() && task.id.as_str().starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task),
        (Some(_), Some(_)) => bail!("id prefix '{id}' matches more than one task"),
        (None, _) => bail!("no task found matching '{id}'"),
    }
}
