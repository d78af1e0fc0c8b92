use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TimerSettings;
use crate::error::{Error, Result};
use crate::task::TaskId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    Work,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Work => "focus time",
            TimerMode::ShortBreak => "short break",
            TimerMode::LongBreak => "long break",
        }
    }
}

/// A finished stretch of work on one task, ready to become a time log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub task_id: TaskId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    SessionLogged(SessionRecord),
    PomodoroCompleted { count: u32, next: TimerMode },
    BreakFinished(TimerMode),
}

/// Work / break rotation advanced by a one-second tick.
///
/// All state changes go through the methods below; a rejected request
/// returns [`Error::Validation`] and leaves the timer as it was.
#[derive(Clone, Debug)]
pub struct PomodoroTimer {
    settings: TimerSettings,
    mode: TimerMode,
    elapsed_seconds: u64,
    running: bool,
    selected_task: Option<TaskId>,
    completed_pomodoros: u32,
    session_start: Option<DateTime<Utc>>,
}

impl PomodoroTimer {
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            settings,
            mode: TimerMode::Work,
            elapsed_seconds: 0,
            running: false,
            selected_task: None,
            completed_pomodoros: 0,
            session_start: None,
        }
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn selected_task(&self) -> Option<&TaskId> {
        self.selected_task.as_ref()
    }

    pub fn completed_pomodoros(&self) -> u32 {
        self.completed_pomodoros
    }

    pub fn duration_of(&self, mode: TimerMode) -> u64 {
        match mode {
            TimerMode::Work => self.settings.work_seconds,
            TimerMode::ShortBreak => self.settings.short_break_seconds,
            TimerMode::LongBreak => self.settings.long_break_seconds,
        }
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.duration_of(self.mode)
            .saturating_sub(self.elapsed_seconds)
    }

    /// Fraction of the current mode already elapsed, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        let total = self.duration_of(self.mode);
        if total == 0 {
            return 1.0;
        }
        (self.elapsed_seconds as f64 / total as f64).min(1.0)
    }

    pub fn select_task(&mut self, task: Option<TaskId>) -> Result<()> {
        if self.running {
            return Err(Error::validation(
                "cannot change the task while the timer is running",
            ));
        }
        self.selected_task = task;
        Ok(())
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.mode == TimerMode::Work && self.selected_task.is_none() {
            return Err(Error::validation("select a task before starting work"));
        }
        if !self.running {
            self.session_start = Some(now);
        }
        self.running = true;
        Ok(())
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<TimerEvent> {
        if !self.running {
            return Vec::new();
        }
        self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
        self.check_boundary(now)
    }

    /// Ends the current session. Only a work session with a task and at
    /// least one ticked second produces a record.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<SessionRecord> {
        let record = match (self.mode, &self.selected_task, self.session_start) {
            (TimerMode::Work, Some(task_id), Some(start_time)) if self.elapsed_seconds > 0 => {
                Some(SessionRecord {
                    task_id: task_id.clone(),
                    start_time,
                    end_time: now,
                    duration_minutes: self.elapsed_seconds / 60,
                })
            }
            _ => None,
        };
        self.reset();
        record
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.elapsed_seconds = 0;
        self.session_start = None;
    }

    pub fn switch_to(&mut self, mode: TimerMode) -> Result<()> {
        if self.running {
            return Err(Error::validation(
                "cannot switch mode while the timer is running",
            ));
        }
        self.elapsed_seconds = 0;
        self.mode = mode;
        Ok(())
    }

    /// Replaces the configured durations. A duration shrunk below the
    /// elapsed count completes the current session right away.
    pub fn set_settings(
        &mut self,
        settings: TimerSettings,
        now: DateTime<Utc>,
    ) -> Result<Vec<TimerEvent>> {
        if self.running {
            return Err(Error::validation(
                "cannot change durations while the timer is running",
            ));
        }
        settings.validate()?;
        self.settings = settings;
        Ok(self.check_boundary(now))
    }

    fn check_boundary(&mut self, now: DateTime<Utc>) -> Vec<TimerEvent> {
        if self.elapsed_seconds < self.duration_of(self.mode) {
            return Vec::new();
        }

        let mut events = Vec::new();
        match self.mode {
            TimerMode::Work => {
                if let Some(record) = self.stop(now) {
                    events.push(TimerEvent::SessionLogged(record));
                }
                self.completed_pomodoros = self.completed_pomodoros.saturating_add(1);
                let next = if self.completed_pomodoros % self.settings.long_break_every.max(1) == 0
                {
                    TimerMode::LongBreak
                } else {
                    TimerMode::ShortBreak
                };
                self.mode = next;
                tracing::debug!(
                    count = self.completed_pomodoros,
                    next = next.label(),
                    "Pomodoro completed"
                );
                events.push(TimerEvent::PomodoroCompleted {
                    count: self.completed_pomodoros,
                    next,
                });
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => {
                let finished = self.mode;
                self.reset();
                self.mode = TimerMode::Work;
                tracing::debug!(finished = finished.label(), "Break finished");
                events.push(TimerEvent::BreakFinished(finished));
            }
        }
        events
    }
}
