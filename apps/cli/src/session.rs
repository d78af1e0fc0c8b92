//! The live pomodoro loop: feeds ticks into the timer, stores finished
//! sessions, and reports mode changes.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use anyhow::Result;
use notify_rust::Notification;
use taskflow_core::analytics::format_clock;
use taskflow_core::{
    Clock, PomodoroTimer, SessionRecord, Task, TaskStore, Ticker, TimerEvent, TimerMode,
};

const INTERRUPT_POLL: Duration = Duration::from_millis(200);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Tick,
    Interrupt,
}

pub trait Notifier {
    fn notify(&self, summary: &str, body: &str);
}

pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, summary: &str, body: &str) {
        if let Err(e) = Notification::new()
            .summary(summary)
            .body(body)
            .appname("taskflow")
            .icon("alarm-clock")
            .show()
        {
            tracing::warn!(error = %e, "Desktop notification failed");
        }
    }
}

pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _summary: &str, _body: &str) {}
}

pub struct Collaborators<'a> {
    pub store: &'a mut dyn TaskStore,
    pub user: &'a str,
    pub clock: &'a dyn Clock,
    pub notifier: &'a dyn Notifier,
    pub cycles: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub pomodoros: u32,
    pub minutes_logged: u64,
    pub interrupted: bool,
}

/// Ticks from `ticker`, with an `Interrupt` once `interrupted` is raised.
pub fn live_signals(ticker: Ticker, interrupted: Arc<AtomicBool>) -> impl Iterator<Item = Signal> {
    std::iter::from_fn(move || {
        loop {
            if interrupted.load(Ordering::SeqCst) {
                ticker.cancel();
                return Some(Signal::Interrupt);
            }
            match ticker.recv_timeout(INTERRUPT_POLL) {
                Ok(()) => return Some(Signal::Tick),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    })
}

/// Runs work sessions on `task` until `cycles` pomodoros are done or an
/// interrupt arrives. Breaks start on their own between pomodoros; an
/// interrupt stops the timer and keeps the partial work session.
pub fn run(
    timer: &mut PomodoroTimer,
    task: &Task,
    ctx: Collaborators<'_>,
    signals: impl IntoIterator<Item = Signal>,
    out: &mut dyn Write,
) -> Result<Summary> {
    let Collaborators {
        store,
        user,
        clock,
        notifier,
        cycles,
    } = ctx;
    let mut summary = Summary::default();

    timer.start(clock.now())?;
    for signal in signals {
        match signal {
            Signal::Interrupt => {
                if let Some(record) = timer.stop(clock.now()) {
                    summary.minutes_logged += save(store, user, task, record, out)?;
                }
                summary.interrupted = true;
                break;
            }
            Signal::Tick => {
                let mut finished = false;
                for event in timer.tick(clock.now()) {
                    match event {
                        TimerEvent::SessionLogged(record) => {
                            summary.minutes_logged += save(store, user, task, record, out)?;
                        }
                        TimerEvent::PomodoroCompleted { count, next } => {
                            summary.pomodoros = count;
                            let message = if next == TimerMode::LongBreak {
                                "Great work! Time for a long break!"
                            } else {
                                "Pomodoro complete! Time for a short break!"
                            };
                            notifier.notify("Pomodoro complete", message);
                            writeln!(out, "\n{message}")?;
                            finished = count >= cycles;
                        }
                        TimerEvent::BreakFinished(mode) => {
                            let message = if mode == TimerMode::LongBreak {
                                "Long break over! Ready to continue?"
                            } else {
                                "Break over! Ready for another pomodoro?"
                            };
                            notifier.notify("Break over", message);
                            writeln!(out, "\n{message}")?;
                        }
                    }
                }
                if finished {
                    break;
                }
                if !timer.is_running() {
                    timer.start(clock.now())?;
                }
                write!(
                    out,
                    "\r{:<12} {} left",
                    timer.mode().label(),
                    format_clock(timer.remaining_seconds())
                )?;
                out.flush()?;
            }
        }
    }

    Ok(summary)
}

fn save(
    store: &mut dyn TaskStore,
    user: &str,
    task: &Task,
    record: SessionRecord,
    out: &mut dyn Write,
) -> Result<u64> {
    let entry = store.create_time_log(user, record)?;
    let minutes = entry.valid_minutes().unwrap_or(0);
    writeln!(out, "\nLogged {minutes} minutes for \"{}\"", task.title)?;
    Ok(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;
    use taskflow_core::clock::FixedClock;
    use taskflow_core::{MemoryStore, TaskDraft, TimerSettings};

    #[derive(Default)]
    struct RecordingNotifier {
        seen: RefCell<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, summary: &str, _body: &str) {
            self.seen.borrow_mut().push(summary.to_string());
        }
    }

    fn settings() -> TimerSettings {
        TimerSettings {
            work_seconds: 120,
            short_break_seconds: 3,
            long_break_seconds: 5,
            long_break_every: 4,
        }
    }

    fn setup() -> (MemoryStore, Task, PomodoroTimer, FixedClock) {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 2, 5, 9, 0, 0).unwrap());
        let mut store = MemoryStore::default();
        let task = store
            .create_task("ana", TaskDraft::new("Write tests"), clock.now())
            .unwrap();
        let mut timer = PomodoroTimer::new(settings());
        timer.select_task(Some(task.id.clone())).unwrap();
        (store, task, timer, clock)
    }

    struct Ticks<'a> {
        clock: &'a FixedClock,
        left: usize,
    }

    impl Iterator for Ticks<'_> {
        type Item = Signal;

        fn next(&mut self) -> Option<Signal> {
            if self.left == 0 {
                return None;
            }
            self.left -= 1;
            self.clock.advance(chrono::Duration::seconds(1));
            Some(Signal::Tick)
        }
    }

    #[test]
    fn completed_pomodoro_is_logged_and_ends_run() {
        let (mut store, task, mut timer, clock) = setup();
        let notifier = RecordingNotifier::default();
        let mut out: Vec<u8> = Vec::new();

        let summary = run(
            &mut timer,
            &task,
            Collaborators {
                store: &mut store,
                user: "ana",
                clock: &clock,
                notifier: &notifier,
                cycles: 1,
            },
            Ticks {
                clock: &clock,
                left: 500,
            },
            &mut out,
        )
        .unwrap();

        assert_eq!(summary.pomodoros, 1);
        assert_eq!(summary.minutes_logged, 2);
        assert!(!summary.interrupted);
        assert_eq!(timer.mode(), TimerMode::ShortBreak);
        assert_eq!(notifier.seen.borrow().as_slice(), ["Pomodoro complete"]);

        let logs = store.list_time_logs("ana").unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].duration, 2);

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Logged 2 minutes for \"Write tests\""));
    }

    #[test]
    fn breaks_run_between_cycles() {
        let (mut store, task, mut timer, clock) = setup();
        let notifier = RecordingNotifier::default();

        let summary = run(
            &mut timer,
            &task,
            Collaborators {
                store: &mut store,
                user: "ana",
                clock: &clock,
                notifier: &notifier,
                cycles: 2,
            },
            Ticks {
                clock: &clock,
                left: 1_000,
            },
            &mut Vec::<u8>::new(),
        )
        .unwrap();

        assert_eq!(summary.pomodoros, 2);
        assert_eq!(
            notifier.seen.borrow().as_slice(),
            ["Pomodoro complete", "Break over", "Pomodoro complete"]
        );
        assert_eq!(store.list_time_logs("ana").unwrap().len(), 2);
    }

    #[test]
    fn interrupt_saves_partial_session() {
        let (mut store, task, mut timer, clock) = setup();
        let signals = Ticks {
            clock: &clock,
            left: 70,
        }
        .chain(std::iter::once(Signal::Interrupt));

        let summary = run(
            &mut timer,
            &task,
            Collaborators {
                store: &mut store,
                user: "ana",
                clock: &clock,
                notifier: &SilentNotifier,
                cycles: 1,
            },
            signals,
            &mut Vec::<u8>::new(),
        )
        .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.pomodoros, 0);
        assert_eq!(summary.minutes_logged, 1);
        assert!(!timer.is_running());
        assert_eq!(store.list_time_logs("ana").unwrap()[0].duration, 1);
    }
}
