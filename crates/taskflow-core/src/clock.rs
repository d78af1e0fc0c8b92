//! Time sources: the current instant and a periodic tick.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard = *guard + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Periodic tick delivered over a channel from a background thread.
///
/// Ticks queue up instead of overlapping, so a single consumer sees them one
/// at a time and never loses one. Dropping the ticker cancels it.
#[derive(Debug)]
pub struct Ticker {
    receiver: Receiver<()>,
    cancelled: Arc<AtomicBool>,
}

impl Ticker {
    pub fn start(period: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        thread::spawn(move || {
            let mut next = Instant::now() + period;
            loop {
                let now = Instant::now();
                if next > now {
                    thread::sleep(next - now);
                }
                if flag.load(Ordering::Acquire) || sender.send(()).is_err() {
                    break;
                }
                next += period;
            }
        });

        Self {
            receiver,
            cancelled,
        }
    }

    pub fn every_second() -> Self {
        Self::start(Duration::from_secs(1))
    }

    /// Waits for the next tick. `Disconnected` means the ticker was cancelled
    /// and every queued tick has been consumed.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<(), RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}
