//! Sprint timer overlay
//!
//! [`SprintClock`] is the pure focus / break countdown; it only moves when it is fed
//! elapsed time. [`SprintTimer`] is the background task that feeds it once per period
//! until it is shut down.
//!
//! Like a kitchen timer, the clock pauses itself whenever a focus block or a break
//! runs out; the user starts the next one.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::techniques::SprintSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SprintPhase {
    Focus,
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SprintEvent {
    /// A focus block ran out; `blocks` is the new completed count
    FocusCompleted { blocks: u32 },
    BreakCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintSnapshot {
    pub phase: SprintPhase,
    pub remaining_secs: u64,
    pub running: bool,
    pub completed_focus_blocks: u32,
}

impl SprintSnapshot {
    /// Remaining time as `MM:SS`
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }
}

#[derive(Debug, Clone)]
pub struct SprintClock {
    settings: SprintSettings,
    phase: SprintPhase,
    remaining: Duration,
    running: bool,
    completed_focus_blocks: u32,
}

impl SprintClock {
    pub fn new(settings: SprintSettings) -> Self {
        Self {
            settings,
            phase: SprintPhase::Focus,
            remaining: settings.focus,
            running: false,
            completed_focus_blocks: 0,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Back to a paused, full focus block. Completed blocks are kept.
    pub fn reset(&mut self) {
        self.phase = SprintPhase::Focus;
        self.remaining = self.settings.focus;
        self.running = false;
    }

    pub fn completed_focus_blocks(&self) -> u32 {
        self.completed_focus_blocks
    }

    /// Count down by `elapsed`. Time left over after a phase ends is dropped since the
    /// clock pauses at every phase change.
    pub fn advance(&mut self, elapsed: Duration) -> Option<SprintEvent> {
        if !self.running {
            return None;
        }
        if elapsed < self.remaining {
            self.remaining -= elapsed;
            return None;
        }

        self.running = false;
        match self.phase {
            SprintPhase::Focus => {
                self.completed_focus_blocks += 1;
                self.phase = SprintPhase::Break;
                self.remaining = self.settings.rest;
                Some(SprintEvent::FocusCompleted {
                    blocks: self.completed_focus_blocks,
                })
            }
            SprintPhase::Break => {
                self.phase = SprintPhase::Focus;
                self.remaining = self.settings.focus;
                Some(SprintEvent::BreakCompleted)
            }
        }
    }

    pub fn snapshot(&self) -> SprintSnapshot {
        let mut remaining_secs = self.remaining.as_secs();
        if self.remaining.subsec_nanos() > 0 {
            remaining_secs += 1;
        }
        SprintSnapshot {
            phase: self.phase,
            remaining_secs,
            running: self.running,
            completed_focus_blocks: self.completed_focus_blocks,
        }
    }
}

/// Background task calling `on_tick(period)` every `period` until shut down or until
/// the callback returns `false`.
///
/// Dropping the timer shuts it down.
pub struct SprintTimer {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SprintTimer {
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(Duration) -> bool + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        if *shutdown_rx.borrow() || !on_tick(period) {
                            break;
                        }
                    }
                }
            }
            log::debug!("sprint timer: stopped");
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SprintTimer {
    fn drop(&mut self) {
        self.shutdown();
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn short_settings() -> SprintSettings {
        SprintSettings {
            focus: Duration::from_secs(3),
            rest: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_clock_only_moves_when_running() {
        let mut clock = SprintClock::new(short_settings());
        assert_eq!(clock.advance(Duration::from_secs(10)), None);
        assert_eq!(clock.snapshot().remaining_secs, 3);

        clock.start();
        assert_eq!(clock.advance(Duration::from_secs(1)), None);
        assert_eq!(clock.snapshot().display(), "00:02");
    }

    #[test]
    fn test_focus_then_break_pauses_between() {
        let mut clock = SprintClock::new(short_settings());
        clock.start();
        assert_eq!(
            clock.advance(Duration::from_secs(3)),
            Some(SprintEvent::FocusCompleted { blocks: 1 })
        );
        let snapshot = clock.snapshot();
        assert_eq!(snapshot.phase, SprintPhase::Break);
        assert!(!snapshot.running);
        assert_eq!(snapshot.remaining_secs, 2);

        clock.start();
        assert_eq!(clock.advance(Duration::from_secs(5)), Some(SprintEvent::BreakCompleted));
        assert_eq!(clock.snapshot().phase, SprintPhase::Focus);
        assert_eq!(clock.completed_focus_blocks(), 1);
    }

    #[test]
    fn test_reset_keeps_completed_blocks() {
        let mut clock = SprintClock::new(short_settings());
        clock.start();
        clock.advance(Duration::from_secs(3));
        clock.reset();
        let snapshot = clock.snapshot();
        assert_eq!(snapshot.phase, SprintPhase::Focus);
        assert_eq!(snapshot.remaining_secs, 3);
        assert_eq!(snapshot.completed_focus_blocks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_ticks_until_shutdown() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ticks);
        let timer = SprintTimer::spawn(Duration::from_secs(1), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        timer.shutdown();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(timer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_stops_when_callback_declines() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ticks);
        let timer = SprintTimer::spawn(Duration::from_secs(1), move |_| {
            counter.fetch_add(1, Ordering::SeqCst) < 1
        });

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(timer.is_finished());
    }
}
