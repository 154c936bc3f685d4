//! Absolute-deadline sleeping
//!
//! Every wait in the engine targets an absolute time on the shared time
//! base. Remaining time is recomputed each slice, so late wake-ups never
//! accumulate into drift.

use heapless::Deque;

use crate::state::MotorEvent;
use crate::traits::{ClockSync, TaskRuntime};

/// Longest single wait; bounds watchdog feeding and event latency
pub const POLL_INTERVAL_US: u64 = 50_000;

/// Deferred events held between cycles
pub const INBOX_DEPTH: usize = 16;

/// How a sleep ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wake {
    Deadline,
    Interrupted(MotorEvent),
}

/// Events received during a sleep that did not interrupt it
#[derive(Debug, Default)]
pub struct EventInbox {
    queue: Deque<MotorEvent, INBOX_DEPTH>,
    dropped: u32,
}

impl EventInbox {
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
            dropped: 0,
        }
    }

    /// Defer an event; the oldest is dropped when full
    pub fn push(&mut self, event: MotorEvent) {
        if self.queue.is_full() {
            if let Some(old) = self.queue.pop_front() {
                warn!("Inbox full, dropping {:?}", old);
            }
            self.dropped = self.dropped.saturating_add(1);
        }
        let _ = self.queue.push_back(event);
    }

    /// Put an interrupting event back so it is handled first
    pub fn push_front(&mut self, event: MotorEvent) {
        if self.queue.is_full() {
            self.queue.pop_back();
            self.dropped = self.dropped.saturating_add(1);
        }
        let _ = self.queue.push_front(event);
    }

    pub fn pop(&mut self) -> Option<MotorEvent> {
        self.queue.pop_front()
    }

    /// Remove the oldest event matching `pred`, keeping the others in order
    pub fn take_first<F>(&mut self, pred: F) -> Option<MotorEvent>
    where
        F: Fn(&MotorEvent) -> bool,
    {
        let mut found = None;
        for _ in 0..self.queue.len() {
            let Some(event) = self.queue.pop_front() else {
                break;
            };
            if found.is_none() && pred(&event) {
                found = Some(event);
            } else {
                let _ = self.queue.push_back(event);
            }
        }
        found
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Events lost to overflow
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// Sleep until `deadline_us` (shared time)
///
/// Feeds the watchdog every slice. Events matching `interrupt` end the
/// sleep early, including one already deferred in `inbox`; `TimerFired`
/// only forces a deadline recheck; anything else is deferred to `inbox`.
/// A deadline at or before now returns at once.
pub async fn sleep_until<C, R, F>(
    clock: &C,
    runtime: &mut R,
    inbox: &mut EventInbox,
    deadline_us: u64,
    interrupt: F,
) -> Wake
where
    C: ClockSync,
    R: TaskRuntime,
    F: Fn(&MotorEvent) -> bool,
{
    if let Some(event) = inbox.take_first(&interrupt) {
        return Wake::Interrupted(event);
    }

    loop {
        runtime.feed_watchdog();

        let now = clock.now_us();
        if now >= deadline_us {
            return Wake::Deadline;
        }

        let slice = (deadline_us - now).min(POLL_INTERVAL_US);
        match runtime.receive_within(slice).await {
            None | Some(MotorEvent::TimerFired) => {}
            Some(event) if interrupt(&event) => return Wake::Interrupted(event),
            Some(event) => inbox.push(event),
        }
    }
}
