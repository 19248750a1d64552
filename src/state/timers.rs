//! Scheduled transitions.
//!
//! The session only ever has two kinds of delayed work: exposing rematch
//! controls after a round result, and clearing the screen after the pairing
//! ended. Each timer carries the session epoch it was created at; the state
//! machine ignores a ticket whose epoch no longer matches.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Grace period after a round result elapsed; show rematch controls.
    RematchOffer,
    /// Delayed reset after a declined rematch.
    DeclineReset,
    /// Delayed reset after the opponent disconnected.
    OpponentLeftReset,
}

impl TimerKind {
    pub fn is_reset(&self) -> bool {
        matches!(self, Self::DeclineReset | Self::OpponentLeftReset)
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RematchOffer => write!(f, "rematch_offer"),
            Self::DeclineReset => write!(f, "decline_reset"),
            Self::OpponentLeftReset => write!(f, "opponent_left_reset"),
        }
    }
}

/// A timer request produced by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerTicket {
    /// Session epoch at the time the timer was requested
    pub epoch: u64,

    pub kind: TimerKind,

    /// Room the timer belongs to, if any
    pub room_id: Option<String>,
}

/// Timer delays, resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerDelays {
    pub result_grace: Duration,
    pub decline_reset: Duration,
    pub opponent_left_reset: Duration,
}

impl TimerDelays {
    pub fn delay_for(&self, kind: TimerKind) -> Duration {
        match kind {
            TimerKind::RematchOffer => self.result_grace,
            TimerKind::DeclineReset => self.decline_reset,
            TimerKind::OpponentLeftReset => self.opponent_left_reset,
        }
    }

    /// Pair a ticket with its configured delay.
    pub fn schedule(&self, ticket: TimerTicket) -> ScheduledTimer {
        ScheduledTimer {
            delay: self.delay_for(ticket.kind),
            ticket,
        }
    }
}

impl Default for TimerDelays {
    fn default() -> Self {
        Self {
            result_grace: Duration::from_secs(2),
            decline_reset: Duration::from_secs(2),
            opponent_left_reset: Duration::from_secs(3),
        }
    }
}

/// A ticket paired with its delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTimer {
    pub ticket: TimerTicket,
    pub delay: Duration,
}

/// Pending timers, ordered by deadline.
#[derive(Debug, Default)]
pub struct TimerQueue {
    pending: Vec<(Instant, TimerTicket)>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a timer relative to `now`.
    pub fn schedule(&mut self, now: Instant, timer: ScheduledTimer) {
        let deadline = now + timer.delay;
        let idx = self
            .pending
            .partition_point(|(existing, _)| *existing <= deadline);
        self.pending.insert(idx, (deadline, timer.ticket));
    }

    /// Earliest deadline, if any timer is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.first().map(|(deadline, _)| *deadline)
    }

    /// Remove and return every ticket due at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Vec<TimerTicket> {
        let due = self.pending.partition_point(|(deadline, _)| *deadline <= now);
        self.pending.drain(..due).map(|(_, ticket)| ticket).collect()
    }

    /// Drop timers created before `epoch`.
    pub fn retain_from(&mut self, epoch: u64) {
        self.pending.retain(|(_, ticket)| ticket.epoch >= epoch);
    }

    /// Drop every pending timer.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(epoch: u64, kind: TimerKind, millis: u64) -> ScheduledTimer {
        ScheduledTimer {
            ticket: TimerTicket {
                epoch,
                kind,
                room_id: None,
            },
            delay: Duration::from_millis(millis),
        }
    }

    #[test]
    fn test_queue_orders_by_deadline() {
        let now = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(now, timer(1, TimerKind::OpponentLeftReset, 3000));
        queue.schedule(now, timer(2, TimerKind::RematchOffer, 2000));

        assert_eq!(queue.next_deadline(), Some(now + Duration::from_millis(2000)));

        let due = queue.pop_due(now + Duration::from_millis(2500));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].kind, TimerKind::RematchOffer);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_delays_per_kind() {
        let delays = TimerDelays::default();
        assert_eq!(delays.delay_for(TimerKind::RematchOffer), Duration::from_secs(2));
        assert_eq!(delays.delay_for(TimerKind::DeclineReset), Duration::from_secs(2));
        assert_eq!(
            delays.delay_for(TimerKind::OpponentLeftReset),
            Duration::from_secs(3)
        );
        assert!(TimerKind::DeclineReset.is_reset());
        assert!(!TimerKind::RematchOffer.is_reset());
    }

    #[test]
    fn test_nothing_due_early() {
        let now = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(now, timer(1, TimerKind::DeclineReset, 100));
        assert!(queue.pop_due(now).is_empty());
        assert!(!queue.is_empty());
    }

    #[test]
    fn test_retain_from_epoch() {
        let now = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(now, timer(1, TimerKind::DeclineReset, 100));
        queue.schedule(now, timer(4, TimerKind::RematchOffer, 100));

        queue.retain_from(3);
        assert_eq!(queue.len(), 1);

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.next_deadline(), None);
    }
}
