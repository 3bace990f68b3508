//! Finite backoff schedules consumed one step per retry.

use std::time::Duration;

/// Command schedule steps as `(base_ms, jitter_bound_ms)`. Each wait is
/// `base + uniform(0, jitter_bound)`, 10-20ms up to 1-2s.
const COMMAND_STEPS: &[(u64, u64)] = &[
    (10, 10),
    (25, 25),
    (50, 50),
    (100, 100),
    (250, 250),
    (500, 500),
    (1000, 1000),
];

/// Transaction-start steps: shorter, fixed, no jitter. A failed BEGIN has
/// no side effects, so these can stay tight.
const TX_STEPS: &[(u64, u64)] = &[(10, 0), (25, 0), (50, 0), (100, 0), (250, 0)];

/// One wait handed to the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    pub delay: Duration,
    /// True when this is the schedule's final step.
    pub last: bool,
}

/// An ordered, finite sequence of backoff waits.
///
/// Jitter is sampled when a step is consumed, not when the schedule is
/// built, so concurrent retry loops never share a wait sequence. One
/// instance serves exactly one logical retry loop; it is not restartable.
#[derive(Debug)]
pub struct BackoffSchedule {
    steps: &'static [(u64, u64)],
    next: usize,
}

impl BackoffSchedule {
    /// Jittered schedule for command execution (7 steps).
    pub fn command() -> Self {
        Self {
            steps: COMMAND_STEPS,
            next: 0,
        }
    }

    /// Fixed schedule for transaction start (5 steps).
    pub fn transaction() -> Self {
        Self {
            steps: TX_STEPS,
            next: 0,
        }
    }

    /// Total number of steps in this schedule.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Consume the next step, sampling jitter now. `None` once exhausted.
    pub fn next_wait(&mut self) -> Option<Wait> {
        let (base, jitter_bound) = *self.steps.get(self.next)?;
        self.next += 1;
        let jitter = if jitter_bound == 0 {
            0
        } else {
            (rand::random::<f64>() * jitter_bound as f64) as u64
        };
        Some(Wait {
            delay: Duration::from_millis(base + jitter),
            last: self.next == self.steps.len(),
        })
    }
}
