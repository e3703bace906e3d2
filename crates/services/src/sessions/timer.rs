use std::fmt;

use chrono::{DateTime, Duration, Utc};

use quiz_core::Clock;

/// What a running countdown bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownScope {
    /// Time for the question at this index.
    Question(usize),
    /// Time for the whole session.
    Session,
}

/// A countdown toward an absolute deadline.
///
/// Deadline based, so remaining time is always `deadline - now` and survives
/// reloads and clock drift of the ticker driving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    scope: CountdownScope,
    deadline: DateTime<Utc>,
}

impl Countdown {
    #[must_use]
    pub fn per_item(index: usize, seconds: u32, clock: &Clock) -> Self {
        Self {
            scope: CountdownScope::Question(index),
            deadline: clock.deadline_after(Duration::seconds(i64::from(seconds))),
        }
    }

    #[must_use]
    pub fn total(deadline: DateTime<Utc>) -> Self {
        Self {
            scope: CountdownScope::Session,
            deadline,
        }
    }

    #[must_use]
    pub fn scope(&self) -> CountdownScope {
        self.scope
    }

    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    #[must_use]
    pub fn remaining(&self, clock: &Clock) -> Duration {
        clock.remaining_until(self.deadline)
    }

    #[must_use]
    pub fn is_expired(&self, clock: &Clock) -> bool {
        self.remaining(clock) <= Duration::zero()
    }

    /// Partial seconds round up, so `00:00` only shows once expired.
    #[must_use]
    pub fn display(&self, clock: &Clock) -> TimerDisplay {
        let millis = self.remaining(clock).num_milliseconds().max(0);
        TimerDisplay {
            scope: self.scope,
            remaining_secs: (millis + 999) / 1000,
        }
    }
}

/// Remaining time as shown to the student, rendered `MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerDisplay {
    pub scope: CountdownScope,
    pub remaining_secs: i64,
}

impl fmt::Display for TimerDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.remaining_secs.max(0);
        write!(f, "{:02}:{:02}", secs / 60, secs % 60)
    }
}
