// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unified schedule model: time crons and `@event` specials.
//!
//! Time crons never match an event; event specials never match a time.

use crate::cron::{CronError, CronExpr};
use crate::event::EventKind;
use chrono::{DateTime, Local};
use std::fmt;

/// A parsed schedule entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    Cron(CronExpr),
    Event(EventKind),
}

impl Schedule {
    /// Parse either a 5-field cron expression or an `@`-special token.
    pub fn parse(source: &str) -> Result<Self, CronError> {
        let source = source.trim();
        if source.starts_with('@') {
            return EventKind::from_token(source)
                .map(Schedule::Event)
                .ok_or_else(|| CronError::UnknownSpecial(source.to_string()));
        }
        CronExpr::parse(source).map(Schedule::Cron)
    }

    /// Whether this schedule matches the minute-aligned instant `t`.
    pub fn matches_time(&self, t: DateTime<Local>) -> bool {
        match self {
            Schedule::Cron(expr) => expr.matches(t),
            Schedule::Event(_) => false,
        }
    }

    /// Whether this schedule fires on the given lifecycle event kind.
    pub fn matches_event(&self, kind: EventKind) -> bool {
        match self {
            Schedule::Cron(_) => false,
            Schedule::Event(k) => *k == kind,
        }
    }

    /// Catch-up query; `None` for event specials.
    pub fn latest_before(&self, t: DateTime<Local>) -> Option<DateTime<Local>> {
        match self {
            Schedule::Cron(expr) => expr.latest_before(t),
            Schedule::Event(_) => None,
        }
    }

    /// Next fire time; `None` for event specials.
    pub fn next_after(&self, t: DateTime<Local>) -> Option<DateTime<Local>> {
        match self {
            Schedule::Cron(expr) => expr.next_after(t),
            Schedule::Event(_) => None,
        }
    }

    pub fn is_event(&self) -> bool {
        matches!(self, Schedule::Event(_))
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Cron(expr) => write!(f, "{}", expr),
            Schedule::Event(kind) => write!(f, "{}", kind.token()),
        }
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
