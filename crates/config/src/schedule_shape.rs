// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dynamic schedule shapes accepted in `config.json`.
//!
//! A schedule field may be a single cron string, a list of cron strings
//! (match = any), or (for destroy schedules only) the literal `false`
//! meaning "permanent, never auto-destroy". Normalization happens here so
//! the scheduler only ever sees a flat list of parsed expressions.

use crate::error::ConfigError;
use pv_core::CronExpr;
use serde::{Deserialize, Serialize};

/// Raw schedule field: `cron | [cron] | false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleField {
    Single(String),
    Multiple(Vec<String>),
    Literal(bool),
}

impl ScheduleField {
    /// The literal `false` (permanent) marker.
    pub fn is_permanent(&self) -> bool {
        matches!(self, ScheduleField::Literal(false))
    }

    /// Normalize to parsed cron expressions.
    ///
    /// `allow_permanent` is set only for destroy schedules; the literal
    /// `true` is rejected everywhere.
    pub fn to_crons(&self, allow_permanent: bool) -> Result<Vec<CronExpr>, ConfigError> {
        let entries: &[String] = match self {
            ScheduleField::Single(s) => std::slice::from_ref(s),
            ScheduleField::Multiple(list) => list,
            ScheduleField::Literal(false) if allow_permanent => return Ok(Vec::new()),
            ScheduleField::Literal(value) => {
                return Err(ConfigError::Invalid(format!(
                    "schedule literal '{}' is not allowed here",
                    value
                )));
            }
        };
        if entries.is_empty() {
            return Err(ConfigError::Invalid("schedule list is empty".to_string()));
        }
        entries
            .iter()
            .map(|s| {
                CronExpr::parse(s)
                    .map_err(|source| ConfigError::Schedule { schedule: s.clone(), source })
            })
            .collect()
    }
}

impl ScheduleField {
    /// Normalize to parsed schedules, accepting `@event` specials.
    ///
    /// Job schedules use this; the permanent literal is never valid here.
    pub fn to_schedules(&self) -> Result<Vec<pv_core::Schedule>, ConfigError> {
        let entries: &[String] = match self {
            ScheduleField::Single(s) => std::slice::from_ref(s),
            ScheduleField::Multiple(list) => list,
            ScheduleField::Literal(value) => {
                return Err(ConfigError::Invalid(format!(
                    "schedule literal '{}' is not allowed here",
                    value
                )));
            }
        };
        if entries.is_empty() {
            return Err(ConfigError::Invalid("schedule list is empty".to_string()));
        }
        entries
            .iter()
            .map(|s| {
                pv_core::Schedule::parse(s)
                    .map_err(|source| ConfigError::Schedule { schedule: s.clone(), source })
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "schedule_shape_tests.rs"]
mod tests;
