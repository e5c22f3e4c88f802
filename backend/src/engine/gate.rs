// src/engine/gate.rs

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::{
    config::{COOLDOWN_MINUTES, MAX_ATTEMPTS},
    error::AppError,
    models::attempt::AttemptRecord,
};

/// Outcome of an attempt gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Locked { retry_after_minutes: i64 },
}

impl GateDecision {
    /// Turns a denial into the error the submission path returns.
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            GateDecision::Allowed => Ok(()),
            GateDecision::Locked { retry_after_minutes } => {
                Err(AppError::AttemptLocked { retry_after_minutes })
            }
        }
    }
}

/// Pre-attempt display payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateStatus {
    pub locked: bool,
    pub retry_after_minutes: i64,
    pub attempts_used: usize,
}

/// Decides whether a student may start another attempt of an exam.
///
/// Below `max_attempts` recorded attempts the gate is always open. Once the quota
/// is used, only the most recent attempt matters: the gate reopens when
/// `cooldown` has elapsed since it, and the next check again looks only at the
/// latest record rather than at a sliding count.
#[derive(Debug, Clone, Copy)]
pub struct AttemptGate {
    max_attempts: usize,
    cooldown: TimeDelta,
}

impl Default for AttemptGate {
    fn default() -> Self {
        Self::new(MAX_ATTEMPTS, COOLDOWN_MINUTES)
    }
}

impl AttemptGate {
    /// A `cooldown_minutes` outside `TimeDelta`'s range uses `COOLDOWN_MINUTES`.
    pub fn new(max_attempts: usize, cooldown_minutes: i64) -> Self {
        let cooldown = TimeDelta::try_minutes(cooldown_minutes)
            .unwrap_or_else(|| TimeDelta::minutes(COOLDOWN_MINUTES));
        Self {
            max_attempts,
            cooldown,
        }
    }

    /// `history` is every ledger entry for one (student, exam) pair, in any order.
    pub fn check(&self, history: &[AttemptRecord], now: DateTime<Utc>) -> GateDecision {
        if history.len() < self.max_attempts {
            return GateDecision::Allowed;
        }

        let Some(last_attempt) = history.iter().map(|r| r.created_at).max() else {
            return GateDecision::Allowed;
        };

        let elapsed = now - last_attempt;
        if elapsed >= self.cooldown {
            return GateDecision::Allowed;
        }

        let remaining_ms = (self.cooldown - elapsed).num_milliseconds();
        GateDecision::Locked {
            retry_after_minutes: (remaining_ms + 59_999) / 60_000,
        }
    }

    pub fn status(&self, history: &[AttemptRecord], now: DateTime<Utc>) -> GateStatus {
        let retry_after_minutes = match self.check(history, now) {
            GateDecision::Allowed => 0,
            GateDecision::Locked { retry_after_minutes } => retry_after_minutes,
        };
        GateStatus {
            locked: retry_after_minutes > 0,
            retry_after_minutes,
            attempts_used: history.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attempt::AnswerSheet;
    use chrono::TimeZone;
    use sqlx::types::Json;

    fn record(attempt_number: i32, created_at: DateTime<Utc>) -> AttemptRecord {
        AttemptRecord {
            id: attempt_number as i64,
            student_id: 1,
            exam_id: 1,
            answers: Json(AnswerSheet::default()),
            score: 50,
            passed: false,
            attempt_number,
            created_at,
        }
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn three_attempts_ending_at(last: DateTime<Utc>) -> Vec<AttemptRecord> {
        vec![
            record(3, last),
            record(2, last - TimeDelta::minutes(10)),
            record(1, last - TimeDelta::minutes(20)),
        ]
    }

    #[test]
    fn fewer_than_max_attempts_is_always_allowed() {
        let gate = AttemptGate::default();
        let history = vec![record(2, base()), record(1, base())];
        assert_eq!(gate.check(&[], base()), GateDecision::Allowed);
        assert_eq!(gate.check(&history, base()), GateDecision::Allowed);
        // Timestamps in the future do not matter below the quota.
        assert_eq!(
            gate.check(&history, base() - TimeDelta::days(1)),
            GateDecision::Allowed
        );
    }

    #[test]
    fn locked_right_after_third_attempt() {
        let gate = AttemptGate::default();
        let history = three_attempts_ending_at(base());
        assert_eq!(
            gate.check(&history, base()),
            GateDecision::Locked {
                retry_after_minutes: 180
            }
        );
    }

    #[test]
    fn retry_minutes_round_up() {
        let gate = AttemptGate::default();
        let history = three_attempts_ending_at(base());
        let now = base() + TimeDelta::minutes(60) + TimeDelta::seconds(1);
        assert_eq!(
            gate.check(&history, now),
            GateDecision::Locked {
                retry_after_minutes: 120
            }
        );

        let now = base() + TimeDelta::minutes(179) + TimeDelta::milliseconds(999);
        assert_eq!(
            gate.check(&history, now),
            GateDecision::Locked {
                retry_after_minutes: 1
            }
        );
    }

    #[test]
    fn cooldown_boundary_is_inclusive() {
        let gate = AttemptGate::default();
        let history = three_attempts_ending_at(base());
        assert_eq!(
            gate.check(&history, base() + TimeDelta::hours(3)),
            GateDecision::Allowed
        );
        assert_eq!(
            gate.check(&history, base() + TimeDelta::hours(5)),
            GateDecision::Allowed
        );
    }

    #[test]
    fn only_latest_record_counts_after_reset() {
        let gate = AttemptGate::default();
        // Fourth attempt taken after the cooldown reset: locked again from its timestamp.
        let mut history = three_attempts_ending_at(base());
        let fourth = base() + TimeDelta::hours(4);
        history.insert(0, record(4, fourth));

        assert_eq!(
            gate.check(&history, fourth + TimeDelta::minutes(30)),
            GateDecision::Locked {
                retry_after_minutes: 150
            }
        );
        assert_eq!(
            gate.check(&history, fourth + TimeDelta::hours(3)),
            GateDecision::Allowed
        );
    }

    #[test]
    fn latest_record_is_found_regardless_of_order() {
        let gate = AttemptGate::default();
        let mut history = three_attempts_ending_at(base());
        history.reverse();
        assert_eq!(
            gate.check(&history, base() + TimeDelta::minutes(90)),
            GateDecision::Locked {
                retry_after_minutes: 90
            }
        );
    }

    #[test]
    fn status_reports_attempts_used() {
        let gate = AttemptGate::default();
        let history = three_attempts_ending_at(base());
        let status = gate.status(&history, base() + TimeDelta::minutes(30));
        assert_eq!(
            status,
            GateStatus {
                locked: true,
                retry_after_minutes: 150,
                attempts_used: 3,
            }
        );

        let open = gate.status(&history[..1], base());
        assert!(!open.locked);
        assert_eq!(open.retry_after_minutes, 0);
        assert_eq!(open.attempts_used, 1);
    }

    #[test]
    fn locked_decision_maps_to_attempt_locked_error() {
        let err = GateDecision::Locked {
            retry_after_minutes: 7,
        }
        .into_result()
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::AttemptLocked {
                retry_after_minutes: 7
            }
        ));
        assert!(GateDecision::Allowed.into_result().is_ok());
    }

    #[test]
    fn out_of_range_cooldown_uses_default() {
        let gate = AttemptGate::new(3, i64::MAX);
        let history = three_attempts_ending_at(base());
        assert_eq!(
            gate.check(&history, base() + TimeDelta::minutes(1)),
            GateDecision::Locked {
                retry_after_minutes: COOLDOWN_MINUTES - 1
            }
        );
    }
}
