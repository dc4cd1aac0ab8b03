use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{AlarmExecutionLog, AlarmExecutionRoutine, ExecutionStatus};
use crate::schema::{alarm, alarm_exec_log, alarm_exec_routine};
use crate::services::alarms::find_owned_alarm;
use crate::services::routines::ensure_owned_routines;

/// Per-routine outcome reported by the client when an alarm was dismissed.
#[derive(Debug, Clone)]
pub struct RoutineOutcome {
    pub routine_id: String,
    pub completed: bool,
    pub actual_value: Option<i32>,
    pub completed_ts: Option<String>,
    pub abort_ts: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct NewExecution {
    pub alarm_id: String,
    pub scheduled_ts: Option<String>,
    pub dismissed_ts: Option<String>,
    pub routines: Vec<RoutineOutcome>,
}

/// Correction to one routine outcome, matched by routine id.
#[derive(Debug, Clone)]
pub struct OutcomePatch {
    pub routine_id: String,
    pub completed: bool,
    pub actual_value: Option<i32>,
    pub completed_ts: Option<String>,
    pub abort_ts: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExecutionDetail {
    pub log: AlarmExecutionLog,
    pub routines: Vec<AlarmExecutionRoutine>,
}

/// Aggregate figures stored on an execution log row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionSummary {
    pub total: i32,
    pub completed: i32,
    pub success_rate: f64,
    pub status: ExecutionStatus,
}

impl ExecutionSummary {
    pub fn from_counts(total: i32, completed: i32) -> Self {
        let success_rate = if total > 0 {
            round_to(completed as f64 / total as f64, 3)
        } else {
            0.0
        };
        // An execution with no routines completed nothing, so it is aborted.
        let status = if total > 0 && completed == total {
            ExecutionStatus::Success
        } else if completed > 0 {
            ExecutionStatus::Partial
        } else {
            ExecutionStatus::Aborted
        };

        Self {
            total,
            completed,
            success_rate,
            status,
        }
    }

    pub fn from_flags<I>(flags: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let (total, completed) = flags.into_iter().fold((0, 0), |(total, done), flag| {
            (total + 1, done + i32::from(flag))
        });
        Self::from_counts(total, completed)
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Stores the log row and one detail row per outcome, returning the new exec id.
pub fn record_execution(conn: &mut PgConnection, user_id: &str, input: NewExecution) -> ApiResult<String> {
    let summary = ExecutionSummary::from_flags(input.routines.iter().map(|r| r.completed));

    conn.transaction(|conn| {
        find_owned_alarm(conn, user_id, &input.alarm_id)?;
        let routine_ids: Vec<String> = input.routines.iter().map(|r| r.routine_id.clone()).collect();
        ensure_owned_routines(conn, user_id, &routine_ids)?;

        let exec_id = Uuid::new_v4().to_string();
        let entry = AlarmExecutionLog {
            exec_id: exec_id.clone(),
            alarm_id: input.alarm_id.clone(),
            scheduled_ts: input.scheduled_ts.clone(),
            dismissed_ts: input.dismissed_ts.clone(),
            total_routines: summary.total,
            completed_routines: summary.completed,
            success_rate: summary.success_rate,
            status: summary.status.as_str().to_string(),
        };
        diesel::insert_into(alarm_exec_log::table)
            .values(&entry)
            .execute(conn)?;

        let details: Vec<AlarmExecutionRoutine> = input
            .routines
            .iter()
            .map(|r| AlarmExecutionRoutine {
                axr_id: Uuid::new_v4().to_string(),
                exec_id: exec_id.clone(),
                routine_id: r.routine_id.clone(),
                completed: i32::from(r.completed),
                actual_value: r.actual_value,
                completed_ts: r.completed_ts.clone(),
                abort_ts: r.abort_ts.clone(),
                sort_order: r.sort_order,
            })
            .collect();
        if !details.is_empty() {
            diesel::insert_into(alarm_exec_routine::table)
                .values(&details)
                .execute(conn)?;
        }

        log::info!(
            "Recorded execution {} for alarm {}: {}/{} ({})",
            exec_id,
            input.alarm_id,
            summary.completed,
            summary.total,
            summary.status.as_str()
        );
        Ok(exec_id)
    })
}

fn find_owned_log(conn: &mut PgConnection, user_id: &str, exec_id: &str) -> ApiResult<AlarmExecutionLog> {
    alarm_exec_log::table
        .inner_join(alarm::table)
        .filter(alarm_exec_log::exec_id.eq(exec_id))
        .filter(alarm::user_id.eq(user_id))
        .select(AlarmExecutionLog::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::not_found("Execution"))
}

fn load_details(conn: &mut PgConnection, exec_id: &str) -> ApiResult<Vec<AlarmExecutionRoutine>> {
    Ok(alarm_exec_routine::table
        .filter(alarm_exec_routine::exec_id.eq(exec_id))
        .order(alarm_exec_routine::sort_order.asc())
        .select(AlarmExecutionRoutine::as_select())
        .load(conn)?)
}

pub fn get_execution(conn: &mut PgConnection, user_id: &str, exec_id: &str) -> ApiResult<ExecutionDetail> {
    let exec_log = find_owned_log(conn, user_id, exec_id)?;
    let routines = load_details(conn, exec_id)?;
    Ok(ExecutionDetail {
        log: exec_log,
        routines,
    })
}

/// Applies outcome patches and recomputes the log's aggregates.
///
/// Patches naming a routine with no detail row in this execution are skipped.
pub fn update_execution(
    conn: &mut PgConnection,
    user_id: &str,
    exec_id: &str,
    patches: &[OutcomePatch],
) -> ApiResult<ExecutionDetail> {
    conn.transaction(|conn| {
        find_owned_log(conn, user_id, exec_id)?;

        for patch in patches {
            let updated = diesel::update(
                alarm_exec_routine::table
                    .filter(alarm_exec_routine::exec_id.eq(exec_id))
                    .filter(alarm_exec_routine::routine_id.eq(&patch.routine_id)),
            )
            .set((
                alarm_exec_routine::completed.eq(i32::from(patch.completed)),
                alarm_exec_routine::actual_value.eq(patch.actual_value),
                alarm_exec_routine::completed_ts.eq(&patch.completed_ts),
                alarm_exec_routine::abort_ts.eq(&patch.abort_ts),
            ))
            .execute(conn)?;

            if updated == 0 {
                log::debug!(
                    "Execution {} has no routine {}, patch skipped",
                    exec_id,
                    patch.routine_id
                );
            }
        }

        let routines = load_details(conn, exec_id)?;
        let summary = ExecutionSummary::from_flags(routines.iter().map(|r| r.completed != 0));

        let exec_log = diesel::update(alarm_exec_log::table.filter(alarm_exec_log::exec_id.eq(exec_id)))
            .set((
                alarm_exec_log::total_routines.eq(summary.total),
                alarm_exec_log::completed_routines.eq(summary.completed),
                alarm_exec_log::success_rate.eq(summary.success_rate),
                alarm_exec_log::status.eq(summary.status.as_str()),
            ))
            .returning(AlarmExecutionLog::as_returning())
            .get_result(conn)?;

        Ok(ExecutionDetail {
            log: exec_log,
            routines,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_of_three_is_partial() {
        let summary = ExecutionSummary::from_flags([true, true, false]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.success_rate, 0.667);
        assert_eq!(summary.status, ExecutionStatus::Partial);
    }

    #[test]
    fn test_all_completed_is_success() {
        let summary = ExecutionSummary::from_flags([true, true, true]);
        assert_eq!(summary.success_rate, 1.0);
        assert_eq!(summary.status, ExecutionStatus::Success);
    }

    #[test]
    fn test_none_completed_is_aborted() {
        let summary = ExecutionSummary::from_flags([false, false]);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.status, ExecutionStatus::Aborted);
    }

    #[test]
    fn test_empty_execution_is_aborted_with_zero_rate() {
        let summary = ExecutionSummary::from_flags(std::iter::empty());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.status, ExecutionStatus::Aborted);
    }

    #[test]
    fn test_rate_is_rounded_to_three_places() {
        assert_eq!(ExecutionSummary::from_counts(3, 1).success_rate, 0.333);
        assert_eq!(ExecutionSummary::from_counts(7, 5).success_rate, 0.714);
        assert_eq!(ExecutionSummary::from_counts(8, 1).success_rate, 0.125);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.6666, 2), 0.67);
        assert_eq!(round_to(0.5, 0), 1.0);
        assert_eq!(round_to(0.1234, 3), 0.123);
    }
}
