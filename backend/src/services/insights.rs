//! Read-only aggregates over execution history: per-routine completion,
//! the monthly calendar and the weekly feedback summary.

use chrono::{Datelike, IsoWeek, NaiveDate};
use diesel::dsl::{count, sum};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{ApiError, ApiResult};
use crate::schema::{alarm, alarm_exec_log, alarm_exec_routine, routine};
use crate::services::executions::round_to;
use crate::services::time_format::timestamp_date;

pub const WEEKLY_FEEDBACK_WEEKS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutineStat {
    pub title: String,
    pub done: i64,
    pub total: i64,
    pub rate: f64,
}

impl RoutineStat {
    pub fn new(title: String, done: i64, total: i64) -> Self {
        let rate = if total > 0 {
            round_to(done as f64 / total as f64, 2)
        } else {
            0.0
        };
        Self {
            title,
            done,
            total,
            rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay {
    pub date: String,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyFeedback {
    pub year: i32,
    pub week: u32,
    /// Number of executions logged in the week.
    pub total: i64,
    /// Completed routines summed over those executions.
    pub completed: i64,
    pub rate: f64,
}

/// Log row fields the calendar and weekly views need.
#[derive(Debug, Clone)]
pub struct LogSample {
    pub scheduled_ts: Option<String>,
    pub total_routines: i32,
    pub completed_routines: i32,
    pub success_rate: f64,
}

/// Completion counts per routine title, over every execution detail row
/// of the user's routines. Routines sharing a title are merged.
pub fn routine_stats(conn: &mut PgConnection, user_id: &str) -> ApiResult<Vec<RoutineStat>> {
    let rows: Vec<(String, i64, Option<i64>)> = routine::table
        .inner_join(alarm_exec_routine::table)
        .filter(routine::user_id.eq(user_id))
        .group_by(routine::title)
        .select((
            routine::title,
            count(alarm_exec_routine::axr_id),
            sum(alarm_exec_routine::completed),
        ))
        .order(routine::title.asc())
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(title, total, done)| RoutineStat::new(title, done.unwrap_or(0), total))
        .collect())
}

pub fn check_month(month: u32) -> ApiResult<()> {
    if !(1..=12).contains(&month) {
        return Err(ApiError::Validation(
            "month must be between 1 and 12".to_string(),
        ));
    }
    Ok(())
}

pub fn calendar(
    conn: &mut PgConnection,
    user_id: &str,
    year: i32,
    month: u32,
) -> ApiResult<Vec<CalendarDay>> {
    check_month(month)?;
    let samples = load_samples(conn, user_id)?;
    Ok(daily_success_rates(&samples, year, month))
}

pub fn weekly_feedback(conn: &mut PgConnection, user_id: &str) -> ApiResult<Vec<WeeklyFeedback>> {
    let samples = load_samples(conn, user_id)?;
    Ok(weekly_summaries(&samples, WEEKLY_FEEDBACK_WEEKS))
}

fn load_samples(conn: &mut PgConnection, user_id: &str) -> ApiResult<Vec<LogSample>> {
    let rows: Vec<(Option<String>, i32, i32, f64)> = alarm_exec_log::table
        .inner_join(alarm::table)
        .filter(alarm::user_id.eq(user_id))
        .select((
            alarm_exec_log::scheduled_ts,
            alarm_exec_log::total_routines,
            alarm_exec_log::completed_routines,
            alarm_exec_log::success_rate,
        ))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(
            |(scheduled_ts, total_routines, completed_routines, success_rate)| LogSample {
                scheduled_ts,
                total_routines,
                completed_routines,
                success_rate,
            },
        )
        .collect())
}

fn sample_date(sample: &LogSample) -> Option<NaiveDate> {
    let date = sample.scheduled_ts.as_deref().and_then(timestamp_date);
    if date.is_none() {
        log::debug!("Skipping log with unreadable scheduled_ts {:?}", sample.scheduled_ts);
    }
    date
}

/// Average success rate per calendar day of the month, rounded to 2 places.
pub fn daily_success_rates(samples: &[LogSample], year: i32, month: u32) -> Vec<CalendarDay> {
    let mut by_day: BTreeMap<NaiveDate, (f64, u32)> = BTreeMap::new();
    for sample in samples {
        let Some(date) = sample_date(sample) else {
            continue;
        };
        if date.year() != year || date.month() != month {
            continue;
        }
        let entry = by_day.entry(date).or_insert((0.0, 0));
        entry.0 += sample.success_rate;
        entry.1 += 1;
    }

    by_day
        .into_iter()
        .map(|(date, (rate_sum, n))| CalendarDay {
            date: date.format("%Y-%m-%d").to_string(),
            success_rate: round_to(rate_sum / f64::from(n), 2),
        })
        .collect()
}

/// Totals per ISO week (Monday start), newest first, at most `limit` weeks.
pub fn weekly_summaries(samples: &[LogSample], limit: usize) -> Vec<WeeklyFeedback> {
    #[derive(Default)]
    struct Bucket {
        executions: i64,
        completed: i64,
        total_routines: i64,
    }

    let mut by_week: BTreeMap<IsoWeek, Bucket> = BTreeMap::new();
    for sample in samples {
        let Some(date) = sample_date(sample) else {
            continue;
        };
        let bucket = by_week.entry(date.iso_week()).or_default();
        bucket.executions += 1;
        bucket.completed += i64::from(sample.completed_routines);
        bucket.total_routines += i64::from(sample.total_routines);
    }

    by_week
        .into_iter()
        .rev()
        .take(limit)
        .map(|(week, bucket)| WeeklyFeedback {
            year: week.year(),
            week: week.week(),
            total: bucket.executions,
            completed: bucket.completed,
            rate: if bucket.total_routines > 0 {
                round_to(bucket.completed as f64 / bucket.total_routines as f64, 2)
            } else {
                0.0
            },
        })
        .collect()
}
