use chrono::NaiveTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Queryable, Selectable, Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::app_user)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::routine)]
pub struct Routine {
    pub routine_id: String,
    pub user_id: String,
    pub title: String,
    pub routine_type: String,
    pub goal_value: Option<i32>,
    pub duration_seconds: Option<i32>,
    pub deadline_time: Option<NaiveTime>,
    pub success_note: Option<String>,
}

/// Mutable routine fields, written as a whole on update.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::routine, treat_none_as_null = true)]
pub struct RoutineChangeset {
    pub title: String,
    pub routine_type: String,
    pub goal_value: Option<i32>,
    pub duration_seconds: Option<i32>,
    pub deadline_time: Option<NaiveTime>,
    pub success_note: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::alarm)]
pub struct Alarm {
    pub alarm_id: String,
    pub user_id: String,
    pub time: NaiveTime,
    pub sound_volume: f64,
    pub status: String,
}

/// Partial alarm update; `None` leaves the column untouched.
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = crate::schema::alarm)]
pub struct AlarmChangeset {
    pub time: Option<NaiveTime>,
    pub status: Option<String>,
    pub sound_volume: Option<f64>,
}

impl AlarmChangeset {
    pub fn is_empty(&self) -> bool {
        self.time.is_none() && self.status.is_none() && self.sound_volume.is_none()
    }
}

#[derive(Queryable, Selectable, Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::alarm_routine)]
pub struct AlarmRoutine {
    pub alr_id: String,
    pub alarm_id: String,
    pub routine_id: String,
    pub sort_order: i32,
}

#[derive(Queryable, Selectable, Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::alarm_repeat_day)]
pub struct AlarmRepeatDay {
    pub id: String,
    pub alarm_id: String,
    pub weekday: i32,
}

#[derive(Queryable, Selectable, Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::alarm_exec_log)]
pub struct AlarmExecutionLog {
    pub exec_id: String,
    pub alarm_id: String,
    pub scheduled_ts: Option<String>,
    pub dismissed_ts: Option<String>,
    pub total_routines: i32,
    pub completed_routines: i32,
    pub success_rate: f64,
    pub status: String,
}

#[derive(Queryable, Selectable, Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::alarm_exec_routine)]
pub struct AlarmExecutionRoutine {
    pub axr_id: String,
    pub exec_id: String,
    pub routine_id: String,
    pub completed: i32,
    pub actual_value: Option<i32>,
    pub completed_ts: Option<String>,
    pub abort_ts: Option<String>,
    pub sort_order: i32,
}

/// Outcome of one alarm firing, stored as text in `alarm_exec_log.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionStatus {
    Success,
    Partial,
    Aborted,
    /// Declared by the schema but never assigned by any handler.
    Missed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Partial => "PARTIAL",
            ExecutionStatus::Aborted => "ABORTED",
            ExecutionStatus::Missed => "MISSED",
        }
    }
}
