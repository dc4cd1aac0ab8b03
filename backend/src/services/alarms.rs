use chrono::NaiveTime;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Alarm, AlarmChangeset, AlarmRepeatDay, AlarmRoutine, Routine};
use crate::schema::{alarm, alarm_repeat_day, alarm_routine, routine};
use crate::services::executions::round_to;
use crate::services::routines::ensure_owned_routines;

pub const DEFAULT_SOUND_VOLUME: f64 = 0.8;

/// One `{routine_id, order}` link between an alarm and a routine.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutineLink {
    pub routine_id: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct NewAlarm {
    pub time: NaiveTime,
    pub status: String,
    pub sound_volume: f64,
    pub repeat_days: Vec<i32>,
    pub routines: Vec<RoutineLink>,
}

/// An alarm with its repeat days and fully loaded routines, in link order.
#[derive(Debug, Clone)]
pub struct AlarmDetail {
    pub alarm: Alarm,
    pub repeat_days: Vec<i32>,
    pub routines: Vec<Routine>,
}

/// An alarm with its repeat days and bare routine links, in link order.
#[derive(Debug, Clone)]
pub struct AlarmSummary {
    pub alarm: Alarm,
    pub repeat_days: Vec<i32>,
    pub links: Vec<RoutineLink>,
}

/// Validates weekdays (1 = Monday .. 7 = Sunday), dropping duplicates and sorting.
pub fn normalize_weekdays(days: &[i32]) -> ApiResult<Vec<i32>> {
    if let Some(bad) = days.iter().find(|d| !(1..=7).contains(*d)) {
        return Err(ApiError::Validation(format!(
            "Invalid weekday {}. Must be between 1 (Monday) and 7 (Sunday)",
            bad
        )));
    }
    let unique: BTreeSet<i32> = days.iter().copied().collect();
    Ok(unique.into_iter().collect())
}

/// Checks the 0.0..=1.0 range and keeps two decimal places.
pub fn validate_sound_volume(volume: f64) -> ApiResult<f64> {
    if (0.0..=1.0).contains(&volume) {
        Ok(round_to(volume, 2))
    } else {
        Err(ApiError::Validation(
            "sound_volume must be between 0.0 and 1.0".to_string(),
        ))
    }
}

/// Loads an alarm, treating another user's alarm as missing.
pub fn find_owned_alarm(conn: &mut PgConnection, user_id: &str, alarm_id: &str) -> ApiResult<Alarm> {
    alarm::table
        .filter(alarm::alarm_id.eq(alarm_id))
        .filter(alarm::user_id.eq(user_id))
        .select(Alarm::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::not_found("Alarm"))
}

/// Inserts the alarm, its routine links and its repeat days as one unit.
///
/// `input` is expected to hold normalized weekdays and a validated volume.
pub fn create_alarm(conn: &mut PgConnection, user_id: &str, input: NewAlarm) -> ApiResult<AlarmDetail> {
    conn.transaction(|conn| {
        let routine_ids: Vec<String> = input.routines.iter().map(|l| l.routine_id.clone()).collect();
        ensure_owned_routines(conn, user_id, &routine_ids)?;

        let new_alarm = Alarm {
            alarm_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            time: input.time,
            sound_volume: input.sound_volume,
            status: input.status,
        };
        let created = diesel::insert_into(alarm::table)
            .values(&new_alarm)
            .returning(Alarm::as_returning())
            .get_result(conn)?;

        let links: Vec<AlarmRoutine> = input
            .routines
            .iter()
            .map(|link| AlarmRoutine {
                alr_id: Uuid::new_v4().to_string(),
                alarm_id: created.alarm_id.clone(),
                routine_id: link.routine_id.clone(),
                sort_order: link.sort_order,
            })
            .collect();
        if !links.is_empty() {
            diesel::insert_into(alarm_routine::table)
                .values(&links)
                .execute(conn)?;
        }

        insert_repeat_days(conn, &created.alarm_id, &input.repeat_days)?;

        log::debug!(
            "Created alarm {} with {} routines and {} repeat days",
            created.alarm_id,
            links.len(),
            input.repeat_days.len()
        );

        let mut details = hydrate_alarms(conn, vec![created])?;
        details
            .pop()
            .ok_or_else(|| ApiError::Internal("Created alarm vanished".to_string()))
    })
}

pub fn list_alarms(conn: &mut PgConnection, user_id: &str) -> ApiResult<Vec<AlarmSummary>> {
    let alarms: Vec<Alarm> = alarm::table
        .filter(alarm::user_id.eq(user_id))
        .select(Alarm::as_select())
        .load(conn)?;
    let alarm_ids: Vec<String> = alarms.iter().map(|a| a.alarm_id.clone()).collect();

    let mut days_by_alarm = repeat_days_for(conn, &alarm_ids)?;

    let link_rows: Vec<AlarmRoutine> = alarm_routine::table
        .filter(alarm_routine::alarm_id.eq_any(&alarm_ids))
        .order(alarm_routine::sort_order.asc())
        .select(AlarmRoutine::as_select())
        .load(conn)?;
    let mut links_by_alarm: HashMap<String, Vec<RoutineLink>> = HashMap::new();
    for row in link_rows {
        links_by_alarm.entry(row.alarm_id).or_default().push(RoutineLink {
            routine_id: row.routine_id,
            sort_order: row.sort_order,
        });
    }

    Ok(alarms
        .into_iter()
        .map(|alarm| AlarmSummary {
            repeat_days: days_by_alarm.remove(&alarm.alarm_id).unwrap_or_default(),
            links: links_by_alarm.remove(&alarm.alarm_id).unwrap_or_default(),
            alarm,
        })
        .collect())
}

pub fn get_alarm(conn: &mut PgConnection, user_id: &str, alarm_id: &str) -> ApiResult<AlarmDetail> {
    let found = find_owned_alarm(conn, user_id, alarm_id)?;
    hydrate_alarms(conn, vec![found])?
        .pop()
        .ok_or_else(|| ApiError::not_found("Alarm"))
}

/// Every alarm of the user with repeat days and loaded routines.
pub fn list_alarm_details(conn: &mut PgConnection, user_id: &str) -> ApiResult<Vec<AlarmDetail>> {
    let alarms: Vec<Alarm> = alarm::table
        .filter(alarm::user_id.eq(user_id))
        .select(Alarm::as_select())
        .load(conn)?;
    hydrate_alarms(conn, alarms)
}

/// Applies the provided fields; `repeat_days`, when given, replaces the whole set.
pub fn update_alarm(
    conn: &mut PgConnection,
    user_id: &str,
    alarm_id: &str,
    changes: AlarmChangeset,
    repeat_days: Option<Vec<i32>>,
) -> ApiResult<AlarmDetail> {
    conn.transaction(|conn| {
        find_owned_alarm(conn, user_id, alarm_id)?;

        if !changes.is_empty() {
            diesel::update(alarm::table.filter(alarm::alarm_id.eq(alarm_id)))
                .set(&changes)
                .execute(conn)?;
        }

        if let Some(days) = &repeat_days {
            replace_days(conn, alarm_id, days)?;
        }

        get_alarm(conn, user_id, alarm_id)
    })
}

pub fn update_alarm_status(
    conn: &mut PgConnection,
    user_id: &str,
    alarm_id: &str,
    status: &str,
) -> ApiResult<Alarm> {
    diesel::update(
        alarm::table
            .filter(alarm::alarm_id.eq(alarm_id))
            .filter(alarm::user_id.eq(user_id)),
    )
    .set(alarm::status.eq(status))
    .returning(Alarm::as_returning())
    .get_result(conn)
    .optional()?
    .ok_or_else(|| ApiError::not_found("Alarm"))
}

/// Deletes every repeat day of the alarm, then inserts `days` (already normalized).
pub fn replace_repeat_days(
    conn: &mut PgConnection,
    user_id: &str,
    alarm_id: &str,
    days: &[i32],
) -> ApiResult<Vec<AlarmRepeatDay>> {
    conn.transaction(|conn| {
        find_owned_alarm(conn, user_id, alarm_id)?;
        replace_days(conn, alarm_id, days)
    })
}

/// Removes the alarm's routine links and repeat days, then the alarm.
pub fn delete_alarm(conn: &mut PgConnection, user_id: &str, alarm_id: &str) -> ApiResult<()> {
    conn.transaction(|conn| {
        find_owned_alarm(conn, user_id, alarm_id)?;

        let links = diesel::delete(alarm_routine::table.filter(alarm_routine::alarm_id.eq(alarm_id)))
            .execute(conn)?;
        let days =
            diesel::delete(alarm_repeat_day::table.filter(alarm_repeat_day::alarm_id.eq(alarm_id)))
                .execute(conn)?;

        let deleted = diesel::delete(
            alarm::table
                .filter(alarm::alarm_id.eq(alarm_id))
                .filter(alarm::user_id.eq(user_id)),
        )
        .execute(conn)
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::Conflict("Alarm has recorded executions".to_string()),
            other => other,
        })?;

        if deleted == 0 {
            return Err(ApiError::not_found("Alarm"));
        }
        log::debug!(
            "Deleted alarm {} ({} links, {} repeat days)",
            alarm_id,
            links,
            days
        );
        Ok(())
    })
}

fn replace_days(
    conn: &mut PgConnection,
    alarm_id: &str,
    days: &[i32],
) -> ApiResult<Vec<AlarmRepeatDay>> {
    diesel::delete(alarm_repeat_day::table.filter(alarm_repeat_day::alarm_id.eq(alarm_id)))
        .execute(conn)?;
    insert_repeat_days(conn, alarm_id, days)
}

fn insert_repeat_days(
    conn: &mut PgConnection,
    alarm_id: &str,
    days: &[i32],
) -> ApiResult<Vec<AlarmRepeatDay>> {
    let rows: Vec<AlarmRepeatDay> = days
        .iter()
        .map(|weekday| AlarmRepeatDay {
            id: Uuid::new_v4().to_string(),
            alarm_id: alarm_id.to_string(),
            weekday: *weekday,
        })
        .collect();
    if !rows.is_empty() {
        diesel::insert_into(alarm_repeat_day::table)
            .values(&rows)
            .execute(conn)?;
    }
    Ok(rows)
}

fn repeat_days_for(
    conn: &mut PgConnection,
    alarm_ids: &[String],
) -> ApiResult<HashMap<String, Vec<i32>>> {
    let rows: Vec<(String, i32)> = alarm_repeat_day::table
        .filter(alarm_repeat_day::alarm_id.eq_any(alarm_ids))
        .order(alarm_repeat_day::weekday.asc())
        .select((alarm_repeat_day::alarm_id, alarm_repeat_day::weekday))
        .load(conn)?;

    let mut by_alarm: HashMap<String, Vec<i32>> = HashMap::new();
    for (alarm_id, weekday) in rows {
        by_alarm.entry(alarm_id).or_default().push(weekday);
    }
    Ok(by_alarm)
}

fn hydrate_alarms(conn: &mut PgConnection, alarms: Vec<Alarm>) -> ApiResult<Vec<AlarmDetail>> {
    let alarm_ids: Vec<String> = alarms.iter().map(|a| a.alarm_id.clone()).collect();
    let mut days_by_alarm = repeat_days_for(conn, &alarm_ids)?;

    let linked: Vec<(String, Routine)> = alarm_routine::table
        .inner_join(routine::table)
        .filter(alarm_routine::alarm_id.eq_any(&alarm_ids))
        .order(alarm_routine::sort_order.asc())
        .select((alarm_routine::alarm_id, Routine::as_select()))
        .load(conn)?;
    let mut routines_by_alarm: HashMap<String, Vec<Routine>> = HashMap::new();
    for (alarm_id, routine) in linked {
        routines_by_alarm.entry(alarm_id).or_default().push(routine);
    }

    Ok(alarms
        .into_iter()
        .map(|alarm| AlarmDetail {
            repeat_days: days_by_alarm.remove(&alarm.alarm_id).unwrap_or_default(),
            routines: routines_by_alarm.remove(&alarm.alarm_id).unwrap_or_default(),
            alarm,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_weekdays_sorts_and_dedupes() {
        assert_eq!(normalize_weekdays(&[5, 1, 3, 1]).unwrap(), vec![1, 3, 5]);
        assert_eq!(normalize_weekdays(&[]).unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn test_normalize_weekdays_rejects_out_of_range() {
        assert!(matches!(
            normalize_weekdays(&[0, 2]),
            Err(ApiError::Validation(_))
        ));
        assert!(normalize_weekdays(&[8]).is_err());
        assert!(normalize_weekdays(&[7]).is_ok());
    }

    #[test]
    fn test_validate_sound_volume_bounds() {
        assert_eq!(validate_sound_volume(0.0).unwrap(), 0.0);
        assert_eq!(validate_sound_volume(1.0).unwrap(), 1.0);
        assert_eq!(validate_sound_volume(DEFAULT_SOUND_VOLUME).unwrap(), 0.8);
        assert_eq!(validate_sound_volume(0.456).unwrap(), 0.46);
        assert!(validate_sound_volume(1.01).is_err());
        assert!(validate_sound_volume(-0.1).is_err());
        assert!(validate_sound_volume(f64::NAN).is_err());
    }
}
