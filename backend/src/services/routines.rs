use diesel::pg::PgConnection;
use diesel::prelude::*;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Routine, RoutineChangeset};
use crate::schema::{alarm_routine, routine};

pub fn create_routine(
    conn: &mut PgConnection,
    user_id: &str,
    fields: RoutineChangeset,
) -> ApiResult<Routine> {
    let new_routine = Routine {
        routine_id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title: fields.title,
        routine_type: fields.routine_type,
        goal_value: fields.goal_value,
        duration_seconds: fields.duration_seconds,
        deadline_time: fields.deadline_time,
        success_note: fields.success_note,
    };

    let created = diesel::insert_into(routine::table)
        .values(&new_routine)
        .returning(Routine::as_returning())
        .get_result(conn)?;

    log::debug!("Created routine {} for user {}", created.routine_id, user_id);
    Ok(created)
}

pub fn list_routines(conn: &mut PgConnection, user_id: &str) -> ApiResult<Vec<Routine>> {
    Ok(routine::table
        .filter(routine::user_id.eq(user_id))
        .select(Routine::as_select())
        .load(conn)?)
}

/// Replaces every mutable field of a routine owned by `user_id`.
pub fn update_routine(
    conn: &mut PgConnection,
    user_id: &str,
    routine_id: &str,
    fields: &RoutineChangeset,
) -> ApiResult<Routine> {
    diesel::update(
        routine::table
            .filter(routine::routine_id.eq(routine_id))
            .filter(routine::user_id.eq(user_id)),
    )
    .set(fields)
    .returning(Routine::as_returning())
    .get_result(conn)
    .optional()?
    .ok_or_else(|| ApiError::not_found("Routine"))
}

/// Deletes a routine and its alarm links. Fails with a conflict while
/// execution history still references the routine.
pub fn delete_routine(conn: &mut PgConnection, user_id: &str, routine_id: &str) -> ApiResult<()> {
    conn.transaction(|conn| {
        let owned = routine::table
            .filter(routine::routine_id.eq(routine_id))
            .filter(routine::user_id.eq(user_id))
            .select(routine::routine_id)
            .first::<String>(conn)
            .optional()?;
        if owned.is_none() {
            return Err(ApiError::not_found("Routine"));
        }

        let unlinked =
            diesel::delete(alarm_routine::table.filter(alarm_routine::routine_id.eq(routine_id)))
                .execute(conn)?;

        let deleted = diesel::delete(
            routine::table
                .filter(routine::routine_id.eq(routine_id))
                .filter(routine::user_id.eq(user_id)),
        )
        .execute(conn)
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => {
                ApiError::Conflict("Routine has recorded executions".to_string())
            }
            other => other,
        })?;

        if deleted == 0 {
            return Err(ApiError::not_found("Routine"));
        }
        log::debug!("Deleted routine {} ({} alarm links removed)", routine_id, unlinked);
        Ok(())
    })
}

/// Fails with not-found unless every id names a routine owned by `user_id`.
pub fn ensure_owned_routines(
    conn: &mut PgConnection,
    user_id: &str,
    routine_ids: &[String],
) -> ApiResult<()> {
    let wanted: HashSet<&str> = routine_ids.iter().map(String::as_str).collect();
    if wanted.is_empty() {
        return Ok(());
    }

    let wanted_ids: Vec<&str> = wanted.iter().copied().collect();
    let found: Vec<String> = routine::table
        .filter(routine::user_id.eq(user_id))
        .filter(routine::routine_id.eq_any(wanted_ids))
        .select(routine::routine_id)
        .load(conn)?;

    if found.len() == wanted.len() {
        Ok(())
    } else {
        Err(ApiError::not_found("Routine"))
    }
}
