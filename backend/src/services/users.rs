use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::error::ApiResult;
use crate::models::User;
use crate::schema::app_user;

/// Inserts the user unless a row with the same id or email already exists.
/// Returns whether a row was created.
pub fn ensure_user(conn: &mut PgConnection, user: &User) -> ApiResult<bool> {
    let existing = app_user::table
        .filter(app_user::user_id.eq(&user.user_id))
        .select(app_user::user_id)
        .first::<String>(conn)
        .optional()?;
    if existing.is_some() {
        return Ok(false);
    }

    let inserted = diesel::insert_into(app_user::table)
        .values(user)
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(inserted == 1)
}
