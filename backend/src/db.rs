use actix_web::web;
use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::error::{ApiError, ApiResult};

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn init_pool(database_url: &str) -> Result<DbPool, String> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    r2d2::Pool::builder()
        .build(manager)
        .map_err(|e| format!("Failed to create database pool: {}", e))
}

/// Runs pending embedded migrations and returns how many were applied.
pub fn run_migrations(pool: &DbPool) -> Result<usize, String> {
    let mut conn = pool
        .get()
        .map_err(|e| format!("Failed to get database connection: {}", e))?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| format!("Failed to run database migrations: {}", e))?;

    log::info!("Database migrations completed ({} applied)", applied.len());
    Ok(applied.len())
}

/// Checks a connection out of the pool for the duration of `f` on the
/// blocking thread pool. The connection goes back to the pool when `f`
/// returns, whether it succeeded or not.
pub async fn with_conn<F, T>(pool: &DbPool, f: F) -> ApiResult<T>
where
    F: FnOnce(&mut PgConnection) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    web::block(move || {
        let mut conn = pool.get()?;
        f(&mut conn)
    })
    .await
    .map_err(ApiError::from)?
}
