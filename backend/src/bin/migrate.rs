//! Migrate - applies pending schema migrations and exits
//!
//! Environment variables:
//!   DATABASE_URL - PostgreSQL connection string (required)

use std::env;

use routine_backend::db;

fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let database_url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            log::error!("DATABASE_URL environment variable is not set");
            std::process::exit(1);
        }
    };

    let pool = match db::init_pool(&database_url) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    match db::run_migrations(&pool) {
        Ok(0) => log::info!("Schema is up to date"),
        Ok(applied) => log::info!("Applied {} migration(s)", applied),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}
