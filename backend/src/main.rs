use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};

use routine_backend::api;
use routine_backend::config::AppConfig;
use routine_backend::db;
use routine_backend::models::User;
use routine_backend::services::auth::{AuthSettings, FixedAccount};
use routine_backend::services::users;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match db::init_pool(&config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    if config.run_migrations {
        if let Err(e) = db::run_migrations(&pool) {
            log::error!("{}", e);
            std::process::exit(1);
        }
    } else {
        log::info!("RUN_MIGRATIONS disabled, skipping schema migrations");
    }

    let account = match FixedAccount::from_login(&config.login) {
        Ok(account) => account,
        Err(e) => {
            log::error!("Failed to prepare login account: {}", e);
            std::process::exit(1);
        }
    };

    // The login account owns rows through foreign keys, so its user row must exist.
    let owner = User {
        user_id: config.login.user_id.clone(),
        email: config.login.email.clone(),
        name: config.login.name.clone(),
    };
    match db::with_conn(&pool, move |conn| users::ensure_user(conn, &owner)).await {
        Ok(true) => log::info!("Seeded login user {}", config.login.user_id),
        Ok(false) => log::debug!("Login user {} already present", config.login.user_id),
        Err(e) => {
            log::error!("Failed to seed login user: {}", e);
            std::process::exit(1);
        }
    }

    let auth_settings = AuthSettings::from_config(&config);

    log::info!(
        "Starting Routine Alarm Backend at http://{}:{}",
        config.host,
        config.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(auth_settings.clone()))
            .app_data(web::Data::new(account.clone()))
            .configure(api::config)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
