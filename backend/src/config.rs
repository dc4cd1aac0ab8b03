//! Process configuration read from the environment (and `.env`, when present).

use std::env;
use std::fmt;

const DEFAULT_LOGIN_USER_ID: &str = "00000000-0000-4000-8000-000000000001";

/// The single fixed account accepted by `POST /login`.
#[derive(Clone)]
pub struct LoginAccount {
    pub email: String,
    pub password: String,
    pub user_id: String,
    pub name: Option<String>,
}

impl fmt::Debug for LoginAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginAccount")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: u64,
    pub run_migrations: bool,
    pub login: LoginAccount,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or("DATABASE_URL must be set")?;

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| format!("Invalid PORT: {}", p))?,
            None => 8080,
        };

        let jwt_secret = match lookup("JWT_SECRET") {
            Some(s) if !s.is_empty() => s,
            _ => {
                log::warn!("JWT_SECRET not set, using the insecure default");
                "secret".to_string()
            }
        };

        let token_ttl_hours = match lookup("TOKEN_TTL_HOURS") {
            Some(h) => h
                .parse::<u64>()
                .map_err(|_| format!("Invalid TOKEN_TTL_HOURS: {}", h))?,
            None => 24,
        };

        let run_migrations = match lookup("RUN_MIGRATIONS") {
            Some(v) => parse_bool(&v).ok_or(format!("Invalid RUN_MIGRATIONS: {}", v))?,
            None => true,
        };

        let login = LoginAccount {
            email: lookup("LOGIN_EMAIL").unwrap_or_else(|| "test@example.com".to_string()),
            password: lookup("LOGIN_PASSWORD").unwrap_or_else(|| "1234".to_string()),
            user_id: lookup("LOGIN_USER_ID").unwrap_or_else(|| DEFAULT_LOGIN_USER_ID.to_string()),
            name: Some(lookup("LOGIN_NAME").unwrap_or_else(|| "Tester".to_string())),
        };

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            token_ttl_hours,
            run_migrations,
            login,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_only_database_url_is_set() {
        let config =
            AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/db")]))
                .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_secret, "secret");
        assert_eq!(config.token_ttl_hours, 24);
        assert!(config.run_migrations);
        assert_eq!(config.login.email, "test@example.com");
        assert_eq!(config.login.user_id, DEFAULT_LOGIN_USER_ID);
    }

    #[test]
    fn test_missing_database_url_fails() {
        let result = AppConfig::from_lookup(lookup_from(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db"),
            ("PORT", "9000"),
            ("RUN_MIGRATIONS", "off"),
            ("LOGIN_EMAIL", "me@example.org"),
            ("JWT_SECRET", "s3cr3t"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert!(!config.run_migrations);
        assert_eq!(config.login.email, "me@example.org");
        assert_eq!(config.jwt_secret, "s3cr3t");
    }

    #[test]
    fn test_invalid_port_fails() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db"),
            ("PORT", "eighty"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://db")]))
            .unwrap();
        let rendered = format!("{:?}", config.login);
        assert!(!rendered.contains("1234"));
        assert!(rendered.contains("<redacted>"));
    }
}
