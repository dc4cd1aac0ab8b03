use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use jsonwebtoken::{DecodingKey, Validation, decode};
use std::future::{Ready, ready};

use crate::config::{AppConfig, LoginAccount};
use crate::error::ApiError;

/// Token signing settings shared with every worker through `web::Data`.
#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl_hours: u64,
}

impl AuthSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            token_ttl_hours: config.token_ttl_hours,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (User ID)
    pub exp: usize,  // Expiration
}

impl Claims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

impl FromRequest for Claims {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let settings = match req.app_data::<web::Data<AuthSettings>>() {
            Some(s) => s,
            None => {
                log::error!("AuthSettings missing from app data");
                return ready(Err(ApiError::Internal("Auth not configured".to_string())));
            }
        };

        let auth_header = match req.headers().get("Authorization") {
            Some(h) => h,
            None => return ready(Err(ApiError::Unauthorized("No Auth header".to_string()))),
        };

        let token = match auth_header.to_str().ok().and_then(|s| s.strip_prefix("Bearer ")) {
            Some(t) => t.trim(),
            None => {
                return ready(Err(ApiError::Unauthorized(
                    "Invalid Auth header".to_string(),
                )));
            }
        };

        ready(decode_jwt(token, &settings.jwt_secret))
    }
}

/// The fixed login account, with its password kept only as an argon2 hash.
///
/// Placeholder for real credential storage; there is exactly one account.
#[derive(Clone)]
pub struct FixedAccount {
    pub email: String,
    pub user_id: String,
    password_hash: String,
}

impl FixedAccount {
    pub fn from_login(login: &LoginAccount) -> Result<Self, String> {
        Ok(Self {
            email: login.email.clone(),
            user_id: login.user_id.clone(),
            password_hash: hash_password(&login.password)?,
        })
    }

    /// Returns the account's user id when both email and password match.
    pub fn verify(&self, email: &str, password: &str) -> Option<&str> {
        if email != self.email {
            return None;
        }
        match verify_password(password, &self.password_hash) {
            Ok(true) => Some(&self.user_id),
            _ => None,
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| e.to_string())?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, String> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| e.to_string())?;
    let argon2 = Argon2::default();
    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn create_jwt(user_id: &str, settings: &AuthSettings) -> Result<String, String> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| e.to_string())?
        .as_secs() as usize
        + settings.token_ttl_hours as usize * 3600;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| e.to_string())
}

pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, ApiError> {
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(token_data) if !token_data.claims.sub.is_empty() => Ok(token_data.claims),
        Ok(_) => Err(ApiError::Unauthorized("Invalid Token".to_string())),
        Err(_) => Err(ApiError::Unauthorized("Invalid Token".to_string())),
    }
}
