use crate::{
    error::ApiError,
    services::auth::{self, AuthSettings, FixedAccount},
};
use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub token: String,
}

/// Checks the submitted pair against the single configured account.
#[post("/login")]
pub async fn login(
    account: web::Data<FixedAccount>,
    settings: web::Data<AuthSettings>,
    item: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let user_id = match account.verify(&item.email, &item.password) {
        Some(id) => id.to_string(),
        None => {
            log::debug!("Rejected login for {}", item.email);
            return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    let token = auth::create_jwt(&user_id, &settings).map_err(|e| {
        log::error!("Error creating token: {}", e);
        ApiError::Internal("Error creating token".to_string())
    })?;

    Ok(HttpResponse::Ok().json(LoginResponse { user_id, token }))
}
