use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::{client_key, limit, required, AppState};
use crate::error::{ApiError, ApiErrorBody};
use crate::models::{NewUser, PublicUser, Role};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// "parent" or "volunteer"
    pub role: Option<String>,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<NewUser, ApiError> {
        let (Some(name), Some(contact), Some(username), Some(password), Some(role)) = (
            required(self.name),
            required(self.contact),
            required(self.username),
            // passwords are compared verbatim, so only reject empty ones
            self.password.filter(|p| !p.is_empty()),
            required(self.role),
        ) else {
            return Err(ApiError::validation("All fields are required"));
        };
        let role = Role::parse(&role).ok_or_else(|| ApiError::validation("Invalid role"))?;
        Ok(NewUser { name, contact, username, password, role })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub user: PublicUser,
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Missing field or invalid role", body = ApiErrorBody),
        (status = 409, description = "Username or contact already exists", body = ApiErrorBody)
    )
)]
pub async fn register(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    if let Some(rl) = &data.rate_limiter {
        limit(rl.allow_register(&client_key(&req)))?;
    }
    let new = payload.into_inner().validate()?;
    let user = data.repo.create_user(new).await?;
    info!(user_id = user.id, role = ?user.role, "user registered");
    Ok(HttpResponse::Created().json(AuthResponse {
        message: "User registered successfully".into(),
        user: PublicUser::from(&user),
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials matched", body = AuthResponse),
        (status = 400, description = "Missing username or password", body = ApiErrorBody),
        (status = 401, description = "Invalid credentials", body = ApiErrorBody)
    )
)]
pub async fn login(data: web::Data<AppState>, payload: web::Json<LoginRequest>) -> Result<HttpResponse, ApiError> {
    let LoginRequest { username, password } = payload.into_inner();
    let (Some(username), Some(password)) = (required(username), password.filter(|p| !p.is_empty())) else {
        return Err(ApiError::validation("Username and password are required"));
    };
    let user = data.repo.find_by_credentials(&username, &password).await?.ok_or(ApiError::Auth)?;
    Ok(HttpResponse::Ok().json(AuthResponse { message: "Login successful".into(), user: PublicUser::from(&user) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(role: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some("Asha".into()),
            contact: Some("555-0101".into()),
            username: Some("asha".into()),
            password: Some("pw1".into()),
            role: Some(role.into()),
        }
    }

    #[test]
    fn register_validation() {
        assert_eq!(req("parent").validate().unwrap().role, Role::Parent);
        assert!(matches!(req("admin").validate(), Err(ApiError::Validation(m)) if m == "Invalid role"));
        let mut missing = req("parent");
        missing.contact = Some("   ".into());
        assert!(matches!(missing.validate(), Err(ApiError::Validation(m)) if m == "All fields are required"));
    }
}
