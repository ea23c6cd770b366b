//! Account handlers
//!
//! Registration, token login and the caller's own profile.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use super::{required, MemberResponse, UserResponse};
use crate::app::Registration;
use crate::auth::AuthUser;
use crate::error::{AppError, DomainError, FieldErrors, JsonBody};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password2: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl RegisterRequest {
    fn into_registration(self) -> Result<Registration, AppError> {
        let mut errors = FieldErrors::new();
        required(&mut errors, "username", self.username.as_ref());
        required(&mut errors, "email", self.email.as_ref());
        required(&mut errors, "password", self.password.as_ref());
        required(&mut errors, "password2", self.password2.as_ref());
        required(&mut errors, "first_name", self.first_name.as_ref());
        required(&mut errors, "last_name", self.last_name.as_ref());
        errors.into_result()?;

        Ok(Registration {
            username: self.username.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            password2: self.password2.unwrap_or_default(),
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserResponse,
    pub member: MemberResponse,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub member: Option<MemberResponse>,
}

/// POST /auth/register
///
/// Creates the user and their member profile together.
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let registration = request.into_registration()?;
    let (user, member) = state.identity_service.register(registration).await?;

    let response = RegisterResponse {
        user: user.clone().into(),
        member: MemberResponse::new(member, user),
        message: "User registered successfully".to_string(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/token
///
/// Exchange a username and password for a fresh bearer token. Any earlier
/// token for the user stops working.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (Some(username), Some(password)) = (request.username.clone(), request.password.clone())
    else {
        let mut errors = FieldErrors::new();
        required(&mut errors, "username", request.username);
        required(&mut errors, "password", request.password);
        return Err(DomainError::Validation(errors).into());
    };

    let (token, user) = state.identity_service.login(&username, &password).await?;
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<MeResponse>, AppError> {
    let (user, member) = state.identity_service.profile(caller.id).await?;
    Ok(Json(MeResponse {
        member: member.map(|m| MemberResponse::new(m, user.clone())),
        user: user.into(),
    }))
}
