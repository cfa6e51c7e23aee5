// ABOUTME: Registration and login endpoints issuing signed session tokens
// ABOUTME: Validates credentials, hashes passwords with Argon2, and returns the user summary

use axum::{Json, extract::State, http::StatusCode};

use crate::auth_helpers::CurrentUser;
use crate::crypto;
use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::types::*;
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 6;

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn validate_registration(req: &RegisterRequest) -> Result<()> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    let email = req.email.trim();
    let valid_email = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid_email || email.contains(char::is_whitespace) {
        return Err(AppError::Validation("Invalid email".to_string()));
    }

    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    validate_registration(&req)?;

    let password_hash = crypto::hash_password(&req.password)?;
    let user = state
        .storage
        .create_user(
            req.name.trim(),
            &normalize_email(&req.email),
            &password_hash,
            req.role,
        )
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    let token = state.tokens.issue(user.id, user.role)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let invalid = || AppError::Unauthenticated("Invalid credentials".to_string());

    let user = state
        .storage
        .find_user_by_email(&normalize_email(&req.email))
        .await?
        .ok_or_else(invalid)?;

    if !crypto::verify_password(&req.password, &user.password_hash)? {
        return Err(invalid());
    }

    let token = state.tokens.issue(user.id, user.role)?;
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

pub async fn me(State(state): State<AppState>, current: CurrentUser) -> Result<Json<UserSummary>> {
    let user = state
        .storage
        .find_user_by_id(current.id())
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Account no longer exists".to_string()))?;

    Ok(Json(user.into()))
}
