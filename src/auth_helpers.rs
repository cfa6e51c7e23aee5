// ABOUTME: Authorization guard extracting and verifying the caller's token on each request
// ABOUTME: Provides the CurrentUser extractor and role checks used by protected endpoints

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use uuid::Uuid;

use crate::AppState;
use crate::entities::user::Role;
use crate::error::{AppError, Result};
use crate::session::Claims;

pub const TOKEN_HEADER: &str = "x-auth-token";

/// The verified caller of a protected endpoint.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub claims: Claims,
}

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.claims.sub
    }

    pub fn require_role(&self, role: Role) -> Result<()> {
        require_role(&self.claims, role)
    }
}

pub fn require_role(claims: &Claims, role: Role) -> Result<()> {
    if claims.role != role {
        return Err(AppError::Forbidden(format!(
            "Access denied. {} only.",
            match role {
                Role::Patient => "Patients",
                Role::Dentist => "Dentists",
            }
        )));
    }
    Ok(())
}

/// Reads the token from `x-auth-token`, falling back to `Authorization: Bearer`.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(TOKEN_HEADER) {
        return value.to_str().ok().map(str::trim).filter(|t| !t.is_empty());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = token_from_headers(&parts.headers).ok_or_else(|| {
            AppError::Unauthenticated("No token, authorization denied".to_string())
        })?;

        let claims = state.tokens.verify(token)?;
        Ok(CurrentUser { claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn claims(role: Role) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            role,
            iat: 0,
            exp: i64::MAX,
        }
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&claims(Role::Patient), Role::Patient).is_ok());
        assert!(matches!(
            require_role(&claims(Role::Patient), Role::Dentist),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            require_role(&claims(Role::Dentist), Role::Patient),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_token_header_precedence() {
        let mut headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-bearer"),
        );
        assert_eq!(token_from_headers(&headers), Some("from-bearer"));

        headers.insert(TOKEN_HEADER, HeaderValue::from_static("from-custom"));
        assert_eq!(token_from_headers(&headers), Some("from-custom"));
    }

    #[test]
    fn test_non_bearer_authorization_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(token_from_headers(&headers), None);
    }
}
