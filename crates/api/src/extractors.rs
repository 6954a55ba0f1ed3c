//! Request extractors.

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use content_poll_common::{AppError, secrets_match};

use crate::middleware::AppState;

/// Raw anonymous voter token from the voter cookie, if the client has one.
#[derive(Debug, Clone)]
pub struct VoterToken(pub Option<String>);

impl FromRequestParts<AppState> for VoterToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(&state.cookie.name)
            .map(|c| c.value().trim().to_string())
            .filter(|v| !v.is_empty());
        Ok(Self(token))
    }
}

/// Proof that the request carried the configured admin bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            return Err(AppError::Forbidden(
                "admin endpoints are not configured".to_string(),
            ));
        };

        let presented = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim);

        match presented {
            Some(token) if secrets_match(token, expected) => Ok(Self),
            _ => Err(AppError::Unauthorized),
        }
    }
}
