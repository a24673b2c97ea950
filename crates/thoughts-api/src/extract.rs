use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use thoughts_db::models::UserRow;
use thoughts_types::models::User;

use crate::error::ApiError;
use crate::state::AppState;

/// The caller, resolved from the `Authorization` header. Rejects with 401.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Like [`AuthUser`], but a missing or unknown token yields `None`.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<User>);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = access_token(&parts.headers)
            .ok_or(ApiError::Unauthorized("Missing access token"))?;

        resolve(state, token)
            .await?
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized("Invalid access token"))
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match access_token(&parts.headers) {
            Some(token) => Ok(MaybeAuthUser(resolve(state, token).await?)),
            None => Ok(MaybeAuthUser(None)),
        }
    }
}

/// The header carries the raw token. A `Bearer ` scheme is tolerated.
fn access_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim_start();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then(|| token.to_string())
}

async fn resolve(state: &AppState, token: String) -> Result<Option<User>, ApiError> {
    let row = state.with_db(move |db| db.get_user_by_token(&token)).await?;
    Ok(row.map(user_from_row))
}

pub(crate) fn user_from_row(row: UserRow) -> User {
    User {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt user id '{}': {}", row.id, e);
            Uuid::default()
        }),
        email: row.email,
        created_at: row.created_at.parse().unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on user '{}': {}", row.created_at, row.id, e);
            chrono::DateTime::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn raw_token() {
        assert_eq!(access_token(&headers("abc123")).as_deref(), Some("abc123"));
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        assert_eq!(access_token(&headers("Bearer abc123")).as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_or_blank() {
        assert!(access_token(&HeaderMap::new()).is_none());
        assert!(access_token(&headers("   ")).is_none());
        assert!(access_token(&headers("Bearer ")).is_none());
    }
}
