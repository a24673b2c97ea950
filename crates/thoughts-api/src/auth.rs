use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use rand::RngCore;
use tracing::{info, warn};
use uuid::Uuid;

use thoughts_db::is_unique_violation;
use thoughts_db::models::UserRow;
use thoughts_types::api::{AuthResponse, LoginRequest, RegisterRequest};

use crate::error::ApiError;
use crate::extract::user_from_row;
use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Raw entropy behind an access token, before hex encoding.
const ACCESS_TOKEN_BYTES: usize = 128;

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let (email, password) = required_credentials(req.email, req.password)?;
    let email = normalize_email(&email);
    validate_email(&email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let user_id = Uuid::new_v4();
    let access_token = generate_access_token();

    let created = state
        .with_db(move |db| {
            // Check if email is taken
            if db.get_user_by_email(&email)?.is_some() {
                return Ok(None);
            }

            let password_hash = hash_password(&password)?;

            // The UNIQUE index still catches a concurrent registration.
            match db.create_user(&user_id.to_string(), &email, &password_hash, &access_token) {
                Ok(row) => Ok(Some(row)),
                Err(e) if is_unique_violation(&e) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await?
        .ok_or_else(|| ApiError::Validation("That email is already registered".into()))?;

    info!("Registered user {}", created.id);
    Ok((StatusCode::CREATED, Json(auth_response(created))))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let (email, password) = required_credentials(req.email, req.password)?;
    let email = normalize_email(&email);

    let lookup = email.clone();
    let user = state
        .with_db(move |db| {
            let Some(user) = db.get_user_by_email(&lookup)? else {
                return Ok(None);
            };
            Ok(verify_password(&password, &user.password)?.then_some(user))
        })
        .await?;

    let Some(user) = user else {
        warn!("Failed login for {}", email);
        return Err(ApiError::Unauthorized("Invalid email or password"));
    };

    Ok(Json(auth_response(user)))
}

fn required_credentials(
    email: Option<String>,
    password: Option<String>,
) -> Result<(String, String), ApiError> {
    match (email, password) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
            Ok((email, password))
        }
        _ => Err(ApiError::Validation("Email and password are required".into())),
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Structural check only: one `@`, a non-empty local part, a dotted domain.
fn validate_email(email: &str) -> Result<(), ApiError> {
    let invalid = || ApiError::Validation(format!("'{}' is not a valid email address", email));

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| anyhow::anyhow!("Stored password hash is corrupt: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn generate_access_token() -> String {
    let mut bytes = [0u8; ACCESS_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn auth_response(mut row: UserRow) -> AuthResponse {
    let access_token = std::mem::take(&mut row.access_token);
    let user = user_from_row(row);
    AuthResponse {
        id: user.id,
        email: user.email,
        access_token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("a.b+c@mail.example.org").is_ok());

        for bad in ["", "ada", "ada@", "@example.com", "ada@example", "ada@@example.com", "ada@exa mple.com", "ada@example..com"] {
            assert!(validate_email(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn credentials_must_be_present() {
        assert!(required_credentials(Some("a@b.co".into()), Some("secret".into())).is_ok());
        assert!(required_credentials(None, Some("secret".into())).is_err());
        assert!(required_credentials(Some("a@b.co".into()), None).is_err());
        assert!(required_credentials(Some("  ".into()), Some("secret".into())).is_err());
        assert!(required_credentials(Some("a@b.co".into()), Some(String::new())).is_err());
    }

    #[test]
    fn access_tokens_are_long_and_distinct() {
        let a = generate_access_token();
        let b = generate_access_token();
        assert_eq!(a.len(), ACCESS_TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }
}
