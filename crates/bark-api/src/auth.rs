use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use bark_db::Database;
use bark_types::api::{Claims, SignInRequest, SignInResponse, SignUpRequest, SignUpResponse};

use crate::error::ApiError;
use crate::validate;

pub const DEFAULT_PICTURE: &str = "/user-picture.png";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>), ApiError> {
    validate::validate_sign_up(&state.db, &req)?;

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    state.db.create_user(
        &user_id.to_string(),
        req.email.trim(),
        req.username.trim(),
        &password_hash,
        DEFAULT_PICTURE,
        "User",
    )?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            message: "User created!".into(),
            user_id,
        }),
    ))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    let user = state.db.get_user_by_email(req.email.trim())?.ok_or_else(|| {
        ApiError::Authentication("A user with this email could not be found".into())
    })?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("Stored password hash unreadable: {}", e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Authentication("Invalid password!".into()))?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("Corrupt user id '{}': {}", user.id, e))?;
    let is_admin = user.is_admin();

    let token = create_token(&state.jwt_secret, user_id, &user.email, is_admin)?;

    Ok(Json(SignInResponse {
        message: "Login successful".into(),
        token,
        user_id,
        username: user.username,
        is_admin,
    }))
}

/// Bootstrap administrator. Runs at startup, after migrations; a single
/// existing user of any kind disables it.
pub fn seed_admin(db: &Database, email: &str, password: &str) -> anyhow::Result<()> {
    if db.count_users()? > 0 {
        return Ok(());
    }

    let password_hash = hash_password(password)?;
    let user_id = Uuid::new_v4();
    db.create_user(
        &user_id.to_string(),
        email,
        "admin",
        &password_hash,
        DEFAULT_PICTURE,
        "User,Admin",
    )?;

    info!("Seeded bootstrap admin account {}", email);
    Ok(())
}

pub fn create_token(
    secret: &str,
    user_id: Uuid,
    email: &str,
    is_admin: bool,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        is_admin,
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    // Argon2id with a fresh random salt; the PHC string carries the salt
    // alongside the hash.
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}
