//! Shared helpers for handler tests.

use std::sync::Arc;

use axum::{Json, extract::State};
use uuid::Uuid;

use bark_db::Database;
use bark_types::api::{Claims, SignUpRequest};

use crate::auth::{self, AppState, AppStateInner};

pub fn test_state() -> AppState {
    Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: "test-secret".into(),
    })
}

/// Registers `<name>@bark.dev` through the real signup handler.
pub async fn sign_up_user(state: &AppState, name: &str, password: &str) -> Uuid {
    let (_, Json(resp)) = auth::sign_up(
        State(state.clone()),
        Json(SignUpRequest {
            email: format!("{}@bark.dev", name),
            username: name.to_string(),
            password: password.to_string(),
        }),
    )
    .await
    .unwrap();
    resp.user_id
}

pub fn claims_for(user_id: Uuid, is_admin: bool) -> Claims {
    Claims {
        sub: user_id,
        email: "test@bark.dev".into(),
        is_admin,
        exp: usize::MAX,
    }
}
