use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use bark_types::api::{Claims, SuggestedUser, UserProfile, UserSummary};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::suggest::{self, GraphUser};
use crate::views;

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = load_profile(&state, &user_id.to_string())?;
    Ok(Json(profile))
}

/// Toggles the (caller, target) follow edge pair.
///
/// The two directions are checked independently and only flipped when
/// they agree: both present means unfollow, both absent means follow,
/// and a mixed state is left exactly as found.
pub async fn follow_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserProfile>, ApiError> {
    let self_id = claims.sub.to_string();
    let target_id = user_id.to_string();

    if self_id == target_id {
        return Err(ApiError::BadRequest("You can't follow yourself".into()));
    }

    if state.db.get_user_by_id(&target_id)?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    let is_following = state.db.is_following(&self_id, &target_id)?;
    let is_follower = state.db.is_follower(&target_id, &self_id)?;

    if is_following && is_follower {
        // Two sequential writes, not one transaction.
        state.db.remove_following(&self_id, &target_id)?;
        state.db.remove_follower(&target_id, &self_id)?;
    } else if !is_following && !is_follower {
        state.db.add_following(&self_id, &target_id)?;
        state.db.add_follower(&target_id, &self_id)?;
    }
    // Mixed state: defined no-op.

    let profile = load_profile(&state, &target_id)?;
    Ok(Json(profile))
}

pub async fn get_following(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let user = state
        .db
        .get_user_by_username(&username)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let ids = state.db.following_ids(&user.id)?;
    Ok(Json(load_summaries(&state, &ids)?))
}

pub async fn get_followers(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let user = state
        .db
        .get_user_by_username(&username)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let ids = state.db.follower_ids(&user.id)?;
    Ok(Json(load_summaries(&state, &ids)?))
}

pub async fn get_suggested(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<SuggestedUser>>, ApiError> {
    let caller_id = claims.sub.to_string();

    // Snapshot the whole graph off the async runtime, then run the pure
    // algorithm over it.
    let db = state.clone();
    let (users, graph) = tokio::task::spawn_blocking(move || {
        let users = db.db.list_users()?;
        let mut graph = Vec::with_capacity(users.len());
        for u in &users {
            graph.push(GraphUser {
                id: u.id.clone(),
                username: u.username.clone(),
                following: db.db.following_ids(&u.id)?,
            });
        }
        Ok::<_, anyhow::Error>((users, graph))
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    if !graph.iter().any(|u| u.id == caller_id) {
        return Err(ApiError::NotFound("User not found".into()));
    }

    let by_id: HashMap<&str, &bark_db::models::UserRow> =
        users.iter().map(|u| (u.id.as_str(), u)).collect();

    let suggestions = suggest::suggest(&caller_id, &graph)
        .into_iter()
        .filter_map(|s| {
            by_id.get(s.user_id.as_str()).map(|row| SuggestedUser {
                user: views::user_summary(row),
                followed_by: s.followed_by,
            })
        })
        .collect();

    Ok(Json(suggestions))
}

/// Composed profile view: the user row joined with its reference lists,
/// owned barks populated. Password material never leaves bark-db.
fn load_profile(state: &AppState, user_id: &str) -> Result<UserProfile, ApiError> {
    let user = state
        .db
        .get_user_by_id(user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let bark_ids = state.db.user_bark_ids(user_id)?;
    let barks = state
        .db
        .barks_by_ids(&bark_ids)?
        .iter()
        .map(views::bark_view)
        .collect();

    let followers = state
        .db
        .follower_ids(user_id)?
        .iter()
        .map(|id| views::parse_id(id, "follower"))
        .collect();
    let following = state
        .db
        .following_ids(user_id)?
        .iter()
        .map(|id| views::parse_id(id, "following"))
        .collect();
    let liked_barks = state
        .db
        .liked_bark_ids(user_id)?
        .iter()
        .map(|id| views::parse_id(id, "liked bark"))
        .collect();

    Ok(UserProfile {
        user: views::user_summary(&user),
        barks,
        followers,
        following,
        liked_barks,
    })
}

fn load_summaries(state: &AppState, ids: &[String]) -> Result<Vec<UserSummary>, ApiError> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        // Dangling edges are skipped rather than surfaced.
        if let Some(row) = state.db.get_user_by_id(id)? {
            out.push(views::user_summary(&row));
        }
    }
    Ok(out)
}
