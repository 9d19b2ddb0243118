use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use bark_types::api::{Claims, CreateCommentRequest, CreateCommentResponse, MessageResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::validate;
use crate::views;

pub async fn create_comment(
    State(state): State<AppState>,
    Path(bark_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CreateCommentResponse>), ApiError> {
    let content = validate::require_content(
        &req.content,
        1,
        "Input needs to have at least 1 character!",
    )?;

    let parent_id = bark_id.to_string();
    if state.db.get_bark(&parent_id)?.is_none() {
        return Err(ApiError::NotFound("Bark not found!".into()));
    }

    let comment_id = Uuid::new_v4();
    state.db.insert_comment(
        &comment_id.to_string(),
        &content,
        &claims.sub.to_string(),
        &parent_id,
    )?;
    // Second, independent write: append to the parent's comment list.
    state.db.add_bark_comment(&parent_id, &comment_id.to_string())?;

    let row = state
        .db
        .get_comment(&comment_id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("Comment missing immediately after insert"))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCommentResponse {
            message: "Comment created successfully".into(),
            comment: views::comment_view(&row),
        }),
    ))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = comment_id.to_string();

    let comment = state
        .db
        .get_comment(&id)?
        .ok_or_else(|| ApiError::NotFound("Comment not found!".into()))?;

    if comment.creator_id != claims.sub.to_string() && !claims.is_admin {
        return Err(ApiError::Authorization("Unauthorized".into()));
    }

    state.db.delete_comment(&id)?;
    state.db.remove_bark_comment(&comment.bark_id, &id)?;

    Ok(Json(MessageResponse {
        message: "Comment deleted successfully!".into(),
    }))
}
