use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use bark_types::api::{
    BarkDetails, BarkView, Claims, CreateBarkRequest, CreateBarkResponse, LikeResponse,
    MessageResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::validate;
use crate::views;

pub async fn create_bark(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBarkRequest>,
) -> Result<(StatusCode, Json<CreateBarkResponse>), ApiError> {
    let content = validate::require_content(
        &req.content,
        1,
        "Bark needs to have at least 1 character!",
    )?;

    let bark_id = Uuid::new_v4();
    let creator_id = claims.sub.to_string();

    state.db.insert_bark(&bark_id.to_string(), &content, &creator_id)?;
    // Second, independent write: append to the creator's owned list.
    state.db.add_user_bark(&creator_id, &bark_id.to_string())?;

    let row = state
        .db
        .get_bark(&bark_id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("Bark missing immediately after insert"))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBarkResponse {
            message: "Bark created!".into(),
            bark: views::bark_view(&row),
        }),
    ))
}

/// Bark with its creator and comment list joined in.
pub async fn get_bark(
    State(state): State<AppState>,
    Path(bark_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<BarkDetails>, ApiError> {
    let id = bark_id.to_string();

    let row = state
        .db
        .get_bark(&id)?
        .ok_or_else(|| ApiError::NotFound("Bark not found!".into()))?;

    let creator = state
        .db
        .get_user_by_id(&row.creator_id)?
        .ok_or_else(|| ApiError::NotFound("Bark creator not found".into()))?;

    let comment_ids = state.db.bark_comment_ids(&id)?;
    let comments = state
        .db
        .comments_by_ids(&comment_ids)?
        .iter()
        .map(views::comment_view)
        .collect();

    Ok(Json(BarkDetails {
        id: bark_id,
        content: row.content.clone(),
        likes: row.likes,
        creator: views::user_summary(&creator),
        comments,
        created_at: views::parse_timestamp(&row.created_at, "bark"),
    }))
}

/// Feed: the caller's own barks plus everyone they follow, newest first.
pub async fn get_feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<BarkView>>, ApiError> {
    let caller_id = claims.sub.to_string();

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || {
        let mut creators = db.db.following_ids(&caller_id)?;
        creators.push(caller_id);
        db.db.barks_by_creators(&creators)
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    Ok(Json(rows.iter().map(views::bark_view).collect()))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Path(bark_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<LikeResponse>, ApiError> {
    let user_id = claims.sub.to_string();
    let id = bark_id.to_string();

    if state.db.get_bark(&id)?.is_none() {
        return Err(ApiError::NotFound("Bark not found!".into()));
    }

    // Membership write and counter write are separate statements; a crash
    // between them leaves the pair inconsistent.
    let liked = if state.db.has_liked(&user_id, &id)? {
        state.db.remove_liked(&user_id, &id)?;
        state.db.bump_likes(&id, -1)?;
        false
    } else {
        state.db.add_liked(&user_id, &id)?;
        state.db.bump_likes(&id, 1)?;
        true
    };

    let likes = state.db.get_bark(&id)?.map(|b| b.likes).unwrap_or_default();
    Ok(Json(LikeResponse { liked, likes }))
}

/// Owner-or-admin delete with cascade. The steps are sequential dependent
/// writes; a failure mid-sequence leaves the earlier steps committed.
pub async fn delete_bark(
    State(state): State<AppState>,
    Path(bark_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = bark_id.to_string();

    let bark = state
        .db
        .get_bark(&id)?
        .ok_or_else(|| ApiError::NotFound("Bark not found!".into()))?;

    if bark.creator_id != claims.sub.to_string() && !claims.is_admin {
        return Err(ApiError::Authorization("Unauthorized".into()));
    }

    state.db.delete_bark(&id)?;
    for comment_id in state.db.bark_comment_ids(&id)? {
        state.db.delete_comment(&comment_id)?;
    }
    state.db.clear_bark_comments(&id)?;
    state.db.delete_reports_for_bark(&id)?;
    // Pulled from the OWNER's list, which is not necessarily the caller's.
    state.db.remove_user_bark(&bark.creator_id, &id)?;

    Ok(Json(MessageResponse {
        message: "Bark deleted successfully!".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments;
    use crate::reports;
    use crate::testutil::{claims_for, sign_up_user, test_state};
    use bark_types::api::{CreateCommentRequest, CreateReportRequest};

    async fn create(state: &AppState, author: Uuid, content: &str) -> Uuid {
        let (_, Json(resp)) = create_bark(
            State(state.clone()),
            Extension(claims_for(author, false)),
            Json(CreateBarkRequest {
                content: content.to_string(),
            }),
        )
        .await
        .unwrap();
        resp.bark.id
    }

    #[tokio::test]
    async fn create_appends_to_the_owner_list() {
        let state = test_state();
        let a = sign_up_user(&state, "a", "secret1").await;

        let bark = create(&state, a, "first bark").await;

        assert_eq!(
            state.db.user_bark_ids(&a.to_string()).unwrap(),
            vec![bark.to_string()]
        );
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let state = test_state();
        let a = sign_up_user(&state, "a", "secret1").await;

        let err = create_bark(
            State(state.clone()),
            Extension(claims_for(a, false)),
            Json(CreateBarkRequest {
                content: "   ".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn like_twice_restores_the_original_count() {
        let state = test_state();
        let a = sign_up_user(&state, "a", "secret1").await;
        let b = sign_up_user(&state, "b", "secret1").await;
        let bark = create(&state, a, "woof").await;

        let Json(first) = toggle_like(
            State(state.clone()),
            Path(bark),
            Extension(claims_for(b, false)),
        )
        .await
        .unwrap();
        assert!(first.liked);
        assert_eq!(first.likes, 1);

        let Json(second) = toggle_like(
            State(state.clone()),
            Path(bark),
            Extension(claims_for(b, false)),
        )
        .await
        .unwrap();
        assert!(!second.liked);
        assert_eq!(second.likes, 0);
        assert!(
            !state
                .db
                .has_liked(&b.to_string(), &bark.to_string())
                .unwrap()
        );
    }

    #[tokio::test]
    async fn liking_a_missing_bark_is_not_found() {
        let state = test_state();
        let a = sign_up_user(&state, "a", "secret1").await;

        let err = toggle_like(
            State(state.clone()),
            Path(Uuid::new_v4()),
            Extension(claims_for(a, false)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn feed_includes_own_and_followed_creators() {
        let state = test_state();
        let a = sign_up_user(&state, "a", "secret1").await;
        let b = sign_up_user(&state, "b", "secret1").await;
        let c = sign_up_user(&state, "c", "secret1").await;

        create(&state, a, "mine").await;
        create(&state, b, "followed").await;
        create(&state, c, "stranger").await;

        state
            .db
            .add_following(&a.to_string(), &b.to_string())
            .unwrap();

        let Json(feed) = get_feed(State(state.clone()), Extension(claims_for(a, false)))
            .await
            .unwrap();

        let contents: Vec<_> = feed.iter().map(|b| b.content.as_str()).collect();
        assert_eq!(feed.len(), 2);
        assert!(contents.contains(&"mine"));
        assert!(contents.contains(&"followed"));
        assert!(!contents.contains(&"stranger"));
    }

    #[tokio::test]
    async fn delete_cascades_to_comments_and_reports() {
        let state = test_state();
        let a = sign_up_user(&state, "a", "secret1").await;
        let b = sign_up_user(&state, "b", "secret1").await;
        let bark = create(&state, a, "woof").await;

        let (_, Json(comment)) = comments::create_comment(
            State(state.clone()),
            Path(bark),
            Extension(claims_for(b, false)),
            Json(CreateCommentRequest {
                content: "nice bark".into(),
            }),
        )
        .await
        .unwrap();

        reports::create_report(
            State(state.clone()),
            Path(bark),
            Extension(claims_for(b, false)),
            Json(CreateReportRequest {
                content: "this bark is misleading".into(),
            }),
        )
        .await
        .unwrap();

        delete_bark(
            State(state.clone()),
            Path(bark),
            Extension(claims_for(a, false)),
        )
        .await
        .unwrap();

        assert!(state.db.get_bark(&bark.to_string()).unwrap().is_none());
        assert!(
            state
                .db
                .get_comment(&comment.comment.id.to_string())
                .unwrap()
                .is_none()
        );
        assert!(state.db.list_reports().unwrap().is_empty());
        assert!(state.db.user_bark_ids(&a.to_string()).unwrap().is_empty());

        let err = get_bark(
            State(state.clone()),
            Path(bark),
            Extension(claims_for(a, false)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn non_owner_cannot_delete() {
        let state = test_state();
        let a = sign_up_user(&state, "a", "secret1").await;
        let b = sign_up_user(&state, "b", "secret1").await;
        let bark = create(&state, a, "woof").await;

        let err = delete_bark(
            State(state.clone()),
            Path(bark),
            Extension(claims_for(b, false)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Authorization(_)));
        assert!(state.db.get_bark(&bark.to_string()).unwrap().is_some());
    }

    #[tokio::test]
    async fn admin_may_delete_another_users_bark() {
        let state = test_state();
        let a = sign_up_user(&state, "a", "secret1").await;
        let admin = sign_up_user(&state, "mod", "secret1").await;
        let bark = create(&state, a, "woof").await;

        delete_bark(
            State(state.clone()),
            Path(bark),
            Extension(claims_for(admin, true)),
        )
        .await
        .unwrap();

        assert!(state.db.get_bark(&bark.to_string()).unwrap().is_none());
        // Pulled from the owner's list even though the admin deleted it.
        assert!(state.db.user_bark_ids(&a.to_string()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn details_join_creator_and_comments() {
        let state = test_state();
        let a = sign_up_user(&state, "a", "secret1").await;
        let b = sign_up_user(&state, "b", "secret1").await;
        let bark = create(&state, a, "woof").await;

        comments::create_comment(
            State(state.clone()),
            Path(bark),
            Extension(claims_for(b, false)),
            Json(CreateCommentRequest {
                content: "nice bark".into(),
            }),
        )
        .await
        .unwrap();

        let Json(details) = get_bark(
            State(state.clone()),
            Path(bark),
            Extension(claims_for(b, false)),
        )
        .await
        .unwrap();

        assert_eq!(details.creator.username, "a");
        assert_eq!(details.comments.len(), 1);
        assert_eq!(details.comments[0].content, "nice bark");
        assert_eq!(details.comments[0].creator_username, "b");
    }
}
