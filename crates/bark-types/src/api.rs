use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the auth handlers.
/// Canonical definition lives here in bark-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub is_admin: bool,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignUpRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub message: String,
    pub token: String,
    pub user_id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

// -- Users --

/// A user as exposed over the API. Password material never leaves the DB
/// layer: no serialized type has a field for it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub picture: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: UserSummary,
    pub barks: Vec<BarkView>,
    pub followers: Vec<Uuid>,
    pub following: Vec<Uuid>,
    pub liked_barks: Vec<Uuid>,
}

/// A suggested account, annotated with the first-degree contact that
/// introduced it. Absent on the everyone-you-don't-follow fallback.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedUser {
    #[serde(flatten)]
    pub user: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followed_by: Option<String>,
}

// -- Barks --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBarkRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarkView {
    pub id: Uuid,
    pub content: String,
    pub likes: i64,
    pub creator_id: Uuid,
    pub creator_username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarkDetails {
    pub id: Uuid,
    pub content: String,
    pub likes: i64,
    pub creator: UserSummary,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CreateBarkResponse {
    pub message: String,
    pub bark: BarkView,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: i64,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub content: String,
    pub creator_id: Uuid,
    pub creator_username: String,
    pub bark_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CreateCommentResponse {
    pub message: String,
    pub comment: CommentView,
}

// -- Reports --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReportRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub id: Uuid,
    pub content: String,
    pub bark_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CreateReportResponse {
    pub message: String,
    pub report: ReportView,
}

#[derive(Debug, Serialize)]
pub struct ReportListResponse {
    pub message: String,
    pub reports: Vec<ReportView>,
}

// -- Shared --

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
