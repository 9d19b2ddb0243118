use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use bark_types::api::{
    Claims, CreateReportRequest, CreateReportResponse, MessageResponse, ReportListResponse,
    ReportView,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::validate;
use crate::views;

pub async fn create_report(
    State(state): State<AppState>,
    Path(bark_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<CreateReportResponse>), ApiError> {
    let content = validate::require_content(
        &req.content,
        10,
        "Please explain the issue with at least 10 characters.",
    )?;

    let reported_id = bark_id.to_string();
    if state.db.get_bark(&reported_id)?.is_none() {
        return Err(ApiError::NotFound("Bark not found!".into()));
    }

    let report_id = Uuid::new_v4();
    state
        .db
        .insert_report(&report_id.to_string(), &content, &reported_id)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateReportResponse {
            message: "Report has been sent.".into(),
            report: ReportView {
                id: report_id,
                content,
                bark_id,
                created_at: chrono::Utc::now(),
            },
        }),
    ))
}

/// Admin-only; the privilege check lives in the route middleware.
pub async fn get_all_reports(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<ReportListResponse>, ApiError> {
    let reports = state
        .db
        .list_reports()?
        .iter()
        .map(views::report_view)
        .collect();

    Ok(Json(ReportListResponse {
        message: "Reports fetched".into(),
        reports,
    }))
}

// TODO: decide report deletion semantics (hard delete vs. resolve flag)
// before wiring a real handler here.
pub async fn delete_report(
    State(_state): State<AppState>,
    Path(_report_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    Err(ApiError::NotImplemented(
        "Report deletion is not implemented".into(),
    ))
}
