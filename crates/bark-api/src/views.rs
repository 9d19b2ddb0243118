//! Typed fetch-and-join views: conversions from bark-db rows to the
//! composed response objects in bark-types.

use bark_db::models::{BarkRow, CommentRow, ReportRow, UserRow};
use bark_types::api::{BarkView, CommentView, ReportView, UserSummary};
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

pub fn parse_id(raw: &str, context: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}' on {}: {}", raw, context, e);
        Uuid::default()
    })
}

pub fn parse_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}

pub fn user_summary(row: &UserRow) -> UserSummary {
    UserSummary {
        id: parse_id(&row.id, "user"),
        email: row.email.clone(),
        username: row.username.clone(),
        picture: row.picture.clone(),
        roles: row.role_list(),
    }
}

pub fn bark_view(row: &BarkRow) -> BarkView {
    BarkView {
        id: parse_id(&row.id, "bark"),
        content: row.content.clone(),
        likes: row.likes,
        creator_id: parse_id(&row.creator_id, "bark creator"),
        creator_username: row.creator_username.clone(),
        created_at: parse_timestamp(&row.created_at, "bark"),
    }
}

pub fn comment_view(row: &CommentRow) -> CommentView {
    CommentView {
        id: parse_id(&row.id, "comment"),
        content: row.content.clone(),
        creator_id: parse_id(&row.creator_id, "comment creator"),
        creator_username: row.creator_username.clone(),
        bark_id: parse_id(&row.bark_id, "comment bark"),
        created_at: parse_timestamp(&row.created_at, "comment"),
    }
}

pub fn report_view(row: &ReportRow) -> ReportView {
    ReportView {
        id: parse_id(&row.id, "report"),
        content: row.content.clone(),
        bark_id: parse_id(&row.bark_id, "report bark"),
        created_at: parse_timestamp(&row.created_at, "report"),
    }
}
