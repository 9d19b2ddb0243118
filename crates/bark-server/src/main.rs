use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use bark_api::auth::{self, AppState, AppStateInner};
use bark_api::barks;
use bark_api::comments;
use bark_api::middleware::{require_admin, require_auth};
use bark_api::reports;
use bark_api::users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bark=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("BARK_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("BARK_DB_PATH").unwrap_or_else(|_| "bark.db".into());
    let host = std::env::var("BARK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("BARK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let admin_email =
        std::env::var("BARK_ADMIN_EMAIL").unwrap_or_else(|_| "admin@bark.dev".into());
    let admin_password =
        std::env::var("BARK_ADMIN_PASSWORD").unwrap_or_else(|_| "admin-password".into());

    // Init database and bootstrap admin
    let db = bark_db::Database::open(&PathBuf::from(&db_path))?;
    auth::seed_admin(&db, &admin_email, &admin_password)?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner { db, jwt_secret });

    // Routes
    let public_routes = Router::new()
        .route("/user/signup", post(auth::sign_up))
        .route("/user/signin", post(auth::sign_in))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/user/profile/{user_id}", get(users::get_profile))
        .route("/user/suggested", get(users::get_suggested))
        .route("/user/following/{username}", get(users::get_following))
        .route("/user/followers/{username}", get(users::get_followers))
        .route("/user/follow/{user_id}", post(users::follow_user))
        .route("/bark/create", post(barks::create_bark))
        .route("/bark/details/{bark_id}", get(barks::get_bark))
        .route("/bark/getBarksByFollowing", get(barks::get_feed))
        .route("/bark/like/{bark_id}", post(barks::toggle_like))
        .route("/bark/{bark_id}/delete", delete(barks::delete_bark))
        .route("/comment/create/{bark_id}", post(comments::create_comment))
        .route(
            "/comment/delete/{comment_id}",
            delete(comments::delete_comment),
        )
        .route("/report/create/{bark_id}", post(reports::create_report))
        .layer(middleware::from_fn(require_auth))
        .with_state(state.clone());

    // Privilege check sits inside the auth layer.
    let admin_routes = Router::new()
        .route("/report/getall", get(reports::get_all_reports))
        .route("/report/delete/{report_id}", delete(reports::delete_report))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn(require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Bark server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
