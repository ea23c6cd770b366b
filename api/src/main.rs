//! Library API Server
//!
//! A lending service for a small library: a book catalogue, library members,
//! and the issue/return ledger with late fines.
//! Uses hexagonal (ports & adapters) architecture for clean separation of concerns.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use sea_orm::{Database, DatabaseConnection};
use serde::Serialize;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod adapters;
mod app;
mod auth;
mod config;
mod domain;
mod entity;
mod error;
mod handlers;

#[cfg(test)]
mod test_utils;


use adapters::{
    SqlBookRepository, SqlIssueRecordRepository, SqlMemberRepository, SqlUserRepository,
};
use app::{CatalogService, IdentityService, LendingService, MembershipService};
use config::Config;
use domain::entities::Money;
use domain::ports::{Clock, MemberCodeSource, RandomMemberCodes, SystemClock};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog_service: Arc<CatalogService<SqlBookRepository>>,
    pub membership_service: Arc<
        MembershipService<
            SqlBookRepository,
            SqlMemberRepository,
            SqlUserRepository,
            SqlIssueRecordRepository,
        >,
    >,
    pub lending_service: Arc<
        LendingService<
            SqlBookRepository,
            SqlMemberRepository,
            SqlUserRepository,
            SqlIssueRecordRepository,
        >,
    >,
    pub identity_service: Arc<IdentityService<SqlUserRepository, SqlMemberRepository>>,
    pub config: Config,
}

/// Wire repositories and services over one database connection
pub fn build_state(
    db: DatabaseConnection,
    config: &Config,
    clock: Arc<dyn Clock>,
    codes: Arc<dyn MemberCodeSource>,
) -> AppState {
    let book_repo = Arc::new(SqlBookRepository::new(db.clone()));
    let member_repo = Arc::new(SqlMemberRepository::new(db.clone()));
    let user_repo = Arc::new(SqlUserRepository::new(db.clone()));
    let issue_repo = Arc::new(SqlIssueRecordRepository::new(db));

    let lending_service = Arc::new(LendingService::new(
        book_repo.clone(),
        member_repo.clone(),
        user_repo.clone(),
        issue_repo,
        clock,
        config.loan_period_days,
        Money::from_cents(config.daily_fine_cents),
    ));

    let membership_service = Arc::new(MembershipService::new(
        member_repo.clone(),
        user_repo.clone(),
        lending_service.clone(),
        codes.clone(),
    ));

    let identity_service = Arc::new(IdentityService::new(user_repo, member_repo, codes));

    AppState {
        catalog_service: Arc::new(CatalogService::new(book_repo)),
        membership_service,
        lending_service,
        identity_service,
        config: config.clone(),
    }
}

/// Build the HTTP router
///
/// Credentials are resolved for every request; handlers that need a caller
/// reject anonymous requests themselves. With `rate_limit` set, the auth
/// endpoints are throttled per peer IP, which requires serving with connect
/// info.
pub fn build_router(state: AppState, rate_limit: bool) -> Router {
    let mut auth_routes = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/token", post(handlers::login));

    if rate_limit {
        // 5 request burst, then one more every 2 seconds
        if let Some(config) = GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(2)
            .burst_size(5)
            .finish()
        {
            auth_routes = auth_routes.layer(GovernorLayer {
                config: Arc::new(config),
            });
        } else {
            tracing::warn!("Invalid rate limit settings, auth endpoints are not throttled");
        }
    }

    Router::new()
        // Health check (no auth)
        .route("/health", get(health))
        .merge(auth_routes)
        .route("/auth/me", get(handlers::me))
        // Catalogue: reads are public, writes need a caller
        .route(
            "/books",
            get(handlers::list_books).post(handlers::create_book),
        )
        .route("/books/available", get(handlers::list_available_books))
        .route(
            "/books/:id",
            get(handlers::get_book)
                .put(handlers::put_book)
                .patch(handlers::patch_book)
                .delete(handlers::delete_book),
        )
        // Members
        .route(
            "/members",
            get(handlers::list_members).post(handlers::create_member),
        )
        .route(
            "/members/:id",
            get(handlers::get_member)
                .put(handlers::put_member)
                .patch(handlers::patch_member)
                .delete(handlers::delete_member),
        )
        .route("/members/:id/issues", get(handlers::member_history))
        // Lending
        .route("/issues", get(handlers::list_issues))
        .route("/issues/issue", post(handlers::issue_book))
        .route("/issues/return_book", post(handlers::return_book))
        .route("/issues/:id", get(handlers::get_issue))
        // Middleware
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,library_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Library API...");

    let config = Config::from_env()?;

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    if config.auto_migrate {
        adapters::ensure_schema(&db)
            .await
            .context("Failed to create database schema")?;
    }

    let state = build_state(
        db,
        &config,
        Arc::new(SystemClock),
        Arc::new(RandomMemberCodes),
    );
    let app = build_router(state, config.rate_limit_auth);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
