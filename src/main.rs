mod auth;
mod config;
mod db;
mod error;
mod extractors;
mod feed;
mod i18n;
mod notify;
mod render;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use clap::Parser;
use rusqlite::params;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::auth::oauth_state::OauthStateStore;
use crate::config::{Cli, Config};
use crate::session::{AuthEvent, AuthHub, ProfileHub, SessionRegistry};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    // Wire the session registry to the auth event stream
    let profiles = ProfileHub::new();
    let auth_events = AuthHub::new();
    let registry = SessionRegistry::new(pool.clone(), profiles.clone());
    registry.initialize(&auth_events);

    let state = AppState {
        db: pool,
        config: Arc::new(config.clone()),
        profiles,
        auth_events,
        registry,
        oauth_states: Arc::new(Mutex::new(OauthStateStore::new())),
        http: reqwest::Client::new(),
    };

    // Build router
    let mut app = routes::app_router();

    // Test-only seed endpoint: creates a user + session, returns session cookie
    if std::env::var("VITRINA_TEST_SEED").is_ok() {
        app = app.route("/test/seed", get(test_seed));
    }

    let app = app.layer(TraceLayer::new_for_http()).with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Test-only: seed a user + session and return the session cookie.
/// Only mounted when VITRINA_TEST_SEED env var is set.
async fn test_seed(State(state): State<AppState>) -> impl IntoResponse {
    let conn = state.db.get().unwrap();
    conn.execute(
        "INSERT OR IGNORE INTO users (id, email, name, avatar_url)
         VALUES (?1, 'seed@example.com', 'Seed User', 'https://avatar.vitrina.dev/marble/180/SeedUser')",
        params![uuid::Uuid::now_v7().to_string()],
    )
    .unwrap();

    // Get the actual user id (may already exist from a previous seed call)
    let uid: String = conn
        .query_row(
            "SELECT id FROM users WHERE email = 'seed@example.com'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    drop(conn);

    let token = auth::session::create_session(&state.db, &uid, state.config.auth.session_hours)
        .unwrap();
    state.auth_events.publish(&AuthEvent::SignedIn {
        token: token.clone(),
        uid: uid.clone(),
    });

    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age=3600",
        state.config.auth.cookie_name, token
    );

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        format!("{{\"user_id\":\"{}\",\"email\":\"seed@example.com\"}}", uid),
    )
}
