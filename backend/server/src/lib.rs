//! Documentation of a sports club leaderboard.
//!
//!
//!
//! # General Infrastructure
//! - Browser client talks only to this server
//! - This server talks to the hosted Parse backend over its REST API
//! - The backend owns users, scores, groups and every cloud function
//! - Nothing is persisted here, sessions live in memory
//!
//!
//!
//! # Sessions
//!
//! **Goal**: Keep the signed-in user explicit. Handlers receive a `Session`,
//! nobody asks a global "current user".
//!
//! - `/login` forwards credentials to the backend and gets a session token back
//! - The token is remembered with the login time and an empty board
//! - Clients send it back as `Authorization: Bearer <token>`
//! - After an hour the token is forgotten and the client must log in again
//! - Each request re-reads the user from the backend so role changes apply immediately
//!
//!
//!
//! # Leaderboard
//!
//! - Coaches are never ranked
//! - Three boards: all-time, yearly, monthly, one shown at a time
//! - The roster is refetched on every `GET /leaderboard` and replaces the previous snapshot whole
//! - Ranking is done here, not by the backend query, so every board sorts the same way
//!
//!
//!
//! # Setup
//!
//! Secrets are read from `/run/secrets/<NAME>`, falling back to environment variables.
//! ```sh
//! export PARSE_APPLICATION_ID=...
//! export PARSE_REST_API_KEY=...
//! RUST_LOG=info cargo run -p leaderboard
//! ```
//!
//! Optional.
//! ```sh
//! RUST_PORT=1111
//! PARSE_SERVER_URL=https://parseapi.back4app.com
//! SESSION_TTL_SECS=3600
//! REQUEST_TIMEOUT_MS=5000
//! CORS_MAX_AGE_SECS=3600
//! ```
//!
//! Log every backend answer.
//! ```sh
//! cargo run -p leaderboard --features verbose
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post, put},
};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal::ctrl_c, time::interval};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;

use config::Config;
use routes::{
    adjust_score_handler, avatars_handler, display_names_handler, edit_group_handler,
    groups_handler, health_handler, leaderboard_handler, login_handler, logout_handler,
    receivers_handler, register_handler, request_reset_handler, reset_password_handler,
    select_view_handler, transfer_handler, update_avatar_handler, update_password_handler,
    user_groups_handler,
};
use state::State;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new(Config::load()?)?;

    tokio::spawn(purge_sessions(state.clone()));

    info!("Starting server...");

    let app = app(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");

    Ok(())
}

pub fn app(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(state.config.cors_max_age);

    Router::new()
        .route("/health", get(health_handler))
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/password-reset/request", post(request_reset_handler))
        .route("/password-reset", post(reset_password_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/leaderboard/view", post(select_view_handler))
        .route("/groups", get(groups_handler).put(edit_group_handler))
        .route("/display-names", get(display_names_handler))
        .route("/users", post(register_handler))
        .route("/users/{display_name}/groups", get(user_groups_handler))
        .route("/scores", post(adjust_score_handler))
        .route("/transfers", post(transfer_handler))
        .route("/transfers/receivers", get(receivers_handler))
        .route("/password", put(update_password_handler))
        .route("/avatars", get(avatars_handler))
        .route("/avatar", put(update_avatar_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn purge_sessions(state: Arc<State>) {
    let mut ticker = interval(PURGE_INTERVAL);

    loop {
        ticker.tick().await;
        state.sessions.purge_expired();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            return std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
