//! # SVJ Voting Backend
//!
//! Voting administration service for condominium associations ("SVJ"):
//! building and member rosters, multi-question ballots, and token-based
//! email-link voting with live tallying.
//!
//!
//!
//! # General Infrastructure
//! - Thin axum JSON service over a relational store and a transactional
//!   email provider (Brevo)
//! - The store boundary is a trait; Postgres in production, an in-memory
//!   backend for tests, both serving the same voting core
//! - No background workers: everything runs inside request handlers, and the
//!   only fire-and-forget write is the per-vote statistics counter
//!
//!
//!
//! # Voting-Link Lifecycle
//!
//! The one part with real invariants. A personalized link must be usable
//! exactly once, only while active, only before expiry:
//!
//! - Activating a vote fans out one single-use, 30-day token per member
//! - The recipient opens the link; resolution validates token, expiry and
//!   vote status, and reports whether the member already voted
//! - Submission re-verifies everything, then inserts the answer rows and
//!   consumes the link as one atomic store operation
//! - A second submission for the same member is rejected no matter which
//!   still-active link it arrives through
//!
//! Current time is injected into every expiry check, so the lifecycle is
//! fully deterministic under test.
//!
//!
//!
//! # Setup
//!
//! Environment: `RUST_PORT`, `DATABASE_URL`, `FROM_EMAIL`, `FROM_NAME`,
//! `FRONTEND_URL`; `BREVO_API_KEY` from the environment or
//! `/run/secrets/BREVO_API_KEY`. Schema in `db/schema.sql`.
//!
//! ```sh
//! cargo run
//! ```
use std::time::Duration;

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod distribution;
pub mod error;
pub mod links;
pub mod mailer;
pub mod model;
pub mod roster;
pub mod routes;
pub mod state;
pub mod store;
pub mod tally;
pub mod testutil;
pub mod voting;

use routes::{
    distribute_voting_emails, get_voting_data, get_voting_data_query, process_email_vote,
    send_voting_email, vote_progress, vote_results,
};
use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route(
            "/get-voting-data",
            post(get_voting_data).get(get_voting_data_query),
        )
        .route("/process-email-vote", post(process_email_vote))
        .route("/send-voting-email", post(send_voting_email))
        .route("/distribute-voting-emails", post(distribute_voting_emails))
        .route("/votes/{id}/results", get(vote_results))
        .route("/votes/{id}/progress", get(vote_progress))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
