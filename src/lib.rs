//! Salesboard is the JSON REST back end for a product-transaction dashboard.
//!
//! It seeds a SQLite table from a remote JSON feed and serves filtered
//! transaction listings, aggregate sale statistics, a fixed price histogram
//! and per-category counts, all filtered by calendar month and an optional
//! free-text search.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod bar_chart;
mod combined;
mod db;
mod endpoints;
mod ingest;
mod logging;
mod month;
mod pagination;
mod pie_chart;
mod routing;
mod statistics;
mod transaction;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use ingest::{HttpSeedSource, SeedRecord, SeedSource, run_ingestion};
pub use logging::logging_middleware;
pub use pagination::PaginationConfig;
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The seed feed was unreachable or answered with a non-success status.
    #[error("could not fetch the seed data: {0}")]
    UpstreamFetch(String),

    /// The seed feed responded, but the payload was not an array of valid
    /// transaction records.
    ///
    /// The ingestion job rejects the whole payload rather than loading a
    /// partial record set.
    #[error("the seed payload is malformed: {0}")]
    MalformedPayload(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        Error::SqlError(value)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Error detail stays in the server logs. Clients get a generic
        // message so SQL and upstream internals are not leaked.
        tracing::error!("request failed: {self}");

        let message = match self {
            Error::UpstreamFetch(_) | Error::MalformedPayload(_) => "Error initializing database",
            Error::DatabaseLock | Error::SqlError(_) => "Internal server error",
        };

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": message })),
        )
            .into_response()
    }
}
