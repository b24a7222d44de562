//! Implements the structs that hold the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{Error, db::initialize, ingest::SeedSource, pagination::PaginationConfig};

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Where the ingestion job fetches seed transactions from.
    pub seed_source: Arc<dyn SeedSource>,
    /// The config that controls how to page the transaction listing.
    pub pagination_config: PaginationConfig,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the transaction
    /// table.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        seed_source: Arc<dyn SeedSource>,
        pagination_config: PaginationConfig,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            seed_source,
            pagination_config,
        })
    }
}

/// The state needed to query and aggregate transactions.
#[derive(Clone)]
pub struct TransactionQueryState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The config that controls how to page the transaction listing.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for TransactionQueryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The state needed to run the ingestion job.
#[derive(Clone)]
pub struct IngestState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Where the ingestion job fetches seed transactions from.
    pub seed_source: Arc<dyn SeedSource>,
}

impl FromRef<AppState> for IngestState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            seed_source: state.seed_source.clone(),
        }
    }
}
