//! Database initialization and shared database types.

use rusqlite::Connection;

use crate::transaction::create_transaction_table;

/// Alias for the type used for database row IDs.
pub type DatabaseID = i64;

/// Create the application's tables if they do not exist.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    create_transaction_table(connection)
}
