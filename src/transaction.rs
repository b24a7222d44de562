//! The transaction model, its SQLite schema and query functions, and the
//! paginated listing endpoint.
//!
//! Every dashboard endpoint filters transactions the same way: by calendar
//! month of the reference year and, for the listing, an optional free-text
//! search over title, description and price. [TransactionFilter] builds that
//! WHERE clause once so the listing, the counts and the aggregators cannot
//! drift apart.

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, Row, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    app_state::TransactionQueryState,
    db::DatabaseID,
    month::{MonthFilter, month_date_range},
    pagination::total_pages,
};

/// A product sale record from the seed feed.
///
/// Transactions are read-only: the ingestion job replaces the whole set and
/// no per-record update or delete exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction, assigned by the store.
    pub id: DatabaseID,
    /// The product title.
    pub title: String,
    /// The product description.
    pub description: String,
    /// The sale price. Never negative.
    pub price: f64,
    /// The date the sale happened (or was listed, for unsold items).
    pub date_of_sale: Date,
    /// Whether the item sold.
    pub sold: bool,
    /// The product category. The set of categories is discovered from the
    /// data, not fixed in advance.
    pub category: String,
}

/// A transaction that has not been stored yet, i.e. has no ID.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The product title.
    pub title: String,
    /// The product description.
    pub description: String,
    /// The sale price. Never negative.
    pub price: f64,
    /// The date the sale happened.
    pub date_of_sale: Date,
    /// Whether the item sold.
    pub sold: bool,
    /// The product category.
    pub category: String,
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                price REAL NOT NULL CHECK (price >= 0),
                date_of_sale TEXT NOT NULL,
                sold INTEGER NOT NULL,
                category TEXT NOT NULL
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [Transaction].
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        date_of_sale: row.get(4)?,
        sold: row.get(5)?,
        category: row.get(6)?,
    })
}

/// The predicate every dashboard query filters transactions with.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFilter {
    /// Restrict to sales in one calendar month of the reference year.
    pub month: MonthFilter,
    /// Case-insensitive containment over title, description or the price
    /// rendered as text. `None` or empty means no text filtering.
    ///
    /// Case folding is ASCII-only (SQLite's `LOWER`), so uppercase non-ASCII
    /// letters in the stored text only match exact-case.
    pub search: Option<String>,
}

impl TransactionFilter {
    /// Build a filter from the raw `month` and `search` query parameters.
    pub fn new(month: Option<&str>, search: Option<&str>) -> Self {
        let search = search
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);

        Self {
            month: MonthFilter::parse(month),
            search,
        }
    }

    /// A filter that matches transactions in `month` with no text search.
    pub fn month_only(month: Option<&str>) -> Self {
        Self::new(month, None)
    }

    /// The WHERE clause (without the `WHERE` keyword) and its parameters.
    ///
    /// Returns `None` for the clause when the filter matches everything.
    fn where_clause(&self) -> (Option<String>, Vec<Value>) {
        let mut clause_parts = vec![];
        let mut parameters = vec![];

        match self.month {
            MonthFilter::Any => {}
            MonthFilter::In(month) => {
                let (first, last) = month_date_range(month);
                clause_parts.push(format!(
                    "date_of_sale BETWEEN ?{} AND ?{}",
                    parameters.len() + 1,
                    parameters.len() + 2,
                ));
                parameters.push(Value::Text(first.to_string()));
                parameters.push(Value::Text(last.to_string()));
            }
            // An unrecognized month silently matches nothing.
            MonthFilter::Unmatched => clause_parts.push("0 = 1".to_string()),
        }

        if let Some(search) = &self.search {
            let index = parameters.len() + 1;
            clause_parts.push(format!(
                "(INSTR(LOWER(title), ?{index}) > 0 \
                 OR INSTR(LOWER(description), ?{index}) > 0 \
                 OR INSTR(CAST(price AS TEXT), ?{index}) > 0)",
            ));
            parameters.push(Value::Text(search.to_lowercase()));
        }

        if clause_parts.is_empty() {
            (None, parameters)
        } else {
            (Some(clause_parts.join(" AND ")), parameters)
        }
    }

    /// `sql` with this filter's WHERE clause appended, plus the parameters to
    /// bind.
    ///
    /// Used by the listing below and by the aggregators in
    /// [statistics](crate::statistics), [bar_chart](crate::bar_chart) and
    /// [pie_chart](crate::pie_chart).
    pub(crate) fn apply_to(&self, sql: &str) -> (String, Vec<Value>) {
        let (clause, parameters) = self.where_clause();

        match clause {
            Some(clause) => (format!("{sql} WHERE {clause}"), parameters),
            None => (sql.to_string(), parameters),
        }
    }
}

/// Query for transactions matching `filter`, in stable ID order.
///
/// `limit` and `offset` slice the matching set for pagination.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn query_transactions(
    filter: &TransactionFilter,
    limit: u64,
    offset: u64,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let (query_string, parameters) = filter.apply_to(
        "SELECT id, title, description, price, date_of_sale, sold, category FROM \"transaction\"",
    );
    // SQLite reads integer literals as i64; anything past that is more rows
    // than the store can hold anyway.
    let limit = limit.min(i64::MAX as u64);
    let offset = offset.min(i64::MAX as u64);
    let query_string = format!("{query_string} ORDER BY id ASC LIMIT {limit} OFFSET {offset}");

    connection
        .prepare(&query_string)?
        .query_map(params_from_iter(parameters.iter()), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Get the number of transactions matching `filter`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn count_transactions(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<u64, Error> {
    let (query_string, parameters) = filter.apply_to("SELECT COUNT(id) FROM \"transaction\"");

    connection
        .prepare(&query_string)?
        .query_row(params_from_iter(parameters.iter()), |row| {
            // SQLite integers are i64; COUNT is never negative.
            Ok(row.get::<_, i64>(0)? as u64)
        })
        .map_err(|error| error.into())
}

/// Replace the entire transaction set with `records`.
///
/// The delete and the inserts run inside one SQL transaction, so a failed
/// replace leaves the previous contents intact. The ID sequence is reset so
/// that re-running the ingestion with the same payload produces identical
/// rows, IDs included.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an unexpected
/// SQL error.
pub fn replace_all_transactions(
    records: &[NewTransaction],
    connection: &Connection,
) -> Result<usize, Error> {
    let tx = connection.unchecked_transaction()?;

    tx.execute("DELETE FROM \"transaction\"", ())?;
    tx.execute(
        "UPDATE sqlite_sequence SET seq = 0 WHERE name = 'transaction'",
        (),
    )?;

    let mut stmt = tx.prepare(
        "INSERT INTO \"transaction\" (title, description, price, date_of_sale, sold, category)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for record in records {
        stmt.execute((
            &record.title,
            &record.description,
            record.price,
            record.date_of_sale,
            record.sold,
            &record.category,
        ))?;
    }

    drop(stmt);

    tx.commit()?;
    Ok(records.len())
}

/// The query parameters for the transaction listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionListParams {
    /// The month to filter by, as a name or a number from 1 to 12.
    pub month: Option<String>,
    /// Free text to search for in the title, description or price.
    pub search: Option<String>,
    /// The page number to display. Starts from 1.
    pub page: Option<u64>,
    /// The maximum number of transactions to display per page.
    #[serde(rename = "perPage")]
    pub per_page: Option<u64>,
}

/// One page of matching transactions plus the total page count.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListResponse {
    /// The transactions on the requested page, in stable ID order.
    pub transactions: Vec<Transaction>,
    /// `ceil(total matching / perPage)`. Zero when nothing matches.
    pub total_pages: u64,
}

/// Build one page of the transaction listing for `filter`.
///
/// Pages are 1-indexed; a page past the end yields an empty slice, not an
/// error. `page` and `per_page` values below 1 are clamped to 1.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn list_transactions(
    filter: &TransactionFilter,
    page: u64,
    per_page: u64,
    connection: &Connection,
) -> Result<TransactionListResponse, Error> {
    let page = page.max(1);
    let per_page = per_page.max(1);

    let count = count_transactions(filter, connection)?;
    let offset = (page - 1).saturating_mul(per_page);
    let transactions = query_transactions(filter, per_page, offset, connection)?;

    Ok(TransactionListResponse {
        transactions,
        total_pages: total_pages(count, per_page),
    })
}

/// Handle requests for a searchable, paginated page of transactions.
pub async fn get_transactions(
    State(state): State<TransactionQueryState>,
    Query(params): Query<TransactionListParams>,
) -> Response {
    let filter = TransactionFilter::new(params.month.as_deref(), params.search.as_deref());
    let page = params.page.unwrap_or(state.pagination_config.default_page);
    let per_page = params
        .per_page
        .unwrap_or(state.pagination_config.default_page_size);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLock.into_response(),
    };

    match list_transactions(&filter, page, per_page, &connection) {
        Ok(response) => Json(response).into_response(),
        Err(error) => error.into_response(),
    }
}
