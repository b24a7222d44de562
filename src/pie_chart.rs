//! The per-category transaction counts and their endpoint.

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, params_from_iter};
use serde::{Deserialize, Serialize};

use crate::{Error, app_state::TransactionQueryState, transaction::TransactionFilter};

/// The number of matching transactions in one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    /// The category label, as found in the data.
    pub category: String,
    /// The number of matching transactions in the category.
    pub count: u64,
}

/// Count the transactions matching `filter` per distinct category.
///
/// Every category present in the matching set appears exactly once; the set
/// of categories is discovered from the data, not fixed in advance. The
/// order of entries is not significant.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn get_category_counts(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<CategoryCount>, Error> {
    let (query_string, parameters) =
        filter.apply_to("SELECT category, COUNT(id) FROM \"transaction\"");
    let query_string = format!("{query_string} GROUP BY category");

    connection
        .prepare(&query_string)?
        .query_map(params_from_iter(parameters.iter()), |row| {
            Ok(CategoryCount {
                category: row.get(0)?,
                count: row.get::<_, i64>(1)? as u64,
            })
        })?
        .map(|count_result| count_result.map_err(Error::SqlError))
        .collect()
}

/// The query parameters accepted by the pie chart endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct PieChartParams {
    /// The month to report on, as a name or a number from 1 to 12.
    pub month: Option<String>,
}

/// Handle requests for the monthly per-category counts.
pub async fn get_pie_chart(
    State(state): State<TransactionQueryState>,
    Query(params): Query<PieChartParams>,
) -> Response {
    let filter = TransactionFilter::month_only(params.month.as_deref());

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLock.into_response(),
    };

    match get_category_counts(&filter, &connection) {
        Ok(counts) => Json(counts).into_response(),
        Err(error) => error.into_response(),
    }
}
