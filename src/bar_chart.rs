//! The fixed 10-bucket price histogram and its endpoint.
//!
//! Bucket boundaries follow an inclusive-upper-bound convention: a price
//! falls in the first bucket whose upper bound it does not exceed, so 100
//! lands in `0-100`, 100.50 and 101 in `101-200`, and anything over 900 in
//! `901-above`. This partitions all non-negative prices, fractional ones
//! included, with every transaction in exactly one bucket.

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, params_from_iter};
use serde::{Deserialize, Serialize};

use crate::{Error, app_state::TransactionQueryState, transaction::TransactionFilter};

/// The histogram bucket labels, in the ascending order the endpoint reports.
pub const BUCKET_LABELS: [&str; 10] = [
    "0-100",
    "101-200",
    "201-300",
    "301-400",
    "401-500",
    "501-600",
    "601-700",
    "701-800",
    "801-900",
    "901-above",
];

/// The inclusive upper bound of each bucket except the unbounded last one.
const BUCKET_UPPER_BOUNDS: [f64; 9] = [
    100.0, 200.0, 300.0, 400.0, 500.0, 600.0, 700.0, 800.0, 900.0,
];

/// One price-range bucket of the histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBucket {
    /// The bucket's price range label, e.g. `101-200`.
    pub range: String,
    /// The number of matching transactions whose price falls in the range.
    pub count: u64,
}

/// The SQL CASE expression assigning each price its bucket index.
fn bucket_case_expression() -> String {
    let arms: Vec<String> = BUCKET_UPPER_BOUNDS
        .iter()
        .enumerate()
        .map(|(index, bound)| format!("WHEN price <= {bound} THEN {index}"))
        .collect();

    format!(
        "CASE {} ELSE {} END",
        arms.join(" "),
        BUCKET_UPPER_BOUNDS.len()
    )
}

/// Compute the price histogram for the transactions matching `filter`.
///
/// Always returns all 10 buckets in ascending range order, with zero counts
/// for empty buckets.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn get_price_histogram(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<PriceBucket>, Error> {
    let (query_string, parameters) = filter.apply_to(&format!(
        "SELECT {} AS bucket, COUNT(id) FROM \"transaction\"",
        bucket_case_expression()
    ));
    let query_string = format!("{query_string} GROUP BY bucket");

    let mut counts = [0u64; BUCKET_LABELS.len()];
    let rows = connection
        .prepare(&query_string)?
        .query_map(params_from_iter(parameters.iter()), |row| {
            Ok((row.get::<_, i64>(0)? as usize, row.get::<_, i64>(1)? as u64))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (bucket, count) in rows {
        counts[bucket] = count;
    }

    Ok(BUCKET_LABELS
        .iter()
        .zip(counts)
        .map(|(label, count)| PriceBucket {
            range: label.to_string(),
            count,
        })
        .collect())
}

/// The query parameters accepted by the bar chart endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct BarChartParams {
    /// The month to report on, as a name or a number from 1 to 12.
    pub month: Option<String>,
}

/// Handle requests for the monthly price histogram.
pub async fn get_bar_chart(
    State(state): State<TransactionQueryState>,
    Query(params): Query<BarChartParams>,
) -> Response {
    let filter = TransactionFilter::month_only(params.month.as_deref());

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLock.into_response(),
    };

    match get_price_histogram(&filter, &connection) {
        Ok(histogram) => Json(histogram).into_response(),
        Err(error) => error.into_response(),
    }
}
