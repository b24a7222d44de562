//! The monthly sale statistics aggregate and its endpoint.

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, params_from_iter};
use serde::{Deserialize, Serialize};

use crate::{Error, app_state::TransactionQueryState, transaction::TransactionFilter};

/// Total sale amount and the sold/unsold split for one filter's matching set.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// The sum of `price` over matching transactions. Zero if none match.
    pub total_sale_amount: f64,
    /// The number of matching transactions that sold.
    pub total_sold_items: u64,
    /// The number of matching transactions that did not sell.
    pub total_not_sold_items: u64,
}

/// Compute the sale statistics for the transactions matching `filter`.
///
/// An empty matching set yields all-zero statistics, never an error.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn get_statistics(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Statistics, Error> {
    let (query_string, parameters) = filter.apply_to(
        "SELECT COALESCE(SUM(price), 0), COALESCE(SUM(sold), 0), COALESCE(SUM(1 - sold), 0)
         FROM \"transaction\"",
    );

    connection
        .prepare(&query_string)?
        .query_row(params_from_iter(parameters.iter()), |row| {
            // SQLite integers are i64; the counts are non-negative by
            // construction.
            Ok(Statistics {
                total_sale_amount: row.get(0)?,
                total_sold_items: row.get::<_, i64>(1)? as u64,
                total_not_sold_items: row.get::<_, i64>(2)? as u64,
            })
        })
        .map_err(|error| error.into())
}

/// The query parameters accepted by the statistics endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct StatisticsParams {
    /// The month to report on, as a name or a number from 1 to 12.
    pub month: Option<String>,
}

/// Handle requests for the monthly sale statistics.
pub async fn get_statistics_endpoint(
    State(state): State<TransactionQueryState>,
    Query(params): Query<StatisticsParams>,
) -> Response {
    let filter = TransactionFilter::month_only(params.month.as_deref());

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLock.into_response(),
    };

    match get_statistics(&filter, &connection) {
        Ok(statistics) => Json(statistics).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod statistics_tests {
    use rusqlite::Connection;
    use time::Month;

    use crate::{
        db::initialize,
        transaction::{
            TransactionFilter, count_transactions, replace_all_transactions,
            test_data::transaction_in,
        },
    };

    use super::{Statistics, get_statistics};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn computes_total_and_sold_split_for_month() {
        let connection = get_test_connection();
        replace_all_transactions(
            &[
                transaction_in(Month::March, 150.0, true, "Keyboard", "Electronics"),
                transaction_in(Month::March, 150.0, false, "Mouse", "Electronics"),
                transaction_in(Month::March, 999.0, true, "Monitor", "Electronics"),
                // Should be excluded from a March query.
                transaction_in(Month::April, 500.0, true, "Desk", "Furniture"),
            ],
            &connection,
        )
        .unwrap();

        let got = get_statistics(
            &TransactionFilter::month_only(Some("March")),
            &connection,
        )
        .unwrap();

        let want = Statistics {
            total_sale_amount: 1299.0,
            total_sold_items: 2,
            total_not_sold_items: 1,
        };
        assert_eq!(got, want);
    }

    #[test]
    fn empty_matching_set_yields_zeroes() {
        let connection = get_test_connection();

        let got = get_statistics(
            &TransactionFilter::month_only(Some("December")),
            &connection,
        )
        .unwrap();

        let want = Statistics {
            total_sale_amount: 0.0,
            total_sold_items: 0,
            total_not_sold_items: 0,
        };
        assert_eq!(got, want);
    }

    #[test]
    fn sold_and_not_sold_partition_the_matching_set() {
        let connection = get_test_connection();
        let records: Vec<_> = (0..17)
            .map(|i| transaction_in(Month::June, i as f64, i % 3 == 0, &format!("Item {i}"), "Misc"))
            .collect();
        replace_all_transactions(&records, &connection).unwrap();

        let filter = TransactionFilter::month_only(Some("June"));
        let statistics = get_statistics(&filter, &connection).unwrap();
        let count = count_transactions(&filter, &connection).unwrap();

        assert_eq!(
            statistics.total_sold_items + statistics.total_not_sold_items,
            count
        );
    }
}
