//! The combined endpoint: one month request answering the listing, the
//! statistics and both charts together.

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    app_state::TransactionQueryState,
    bar_chart::{PriceBucket, get_price_histogram},
    pie_chart::{CategoryCount, get_category_counts},
    statistics::{Statistics, get_statistics},
    transaction::{TransactionFilter, TransactionListParams, TransactionListResponse, list_transactions},
};

/// Everything the dashboard needs to render one month.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedResponse {
    /// One page of matching transactions plus the total page count.
    ///
    /// Unlike the aggregates, the listing honors the `search` parameter.
    pub transactions: TransactionListResponse,
    /// The month's sale statistics.
    pub statistics: Statistics,
    /// The month's price histogram, in ascending range order.
    pub bar_chart: Vec<PriceBucket>,
    /// The month's per-category counts.
    pub pie_chart: Vec<CategoryCount>,
}

/// Handle requests for the combined month view.
///
/// The four sub-results do not depend on each other. They are computed under
/// a single hold of the connection lock so they all observe the same snapshot
/// of the store, even if an ingestion run lands mid-request.
pub async fn get_combined(
    State(state): State<TransactionQueryState>,
    Query(params): Query<TransactionListParams>,
) -> Response {
    let listing_filter = TransactionFilter::new(params.month.as_deref(), params.search.as_deref());
    let month_filter = TransactionFilter::month_only(params.month.as_deref());
    let page = params.page.unwrap_or(state.pagination_config.default_page);
    let per_page = params
        .per_page
        .unwrap_or(state.pagination_config.default_page_size);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLock.into_response(),
    };

    let transactions = match list_transactions(&listing_filter, page, per_page, &connection) {
        Ok(transactions) => transactions,
        Err(error) => return error.into_response(),
    };

    let statistics = match get_statistics(&month_filter, &connection) {
        Ok(statistics) => statistics,
        Err(error) => return error.into_response(),
    };

    let bar_chart = match get_price_histogram(&month_filter, &connection) {
        Ok(bar_chart) => bar_chart,
        Err(error) => return error.into_response(),
    };

    let pie_chart = match get_category_counts(&month_filter, &connection) {
        Ok(pie_chart) => pie_chart,
        Err(error) => return error.into_response(),
    };

    Json(CombinedResponse {
        transactions,
        statistics,
        bar_chart,
        pie_chart,
    })
    .into_response()
}
