//! Application router configuration.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::{
    AppState, bar_chart::get_bar_chart, combined::get_combined, endpoints,
    ingest::initialize_database, pie_chart::get_pie_chart, statistics::get_statistics_endpoint,
    transaction::get_transactions,
};

/// Return a router with all the app's routes.
///
/// The permissive CORS layer lets the dashboard client be served from a
/// different origin during development.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::INITIALIZE, get(initialize_database))
        .route(endpoints::TRANSACTIONS, get(get_transactions))
        .route(endpoints::STATISTICS, get(get_statistics_endpoint))
        .route(endpoints::BAR_CHART, get(get_bar_chart))
        .route(endpoints::PIE_CHART, get(get_pie_chart))
        .route(endpoints::COMBINED, get(get_combined))
        .fallback(get_not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The JSON 404 response for unknown routes.
async fn get_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "not found" })),
    )
        .into_response()
}

#[cfg(test)]
mod api_route_tests {
    use std::sync::Arc;

    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::Value;

    use crate::{
        AppState, endpoints,
        ingest::test_source::{FakeSeedSource, seed_record},
        pagination::PaginationConfig,
        statistics::Statistics,
        transaction::TransactionListResponse,
    };

    use super::build_router;

    fn get_test_server(source: FakeSeedSource) -> TestServer {
        let connection = Connection::open_in_memory().expect("could not open database in memory");
        let state = AppState::new(connection, Arc::new(source), PaginationConfig::default())
            .expect("could not create app state");

        TestServer::new(build_router(state)).expect("could not create test server")
    }

    fn march_seed() -> FakeSeedSource {
        FakeSeedSource::Records(vec![
            seed_record("Keyboard", 150.0, true, "Electronics"),
            seed_record("Mouse", 150.0, false, "Electronics"),
            seed_record("Monitor", 999.0, true, "Electronics"),
        ])
    }

    #[tokio::test]
    async fn initialize_then_query_statistics() {
        let server = get_test_server(march_seed());

        let response = server.get(endpoints::INITIALIZE).await;
        response.assert_status_ok();
        response.assert_json(&serde_json::json!({
            "message": "Database initialized successfully"
        }));

        let response = server
            .get(endpoints::STATISTICS)
            .add_query_param("month", "March")
            .await;
        response.assert_status_ok();

        let statistics: Statistics = response.json();
        assert_eq!(statistics.total_sale_amount, 1299.0);
        assert_eq!(statistics.total_sold_items, 2);
        assert_eq!(statistics.total_not_sold_items, 1);
    }

    #[tokio::test]
    async fn initialize_reports_500_when_feed_is_down() {
        let server = get_test_server(FakeSeedSource::Unreachable(
            "connection refused".to_string(),
        ));

        let response = server.get(endpoints::INITIALIZE).await;

        response.assert_status_internal_server_error();
        let body: Value = response.json();
        assert_eq!(body["error"], "Error initializing database");
    }

    #[tokio::test]
    async fn listing_supports_search_and_pagination() {
        let server = get_test_server(march_seed());
        server.get(endpoints::INITIALIZE).await.assert_status_ok();

        let response = server
            .get(endpoints::TRANSACTIONS)
            .add_query_param("month", "March")
            .add_query_param("search", "monitor")
            .await;
        response.assert_status_ok();

        let listing: TransactionListResponse = response.json();
        assert_eq!(listing.transactions.len(), 1);
        assert_eq!(listing.transactions[0].title, "Monitor");
        assert_eq!(listing.total_pages, 1);

        // A search that matches nothing yields zero pages, not an error.
        let response = server
            .get(endpoints::TRANSACTIONS)
            .add_query_param("month", "March")
            .add_query_param("search", "widget")
            .await;
        response.assert_status_ok();

        let listing: TransactionListResponse = response.json();
        assert!(listing.transactions.is_empty());
        assert_eq!(listing.total_pages, 0);
    }

    #[tokio::test]
    async fn listing_respects_page_size() {
        let server = get_test_server(march_seed());
        server.get(endpoints::INITIALIZE).await.assert_status_ok();

        let response = server
            .get(endpoints::TRANSACTIONS)
            .add_query_param("month", "March")
            .add_query_param("page", "2")
            .add_query_param("perPage", "2")
            .await;
        response.assert_status_ok();

        let listing: TransactionListResponse = response.json();
        assert_eq!(listing.transactions.len(), 1);
        assert_eq!(listing.total_pages, 2);
    }

    #[tokio::test]
    async fn bar_chart_is_ordered_and_complete() {
        let server = get_test_server(march_seed());
        server.get(endpoints::INITIALIZE).await.assert_status_ok();

        let response = server
            .get(endpoints::BAR_CHART)
            .add_query_param("month", "March")
            .await;
        response.assert_status_ok();

        let buckets: Vec<Value> = response.json();
        assert_eq!(buckets.len(), 10);
        assert_eq!(buckets[0]["range"], "0-100");
        assert_eq!(buckets[1]["range"], "101-200");
        assert_eq!(buckets[1]["count"], 2);
        assert_eq!(buckets[9]["range"], "901-above");
        assert_eq!(buckets[9]["count"], 1);
    }

    #[tokio::test]
    async fn pie_chart_counts_categories() {
        let server = get_test_server(march_seed());
        server.get(endpoints::INITIALIZE).await.assert_status_ok();

        let response = server
            .get(endpoints::PIE_CHART)
            .add_query_param("month", "March")
            .await;
        response.assert_status_ok();

        let counts: Vec<Value> = response.json();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0]["category"], "Electronics");
        assert_eq!(counts[0]["count"], 3);
    }

    #[tokio::test]
    async fn unrecognized_month_yields_empty_results_not_an_error() {
        let server = get_test_server(march_seed());
        server.get(endpoints::INITIALIZE).await.assert_status_ok();

        let response = server
            .get(endpoints::STATISTICS)
            .add_query_param("month", "Smarch")
            .await;
        response.assert_status_ok();

        let statistics: Statistics = response.json();
        assert_eq!(statistics.total_sale_amount, 0.0);
        assert_eq!(statistics.total_sold_items, 0);
        assert_eq!(statistics.total_not_sold_items, 0);
    }

    #[tokio::test]
    async fn combined_returns_all_four_sections() {
        let server = get_test_server(march_seed());
        server.get(endpoints::INITIALIZE).await.assert_status_ok();

        let response = server
            .get(endpoints::COMBINED)
            .add_query_param("month", "3")
            .await;
        response.assert_status_ok();

        let combined: Value = response.json();
        assert!(combined["transactions"]["transactions"].is_array());
        assert_eq!(combined["transactions"]["totalPages"], 1);
        assert_eq!(combined["statistics"]["totalSaleAmount"], 1299.0);
        assert_eq!(combined["barChart"].as_array().unwrap().len(), 10);
        assert_eq!(combined["pieChart"][0]["count"], 3);
    }

    #[tokio::test]
    async fn unknown_routes_get_a_json_404() {
        let server = get_test_server(march_seed());

        let response = server.get("/api/nope").await;

        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["error"], "not found");
    }
}
