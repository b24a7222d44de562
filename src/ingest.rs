//! The ingestion job: fetch the seed feed and replace the transaction set.
//!
//! The feed is an array of transaction-shaped JSON records. The whole payload
//! is validated before anything is written, and the write itself is a single
//! delete-all + insert-all SQL transaction, so a failed run never leaves the
//! store half-loaded or empty.

use std::sync::Mutex;

use async_trait::async_trait;
use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

use crate::{
    Error,
    app_state::IngestState,
    transaction::{NewTransaction, replace_all_transactions},
};

/// A raw record from the seed feed.
///
/// Extra fields in the feed (e.g. product image URLs) are ignored, and so is
/// the feed's own `id`: the store assigns IDs on insert.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRecord {
    /// The product title.
    pub title: String,
    /// The product description.
    pub description: String,
    /// The sale price.
    pub price: f64,
    /// The sale date, either an RFC 3339 timestamp or a plain `YYYY-MM-DD`
    /// date.
    pub date_of_sale: String,
    /// Whether the item sold.
    pub sold: bool,
    /// The product category.
    pub category: String,
}

/// Where the ingestion job fetches seed transactions from.
#[async_trait]
pub trait SeedSource: Send + Sync {
    /// Fetch the full seed payload.
    ///
    /// # Errors
    /// Returns [Error::UpstreamFetch] if the source is unreachable or answers
    /// with a non-success status, and [Error::MalformedPayload] if the
    /// response is not a JSON array of records.
    async fn fetch(&self) -> Result<Vec<SeedRecord>, Error>;
}

/// A [SeedSource] that fetches the feed over HTTP.
pub struct HttpSeedSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSeedSource {
    /// Create a source that fetches the JSON array at `url`.
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl SeedSource for HttpSeedSource {
    async fn fetch(&self) -> Result<Vec<SeedRecord>, Error> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|error| Error::UpstreamFetch(error.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|error| Error::UpstreamFetch(error.to_string()))?;

        response
            .json()
            .await
            .map_err(|error| Error::MalformedPayload(error.to_string()))
    }
}

/// Parse a seed record's sale date.
///
/// The feed historically carried full RFC 3339 timestamps; plain dates are
/// accepted too.
fn parse_sale_date(text: &str) -> Result<Date, Error> {
    if let Ok(datetime) = OffsetDateTime::parse(text, &Rfc3339) {
        return Ok(datetime.date());
    }

    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map_err(|_| Error::MalformedPayload(format!("invalid sale date \"{text}\"")))
}

/// Validate a seed record into a storable transaction.
fn validate_record(record: SeedRecord) -> Result<NewTransaction, Error> {
    if !record.price.is_finite() || record.price < 0.0 {
        return Err(Error::MalformedPayload(format!(
            "invalid price {} for \"{}\"",
            record.price, record.title
        )));
    }

    Ok(NewTransaction {
        date_of_sale: parse_sale_date(&record.date_of_sale)?,
        title: record.title,
        description: record.description,
        price: record.price,
        sold: record.sold,
        category: record.category,
    })
}

/// Fetch the seed feed from `source` and replace the transaction set with it.
///
/// Returns the number of transactions loaded.
///
/// # Errors
/// This function will return a:
/// - [Error::UpstreamFetch] if the feed cannot be fetched,
/// - [Error::MalformedPayload] if any record in the payload is invalid (the
///   store is left untouched in that case),
/// - [Error::DatabaseLock] if the database lock is poisoned,
/// - or [Error::SqlError] if the write fails.
pub async fn run_ingestion(
    source: &dyn SeedSource,
    db_connection: &Mutex<Connection>,
) -> Result<usize, Error> {
    let records = source.fetch().await?;

    let transactions = records
        .into_iter()
        .map(validate_record)
        .collect::<Result<Vec<_>, _>>()?;

    let connection = db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let loaded = replace_all_transactions(&transactions, &connection)?;

    tracing::info!("seeded {loaded} transactions");
    Ok(loaded)
}

/// Handle requests to (re)initialize the database from the seed feed.
pub async fn initialize_database(State(state): State<IngestState>) -> Response {
    match run_ingestion(state.seed_source.as_ref(), &state.db_connection).await {
        Ok(_) => Json(json!({ "message": "Database initialized successfully" })).into_response(),
        Err(error) => error.into_response(),
    }
}


#[cfg(test)]
mod ingest_tests {
    use std::sync::Mutex;

    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        db::initialize,
        transaction::{TransactionFilter, count_transactions, query_transactions},
    };

    use super::{
        parse_sale_date, run_ingestion,
        test_source::{FakeSeedSource, seed_record},
    };

    fn get_test_connection() -> Mutex<Connection> {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        Mutex::new(connection)
    }

    #[test]
    fn parses_rfc3339_and_plain_dates() {
        assert_eq!(
            parse_sale_date("2021-11-27T20:29:54+05:30").unwrap(),
            date!(2021 - 11 - 27)
        );
        assert_eq!(
            parse_sale_date("2022-03-15T08:30:00Z").unwrap(),
            date!(2022 - 03 - 15)
        );
        assert_eq!(parse_sale_date("2022-03-15").unwrap(), date!(2022 - 03 - 15));
        assert!(matches!(
            parse_sale_date("the ides of March"),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[tokio::test]
    async fn loads_the_whole_payload() {
        let db_connection = get_test_connection();
        let source = FakeSeedSource::Records(vec![
            seed_record("Keyboard", 150.0, true, "Electronics"),
            seed_record("Novel", 20.0, false, "Books"),
        ]);

        let loaded = run_ingestion(&source, &db_connection).await.unwrap();

        assert_eq!(loaded, 2);
        let connection = db_connection.lock().unwrap();
        let stored =
            query_transactions(&TransactionFilter::new(None, None), 100, 0, &connection).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].title, "Keyboard");
        assert_eq!(stored[0].date_of_sale, date!(2022 - 03 - 15));
    }

    #[tokio::test]
    async fn replaces_previous_contents_instead_of_appending() {
        let db_connection = get_test_connection();

        let first = FakeSeedSource::Records(vec![
            seed_record("Keyboard", 150.0, true, "Electronics"),
            seed_record("Novel", 20.0, false, "Books"),
        ]);
        run_ingestion(&first, &db_connection).await.unwrap();

        let second = FakeSeedSource::Records(vec![seed_record(
            "Lamp",
            35.0,
            true,
            "Homeware",
        )]);
        run_ingestion(&second, &db_connection).await.unwrap();

        let connection = db_connection.lock().unwrap();
        let stored =
            query_transactions(&TransactionFilter::new(None, None), 100, 0, &connection).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Lamp");
    }

    #[tokio::test]
    async fn rejects_negative_prices_and_keeps_prior_contents() {
        let db_connection = get_test_connection();

        let good = FakeSeedSource::Records(vec![seed_record(
            "Keyboard",
            150.0,
            true,
            "Electronics",
        )]);
        run_ingestion(&good, &db_connection).await.unwrap();

        let bad = FakeSeedSource::Records(vec![
            seed_record("Lamp", 35.0, true, "Homeware"),
            seed_record("Refund voucher", -10.0, false, "Misc"),
        ]);
        let result = run_ingestion(&bad, &db_connection).await;

        assert!(matches!(result, Err(Error::MalformedPayload(_))));

        // Validation happens before the write, so the previous load survives.
        let connection = db_connection.lock().unwrap();
        let count = count_transactions(&TransactionFilter::new(None, None), &connection).unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn upstream_errors_propagate() {
        let db_connection = get_test_connection();
        let source =
            FakeSeedSource::Unreachable("connection refused".to_string());

        let result = run_ingestion(&source, &db_connection).await;

        assert_eq!(
            result,
            Err(Error::UpstreamFetch("connection refused".to_string()))
        );
    }
}
