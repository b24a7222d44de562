//! The API endpoint URIs.

/// The route that triggers the ingestion job.
pub const INITIALIZE: &str = "/api/initialize";
/// The route for the searchable, paginated transaction listing.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route for the monthly sale statistics.
pub const STATISTICS: &str = "/api/statistics";
/// The route for the monthly price histogram.
pub const BAR_CHART: &str = "/api/bar-chart";
/// The route for the monthly per-category counts.
pub const PIE_CHART: &str = "/api/pie-chart";
/// The route answering the listing, statistics and both charts at once.
pub const COMBINED: &str = "/api/combined";
