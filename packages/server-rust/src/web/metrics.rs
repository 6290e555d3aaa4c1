//! Request metrics for the web endpoints.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! binary installs a recorder.

use std::time::Duration;

use axum::http::StatusCode;

use super::negotiate::NegotiatedFormat;

pub const THREAD_REQUESTS_TOTAL: &str = "fedithread_thread_requests_total";
pub const THREAD_REQUEST_DURATION_SECONDS: &str = "fedithread_thread_request_duration_seconds";

/// Records one finished thread request.
///
/// `format` is `None` when the request failed before negotiation.
pub fn record_thread_request(
    format: Option<NegotiatedFormat>,
    status: StatusCode,
    elapsed: Duration,
) {
    let format = format.map_or("none", NegotiatedFormat::as_str);
    metrics::counter!(
        THREAD_REQUESTS_TOTAL,
        "format" => format,
        "status" => status.as_u16().to_string(),
    )
    .increment(1);
    metrics::histogram!(THREAD_REQUEST_DURATION_SECONDS, "format" => format)
        .record(elapsed.as_secs_f64());
}
