//! Axum entry point for thread pages.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use fedithread_core::RequestContext;
use tracing::{field, info_span, Instrument};
use uuid::Uuid;

use super::AppState;
use crate::web::thread_get;

const X_REQUEST_ID: &str = "x-request-id";

/// Serves `/@{user}/{id}` and `/@{user}/statuses/{id}`.
///
/// The request counts as in flight until the response is built. Its
/// cancellation token is a child of the server's abort token and is also
/// cancelled when axum drops this future (client went away).
pub async fn thread_handler(
    State(state): State<AppState>,
    Path((user, status_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let _in_flight = state.shutdown.in_flight_guard();
    let cancel = state.shutdown.request_token();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let request_id = headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);

    let span = info_span!(
        "thread",
        request_id = %request_id,
        user = %user,
        status_id = %status_id,
        format = field::Empty,
        status = field::Empty,
    );
    let ctx = RequestContext::anonymous(request_id, cancel);

    thread_get(&state.web, ctx, &user, &status_id, &headers)
        .instrument(span)
        .await
}
