//! Uniform error pages for the web endpoints.
//!
//! Failures render through the same layout as successful pages. Instance
//! metadata comes from an [`InstanceGetter`], so a request that already
//! fetched it does not fetch it again just to show an error.

use std::sync::Arc;

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use fedithread_core::{ErrorKind, InstanceMetadata, RequestContext, WebError};
use tracing::{debug, error, warn};

use super::assets::PresentationAssets;
use super::config::WebConfig;
use super::instance::InstanceGetter;
use super::views::ErrorView;

/// Converts a pipeline failure into the response sent to the requester.
///
/// Never fails: if instance metadata cannot be fetched a placeholder is
/// used, and if the template cannot be rendered the safe message is sent as
/// plain text with the same status code.
pub async fn respond(
    err: WebError,
    instance: InstanceGetter<'_>,
    ctx: &RequestContext,
    config: &WebConfig,
) -> Response {
    log_failure(&err, ctx);

    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let instance = match instance.get(ctx).await {
        Ok(instance) => instance,
        Err(e) => {
            warn!(request_id = %ctx.request_id, error = %e, "instance unavailable for error page");
            Arc::new(InstanceMetadata::placeholder())
        }
    };

    let assets = PresentationAssets::for_error(config);
    let view = ErrorView {
        instance: &instance,
        code: status.as_u16(),
        reason: status.canonical_reason().unwrap_or_default(),
        message: err.safe_message(),
        request_id: &ctx.request_id,
        stylesheets: &assets.stylesheets,
    };

    match view.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!(request_id = %ctx.request_id, error = %e, "error page rendering failed");
            (status, err.safe_message().to_string()).into_response()
        }
    }
}

fn log_failure(err: &WebError, ctx: &RequestContext) {
    match err.kind() {
        ErrorKind::Internal => {
            error!(request_id = %ctx.request_id, error = %format!("{err:#}"), "web request failed");
        }
        kind => {
            debug!(request_id = %ctx.request_id, kind = kind.as_str(), error = %err, "web request rejected");
        }
    }
}
