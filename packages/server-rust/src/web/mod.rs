//! Human-readable web pages and their federation counterparts.
//!
//! The thread endpoint runs a strict pipeline:
//!
//! 1. **Parameters** (`fedithread_core::ident`): normalize `@user` and status id
//! 2. **Identity** (`crate::auth`): optional bearer-token caller
//! 3. **Instance** (`instance`): metadata fetched once, memoized for errors
//! 4. **Ownership** (`thread`): local account, visible status, matching author
//! 5. **Negotiation** (`negotiate`): web page vs federation document
//! 6. **Terminal stage** (`thread`): thread page, or serialized document
//!
//! Any failure goes to the error responder (`error`).

pub mod assets;
pub mod config;
pub mod error;
pub mod instance;
pub mod metrics;
pub mod negotiate;
pub mod og;
pub mod thread;
pub mod views;

pub use assets::PresentationAssets;
pub use config::WebConfig;
pub use instance::InstanceGetter;
pub use negotiate::NegotiatedFormat;
pub use thread::thread_get;

use std::future::Future;
use std::sync::Arc;

use fedithread_core::{
    AccountProvider, FederationProvider, InstanceProvider, RequestContext, StatusProvider,
    WebError,
};

use crate::auth::IdentityResolver;

/// Collaborators and settings used by the web handlers.
///
/// Cloning is cheap; every field is behind an `Arc`.
#[derive(Clone)]
pub struct WebState {
    pub config: Arc<WebConfig>,
    pub identity: Arc<dyn IdentityResolver>,
    pub instance: Arc<dyn InstanceProvider>,
    pub accounts: Arc<dyn AccountProvider>,
    pub statuses: Arc<dyn StatusProvider>,
    pub federation: Arc<dyn FederationProvider>,
}

impl WebState {
    /// Builds a state whose data collaborators are all served by `store`.
    #[must_use]
    pub fn from_store<S>(
        store: Arc<S>,
        identity: Arc<dyn IdentityResolver>,
        config: WebConfig,
    ) -> Self
    where
        S: InstanceProvider + AccountProvider + StatusProvider + FederationProvider + 'static,
    {
        Self {
            config: Arc::new(config),
            identity,
            instance: store.clone(),
            accounts: store.clone(),
            statuses: store.clone(),
            federation: store,
        }
    }
}

/// Runs a collaborator call, abandoning it if the request is cancelled.
///
/// Cancellation is reported as an internal error and never retried.
pub(crate) async fn with_cancel<T, F>(ctx: &RequestContext, fut: F) -> Result<T, WebError>
where
    F: Future<Output = Result<T, WebError>>,
{
    tokio::select! {
        biased;
        () = ctx.cancel.cancelled() => Err(WebError::internal("request cancelled")),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn with_cancel_passes_through_results() {
        let ctx = RequestContext::anonymous("req", CancellationToken::new());
        let value = with_cancel(&ctx, async { Ok::<_, WebError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn with_cancel_reports_cancellation_as_internal() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = RequestContext::anonymous("req", token);

        let err = with_cancel(&ctx, std::future::pending::<Result<(), WebError>>())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
}
