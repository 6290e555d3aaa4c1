use tokio_util::sync::CancellationToken;

use crate::types::Account;

/// Per-request context carrying identity, tracing, and cancellation.
/// Passed to every collaborator call made while serving one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request identifier (the `x-request-id` header when present).
    pub request_id: String,
    /// Authenticated caller. `None` is an anonymous caller, not an error.
    pub caller: Option<Account>,
    /// Fires when the request should stop waiting on collaborators.
    pub cancel: CancellationToken,
}

impl RequestContext {
    /// Creates a context for an anonymous caller.
    #[must_use]
    pub fn anonymous(request_id: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            request_id: request_id.into(),
            caller: None,
            cancel,
        }
    }

    /// Returns the caller, if the request is authenticated.
    #[must_use]
    pub fn caller(&self) -> Option<&Account> {
        self.caller.as_ref()
    }
}
