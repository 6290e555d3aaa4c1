use std::sync::Arc;

use fedithread_core::{InstanceMetadata, InstanceProvider, RequestContext, WebError};

use super::with_cancel;

/// Two-mode access to instance metadata within one request.
///
/// Once the pipeline has fetched the metadata it hands out `Cached`, so an
/// error page rendered later costs no further I/O. Before that point the
/// error responder gets `Live` and performs the one fetch itself.
pub enum InstanceGetter<'a> {
    Cached(Arc<InstanceMetadata>),
    Live(&'a dyn InstanceProvider),
}

impl InstanceGetter<'_> {
    /// Returns the metadata, fetching it only in `Live` mode.
    ///
    /// # Errors
    ///
    /// Any collaborator failure is reported as [`WebError::Internal`].
    pub async fn get(&self, ctx: &RequestContext) -> Result<Arc<InstanceMetadata>, WebError> {
        match self {
            Self::Cached(instance) => Ok(Arc::clone(instance)),
            Self::Live(provider) => with_cancel(ctx, provider.get_instance(ctx))
                .await
                .map(Arc::new)
                .map_err(|e| match e {
                    WebError::Internal(_) => e,
                    other => WebError::Internal(anyhow::Error::new(other)),
                }),
        }
    }
}
