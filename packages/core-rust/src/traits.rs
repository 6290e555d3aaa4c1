use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::WebError;
use crate::ident::{Handle, StatusId};
use crate::types::{Account, FederationDocument, InstanceMetadata, Status, ThreadContext};

/// Source of server-wide instance metadata.
#[async_trait]
pub trait InstanceProvider: Send + Sync {
    /// Fetch the instance metadata.
    ///
    /// Implementations return [`WebError::Internal`] when the backing store
    /// is unreachable.
    async fn get_instance(&self, ctx: &RequestContext) -> Result<InstanceMetadata, WebError>;
}

/// Account lookups scoped to the caller in `ctx`.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// Fetch a local account by canonical username.
    ///
    /// Remote and unknown accounts are both [`WebError::NotFound`].
    async fn get_local_by_username(
        &self,
        ctx: &RequestContext,
        username: &Handle,
    ) -> Result<Account, WebError>;
}

/// Status and thread lookups, filtered by what the caller in `ctx` may see.
#[async_trait]
pub trait StatusProvider: Send + Sync {
    /// Fetch a single status.
    async fn get_status(&self, ctx: &RequestContext, id: &StatusId) -> Result<Status, WebError>;

    /// Fetch the ancestors and descendants of a status.
    async fn get_context(
        &self,
        ctx: &RequestContext,
        id: &StatusId,
    ) -> Result<ThreadContext, WebError>;
}

/// Builds federation-protocol documents.
///
/// Applies its own authorization rules; it does not reuse any status the web
/// layer has already fetched.
#[async_trait]
pub trait FederationProvider: Send + Sync {
    /// Fetch the ActivityStreams representation of a status owned by
    /// `username`.
    async fn get_status_document(
        &self,
        ctx: &RequestContext,
        username: &Handle,
        id: &StatusId,
    ) -> Result<FederationDocument, WebError>;
}
