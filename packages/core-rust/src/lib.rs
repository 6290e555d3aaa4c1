//! Domain types, path normalization, web errors, and the collaborator
//! contracts consumed by the thread endpoint.

pub mod context;
pub mod error;
pub mod ident;
pub mod traits;
pub mod types;

pub use context::RequestContext;
pub use error::{ErrorKind, WebError};
pub use ident::{Handle, StatusId, TargetReference};
pub use traits::{AccountProvider, FederationProvider, InstanceProvider, StatusProvider};
pub use types::{
    Account, FederationDocument, InstanceMetadata, Status, ThreadContext, Visibility,
};
