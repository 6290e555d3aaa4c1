//! Error taxonomy shared by every stage of the web pipeline and by the
//! collaborator traits.

/// Failure signalled by a pipeline stage or a collaborator.
///
/// Every variant except [`WebError::Internal`] carries a message that is safe
/// to show to the requester. Internal causes are logged, never rendered.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// Malformed path parameters.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Credentials were presented but could not be validated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The caller may not see the requested resource.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Unknown local account, unknown status, or account/status mismatch.
    /// These cases are intentionally indistinguishable to the requester.
    #[error("not found: {0}")]
    NotFound(String),
    /// Storage failure, serialization failure, or cancellation.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Discriminant of [`WebError`], used for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Internal,
}

impl ErrorKind {
    /// HTTP status code for this kind of failure.
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

impl WebError {
    /// Shorthand for an internal error built from a message.
    pub fn internal(msg: impl std::fmt::Display) -> Self {
        Self::Internal(anyhow::anyhow!("{msg}"))
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Message that may be rendered to the requester.
    ///
    /// Not-found errors always yield the same text so that a handle/status
    /// mismatch cannot be told apart from a missing status.
    #[must_use]
    pub fn safe_message(&self) -> &str {
        match self {
            Self::BadRequest(msg) | Self::Unauthorized(msg) | Self::Forbidden(msg) => msg,
            Self::NotFound(_) => "Not Found",
            Self::Internal(_) => "Internal Server Error",
        }
    }
}
