//! Parsing and canonicalization of the thread path parameters.
//!
//! Storage lookups are case-sensitive, so every handle and status id is
//! brought into one canonical form before it reaches a collaborator:
//!
//! - usernames on this server are always lowercase;
//! - status ids are ULIDs, stored in their uppercase Crockford form.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::WebError;

/// Maximum length of a local username.
pub const MAX_USERNAME_LEN: usize = 64;

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^[A-Za-z0-9_]{{1,{MAX_USERNAME_LEN}}}$"))
        .expect("username pattern is valid")
});

/// Canonical (lowercase) username of a local account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    /// Validates a bare username and lowercases it.
    ///
    /// # Errors
    ///
    /// Returns [`WebError::BadRequest`] if the value is empty, too long, or
    /// contains characters outside `[A-Za-z0-9_]`.
    pub fn parse(raw: &str) -> Result<Self, WebError> {
        if raw.is_empty() {
            return Err(WebError::BadRequest("no username specified".to_string()));
        }
        if !USERNAME_RE.is_match(raw) {
            return Err(WebError::BadRequest(format!(
                "username must be 1-{MAX_USERNAME_LEN} letters, digits or underscores"
            )));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    /// Parses the `@user` path segment of a profile route.
    ///
    /// A segment without the leading `@` does not address a profile at all,
    /// so it is reported as not found rather than malformed.
    ///
    /// # Errors
    ///
    /// [`WebError::NotFound`] without the `@` prefix, otherwise whatever
    /// [`Handle::parse`] returns.
    pub fn from_path_segment(segment: &str) -> Result<Self, WebError> {
        let raw = segment
            .strip_prefix('@')
            .ok_or_else(|| WebError::NotFound(format!("{segment} is not a profile path")))?;
        Self::parse(raw)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical (uppercase ULID) identifier of a status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusId(String);

impl StatusId {
    /// Validates a ULID in any letter case and returns its uppercase form.
    ///
    /// # Errors
    ///
    /// Returns [`WebError::BadRequest`] if the value is empty or not a ULID.
    pub fn parse(raw: &str) -> Result<Self, WebError> {
        if raw.is_empty() {
            return Err(WebError::BadRequest("no status id specified".to_string()));
        }
        let ulid = Ulid::from_string(&raw.to_ascii_uppercase())
            .map_err(|e| WebError::BadRequest(format!("invalid status id {raw}: {e}")))?;
        Ok(Self(ulid.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized `{handle, status id}` pair addressed by a thread request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReference {
    pub handle: Handle,
    pub status_id: StatusId,
}

impl TargetReference {
    /// Builds a target from the raw `@user` and status id path segments.
    ///
    /// # Errors
    ///
    /// See [`Handle::from_path_segment`] and [`StatusId::parse`].
    pub fn from_path(handle_segment: &str, status_id: &str) -> Result<Self, WebError> {
        Ok(Self {
            handle: Handle::from_path_segment(handle_segment)?,
            status_id: StatusId::parse(status_id)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    const ID: &str = "01H9XKQ3Z8V4N6T2B5C7D9E1FG";

    #[test]
    fn handle_is_lowercased() {
        assert_eq!(Handle::parse("Alice").unwrap().as_str(), "alice");
        assert_eq!(Handle::parse("ALICE_99").unwrap().as_str(), "alice_99");
    }

    #[test]
    fn handle_rejects_bad_syntax() {
        for raw in ["", "al ice", "alice!", "ali.ce", "a".repeat(65).as_str()] {
            let err = Handle::parse(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadRequest, "input {raw:?}");
        }
    }

    #[test]
    fn handle_length_limit_is_inclusive() {
        assert!(Handle::parse(&"a".repeat(MAX_USERNAME_LEN)).is_ok());
        assert!(Handle::parse(&"a".repeat(MAX_USERNAME_LEN + 1)).is_err());
    }

    #[test]
    fn path_segment_requires_at_prefix() {
        assert_eq!(Handle::from_path_segment("@Bob").unwrap().as_str(), "bob");
        let err = Handle::from_path_segment("bob").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = Handle::from_path_segment("@").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn status_id_is_uppercased() {
        let id = StatusId::parse(&ID.to_ascii_lowercase()).unwrap();
        assert_eq!(id.as_str(), ID);
    }

    #[test]
    fn status_id_rejects_non_ulids() {
        for raw in ["", "123", "not-a-ulid-at-all-xxxxxxxxx", "81H9XKQ3Z8V4N6T2B5C7D9E1FG"] {
            let err = StatusId::parse(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadRequest, "input {raw:?}");
        }
    }

    #[test]
    fn target_from_path() {
        let target = TargetReference::from_path("@Alice", "01h9xkq3z8v4n6t2b5c7d9e1fg").unwrap();
        assert_eq!(target.handle.as_str(), "alice");
        assert_eq!(target.status_id.as_str(), ID);
    }

    proptest! {
        #[test]
        fn handle_normalization_is_idempotent(raw in "[A-Za-z0-9_]{1,64}") {
            let once = Handle::parse(&raw).unwrap();
            let twice = Handle::parse(once.as_str()).unwrap();
            prop_assert_eq!(&once, &twice);
        }

        #[test]
        fn handle_case_variants_converge(raw in "[a-z0-9_]{1,64}") {
            let lower = Handle::parse(&raw).unwrap();
            let upper = Handle::parse(&raw.to_ascii_uppercase()).unwrap();
            prop_assert_eq!(lower, upper);
        }

        #[test]
        fn status_id_normalization_is_idempotent(millis in 0u64..(1u64 << 47), random in any::<u64>()) {
            let raw = Ulid::from_parts(millis, u128::from(random)).to_string().to_ascii_lowercase();
            let once = StatusId::parse(&raw).unwrap();
            let twice = StatusId::parse(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
