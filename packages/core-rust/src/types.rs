use serde::{Deserialize, Serialize};

/// Server-wide descriptive metadata shown on every page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceMetadata {
    /// Base URI of the instance, e.g. `https://example.org`.
    pub uri: String,
    /// Domain used in account handles (may differ from the host domain).
    pub account_domain: String,
    pub title: String,
    /// One-line plain-text description used for previews.
    pub short_description: String,
    /// Full description; sanitized HTML.
    pub description: String,
    /// Software version string.
    pub version: String,
    /// Absolute URL of the instance thumbnail image.
    pub thumbnail: String,
    pub contact_email: String,
}

impl InstanceMetadata {
    /// Minimal stand-in used when real metadata cannot be fetched while
    /// rendering an error page.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            uri: String::new(),
            account_domain: String::new(),
            title: "Error".to_string(),
            short_description: String::new(),
            description: String::new(),
            version: String::new(),
            thumbnail: String::new(),
            contact_email: String::new(),
        }
    }
}

/// An account as seen by the web layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    /// Canonical (lowercase) username.
    pub username: String,
    /// `username` for local accounts, `username@domain` for remote ones.
    pub acct: String,
    pub display_name: String,
    /// Web profile URL.
    pub url: String,
    /// Absolute avatar URL.
    pub avatar: String,
    /// Profile bio; sanitized HTML.
    pub note: String,
    /// Whether the account is hosted on this server.
    pub local: bool,
}

impl Account {
    /// Display name, falling back to the username when unset.
    #[must_use]
    pub fn display_name_or_username(&self) -> &str {
        if self.display_name.is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }
}

/// Audience of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
    Direct,
}

/// A single post; the root of a thread page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    /// Uppercase ULID.
    pub id: String,
    /// ActivityPub id.
    pub uri: String,
    /// Web URL.
    pub url: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    pub in_reply_to_id: Option<String>,
    /// BCP 47 language tag, if known.
    pub language: Option<String>,
    /// Sanitized HTML body.
    pub content: String,
    /// Content warning; empty when none.
    pub spoiler_text: String,
    pub sensitive: bool,
    pub visibility: Visibility,
    pub replies_count: u64,
    pub reblogs_count: u64,
    pub favourites_count: u64,
    /// Author.
    pub account: Account,
}

impl Status {
    /// Language tag, or an empty string when unknown.
    #[must_use]
    pub fn language_tag(&self) -> &str {
        self.language.as_deref().unwrap_or_default()
    }
}

/// Conversation surrounding a status, already filtered for the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadContext {
    /// Statuses the root replies to, oldest first.
    pub ancestors: Vec<Status>,
    /// Replies to the root and their replies, in id order.
    pub descendants: Vec<Status>,
}

/// Federation-protocol (ActivityStreams) representation of a status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FederationDocument(pub serde_json::Map<String, serde_json::Value>);

impl FederationDocument {
    /// Serializes the document to its canonical JSON bytes.
    ///
    /// # Errors
    ///
    /// Propagates the `serde_json` error if a value cannot be encoded.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.0)
    }
}
