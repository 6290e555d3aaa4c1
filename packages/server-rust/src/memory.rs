//! In-memory collaborators backed by [`DashMap`].
//!
//! Serves every data trait the web layer needs. Used by the demo binary and
//! by tests, which read the per-method call counters to check how many
//! collaborator calls a request made.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use fedithread_core::{
    Account, AccountProvider, FederationDocument, FederationProvider, Handle, InstanceMetadata,
    InstanceProvider, RequestContext, Status, StatusId, StatusProvider, ThreadContext, Visibility,
    WebError,
};
use serde_json::{json, Value};

const AS_PUBLIC: &str = "https://www.w3.org/ns/activitystreams#Public";

/// Snapshot of how often each collaborator method was called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub instance: u64,
    pub accounts: u64,
    pub statuses: u64,
    pub contexts: u64,
    pub documents: u64,
}

#[derive(Default)]
struct Counters {
    instance: AtomicU64,
    accounts: AtomicU64,
    statuses: AtomicU64,
    contexts: AtomicU64,
    documents: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Accounts keyed by username, statuses keyed by uppercase id.
pub struct MemoryStore {
    instance: InstanceMetadata,
    instance_unavailable: AtomicBool,
    accounts: DashMap<String, Account>,
    statuses: DashMap<String, Status>,
    counters: Counters,
}

impl MemoryStore {
    #[must_use]
    pub fn new(instance: InstanceMetadata) -> Self {
        Self {
            instance,
            instance_unavailable: AtomicBool::new(false),
            accounts: DashMap::new(),
            statuses: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Makes `get_instance` fail, simulating an unreachable backing store.
    pub fn set_instance_unavailable(&self, unavailable: bool) {
        self.instance_unavailable.store(unavailable, Ordering::Relaxed);
    }

    pub fn insert_account(&self, account: Account) {
        self.accounts.insert(account.username.clone(), account);
    }

    pub fn insert_status(&self, status: Status) {
        self.statuses.insert(status.id.clone(), status);
    }

    #[must_use]
    pub fn call_counts(&self) -> CallCounts {
        CallCounts {
            instance: self.counters.instance.load(Ordering::Relaxed),
            accounts: self.counters.accounts.load(Ordering::Relaxed),
            statuses: self.counters.statuses.load(Ordering::Relaxed),
            contexts: self.counters.contexts.load(Ordering::Relaxed),
            documents: self.counters.documents.load(Ordering::Relaxed),
        }
    }

    fn lookup(&self, id: &str) -> Option<Status> {
        self.statuses.get(id).map(|s| s.clone())
    }

    /// Fetches a status and applies the caller's visibility.
    fn visible_status(&self, ctx: &RequestContext, id: &StatusId) -> Result<Status, WebError> {
        let status = self
            .lookup(id.as_str())
            .ok_or_else(|| WebError::NotFound(format!("status {id}")))?;
        check_visible(ctx, &status)?;
        Ok(status)
    }

    fn ancestors_of(&self, ctx: &RequestContext, status: &Status) -> Vec<Status> {
        let mut seen = HashSet::from([status.id.clone()]);
        let mut ancestors = Vec::new();
        let mut parent = status.in_reply_to_id.clone();

        while let Some(id) = parent {
            if !seen.insert(id.clone()) {
                break;
            }
            let Some(next) = self.lookup(&id) else { break };
            parent = next.in_reply_to_id.clone();
            if check_visible(ctx, &next).is_ok() {
                ancestors.push(next);
            }
        }

        ancestors.reverse();
        ancestors
    }

    fn descendants_of(&self, ctx: &RequestContext, status: &Status) -> Vec<Status> {
        let mut thread = HashSet::from([status.id.clone()]);
        let mut descendants = Vec::new();

        // Replies may be inserted in any order; repeat until no new reply joins.
        loop {
            let found: Vec<Status> = self
                .statuses
                .iter()
                .filter(|entry| {
                    !thread.contains(entry.key())
                        && entry
                            .in_reply_to_id
                            .as_ref()
                            .is_some_and(|parent| thread.contains(parent))
                })
                .map(|entry| entry.value().clone())
                .collect();
            if found.is_empty() {
                break;
            }
            for reply in found {
                thread.insert(reply.id.clone());
                descendants.push(reply);
            }
        }

        descendants.retain(|s| check_visible(ctx, s).is_ok());
        descendants.sort_by(|a, b| a.id.cmp(&b.id));
        descendants
    }

    fn note(&self, status: &Status) -> FederationDocument {
        let actor = format!("{}/users/{}", self.instance.uri, status.account.username);
        let followers = format!("{actor}/followers");
        let (to, cc) = match status.visibility {
            Visibility::Unlisted => (json!([followers]), json!([AS_PUBLIC])),
            _ => (json!([AS_PUBLIC]), json!([followers])),
        };
        let in_reply_to = status
            .in_reply_to_id
            .as_deref()
            .and_then(|id| self.lookup(id))
            .map_or(Value::Null, |parent| Value::String(parent.uri));
        let summary = if status.spoiler_text.is_empty() {
            Value::Null
        } else {
            Value::String(status.spoiler_text.clone())
        };

        let Value::Object(map) = json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "id": status.uri,
            "type": "Note",
            "attributedTo": actor,
            "url": status.url,
            "published": status.created_at,
            "inReplyTo": in_reply_to,
            "summary": summary,
            "sensitive": status.sensitive,
            "content": status.content,
            "to": to,
            "cc": cc,
        }) else {
            unreachable!("json! object literal")
        };
        FederationDocument(map)
    }
}

/// Public and unlisted statuses are visible to anyone. Private and direct
/// statuses only to their author: absent for anonymous callers, forbidden
/// for everyone else.
fn check_visible(ctx: &RequestContext, status: &Status) -> Result<(), WebError> {
    match status.visibility {
        Visibility::Public | Visibility::Unlisted => Ok(()),
        Visibility::Private | Visibility::Direct => match ctx.caller() {
            Some(caller) if caller.id == status.account.id => Ok(()),
            Some(_) => Err(WebError::Forbidden(
                "you are not allowed to view this status".into(),
            )),
            None => Err(WebError::NotFound(format!("status {}", status.id))),
        },
    }
}

#[async_trait]
impl InstanceProvider for MemoryStore {
    async fn get_instance(&self, _ctx: &RequestContext) -> Result<InstanceMetadata, WebError> {
        bump(&self.counters.instance);
        if self.instance_unavailable.load(Ordering::Relaxed) {
            return Err(WebError::internal("instance metadata unavailable"));
        }
        Ok(self.instance.clone())
    }
}

#[async_trait]
impl AccountProvider for MemoryStore {
    async fn get_local_by_username(
        &self,
        _ctx: &RequestContext,
        username: &Handle,
    ) -> Result<Account, WebError> {
        bump(&self.counters.accounts);
        self.accounts
            .get(username.as_str())
            .filter(|account| account.local)
            .map(|account| account.clone())
            .ok_or_else(|| WebError::NotFound(format!("account @{username}")))
    }
}

#[async_trait]
impl StatusProvider for MemoryStore {
    async fn get_status(&self, ctx: &RequestContext, id: &StatusId) -> Result<Status, WebError> {
        bump(&self.counters.statuses);
        self.visible_status(ctx, id)
    }

    async fn get_context(
        &self,
        ctx: &RequestContext,
        id: &StatusId,
    ) -> Result<ThreadContext, WebError> {
        bump(&self.counters.contexts);
        let status = self.visible_status(ctx, id)?;
        Ok(ThreadContext {
            ancestors: self.ancestors_of(ctx, &status),
            descendants: self.descendants_of(ctx, &status),
        })
    }
}

#[async_trait]
impl FederationProvider for MemoryStore {
    async fn get_status_document(
        &self,
        _ctx: &RequestContext,
        username: &Handle,
        id: &StatusId,
    ) -> Result<FederationDocument, WebError> {
        bump(&self.counters.documents);
        let status = self
            .lookup(id.as_str())
            .filter(|s| s.account.username == username.as_str())
            .filter(|s| matches!(s.visibility, Visibility::Public | Visibility::Unlisted))
            .ok_or_else(|| WebError::NotFound(format!("status {id} of @{username}")))?;
        Ok(self.note(&status))
    }
}

/// Sample data for tests and the demo server.
pub mod fixtures {
    use super::MemoryStore;
    use fedithread_core::{Account, InstanceMetadata, Status, Visibility};

    pub const ROOT_ID: &str = "01H9XKQ3Z8V4N6T2B5C7D9E1FG";
    pub const REPLY_ID: &str = "01H9XKQ3Z8V4N6T2B5C7D9E1FH";
    pub const NESTED_REPLY_ID: &str = "01H9XKQ3Z8V4N6T2B5C7D9E1FJ";
    pub const PRIVATE_ID: &str = "01H9XKQ3Z8V4N6T2B5C7D9E1FK";

    const BASE: &str = "https://example.org";

    #[must_use]
    pub fn instance() -> InstanceMetadata {
        InstanceMetadata {
            uri: BASE.to_string(),
            account_domain: "example.org".to_string(),
            title: "Example Social".to_string(),
            short_description: "A small example instance".to_string(),
            description: "<p>A small example instance.</p>".to_string(),
            version: "0.1.0".to_string(),
            thumbnail: format!("{BASE}/assets/logo.png"),
            contact_email: "admin@example.org".to_string(),
        }
    }

    #[must_use]
    pub fn local_account(username: &str) -> Account {
        Account {
            id: format!("account-{username}"),
            username: username.to_string(),
            acct: username.to_string(),
            display_name: String::new(),
            url: format!("{BASE}/@{username}"),
            avatar: format!("{BASE}/avatars/{username}.png"),
            note: String::new(),
            local: true,
        }
    }

    #[must_use]
    pub fn remote_account(username: &str, domain: &str) -> Account {
        Account {
            acct: format!("{username}@{domain}"),
            url: format!("https://{domain}/@{username}"),
            local: false,
            ..local_account(username)
        }
    }

    /// Public English status by `account`.
    #[must_use]
    pub fn status(id: &str, account: &Account, in_reply_to: Option<&str>, content: &str) -> Status {
        Status {
            id: id.to_string(),
            uri: format!("{BASE}/users/{}/statuses/{id}", account.username),
            url: format!("{BASE}/@{}/statuses/{id}", account.username),
            created_at: "2023-09-08T12:00:00Z".to_string(),
            in_reply_to_id: in_reply_to.map(str::to_string),
            language: Some("en".to_string()),
            content: content.to_string(),
            spoiler_text: String::new(),
            sensitive: false,
            visibility: Visibility::Public,
            replies_count: 0,
            reblogs_count: 0,
            favourites_count: 0,
            account: account.clone(),
        }
    }

    /// Store holding alice (root and private post), bob (reply), carol
    /// (reply to bob), and a remote account.
    #[must_use]
    pub fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new(instance());
        let alice = local_account("alice");
        let bob = local_account("bob");
        let carol = local_account("carol");

        let mut root = status(ROOT_ID, &alice, None, "<p>Hello, fediverse!</p>");
        root.replies_count = 1;
        let mut private = status(PRIVATE_ID, &alice, None, "<p>followers only</p>");
        private.visibility = Visibility::Private;

        store.insert_status(root);
        store.insert_status(status(REPLY_ID, &bob, Some(ROOT_ID), "<p>Hi alice</p>"));
        store.insert_status(status(NESTED_REPLY_ID, &carol, Some(REPLY_ID), "<p>Hi both</p>"));
        store.insert_status(private);

        store.insert_account(alice);
        store.insert_account(bob);
        store.insert_account(carol);
        store.insert_account(remote_account("dave", "remote.example"));
        store
    }
}
