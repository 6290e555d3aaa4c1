//! OpenGraph metadata for link previews.

use std::sync::LazyLock;

use fedithread_core::{InstanceMetadata, Status};
use regex::Regex;

/// Maximum length of an `og:description`, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 160;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));
static SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Values rendered into `og:*` and `article:*` meta tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OgMeta {
    pub title: String,
    /// `og:type`.
    pub kind: &'static str,
    pub locale: String,
    pub url: String,
    pub site_name: String,
    pub description: String,
    pub image: String,
    pub image_alt: String,
    /// Empty outside of article pages.
    pub article_published_time: String,
    /// Empty outside of article pages.
    pub article_author: String,
}

impl OgMeta {
    /// Instance-level defaults shared by every page.
    #[must_use]
    pub fn base(instance: &InstanceMetadata) -> Self {
        Self {
            title: instance.title.clone(),
            kind: "website",
            locale: "en".to_string(),
            url: instance.uri.clone(),
            site_name: instance.account_domain.clone(),
            description: summarize(&instance.short_description),
            image: instance.thumbnail.clone(),
            image_alt: format!("Thumbnail for {}", instance.title),
            article_published_time: String::new(),
            article_author: String::new(),
        }
    }

    /// Specializes the defaults for a single status.
    #[must_use]
    pub fn with_status(mut self, status: &Status) -> Self {
        let author = &status.account;
        self.title = format!(
            "Post by {} (@{}@{})",
            author.display_name_or_username(),
            author.username,
            self.site_name
        );
        self.kind = "article";
        if let Some(language) = status.language.as_deref().filter(|l| !l.is_empty()) {
            self.locale = language.to_string();
        }
        self.url = status.url.clone();
        self.description = if status.spoiler_text.is_empty() {
            summarize(&status.content)
        } else {
            summarize(&format!("CW: {}", status.spoiler_text))
        };
        if !author.avatar.is_empty() {
            self.image = author.avatar.clone();
            self.image_alt = format!("Avatar for {}", author.username);
        }
        self.article_published_time.clone_from(&status.created_at);
        self.article_author.clone_from(&author.url);
        self
    }
}

/// Strips markup, collapses whitespace, and truncates for a preview line.
fn summarize(html: &str) -> String {
    let text = TAG_RE.replace_all(html, " ");
    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    let text = SPACE_RE.replace_all(text.trim(), " ");

    if text.chars().count() <= MAX_DESCRIPTION_CHARS {
        return text.into_owned();
    }
    let mut truncated: String = text.chars().take(MAX_DESCRIPTION_CHARS - 1).collect();
    truncated.push('…');
    truncated
}
