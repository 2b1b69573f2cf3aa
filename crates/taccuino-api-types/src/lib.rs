//! Shared wire types for the taccuino content API.
//!
//! The publish endpoint accepts two payload shapes: a consolidated article
//! list exported by an external CMS (wrapper objects with an `attributes`
//! envelope) and a single compiled article document keyed by `slug`. Both
//! shapes, plus the webhook event envelope, live here so the server and the
//! publish pipeline agree on field names and casing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Display metadata for one article, as stored in the list record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_attribution: Option<Attribution>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
    #[serde(default)]
    pub authors: Vec<Author>,
}

impl Article {
    /// The date shown to readers: publication time when set, creation time
    /// otherwise.
    pub fn display_date(&self) -> OffsetDateTime {
        self.published_at.unwrap_or(self.created_at)
    }
}

/// Credit line for an article's cover image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribution {
    pub platform: String,
    pub platform_url: String,
    pub author: String,
    pub author_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub url: String,
    pub avatar: String,
}

/// Structured metadata extracted from a markdown document header.
///
/// Every field is optional; unknown keys round-trip through `extra` so a
/// stored document is replaced wholesale rather than trimmed to the fields
/// this crate happens to know about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frontmatter {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_attribution: Option<Attribution>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// A compiled article as stored under `article/<slug>`.
///
/// `code` is the compiled body (highlighted HTML the client renders), `html`
/// the server-side static snapshot, `hash` the content fingerprint used as
/// the cache-validation token. All three are optional on the wire: a record
/// published without a hash is simply served without an ETag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDocument {
    pub slug: String,
    #[serde(default)]
    pub frontmatter: Frontmatter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// CMS export wrapper: a bare `attributes` envelope around each record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry<T> {
    pub attributes: T,
}

/// The consolidated article list as exported by the CMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleCollection {
    pub data: Vec<Entry<ArticleAttributes>>,
}

impl ArticleCollection {
    /// Normalize the wrapped records into plain article summaries,
    /// preserving order.
    pub fn into_articles(self) -> Vec<Article> {
        self.data
            .into_iter()
            .map(|entry| entry.attributes.into_article())
            .collect()
    }
}

/// Raw article fields inside a CMS wrapper, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleAttributes {
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_attribution: Option<Attribution>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
    #[serde(default)]
    pub authors: AuthorCollection,
}

impl ArticleAttributes {
    pub fn into_article(self) -> Article {
        let authors = self
            .authors
            .data
            .into_iter()
            .map(|entry| entry.attributes)
            .collect();

        Article {
            slug: self.slug,
            title: self.title,
            summary: self.summary,
            image: self.image,
            image_attribution: self.image_attribution,
            created_at: self.created_at,
            updated_at: self.updated_at,
            published_at: self.published_at,
            read_time: self.read_time,
            authors,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorCollection {
    #[serde(default)]
    pub data: Vec<Entry<Author>>,
}

/// Payload accepted by the publish endpoint.
///
/// Classification mirrors the wire contract: a `data` array replaces the
/// list record, a top-level `slug` replaces one article document, anything
/// else is a bad request.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UpsertPayload {
    List(ArticleCollection),
    Document(ArticleDocument),
}

/// Event vocabulary emitted by the CMS webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookEvent {
    #[serde(rename = "entry.create")]
    EntryCreate,
    #[serde(rename = "entry.update")]
    EntryUpdate,
    #[serde(rename = "entry.delete")]
    EntryDelete,
    #[serde(rename = "entry.publish")]
    EntryPublish,
    #[serde(rename = "entry.unpublish")]
    EntryUnpublish,
    #[serde(other)]
    Other,
}

impl WebhookEvent {
    /// Only deletions and unpublications mutate the store; the publish
    /// pipeline is the sole writer for everything else.
    pub fn removes_content(self) -> bool {
        matches!(self, Self::EntryDelete | Self::EntryUnpublish)
    }
}

/// Envelope delivered by the CMS webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub event: WebhookEvent,
    pub model: String,
    #[serde(default)]
    pub entry: WebhookEntry,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
