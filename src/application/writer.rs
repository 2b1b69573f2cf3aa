//! Content Writer: authenticated mutations against the content store.
//!
//! The publish pipeline is the sole writer of new and changed content; the
//! CMS webhook only propagates deletions and unpublications promptly.
//! Create/update/publish notifications are acknowledged and ignored on
//! purpose, since they do not carry a compiled body.

use std::sync::Arc;

use taccuino_api_types::{Article, UpsertPayload, WebhookPayload};
use tracing::{info, warn};

use crate::{
    application::{
        error::AppError,
        store::{self, ContentStore},
    },
    domain::keys,
};

const SOURCE: &str = "application::writer";

#[derive(Clone)]
pub struct ContentWriter {
    store: Arc<dyn ContentStore>,
}

impl ContentWriter {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Replace the list record or one article document, wholesale.
    pub async fn upsert(&self, payload: UpsertPayload) -> Result<(), AppError> {
        match payload {
            UpsertPayload::List(collection) => {
                let articles = collection.into_articles();
                store::put_json(self.store.as_ref(), keys::LIST_KEY, &articles).await?;
                info!(target = SOURCE, count = articles.len(), "replaced article list");
            }
            UpsertPayload::Document(document) => {
                let key = keys::article_key(&document.slug);
                store::put_json(self.store.as_ref(), &key, &document).await?;
                info!(target = SOURCE, slug = %document.slug, "replaced article document");
            }
        }
        Ok(())
    }

    /// Apply a CMS webhook event.
    ///
    /// Events for other models and non-removal events are acknowledged
    /// without touching the store. The list read-modify-write is not
    /// transactional: last writer wins, accepted under the single trusted
    /// publisher.
    pub async fn handle_event(&self, payload: WebhookPayload) -> Result<(), AppError> {
        if payload.model != "article" {
            return Ok(());
        }
        if !payload.event.removes_content() {
            return Ok(());
        }

        let Some(slug) = payload.entry.slug else {
            warn!(
                target = SOURCE,
                event = ?payload.event,
                "removal event without a slug, ignoring"
            );
            return Ok(());
        };

        self.store.delete(&keys::article_key(&slug)).await?;

        let Some(mut articles) =
            store::get_json::<Vec<Article>>(self.store.as_ref(), keys::LIST_KEY).await?
        else {
            return Ok(());
        };
        articles.retain(|article| article.slug != slug);
        store::put_json(self.store.as_ref(), keys::LIST_KEY, &articles).await?;

        info!(target = SOURCE, slug = %slug, "removed article");
        Ok(())
    }
}
