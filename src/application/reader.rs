//! Content Reader: the public read path over the content store.

use std::sync::Arc;

use serde::Serialize;
use taccuino_api_types::{Article, ArticleDocument, Frontmatter};

use crate::{
    application::{
        error::AppError,
        store::{self, ContentStore},
    },
    domain::{error::DomainError, keys},
};

/// Payload returned for a full article read.
///
/// The static `html` snapshot is intentionally excluded: clients render the
/// compiled body themselves, the snapshot exists for no-script contexts fed
/// elsewhere.
#[derive(Debug, Serialize)]
pub struct ArticleBody {
    pub slug: String,
    pub frontmatter: Frontmatter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Outcome of a conditional article read.
#[derive(Debug)]
pub enum ArticleRead {
    /// The presented validation token matches the stored hash.
    NotModified,
    /// Full payload plus the validation token to emit, when the record
    /// carries one.
    Fresh {
        body: ArticleBody,
        hash: Option<String>,
    },
}

#[derive(Clone)]
pub struct ContentReader {
    store: Arc<dyn ContentStore>,
}

impl ContentReader {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Read the denormalized article list. An absent list record is an
    /// empty list, not an error.
    pub async fn list(&self) -> Result<Vec<Article>, AppError> {
        let articles = store::get_json(self.store.as_ref(), keys::LIST_KEY)
            .await?
            .unwrap_or_default();
        Ok(articles)
    }

    /// Read one article, applying conditional-request semantics.
    ///
    /// A record without a stored hash never reports `NotModified`; every
    /// read of it is a full read and no validation token is emitted.
    pub async fn article(
        &self,
        slug: &str,
        validation_token: Option<&str>,
    ) -> Result<ArticleRead, AppError> {
        let key = keys::article_key(slug);
        let document: ArticleDocument = store::get_json(self.store.as_ref(), &key)
            .await?
            .ok_or_else(|| DomainError::not_found("article"))?;

        if let (Some(hash), Some(token)) = (document.hash.as_deref(), validation_token)
            && hash == token
        {
            return Ok(ArticleRead::NotModified);
        }

        Ok(ArticleRead::Fresh {
            body: ArticleBody {
                slug: slug.to_string(),
                frontmatter: document.frontmatter,
                code: document.code,
            },
            hash: document.hash,
        })
    }
}
