//! Store key scheme.
//!
//! The content store is flat: one well-known key for the denormalized list
//! record and one `article/<slug>` key per compiled document. Slugs are
//! opaque path remainders; a slug containing `/` is used verbatim and never
//! parsed further.

/// Key holding the denormalized article list.
pub const LIST_KEY: &str = "articles";

const ARTICLE_PREFIX: &str = "article/";

/// Key holding one compiled article document.
pub fn article_key(slug: &str) -> String {
    format!("{ARTICLE_PREFIX}{slug}")
}
