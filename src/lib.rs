//! taccuino: content service for a personal site.
//!
//! Serves the blog list and individual articles out of a key-value content
//! store, fronted by an in-process response cache with conditional-request
//! (ETag) semantics, and accepts authenticated publish/webhook mutations.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
