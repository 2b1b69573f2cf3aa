//! Application services layer.

pub mod error;
pub mod reader;
pub mod secrets;
pub mod store;
pub mod writer;
