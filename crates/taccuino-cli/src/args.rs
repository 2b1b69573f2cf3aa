#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::Parser;

/// Compile markdown articles and publish them to a taccuino server.
#[derive(Debug, Parser)]
#[command(name = "taccuino-cli", version)]
pub struct Cli {
    /// Directory holding article sources (`*.md`) and the consolidated
    /// list export (`articles.json`).
    #[arg(value_name = "CONTENT_DIR")]
    pub content_dir: PathBuf,

    /// Base URL of the target server.
    #[arg(
        long,
        env = "TACCUINO_PUBLISH_URL",
        default_value = "http://127.0.0.1:8788"
    )]
    pub endpoint: String,

    /// Bearer secret for the publish endpoint.
    #[arg(long = "api-key", env = "TACCUINO_PUBLISH_KEY", value_name = "SECRET")]
    pub api_key: String,
}
