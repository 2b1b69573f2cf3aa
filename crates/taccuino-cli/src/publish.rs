#![deny(clippy::all, clippy::pedantic)]

//! Upload loop: compile every markdown source in the content directory,
//! post each compiled document, then post the consolidated list export.

use std::path::{Path, PathBuf};

use reqwest::{Client, Url, header};
use thiserror::Error;
use tokio::fs;

use crate::args::Cli;
use crate::compile::{CompileError, Compiler};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server error: {0}")]
    Server(String),
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to compile {path}: {source}")]
    Compile { path: String, source: CompileError },
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{failed} of {total} uploads failed")]
    Incomplete { failed: usize, total: usize },
}

pub struct Ctx {
    client: Client,
    base: Url,
    key: String,
}

impl Ctx {
    pub fn new(endpoint: &str, key: String) -> Result<Self, CliError> {
        let base = Url::parse(endpoint)?.join("/")?;
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self { client, base, key })
    }

    pub fn user_agent() -> &'static str {
        concat!("taccuino-cli/", env!("CARGO_PKG_VERSION"))
    }

    fn auth_header(&self) -> Result<header::HeaderValue, CliError> {
        header::HeaderValue::from_str(&format!("Bearer {}", self.key))
            .map_err(|e| CliError::InvalidInput(e.to_string()))
    }

    /// POST a JSON body to the publish endpoint.
    pub async fn publish(&self, body: &serde_json::Value) -> Result<(), CliError> {
        let url = self.base.join("api/blog")?;
        let resp = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, self.auth_header()?)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CliError::Server(format!("status {status} body {text}")));
        }
        Ok(())
    }
}

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    let ctx = Ctx::new(&cli.endpoint, cli.api_key.clone())?;
    let compiler = Compiler::new();

    let sources = article_sources(&cli.content_dir).await?;
    let mut total = 0usize;
    let mut failed = 0usize;

    for path in &sources {
        total += 1;
        match publish_article(&ctx, &compiler, path).await {
            Ok(slug) => println!("published {slug}"),
            Err(err) => {
                failed += 1;
                eprintln!("{}: {err}", path.display());
            }
        }
    }

    let list_path = cli.content_dir.join("articles.json");
    if fs::try_exists(&list_path).await.unwrap_or(false) {
        total += 1;
        match publish_list(&ctx, &list_path).await {
            Ok(()) => println!("published article list"),
            Err(err) => {
                failed += 1;
                eprintln!("{}: {err}", list_path.display());
            }
        }
    }

    if failed > 0 {
        return Err(CliError::Incomplete { failed, total });
    }
    Ok(())
}

/// Every `*.md` file directly under the content directory, sorted so
/// repeated runs upload in a stable order.
async fn article_sources(dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    let mut entries = fs::read_dir(dir).await.map_err(|source| CliError::InputFile {
        path: dir.display().to_string(),
        source,
    })?;

    let mut sources = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|source| CliError::InputFile {
            path: dir.display().to_string(),
            source,
        })?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "md") {
            sources.push(path);
        }
    }

    sources.sort();
    Ok(sources)
}

async fn publish_article(ctx: &Ctx, compiler: &Compiler, path: &Path) -> Result<String, CliError> {
    let slug = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| CliError::InvalidInput(format!("unusable file name: {}", path.display())))?
        .to_string();

    let source = fs::read_to_string(path)
        .await
        .map_err(|source| CliError::InputFile {
            path: path.display().to_string(),
            source,
        })?;

    let document = compiler
        .compile(&slug, &source)
        .map_err(|source| CliError::Compile {
            path: path.display().to_string(),
            source,
        })?;

    ctx.publish(&serde_json::to_value(&document)?).await?;
    Ok(slug)
}

async fn publish_list(ctx: &Ctx, path: &Path) -> Result<(), CliError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|source| CliError::InputFile {
            path: path.display().to_string(),
            source,
        })?;
    let body: serde_json::Value = serde_json::from_str(&raw)?;
    ctx.publish(&body).await
}
