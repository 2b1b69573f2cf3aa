//! taccuino-cli: markdown publish pipeline for a taccuino server.
//!
//! Compiles every article source in a content directory (frontmatter plus
//! highlighted HTML plus content hash), posts each compiled document to the
//! publish endpoint, and posts the consolidated list export once. Failures
//! are collected rather than short-circuiting, so one broken article never
//! hides the state of the rest.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod compile;
mod publish;

use std::process::ExitCode;

use clap::Parser;

use args::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match publish::run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
