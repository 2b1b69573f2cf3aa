#![deny(clippy::all, clippy::pedantic)]

use std::fs;

use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;
use tempfile::TempDir;

const ARTICLE: &str = "---\ntitle: Hello World\nsummary: First post\n---\n\n# Hello\n\nBody text.\n";

const LIST: &str = r#"{"data":[{"attributes":{"slug":"hello-world","title":"Hello World","summary":"First post","image":"","createdAt":"2022-01-01T00:00:00Z","updatedAt":"2022-01-02T00:00:00Z"}}]}"#;

fn content_dir() -> TempDir {
    let dir = TempDir::new().expect("tmp dir");
    fs::write(dir.path().join("hello-world.md"), ARTICLE).expect("write article");
    fs::write(dir.path().join("articles.json"), LIST).expect("write list");
    fs::write(dir.path().join("notes.txt"), "ignored").expect("write stray file");
    dir
}

#[test]
fn publishes_every_article_and_the_list() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/api/blog")
            .header("authorization", "Bearer cli-test-key");
        then.status(204);
    });

    let dir = content_dir();
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("taccuino-cli"));
    let assert = cmd
        .env("TACCUINO_PUBLISH_URL", server.base_url())
        .env("TACCUINO_PUBLISH_KEY", "cli-test-key")
        .arg(dir.path())
        .assert()
        .success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("published hello-world"));
    assert!(output.contains("published article list"));

    // One document plus the list export.
    mock.assert_hits(2);
}

#[test]
fn server_failures_do_not_stop_the_run() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST").path("/api/blog");
        then.status(500).body(r#"{"message":"store unavailable"}"#);
    });

    let dir = content_dir();
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("taccuino-cli"));
    cmd.env("TACCUINO_PUBLISH_URL", server.base_url())
        .env("TACCUINO_PUBLISH_KEY", "cli-test-key")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(contains("store unavailable"))
        .stderr(contains("2 of 2 uploads failed"));

    // Both uploads were attempted despite the first failure.
    mock.assert_hits(2);
}

#[test]
fn broken_article_is_reported_but_the_rest_still_upload() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST").path("/api/blog");
        then.status(204);
    });

    let dir = content_dir();
    fs::write(dir.path().join("broken.md"), "# no frontmatter\n").expect("write article");

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("taccuino-cli"));
    cmd.env("TACCUINO_PUBLISH_URL", server.base_url())
        .env("TACCUINO_PUBLISH_KEY", "cli-test-key")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(contains("frontmatter"));

    // The healthy article and the list export still went out.
    mock.assert_hits(2);
}

#[test]
fn missing_key_fails_fast() {
    let dir = content_dir();
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("taccuino-cli"));
    cmd.env_remove("TACCUINO_PUBLISH_URL")
        .env_remove("TACCUINO_PUBLISH_KEY")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(contains("--api-key"));
}
