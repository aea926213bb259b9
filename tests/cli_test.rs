// End-to-end tests running the easyfill binary
use anyhow::Result;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

mod common;
use common::{MockBackend, fixtures, write_fixture};

struct Output {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

/// Run easyfill with an isolated store
fn run_command(store_dir: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_easyfill"))
        .args(args)
        .env("EASYFILL_STORE", store_dir.join("storage.json"))
        .env_remove("EASYFILL_BACKEND_URL")
        .env_remove("RUST_LOG")
        .output()?;

    Ok(Output {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

fn run_json(store_dir: &Path, args: &[&str]) -> Result<(Value, i32)> {
    let output = run_command(store_dir, args)?;
    let json = serde_json::from_str(&output.stdout)?;
    Ok((json, output.exit_code))
}

#[test]
fn test_parse_prints_messages_and_summary() -> Result<()> {
    let dir = TempDir::new()?;
    let response = write_fixture(dir.path(), "response.txt", fixtures::RESPONSE);

    let output = run_command(
        dir.path(),
        &["parse", response.to_str().unwrap(), "--chunk-size", "3"],
    )?;
    assert_eq!(output.exit_code, 0);

    let messages: Vec<Value> = output
        .stdout
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["action"], "performAutofill");
    assert_eq!(messages[0]["data"]["selector"]["id"], "email");
    // Escapes stay literal until a value is written
    assert_eq!(messages[2]["data"]["value"], r"Hello,\n\nI build engines.");

    let summary_line = output
        .stderr
        .lines()
        .find(|l| l.starts_with('{'))
        .expect("summary on stderr");
    let summary: Value = serde_json::from_str(summary_line)?;
    assert_eq!(summary["emitted"], 4);
    assert_eq!(summary["malformed"], 1);
    Ok(())
}

#[test]
fn test_fields_from_html() -> Result<()> {
    let dir = TempDir::new()?;
    let page = write_fixture(dir.path(), "page.html", fixtures::APPLICATION_PAGE);

    let (fields, code) = run_json(dir.path(), &["fields", "--html", page.to_str().unwrap()])?;
    assert_eq!(code, 0);

    let ids: Vec<&str> = fields
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["email", "given", "cover", "country"]);
    assert_eq!(fields[1]["label"], "First name");
    Ok(())
}

#[test]
fn test_fill_with_replay_updates_snapshot_and_history() -> Result<()> {
    let dir = TempDir::new()?;
    let page = write_fixture(dir.path(), "page.html", fixtures::APPLICATION_PAGE);
    let response = write_fixture(dir.path(), "response.txt", fixtures::RESPONSE);

    let (result, code) = run_json(
        dir.path(),
        &[
            "fill",
            "--html",
            page.to_str().unwrap(),
            "--replay",
            response.to_str().unwrap(),
            "--chunk-size",
            "1",
        ],
    )?;
    assert_eq!(code, 0);
    assert_eq!(result["report"]["status"], "success");
    assert_eq!(result["report"]["filled"].as_array().unwrap().len(), 4);
    assert_eq!(result["report"]["malformed"], 1);
    assert_eq!(result["fields"][3]["value"], "de");

    let (config, _) = run_json(dir.path(), &["config", "show"])?;
    assert_eq!(config["state"]["actions"].as_array().unwrap().len(), 4);
    Ok(())
}

#[test]
fn test_fill_without_user_is_not_authenticated() -> Result<()> {
    let dir = TempDir::new()?;
    let page = write_fixture(dir.path(), "page.html", fixtures::APPLICATION_PAGE);

    let (result, code) = run_json(dir.path(), &["fill", "--html", page.to_str().unwrap()])?;
    assert_eq!(code, 5);
    assert_eq!(result["error"], true);
    assert_eq!(result["exit_code"], 5);
    Ok(())
}

#[test]
fn test_config_commands() -> Result<()> {
    let dir = TempDir::new()?;

    let (theme, code) = run_json(dir.path(), &["config", "toggle-theme"])?;
    assert_eq!(code, 0);
    assert_eq!(theme["theme"], "light");

    let (_, code) = run_json(dir.path(), &["config", "set-user", "user-1"])?;
    assert_eq!(code, 0);

    let (config, _) = run_json(dir.path(), &["config", "show"])?;
    assert_eq!(config["state"]["theme"], "light");
    assert_eq!(config["state"]["user_id"], "user-1");

    let (cleared, _) = run_json(dir.path(), &["config", "clear-history"])?;
    assert_eq!(cleared["cleared"], 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fill_against_backend() -> Result<()> {
    let backend = MockBackend::start(fixtures::RESPONSE, 11).await;
    let dir = TempDir::new()?;
    let page = write_fixture(dir.path(), "page.html", fixtures::APPLICATION_PAGE);

    let store_dir = dir.path().to_path_buf();
    let url = backend.url.clone();
    let (result, code) = tokio::task::spawn_blocking(move || {
        run_json(
            &store_dir,
            &[
                "fill",
                "--html",
                page.to_str().unwrap(),
                "--user-id",
                "user-1",
                "--backend-url",
                &url,
            ],
        )
    })
    .await??;

    assert_eq!(code, 0);
    assert_eq!(result["report"]["filled"].as_array().unwrap().len(), 4);
    assert_eq!(result["fields"][0]["value"], "ada@example.com");

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["user_id"], "user-1");
    assert_eq!(requests[0]["fields"].as_array().unwrap().len(), 4);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_documents_are_fetched_and_selected() -> Result<()> {
    let backend = MockBackend::start("", 8).await;
    let dir = TempDir::new()?;

    let store_dir = dir.path().to_path_buf();
    let url = backend.url.clone();
    let (result, code) = tokio::task::spawn_blocking(move || {
        run_json(
            &store_dir,
            &[
                "documents",
                "--user-id",
                "user-1",
                "--select",
                "d2",
                "--format",
                "json",
                "--backend-url",
                &url,
            ],
        )
    })
    .await??;

    assert_eq!(code, 0);
    assert_eq!(result["documents"].as_array().unwrap().len(), 2);
    assert_eq!(result["selected"][0], "d2");
    Ok(())
}
