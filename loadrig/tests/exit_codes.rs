use std::process::{Command, Output};

use anyhow::Context as _;
use loadrig_testserver::{TestServer, TestServerConfig};

fn status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn ensure_exit(out: &Output, expected: i32) -> anyhow::Result<()> {
    anyhow::ensure!(
        status_code(out.status) == expected,
        "expected exit code {expected}, got {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}

async fn run_loadrig(args: Vec<String>) -> anyhow::Result<Output> {
    let exe = env!("CARGO_BIN_EXE_loadrig");

    tokio::task::spawn_blocking(move || Command::new(exe).args(&args).output())
        .await
        .context("spawn_blocking join")?
        .context("run loadrig binary")
}

fn args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

#[test]
fn invalid_flags_exit_30() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_loadrig");

    let out = Command::new(exe)
        .arg("run")
        .arg("--workflow")
        .arg("auth")
        .arg("--duration")
        .arg("10x")
        .output()
        .context("run loadrig binary")?;

    ensure_exit(&out, 30)
}

#[test]
fn help_exits_0() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_loadrig");

    let out = Command::new(exe)
        .arg("--help")
        .output()
        .context("run loadrig binary")?;

    ensure_exit(&out, 0)
}

#[tokio::test]
async fn invalid_run_file_exit_30() -> anyhow::Result<()> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("run.yaml");
    std::fs::write(&path, "thresholds:\n  login_success: rate>>0.5\n")
        .context("write run file")?;

    let path = path.display().to_string();

    let out = run_loadrig(args(&["run", "--workflow", "auth", "--config", &path])).await?;

    ensure_exit(&out, 30)
}

#[tokio::test]
async fn zero_vus_exit_30() -> anyhow::Result<()> {
    let out = run_loadrig(args(&["run", "--workflow", "auth", "--vus", "0"])).await?;
    ensure_exit(&out, 30)
}

#[tokio::test]
async fn setup_failure_exit_20() -> anyhow::Result<()> {
    // Every request answers UNAVAILABLE, so registering the fixture users fails.
    let server = TestServer::start_with(TestServerConfig {
        fail_every: Some(1),
        ..TestServerConfig::default()
    })
    .await
    .context("start test server")?;
    let base_url = server.base_url().to_string();

    let out = run_loadrig(args(&[
        "run",
        "--workflow",
        "messaging",
        "--target",
        &base_url,
        "--vus",
        "2",
        "--duration",
        "1s",
        "--output",
        "json",
    ]))
    .await?;

    let requests = server.stats().requests_total();
    server.shutdown().await;

    ensure_exit(&out, 20)?;
    // Only the first setup step was attempted; no virtual user ran.
    anyhow::ensure!(requests == 1, "expected 1 request, got {requests}");
    let stderr = String::from_utf8_lossy(&out.stderr);
    anyhow::ensure!(
        stderr.contains("setup failed at step `register_sender`"),
        "unexpected stderr:\n{stderr}"
    );

    Ok(())
}

#[tokio::test]
async fn thresholds_failed_exit_11() -> anyhow::Result<()> {
    // Register is request 1 and succeeds; Login is request 2 and fails.
    let server = TestServer::start_with(TestServerConfig {
        fail_every: Some(2),
        ..TestServerConfig::default()
    })
    .await
    .context("start test server")?;
    let base_url = server.base_url().to_string();

    let out = run_loadrig(args(&[
        "run",
        "--workflow",
        "auth",
        "--target",
        &base_url,
        "--vus",
        "1",
        "--duration",
        "1s",
        "--output",
        "json",
    ]))
    .await?;

    server.shutdown().await;

    ensure_exit(&out, 11)
}

#[tokio::test]
async fn passing_run_exit_0() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let base_url = server.base_url().to_string();

    let out = run_loadrig(args(&[
        "run",
        "--workflow",
        "auth",
        "--target",
        &base_url,
        "--vus",
        "1",
        "--duration",
        "1s",
    ]))
    .await?;

    server.shutdown().await;

    ensure_exit(&out, 0)?;
    let stdout = String::from_utf8_lossy(&out.stdout);
    anyhow::ensure!(
        stdout.contains("summary: auth"),
        "unexpected stdout:\n{stdout}"
    );

    Ok(())
}
