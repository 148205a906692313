use std::collections::BTreeMap;
use std::process::{Command, Output};

use anyhow::Context as _;
use loadrig_testserver::TestServer;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Metric {
    Counter {
        count: f64,
    },
    Rate {
        rate: Option<f64>,
        passes: u64,
        fails: u64,
    },
    Trend {
        count: u64,
        avg: Option<f64>,
    },
}

#[derive(Debug, Deserialize)]
struct Threshold {
    metric: String,
    expression: String,
    passed: bool,
}

#[derive(Debug, Deserialize)]
struct SummaryLine {
    workflow: String,
    vus: u64,
    iterations_total: u64,
    passed: bool,
    complete: bool,
    metrics: BTreeMap<String, Metric>,
    thresholds: Vec<Threshold>,
}

#[derive(Debug, Deserialize)]
struct ProgressLine {
    tick: u64,
    vus: u64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
enum JsonLine {
    #[serde(rename = "progress")]
    Progress(ProgressLine),

    #[serde(rename = "summary")]
    Summary(SummaryLine),
}

async fn run_loadrig(args: Vec<String>) -> anyhow::Result<Output> {
    let exe = env!("CARGO_BIN_EXE_loadrig");

    let out = tokio::task::spawn_blocking(move || Command::new(exe).args(&args).output())
        .await
        .context("spawn_blocking join")?
        .context("run loadrig binary")?;

    anyhow::ensure!(
        out.status.success() || out.status.code() == Some(11),
        "loadrig failed with {:?}\nstdout:\n{}\nstderr:\n{}",
        out.status.code(),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(out)
}

fn parse_lines(stdout: &[u8]) -> anyhow::Result<(Vec<ProgressLine>, SummaryLine)> {
    let mut progress = Vec::new();
    let mut summary = None;

    for line in String::from_utf8_lossy(stdout).lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JsonLine>(line)
            .with_context(|| format!("parse json line: {line}"))?
        {
            JsonLine::Progress(p) => progress.push(p),
            JsonLine::Summary(s) => summary = Some(s),
        }
    }

    let summary = summary.context("missing summary line")?;
    Ok((progress, summary))
}

fn rate(summary: &SummaryLine, name: &str) -> Option<f64> {
    match summary.metrics.get(name) {
        Some(Metric::Rate { rate, .. }) => *rate,
        _ => None,
    }
}

fn counter(summary: &SummaryLine, name: &str) -> Option<f64> {
    match summary.metrics.get(name) {
        Some(Metric::Counter { count }) => Some(*count),
        _ => None,
    }
}

fn args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn e2e_auth_json_summary_matches_server() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let base_url = server.base_url().to_string();

    // Each iteration takes ~1.5s, so with a 1s duration every virtual user runs exactly once.
    let out = run_loadrig(args(&[
        "run",
        "--workflow",
        "auth",
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

    let server_requests = server.stats().requests_total();
    server.shutdown().await;

    let (progress, summary) = parse_lines(&out.stdout)?;

    anyhow::ensure!(summary.workflow == "auth");
    anyhow::ensure!(summary.vus == 2);
    anyhow::ensure!(summary.iterations_total == 2, "{summary:?}");
    anyhow::ensure!(summary.passed && summary.complete, "{summary:?}");
    anyhow::ensure!(rate(&summary, "registration_success") == Some(1.0));
    anyhow::ensure!(rate(&summary, "login_success") == Some(1.0));
    anyhow::ensure!(rate(&summary, "checks") == Some(1.0));
    anyhow::ensure!(
        counter(&summary, "total_requests") == Some(server_requests as f64),
        "client counted {:?}, server saw {server_requests}",
        counter(&summary, "total_requests")
    );
    anyhow::ensure!(server_requests == 4, "server saw {server_requests}");

    match summary.metrics.get("login_latency") {
        Some(Metric::Trend { count, avg }) => {
            anyhow::ensure!(*count == 2, "login_latency count {count}");
            anyhow::ensure!(avg.is_some_and(|v| v >= 0.0), "login_latency avg {avg:?}");
        }
        other => anyhow::bail!("login_latency is not a trend: {other:?}"),
    }

    anyhow::ensure!(summary.thresholds.len() == 4, "{:?}", summary.thresholds);
    anyhow::ensure!(summary.thresholds.iter().all(|t| t.passed));

    for (i, p) in progress.iter().enumerate() {
        anyhow::ensure!(p.tick == i as u64 + 1, "progress ticks out of order");
        anyhow::ensure!(p.vus == 2);
    }

    Ok(())
}

#[tokio::test]
async fn e2e_alternating_failures_fail_login_rate() -> anyhow::Result<()> {
    let server = TestServer::start_with(loadrig_testserver::TestServerConfig {
        fail_every: Some(2),
        ..Default::default()
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

    anyhow::ensure!(out.status.code() == Some(11));
    let (_, summary) = parse_lines(&out.stdout)?;

    anyhow::ensure!(!summary.passed);
    anyhow::ensure!(rate(&summary, "registration_success") == Some(1.0));
    anyhow::ensure!(rate(&summary, "login_success") == Some(0.0));

    let failed: Vec<&str> = summary
        .thresholds
        .iter()
        .filter(|t| !t.passed)
        .map(|t| t.metric.as_str())
        .collect();
    anyhow::ensure!(failed == ["login_success"], "failed thresholds: {failed:?}");

    Ok(())
}

#[tokio::test]
async fn e2e_run_file_and_flags_override_defaults() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let base_url = server.base_url().to_string();

    let dir = tempfile::tempdir().context("create temp dir")?;
    let run_file = dir.path().join("run.yaml");
    std::fs::write(
        &run_file,
        "vus: 5\nduration: 1s\nthresholds:\n  total_requests: count<100\n",
    )
    .context("write run file")?;
    let run_file = run_file.display().to_string();
    let summary_out = dir.path().join("out").join("summary.json");
    let summary_out_arg = summary_out.display().to_string();

    let out = run_loadrig(args(&[
        "run",
        "--workflow",
        "combined",
        "--target",
        &base_url,
        "--config",
        &run_file,
        "--vus",
        "1",
        "--output",
        "json",
        "--summary-out",
        &summary_out_arg,
    ]))
    .await?;
    server.shutdown().await;

    let (_, summary) = parse_lines(&out.stdout)?;
    anyhow::ensure!(summary.vus == 1, "CLI --vus should win over the run file");
    anyhow::ensure!(summary.iterations_total == 1, "{summary:?}");
    anyhow::ensure!(counter(&summary, "total_requests") == Some(4.0));
    anyhow::ensure!(counter(&summary, "total_errors") == Some(0.0));
    anyhow::ensure!(
        summary
            .thresholds
            .iter()
            .any(|t| t.metric == "total_requests" && t.expression == "count<100" && t.passed),
        "run file threshold missing: {:?}",
        summary.thresholds
    );
    anyhow::ensure!(
        summary.thresholds.iter().any(|t| t.metric == "total_errors"),
        "workflow default thresholds should still apply"
    );

    let written = std::fs::read_to_string(&summary_out).context("read summary file")?;
    let doc: serde_json::Value = serde_json::from_str(&written).context("parse summary file")?;
    anyhow::ensure!(doc.get("workflow").and_then(|v| v.as_str()) == Some("combined"));
    anyhow::ensure!(doc.get("kind").and_then(|v| v.as_str()) == Some("summary"));

    Ok(())
}
