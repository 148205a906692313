use std::fmt::Write as _;

use loadrig_core::{MetricValue, RunReport, TrendSummary};

use super::format::*;

pub(crate) fn render(report: &RunReport) -> String {
    let mut out = String::new();
    let secs = report.elapsed.as_secs_f64().max(1e-9);

    writeln!(&mut out, "summary: {}", report.workflow).ok();
    let stop = report
        .stop_reason
        .map_or_else(|| "unknown".to_string(), |r| r.to_string());
    writeln!(
        &mut out,
        "  vus: {}  elapsed: {}  stop: {stop}",
        report.vus,
        format_duration(report.elapsed)
    )
    .ok();
    writeln!(
        &mut out,
        "  iterations: {} ({}/s)",
        report.iterations,
        format_rate(report.iterations as f64 / secs)
    )
    .ok();

    render_metrics(report, secs, &mut out);
    render_checks(report, &mut out);
    render_step_failures(report, &mut out);
    render_thresholds(report, &mut out);

    if !report.issues.is_empty() {
        out.push_str("\nissues\n");
        for issue in &report.issues {
            writeln!(&mut out, "  {issue}").ok();
        }
    }

    out
}

fn render_metrics(report: &RunReport, secs: f64, out: &mut String) {
    if report.metrics.is_empty() {
        return;
    }

    out.push_str("\nmetrics\n");
    let width = report
        .metrics
        .iter()
        .map(|m| m.name.len())
        .max()
        .unwrap_or_default();

    for m in report.metrics.iter() {
        let value = match &m.value {
            MetricValue::Counter { sum, .. } => {
                format!("{} ({}/s)", format_count(*sum), format_rate(*sum / secs))
            }
            MetricValue::Rate { hits, total, rate } => match rate {
                Some(rate) => format!("{} ({hits}/{total})", format_percent(*rate)),
                None => "n/a (0/0)".to_string(),
            },
            MetricValue::Trend(t) => render_trend(t),
        };
        writeln!(out, "  {:.<width$}: {value}", format!("{} ", m.name), width = width + 2).ok();
    }
}

fn render_trend(t: &TrendSummary) -> String {
    if t.is_empty() {
        return "n/a (n=0)".to_string();
    }
    format!(
        "avg={} min={} med={} max={} p(90)={} p(95)={} p(99)={} (n={})",
        format_millis_opt(t.avg()),
        format_millis_opt(t.min()),
        format_millis_opt(t.med()),
        format_millis_opt(t.max()),
        format_millis_opt(t.percentile(90.0)),
        format_millis_opt(t.percentile(95.0)),
        format_millis_opt(t.percentile(99.0)),
        t.count()
    )
}

fn render_checks(report: &RunReport, out: &mut String) {
    if report.checks.is_empty() {
        return;
    }

    writeln!(
        out,
        "\nchecks ({} of {} failed)",
        report.checks_failed(),
        report.checks_total()
    )
    .ok();
    for c in &report.checks {
        let mark = if c.failed == 0 { '✓' } else { '✗' };
        let passes = c.total.saturating_sub(c.failed);
        writeln!(out, "  {mark} {} ({passes}/{})", c.name, c.total).ok();
    }
}

fn render_step_failures(report: &RunReport, out: &mut String) {
    if report.step_failures.is_empty() {
        return;
    }

    out.push_str("\nstep failures\n");
    for f in &report.step_failures {
        writeln!(out, "  {}: {} (last: {})", f.step, f.count, f.last_detail).ok();
    }
}

fn render_thresholds(report: &RunReport, out: &mut String) {
    if report.thresholds.results.is_empty() {
        return;
    }

    out.push_str("\nthresholds\n");
    for r in &report.thresholds.results {
        let mark = if r.passed { '✓' } else { '✗' };
        let detail = match (r.observed, r.gap) {
            (_, Some(gap)) => gap.to_string().replace('_', " "),
            (Some(observed), None) => format!("observed {}", format_count(observed)),
            (None, None) => "not evaluated".to_string(),
        };
        writeln!(out, "  {mark} {}: {} ({detail})", r.metric, r.expression).ok();
    }
}
