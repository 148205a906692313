use std::sync::Arc;

mod format;
mod progress;
mod summary;

use format::{format_duration, format_rate};
use progress::HumanProgress;
use summary::render;

use super::{OutputFormatter, RunHeader};

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new(workflow: &str) -> Self {
        Self {
            progress: Arc::new(HumanProgress::new(workflow)),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, header: &RunHeader<'_>) {
        let workflow = header.workflow;
        let config = header.config;

        println!("workflow: {} ({})", workflow.name(), workflow.summary());
        println!("target: {}", header.target);
        print!(
            "vus={} duration={}",
            config.vus,
            format_duration(config.duration)
        );
        if let Some(iterations) = config.iterations {
            print!(" iterations={iterations}");
        }
        if let Some(grace) = config.grace_period {
            print!(" grace_period={}", format_duration(grace));
        }
        println!(" thresholds={}", config.thresholds.len());
        println!();
    }

    fn progress(&self) -> Option<loadrig_core::ProgressFn> {
        let progress = self.progress.clone();

        Some(Arc::new(move |u| {
            let message = format!(
                "vus={}/{} elapsed={} iters={} iters/s={} step_failures={} checks_failed={}",
                u.active_vus,
                u.vus,
                format_duration(u.elapsed),
                u.iterations_total,
                format_rate(u.iterations_per_sec_now),
                u.step_failures_total,
                u.checks_failed_total,
            );
            progress.update(u.duration, u.elapsed, message);
        }))
    }

    fn print_summary(&self, report: &loadrig_core::RunReport) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render(report));

        let failed = report.thresholds.failed().count();
        if failed > 0 {
            eprintln!(
                "thresholds failed: {failed} of {}",
                report.thresholds.results.len()
            );
        }
        if !report.is_complete() {
            eprintln!("run incomplete: some iterations were cut off");
        }

        Ok(())
    }
}
