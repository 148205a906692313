use std::fmt::Write as _;

use crate::workflows::WorkflowKind;

pub fn list() {
    print!("{}", render());
}

fn render() -> String {
    let mut out = String::new();

    for kind in WorkflowKind::ALL {
        let workflow = kind.build();
        let defaults = workflow.workflow_defaults();

        writeln!(&mut out, "{:<10} {}", workflow.name(), workflow.summary()).ok();
        writeln!(
            &mut out,
            "{:<10} vus={} duration={}",
            "",
            defaults.vus,
            humantime::format_duration(defaults.duration)
        )
        .ok();
        for set in &defaults.thresholds {
            writeln!(
                &mut out,
                "{:<10} {}: {}",
                "",
                set.metric,
                set.expressions.join(", ")
            )
            .ok();
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_workflow_with_defaults() {
        let out = render();

        for name in ["auth", "messaging", "combined"] {
            assert!(out.lines().any(|l| l.starts_with(name)), "{out}");
        }
        assert!(out.contains("vus=50 duration=5m"), "{out}");
        assert!(out.contains("total_errors: count<50"), "{out}");
    }
}
