use std::time::Duration;

use loadrig_core::{ConfigError, RunConfig, RunOverrides, ThresholdSet, WorkflowDefaults};

fn defaults() -> WorkflowDefaults {
    WorkflowDefaults {
        vus: 50,
        duration: Duration::from_secs(300),
        thresholds: vec![
            ThresholdSet::new("login_latency", ["p(95)<200"]),
            ThresholdSet::new("login_success", ["rate>0.95"]),
        ],
    }
}

#[test]
fn cli_overrides_win_over_run_file_and_defaults() {
    let cli = RunOverrides {
        vus: Some(2),
        ..RunOverrides::default()
    };
    let file = RunOverrides {
        vus: Some(10),
        duration: Some(Duration::from_secs(5)),
        grace_period: Some(Duration::from_secs(3)),
        thresholds: vec![ThresholdSet::new("login_latency", ["p(95)<500"])],
        ..RunOverrides::default()
    };

    let cfg = RunConfig::resolve(cli.over(file), &defaults())
        .unwrap_or_else(|e| panic!("expected config to be valid: {e}"));

    assert_eq!(cfg.vus, 2);
    assert_eq!(cfg.duration, Duration::from_secs(5));
    assert_eq!(cfg.grace_period, Some(Duration::from_secs(3)));
    assert_eq!(cfg.iterations, None);

    assert_eq!(cfg.thresholds.len(), 2);
    assert!(
        cfg.thresholds
            .contains(&ThresholdSet::new("login_latency", ["p(95)<500"]))
    );
    assert!(
        cfg.thresholds
            .contains(&ThresholdSet::new("login_success", ["rate>0.95"]))
    );
}

#[test]
fn workflow_defaults_apply_without_overrides() {
    let cfg = RunConfig::resolve(RunOverrides::default(), &defaults())
        .unwrap_or_else(|e| panic!("expected config to be valid: {e}"));

    assert_eq!(cfg.vus, 50);
    assert_eq!(cfg.duration, Duration::from_secs(300));
    assert_eq!(cfg.grace_period, None);
    assert_eq!(cfg.thresholds, defaults().thresholds);
}

#[test]
fn resolved_config_is_validated() {
    let cli = RunOverrides {
        vus: Some(0),
        ..RunOverrides::default()
    };
    assert_eq!(
        RunConfig::resolve(cli, &defaults()),
        Err(ConfigError::InvalidVus)
    );

    let file = RunOverrides {
        thresholds: vec![ThresholdSet::new("login_success", ["rate>>1"])],
        ..RunOverrides::default()
    };
    assert!(matches!(
        RunConfig::resolve(file, &defaults()),
        Err(ConfigError::InvalidThreshold { .. })
    ));
}
