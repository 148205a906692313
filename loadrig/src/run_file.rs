use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use loadrig_core::{RunOverrides, ThresholdSet};
use serde::Deserialize;

/// Run options read from `--config`; everything is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct RunFileYaml {
    pub vus: Option<u64>,

    #[serde(default)]
    pub duration: Option<YamlDuration>,

    pub iterations: Option<u64>,

    #[serde(default)]
    pub grace_period: Option<YamlDuration>,

    #[serde(default)]
    pub thresholds: BTreeMap<String, ThresholdExprYaml>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct YamlDuration(Duration);

impl YamlDuration {
    fn into_inner(self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for YamlDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl<'de> serde::de::Visitor<'de> for V {
            type Value = YamlDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 10s), integer seconds, or float seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v <= 0 {
                    return Err(E::custom("duration must be positive"));
                }
                Ok(YamlDuration(Duration::from_secs(v.unsigned_abs())))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if !v.is_finite() || v <= 0.0 {
                    return Err(E::custom("duration must be a positive, finite number"));
                }
                Duration::try_from_secs_f64(v)
                    .map(YamlDuration)
                    .map_err(E::custom)
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let d = humantime::parse_duration(v).map_err(E::custom)?;
                Ok(YamlDuration(d))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                self.visit_str(&v)
            }
        }

        deserializer.deserialize_any(V)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ThresholdExprYaml {
    One(String),
    Many(Vec<String>),
}

pub(crate) async fn load_run_overrides(path: &Path) -> anyhow::Result<RunOverrides> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read run file: {}", path.display()))?;

    parse_run_overrides(&bytes)
        .with_context(|| format!("invalid run file: {}", path.display()))
}

fn parse_run_overrides(bytes: &[u8]) -> anyhow::Result<RunOverrides> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(RunOverrides::default());
    }
    let doc: RunFileYaml = serde_yaml::from_slice(bytes).context("failed to parse YAML")?;

    Ok(RunOverrides {
        vus: doc.vus,
        duration: doc.duration.map(YamlDuration::into_inner),
        iterations: doc.iterations,
        grace_period: doc.grace_period.map(YamlDuration::into_inner),
        thresholds: parse_thresholds_map(doc.thresholds)?,
    })
}

fn parse_thresholds_map(
    raw: BTreeMap<String, ThresholdExprYaml>,
) -> anyhow::Result<Vec<ThresholdSet>> {
    let mut out = Vec::new();

    for (metric, v) in raw {
        let expressions: Vec<String> = match v {
            ThresholdExprYaml::One(s) => vec![s],
            ThresholdExprYaml::Many(v) => v,
        };

        if expressions.is_empty() {
            anyhow::bail!("invalid thresholds for `{metric}`: empty list");
        }

        out.push(ThresholdSet::new(metric, expressions));
    }

    Ok(out)
}
