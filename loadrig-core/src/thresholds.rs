use std::fmt;

use loadrig_metrics::MetricKind;

/// Threshold expressions declared for one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSet {
    pub metric: String,
    pub expressions: Vec<String>,
}

impl ThresholdSet {
    pub fn new<I, S>(metric: impl Into<String>, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            metric: metric.into(),
            expressions: expressions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
}

impl ThresholdOp {
    #[must_use]
    pub fn compare(self, observed: f64, expected: f64) -> bool {
        match self {
            Self::Lt => observed < expected,
            Self::Lte => observed <= expected,
            Self::Gt => observed > expected,
            Self::Gte => observed >= expected,
            Self::Eq => observed == expected,
        }
    }
}

impl fmt::Display for ThresholdOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Eq => "==",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdStat {
    Avg,
    Min,
    Max,
    Med,
    Count,
    Rate,
    /// Percentile in `[0, 100]`.
    P(f64),
}

impl ThresholdStat {
    /// Metric kind this statistic can be computed from.
    #[must_use]
    pub fn required_kind(self) -> MetricKind {
        match self {
            Self::Avg | Self::Min | Self::Max | Self::Med | Self::P(_) => MetricKind::Trend,
            Self::Rate => MetricKind::Rate,
            Self::Count => MetricKind::Counter,
        }
    }
}

impl fmt::Display for ThresholdStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Avg => f.write_str("avg"),
            Self::Min => f.write_str("min"),
            Self::Max => f.write_str("max"),
            Self::Med => f.write_str("med"),
            Self::Count => f.write_str("count"),
            Self::Rate => f.write_str("rate"),
            Self::P(p) => write!(f, "p({p})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdExpr {
    pub stat: ThresholdStat,
    pub op: ThresholdOp,
    pub value: f64,
}

impl fmt::Display for ThresholdExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.stat, self.op, self.value)
    }
}

pub fn parse_threshold_expr(raw: &str) -> Result<ThresholdExpr, String> {
    let s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() {
        return Err("empty threshold".to_string());
    }

    let ops = [
        ("<=", ThresholdOp::Lte),
        (">=", ThresholdOp::Gte),
        ("==", ThresholdOp::Eq),
        ("<", ThresholdOp::Lt),
        (">", ThresholdOp::Gt),
    ];
    let (op_pos, op_len, op) = ops
        .iter()
        .find_map(|(tok, op)| s.find(tok).map(|pos| (pos, tok.len(), *op)))
        .ok_or_else(|| format!("missing comparison operator in `{raw}`"))?;

    let (left, right_with_op) = s.split_at(op_pos);
    let right = &right_with_op[op_len..];
    if left.is_empty() || right.is_empty() {
        return Err(format!("incomplete threshold `{raw}`"));
    }

    let stat = match left.to_ascii_lowercase().as_str() {
        "avg" => ThresholdStat::Avg,
        "min" => ThresholdStat::Min,
        "max" => ThresholdStat::Max,
        "med" => ThresholdStat::Med,
        "count" => ThresholdStat::Count,
        "rate" => ThresholdStat::Rate,
        other => {
            let inner = other
                .strip_prefix("p(")
                .and_then(|v| v.strip_suffix(')'))
                .ok_or_else(|| format!("unknown statistic `{left}` in `{raw}`"))?;
            let p: f64 = inner
                .parse()
                .map_err(|_| format!("invalid percentile `{inner}` in `{raw}`"))?;
            if !(0.0..=100.0).contains(&p) {
                return Err(format!("percentile out of range in `{raw}`"));
            }
            ThresholdStat::P(p)
        }
    };

    let value: f64 = right
        .parse()
        .map_err(|_| format!("invalid numeric value `{right}` in `{raw}`"))?;
    if !value.is_finite() {
        return Err(format!("threshold value must be finite in `{raw}`"));
    }

    Ok(ThresholdExpr { stat, op, value })
}
