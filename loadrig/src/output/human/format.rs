use std::time::Duration;

pub(crate) fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.2}")
    } else {
        "0".to_string()
    }
}

/// Milliseconds as recorded by latency trends, e.g. `812.40ms` or `1.25s`.
pub(crate) fn format_millis(ms: f64) -> String {
    if !ms.is_finite() {
        return "n/a".to_string();
    }
    if ms >= 1000.0 {
        return format!("{:.2}s", ms / 1000.0);
    }
    format!("{ms:.2}ms")
}

pub(crate) fn format_millis_opt(ms: Option<f64>) -> String {
    ms.map_or_else(|| "n/a".to_string(), format_millis)
}

pub(crate) fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Always a single rounded component in one of: ms, s.
pub(crate) fn format_duration(d: Duration) -> String {
    fn round_div(value: u128, unit: u128) -> u128 {
        // Round to nearest integer (ties round up).
        (value + (unit / 2)) / unit
    }

    let total_ms = d.as_millis();
    if total_ms >= 1000 {
        return format!("{}s", round_div(total_ms, 1000));
    }
    format!("{total_ms}ms")
}

/// Trims the trailing `.0` of integral counters.
pub(crate) fn format_count(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}
