#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// One or more thresholds failed.
    ThresholdsFailed = 11,

    /// Runners were cut off or panicked, so the metrics may be missing work.
    RunIncomplete = 13,

    /// Setup failed; no virtual user was started.
    SetupFailed = 20,

    /// Invalid CLI/config/options (bad flags, invalid durations, invalid thresholds syntax, etc.).
    InvalidInput = 30,

    /// Internal/runtime error (IO errors, unexpected invariants, panics caught at top-level).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// An incomplete run outranks threshold results computed from it.
    #[must_use]
    pub fn from_report(report: &loadrig_core::RunReport) -> Self {
        match (report.is_complete(), report.passed()) {
            (false, _) => Self::RunIncomplete,
            (true, false) => Self::ThresholdsFailed,
            (true, true) => Self::Success,
        }
    }
}
