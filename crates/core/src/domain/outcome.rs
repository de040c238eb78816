// Marker-based outcome of package-manager commands
//
// `pm install` / `pm uninstall` signal their result inconsistently: a zero exit
// with "Failure [...]" on stdout, a nonzero exit with nothing printed, or a
// quiet zero exit. The decision table below is the single place that turns
// those three observations into a verdict.

use serde::{Deserialize, Serialize};

/// Literal printed by the package manager on success
pub const SUCCESS_MARKER: &str = "Success";

/// Literal printed by the package manager on failure (`Failure [REASON]`)
pub const FAILURE_MARKER: &str = "Failure";

/// Observations taken from a finished process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub exit_ok: bool,
    pub success_marker: bool,
    pub failure_marker: bool,
}

/// Final decision for a marker-signalled command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Success,
    /// Process exited nonzero (markers are ignored)
    ProcessFailed,
    /// Exit was clean but the output carries the failure marker
    ExplicitFailure,
    /// Exit was clean but no success marker was printed
    MissingMarker,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Success => write!(f, "success"),
            Verdict::ProcessFailed => write!(f, "process failure"),
            Verdict::ExplicitFailure => write!(f, "explicit failure"),
            Verdict::MissingMarker => write!(f, "missing success marker"),
        }
    }
}

impl Outcome {
    /// Collect observations. Markers are searched in both streams since some
    /// tool versions report `Failure [...]` on stderr.
    pub fn observe(exit_ok: bool, stdout: &str, stderr: &str) -> Self {
        Self {
            exit_ok,
            success_marker: stdout.contains(SUCCESS_MARKER) || stderr.contains(SUCCESS_MARKER),
            failure_marker: stdout.contains(FAILURE_MARKER) || stderr.contains(FAILURE_MARKER),
        }
    }

    /// | exit_ok | success | failure | verdict         |
    /// |---------|---------|---------|-----------------|
    /// | false   | any     | any     | ProcessFailed   |
    /// | true    | any     | true    | ExplicitFailure |
    /// | true    | true    | false   | Success         |
    /// | true    | false   | false   | MissingMarker   |
    pub fn verdict(&self) -> Verdict {
        match (self.exit_ok, self.success_marker, self.failure_marker) {
            (false, _, _) => Verdict::ProcessFailed,
            (true, _, true) => Verdict::ExplicitFailure,
            (true, true, false) => Verdict::Success,
            (true, false, false) => Verdict::MissingMarker,
        }
    }
}
