//! Gate reports.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::GateError;

/// File name of the machine-readable gate report.
pub const GATE_REPORT: &str = "gate-report.json";

/// Verdict of a single gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
}

/// Outcome of one deterministic checker.
///
/// `reason` is always a single line; it is what the runner prints and
/// what a failing exit carries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateReport {
    pub gate: String,
    pub status: GateStatus,
    pub reason: String,
}

impl GateReport {
    pub fn pass(gate: &str) -> Self {
        Self {
            gate: gate.to_string(),
            status: GateStatus::Pass,
            reason: "ok".to_string(),
        }
    }

    /// Builds a failing report, flattening the reason to one line.
    pub fn fail(gate: &str, reason: impl Into<String>) -> Self {
        let flat = reason.into().replace('\n', " ");
        Self {
            gate: gate.to_string(),
            status: GateStatus::Fail,
            reason: flat,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == GateStatus::Pass
    }
}

/// Aggregate of a full gate run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRunReport {
    pub schema_version: u32,
    pub status: GateStatus,
    /// First failing reason, or "ok".
    pub reason: String,
    pub gates: Vec<GateReport>,
}

impl GateRunReport {
    pub fn from_gates(gates: Vec<GateReport>) -> Self {
        let first_failure = gates.iter().find(|g| !g.passed());
        let (status, reason) = match first_failure {
            Some(failed) => (
                GateStatus::Fail,
                format!("{}: {}", failed.gate, failed.reason),
            ),
            None => (GateStatus::Pass, "ok".to_string()),
        };
        Self {
            schema_version: 1,
            status,
            reason,
            gates,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == GateStatus::Pass
    }

    /// Process exit code for runners: 0 pass, 1 fail.
    pub fn exit_code(&self) -> i32 {
        if self.passed() { 0 } else { 1 }
    }

    /// Writes the report as JSON under `dir`.
    pub fn write(&self, dir: &Path) -> Result<PathBuf, GateError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(GATE_REPORT);
        let mut body = serde_json::to_vec_pretty(self)?;
        body.push(b'\n');
        std::fs::write(&path, body)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reasons_are_single_line() {
        let report = GateReport::fail("fixtures", "line one\nline two");
        assert!(!report.reason.contains('\n'));
    }

    #[test]
    fn run_report_carries_first_failure_and_exit_code() {
        let run = GateRunReport::from_gates(vec![
            GateReport::pass("a"),
            GateReport::fail("b", "broke"),
            GateReport::fail("c", "also broke"),
        ]);

        assert_eq!(run.status, GateStatus::Fail);
        assert_eq!(run.reason, "b: broke");
        assert_eq!(run.exit_code(), 1);

        let clean = GateRunReport::from_gates(vec![GateReport::pass("a")]);
        assert!(clean.passed());
        assert_eq!(clean.exit_code(), 0);
        assert_eq!(clean.reason, "ok");
    }
}
