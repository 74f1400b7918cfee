use std::fmt;

use log::{info, warn};

use crate::client::{HEALTH_PATH, Probe, SmokeClient};

/// The status every check expects.
const EXPECTED_STATUS: u16 = 200;

/// A request whose response must be `200 OK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Check {
    pub name: &'static str,
    pub path: &'static str,
}

/// The result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(String),
    Skipped(String),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "PASSED"),
            Self::Failed(reason) => write!(f, "FAILED ({reason})"),
            Self::Skipped(reason) => write!(f, "SKIPPED ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub check: Check,
    pub outcome: Outcome,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.check.name, self.outcome)
    }
}

/// The smoke checks of a serving endpoint.
///
/// The endpoint is probed once before any check runs. If it can't be reached every check
/// is skipped, and if it answers the probe with an error every check fails.
pub struct SmokeSuite {
    client: SmokeClient,
    checks: Vec<Check>,
}

impl SmokeSuite {
    /// Creates the default suite: `health` and `ping`.
    pub fn new(client: SmokeClient) -> Self {
        let checks = vec![
            Check {
                name: "health",
                path: HEALTH_PATH,
            },
            Check {
                name: "ping",
                path: "/ping",
            },
        ];

        Self::with_checks(client, checks)
    }

    pub fn with_checks(client: SmokeClient, checks: Vec<Check>) -> Self {
        Self { client, checks }
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn run(&self) -> Vec<Report> {
        let probe = self.client.probe();

        let reports: Vec<_> = self
            .checks
            .iter()
            .map(|&check| Report {
                check,
                outcome: self.run_check(check, &probe),
            })
            .collect();

        for report in &reports {
            match report.outcome {
                Outcome::Failed(_) => warn!("{report}"),
                _ => info!("{report}"),
            }
        }

        reports
    }

    fn run_check(&self, check: Check, probe: &Probe) -> Outcome {
        match probe {
            Probe::Unreachable(reason) => {
                return Outcome::Skipped(format!("serving endpoint not reachable: {reason}"));
            }
            Probe::Unhealthy(status) => {
                return Outcome::Failed(format!("health probe answered {status}"));
            }
            Probe::Broken(reason) => return Outcome::Failed(reason.clone()),
            Probe::Ready => {}
        }

        match self.client.get_status(check.path) {
            Ok(EXPECTED_STATUS) => Outcome::Passed,
            Ok(status) => Outcome::Failed(format!("expected {EXPECTED_STATUS}, got {status}")),
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}

/// Whether any check in `reports` failed.
pub fn any_failed(reports: &[Report]) -> bool {
    reports.iter().any(|r| r.outcome.is_failed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lines() {
        let report = Report {
            check: Check {
                name: "ping",
                path: "/ping",
            },
            outcome: Outcome::Failed("expected 200, got 500".into()),
        };

        assert_eq!(report.to_string(), "ping FAILED (expected 200, got 500)");
        assert!(any_failed(&[report]));
    }

    #[test]
    fn skipped_is_not_failed() {
        assert!(!Outcome::Skipped("down".into()).is_failed());
        assert!(!Outcome::Passed.is_failed());
    }
}
