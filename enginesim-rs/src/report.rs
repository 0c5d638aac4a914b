use std::fmt::Write as _;

use crate::types::TestOutcome;

/// Decides the process exit code for CI. A run passes the gate when the
/// overall success rate clears `min_success_rate` and, if
/// `critical_must_pass` is set, no critical case failed. A case is critical
/// when its spec is flagged critical or its name contains one of the
/// configured keywords.
#[derive(Clone, Debug)]
pub struct GatePolicy {
    /// Percentage, 0..=100.
    pub min_success_rate: f64,
    pub critical_must_pass: bool,
    /// Lowercase substrings matched against test names.
    pub critical_keywords: Vec<String>,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            min_success_rate: 70.0,
            critical_must_pass: true,
            critical_keywords: vec![
                "delete".to_string(),
                "removal".to_string(),
                "persistence".to_string(),
            ],
        }
    }
}

impl GatePolicy {
    fn is_critical(&self, case: &CaseReport) -> bool {
        if case.critical {
            return true;
        }
        let name = case.name.to_lowercase();
        self.critical_keywords.iter().any(|kw| name.contains(kw))
    }
}

#[derive(Clone, Debug)]
pub struct CaseReport {
    pub suite: String,
    pub name: String,
    pub critical: bool,
    pub outcome: TestOutcome,
}

/// Aggregate of all test outcomes in one invocation, in execution order.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<CaseReport>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, suite: &str, name: &str, critical: bool, outcome: TestOutcome) {
        self.outcomes.push(CaseReport {
            suite: suite.to_string(),
            name: name.to_string(),
            critical,
            outcome,
        });
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|case| case.outcome.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// An empty run has nothing to complain about.
    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            100.0
        } else {
            self.passed() as f64 / self.total() as f64 * 100.0
        }
    }

    pub fn critical_failures<'a>(&'a self, policy: &'a GatePolicy) -> Vec<&'a CaseReport> {
        self.outcomes
            .iter()
            .filter(|case| !case.outcome.passed && policy.is_critical(case))
            .collect()
    }

    pub fn satisfies(&self, policy: &GatePolicy) -> bool {
        if self.success_rate() < policy.min_success_rate {
            return false;
        }
        if policy.critical_must_pass && !self.critical_failures(policy).is_empty() {
            return false;
        }
        true
    }

    pub fn exit_code(&self, policy: &GatePolicy) -> i32 {
        if self.satisfies(policy) {
            0
        } else {
            1
        }
    }

    /// Human-readable summary: one line per test, full diagnostics for
    /// failures, a critical-issues subsection, then the overall verdict.
    pub fn render(&self, policy: &GatePolicy) -> String {
        let mut out = String::new();
        let rule = "=".repeat(64);
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Knowledge Engine harness report");
        let _ = writeln!(out, "{rule}");

        for case in &self.outcomes {
            let verdict = if case.outcome.passed { "PASS" } else { "FAIL" };
            let headline = case.outcome.details.lines().next().unwrap_or("");
            let _ = writeln!(out, "[{verdict}] {}/{} - {headline}", case.suite, case.name);
        }

        let failures: Vec<&CaseReport> = self
            .outcomes
            .iter()
            .filter(|case| !case.outcome.passed)
            .collect();
        if !failures.is_empty() {
            let _ = writeln!(out, "\nfailures:");
            for case in failures {
                let _ = writeln!(out, "--- {}/{}", case.suite, case.name);
                for line in case.outcome.details.lines() {
                    let _ = writeln!(out, "    {line}");
                }
            }
        }

        let critical = self.critical_failures(policy);
        if !critical.is_empty() {
            let _ = writeln!(out, "\ncritical issues:");
            for case in critical {
                let headline = case.outcome.details.lines().next().unwrap_or("");
                let _ = writeln!(out, "  - {}/{}: {headline}", case.suite, case.name);
            }
        }

        let _ = writeln!(
            out,
            "\n{} tests, {} passed, {} failed ({:.1}% success)",
            self.total(),
            self.passed(),
            self.failed(),
            self.success_rate()
        );
        let verdict = if self.satisfies(policy) { "PASS" } else { "FAIL" };
        let _ = writeln!(
            out,
            "gate: >= {:.1}% overall{} -> {verdict}",
            policy.min_success_rate,
            if policy.critical_must_pass {
                ", critical tests must pass"
            } else {
                ""
            }
        );
        out
    }

    pub fn print(&self, policy: &GatePolicy) {
        print!("{}", self.render(policy));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(outcomes: &[(&str, &str, bool, bool)]) -> RunReport {
        let mut report = RunReport::new();
        for (suite, name, critical, passed) in outcomes {
            let outcome = if *passed {
                TestOutcome::pass("ok")
            } else {
                TestOutcome::fail("broken")
            };
            report.record(suite, name, *critical, outcome);
        }
        report
    }

    #[test]
    fn test_totals_add_up() {
        let report = report_with(&[
            ("health", "service_reachable", false, true),
            ("ingest", "process_text", false, false),
            ("library", "roundtrip", false, true),
        ]);
        assert_eq!(report.total(), 3);
        assert_eq!(report.passed() + report.failed(), report.total());
        assert!((report.success_rate() - 66.7).abs() < 0.1);
    }

    #[test]
    fn test_empty_run_is_clean() {
        let report = RunReport::new();
        assert_eq!(report.success_rate(), 100.0);
        assert_eq!(report.exit_code(&GatePolicy::default()), 0);
    }

    #[test]
    fn test_threshold_gates_exit_code() {
        let report = report_with(&[
            ("a", "one", false, true),
            ("a", "two", false, true),
            ("a", "three", false, false),
        ]);
        let mut policy = GatePolicy {
            min_success_rate: 60.0,
            critical_must_pass: false,
            ..GatePolicy::default()
        };
        assert_eq!(report.exit_code(&policy), 0);
        policy.min_success_rate = 80.0;
        assert_eq!(report.exit_code(&policy), 1);
    }

    #[test]
    fn test_critical_keyword_failure_blocks_the_gate() {
        // 75% success clears the threshold, but the failing test's name
        // matches a critical keyword.
        let report = report_with(&[
            ("library", "list_articles", false, true),
            ("library", "update_article", false, true),
            ("assets", "upload_asset", false, true),
            ("library", "delete_article_and_verify_removal", false, false),
        ]);
        let policy = GatePolicy {
            min_success_rate: 70.0,
            ..GatePolicy::default()
        };
        assert!(report.success_rate() >= policy.min_success_rate);
        assert_eq!(report.critical_failures(&policy).len(), 1);
        assert_eq!(report.exit_code(&policy), 1);
    }

    #[test]
    fn test_critical_flag_without_keyword() {
        let report = report_with(&[
            ("ingest", "process_text", true, false),
            ("health", "service_reachable", false, true),
        ]);
        let policy = GatePolicy {
            min_success_rate: 0.0,
            ..GatePolicy::default()
        };
        assert_eq!(report.critical_failures(&policy).len(), 1);
        assert_eq!(report.exit_code(&policy), 1);
    }

    #[test]
    fn test_render_lists_every_case() {
        let report = report_with(&[
            ("health", "service_reachable", false, true),
            ("library", "delete_article", false, false),
        ]);
        let rendered = report.render(&GatePolicy::default());
        assert!(rendered.contains("[PASS] health/service_reachable"));
        assert!(rendered.contains("[FAIL] library/delete_article"));
        assert!(rendered.contains("critical issues:"));
        assert!(rendered.contains("2 tests, 1 passed, 1 failed (50.0% success)"));
    }
}
