use core::fmt::Debug;
use std::{boxed::Box, future::Future, pin::Pin};

use async_trait::async_trait;
use dyn_clone::DynClone;

use crate::engine::EngineClient;
use crate::error::PollTimeoutError;
use crate::poller;
use crate::report::RunReport;
use crate::testmatch::TestMatcher;
use crate::types::{Job, TestOutcome};
use crate::utils::outcome_from_run;

pub type AsyncTestFunc =
    fn(&mut Test) -> Pin<Box<dyn Future<Output = anyhow::Result<TestOutcome>> + Send + '_>>;

#[async_trait]
pub trait Testable: DynClone + Send + Sync {
    fn name(&self) -> &str;
    fn critical(&self) -> bool;
    async fn run_case(&self, engine: EngineClient, suite: &str) -> TestOutcome;
}

impl Debug for dyn Testable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Testable({})", self.name())
    }
}

dyn_clone::clone_trait_object!(Testable);

/// Named, ordered group of test cases. Cases run strictly in registration
/// order; later cases may rely on state earlier ones created on the backend.
#[derive(Clone, Debug)]
pub struct Suite {
    pub name: String,
    pub description: String,
    pub tests: Vec<Box<dyn Testable>>,
}

impl Suite {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tests: vec![],
        }
    }

    pub fn add<T: Testable + 'static>(&mut self, test: T) {
        self.tests.push(Box::new(test))
    }
}

/// A running test case, handed to the test body with the engine client and
/// polling defaults already wired.
pub struct Test {
    pub engine: EngineClient,
    pub suite: String,
    pub name: String,
}

impl Test {
    /// Blocks until the submitted job reaches a terminal state, within the
    /// configured poll budget.
    pub async fn await_job(&self, job_id: &str) -> Result<Job, PollTimeoutError> {
        poller::await_completion(&self.engine, job_id, self.engine.poll_options()).await
    }
}

#[derive(Clone)]
pub struct TestSpec {
    // These fields end up in the report. Keep the name stable; the critical
    // gate and the test pattern both match on it.
    pub name: String,
    pub description: String,
    /// A failing critical test blocks the gate regardless of the overall
    /// success rate.
    pub critical: bool,
    pub run: AsyncTestFunc,
}

#[async_trait]
impl Testable for TestSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn critical(&self) -> bool {
        self.critical
    }

    async fn run_case(&self, engine: EngineClient, suite: &str) -> TestOutcome {
        let func = self.run;
        let name = self.name.clone();
        let suite = suite.to_string();

        // The body runs in its own task so a panic is contained and folded
        // into a failing outcome instead of tearing down the run.
        let joined = tokio::spawn(async move {
            let mut test = Test {
                engine,
                suite,
                name,
            };
            (func)(&mut test).await
        })
        .await;

        outcome_from_run(joined)
    }
}

/// Runs every suite and test strictly in registration order, isolating each
/// test behind its own failure boundary, and aggregates the outcomes. An
/// optional matcher narrows the run to matching suites/tests.
pub async fn run_suites(
    engine: &EngineClient,
    matcher: Option<&TestMatcher>,
    suites: Vec<Suite>,
) -> RunReport {
    let mut report = RunReport::new();

    for suite in suites {
        if let Some(matcher) = matcher {
            if !matcher.matches_suite(&suite.name) {
                tracing::info!(suite = %suite.name, "suite skipped by test pattern");
                continue;
            }
        }
        tracing::info!(suite = %suite.name, "running suite");

        for case in &suite.tests {
            if let Some(matcher) = matcher {
                if !matcher.matches(&suite.name, case.name()) {
                    continue;
                }
            }
            tracing::info!(suite = %suite.name, test = %case.name(), "running");
            let outcome = case.run_case(engine.clone(), &suite.name).await;
            if outcome.passed {
                tracing::info!(test = %case.name(), "PASS");
            } else {
                tracing::warn!(test = %case.name(), details = %outcome.details, "FAIL");
            }
            report.record(&suite.name, case.name(), case.critical(), outcome);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn engine() -> EngineClient {
        // Never dialed by these tests; the bodies don't touch the network.
        EngineClient::new(&EngineConfig::new("http://127.0.0.1:9"))
            .expect("client build should not fail")
    }

    crate::dyn_async! {
        async fn passing_case<'a>(_test: &'a mut Test) -> anyhow::Result<TestOutcome> {
            Ok(TestOutcome::pass("all good"))
        }
    }

    crate::dyn_async! {
        async fn failing_case<'a>(_test: &'a mut Test) -> anyhow::Result<TestOutcome> {
            Ok(TestOutcome::fail("expected marker missing"))
        }
    }

    crate::dyn_async! {
        async fn erroring_case<'a>(_test: &'a mut Test) -> anyhow::Result<TestOutcome> {
            anyhow::bail!("backend contract violated")
        }
    }

    crate::dyn_async! {
        async fn panicking_case<'a>(_test: &'a mut Test) -> anyhow::Result<TestOutcome> {
            panic!("index out of bounds in test body")
        }
    }

    fn spec(name: &str, critical: bool, run: AsyncTestFunc) -> TestSpec {
        TestSpec {
            name: name.to_string(),
            description: String::new(),
            critical,
            run,
        }
    }

    #[tokio::test]
    async fn test_report_totals_match_registrations() {
        let mut suite = Suite::new("smoke", "");
        suite.add(spec("one", false, passing_case));
        suite.add(spec("two", false, failing_case));
        suite.add(spec("three", false, passing_case));

        let report = run_suites(&engine(), None, vec![suite]).await;
        assert_eq!(report.total(), 3);
        assert_eq!(report.passed() + report.failed(), report.total());
        assert_eq!(report.passed(), 2);
    }

    #[tokio::test]
    async fn test_cases_run_in_registration_order() {
        let mut suite = Suite::new("ordered", "");
        for name in ["create", "update", "delete", "verify"] {
            suite.add(spec(name, false, passing_case));
        }

        let report = run_suites(&engine(), None, vec![suite]).await;
        let names: Vec<&str> = report
            .outcomes
            .iter()
            .map(|case| case.name.as_str())
            .collect();
        assert_eq!(names, ["create", "update", "delete", "verify"]);
    }

    #[tokio::test]
    async fn test_error_is_contained_as_failing_outcome() {
        let mut suite = Suite::new("smoke", "");
        suite.add(spec("flaky", false, erroring_case));

        let report = run_suites(&engine(), None, vec![suite]).await;
        assert_eq!(report.failed(), 1);
        let details = &report.outcomes[0].outcome.details;
        assert!(details.starts_with("ERROR:"), "{details}");
        assert!(details.contains("backend contract violated"));
    }

    #[tokio::test]
    async fn test_panic_is_contained_and_following_tests_still_run() {
        let mut suite = Suite::new("smoke", "");
        suite.add(spec("explodes", false, panicking_case));
        suite.add(spec("survivor", false, passing_case));

        let report = run_suites(&engine(), None, vec![suite]).await;
        assert_eq!(report.total(), 2);
        assert!(!report.outcomes[0].outcome.passed);
        assert!(report.outcomes[0]
            .outcome
            .details
            .contains("PANIC: index out of bounds in test body"));
        assert!(report.outcomes[1].outcome.passed);
    }

    #[tokio::test]
    async fn test_matcher_narrows_the_run() {
        let mut health = Suite::new("health", "");
        health.add(spec("service_reachable", false, passing_case));
        let mut library = Suite::new("library", "");
        library.add(spec("list_articles", false, passing_case));
        library.add(spec("delete_article", false, passing_case));

        let matcher = TestMatcher::new("library/delete").expect("valid pattern");
        let report = run_suites(&engine(), Some(&matcher), vec![health, library]).await;
        assert_eq!(report.total(), 1);
        assert_eq!(report.outcomes[0].name, "delete_article");
    }
}
