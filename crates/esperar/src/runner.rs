//! Suite execution: sessions, retries, and raw attempt records.
//!
//! The harness is the integration layer between the engine and an external
//! reporting system. It owns the retry tracker and the session registry for
//! the lifetime of one suite run, executes each test in a fresh per-worker
//! session, re-executes failed tests while the tracker allows it, and emits
//! one [`AttemptRecord`] per raw attempt — a test that fails once and then
//! passes reports a failure record and a success record. Aggregating or
//! suppressing that noise is the reporting collaborator's concern.

use crate::config::Settings;
use crate::driver::SessionFactory;
use crate::result::EsperarResult;
use crate::retry::{test_identity, RetryTracker};
use crate::session::{SessionHandle, SessionRegistry};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Install a `tracing` subscriber reading `RUST_LOG`, defaulting to `info`.
/// Safe to call more than once; later calls are no-ops.
pub fn install_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Body of one test method, run against the worker's session
pub type TestFn = Box<dyn Fn(&SessionHandle) -> EsperarResult<()> + Send + Sync>;

/// A single named test
pub struct TestCase {
    /// Test name, unique within its suite
    pub name: String,
    run: TestFn,
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TestCase {
    /// Create a test case from a name and body
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        run: impl Fn(&SessionHandle) -> EsperarResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }
}

/// A named collection of tests
#[derive(Debug, Default)]
pub struct TestSuite {
    /// Suite name
    pub name: String,
    tests: Vec<TestCase>,
}

impl TestSuite {
    /// Create an empty suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: Vec::new(),
        }
    }

    /// Add a test case
    pub fn add_test(&mut self, test: TestCase) {
        self.tests.push(test);
    }

    /// Number of tests in the suite
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }
}

/// One raw execution of one test
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    /// Test name
    pub test: String,
    /// 1-based attempt number for this test
    pub attempt: u32,
    /// Whether this attempt passed
    pub passed: bool,
    /// Failure message, when it did not
    pub error: Option<String>,
    /// Wall-clock duration of the attempt
    pub duration: Duration,
    /// Base64 PNG captured at failure, when configured
    pub screenshot: Option<String>,
}

/// Every attempt record from one suite run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    /// Suite name
    pub suite: String,
    /// Raw attempt records, in completion order per worker
    pub records: Vec<AttemptRecord>,
    /// Total suite duration
    pub duration: Duration,
}

impl SuiteReport {
    /// Whether every attempt passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.records.iter().all(|r| r.passed)
    }

    /// Number of passing attempts
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.records.iter().filter(|r| r.passed).count()
    }

    /// Number of failing attempts
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.records.iter().filter(|r| !r.passed).count()
    }

    /// Total number of attempts
    #[must_use]
    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// The failing attempts
    #[must_use]
    pub fn failures(&self) -> Vec<&AttemptRecord> {
        self.records.iter().filter(|r| !r.passed).collect()
    }

    /// Records for one test, in attempt order
    #[must_use]
    pub fn attempts_of(&self, test: &str) -> Vec<&AttemptRecord> {
        self.records.iter().filter(|r| r.test == test).collect()
    }

    /// Serialize the report for an external renderer
    ///
    /// # Errors
    ///
    /// JSON serialization failure.
    pub fn to_json(&self) -> EsperarResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Executes suites: one fresh session per attempt, flaky retries, raw
/// per-attempt reporting
pub struct Harness {
    settings: Settings,
    factory: Box<dyn SessionFactory>,
    registry: SessionRegistry,
    tracker: RetryTracker,
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("settings", &self.settings)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl Harness {
    /// Create a harness; the retry budget comes from `settings.retry_count`
    #[must_use]
    pub fn new(settings: Settings, factory: Box<dyn SessionFactory>) -> Self {
        let tracker = RetryTracker::new(settings.retry_count);
        Self {
            settings,
            factory,
            registry: SessionRegistry::new(),
            tracker,
        }
    }

    /// The session registry owned by this harness
    #[must_use]
    pub const fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// The retry tracker owned by this harness
    #[must_use]
    pub const fn tracker(&self) -> &RetryTracker {
        &self.tracker
    }

    /// Run every test sequentially on the calling thread
    pub fn run(&self, suite: &TestSuite) -> SuiteReport {
        info!(suite = %suite.name, tests = suite.test_count(), "suite started");
        let start = Instant::now();
        let mut records = Vec::new();
        for test in &suite.tests {
            records.extend(self.run_test(&suite.name, test));
        }
        self.finish(suite, records, start)
    }

    /// Run each test on its own worker thread. Workers never share mutable
    /// application state: each acquires its own session, and the only
    /// cross-thread structures are the tracker's counters and the
    /// registry's map.
    pub fn run_parallel(&self, suite: &TestSuite) -> SuiteReport {
        info!(suite = %suite.name, tests = suite.test_count(), "suite started (parallel)");
        let start = Instant::now();
        let mut records = Vec::new();
        thread::scope(|scope| {
            let workers: Vec<_> = suite
                .tests
                .iter()
                .map(|test| scope.spawn(move || self.run_test(&suite.name, test)))
                .collect();
            for worker in workers {
                records.extend(worker.join().unwrap_or_default());
            }
        });
        self.finish(suite, records, start)
    }

    fn finish(
        &self,
        suite: &TestSuite,
        records: Vec<AttemptRecord>,
        start: Instant,
    ) -> SuiteReport {
        // Counters must not leak into an independent suite run
        self.tracker.reset_all();
        let report = SuiteReport {
            suite: suite.name.clone(),
            records,
            duration: start.elapsed(),
        };
        info!(
            suite = %suite.name,
            passed = report.passed_count(),
            failed = report.failed_count(),
            "suite finished"
        );
        report
    }

    /// Execute one test, re-running it while the tracker allows
    fn run_test(&self, suite_name: &str, test: &TestCase) -> Vec<AttemptRecord> {
        let identity = test_identity(&format!("{suite_name}.{}", test.name));
        let mut records = Vec::new();
        let mut attempt = 1;
        loop {
            let (record, fatal) = self.run_attempt(test, attempt);
            let failed = !record.passed;
            records.push(record);
            if fatal || !self.tracker.should_retry(&identity, failed) {
                break;
            }
            attempt += 1;
        }
        records
    }

    /// One raw attempt in a fresh session. The session is always released,
    /// and a failed acquire aborts the test without consulting the tracker.
    fn run_attempt(&self, test: &TestCase, attempt: u32) -> (AttemptRecord, bool) {
        info!(test = %test.name, attempt, "test attempt started");
        let start = Instant::now();

        let session = match self.registry.acquire(self.factory.as_ref(), &self.settings) {
            Ok(session) => session,
            Err(e) => {
                error!(test = %test.name, error = %e, "aborting test, no session");
                return (
                    AttemptRecord {
                        test: test.name.clone(),
                        attempt,
                        passed: false,
                        error: Some(e.to_string()),
                        duration: start.elapsed(),
                        screenshot: None,
                    },
                    true,
                );
            }
        };

        let outcome = (test.run)(&session);
        let screenshot = match &outcome {
            Err(_) if self.settings.screenshot_on_failure => Self::capture(&session),
            _ => None,
        };
        self.registry.release();

        let record = match outcome {
            Ok(()) => {
                info!(test = %test.name, attempt, "test attempt passed");
                AttemptRecord {
                    test: test.name.clone(),
                    attempt,
                    passed: true,
                    error: None,
                    duration: start.elapsed(),
                    screenshot: None,
                }
            }
            Err(e) => {
                error!(test = %test.name, attempt, error = %e, "test attempt failed");
                AttemptRecord {
                    test: test.name.clone(),
                    attempt,
                    passed: false,
                    error: Some(e.to_string()),
                    duration: start.elapsed(),
                    screenshot,
                }
            }
        };
        (record, false)
    }

    /// Best-effort failure screenshot; never fails the attempt
    fn capture(session: &SessionHandle) -> Option<String> {
        let driver = session.driver().ok()?;
        match driver.screenshot() {
            Ok(png) => Some(STANDARD.encode(png)),
            Err(e) => {
                debug!(error = %e, "screenshot capture failed");
                None
            }
        }
    }
}
