//! Esperar: adaptive wait/retry engine for browser UI test automation.
//!
//! Esperar (Spanish: "to wait") is the synchronization core of a UI test
//! harness: it decides how long and how to wait for an element to become
//! actionable, recovers transparently from stale element handles
//! mid-interaction, and decides — thread-safely — whether a failed test
//! should be re-executed and how many times.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ worker thread                                                    │
//! │                                                                  │
//! │  SessionRegistry ──► SessionHandle (one per worker)              │
//! │        │                                                         │
//! │        ▼                                                         │
//! │  Interactor ──► ConditionEvaluator ──► UiDriver (seam)           │
//! │   locate+act      poll until ready                               │
//! └──────────────────────────────────────────────────────────────────┘
//!          │ pass/fail per attempt
//!          ▼
//!    RetryTracker ◄── Harness (one record per raw attempt)
//! ```
//!
//! Browser lifecycle, report rendering, and locator tables are the
//! embedding project's concern: it implements [`driver::UiDriver`] /
//! [`driver::SessionFactory`] and consumes [`runner::AttemptRecord`]s.

#![warn(missing_docs)]

pub mod config;
pub mod driver;
pub mod interact;
pub mod locator;
pub mod mock;
pub mod page;
pub mod result;
pub mod retry;
pub mod runner;
pub mod session;
pub mod wait;

pub use config::{BrowserKind, Settings};
pub use driver::{BoundingBox, ElementHandle, SessionFactory, UiDriver};
pub use interact::{Interactor, STALE_RETRY_ATTEMPTS};
pub use locator::{Locator, Selector};
pub use page::PageObject;
pub use result::{EsperarError, EsperarResult};
pub use retry::{test_identity, RetryTracker};
pub use runner::{
    install_tracing, AttemptRecord, Harness, SuiteReport, TestCase, TestSuite,
};
pub use session::{SessionHandle, SessionRegistry};
pub use wait::{ConditionEvaluator, WaitOptions, WaitStrategy};
