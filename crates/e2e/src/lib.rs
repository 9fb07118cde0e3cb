//! Tally E2E Test Framework
//!
//! This crate provides a Rust-controlled E2E testing framework that:
//! - Spawns the counter web server as a subprocess
//! - Drives a real browser through Playwright scripts run via `node`
//! - Parses declarative YAML test specs
//! - Performs visual regression testing with baseline screenshots
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start_server() -> ServerHandle                       │
//! │    ├── run_spec(spec: TestSpec) -> TestResult               │
//! │    │     └── PlaywrightHandle::run_steps (one script/spec)  │
//! │    └── VisualTester::compare(actual, baseline) -> Diff      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestSpec (YAML)                                            │
//! │    ├── name, description, tags                              │
//! │    ├── steps: [Step]                                        │
//! │    │     ├── navigate { url }                               │
//! │    │     ├── click { selector, count }                      │
//! │    │     ├── press { selector?, key }                       │
//! │    │     ├── assert { selector, text? | matches? | ... }    │
//! │    │     └── screenshot { name, full_page? }                │
//! │    └── visual_regression: bool                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each spec is compiled into a single Playwright script so that page
//! state (the counter value, pending fetches) carries across steps the
//! way it does for a person using the app.

pub mod runner;
pub mod spec;
pub mod visual;
pub mod playwright;
pub mod server;
pub mod error;

pub use runner::TestRunner;
pub use spec::{TestSpec, TestStep};
pub use error::{E2eError, E2eResult};
