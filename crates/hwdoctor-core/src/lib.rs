//! # hwdoctor-core
//!
//! **A health check-up for your machine.**
//!
//! `hwdoctor-core` probes the hardware it runs on — CPU, memory, storage,
//! GPU, battery, network — runs optional synthetic benchmarks, and distills
//! everything into a deterministic 0–100 health score with per-finding
//! explanations.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hwdoctor_core::{CancelToken, Orchestrator, OrchestratorConfig, build_report, default_probes};
//!
//! let mut orchestrator = Orchestrator::new(OrchestratorConfig::default());
//! for probe in default_probes() {
//!     orchestrator.register(probe);
//! }
//! let run = orchestrator.run(&CancelToken::new())?;
//! let report = build_report(run);
//! println!("score {} ({})", report.score, report.band);
//! # Ok::<(), hwdoctor_core::OrchestrateError>(())
//! ```
//!
//! ## Architecture
//!
//! Probes → Orchestrator (fan-out, timeouts) → Merge → Score → Report
//!
//! Every probe implements the [`Probe`] trait and is isolated by the
//! [`Orchestrator`]: a hung probe times out, a panicking probe becomes a
//! failed result, and neither takes down the run. Detectors execute in
//! parallel waves; benchmarks run one at a time per resource class so
//! their numbers do not contaminate each other. The merged metric map and
//! the scoring rules both iterate in a fixed order, so identical inputs
//! always yield identical findings and score.

pub mod aggregate;
pub mod metric;
pub mod orchestrator;
pub mod probe;
pub mod probes;
pub mod report;
pub mod score;

pub use aggregate::{MetricMap, merge_results};
pub use metric::{
    BenchmarkKind, Category, Confidence, Metric, MetricValue, ProbeError, ProbeOutcome,
    ProbeResult, Unit,
};
pub use orchestrator::{OrchestrateError, Orchestrator, OrchestratorConfig, OrchestratorRun};
pub use probe::{CancelToken, Probe, ProbeDescriptor, ResourceClass, run_probe};
pub use probes::{available_probes, default_probes};
pub use report::{
    MachineInfo, ReportModel, build_report, detect_machine_info, format_iso8601,
    format_timestamp_compact,
};
pub use score::{Finding, ScoreSummary, Severity, SeverityBand, evaluate};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
