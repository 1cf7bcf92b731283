//! Shared value model for all measurements.
//!
//! Every probe — detector or benchmark — reports its output as a list of
//! [`Metric`] values. Probes may use any native unit they like; the
//! aggregator is the single point of unit normalization.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hardware/benchmark domain a probe belongs to.
///
/// Serializes as its display string (`"cpu"`, `"benchmark:disk"`) so the
/// metric map keys stay readable JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Cpu,
    Memory,
    Storage,
    Gpu,
    Battery,
    Network,
    /// Performance benchmark, qualified by the resource it exercises.
    Benchmark(BenchmarkKind),
}

/// Which resource a benchmark exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BenchmarkKind {
    Cpu,
    Memory,
    Disk,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Memory => write!(f, "memory"),
            Self::Storage => write!(f, "storage"),
            Self::Gpu => write!(f, "gpu"),
            Self::Battery => write!(f, "battery"),
            Self::Network => write!(f, "network"),
            Self::Benchmark(kind) => write!(f, "benchmark:{kind}"),
        }
    }
}

impl std::fmt::Display for BenchmarkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Memory => write!(f, "memory"),
            Self::Disk => write!(f, "disk"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Self::Cpu),
            "memory" => Ok(Self::Memory),
            "storage" => Ok(Self::Storage),
            "gpu" => Ok(Self::Gpu),
            "battery" => Ok(Self::Battery),
            "network" => Ok(Self::Network),
            "benchmark:cpu" => Ok(Self::Benchmark(BenchmarkKind::Cpu)),
            "benchmark:memory" => Ok(Self::Benchmark(BenchmarkKind::Memory)),
            "benchmark:disk" => Ok(Self::Benchmark(BenchmarkKind::Disk)),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

impl Serialize for Category {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Unit tag for numeric metric values.
///
/// Probes report in whatever unit the platform hands them; the aggregator
/// converts temperatures to °C, capacities to bytes, and ratios to 0–100
/// percentages. Everything else passes through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Celsius,
    Fahrenheit,
    Kelvin,
    Bytes,
    Kibibytes,
    Mebibytes,
    Gibibytes,
    /// 0–100.
    Percent,
    /// 0.0–1.0 fraction, normalized to `Percent`.
    Ratio,
    Megahertz,
    Watts,
    MegabitsPerSec,
    MegabytesPerSec,
    GigabytesPerSec,
    Count,
    Seconds,
}

/// A single measured or reported value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricValue {
    Numeric { value: f64, unit: Unit },
    /// Discrete state, e.g. SMART status `"PASSED"`/`"FAILED"`.
    State(String),
    /// Free text, e.g. a CPU brand string.
    Text(String),
}

/// How trustworthy a value is. Higher wins when two probes report the same
/// metric name within one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    /// Derived or guessed (e.g. disk type inferred from the device name).
    Estimated,
    /// Read from an OS counter or vendor tool.
    Reported,
    /// Actively measured by us (e.g. a sampled usage percentage).
    Measured,
}

/// A named, typed value with a confidence tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: MetricValue,
    pub confidence: Confidence,
}

impl Metric {
    pub fn numeric(name: impl Into<String>, value: f64, unit: Unit, confidence: Confidence) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Numeric { value, unit },
            confidence,
        }
    }

    pub fn state(name: impl Into<String>, state: impl Into<String>, confidence: Confidence) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::State(state.into()),
            confidence,
        }
    }

    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Text(text.into()),
            confidence: Confidence::Reported,
        }
    }

    /// Numeric value if this metric is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            MetricValue::Numeric { value, .. } => Some(value),
            _ => None,
        }
    }

    /// State string if this metric is a discrete state.
    pub fn as_state(&self) -> Option<&str> {
        match &self.value {
            MetricValue::State(s) => Some(s),
            _ => None,
        }
    }
}

/// Why a probe failed. Every probe-level error is caught at the adapter
/// boundary and converted into one of these — nothing propagates past it.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("probe unavailable: {0}")]
    Unavailable(String),
    #[error("malformed probe output: {0}")]
    Malformed(String),
    #[error("orchestration cancelled")]
    Cancelled,
}

/// Outcome of one probe run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProbeOutcome {
    Success {
        metrics: Vec<Metric>,
    },
    Failure {
        reason: ProbeError,
        /// Whatever the probe managed to collect before failing. Kept for
        /// display; never merged into the scoring metric map.
        partial_metrics: Vec<Metric>,
    },
}

/// One probe's result, identified by probe id and category.
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub probe_id: String,
    pub category: Category,
    pub outcome: ProbeOutcome,
    pub elapsed: Duration,
}

impl ProbeResult {
    pub fn success(
        probe_id: impl Into<String>,
        category: Category,
        metrics: Vec<Metric>,
        elapsed: Duration,
    ) -> Self {
        Self {
            probe_id: probe_id.into(),
            category,
            outcome: ProbeOutcome::Success { metrics },
            elapsed,
        }
    }

    pub fn failure(
        probe_id: impl Into<String>,
        category: Category,
        reason: ProbeError,
        elapsed: Duration,
    ) -> Self {
        Self {
            probe_id: probe_id.into(),
            category,
            outcome: ProbeOutcome::Failure {
                reason,
                partial_metrics: Vec::new(),
            },
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Success { .. })
    }

    /// Metrics from a successful run, empty slice otherwise.
    pub fn metrics(&self) -> &[Metric] {
        match &self.outcome {
            ProbeOutcome::Success { metrics } => metrics,
            ProbeOutcome::Failure { .. } => &[],
        }
    }
}
