//! Deterministic rule-based health scoring.
//!
//! Scoring starts at 100 and evaluates a fixed, ordered rule table against
//! the normalized metric mapping — never the raw probe results. A rule whose
//! metric is absent (category failed, metric missing) is skipped silently;
//! a matching rule appends a [`Finding`] and subtracts its points. Rules are
//! independent: all of them are evaluated, so one metric can trigger several
//! findings. Tiered threshold pairs are mutually exclusive by predicate, so
//! only the highest matching tier fires. Per-device rules match every device
//! instance independently, in metric key order.
//!
//! Pure function of the metric map: same input, same findings, same score.

use serde::{Deserialize, Serialize};

use crate::aggregate::MetricMap;
use crate::metric::{Category, Metric};

// Threshold contract. These exact values are the behavioral contract of the
// scorer; rendering layers must not re-derive any of this.
pub const TEMP_CPU_WARNING: f64 = 75.0;
pub const TEMP_CPU_CRITICAL: f64 = 90.0;
pub const TEMP_DISK_WARNING: f64 = 55.0;
pub const RAM_USAGE_WARNING: f64 = 75.0;
pub const RAM_USAGE_CRITICAL: f64 = 90.0;
pub const DISK_USAGE_CRITICAL: f64 = 95.0;
pub const BATTERY_HEALTH_FAIR: f64 = 60.0;

/// How serious a triggered finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A triggered scoring rule with its point deduction and message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub rule_id: &'static str,
    pub severity: Severity,
    pub points: u32,
    pub message: String,
}

/// Coarse classification of the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeverityBand {
    Healthy,
    Attention,
    Critical,
}

impl SeverityBand {
    /// Band boundaries: ≥80 healthy, 60–79 attention, <60 critical.
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Self::Healthy,
            60..=79 => Self::Attention,
            _ => Self::Critical,
        }
    }
}

impl std::fmt::Display for SeverityBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "Healthy"),
            Self::Attention => write!(f, "Attention"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// Final scoring output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub findings: Vec<Finding>,
    /// Always within 0..=100.
    pub score: u8,
    pub band: SeverityBand,
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

/// Which metric(s) a rule reads.
enum Selector {
    /// A single well-known metric name.
    Exact(&'static str),
    /// Every metric named `{prefix}{device}{suffix}` — one evaluation per
    /// device instance.
    PerDevice {
        prefix: &'static str,
        suffix: &'static str,
    },
}

/// Condition over a single metric value.
enum Predicate {
    Above(f64),
    /// Strictly above `low` and at most `high` — the lower tier of a
    /// threshold pair, so it cannot fire together with the upper tier.
    Between(f64, f64),
    Below(f64),
    StateIs(&'static str),
}

impl Predicate {
    /// `Some(true/false)` when the metric has the right type for this
    /// predicate, `None` when it does not.
    fn matches(&self, metric: &Metric) -> Option<bool> {
        match self {
            Self::Above(t) => Some(metric.as_f64()? > *t),
            Self::Between(low, high) => {
                let v = metric.as_f64()?;
                Some(v > *low && v <= *high)
            }
            Self::Below(t) => Some(metric.as_f64()? < *t),
            Self::StateIs(s) => Some(metric.as_state()? == *s),
        }
    }
}

struct Rule {
    id: &'static str,
    category: Category,
    selector: Selector,
    predicate: Predicate,
    severity: Severity,
    points: u32,
    /// Builds the finding message from the device label (empty for exact
    /// selectors) and the matched metric.
    message: fn(&str, &Metric) -> String,
}

/// The fixed rule table, in evaluation (and therefore findings) order.
fn rules() -> [Rule; 9] {
    [
        Rule {
            id: "cpu_temp_critical",
            category: Category::Cpu,
            selector: Selector::Exact("temp"),
            predicate: Predicate::Above(TEMP_CPU_CRITICAL),
            severity: Severity::Critical,
            points: 20,
            message: |_, m| {
                format!(
                    "CPU temperature is dangerously high ({:.0}°C). Check cooling immediately.",
                    m.as_f64().unwrap_or_default()
                )
            },
        },
        Rule {
            id: "cpu_temp_high",
            category: Category::Cpu,
            selector: Selector::Exact("temp"),
            predicate: Predicate::Between(TEMP_CPU_WARNING, TEMP_CPU_CRITICAL),
            severity: Severity::Warning,
            points: 10,
            message: |_, m| {
                format!(
                    "CPU temperature is elevated ({:.0}°C). Consider improving airflow.",
                    m.as_f64().unwrap_or_default()
                )
            },
        },
        Rule {
            id: "cpu_throttling",
            category: Category::Cpu,
            selector: Selector::Exact("throttling"),
            predicate: Predicate::StateIs("yes"),
            severity: Severity::Critical,
            points: 15,
            message: |_, _| {
                "CPU is thermal throttling — performance is being reduced to prevent damage."
                    .to_string()
            },
        },
        Rule {
            id: "ram_usage_critical",
            category: Category::Memory,
            selector: Selector::Exact("usage"),
            predicate: Predicate::Above(RAM_USAGE_CRITICAL),
            severity: Severity::Critical,
            points: 15,
            message: |_, m| {
                format!(
                    "RAM usage is critically high ({:.0}%). Upgrade RAM or close applications.",
                    m.as_f64().unwrap_or_default()
                )
            },
        },
        Rule {
            id: "ram_usage_high",
            category: Category::Memory,
            selector: Selector::Exact("usage"),
            predicate: Predicate::Between(RAM_USAGE_WARNING, RAM_USAGE_CRITICAL),
            severity: Severity::Warning,
            points: 8,
            message: |_, m| {
                format!(
                    "RAM usage is high ({:.0}%). Consider adding more RAM.",
                    m.as_f64().unwrap_or_default()
                )
            },
        },
        Rule {
            id: "smart_failed",
            category: Category::Storage,
            selector: Selector::PerDevice {
                prefix: "disk.",
                suffix: ".smart_status",
            },
            predicate: Predicate::StateIs("FAILED"),
            severity: Severity::Critical,
            points: 30,
            message: |device, _| {
                format!("Drive {device} has FAILED S.M.A.R.T. status. Back up data immediately!")
            },
        },
        Rule {
            id: "drive_temp_high",
            category: Category::Storage,
            selector: Selector::PerDevice {
                prefix: "disk.",
                suffix: ".temp",
            },
            predicate: Predicate::Above(TEMP_DISK_WARNING),
            severity: Severity::Warning,
            points: 10,
            message: |device, m| {
                format!(
                    "Drive {device} is running hot ({:.0}°C). Check case airflow.",
                    m.as_f64().unwrap_or_default()
                )
            },
        },
        Rule {
            id: "partition_full",
            category: Category::Storage,
            selector: Selector::PerDevice {
                prefix: "part.",
                suffix: ".usage",
            },
            predicate: Predicate::Above(DISK_USAGE_CRITICAL),
            severity: Severity::Critical,
            points: 10,
            message: |device, m| {
                format!(
                    "Partition {device} is nearly full ({:.0}%). Free up space.",
                    m.as_f64().unwrap_or_default()
                )
            },
        },
        Rule {
            id: "battery_health_low",
            category: Category::Battery,
            selector: Selector::Exact("health"),
            predicate: Predicate::Below(BATTERY_HEALTH_FAIR),
            severity: Severity::Warning,
            points: 15,
            message: |_, m| {
                format!(
                    "Battery health is poor ({:.0}%). Consider replacing the battery.",
                    m.as_f64().unwrap_or_default()
                )
            },
        },
    ]
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate the rule table against a normalized metric mapping.
pub fn evaluate(metrics: &MetricMap) -> ScoreSummary {
    let mut findings = Vec::new();

    for rule in rules() {
        let Some(category_map) = metrics.get(&rule.category) else {
            continue;
        };

        match rule.selector {
            Selector::Exact(name) => {
                if let Some(metric) = category_map.get(name) {
                    apply(&rule, "", metric, &mut findings);
                }
            }
            Selector::PerDevice { prefix, suffix } => {
                // BTreeMap iteration keeps device order deterministic.
                for (name, metric) in category_map {
                    let Some(device) = name
                        .strip_prefix(prefix)
                        .and_then(|rest| rest.strip_suffix(suffix))
                    else {
                        continue;
                    };
                    if device.is_empty() {
                        continue;
                    }
                    apply(&rule, device, metric, &mut findings);
                }
            }
        }
    }

    let deducted: i64 = findings.iter().map(|f| i64::from(f.points)).sum();
    let score = (100 - deducted).clamp(0, 100) as u8;

    ScoreSummary {
        findings,
        score,
        band: SeverityBand::from_score(score),
    }
}

fn apply(rule: &Rule, device: &str, metric: &Metric, findings: &mut Vec<Finding>) {
    match rule.predicate.matches(metric) {
        Some(true) => findings.push(Finding {
            rule_id: rule.id,
            severity: rule.severity,
            points: rule.points,
            message: (rule.message)(device, metric),
        }),
        Some(false) => {}
        None => {
            log::warn!(
                "rule {} skipped: metric {} has the wrong value type",
                rule.id,
                metric.name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{Confidence, Metric, Unit};
    use std::collections::BTreeMap;

    fn map(entries: &[(Category, Metric)]) -> MetricMap {
        let mut map = MetricMap::new();
        for (category, metric) in entries {
            map.entry(*category)
                .or_insert_with(BTreeMap::new)
                .insert(metric.name.clone(), metric.clone());
        }
        map
    }

    fn cpu_temp(value: f64) -> (Category, Metric) {
        (
            Category::Cpu,
            Metric::numeric("temp", value, Unit::Celsius, Confidence::Measured),
        )
    }

    fn ram_usage(value: f64) -> (Category, Metric) {
        (
            Category::Memory,
            Metric::numeric("usage", value, Unit::Percent, Confidence::Measured),
        )
    }

    fn battery_health(value: f64) -> (Category, Metric) {
        (
            Category::Battery,
            Metric::numeric("health", value, Unit::Percent, Confidence::Reported),
        )
    }

    fn smart_status(device: &str, status: &str) -> (Category, Metric) {
        (
            Category::Storage,
            Metric::state(format!("disk.{device}.smart_status"), status, Confidence::Reported),
        )
    }

    fn rule_ids(summary: &ScoreSummary) -> Vec<&'static str> {
        summary.findings.iter().map(|f| f.rule_id).collect()
    }

    // -----------------------------------------------------------------------
    // Band boundaries (closed contract)
    // -----------------------------------------------------------------------

    #[test]
    fn band_boundaries() {
        assert_eq!(SeverityBand::from_score(100), SeverityBand::Healthy);
        assert_eq!(SeverityBand::from_score(80), SeverityBand::Healthy);
        assert_eq!(SeverityBand::from_score(79), SeverityBand::Attention);
        assert_eq!(SeverityBand::from_score(60), SeverityBand::Attention);
        assert_eq!(SeverityBand::from_score(59), SeverityBand::Critical);
        assert_eq!(SeverityBand::from_score(0), SeverityBand::Critical);
    }

    // -----------------------------------------------------------------------
    // Individual rules
    // -----------------------------------------------------------------------

    #[test]
    fn healthy_map_scores_100() {
        let summary = evaluate(&map(&[cpu_temp(45.0), ram_usage(30.0)]));
        assert!(summary.findings.is_empty());
        assert_eq!(summary.score, 100);
        assert_eq!(summary.band, SeverityBand::Healthy);
    }

    #[test]
    fn cpu_temp_tiers_are_exclusive() {
        // 95°C: only the critical tier, never both.
        let summary = evaluate(&map(&[cpu_temp(95.0)]));
        assert_eq!(rule_ids(&summary), ["cpu_temp_critical"]);
        assert_eq!(summary.score, 80);

        // 80°C: only the warning tier.
        let summary = evaluate(&map(&[cpu_temp(80.0)]));
        assert_eq!(rule_ids(&summary), ["cpu_temp_high"]);
        assert_eq!(summary.score, 90);

        // Exactly 90°C belongs to the warning tier (critical is strict >).
        let summary = evaluate(&map(&[cpu_temp(90.0)]));
        assert_eq!(rule_ids(&summary), ["cpu_temp_high"]);
    }

    #[test]
    fn ram_usage_tiers_are_exclusive() {
        let summary = evaluate(&map(&[ram_usage(95.0)]));
        assert_eq!(rule_ids(&summary), ["ram_usage_critical"]);

        let summary = evaluate(&map(&[ram_usage(80.0)]));
        assert_eq!(rule_ids(&summary), ["ram_usage_high"]);

        let summary = evaluate(&map(&[ram_usage(75.0)]));
        assert!(summary.findings.is_empty());
    }

    #[test]
    fn throttling_and_temp_can_both_fire() {
        let summary = evaluate(&map(&[
            cpu_temp(92.0),
            (
                Category::Cpu,
                Metric::state("throttling", "yes", Confidence::Measured),
            ),
        ]));
        assert_eq!(rule_ids(&summary), ["cpu_temp_critical", "cpu_throttling"]);
        assert_eq!(summary.score, 65);
    }

    #[test]
    fn smart_failed_fires_per_device() {
        let summary = evaluate(&map(&[
            smart_status("sda", "FAILED"),
            smart_status("sdb", "FAILED"),
            smart_status("sdc", "PASSED"),
        ]));
        assert_eq!(rule_ids(&summary), ["smart_failed", "smart_failed"]);
        assert_eq!(summary.score, 40);
        assert!(summary.findings[0].message.contains("sda"));
        assert!(summary.findings[1].message.contains("sdb"));
    }

    #[test]
    fn drive_temp_fires_per_device() {
        let mut entries = Vec::new();
        for device in ["sda", "sdb", "sdc"] {
            entries.push((
                Category::Storage,
                Metric::numeric(
                    format!("disk.{device}.temp"),
                    62.0,
                    Unit::Celsius,
                    Confidence::Reported,
                ),
            ));
        }
        let summary = evaluate(&map(&entries));
        assert_eq!(summary.findings.len(), 3);
        assert_eq!(summary.score, 70);
    }

    #[test]
    fn score_clamps_to_zero_with_enough_devices() {
        let entries: Vec<_> = ["sda", "sdb", "sdc", "sdd"]
            .iter()
            .map(|d| smart_status(d, "FAILED"))
            .collect();
        let summary = evaluate(&map(&entries));
        assert_eq!(summary.findings.len(), 4);
        // 100 - 120 clamps to 0.
        assert_eq!(summary.score, 0);
        assert_eq!(summary.band, SeverityBand::Critical);
    }

    #[test]
    fn partition_full_matches_mountpoint_devices() {
        let summary = evaluate(&map(&[(
            Category::Storage,
            Metric::numeric("part./home.usage", 97.5, Unit::Percent, Confidence::Reported),
        )]));
        assert_eq!(rule_ids(&summary), ["partition_full"]);
        assert!(summary.findings[0].message.contains("/home"));
    }

    #[test]
    fn battery_health_low() {
        let summary = evaluate(&map(&[battery_health(55.0)]));
        assert_eq!(rule_ids(&summary), ["battery_health_low"]);
        assert_eq!(summary.score, 85);

        let summary = evaluate(&map(&[battery_health(60.0)]));
        assert!(summary.findings.is_empty());
    }

    // -----------------------------------------------------------------------
    // Skipping
    // -----------------------------------------------------------------------

    #[test]
    fn missing_category_skips_its_rules() {
        // No storage data at all: no storage findings, score untouched.
        let summary = evaluate(&map(&[cpu_temp(45.0)]));
        assert!(summary.findings.is_empty());
        assert_eq!(summary.score, 100);
    }

    #[test]
    fn wrong_value_type_skips_rule() {
        // temp as free text cannot satisfy a numeric predicate.
        let summary = evaluate(&map(&[(
            Category::Cpu,
            Metric::text("temp", "hot"),
        )]));
        assert!(summary.findings.is_empty());
        assert_eq!(summary.score, 100);
    }

    #[test]
    fn unknown_metrics_are_invisible_to_rules() {
        let summary = evaluate(&map(&[(
            Category::Cpu,
            Metric::numeric("exotic_counter", 9000.0, Unit::Count, Confidence::Reported),
        )]));
        assert!(summary.findings.is_empty());
    }

    // -----------------------------------------------------------------------
    // Determinism / end-to-end
    // -----------------------------------------------------------------------

    #[test]
    fn scoring_is_idempotent() {
        let metrics = map(&[cpu_temp(92.0), ram_usage(80.0), battery_health(50.0)]);
        let first = evaluate(&metrics);
        let second = evaluate(&metrics);
        assert_eq!(first, second);
    }

    #[test]
    fn end_to_end_contract_example() {
        // cpu.temp=92, ram.usage=80, battery.health=50
        // → [CPU>90 (−20), RAM>75 (−8), Battery<60 (−15)], score 57, Critical.
        let summary = evaluate(&map(&[cpu_temp(92.0), ram_usage(80.0), battery_health(50.0)]));
        assert_eq!(
            rule_ids(&summary),
            ["cpu_temp_critical", "ram_usage_high", "battery_health_low"]
        );
        let points: Vec<u32> = summary.findings.iter().map(|f| f.points).collect();
        assert_eq!(points, [20, 8, 15]);
        assert_eq!(summary.score, 57);
        assert_eq!(summary.band, SeverityBand::Critical);
    }
}
