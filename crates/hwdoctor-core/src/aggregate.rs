//! Fold raw probe results into the normalized metric mapping.
//!
//! This is the single point of truth for unit conversions: temperatures end
//! up in °C, capacities in bytes, fractions in 0–100 percentages. Probes may
//! report in any native unit as long as they tag it.
//!
//! Merge rule: results fold in arrival order (which equals registration
//! order); within a category, a duplicate metric name is resolved by higher
//! declared confidence, ties keeping the earlier probe's value. Failed
//! probes contribute nothing — their categories simply stay sparse, and the
//! scorer skips rules that need them.

use std::collections::BTreeMap;

use crate::metric::{Category, Metric, MetricValue, ProbeResult, Unit};

/// Category → metric name → metric, with deterministic key order.
pub type MetricMap = BTreeMap<Category, BTreeMap<String, Metric>>;

/// Merge successful probe results into one normalized metric mapping.
pub fn merge_results(results: &[ProbeResult]) -> MetricMap {
    let mut map: MetricMap = BTreeMap::new();

    for result in results {
        if !result.is_success() {
            continue;
        }
        let category_map = map.entry(result.category).or_default();
        for metric in result.metrics() {
            let Some(normalized) = normalize(metric.clone()) else {
                log::warn!(
                    "dropping malformed metric {}/{} from probe {}",
                    result.category,
                    metric.name,
                    result.probe_id
                );
                continue;
            };
            match category_map.get(&normalized.name) {
                // Earlier probe wins on equal confidence.
                Some(existing) if existing.confidence >= normalized.confidence => {}
                _ => {
                    category_map.insert(normalized.name.clone(), normalized);
                }
            }
        }
    }

    map
}

/// Normalize one metric's units. Returns `None` for values that cannot be
/// scored or displayed sensibly (non-finite numerics).
fn normalize(metric: Metric) -> Option<Metric> {
    let MetricValue::Numeric { value, unit } = metric.value else {
        return Some(metric);
    };
    if !value.is_finite() {
        return None;
    }

    let (value, unit) = match unit {
        Unit::Fahrenheit => ((value - 32.0) * 5.0 / 9.0, Unit::Celsius),
        Unit::Kelvin => (value - 273.15, Unit::Celsius),
        Unit::Kibibytes => (value * 1024.0, Unit::Bytes),
        Unit::Mebibytes => (value * 1024.0 * 1024.0, Unit::Bytes),
        Unit::Gibibytes => (value * 1024.0 * 1024.0 * 1024.0, Unit::Bytes),
        Unit::Ratio => ((value * 100.0).clamp(0.0, 100.0), Unit::Percent),
        Unit::Percent => (value.clamp(0.0, 100.0), Unit::Percent),
        other => (value, other),
    };

    Some(Metric {
        value: MetricValue::Numeric { value, unit },
        ..metric
    })
}
