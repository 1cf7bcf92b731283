//! Battery detector.
//!
//! On Linux batteries appear under `/sys/class/power_supply/BAT*`; health
//! is the ratio of current full-charge capacity to the design capacity.
//! macOS reports the same figures through `ioreg`. Desktops without a
//! battery yield an unavailable failure rather than an empty success.

use std::time::Duration;

use crate::metric::{Category, Metric, ProbeError};
use crate::probe::{CancelToken, Probe, ProbeDescriptor, ResourceClass};
#[cfg(any(target_os = "linux", target_os = "macos"))]
use crate::metric::{Confidence, Unit};
#[cfg(target_os = "linux")]
use crate::probes::helpers::{read_parsed, read_trimmed};
#[cfg(target_os = "linux")]
use std::path::Path;

static BATTERY_DESCRIPTOR: ProbeDescriptor = ProbeDescriptor {
    id: "battery",
    category: Category::Battery,
    timeout: Duration::from_secs(5),
    is_benchmark: false,
    resource: ResourceClass::None,
};

pub struct BatteryProbe;

impl Probe for BatteryProbe {
    fn descriptor(&self) -> &ProbeDescriptor {
        &BATTERY_DESCRIPTOR
    }

    fn collect(&self, _cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError> {
        collect_battery()
    }
}

#[cfg(target_os = "linux")]
fn collect_battery() -> Result<Vec<Metric>, ProbeError> {
    let Some(bat) = find_battery() else {
        return Err(ProbeError::Unavailable("no battery present".into()));
    };

    let mut metrics = Vec::new();

    if let Some(pct) = read_parsed::<f64>(bat.join("capacity")) {
        metrics.push(Metric::numeric("charge", pct, Unit::Percent, Confidence::Reported));
    }
    if let Some(status) = read_trimmed(bat.join("status")) {
        metrics.push(Metric::state("status", status, Confidence::Reported));
    }
    if let Some(cycles) = read_parsed::<f64>(bat.join("cycle_count")) {
        metrics.push(Metric::numeric("cycle_count", cycles, Unit::Count, Confidence::Reported));
    }

    // Health = full-charge capacity / design capacity. Firmware exposes
    // either energy_* (µWh) or charge_* (µAh) depending on the driver.
    let health = capacity_ratio(&bat, "energy_full", "energy_full_design")
        .or_else(|| capacity_ratio(&bat, "charge_full", "charge_full_design"));
    if let Some(ratio) = health {
        metrics.push(Metric::numeric("health", ratio, Unit::Ratio, Confidence::Reported));
    }

    if metrics.is_empty() {
        return Err(ProbeError::Malformed(format!(
            "battery at {} exposes no readable attributes",
            bat.display()
        )));
    }
    Ok(metrics)
}

#[cfg(target_os = "linux")]
fn find_battery() -> Option<std::path::PathBuf> {
    let entries = std::fs::read_dir("/sys/class/power_supply").ok()?;
    let mut batteries: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("BAT"))
        })
        .collect();
    batteries.sort();
    batteries.into_iter().next()
}

#[cfg(target_os = "linux")]
fn capacity_ratio(bat: &Path, full: &str, design: &str) -> Option<f64> {
    let full = read_parsed::<f64>(bat.join(full))?;
    let design = read_parsed::<f64>(bat.join(design))?;
    (design > 0.0).then(|| (full / design).min(1.0))
}

#[cfg(target_os = "macos")]
fn collect_battery() -> Result<Vec<Metric>, ProbeError> {
    use crate::probes::helpers::run_command;

    let out = run_command("ioreg", &["-rn", "AppleSmartBattery"])
        .ok_or_else(|| ProbeError::Unavailable("no battery present".into()))?;

    let field = |key: &str| -> Option<f64> {
        out.lines().find_map(|line| {
            let (k, v) = line.split_once('=')?;
            k.contains(key).then(|| v.trim().parse::<f64>().ok())?
        })
    };

    let mut metrics = Vec::new();
    if let (Some(current), Some(max)) = (field("\"CurrentCapacity\""), field("\"MaxCapacity\"")) {
        if max > 0.0 {
            metrics.push(Metric::numeric(
                "charge",
                current / max * 100.0,
                Unit::Percent,
                Confidence::Reported,
            ));
        }
    }
    if let Some(cycles) = field("\"CycleCount\"") {
        metrics.push(Metric::numeric("cycle_count", cycles, Unit::Count, Confidence::Reported));
    }
    if let (Some(max), Some(design)) = (field("\"MaxCapacity\""), field("\"DesignCapacity\"")) {
        if design > 0.0 {
            metrics.push(Metric::numeric(
                "health",
                (max / design).min(1.0),
                Unit::Ratio,
                Confidence::Reported,
            ));
        }
    }

    if metrics.is_empty() {
        return Err(ProbeError::Unavailable("no battery present".into()));
    }
    Ok(metrics)
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn collect_battery() -> Result<Vec<Metric>, ProbeError> {
    Err(ProbeError::Unavailable(
        "battery detection not supported on this platform".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::run_probe;

    #[test]
    fn descriptor_shape() {
        let desc = BatteryProbe.descriptor();
        assert_eq!(desc.id, "battery");
        assert_eq!(desc.category, Category::Battery);
    }

    #[test]
    fn absent_battery_is_unavailable_not_panic() {
        // On battery-less hosts the collect must surface a clean failure.
        let cancel = CancelToken::new();
        let result = run_probe(&BatteryProbe, &cancel);
        match result.outcome {
            crate::metric::ProbeOutcome::Success { ref metrics } => assert!(!metrics.is_empty()),
            crate::metric::ProbeOutcome::Failure { ref reason, .. } => {
                assert!(matches!(
                    reason,
                    ProbeError::Unavailable(_) | ProbeError::Malformed(_)
                ));
            }
        }
    }
}
