//! Memory detector — totals, usage, swap.
//!
//! Linux reads `/proc/meminfo`. macOS reports the physical total via
//! `sysctl` and derives usage from `vm_stat` page counts.

use std::time::Duration;

use crate::metric::{Category, Confidence, Metric, ProbeError, Unit};
use crate::probe::{CancelToken, Probe, ProbeDescriptor, ResourceClass};
#[cfg(target_os = "linux")]
use crate::probes::helpers::kv_value;
#[cfg(target_os = "macos")]
use crate::probes::helpers::run_command;

static MEMORY_DESCRIPTOR: ProbeDescriptor = ProbeDescriptor {
    id: "memory",
    category: Category::Memory,
    timeout: Duration::from_secs(5),
    is_benchmark: false,
    resource: ResourceClass::None,
};

pub struct MemoryProbe;

impl Probe for MemoryProbe {
    fn descriptor(&self) -> &ProbeDescriptor {
        &MEMORY_DESCRIPTOR
    }

    fn collect(&self, _cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError> {
        collect_memory()
    }
}

#[cfg(target_os = "linux")]
fn collect_memory() -> Result<Vec<Metric>, ProbeError> {
    let meminfo = std::fs::read_to_string("/proc/meminfo")
        .map_err(|e| ProbeError::Unavailable(format!("cannot read /proc/meminfo: {e}")))?;

    let field = |key: &str| -> Option<f64> {
        meminfo
            .lines()
            .find_map(|line| kv_value(line, key)?.split_whitespace().next()?.parse().ok())
    };

    let total_kib = field("MemTotal")
        .ok_or_else(|| ProbeError::Malformed("MemTotal missing from /proc/meminfo".into()))?;
    let available_kib = field("MemAvailable").unwrap_or(0.0);
    let used_kib = (total_kib - available_kib).max(0.0);

    let mut metrics = vec![
        Metric::numeric("total", total_kib, Unit::Kibibytes, Confidence::Reported),
        Metric::numeric("available", available_kib, Unit::Kibibytes, Confidence::Reported),
        Metric::numeric("used", used_kib, Unit::Kibibytes, Confidence::Reported),
    ];
    if total_kib > 0.0 {
        metrics.push(Metric::numeric(
            "usage",
            used_kib / total_kib * 100.0,
            Unit::Percent,
            Confidence::Measured,
        ));
    }

    if let (Some(swap_total), Some(swap_free)) = (field("SwapTotal"), field("SwapFree")) {
        metrics.push(Metric::numeric(
            "swap_total",
            swap_total,
            Unit::Kibibytes,
            Confidence::Reported,
        ));
        let swap_used = (swap_total - swap_free).max(0.0);
        metrics.push(Metric::numeric(
            "swap_used",
            swap_used,
            Unit::Kibibytes,
            Confidence::Reported,
        ));
        if swap_total > 0.0 {
            metrics.push(Metric::numeric(
                "swap_usage",
                swap_used / swap_total * 100.0,
                Unit::Percent,
                Confidence::Measured,
            ));
        }
    }

    Ok(metrics)
}

#[cfg(target_os = "macos")]
fn collect_memory() -> Result<Vec<Metric>, ProbeError> {
    let total_bytes: f64 = run_command("sysctl", &["-n", "hw.memsize"])
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| ProbeError::Unavailable("sysctl hw.memsize failed".into()))?;

    let mut metrics = vec![Metric::numeric(
        "total",
        total_bytes,
        Unit::Bytes,
        Confidence::Reported,
    )];

    // vm_stat reports 4096-byte (or larger) pages; free + speculative +
    // purgeable approximate available memory.
    if let Some(out) = run_command("vm_stat", &[]) {
        let page_size: f64 = out
            .lines()
            .next()
            .and_then(|l| l.split("page size of").nth(1))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|v| v.parse().ok())
            .unwrap_or(4096.0);
        let pages = |key: &str| -> f64 {
            out.lines()
                .find(|l| l.starts_with(key))
                .and_then(|l| l.split(':').nth(1))
                .and_then(|v| v.trim().trim_end_matches('.').parse::<f64>().ok())
                .unwrap_or(0.0)
        };
        let available = (pages("Pages free") + pages("Pages speculative") + pages("Pages purgeable"))
            * page_size;
        let used = (total_bytes - available).max(0.0);
        metrics.push(Metric::numeric("available", available, Unit::Bytes, Confidence::Reported));
        metrics.push(Metric::numeric("used", used, Unit::Bytes, Confidence::Reported));
        if total_bytes > 0.0 {
            metrics.push(Metric::numeric(
                "usage",
                used / total_bytes * 100.0,
                Unit::Percent,
                Confidence::Measured,
            ));
        }
    }

    Ok(metrics)
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn collect_memory() -> Result<Vec<Metric>, ProbeError> {
    Err(ProbeError::Unavailable(
        "memory probe not supported on this platform".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_shape() {
        let desc = MemoryProbe.descriptor();
        assert_eq!(desc.id, "memory");
        assert_eq!(desc.category, Category::Memory);
        assert!(!desc.is_benchmark);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn collect_reports_total_and_usage() {
        let metrics = MemoryProbe.collect(&CancelToken::new()).unwrap();
        let total = metrics.iter().find(|m| m.name == "total").unwrap();
        assert!(total.as_f64().unwrap() > 0.0);
        let usage = metrics.iter().find(|m| m.name == "usage").unwrap();
        let pct = usage.as_f64().unwrap();
        assert!((0.0..=100.0).contains(&pct));
    }
}
