//! CPU detector — identity, usage, frequency, temperature, throttling.
//!
//! Linux: `/proc/cpuinfo`, `/proc/stat` (sampled twice for a usage
//! percentage), cpufreq and hwmon sysfs nodes. macOS: `sysctl` keys,
//! best-effort. Throttling uses the heuristic from classic diagnostic
//! tools: current frequency under 75% of max while the package runs
//! hotter than 85 °C.

use std::time::Duration;

use crate::metric::{Category, Confidence, Metric, ProbeError, Unit};
use crate::probe::{CancelToken, Probe, ProbeDescriptor, ResourceClass};
use crate::probes::helpers::{read_parsed, read_trimmed};
#[cfg(target_os = "macos")]
use crate::probes::helpers::run_command;

/// Frequency ratio below which a hot CPU is considered throttling.
const THROTTLE_FREQ_RATIO: f64 = 0.75;
/// Temperature above which a low frequency ratio counts as throttling.
const THROTTLE_TEMP_C: f64 = 85.0;

/// Sampling interval for the usage percentage.
const USAGE_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

static CPU_DESCRIPTOR: ProbeDescriptor = ProbeDescriptor {
    id: "cpu",
    category: Category::Cpu,
    timeout: Duration::from_secs(10),
    is_benchmark: false,
    resource: ResourceClass::None,
};

pub struct CpuProbe;

impl Probe for CpuProbe {
    fn descriptor(&self) -> &ProbeDescriptor {
        &CPU_DESCRIPTOR
    }

    fn collect(&self, _cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError> {
        let mut metrics = Vec::new();

        if let Some(brand) = brand_string() {
            metrics.push(Metric::text("brand", brand));
        }
        let logical = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        metrics.push(Metric::numeric(
            "logical_cores",
            logical as f64,
            Unit::Count,
            Confidence::Reported,
        ));
        if let Some(physical) = physical_core_count() {
            metrics.push(Metric::numeric(
                "physical_cores",
                physical as f64,
                Unit::Count,
                Confidence::Reported,
            ));
        }

        if let Some(usage) = sample_usage_percent() {
            metrics.push(Metric::numeric(
                "usage",
                usage,
                Unit::Percent,
                Confidence::Measured,
            ));
        }

        let freq_current = current_frequency_mhz();
        let freq_max = max_frequency_mhz();
        if let Some(mhz) = freq_current {
            metrics.push(Metric::numeric(
                "freq_current",
                mhz,
                Unit::Megahertz,
                Confidence::Reported,
            ));
        }
        if let Some(mhz) = freq_max {
            metrics.push(Metric::numeric(
                "freq_max",
                mhz,
                Unit::Megahertz,
                Confidence::Reported,
            ));
        }

        let temp = package_temperature_c();
        if let Some(celsius) = temp {
            metrics.push(Metric::numeric(
                "temp",
                celsius,
                Unit::Celsius,
                Confidence::Measured,
            ));
        }

        let throttling = match (freq_current, freq_max, temp) {
            (Some(cur), Some(max), Some(t)) if max > 0.0 => {
                cur / max < THROTTLE_FREQ_RATIO && t > THROTTLE_TEMP_C
            }
            _ => false,
        };
        metrics.push(Metric::state(
            "throttling",
            if throttling { "yes" } else { "no" },
            Confidence::Estimated,
        ));

        Ok(metrics)
    }
}

fn brand_string() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let cpuinfo = std::fs::read_to_string("/proc/cpuinfo").ok()?;
        cpuinfo
            .lines()
            .find(|l| l.starts_with("model name"))
            .map(|l| l.split(':').nth(1).unwrap_or("").trim().to_string())
    }
    #[cfg(target_os = "macos")]
    {
        run_command("sysctl", &["-n", "machdep.cpu.brand_string"]).map(|s| s.trim().to_string())
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

fn physical_core_count() -> Option<usize> {
    #[cfg(target_os = "linux")]
    {
        // Distinct (physical id, core id) pairs across /proc/cpuinfo.
        let cpuinfo = std::fs::read_to_string("/proc/cpuinfo").ok()?;
        let mut pairs = std::collections::BTreeSet::new();
        let (mut package, mut core) = (None, None);
        for line in cpuinfo.lines() {
            if line.starts_with("physical id") {
                package = line.split(':').nth(1).map(|v| v.trim().to_string());
            } else if line.starts_with("core id") {
                core = line.split(':').nth(1).map(|v| v.trim().to_string());
            } else if line.is_empty() {
                if let (Some(p), Some(c)) = (package.take(), core.take()) {
                    pairs.insert((p, c));
                }
            }
        }
        if pairs.is_empty() { None } else { Some(pairs.len()) }
    }
    #[cfg(target_os = "macos")]
    {
        run_command("sysctl", &["-n", "hw.physicalcpu"])?.trim().parse().ok()
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

/// Aggregate CPU usage percentage from two `/proc/stat` samples.
fn sample_usage_percent() -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        let first = read_stat_totals()?;
        std::thread::sleep(USAGE_SAMPLE_INTERVAL);
        let second = read_stat_totals()?;

        let total = second.0.checked_sub(first.0)?;
        let idle = second.1.checked_sub(first.1)?;
        if total == 0 {
            return None;
        }
        Some((total - idle) as f64 / total as f64 * 100.0)
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = USAGE_SAMPLE_INTERVAL;
        None
    }
}

/// (total jiffies, idle jiffies) from the aggregate `cpu` line.
#[cfg(target_os = "linux")]
fn read_stat_totals() -> Option<(u64, u64)> {
    let stat = std::fs::read_to_string("/proc/stat").ok()?;
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|v| v.parse().ok())
        .collect();
    if fields.len() < 5 {
        return None;
    }
    let total: u64 = fields.iter().sum();
    // idle + iowait
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some((total, idle))
}

fn current_frequency_mhz() -> Option<f64> {
    let khz: f64 = read_parsed("/sys/devices/system/cpu/cpu0/cpufreq/scaling_cur_freq")?;
    Some(khz / 1000.0)
}

fn max_frequency_mhz() -> Option<f64> {
    let khz: f64 = read_parsed("/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq")?;
    Some(khz / 1000.0)
}

/// Package temperature from hwmon, trying the usual CPU sensor drivers.
fn package_temperature_c() -> Option<f64> {
    const CPU_SENSORS: &[&str] = &["coretemp", "k10temp", "cpu_thermal", "acpitz", "zenpower"];

    let hwmon = std::path::Path::new("/sys/class/hwmon");
    let entries = std::fs::read_dir(hwmon).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = read_trimmed(path.join("name")) else {
            continue;
        };
        if !CPU_SENSORS.contains(&name.as_str()) {
            continue;
        }
        if let Some(millideg) = read_parsed::<f64>(path.join("temp1_input")) {
            return Some(millideg / 1000.0);
        }
    }
    // Fallback: generic thermal zone.
    read_parsed::<f64>("/sys/class/thermal/thermal_zone0/temp").map(|m| m / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_shape() {
        let probe = CpuProbe;
        let desc = probe.descriptor();
        assert_eq!(desc.id, "cpu");
        assert_eq!(desc.category, Category::Cpu);
        assert!(!desc.is_benchmark);
    }

    #[test]
    fn collect_always_reports_core_count_and_throttling() {
        let metrics = CpuProbe.collect(&CancelToken::new()).unwrap();
        assert!(metrics.iter().any(|m| m.name == "logical_cores"));
        let throttling = metrics.iter().find(|m| m.name == "throttling").unwrap();
        assert!(matches!(throttling.as_state(), Some("yes") | Some("no")));
    }
}
