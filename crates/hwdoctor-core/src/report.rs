//! The finished report model handed to rendering collaborators.
//!
//! A [`ReportModel`] is owned by exactly one orchestration run and is never
//! mutated after scoring completes. Renderers (HTML, PDF, terminal tables)
//! consume it read-only — the score, band, and findings are final here and
//! must not be re-derived downstream.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{MetricMap, merge_results};
use crate::metric::ProbeResult;
use crate::orchestrator::OrchestratorRun;
use crate::score::{Finding, SeverityBand, evaluate};

/// Machine information captured at report time (best-effort).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineInfo {
    pub hostname: String,
    pub os: String,
    pub arch: String,
    pub chip: String,
    pub cores: usize,
    pub uptime_secs: Option<u64>,
}

/// The aggregate root produced by one orchestration run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportModel {
    pub id: String,
    /// ISO-8601 UTC generation timestamp.
    pub generated_at: String,
    pub machine: MachineInfo,
    /// Raw per-probe results in registration order.
    pub results: Vec<ProbeResult>,
    /// Normalized, merged metric mapping (the scorer's input).
    pub metrics: MetricMap,
    /// Triggered rules in evaluation order.
    pub findings: Vec<Finding>,
    pub score: u8,
    pub band: SeverityBand,
    /// True when the run was cancelled before every probe was dispatched.
    pub incomplete: bool,
    pub engine_version: String,
}

/// Aggregate and score one orchestration run into the final report.
pub fn build_report(run: OrchestratorRun) -> ReportModel {
    let metrics = merge_results(&run.results);
    let summary = evaluate(&metrics);
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    ReportModel {
        id: Uuid::new_v4().to_string(),
        generated_at: format_iso8601(now),
        machine: detect_machine_info(),
        results: run.results,
        metrics,
        findings: summary.findings,
        score: summary.score,
        band: summary.band,
        incomplete: run.incomplete,
        engine_version: crate::VERSION.to_string(),
    }
}

impl ReportModel {
    /// Pretty JSON for rendering collaborators.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ---------------------------------------------------------------------------
// Machine detection
// ---------------------------------------------------------------------------

/// Detect machine information (best-effort, never fails).
pub fn detect_machine_info() -> MachineInfo {
    let os = format!(
        "{} {}",
        std::env::consts::OS,
        os_version().unwrap_or_default()
    );
    MachineInfo {
        hostname: hostname().unwrap_or_else(|| "unknown".to_string()),
        os: os.trim_end().to_string(),
        arch: std::env::consts::ARCH.to_string(),
        chip: detect_chip().unwrap_or_else(|| "unknown".to_string()),
        cores: std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
        uptime_secs: uptime_secs(),
    }
}

fn hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: buf is a valid writable buffer of the declared length;
    // gethostname NUL-terminates on success.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast::<libc::c_char>(), buf.len()) };
    if rc != 0 {
        return None;
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let name = String::from_utf8_lossy(&buf[..end]).into_owned();
    if name.is_empty() { None } else { Some(name) }
}

/// Get OS version string (best-effort).
fn os_version() -> Option<String> {
    #[cfg(target_os = "macos")]
    {
        let output = std::process::Command::new("sw_vers")
            .arg("-productVersion")
            .output()
            .ok()?;
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/os-release").ok().and_then(|s| {
            s.lines()
                .find(|l| l.starts_with("PRETTY_NAME="))
                .map(|l| l.trim_start_matches("PRETTY_NAME=").trim_matches('"').to_string())
        })
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

/// Detect chip/CPU name (best-effort).
fn detect_chip() -> Option<String> {
    #[cfg(target_os = "macos")]
    {
        let output = std::process::Command::new("sysctl")
            .arg("-n")
            .arg("machdep.cpu.brand_string")
            .output()
            .ok()?;
        let s = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if s.is_empty() { None } else { Some(s) }
    }
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo").ok().and_then(|s| {
            s.lines()
                .find(|l| l.starts_with("model name"))
                .map(|l| l.split(':').nth(1).unwrap_or("").trim().to_string())
        })
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

/// Seconds since boot (best-effort).
fn uptime_secs() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/uptime")
            .ok()
            .and_then(|s| s.split_whitespace().next()?.parse::<f64>().ok())
            .map(|secs| secs as u64)
    }
    #[cfg(target_os = "macos")]
    {
        // kern.boottime prints `{ sec = 1756..., usec = ... } ...`
        let output = std::process::Command::new("sysctl")
            .arg("-n")
            .arg("kern.boottime")
            .output()
            .ok()?;
        let text = String::from_utf8_lossy(&output.stdout);
        let boot: u64 = text
            .split("sec =")
            .nth(1)?
            .trim_start()
            .split(|c: char| !c.is_ascii_digit())
            .next()?
            .parse()
            .ok()?;
        let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
        now.checked_sub(boot)
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

// ---------------------------------------------------------------------------
// Timestamp formatting
// ---------------------------------------------------------------------------

/// Format a duration-since-epoch as an ISO-8601 UTC timestamp.
/// Example: `2026-08-29T14:30:00Z`
pub fn format_iso8601(since_epoch: Duration) -> String {
    let secs = since_epoch.as_secs();
    let (year, month, day, hour, min, sec) = secs_to_utc(secs);
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{min:02}:{sec:02}Z")
}

/// Compact variant for file names. Example: `20260829_143000`
pub fn format_timestamp_compact(since_epoch: Duration) -> String {
    let secs = since_epoch.as_secs();
    let (year, month, day, hour, min, sec) = secs_to_utc(secs);
    format!("{year:04}{month:02}{day:02}_{hour:02}{min:02}{sec:02}")
}

/// Convert seconds since Unix epoch to (year, month, day, hour, minute,
/// second) UTC. No leap second handling.
fn secs_to_utc(secs: u64) -> (u64, u64, u64, u64, u64, u64) {
    let sec = secs % 60;
    let min = (secs / 60) % 60;
    let hour = (secs / 3600) % 24;

    let mut days = secs / 86400;
    let mut year = 1970u64;
    loop {
        let days_in_year = if is_leap(year) { 366 } else { 365 };
        if days < days_in_year {
            break;
        }
        days -= days_in_year;
        year += 1;
    }

    let month_lengths = [
        31,
        if is_leap(year) { 29 } else { 28 },
        31,
        30,
        31,
        30,
        31,
        31,
        30,
        31,
        30,
        31,
    ];
    let mut month = 1u64;
    for len in month_lengths {
        if days < len {
            break;
        }
        days -= len;
        month += 1;
    }

    (year, month, days + 1, hour, min, sec)
}

fn is_leap(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{Category, Confidence, Metric, Unit};

    // -----------------------------------------------------------------------
    // Timestamp tests
    // -----------------------------------------------------------------------

    #[test]
    fn iso8601_epoch() {
        assert_eq!(format_iso8601(Duration::ZERO), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn iso8601_known_instant() {
        // 2024-02-29T12:00:00Z (leap day)
        assert_eq!(
            format_iso8601(Duration::from_secs(1_709_208_000)),
            "2024-02-29T12:00:00Z"
        );
    }

    #[test]
    fn compact_timestamp_shape() {
        let s = format_timestamp_compact(Duration::from_secs(1_709_208_000));
        assert_eq!(s, "20240229_120000");
    }

    // -----------------------------------------------------------------------
    // Machine info
    // -----------------------------------------------------------------------

    #[test]
    fn machine_info_is_populated() {
        let info = detect_machine_info();
        assert!(!info.os.is_empty());
        assert!(!info.arch.is_empty());
        assert!(info.cores >= 1);
    }

    // -----------------------------------------------------------------------
    // Report building
    // -----------------------------------------------------------------------

    fn sample_run() -> OrchestratorRun {
        OrchestratorRun {
            results: vec![ProbeResult::success(
                "cpu",
                Category::Cpu,
                vec![Metric::numeric("temp", 92.0, Unit::Celsius, Confidence::Measured)],
                Duration::from_millis(10),
            )],
            incomplete: false,
        }
    }

    #[test]
    fn build_report_scores_the_run() {
        let report = build_report(sample_run());
        assert_eq!(report.score, 80);
        assert_eq!(report.band, SeverityBand::Healthy);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].rule_id, "cpu_temp_critical");
        assert!(!report.incomplete);
        assert!(!report.id.is_empty());
    }

    #[test]
    fn report_serializes_to_json() {
        let report = build_report(sample_run());
        let json = report.to_json().unwrap();
        assert!(json.contains("\"score\": 80"));
        assert!(json.contains("cpu_temp_critical"));
    }

    #[test]
    fn incomplete_flag_is_carried_through() {
        let mut run = sample_run();
        run.incomplete = true;
        let report = build_report(run);
        assert!(report.incomplete);
    }
}
