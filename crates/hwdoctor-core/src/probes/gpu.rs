//! GPU detector.
//!
//! NVIDIA cards report rich telemetry through `nvidia-smi` in CSV mode.
//! Without it we fall back to enumerating display controllers from
//! `lspci` (Linux) or `system_profiler` (macOS), which only yields the
//! model name.

use std::time::Duration;

use crate::metric::{Category, Confidence, Metric, ProbeError, Unit};
use crate::probe::{CancelToken, Probe, ProbeDescriptor, ResourceClass};
use crate::probes::helpers::{command_exists, run_command};

static GPU_DESCRIPTOR: ProbeDescriptor = ProbeDescriptor {
    id: "gpu",
    category: Category::Gpu,
    timeout: Duration::from_secs(10),
    is_benchmark: false,
    resource: ResourceClass::None,
};

pub struct GpuProbe;

impl Probe for GpuProbe {
    fn descriptor(&self) -> &ProbeDescriptor {
        &GPU_DESCRIPTOR
    }

    fn collect(&self, _cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError> {
        if command_exists("nvidia-smi") {
            if let Some(metrics) = query_nvidia_smi() {
                return Ok(metrics);
            }
        }

        let names = fallback_names();
        if names.is_empty() {
            return Err(ProbeError::Unavailable("no GPU detected".into()));
        }
        Ok(names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Metric::text(format!("gpu{i}.name"), name))
            .collect())
    }
}

const NVIDIA_QUERY: &str =
    "name,temperature.gpu,utilization.gpu,memory.total,memory.used,power.draw";

fn query_nvidia_smi() -> Option<Vec<Metric>> {
    let out = run_command(
        "nvidia-smi",
        &[
            &format!("--query-gpu={NVIDIA_QUERY}"),
            "--format=csv,noheader,nounits",
        ],
    )?;

    let mut metrics = Vec::new();
    for (i, line) in out.lines().enumerate() {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 6 {
            continue;
        }
        metrics.push(Metric::text(format!("gpu{i}.name"), fields[0]));
        push_numeric(&mut metrics, format!("gpu{i}.temp"), fields[1], Unit::Celsius);
        push_numeric(&mut metrics, format!("gpu{i}.usage"), fields[2], Unit::Percent);
        push_numeric(&mut metrics, format!("gpu{i}.vram_total"), fields[3], Unit::Mebibytes);
        push_numeric(&mut metrics, format!("gpu{i}.vram_used"), fields[4], Unit::Mebibytes);
        // power.draw reports "[N/A]" on some boards; skipped by the parse.
        if let Ok(watts) = fields[5].parse::<f64>() {
            metrics.push(Metric::numeric(
                format!("gpu{i}.power_draw"),
                watts,
                Unit::Watts,
                Confidence::Measured,
            ));
        }
    }
    (!metrics.is_empty()).then_some(metrics)
}

fn push_numeric(metrics: &mut Vec<Metric>, name: String, raw: &str, unit: Unit) {
    if let Ok(value) = raw.parse::<f64>() {
        metrics.push(Metric::numeric(name, value, unit, Confidence::Measured));
    }
}

fn fallback_names() -> Vec<String> {
    #[cfg(target_os = "linux")]
    {
        let Some(out) = run_command("lspci", &[]) else {
            return Vec::new();
        };
        out.lines()
            .filter(|line| line.contains("VGA compatible controller") || line.contains("3D controller"))
            .filter_map(|line| line.split_once(": ").map(|(_, name)| name.to_string()))
            .collect()
    }
    #[cfg(target_os = "macos")]
    {
        let Some(out) = run_command("system_profiler", &["SPDisplaysDataType"]) else {
            return Vec::new();
        };
        out.lines()
            .filter_map(|line| {
                let trimmed = line.trim();
                trimmed
                    .strip_prefix("Chipset Model: ")
                    .map(|name| name.to_string())
            })
            .collect()
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_shape() {
        let desc = GpuProbe.descriptor();
        assert_eq!(desc.id, "gpu");
        assert_eq!(desc.category, Category::Gpu);
        assert!(!desc.is_benchmark);
    }

    #[test]
    fn numeric_parse_skips_na() {
        let mut metrics = Vec::new();
        push_numeric(&mut metrics, "gpu0.temp".to_string(), "[N/A]", Unit::Celsius);
        assert!(metrics.is_empty());
        push_numeric(&mut metrics, "gpu0.temp".to_string(), "54", Unit::Celsius);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].as_f64(), Some(54.0));
    }
}
