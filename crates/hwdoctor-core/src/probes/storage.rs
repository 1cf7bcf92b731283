//! Storage detector — partitions, disk type, SMART health.
//!
//! Partitions come from `/proc/mounts` (Linux) or `mount` (macOS) with
//! capacities via `statvfs`. Partitions are grouped onto their physical
//! disk (`sda1` → `sda`, `nvme0n1p2` → `nvme0n1`), then each disk is
//! enriched with its rotational flag and `smartctl` health/temperature.
//!
//! Metric naming: `disk.<name>.*` per physical disk, `part.<mount>.*` per
//! partition — the per-device scoring rules match on those shapes.

use std::collections::BTreeMap;
use std::ffi::CString;
use std::time::Duration;

use crate::metric::{Category, Confidence, Metric, ProbeError, Unit};
use crate::probe::{CancelToken, Probe, ProbeDescriptor, ResourceClass};
use crate::probes::helpers::{command_exists, read_trimmed};

static STORAGE_DESCRIPTOR: ProbeDescriptor = ProbeDescriptor {
    id: "storage",
    category: Category::Storage,
    timeout: Duration::from_secs(20),
    is_benchmark: false,
    resource: ResourceClass::None,
};

pub struct StorageProbe;

impl Probe for StorageProbe {
    fn descriptor(&self) -> &ProbeDescriptor {
        &STORAGE_DESCRIPTOR
    }

    fn collect(&self, _cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError> {
        let mounts = list_mounts();
        if mounts.is_empty() {
            return Err(ProbeError::Unavailable("no mounted block devices found".into()));
        }

        let mut metrics = Vec::new();
        let mut disks: BTreeMap<String, f64> = BTreeMap::new();

        for mount in &mounts {
            let Some((total, free)) = statvfs_bytes(&mount.mountpoint) else {
                continue;
            };
            if total <= 0.0 {
                continue;
            }
            let used = (total - free).max(0.0);

            let key = &mount.mountpoint;
            metrics.push(Metric::numeric(
                format!("part.{key}.total"),
                total,
                Unit::Bytes,
                Confidence::Reported,
            ));
            metrics.push(Metric::numeric(
                format!("part.{key}.free"),
                free,
                Unit::Bytes,
                Confidence::Reported,
            ));
            metrics.push(Metric::numeric(
                format!("part.{key}.usage"),
                used / total * 100.0,
                Unit::Percent,
                Confidence::Reported,
            ));
            metrics.push(Metric::text(format!("part.{key}.fstype"), mount.fstype.clone()));

            let disk = base_device(&mount.device);
            *disks.entry(disk).or_insert(0.0) += total;
        }

        let have_smartctl = command_exists("smartctl");
        for (disk, size) in disks {
            metrics.push(Metric::numeric(
                format!("disk.{disk}.size"),
                size,
                Unit::Bytes,
                Confidence::Estimated,
            ));
            metrics.push(Metric::text(format!("disk.{disk}.type"), disk_type(&disk)));

            if have_smartctl {
                let (status, temp) = smart_data(&disk);
                metrics.push(Metric::state(
                    format!("disk.{disk}.smart_status"),
                    status,
                    Confidence::Reported,
                ));
                if let Some(celsius) = temp {
                    metrics.push(Metric::numeric(
                        format!("disk.{disk}.temp"),
                        celsius,
                        Unit::Celsius,
                        Confidence::Reported,
                    ));
                }
            }
        }

        Ok(metrics)
    }
}

struct MountEntry {
    device: String,
    mountpoint: String,
    fstype: String,
}

/// Mounted real filesystems (device node under /dev only).
fn list_mounts() -> Vec<MountEntry> {
    #[cfg(target_os = "linux")]
    {
        let Ok(mounts) = std::fs::read_to_string("/proc/mounts") else {
            return Vec::new();
        };
        mounts
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let device = fields.next()?.to_string();
                let mountpoint = fields.next()?.to_string();
                let fstype = fields.next()?.to_string();
                device.starts_with("/dev/").then_some(MountEntry {
                    device,
                    mountpoint,
                    fstype,
                })
            })
            .collect()
    }
    #[cfg(target_os = "macos")]
    {
        // `/dev/disk3s1 on / (apfs, local, read-only, journaled)`
        let Some(out) = crate::probes::helpers::run_command("mount", &[]) else {
            return Vec::new();
        };
        out.lines()
            .filter_map(|line| {
                let (device, rest) = line.split_once(" on ")?;
                let (mountpoint, paren) = rest.split_once(" (")?;
                let fstype = paren.split([',', ')']).next()?.trim();
                device.starts_with("/dev/").then_some(MountEntry {
                    device: device.to_string(),
                    mountpoint: mountpoint.to_string(),
                    fstype: fstype.to_string(),
                })
            })
            .collect()
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        Vec::new()
    }
}

/// Total and available bytes for a mountpoint via `statvfs`.
fn statvfs_bytes(mountpoint: &str) -> Option<(f64, f64)> {
    let path = CString::new(mountpoint).ok()?;
    // SAFETY: path is a valid NUL-terminated string and vfs is a properly
    // sized out-parameter; statvfs only writes into it.
    let mut vfs: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(path.as_ptr(), &mut vfs) };
    if rc != 0 {
        return None;
    }
    let frsize = if vfs.f_frsize > 0 { vfs.f_frsize } else { vfs.f_bsize } as f64;
    Some((vfs.f_blocks as f64 * frsize, vfs.f_bavail as f64 * frsize))
}

/// Base physical device for a partition node: `sda1` → `sda`,
/// `nvme0n1p2` → `nvme0n1`, `mmcblk0p1` → `mmcblk0`, `disk3s1` → `disk3`.
fn base_device(device: &str) -> String {
    let name = device.strip_prefix("/dev/").unwrap_or(device);

    if name.starts_with("nvme") || name.starts_with("mmcblk") {
        if let Some(pos) = name.rfind('p') {
            if name[pos + 1..].chars().all(|c| c.is_ascii_digit()) && !name[pos + 1..].is_empty() {
                return name[..pos].to_string();
            }
        }
        return name.to_string();
    }
    if name.starts_with("disk") {
        // macOS slice naming: diskNsM
        if let Some(pos) = name[4..].find('s') {
            return name[..4 + pos].to_string();
        }
        return name.to_string();
    }
    name.trim_end_matches(|c: char| c.is_ascii_digit()).to_string()
}

/// HDD / SSD / NVMe classification.
fn disk_type(disk: &str) -> String {
    if disk.starts_with("nvme") {
        return "NVMe".to_string();
    }
    match read_trimmed(format!("/sys/block/{disk}/queue/rotational")).as_deref() {
        Some("1") => "HDD".to_string(),
        Some("0") => "SSD".to_string(),
        _ => "Unknown".to_string(),
    }
}

/// SMART overall status and temperature via `smartctl -H -A`.
///
/// smartctl encodes failure bits in its exit status, so the output is
/// parsed regardless of the exit code.
fn smart_data(disk: &str) -> (String, Option<f64>) {
    let device = format!("/dev/{disk}");
    let Ok(output) = std::process::Command::new("smartctl")
        .args(["-H", "-A", &device])
        .output()
    else {
        return ("N/A".to_string(), None);
    };
    let text = String::from_utf8_lossy(&output.stdout);

    let status = if text.contains("PASSED") || text.contains("SMART overall-health self-assessment test result: OK") {
        "PASSED"
    } else if text.contains("FAILED") {
        "FAILED"
    } else {
        "Unknown"
    };

    let temp = text.lines().find_map(|line| {
        if !(line.contains("Temperature_Celsius")
            || line.contains("Temperature_Internal")
            || line.contains("Temperature:"))
        {
            return None;
        }
        line.split_whitespace()
            .rev()
            .find_map(|field| field.parse::<f64>().ok())
    });

    (status.to_string(), temp)
}
