//! Network interface detector.
//!
//! Enumerates physical interfaces (loopback and virtual bridges are
//! skipped), reads link state, MAC and negotiated speed from sysfs, and
//! samples `/proc/net/dev` twice to measure the current throughput.

use std::time::Duration;

use crate::metric::{Category, Metric, ProbeError};
use crate::probe::{CancelToken, Probe, ProbeDescriptor, ResourceClass};
#[cfg(target_os = "linux")]
use crate::metric::{Confidence, Unit};
#[cfg(target_os = "linux")]
use crate::probes::helpers::{read_parsed, read_trimmed};
#[cfg(any(target_os = "linux", test))]
use std::collections::BTreeMap;

#[cfg(target_os = "linux")]
const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

static NETWORK_DESCRIPTOR: ProbeDescriptor = ProbeDescriptor {
    id: "network",
    category: Category::Network,
    timeout: Duration::from_secs(10),
    is_benchmark: false,
    resource: ResourceClass::None,
};

pub struct NetworkProbe;

impl Probe for NetworkProbe {
    fn descriptor(&self) -> &ProbeDescriptor {
        &NETWORK_DESCRIPTOR
    }

    fn collect(&self, cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError> {
        collect_network(cancel)
    }
}

#[cfg(target_os = "linux")]
fn collect_network(cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError> {
    let first = read_counters()?;
    std::thread::sleep(SAMPLE_INTERVAL);
    if cancel.is_cancelled() {
        return Err(ProbeError::Cancelled);
    }
    let second = read_counters()?;

    let mut metrics = Vec::new();
    for (iface, (rx1, tx1)) in &first {
        if !is_physical(iface) {
            continue;
        }
        let sysfs = format!("/sys/class/net/{iface}");

        if let Some(state) = read_trimmed(format!("{sysfs}/operstate")) {
            metrics.push(Metric::state(format!("{iface}.state"), state, Confidence::Reported));
        }
        if let Some(mac) = read_trimmed(format!("{sysfs}/address")) {
            metrics.push(Metric::text(format!("{iface}.mac"), mac));
        }
        // Negotiated link speed in Mb/s; -1 when the link is down.
        if let Some(speed) = read_parsed::<f64>(format!("{sysfs}/speed")) {
            if speed > 0.0 {
                metrics.push(Metric::numeric(
                    format!("{iface}.link_speed"),
                    speed,
                    Unit::MegabitsPerSec,
                    Confidence::Reported,
                ));
            }
        }

        if let Some((rx2, tx2)) = second.get(iface) {
            let secs = SAMPLE_INTERVAL.as_secs_f64();
            let rx_rate = (rx2.saturating_sub(*rx1)) as f64 / secs / (1024.0 * 1024.0);
            let tx_rate = (tx2.saturating_sub(*tx1)) as f64 / secs / (1024.0 * 1024.0);
            metrics.push(Metric::numeric(
                format!("{iface}.rx_rate"),
                rx_rate,
                Unit::MegabytesPerSec,
                Confidence::Measured,
            ));
            metrics.push(Metric::numeric(
                format!("{iface}.tx_rate"),
                tx_rate,
                Unit::MegabytesPerSec,
                Confidence::Measured,
            ));
        }
    }

    if metrics.is_empty() {
        return Err(ProbeError::Unavailable("no physical network interfaces".into()));
    }
    Ok(metrics)
}

/// Per-interface (rx_bytes, tx_bytes) from `/proc/net/dev`.
#[cfg(target_os = "linux")]
fn read_counters() -> Result<BTreeMap<String, (u64, u64)>, ProbeError> {
    let raw = std::fs::read_to_string("/proc/net/dev")
        .map_err(|e| ProbeError::Unavailable(format!("/proc/net/dev: {e}")))?;
    Ok(parse_net_dev(&raw))
}

#[cfg(any(target_os = "linux", test))]
fn parse_net_dev(raw: &str) -> BTreeMap<String, (u64, u64)> {
    raw.lines()
        .skip(2)
        .filter_map(|line| {
            let (iface, rest) = line.split_once(':')?;
            let fields: Vec<&str> = rest.split_whitespace().collect();
            // rx_bytes is field 0, tx_bytes is field 8.
            let rx = fields.first()?.parse::<u64>().ok()?;
            let tx = fields.get(8)?.parse::<u64>().ok()?;
            Some((iface.trim().to_string(), (rx, tx)))
        })
        .collect()
}

#[cfg(any(target_os = "linux", test))]
fn is_physical(iface: &str) -> bool {
    !(iface == "lo"
        || iface.starts_with("docker")
        || iface.starts_with("veth")
        || iface.starts_with("br-")
        || iface.starts_with("virbr")
        || iface.starts_with("tun")
        || iface.starts_with("tap"))
}

#[cfg(not(target_os = "linux"))]
fn collect_network(_cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError> {
    Err(ProbeError::Unavailable(
        "network detection not supported on this platform".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  104000    1000    0    0    0     0          0         0   104000    1000    0    0    0     0       0          0
  eth0: 5120000    4000    0    0    0     0          0       120  2560000    3000    0    0    0     0       0          0
";

    #[test]
    fn descriptor_shape() {
        let desc = NetworkProbe.descriptor();
        assert_eq!(desc.id, "network");
        assert_eq!(desc.category, Category::Network);
    }

    #[test]
    fn parses_proc_net_dev() {
        let counters = parse_net_dev(SAMPLE);
        assert_eq!(counters.get("eth0"), Some(&(5_120_000, 2_560_000)));
        assert_eq!(counters.get("lo"), Some(&(104_000, 104_000)));
    }

    #[test]
    fn virtual_interfaces_are_filtered() {
        assert!(is_physical("eth0"));
        assert!(is_physical("wlan0"));
        assert!(is_physical("enp3s0"));
        assert!(!is_physical("lo"));
        assert!(!is_physical("docker0"));
        assert!(!is_physical("veth1a2b"));
        assert!(!is_physical("br-f00d"));
    }
}
