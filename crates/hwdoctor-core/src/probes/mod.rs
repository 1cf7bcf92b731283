//! Built-in hardware probes.
//!
//! Detectors read what the machine reports about itself; benchmarks in
//! [`bench`] measure what it can actually do. [`default_probes`] returns
//! every built-in in registration order, which is also report order.

pub mod battery;
pub mod bench;
pub mod cpu;
pub mod gpu;
pub(crate) mod helpers;
pub mod memory;
pub mod network;
pub mod storage;

use crate::probe::Probe;

pub use battery::BatteryProbe;
pub use bench::{CpuBenchProbe, DiskBenchProbe, MemoryBenchProbe};
pub use cpu::CpuProbe;
pub use gpu::GpuProbe;
pub use memory::MemoryProbe;
pub use network::NetworkProbe;
pub use storage::StorageProbe;

/// Every built-in probe, detectors first, in report order.
pub fn default_probes() -> Vec<Box<dyn Probe>> {
    vec![
        Box::new(CpuProbe),
        Box::new(MemoryProbe),
        Box::new(StorageProbe),
        Box::new(GpuProbe),
        Box::new(BatteryProbe),
        Box::new(NetworkProbe),
        Box::new(CpuBenchProbe),
        Box::new(MemoryBenchProbe),
        Box::new(DiskBenchProbe),
    ]
}

/// Built-ins whose [`Probe::is_available`] check passes on this host.
pub fn available_probes() -> Vec<Box<dyn Probe>> {
    default_probes()
        .into_iter()
        .filter(|probe| probe.is_available())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_ids_are_unique() {
        let probes = default_probes();
        let mut ids: Vec<&str> = probes.iter().map(|p| p.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), probes.len());
    }

    #[test]
    fn detectors_precede_benchmarks() {
        let probes = default_probes();
        let first_bench = probes
            .iter()
            .position(|p| p.descriptor().is_benchmark)
            .unwrap();
        assert!(
            probes[first_bench..]
                .iter()
                .all(|p| p.descriptor().is_benchmark)
        );
    }

    #[test]
    fn available_is_subset() {
        assert!(available_probes().len() <= default_probes().len());
    }
}
