//! Abstract probe trait and the adapter that isolates probe failures.
//!
//! Every detector and benchmark implements [`Probe`]. The orchestrator only
//! ever sees [`ProbeResult`] values: [`run_probe`] converts unavailability,
//! errors, panics, and empty output into `Failure` results at this boundary.

use std::panic;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::metric::{Category, Metric, ProbeError, ProbeResult};

/// Which contended resource a benchmark exercises. The orchestrator never
/// runs two benchmarks of the same class concurrently, so a disk benchmark
/// cannot skew a second disk benchmark's numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceClass {
    /// Detectors — latency bound, free to overlap.
    None,
    Cpu,
    Memory,
    Disk,
}

/// Static metadata a probe registers with the orchestrator.
///
/// This is the whole contract: the orchestrator never branches on platform
/// or probe kind beyond what is declared here.
#[derive(Debug, Clone)]
pub struct ProbeDescriptor {
    /// Unique identifier (e.g. `"cpu"`, `"bench_disk"`).
    pub id: &'static str,
    pub category: Category,
    /// Budget for one collection run.
    pub timeout: Duration,
    pub is_benchmark: bool,
    pub resource: ResourceClass,
}

/// Cooperative cancellation flag shared between the caller, the
/// orchestrator, and long-running benchmark probes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Trait every probe must implement.
///
/// `collect` may read hardware/OS state or burn CPU/disk while benchmarking,
/// but must not mutate shared state. Benchmarks should poll `cancel` at safe
/// checkpoints and bail out with [`ProbeError::Cancelled`].
pub trait Probe: Send + Sync {
    fn descriptor(&self) -> &ProbeDescriptor;

    /// Whether this probe can run on the current machine.
    fn is_available(&self) -> bool {
        true
    }

    fn collect(&self, cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError>;

    /// Convenience: id from the descriptor.
    fn id(&self) -> &'static str {
        self.descriptor().id
    }
}

/// Run one probe through the failure-isolation boundary.
///
/// Always returns exactly one [`ProbeResult`]; a probe that errors, panics,
/// or produces no metrics yields a `Failure` — never an abort of the run.
pub fn run_probe(probe: &dyn Probe, cancel: &CancelToken) -> ProbeResult {
    let desc = probe.descriptor().clone();
    let start = Instant::now();

    if !probe.is_available() {
        return ProbeResult::failure(
            desc.id,
            desc.category,
            ProbeError::Unavailable(format!("{} probe not supported on this machine", desc.id)),
            start.elapsed(),
        );
    }

    let outcome = panic::catch_unwind(panic::AssertUnwindSafe(|| probe.collect(cancel)));
    let elapsed = start.elapsed();

    match outcome {
        Ok(Ok(metrics)) if metrics.is_empty() => {
            log::debug!("probe {} returned no metrics", desc.id);
            ProbeResult::failure(
                desc.id,
                desc.category,
                ProbeError::Malformed("probe produced no metrics".into()),
                elapsed,
            )
        }
        Ok(Ok(metrics)) => {
            log::debug!("probe {} ok: {} metric(s) in {:?}", desc.id, metrics.len(), elapsed);
            ProbeResult::success(desc.id, desc.category, metrics, elapsed)
        }
        Ok(Err(reason)) => {
            log::debug!("probe {} failed: {}", desc.id, reason);
            ProbeResult::failure(desc.id, desc.category, reason, elapsed)
        }
        Err(_) => {
            log::warn!("probe {} panicked", desc.id);
            ProbeResult::failure(
                desc.id,
                desc.category,
                ProbeError::Malformed("probe panicked".into()),
                elapsed,
            )
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Mock probes shared by orchestrator/aggregator tests.

    use super::*;
    use crate::metric::{Confidence, Unit};

    /// A probe returning a fixed metric list.
    pub struct MockProbe {
        pub desc: ProbeDescriptor,
        pub metrics: Vec<Metric>,
        pub available: bool,
    }

    impl MockProbe {
        pub fn new(id: &'static str, category: Category, metrics: Vec<Metric>) -> Self {
            Self {
                desc: ProbeDescriptor {
                    id,
                    category,
                    timeout: Duration::from_secs(5),
                    is_benchmark: false,
                    resource: ResourceClass::None,
                },
                metrics,
                available: true,
            }
        }

        pub fn single(id: &'static str, category: Category, name: &str, value: f64) -> Self {
            Self::new(
                id,
                category,
                vec![Metric::numeric(name, value, Unit::Percent, Confidence::Measured)],
            )
        }
    }

    impl Probe for MockProbe {
        fn descriptor(&self) -> &ProbeDescriptor {
            &self.desc
        }
        fn is_available(&self) -> bool {
            self.available
        }
        fn collect(&self, _cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError> {
            Ok(self.metrics.clone())
        }
    }

    /// A probe that always fails with the given reason.
    pub struct FailingProbe {
        pub desc: ProbeDescriptor,
        pub reason: ProbeError,
    }

    impl FailingProbe {
        pub fn new(id: &'static str, category: Category, reason: ProbeError) -> Self {
            Self {
                desc: ProbeDescriptor {
                    id,
                    category,
                    timeout: Duration::from_secs(5),
                    is_benchmark: false,
                    resource: ResourceClass::None,
                },
                reason,
            }
        }
    }

    impl Probe for FailingProbe {
        fn descriptor(&self) -> &ProbeDescriptor {
            &self.desc
        }
        fn collect(&self, _cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError> {
            Err(self.reason.clone())
        }
    }

    /// A probe that panics mid-collection.
    pub struct PanickingProbe {
        pub desc: ProbeDescriptor,
    }

    impl PanickingProbe {
        pub fn new(id: &'static str, category: Category) -> Self {
            Self {
                desc: ProbeDescriptor {
                    id,
                    category,
                    timeout: Duration::from_secs(5),
                    is_benchmark: false,
                    resource: ResourceClass::None,
                },
            }
        }
    }

    impl Probe for PanickingProbe {
        fn descriptor(&self) -> &ProbeDescriptor {
            &self.desc
        }
        fn collect(&self, _cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError> {
            panic!("simulated probe crash");
        }
    }

    /// A probe that sleeps longer than any sane timeout.
    pub struct SlowProbe {
        pub desc: ProbeDescriptor,
        pub sleep: Duration,
    }

    impl SlowProbe {
        pub fn new(id: &'static str, category: Category, timeout: Duration, sleep: Duration) -> Self {
            Self {
                desc: ProbeDescriptor {
                    id,
                    category,
                    timeout,
                    is_benchmark: false,
                    resource: ResourceClass::None,
                },
                sleep,
            }
        }
    }

    impl Probe for SlowProbe {
        fn descriptor(&self) -> &ProbeDescriptor {
            &self.desc
        }
        fn collect(&self, _cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError> {
            std::thread::sleep(self.sleep);
            Ok(vec![Metric::numeric(
                "late",
                1.0,
                Unit::Count,
                Confidence::Measured,
            )])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::metric::{Confidence, ProbeOutcome, Unit};

    // -----------------------------------------------------------------------
    // Adapter boundary tests
    // -----------------------------------------------------------------------

    #[test]
    fn run_probe_success() {
        let probe = MockProbe::single("cpu", Category::Cpu, "usage", 12.5);
        let result = run_probe(&probe, &CancelToken::new());
        assert!(result.is_success());
        assert_eq!(result.probe_id, "cpu");
        assert_eq!(result.category, Category::Cpu);
        assert_eq!(result.metrics().len(), 1);
    }

    #[test]
    fn run_probe_unavailable() {
        let mut probe = MockProbe::single("battery", Category::Battery, "health", 99.0);
        probe.available = false;
        let result = run_probe(&probe, &CancelToken::new());
        match &result.outcome {
            ProbeOutcome::Failure { reason: ProbeError::Unavailable(_), .. } => {}
            other => panic!("expected Unavailable failure, got {other:?}"),
        }
    }

    #[test]
    fn run_probe_error_becomes_failure() {
        let probe = FailingProbe::new(
            "gpu",
            Category::Gpu,
            ProbeError::Unavailable("nvidia-smi not found".into()),
        );
        let result = run_probe(&probe, &CancelToken::new());
        assert!(!result.is_success());
    }

    #[test]
    fn run_probe_panic_is_contained() {
        let probe = PanickingProbe::new("net", Category::Network);
        let result = run_probe(&probe, &CancelToken::new());
        match &result.outcome {
            ProbeOutcome::Failure { reason: ProbeError::Malformed(msg), .. } => {
                assert!(msg.contains("panicked"));
            }
            other => panic!("expected Malformed failure, got {other:?}"),
        }
    }

    #[test]
    fn run_probe_empty_metrics_is_malformed() {
        let probe = MockProbe::new("mem", Category::Memory, Vec::new());
        let result = run_probe(&probe, &CancelToken::new());
        match &result.outcome {
            ProbeOutcome::Failure { reason: ProbeError::Malformed(_), .. } => {}
            other => panic!("expected Malformed failure, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // CancelToken tests
    // -----------------------------------------------------------------------

    #[test]
    fn cancel_token_propagates_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn metric_helpers_round_trip() {
        let m = Metric::numeric("usage", 50.0, Unit::Percent, Confidence::Measured);
        assert_eq!(m.name, "usage");
        assert_eq!(m.as_f64(), Some(50.0));
    }
}
