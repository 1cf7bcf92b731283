//! Probe orchestration: fan-out over failure-prone probes with per-probe
//! timeouts, bounded parallelism, and cooperative cancellation.
//!
//! Scheduling model:
//! 1. Detector probes run first, in waves of up to `detector_parallelism`
//!    threads — they are latency bound and mostly independent.
//! 2. Benchmark probes run grouped by [`ResourceClass`]; each class runs its
//!    benchmarks sequentially on one thread so two CPU-bound (or two
//!    disk-bound) workloads never contend for the resource they measure.
//!    Different classes may overlap.
//! 3. Each dispatched probe is watched over a channel; a probe that exceeds
//!    its timeout plus a grace period is abandoned and recorded as a
//!    `Failure(Timeout)`.
//!
//! Individual probe failure never aborts the run. Cancellation is checked
//! between dispatches; completed results are retained and the run is
//! flagged incomplete.

use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::metric::{ProbeError, ProbeResult};
use crate::probe::{CancelToken, Probe, ResourceClass, run_probe};

/// Explicit orchestrator configuration. There is no process-wide mutable
/// state; everything the run needs is passed in here.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Skip benchmark probes entirely (they are absent from results,
    /// not marked failed).
    pub skip_benchmarks: bool,
    /// Maximum number of detector probes in flight at once.
    pub detector_parallelism: usize,
    /// Extra wall-clock allowance past a probe's own timeout before it is
    /// abandoned as timed out.
    pub grace: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            skip_benchmarks: false,
            detector_parallelism: 8,
            grace: Duration::from_secs(2),
        }
    }
}

/// Fatal startup conditions. Anything probe-level is degraded into
/// `Failure` results instead.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrateError {
    #[error("no probes configured")]
    NoProbes,
}

/// Output of one orchestration run.
#[derive(Debug, Clone)]
pub struct OrchestratorRun {
    /// One result per dispatched probe, in registration order.
    pub results: Vec<ProbeResult>,
    /// True when the run was cancelled before every probe was dispatched.
    pub incomplete: bool,
}

/// Runs the configured probe set.
pub struct Orchestrator {
    probes: Vec<Arc<dyn Probe>>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            probes: Vec::new(),
            config,
        }
    }

    /// Register a probe. Registration order is result order.
    pub fn register(&mut self, probe: Box<dyn Probe>) {
        self.probes.push(Arc::from(probe));
    }

    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    /// Run every configured probe, honoring `cancel` between dispatches.
    pub fn run(&self, cancel: &CancelToken) -> Result<OrchestratorRun, OrchestrateError> {
        if self.probes.is_empty() {
            return Err(OrchestrateError::NoProbes);
        }

        let n = self.probes.len();
        let slots: Mutex<Vec<Option<ProbeResult>>> = Mutex::new(vec![None; n]);

        let mut detectors: Vec<usize> = Vec::new();
        let mut benchmarks: BTreeMap<ResourceClass, Vec<usize>> = BTreeMap::new();
        for (idx, probe) in self.probes.iter().enumerate() {
            let desc = probe.descriptor();
            if desc.is_benchmark {
                if !self.config.skip_benchmarks {
                    benchmarks.entry(desc.resource).or_default().push(idx);
                }
            } else {
                detectors.push(idx);
            }
        }

        let parallelism = self.config.detector_parallelism.max(1);
        let grace = self.config.grace;

        std::thread::scope(|s| {
            // Detector waves.
            'waves: for wave in detectors.chunks(parallelism) {
                if cancel.is_cancelled() {
                    break 'waves;
                }
                let handles: Vec<_> = wave
                    .iter()
                    .map(|&idx| {
                        let probe = Arc::clone(&self.probes[idx]);
                        let cancel = cancel.clone();
                        let slots = &slots;
                        s.spawn(move || {
                            let result = run_with_timeout(probe, grace, cancel);
                            slots.lock().unwrap()[idx] = Some(result);
                        })
                    })
                    .collect();
                for handle in handles {
                    let _ = handle.join();
                }
            }

            // Benchmark classes, one sequential runner per class.
            let class_handles: Vec<_> = benchmarks
                .iter()
                .map(|(_, idxs)| {
                    let idxs = idxs.clone();
                    let cancel = cancel.clone();
                    let probes = &self.probes;
                    let slots = &slots;
                    s.spawn(move || {
                        for idx in idxs {
                            if cancel.is_cancelled() {
                                break;
                            }
                            let probe = Arc::clone(&probes[idx]);
                            let result = run_with_timeout(probe, grace, cancel.clone());
                            slots.lock().unwrap()[idx] = Some(result);
                        }
                    })
                })
                .collect();
            for handle in class_handles {
                let _ = handle.join();
            }
        });

        let slots = slots.into_inner().unwrap();
        let dispatched = slots.iter().filter(|s| s.is_some()).count();
        let expected = detectors.len() + benchmarks.values().map(Vec::len).sum::<usize>();
        let incomplete = cancel.is_cancelled() || dispatched < expected;

        let results: Vec<ProbeResult> = slots.into_iter().flatten().collect();
        log::debug!(
            "orchestration finished: {}/{} probe(s) dispatched, incomplete={}",
            dispatched,
            expected,
            incomplete
        );

        Ok(OrchestratorRun {
            results,
            incomplete,
        })
    }
}

/// Run one probe on a watched worker thread. If the worker does not report
/// back within `timeout + grace`, it is abandoned and a timeout failure is
/// recorded in its place.
fn run_with_timeout(probe: Arc<dyn Probe>, grace: Duration, cancel: CancelToken) -> ProbeResult {
    let desc = probe.descriptor().clone();
    let timeout = desc.timeout;

    let (tx, rx) = mpsc::channel();
    let worker_probe = Arc::clone(&probe);
    std::thread::spawn(move || {
        // Receiver may have given up; a failed send just drops the result.
        let _ = tx.send(run_probe(worker_probe.as_ref(), &cancel));
    });

    match rx.recv_timeout(timeout + grace) {
        Ok(result) => result,
        Err(_) => {
            log::warn!("probe {} exceeded its {:?} timeout", desc.id, timeout);
            ProbeResult::failure(
                desc.id,
                desc.category,
                ProbeError::Timeout(timeout),
                timeout + grace,
            )
        }
    }
}
