//! CPU benchmark — prime sieving throughput.
//!
//! Repeatedly sieves primes below a fixed limit for a short window and
//! reports sieve passes per second, once single-threaded and once with a
//! worker per logical core. The multi/single ratio doubles as a rough
//! parallel-scaling figure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::metric::{BenchmarkKind, Category, Confidence, Metric, ProbeError, Unit};
use crate::probe::{CancelToken, Probe, ProbeDescriptor, ResourceClass};

const SIEVE_LIMIT: usize = 200_000;
const RUN_WINDOW: Duration = Duration::from_millis(1500);
/// Scales passes/sec into a score comparable across the benchmark family.
const SCORE_FACTOR: f64 = 50.0;

static CPU_BENCH_DESCRIPTOR: ProbeDescriptor = ProbeDescriptor {
    id: "bench-cpu",
    category: Category::Benchmark(BenchmarkKind::Cpu),
    timeout: Duration::from_secs(30),
    is_benchmark: true,
    resource: ResourceClass::Cpu,
};

pub struct CpuBenchProbe;

impl Probe for CpuBenchProbe {
    fn descriptor(&self) -> &ProbeDescriptor {
        &CPU_BENCH_DESCRIPTOR
    }

    fn collect(&self, cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError> {
        let started = Instant::now();

        let single_rate = run_single(cancel)?;
        let threads = std::thread::available_parallelism().map_or(1, |n| n.get());
        let multi_rate = run_multi(cancel, threads)?;

        let mut metrics = vec![
            Metric::numeric(
                "single_core_score",
                single_rate * SCORE_FACTOR,
                Unit::Count,
                Confidence::Measured,
            ),
            Metric::numeric(
                "multi_core_score",
                multi_rate * SCORE_FACTOR,
                Unit::Count,
                Confidence::Measured,
            ),
            Metric::numeric("threads", threads as f64, Unit::Count, Confidence::Reported),
            Metric::numeric(
                "duration",
                started.elapsed().as_secs_f64(),
                Unit::Seconds,
                Confidence::Measured,
            ),
        ];
        if single_rate > 0.0 {
            // A plain multiple (2x, 8x, ...), not a 0-1 fraction.
            metrics.push(Metric::numeric(
                "scaling_factor",
                multi_rate / single_rate,
                Unit::Count,
                Confidence::Estimated,
            ));
        }
        Ok(metrics)
    }
}

/// Sieve passes per second on one thread.
fn run_single(cancel: &CancelToken) -> Result<f64, ProbeError> {
    let start = Instant::now();
    let mut passes = 0u64;
    while start.elapsed() < RUN_WINDOW {
        if cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }
        std::hint::black_box(sieve_count(SIEVE_LIMIT));
        passes += 1;
    }
    Ok(passes as f64 / start.elapsed().as_secs_f64())
}

/// Aggregate passes per second across `threads` workers.
fn run_multi(cancel: &CancelToken, threads: usize) -> Result<f64, ProbeError> {
    let total = AtomicU64::new(0);
    let start = Instant::now();

    std::thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| {
                let mut passes = 0u64;
                while start.elapsed() < RUN_WINDOW && !cancel.is_cancelled() {
                    std::hint::black_box(sieve_count(SIEVE_LIMIT));
                    passes += 1;
                }
                total.fetch_add(passes, Ordering::Relaxed);
            });
        }
    });

    if cancel.is_cancelled() {
        return Err(ProbeError::Cancelled);
    }
    Ok(total.load(Ordering::Relaxed) as f64 / start.elapsed().as_secs_f64())
}

/// Count of primes below `limit` via the classic sieve of Eratosthenes.
fn sieve_count(limit: usize) -> usize {
    let mut composite = vec![false; limit];
    let mut count = 0;
    for n in 2..limit {
        if composite[n] {
            continue;
        }
        count += 1;
        let mut multiple = n * n;
        while multiple < limit {
            composite[multiple] = true;
            multiple += n;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_is_cpu_benchmark() {
        let desc = CpuBenchProbe.descriptor();
        assert!(desc.is_benchmark);
        assert_eq!(desc.resource, ResourceClass::Cpu);
    }

    #[test]
    fn sieve_counts_are_exact() {
        assert_eq!(sieve_count(10), 4); // 2 3 5 7
        assert_eq!(sieve_count(100), 25);
        assert_eq!(sieve_count(1000), 168);
    }

    #[test]
    fn cancelled_single_run_bails() {
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(run_single(&cancel), Err(ProbeError::Cancelled)));
    }
}
