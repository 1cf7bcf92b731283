//! Memory benchmark — sequential read/write bandwidth.
//!
//! Streams a 256 MiB `u64` buffer: one pass writing a rolling pattern,
//! one pass folding the contents back into a checksum the optimizer
//! cannot discard. Both figures are reported in GB/s.

use std::time::{Duration, Instant};

use crate::metric::{BenchmarkKind, Category, Confidence, Metric, ProbeError, Unit};
use crate::probe::{CancelToken, Probe, ProbeDescriptor, ResourceClass};

const BUFFER_BYTES: usize = 256 * 1024 * 1024;
const WORDS: usize = BUFFER_BYTES / 8;
/// Cancel checkpoints every 8 MiB of traffic.
const CHUNK_WORDS: usize = 1024 * 1024;

static MEMORY_BENCH_DESCRIPTOR: ProbeDescriptor = ProbeDescriptor {
    id: "bench-memory",
    category: Category::Benchmark(BenchmarkKind::Memory),
    timeout: Duration::from_secs(30),
    is_benchmark: true,
    resource: ResourceClass::Memory,
};

pub struct MemoryBenchProbe;

impl Probe for MemoryBenchProbe {
    fn descriptor(&self) -> &ProbeDescriptor {
        &MEMORY_BENCH_DESCRIPTOR
    }

    fn collect(&self, cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError> {
        let started = Instant::now();
        let mut buffer = vec![0u64; WORDS];

        let write_gbps = write_pass(&mut buffer, cancel)?;
        let read_gbps = read_pass(&buffer, cancel)?;

        Ok(vec![
            Metric::numeric("write_bandwidth", write_gbps, Unit::GigabytesPerSec, Confidence::Measured),
            Metric::numeric("read_bandwidth", read_gbps, Unit::GigabytesPerSec, Confidence::Measured),
            Metric::numeric(
                "buffer_size",
                BUFFER_BYTES as f64,
                Unit::Bytes,
                Confidence::Reported,
            ),
            Metric::numeric(
                "duration",
                started.elapsed().as_secs_f64(),
                Unit::Seconds,
                Confidence::Measured,
            ),
        ])
    }
}

fn write_pass(buffer: &mut [u64], cancel: &CancelToken) -> Result<f64, ProbeError> {
    let start = Instant::now();
    for (chunk_idx, chunk) in buffer.chunks_mut(CHUNK_WORDS).enumerate() {
        if cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }
        let base = (chunk_idx * CHUNK_WORDS) as u64;
        for (i, word) in chunk.iter_mut().enumerate() {
            *word = base.wrapping_add(i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        }
    }
    Ok(gbps(buffer.len() * 8, start.elapsed()))
}

fn read_pass(buffer: &[u64], cancel: &CancelToken) -> Result<f64, ProbeError> {
    let start = Instant::now();
    let mut checksum = 0u64;
    for chunk in buffer.chunks(CHUNK_WORDS) {
        if cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }
        for word in chunk {
            checksum = checksum.wrapping_add(*word);
        }
    }
    std::hint::black_box(checksum);
    Ok(gbps(buffer.len() * 8, start.elapsed()))
}

fn gbps(bytes: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64().max(1e-9);
    bytes as f64 / secs / 1e9
}
