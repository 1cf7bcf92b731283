//! Disk benchmark — sequential write and read throughput.
//!
//! Writes 128 MiB of random (incompressible) data to a temp file in
//! 4 MiB chunks with a final fsync, then reads it back. Random buffers
//! keep filesystems with transparent compression honest. Results are
//! MB/s; the temp file is removed when the handle drops.

use std::io::{Read, Seek, SeekFrom, Write};
use std::time::{Duration, Instant};

use rand::RngCore;

use crate::metric::{BenchmarkKind, Category, Confidence, Metric, ProbeError, Unit};
use crate::probe::{CancelToken, Probe, ProbeDescriptor, ResourceClass};

const FILE_BYTES: usize = 128 * 1024 * 1024;
const CHUNK_BYTES: usize = 4 * 1024 * 1024;

static DISK_BENCH_DESCRIPTOR: ProbeDescriptor = ProbeDescriptor {
    id: "bench-disk",
    category: Category::Benchmark(BenchmarkKind::Disk),
    timeout: Duration::from_secs(60),
    is_benchmark: true,
    resource: ResourceClass::Disk,
};

pub struct DiskBenchProbe;

impl Probe for DiskBenchProbe {
    fn descriptor(&self) -> &ProbeDescriptor {
        &DISK_BENCH_DESCRIPTOR
    }

    fn collect(&self, cancel: &CancelToken) -> Result<Vec<Metric>, ProbeError> {
        let started = Instant::now();
        let mut file = tempfile::tempfile()
            .map_err(|e| ProbeError::Unavailable(format!("temp file: {e}")))?;

        let write_mbps = write_pass(&mut file, cancel)?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| ProbeError::Malformed(format!("seek: {e}")))?;
        let read_mbps = read_pass(&mut file, cancel)?;

        Ok(vec![
            Metric::numeric("write_speed", write_mbps, Unit::MegabytesPerSec, Confidence::Measured),
            Metric::numeric("read_speed", read_mbps, Unit::MegabytesPerSec, Confidence::Measured),
            Metric::numeric(
                "file_size",
                FILE_BYTES as f64,
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

fn write_pass(file: &mut std::fs::File, cancel: &CancelToken) -> Result<f64, ProbeError> {
    let mut rng = rand::rng();
    let mut chunk = vec![0u8; CHUNK_BYTES];
    rng.fill_bytes(&mut chunk);

    let start = Instant::now();
    let mut written = 0usize;
    while written < FILE_BYTES {
        if cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }
        file.write_all(&chunk)
            .map_err(|e| ProbeError::Malformed(format!("write: {e}")))?;
        written += CHUNK_BYTES;
        // Perturb the pattern so consecutive chunks differ.
        chunk[0] = chunk[0].wrapping_add(1);
    }
    // Flush to media so the figure reflects the disk, not the page cache.
    file.sync_all()
        .map_err(|e| ProbeError::Malformed(format!("fsync: {e}")))?;
    Ok(mbps(written, start.elapsed()))
}

fn read_pass(file: &mut std::fs::File, cancel: &CancelToken) -> Result<f64, ProbeError> {
    let mut chunk = vec![0u8; CHUNK_BYTES];
    let start = Instant::now();
    let mut total = 0usize;
    loop {
        if cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }
        let n = file
            .read(&mut chunk)
            .map_err(|e| ProbeError::Malformed(format!("read: {e}")))?;
        if n == 0 {
            break;
        }
        std::hint::black_box(&chunk[..n]);
        total += n;
    }
    Ok(mbps(total, start.elapsed()))
}

fn mbps(bytes: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64().max(1e-9);
    bytes as f64 / secs / 1e6
}
