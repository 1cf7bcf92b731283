//! Synthetic workload benchmarks.
//!
//! Each benchmark owns a `ResourceClass` so the orchestrator never runs
//! two benchmarks contending for the same resource at once. All of them
//! poll the cancel token between work chunks and bail with
//! `ProbeError::Cancelled` so an interrupted run still produces a report
//! from whatever finished.

pub mod cpu;
pub mod disk;
pub mod memory;

pub use cpu::CpuBenchProbe;
pub use disk::DiskBenchProbe;
pub use memory::MemoryBenchProbe;
