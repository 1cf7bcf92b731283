use hwdoctor_core::{default_probes, detect_machine_info};

pub fn run() {
    let machine = detect_machine_info();
    println!(
        "Machine: {} — {} ({}, {} cores)",
        machine.hostname, machine.chip, machine.arch, machine.cores
    );
    println!("OS: {}", machine.os);
    println!();

    let probes = default_probes();
    let detectors: Vec<_> = probes.iter().filter(|p| !p.descriptor().is_benchmark).collect();
    let benchmarks: Vec<_> = probes.iter().filter(|p| p.descriptor().is_benchmark).collect();

    println!("Detectors:\n");
    for probe in &detectors {
        let desc = probe.descriptor();
        let mark = if probe.is_available() { "\u{2705}" } else { "\u{274C}" };
        println!(
            "  {mark} {:<10} {:<10} timeout {}s",
            desc.id,
            desc.category.to_string(),
            desc.timeout.as_secs()
        );
    }

    println!("\nBenchmarks (skipped with --skip-benchmarks):\n");
    for probe in &benchmarks {
        let desc = probe.descriptor();
        let mark = if probe.is_available() { "\u{2705}" } else { "\u{274C}" };
        println!(
            "  {mark} {:<14} {:<16} timeout {}s",
            desc.id,
            desc.category.to_string(),
            desc.timeout.as_secs()
        );
    }
}
