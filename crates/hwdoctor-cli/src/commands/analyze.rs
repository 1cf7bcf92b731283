use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hwdoctor_core::{
    CancelToken, Orchestrator, OrchestratorConfig, ProbeOutcome, ReportModel, Severity,
    SeverityBand, build_report, format_timestamp_compact,
};

pub struct AnalyzeCommandConfig<'a> {
    pub skip_benchmarks: bool,
    pub probe_filter: Option<&'a str>,
    pub output_dir: Option<&'a str>,
    pub json: bool,
    pub write_report: bool,
}

pub fn run(cfg: AnalyzeCommandConfig<'_>) {
    let probes = super::select_probes(cfg.probe_filter);

    let mut orchestrator = Orchestrator::new(OrchestratorConfig {
        skip_benchmarks: cfg.skip_benchmarks,
        ..OrchestratorConfig::default()
    });
    let benchmark_count = probes
        .iter()
        .filter(|p| p.descriptor().is_benchmark)
        .count();
    let probe_count = probes.len();
    for probe in probes {
        orchestrator.register(probe);
    }

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            eprintln!("\nInterrupted — finishing probes already in flight...");
            cancel.cancel();
        }) {
            log::warn!("could not install Ctrl-C handler: {e}");
        }
    }

    if !cfg.json {
        if cfg.skip_benchmarks {
            println!("Running {probe_count} probe(s), benchmarks skipped...\n");
        } else {
            println!("Running {probe_count} probe(s) ({benchmark_count} benchmark(s))...\n");
        }
    }

    let run = match orchestrator.run(&cancel) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let report = build_report(run);

    if cfg.json {
        match report.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: could not serialize report: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print_summary(&report);
    }

    if cfg.write_report {
        write_report_file(&report, cfg.output_dir);
    }
}

fn print_summary(report: &ReportModel) {
    println!(
        "Machine: {} — {} ({}, {} cores)",
        report.machine.hostname, report.machine.chip, report.machine.arch, report.machine.cores
    );
    println!("OS: {}", report.machine.os);
    if report.incomplete {
        println!("\n\u{26A0}\u{FE0F}  Run was interrupted; the report covers completed probes only.");
    }

    println!("\nProbes:\n");
    for result in &report.results {
        match &result.outcome {
            ProbeOutcome::Success { metrics } => {
                println!(
                    "  \u{2705} {:<14} {:>3} metric(s)  {:>6.2}s",
                    result.probe_id,
                    metrics.len(),
                    result.elapsed.as_secs_f64()
                );
            }
            ProbeOutcome::Failure { reason, .. } => {
                println!("  \u{274C} {:<14} {reason}", result.probe_id);
            }
        }
    }

    if report.findings.is_empty() {
        println!("\nFindings: none");
    } else {
        println!("\nFindings:\n");
        for finding in &report.findings {
            let mark = match finding.severity {
                Severity::Warning => "\u{26A0}\u{FE0F} ",
                Severity::Critical => "\u{274C}",
            };
            println!(
                "  {mark} [{}] {} (-{})",
                finding.rule_id, finding.message, finding.points
            );
        }
    }

    let band_mark = match report.band {
        SeverityBand::Healthy => "\u{2705}",
        SeverityBand::Attention => "\u{26A0}\u{FE0F} ",
        SeverityBand::Critical => "\u{274C}",
    };
    println!(
        "\nHealth score: {}/100 {band_mark} {}",
        report.score, report.band
    );
}

/// Timestamped report name under the given directory (current directory
/// when none was requested).
fn report_path(output_dir: Option<&str>, since_epoch: Duration) -> PathBuf {
    let name = format!(
        "hwdoctor_report_{}.json",
        format_timestamp_compact(since_epoch)
    );
    Path::new(output_dir.unwrap_or(".")).join(name)
}

fn write_report_file(report: &ReportModel, output_dir: Option<&str>) {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let path = report_path(output_dir, now);

    let json = match report.to_json() {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error: could not serialize report: {e}");
            return;
        }
    };
    match std::fs::write(&path, json) {
        Ok(()) => println!("\nFull report written to {}", path.display()),
        Err(e) => eprintln!("Error: could not write {}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lands_under_the_requested_directory() {
        let path = report_path(Some("/var/reports"), Duration::from_secs(1_709_208_000));
        assert_eq!(
            path,
            Path::new("/var/reports/hwdoctor_report_20240229_120000.json")
        );
    }

    #[test]
    fn report_defaults_to_current_directory() {
        let path = report_path(None, Duration::ZERO);
        assert_eq!(path, Path::new("./hwdoctor_report_19700101_000000.json"));
    }
}
