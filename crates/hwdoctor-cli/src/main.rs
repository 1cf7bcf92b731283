//! CLI for hwdoctor — a health check-up for your machine.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hwdoctor")]
#[command(about = "hwdoctor — a health check-up for your machine")]
#[command(version = hwdoctor_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the probes available on this machine
    Scan,

    /// Probe the hardware, run benchmarks, and print a scored health report
    Analyze {
        /// Skip the synthetic benchmarks (detectors only, much faster)
        #[arg(long)]
        skip_benchmarks: bool,

        /// Comma-separated probe id filter (partial match), or "all"
        #[arg(long)]
        probes: Option<String>,

        /// Directory to write hwdoctor_report_<timestamp>.json into
        /// (default: current directory)
        #[arg(long, value_name = "DIR")]
        output: Option<String>,

        /// Print the JSON report to stdout instead of the summary table
        #[arg(long)]
        json: bool,

        /// Do not write a report file
        #[arg(long)]
        no_report: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan => commands::scan::run(),
        Commands::Analyze {
            skip_benchmarks,
            probes,
            output,
            json,
            no_report,
        } => commands::analyze::run(commands::analyze::AnalyzeCommandConfig {
            skip_benchmarks,
            probe_filter: probes.as_deref(),
            output_dir: output.as_deref(),
            json,
            write_report: !no_report,
        }),
    }
}
