//! Shared helpers used by multiple probe implementations.

use std::path::Path;

/// Check if a command exists by running `which`.
pub fn command_exists(name: &str) -> bool {
    std::process::Command::new("which")
        .arg(name)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run a subprocess command and return its stdout as a `String`.
///
/// Returns `None` if the command fails to execute or exits with a non-zero
/// status. Shared helper for probes that shell out to system utilities
/// (smartctl, nvidia-smi, lspci, sysctl, system_profiler).
pub fn run_command(program: &str, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Read a sysfs/procfs file and return its trimmed contents.
pub fn read_trimmed(path: impl AsRef<Path>) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
}

/// Read a sysfs/procfs file and parse it as a number.
pub fn read_parsed<T: std::str::FromStr>(path: impl AsRef<Path>) -> Option<T> {
    read_trimmed(path)?.parse().ok()
}

/// Value of a `Key: value` line, e.g. from `/proc/meminfo` or tool output.
pub fn kv_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(key)?;
    Some(rest.trim_start_matches(':').trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_exists_true() {
        assert!(command_exists("echo"));
    }

    #[test]
    fn command_exists_false() {
        assert!(!command_exists("nonexistent_binary_xyz_12345"));
    }

    #[test]
    fn run_command_echo() {
        let out = run_command("echo", &["hello"]);
        assert_eq!(out.unwrap().trim(), "hello");
    }

    #[test]
    fn run_command_failing_status() {
        assert!(run_command("false", &[]).is_none());
    }

    #[test]
    fn read_trimmed_missing_file() {
        assert!(read_trimmed("/nonexistent/path/xyz").is_none());
    }

    #[test]
    fn kv_value_basic() {
        assert_eq!(kv_value("MemTotal:       16307728 kB", "MemTotal"), Some("16307728 kB"));
        assert_eq!(kv_value("MemTotal: 1", "SwapTotal"), None);
    }
}
