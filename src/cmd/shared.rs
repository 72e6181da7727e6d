/*!
shared.rs - helpers shared by the info subcommands.

Focus:
  - common flags (--format, --no-probe, --timeout-ms) and their binding
  - structured output (json / yaml) and probe tables (text)
  - human sizes (binary units) and on-disk usage

Commands keep their own logic; only repeated plumbing lives here.
*/

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::cli::{CliError, FlagSpec, ParsedArgs};
use crate::cluster::{self, Endpoint, ProbeReport, Reachability};
use crate::context::ExecutionContext;
use crate::utils::format::{Role, TableOpts, color, table};

/* ---- Flags ---- */

pub const FORMAT_CHOICES: &[&str] = &["text", "json", "yaml"];
pub const MACHINE_FORMATS: &[&str] = &["json", "yaml"];

pub const FORMAT: &str = "format";
pub const NO_PROBE: &str = "no-probe";
pub const TIMEOUT_MS: &str = "timeout-ms";

pub fn format_flag() -> FlagSpec {
    FlagSpec::choice(FORMAT, FORMAT_CHOICES, "Output format")
        .short('f')
        .default_value("text")
}

pub fn no_probe_flag() -> FlagSpec {
    FlagSpec::bool(NO_PROBE, "List configured endpoints without connecting to them")
}

pub fn timeout_flag() -> FlagSpec {
    FlagSpec::int(TIMEOUT_MS, "Connect timeout per endpoint in milliseconds (default from config)")
}

/// Full user-facing path of an info subcommand, used in error messages.
pub fn command_path(name: &str) -> String {
    format!("{} {} {name}", super::ROOT, super::info::NAME)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Reads `--format`; choices were validated at parse time.
    pub fn from_args(args: &ParsedArgs) -> Self {
        match args.str(FORMAT) {
            Some("json") => OutputFormat::Json,
            Some("yaml") => OutputFormat::Yaml,
            _ => OutputFormat::Text,
        }
    }
}

/// Writes `value` as pretty JSON or YAML. Text rendering is the caller's job.
pub fn emit<T: Serialize>(ctx: &ExecutionContext, format: OutputFormat, value: &T) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let rendered = serde_json::to_string_pretty(value).context("Failed to encode JSON")?;
            writeln!(ctx.out(), "{rendered}")?;
        }
        OutputFormat::Yaml => {
            let rendered = serde_yaml::to_string(value).context("Failed to encode YAML")?;
            write!(ctx.out(), "{rendered}")?;
        }
        OutputFormat::Text => bail!("text output has no generic encoding"),
    }
    Ok(())
}

/* ---- Probing ---- */

/// `--timeout-ms` when given (must be positive), else the configured default.
pub fn probe_timeout(ctx: &ExecutionContext, args: &ParsedArgs, command: &str) -> Result<Duration, CliError> {
    match args.int(TIMEOUT_MS) {
        Some(ms) if ms > 0 => Ok(Duration::from_millis(ms as u64)),
        Some(ms) => Err(CliError::invalid_value(
            command_path(command),
            format!("--{TIMEOUT_MS}"),
            ms.to_string(),
            "must be greater than zero",
        )),
        None => Ok(Duration::from_millis(ctx.config().probe_timeout_ms)),
    }
}

/// Probes `endpoints` unless `skip`, in which case every report is `NotProbed`.
pub fn probe(endpoints: &[Endpoint], skip: bool, timeout: Duration) -> Result<Vec<ProbeReport>> {
    if skip {
        return Ok(endpoints.iter().map(ProbeReport::skipped).collect());
    }
    cluster::probe_all(endpoints, timeout)
}

pub fn reachable_count(reports: &[ProbeReport]) -> usize {
    reports.iter().filter(|r| r.reachability.is_reachable()).count()
}

/// Two-column endpoint/status table.
pub fn probe_table(ctx: &ExecutionContext, heading: &str, reports: &[ProbeReport]) -> String {
    let style = ctx.style();
    let rows: Vec<Vec<String>> = reports
        .iter()
        .map(|r| {
            let role = match r.reachability {
                Reachability::Reachable { .. } => Role::Success,
                Reachability::Unreachable { .. } => Role::Error,
                Reachability::NotProbed => Role::Dim,
            };
            vec![r.endpoint.to_string(), color(role, r.reachability.label(), style)]
        })
        .collect();
    table(&[heading, "STATUS"], &rows, TableOpts::default(), style)
}

/* ---- Sizes ---- */

const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

/// Parses `512MB`, `10GB`, `1.5TB`, `10g`, `4096` (bytes). Units are binary.
pub fn parse_size(raw: &str) -> Result<u64> {
    let s = raw.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    if number.is_empty() {
        bail!("'{raw}' does not start with a number");
    }
    let value: f64 = number
        .parse()
        .with_context(|| format!("'{number}' is not a number"))?;

    let unit = unit.trim().to_ascii_uppercase();
    let unit = unit.strip_suffix("IB").map(|u| format!("{u}B")).unwrap_or(unit);
    let exponent = match unit.as_str() {
        "" | "B" => 0,
        "K" | "KB" => 1,
        "M" | "MB" => 2,
        "G" | "GB" => 3,
        "T" | "TB" => 4,
        "P" | "PB" => 5,
        other => bail!("unknown size unit '{other}' in '{raw}'"),
    };
    let bytes = value * 1024f64.powi(exponent);
    if !bytes.is_finite() || bytes > u64::MAX as f64 {
        bail!("size '{raw}' is too large");
    }
    Ok(bytes.round() as u64)
}

/// Renders bytes with the largest unit that keeps the value >= 1.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 || value.fract() == 0.0 {
        format!("{value:.0}{}", UNITS[unit])
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}

pub fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64 * 1000.0).round() / 10.0
}

/// Total size of regular files below `path`; 0 when it does not exist.
/// Symlinks are not followed.
pub fn dir_size(path: &Path) -> Result<u64> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e).with_context(|| format!("cannot stat {}", path.display())),
    };
    if meta.is_file() {
        return Ok(meta.len());
    }
    if !meta.is_dir() {
        return Ok(0);
    }
    let mut total = 0u64;
    let entries = std::fs::read_dir(path).with_context(|| format!("cannot list {}", path.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("cannot list {}", path.display()))?;
        total = total.saturating_add(dir_size(&entry.path())?);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("512MB").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_size("10g").unwrap(), 10 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("1.5KiB").unwrap(), 1536);
        assert_eq!(parse_size(" 2 TB ").unwrap(), 2 * 1024u64.pow(4));
        assert!(parse_size("GB").is_err());
        assert!(parse_size("10XB").is_err());
        assert!(parse_size("").is_err());
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(1023), "1023B");
        assert_eq!(format_size(1536), "1.5KB");
        assert_eq!(format_size(10 * 1024 * 1024 * 1024), "10GB");
    }

    #[test]
    fn percent_rounds_to_one_decimal() {
        assert_eq!(percent(1, 3), 33.3);
        assert_eq!(percent(5, 0), 0.0);
    }

    #[test]
    fn dir_size_is_recursive() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/one"), vec![0u8; 10]).unwrap();
        std::fs::write(dir.path().join("a/b/two"), vec![0u8; 5]).unwrap();
        assert_eq!(dir_size(dir.path()).unwrap(), 15);
        assert_eq!(dir_size(&dir.path().join("missing")).unwrap(), 0);
    }
}
