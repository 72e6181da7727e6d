//! `info collect`: snapshot configuration, recent logs, environment and
//! cluster reachability into a local directory that can be attached to a
//! support ticket.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

use super::version::{VERSION, revision};
use crate::cli::{CliError, Command, FlagSpec, ParsedArgs, PositionalSpec};
use crate::cluster::ProbeReport;
use crate::cmd::shared;
use crate::context::ExecutionContext;

const CATEGORIES: &[&str] = &["all", "config", "logs", "env", "cluster"];
const OUTPUT_DIR: &str = "output-dir";
const MAX_LOG_FILES: &str = "max-log-files";
const FORCE: &str = "force";

pub struct Collect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Category {
    Config,
    Logs,
    Env,
    Cluster,
}

impl Category {
    const ALL: [Category; 4] = [Category::Config, Category::Logs, Category::Env, Category::Cluster];

    /// Requested categories in canonical order; empty or `all` selects everything.
    fn selected(raw: &[String]) -> Vec<Category> {
        if raw.is_empty() || raw.iter().any(|c| c == "all") {
            return Self::ALL.to_vec();
        }
        Self::ALL
            .into_iter()
            .filter(|cat| raw.iter().any(|r| r == cat.name()))
            .collect()
    }

    fn name(self) -> &'static str {
        match self {
            Category::Config => "config",
            Category::Logs => "logs",
            Category::Env => "env",
            Category::Cluster => "cluster",
        }
    }
}

#[derive(Serialize)]
struct EnvSnapshot<'a> {
    cli_version: &'static str,
    revision: &'static str,
    os: &'static str,
    arch: &'static str,
    home: &'a Path,
    conf_dir: &'a Path,
    logs_dir: &'a Path,
    config_files: &'a [PathBuf],
    variables: BTreeMap<&'a str, &'a str>,
}

#[derive(Serialize)]
struct ClusterSnapshot {
    masters: Vec<ProbeReport>,
    workers: Vec<ProbeReport>,
}

/// Files written so far, relative to the output dir, plus skipped categories.
#[derive(Default)]
struct Bundle {
    root: PathBuf,
    written: Vec<PathBuf>,
    skipped: Vec<String>,
}

impl Bundle {
    fn write(&mut self, rel: impl AsRef<Path>, contents: &[u8]) -> Result<()> {
        let rel = rel.as_ref();
        let dest = self.root.join(rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        std::fs::write(&dest, contents).with_context(|| format!("cannot write {}", dest.display()))?;
        self.written.push(rel.to_path_buf());
        Ok(())
    }

    fn copy(&mut self, src: &Path, rel: impl AsRef<Path>) -> Result<()> {
        let bytes = std::fs::read(src).with_context(|| format!("cannot read {}", src.display()))?;
        self.write(rel, &bytes)
    }
}

impl Command for Collect {
    fn name(&self) -> &str {
        "collect"
    }

    fn description(&self) -> &str {
        "Collect cluster information into a local directory for troubleshooting"
    }

    fn flags(&self) -> Vec<FlagSpec> {
        vec![
            FlagSpec::string(OUTPUT_DIR, "Directory to write the collected files to")
                .short('o')
                .required(),
            FlagSpec::int(MAX_LOG_FILES, "Most recent log files to copy").default_value("10"),
            FlagSpec::bool(FORCE, "Write into a non-empty output directory"),
        ]
    }

    fn positionals(&self) -> Option<PositionalSpec> {
        Some(PositionalSpec::many("category", "What to collect (default all)").choices(CATEGORIES))
    }

    fn run(&self, ctx: &ExecutionContext, args: &ParsedArgs) -> Result<(), CliError> {
        let raw_dir = args.str(OUTPUT_DIR).unwrap_or_default();
        if raw_dir.trim().is_empty() {
            return Err(self.usage(OUTPUT_DIR, raw_dir.to_string(), "must not be empty"));
        }
        let output_dir = PathBuf::from(raw_dir);
        let max_logs = match args.int(MAX_LOG_FILES).unwrap_or(10) {
            n if n < 0 => {
                return Err(self.usage(MAX_LOG_FILES, n.to_string(), "must not be negative"));
            }
            n => usize::try_from(n).unwrap_or(usize::MAX),
        };
        let occupied = is_non_empty_dir(&output_dir)
            .with_context(|| format!("cannot inspect {}", output_dir.display()))?;
        if occupied && !args.flag(FORCE) {
            return Err(self.usage(
                OUTPUT_DIR,
                output_dir.display().to_string(),
                "directory is not empty; pass --force to write into it",
            ));
        }
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("cannot create {}", output_dir.display()))?;

        let mut bundle = Bundle {
            root: output_dir.clone(),
            ..Bundle::default()
        };
        for category in Category::selected(args.positionals()) {
            debug!(category = category.name(), "collecting");
            match category {
                Category::Config => collect_config(ctx, &mut bundle)?,
                Category::Logs => collect_logs(ctx, max_logs, &mut bundle)?,
                Category::Env => collect_env(ctx, &mut bundle)?,
                Category::Cluster => collect_cluster(ctx, &mut bundle)?,
            }
        }

        for rel in &bundle.written {
            writeln!(ctx.out(), "Wrote {}", output_dir.join(rel).display())?;
        }
        for note in &bundle.skipped {
            writeln!(ctx.out(), "Skipped {note}")?;
        }
        writeln!(
            ctx.out(),
            "Collected {} file(s) into {}",
            bundle.written.len(),
            output_dir.display()
        )?;
        Ok(())
    }
}

impl Collect {
    fn usage(&self, flag: &str, value: String, reason: &str) -> CliError {
        CliError::invalid_value(shared::command_path(self.name()), format!("--{flag}"), value, reason)
    }
}

/// A missing directory counts as empty; any other read failure is reported.
fn is_non_empty_dir(path: &Path) -> std::io::Result<bool> {
    match std::fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn collect_config(ctx: &ExecutionContext, bundle: &mut Bundle) -> Result<()> {
    let conf_dir = ctx.conf_dir();
    let entries = std::fs::read_dir(conf_dir)
        .with_context(|| format!("cannot list {}", conf_dir.display()))?;
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("cannot list {}", conf_dir.display()))?
            .path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    for path in files {
        if let Some(name) = path.file_name() {
            bundle.copy(&path, Path::new("conf").join(name))?;
        }
    }

    let effective = serde_yaml::to_string(ctx.config()).context("cannot encode configuration")?;
    bundle.write("effective-config.yaml", effective.as_bytes())
}

fn collect_logs(ctx: &ExecutionContext, max: usize, bundle: &mut Bundle) -> Result<()> {
    let logs_dir = ctx.logs_dir();
    if !logs_dir.is_dir() {
        warn!(dir = %logs_dir.display(), "logs directory not found; skipping logs");
        bundle
            .skipped
            .push(format!("logs: {} does not exist", logs_dir.display()));
        return Ok(());
    }

    let mut logs: Vec<(SystemTime, PathBuf)> = Vec::new();
    let entries = std::fs::read_dir(logs_dir)
        .with_context(|| format!("cannot list {}", logs_dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("cannot list {}", logs_dir.display()))?;
        let meta = entry.metadata()?;
        if meta.is_file() {
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            logs.push((modified, entry.path()));
        }
    }
    // Newest first; name breaks ties so the selection is stable.
    logs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    for (_, path) in logs.into_iter().take(max) {
        if let Some(name) = path.file_name() {
            bundle.copy(&path, Path::new("logs").join(name))?;
        }
    }
    Ok(())
}

fn collect_env(ctx: &ExecutionContext, bundle: &mut Bundle) -> Result<()> {
    let snapshot = EnvSnapshot {
        cli_version: VERSION,
        revision: revision(),
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        home: ctx.home(),
        conf_dir: ctx.conf_dir(),
        logs_dir: ctx.logs_dir(),
        config_files: ctx.config_files(),
        variables: ctx.env().with_prefix("ALLUXIO_").collect(),
    };
    let rendered = serde_json::to_vec_pretty(&snapshot).context("cannot encode environment")?;
    bundle.write("env.json", &rendered)
}

fn collect_cluster(ctx: &ExecutionContext, bundle: &mut Bundle) -> Result<()> {
    let timeout = std::time::Duration::from_millis(ctx.config().probe_timeout_ms);
    let snapshot = ClusterSnapshot {
        masters: shared::probe(ctx.masters(), false, timeout)?,
        workers: shared::probe(ctx.workers(), false, timeout)?,
    };
    let rendered = serde_json::to_vec_pretty(&snapshot).context("cannot encode cluster status")?;
    bundle.write("cluster.json", &rendered)
}
