use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use crate::cli::{CliError, Command, FlagSpec, ParsedArgs};
use crate::cmd::shared::{self, OutputFormat, format_size};
use crate::context::{CacheDir, ExecutionContext};
use crate::utils::format::{TableOpts, table};

const DIR: &str = "dir";

pub struct Cache;

#[derive(Debug, Serialize)]
struct DirUsage {
    path: PathBuf,
    quota_bytes: u64,
    used_bytes: u64,
    used_percent: f64,
}

#[derive(Debug, Serialize)]
struct CacheUsage {
    dirs: Vec<DirUsage>,
    total_quota_bytes: u64,
    total_used_bytes: u64,
    used_percent: f64,
}

impl Command for Cache {
    fn name(&self) -> &str {
        "cache"
    }

    fn description(&self) -> &str {
        "Show capacity and usage of the configured cache directories"
    }

    fn flags(&self) -> Vec<FlagSpec> {
        vec![
            shared::format_flag(),
            FlagSpec::repeated(DIR, "Only report this cache directory (repeatable)"),
        ]
    }

    fn run(&self, ctx: &ExecutionContext, args: &ParsedArgs) -> Result<(), CliError> {
        let configured = &ctx.config().cache.dirs;
        let selected = select_dirs(configured, args.list(DIR))?;

        let mut dirs = Vec::with_capacity(selected.len());
        for dir in selected {
            dirs.push(measure(dir)?);
        }
        let total_quota_bytes = dirs.iter().map(|d| d.quota_bytes).sum();
        let total_used_bytes = dirs.iter().map(|d| d.used_bytes).sum();
        let usage = CacheUsage {
            used_percent: shared::percent(total_used_bytes, total_quota_bytes),
            dirs,
            total_quota_bytes,
            total_used_bytes,
        };

        let format = OutputFormat::from_args(args);
        if format != OutputFormat::Text {
            shared::emit(ctx, format, &usage)?;
            return Ok(());
        }
        render_text(ctx, &usage)?;
        Ok(())
    }
}

/// Configured dirs, optionally narrowed to `wanted`. Every wanted path must be configured.
fn select_dirs<'c>(configured: &'c [CacheDir], wanted: &[String]) -> Result<Vec<&'c CacheDir>, CliError> {
    if wanted.is_empty() {
        return Ok(configured.iter().collect());
    }
    let mut selected = Vec::with_capacity(wanted.len());
    for raw in wanted {
        let path = Path::new(raw);
        let Some(dir) = configured.iter().find(|d| d.path == path) else {
            return Err(CliError::invalid_value(
                shared::command_path("cache"),
                format!("--{DIR}"),
                raw.clone(),
                "not a configured cache directory",
            ));
        };
        if !selected.iter().any(|d: &&CacheDir| std::ptr::eq(*d, dir)) {
            selected.push(dir);
        }
    }
    Ok(selected)
}

fn measure(dir: &CacheDir) -> anyhow::Result<DirUsage> {
    let quota_bytes = shared::parse_size(&dir.quota)
        .with_context(|| format!("invalid quota for cache directory {}", dir.path.display()))?;
    let used_bytes = shared::dir_size(&dir.path)?;
    Ok(DirUsage {
        path: dir.path.clone(),
        quota_bytes,
        used_bytes,
        used_percent: shared::percent(used_bytes, quota_bytes),
    })
}

fn render_text(ctx: &ExecutionContext, usage: &CacheUsage) -> std::io::Result<()> {
    if usage.dirs.is_empty() {
        return writeln!(ctx.out(), "No cache directories configured.");
    }
    let rows: Vec<Vec<String>> = usage
        .dirs
        .iter()
        .map(|d| {
            vec![
                d.path.display().to_string(),
                format_size(d.quota_bytes),
                format_size(d.used_bytes),
                format!("{:.1}%", d.used_percent),
            ]
        })
        .collect();
    writeln!(
        ctx.out(),
        "{}",
        table(
            &["PATH", "QUOTA", "USED", "USE%"],
            &rows,
            TableOpts::default(),
            ctx.style()
        )
    )?;
    writeln!(
        ctx.out(),
        "\nTotal: {} of {} used ({:.1}%)",
        format_size(usage.total_used_bytes),
        format_size(usage.total_quota_bytes),
        usage.used_percent
    )
}
