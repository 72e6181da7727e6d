//! `info doctor`: local sanity checks over configuration, connectivity and
//! cache storage. Every finding is printed; failures are counted and turn
//! into a non-zero exit.

use crate::cli::{CliError, Command, FlagSpec, ParsedArgs, PositionalSpec};
use crate::cluster::Reachability;
use crate::cmd::shared;
use crate::context::{ExecutionContext, config::SITE_FILE};
use crate::utils::format::{Role, color};

const CHECKS: &[&str] = &["all", "config", "connectivity", "storage"];

/// Usage above this share of the quota is flagged.
const HIGH_USAGE_PERCENT: f64 = 90.0;

pub struct Doctor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Pass,
    Warn,
    Fail,
}

impl Status {
    fn tag(self) -> (&'static str, Role) {
        match self {
            Status::Pass => ("[PASS]", Role::Success),
            Status::Warn => ("[WARN]", Role::Warning),
            Status::Fail => ("[FAIL]", Role::Error),
        }
    }
}

#[derive(Debug)]
struct Finding {
    status: Status,
    message: String,
}

#[derive(Default)]
struct Findings(Vec<Finding>);

impl Findings {
    fn push(&mut self, status: Status, message: impl Into<String>) {
        self.0.push(Finding {
            status,
            message: message.into(),
        });
    }

    fn count(&self, status: Status) -> usize {
        self.0.iter().filter(|f| f.status == status).count()
    }
}

impl Command for Doctor {
    fn name(&self) -> &str {
        "doctor"
    }

    fn description(&self) -> &str {
        "Run checks against the installation and cluster configuration"
    }

    fn flags(&self) -> Vec<FlagSpec> {
        vec![shared::timeout_flag()]
    }

    fn positionals(&self) -> Option<PositionalSpec> {
        Some(PositionalSpec::one("check", "Which checks to run (default all)").choices(CHECKS))
    }

    fn run(&self, ctx: &ExecutionContext, args: &ParsedArgs) -> Result<(), CliError> {
        let which = args.positionals().first().map(String::as_str).unwrap_or("all");
        let timeout = shared::probe_timeout(ctx, args, self.name())?;

        let mut findings = Findings::default();
        if matches!(which, "all" | "config") {
            check_config(ctx, &mut findings);
        }
        if matches!(which, "all" | "connectivity") {
            check_connectivity(ctx, timeout, &mut findings)?;
        }
        if matches!(which, "all" | "storage") {
            check_storage(ctx, &mut findings)?;
        }

        let style = ctx.style();
        for finding in &findings.0 {
            let (tag, role) = finding.status.tag();
            writeln!(ctx.out(), "{} {}", color(role, tag, style), finding.message)?;
        }
        let failed = findings.count(Status::Fail);
        writeln!(
            ctx.out(),
            "\n{} passed, {} warning(s), {} failed",
            findings.count(Status::Pass),
            findings.count(Status::Warn),
            failed
        )?;

        if failed > 0 {
            return Err(CliError::execution(format!("doctor found {failed} problem(s)")));
        }
        Ok(())
    }
}

fn check_config(ctx: &ExecutionContext, findings: &mut Findings) {
    if ctx.config_files().is_empty() {
        findings.push(
            Status::Warn,
            format!("no {SITE_FILE} in {}; using built-in defaults", ctx.conf_dir().display()),
        );
    } else {
        for file in ctx.config_files() {
            findings.push(Status::Pass, format!("configuration loaded from {}", file.display()));
        }
    }

    findings.push(
        Status::Pass,
        format!("{} master endpoint(s) configured", ctx.masters().len()),
    );
    if ctx.workers().is_empty() {
        findings.push(Status::Warn, "no worker nodes configured");
    } else {
        findings.push(
            Status::Pass,
            format!("{} worker endpoint(s) configured", ctx.workers().len()),
        );
    }

    if ctx.logs_dir().is_dir() {
        findings.push(Status::Pass, format!("logs directory {} exists", ctx.logs_dir().display()));
    } else {
        findings.push(
            Status::Warn,
            format!("logs directory {} does not exist", ctx.logs_dir().display()),
        );
    }
}

fn check_connectivity(
    ctx: &ExecutionContext,
    timeout: std::time::Duration,
    findings: &mut Findings,
) -> anyhow::Result<()> {
    let masters = shared::probe(ctx.masters(), false, timeout)?;
    for report in &masters {
        match &report.reachability {
            Reachability::Reachable { latency_ms } => findings.push(
                Status::Pass,
                format!("master {} reachable in {latency_ms} ms", report.endpoint),
            ),
            other => findings.push(
                Status::Fail,
                format!("master {} {}", report.endpoint, other.label()),
            ),
        }
    }

    // A missing worker degrades capacity but does not break the cluster.
    let workers = shared::probe(ctx.workers(), false, timeout)?;
    for report in &workers {
        match &report.reachability {
            Reachability::Reachable { latency_ms } => findings.push(
                Status::Pass,
                format!("worker {} reachable in {latency_ms} ms", report.endpoint),
            ),
            other => findings.push(
                Status::Warn,
                format!("worker {} {}", report.endpoint, other.label()),
            ),
        }
    }
    Ok(())
}

fn check_storage(ctx: &ExecutionContext, findings: &mut Findings) -> anyhow::Result<()> {
    let dirs = &ctx.config().cache.dirs;
    if dirs.is_empty() {
        findings.push(Status::Warn, "no cache directories configured");
        return Ok(());
    }
    for dir in dirs {
        let path = dir.path.display();
        let quota = match shared::parse_size(&dir.quota) {
            Ok(q) if q > 0 => q,
            Ok(_) => {
                findings.push(Status::Fail, format!("cache directory {path} has a zero quota"));
                continue;
            }
            Err(e) => {
                findings.push(Status::Fail, format!("cache directory {path}: {e:#}"));
                continue;
            }
        };
        if !dir.path.exists() {
            findings.push(
                Status::Warn,
                format!("cache directory {path} does not exist yet"),
            );
            continue;
        }
        if !dir.path.is_dir() {
            findings.push(Status::Fail, format!("cache path {path} is not a directory"));
            continue;
        }
        let used = shared::dir_size(&dir.path)?;
        let pct = shared::percent(used, quota);
        if pct > HIGH_USAGE_PERCENT {
            findings.push(
                Status::Warn,
                format!("cache directory {path} is {pct:.1}% full"),
            );
        } else {
            findings.push(
                Status::Pass,
                format!(
                    "cache directory {path}: {} of {} used",
                    shared::format_size(used),
                    shared::format_size(quota)
                ),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Dispatcher, Exit};
    use crate::cmd::registry;
    use crate::context::tests::{captured_context, install};

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn config_checks_warn_on_defaults() {
        let dir = install(None);
        let (ctx, out, _err) = captured_context(&dir);
        let reg = registry().unwrap();
        let exit = Dispatcher::new(&reg).dispatch(&argv(&["info", "doctor", "config"]), &ctx);
        assert_eq!(exit, Exit::Success);
        let text = out.contents();
        assert!(text.contains("[WARN] no alluxio-site.yaml"), "{text}");
        assert!(text.contains("[PASS] 1 master endpoint(s) configured"), "{text}");
        assert!(text.contains("[WARN] no worker nodes configured"), "{text}");
        assert!(text.contains("0 failed"), "{text}");
    }

    #[test]
    fn storage_failures_fail_the_run() {
        let data = tempfile::TempDir::new().unwrap();
        let file = data.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let site = format!(
            "cache:\n  dirs:\n    - path: {}\n      quota: 1GB\n    - path: {}\n      quota: huge\n",
            file.display(),
            data.path().join("later").display()
        );
        let dir = install(Some(&site));
        let (ctx, out, err) = captured_context(&dir);
        let reg = registry().unwrap();
        let exit = Dispatcher::new(&reg).dispatch(&argv(&["info", "doctor", "storage"]), &ctx);
        assert_eq!(exit, Exit::Internal);
        let text = out.contents();
        assert!(text.contains("is not a directory"), "{text}");
        assert!(text.contains("2 failed"), "{text}");
        assert!(err.contents().contains("doctor found 2 problem(s)"));
    }

    #[test]
    fn connectivity_passes_for_listening_master() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let dir = install(Some(&format!("masters: ['127.0.0.1:{port}']\n")));
        let (ctx, out, _err) = captured_context(&dir);
        let reg = registry().unwrap();
        let exit = Dispatcher::new(&reg).dispatch(
            &argv(&["info", "doctor", "connectivity", "--timeout-ms", "1000"]),
            &ctx,
        );
        assert_eq!(exit, Exit::Success, "{}", out.contents());
        assert!(out.contents().contains(&format!("[PASS] master 127.0.0.1:{port} reachable")));
    }

    #[test]
    fn unknown_check_is_usage_error() {
        let dir = install(None);
        let (ctx, _out, err) = captured_context(&dir);
        let reg = registry().unwrap();
        let exit = Dispatcher::new(&reg).dispatch(&argv(&["info", "doctor", "network"]), &ctx);
        assert_eq!(exit, Exit::Usage);
        assert!(err.contents().contains("network"));
    }
}
