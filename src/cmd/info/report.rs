use std::path::{Path, PathBuf};

use serde::Serialize;

use super::version::VERSION;
use crate::cli::{CliError, Command, FlagSpec, ParsedArgs, PositionalSpec};
use crate::cluster::ProbeReport;
use crate::cmd::shared::{self, FORMAT, MACHINE_FORMATS, NO_PROBE, OutputFormat};
use crate::context::{ClusterConfig, ExecutionContext};

const KINDS: &[&str] = &["summary", "config", "nodes"];

pub struct Report;

#[derive(Serialize)]
struct Summary<'a> {
    version: &'static str,
    home: &'a Path,
    conf_dir: &'a Path,
    masters: usize,
    workers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    masters_reachable: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workers_reachable: Option<usize>,
    cache_dirs: usize,
}

#[derive(Serialize)]
struct ConfigReport<'a> {
    files: &'a [PathBuf],
    config: &'a ClusterConfig,
}

#[derive(Serialize)]
struct NodesReport {
    masters: Vec<ProbeReport>,
    workers: Vec<ProbeReport>,
}

impl Command for Report {
    fn name(&self) -> &str {
        "report"
    }

    fn description(&self) -> &str {
        "Report cluster summary, configuration or node information"
    }

    fn flags(&self) -> Vec<FlagSpec> {
        vec![
            FlagSpec::choice(FORMAT, MACHINE_FORMATS, "Output format")
                .short('f')
                .default_value("json"),
            shared::no_probe_flag(),
        ]
    }

    fn positionals(&self) -> Option<PositionalSpec> {
        Some(PositionalSpec::one("kind", "What to report (default summary)").choices(KINDS))
    }

    fn run(&self, ctx: &ExecutionContext, args: &ParsedArgs) -> Result<(), CliError> {
        let format = OutputFormat::from_args(args);
        let skip = args.flag(NO_PROBE);
        let timeout = shared::probe_timeout(ctx, args, self.name())?;
        let kind = args.positionals().first().map(String::as_str).unwrap_or("summary");

        match kind {
            "config" => shared::emit(
                ctx,
                format,
                &ConfigReport {
                    files: ctx.config_files(),
                    config: ctx.config(),
                },
            )?,
            "nodes" => shared::emit(
                ctx,
                format,
                &NodesReport {
                    masters: shared::probe(ctx.masters(), skip, timeout)?,
                    workers: shared::probe(ctx.workers(), skip, timeout)?,
                },
            )?,
            _ => {
                let (masters_reachable, workers_reachable) = if skip {
                    (None, None)
                } else {
                    let masters = shared::probe(ctx.masters(), false, timeout)?;
                    let workers = shared::probe(ctx.workers(), false, timeout)?;
                    (
                        Some(shared::reachable_count(&masters)),
                        Some(shared::reachable_count(&workers)),
                    )
                };
                shared::emit(
                    ctx,
                    format,
                    &Summary {
                        version: VERSION,
                        home: ctx.home(),
                        conf_dir: ctx.conf_dir(),
                        masters: ctx.masters().len(),
                        workers: ctx.workers().len(),
                        masters_reachable,
                        workers_reachable,
                        cache_dirs: ctx.config().cache.dirs.len(),
                    },
                )?
            }
        }
        Ok(())
    }
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
    fn summary_defaults_to_json() {
        let dir = install(Some("workers: [w1, w2]\n"));
        let (ctx, out, _err) = captured_context(&dir);
        let reg = registry().unwrap();
        let exit = Dispatcher::new(&reg).dispatch(&argv(&["info", "report", "--no-probe"]), &ctx);
        assert_eq!(exit, Exit::Success);
        let v: serde_json::Value = serde_json::from_str(&out.contents()).unwrap();
        assert_eq!(v["version"], VERSION);
        assert_eq!(v["masters"], 1);
        assert_eq!(v["workers"], 2);
        assert!(v.get("masters_reachable").is_none());
    }

    #[test]
    fn config_report_as_yaml() {
        let dir = install(Some("probe_timeout_ms: 750\n"));
        let (ctx, out, _err) = captured_context(&dir);
        let reg = registry().unwrap();
        let exit = Dispatcher::new(&reg).dispatch(
            &argv(&["info", "report", "config", "-f", "yaml"]),
            &ctx,
        );
        assert_eq!(exit, Exit::Success);
        let v: serde_yaml::Value = serde_yaml::from_str(&out.contents()).unwrap();
        assert_eq!(v["config"]["probe_timeout_ms"].as_u64(), Some(750));
        assert_eq!(v["config"]["cli"]["partial_path"].as_str(), Some("help"));
        assert_eq!(v["files"].as_sequence().map(|s| s.len()), Some(1));
    }

    #[test]
    fn text_format_is_not_offered() {
        let dir = install(None);
        let (ctx, _out, err) = captured_context(&dir);
        let reg = registry().unwrap();
        let exit = Dispatcher::new(&reg).dispatch(&argv(&["info", "report", "-f", "text"]), &ctx);
        assert_eq!(exit, Exit::Usage);
        assert!(err.contents().contains("expected one of json, yaml"));
    }

    #[test]
    fn nodes_report_lists_both_roles() {
        let dir = install(Some("workers: [w1]\n"));
        let (ctx, out, _err) = captured_context(&dir);
        let reg = registry().unwrap();
        let exit = Dispatcher::new(&reg).dispatch(
            &argv(&["info", "report", "nodes", "--no-probe"]),
            &ctx,
        );
        assert_eq!(exit, Exit::Success);
        let v: serde_json::Value = serde_json::from_str(&out.contents()).unwrap();
        assert_eq!(v["masters"][0]["endpoint"]["host"], "localhost");
        assert_eq!(v["workers"][0]["status"], "not_probed");
    }
}
