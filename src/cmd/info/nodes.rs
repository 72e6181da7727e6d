use serde::Serialize;

use crate::cli::{CliError, Command, FlagSpec, ParsedArgs};
use crate::cmd::shared::{self, NO_PROBE, OutputFormat};
use crate::cluster::ProbeReport;
use crate::context::ExecutionContext;

pub struct Nodes;

#[derive(Serialize)]
struct NodeStatus<'a> {
    workers: &'a [ProbeReport],
}

impl Command for Nodes {
    fn name(&self) -> &str {
        "nodes"
    }

    fn description(&self) -> &str {
        "Show configured worker nodes and whether they are reachable"
    }

    fn flags(&self) -> Vec<FlagSpec> {
        vec![
            shared::format_flag(),
            shared::no_probe_flag(),
            shared::timeout_flag(),
        ]
    }

    fn run(&self, ctx: &ExecutionContext, args: &ParsedArgs) -> Result<(), CliError> {
        let format = OutputFormat::from_args(args);
        let skip = args.flag(NO_PROBE);
        let timeout = shared::probe_timeout(ctx, args, self.name())?;
        let reports = shared::probe(ctx.workers(), skip, timeout)?;

        if format != OutputFormat::Text {
            shared::emit(ctx, format, &NodeStatus { workers: &reports })?;
            return Ok(());
        }

        if reports.is_empty() {
            writeln!(ctx.out(), "No worker nodes configured.")?;
            return Ok(());
        }
        writeln!(ctx.out(), "{}", shared::probe_table(ctx, "WORKER", &reports))?;
        if !skip {
            writeln!(
                ctx.out(),
                "\n{} of {} worker(s) reachable",
                shared::reachable_count(&reports),
                reports.len()
            )?;
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
    fn empty_worker_list() {
        let dir = install(None);
        let (ctx, out, _err) = captured_context(&dir);
        let reg = registry().unwrap();
        let exit = Dispatcher::new(&reg).dispatch(&argv(&["info", "nodes"]), &ctx);
        assert_eq!(exit, Exit::Success);
        assert_eq!(out.contents(), "No worker nodes configured.\n");
    }

    #[test]
    fn workers_from_host_file_as_yaml() {
        let dir = install(None);
        std::fs::write(dir.path().join("conf/workers"), "w1\nw2:4000\n").unwrap();
        let (ctx, out, _err) = captured_context(&dir);
        let reg = registry().unwrap();
        let exit = Dispatcher::new(&reg).dispatch(
            &argv(&["info", "nodes", "--no-probe", "--format", "yaml"]),
            &ctx,
        );
        assert_eq!(exit, Exit::Success);
        let v: serde_yaml::Value = serde_yaml::from_str(&out.contents()).unwrap();
        let workers = v["workers"].as_sequence().unwrap();
        assert_eq!(workers.len(), 2);
        assert_eq!(workers[1]["endpoint"]["port"].as_u64(), Some(4000));
        assert_eq!(workers[0]["status"].as_str(), Some("not_probed"));
    }

    #[test]
    fn probe_summary_counts_reachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let dir = install(Some(&format!("workers: ['127.0.0.1:{port}']\n")));
        let (ctx, out, _err) = captured_context(&dir);
        let reg = registry().unwrap();
        let exit = Dispatcher::new(&reg).dispatch(&argv(&["info", "nodes"]), &ctx);
        assert_eq!(exit, Exit::Success);
        assert!(out.contents().contains("1 of 1 worker(s) reachable"));
    }
}
