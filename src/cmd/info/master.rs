use serde::Serialize;

use crate::cli::{CliError, Command, FlagSpec, ParsedArgs};
use crate::cmd::shared::{self, NO_PROBE, OutputFormat};
use crate::cluster::ProbeReport;
use crate::context::ExecutionContext;

pub struct Master;

#[derive(Serialize)]
struct MasterStatus<'a> {
    masters: &'a [ProbeReport],
}

impl Command for Master {
    fn name(&self) -> &str {
        "master"
    }

    fn description(&self) -> &str {
        "Show configured masters and whether they are reachable"
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
        let reports = shared::probe(ctx.masters(), skip, timeout)?;

        match format {
            OutputFormat::Text => {
                writeln!(ctx.out(), "{}", shared::probe_table(ctx, "MASTER", &reports))?;
            }
            _ => shared::emit(ctx, format, &MasterStatus { masters: &reports })?,
        }

        if !skip && shared::reachable_count(&reports) == 0 {
            return Err(CliError::execution(format!(
                "none of the {} configured master(s) is reachable",
                reports.len()
            )));
        }
        Ok(())
    }
}
