use crate::cli::{CliError, Command, FlagSpec, ParsedArgs};
use crate::context::ExecutionContext;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build revision stamped through `ALLUXIO_CLI_REVISION` at compile time.
pub fn revision() -> &'static str {
    option_env!("ALLUXIO_CLI_REVISION").unwrap_or("unknown")
}

pub struct Version;

impl Command for Version {
    fn name(&self) -> &str {
        "version"
    }

    fn description(&self) -> &str {
        "Print the version of the Alluxio CLI"
    }

    fn flags(&self) -> Vec<FlagSpec> {
        vec![FlagSpec::bool("revision", "Also print the build revision").short('r')]
    }

    fn run(&self, ctx: &ExecutionContext, args: &ParsedArgs) -> Result<(), CliError> {
        writeln!(ctx.out(), "{VERSION}")?;
        if args.flag("revision") {
            writeln!(ctx.out(), "revision: {}", revision())?;
        }
        Ok(())
    }
}
