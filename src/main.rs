use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;

mod cli;
mod cluster;
mod cmd;
mod context;
mod utils;

use cli::{CliError, Dispatcher, Exit};
use context::{ContextOptions, Environment, ExecutionContext, Output, StartupError};
use utils::format::StyleOptions;

/// Default global options, split like a shell would and placed ahead of argv.
const CLI_OPTS_VAR: &str = "ALLUXIO_CLI_OPTS";

/// Alluxio CLI
///
/// Layout:
///   alluxio [GLOBAL OPTIONS] <service> [subcommand ...] [--flag value ...] [args ...]
///
/// Global options must come before the command path; everything after it
/// belongs to the command. `<path> --help` prints help for any service or
/// command, e.g. `alluxio info --help`, `alluxio info collect --help`.
///
/// Environment:
///   ALLUXIO_HOME       Installation root (or --home)
///   ALLUXIO_CONF_DIR   Configuration directory (default $ALLUXIO_HOME/conf)
///   ALLUXIO_LOGS_DIR   Logs directory (default $ALLUXIO_HOME/logs)
///   ALLUXIO_CLI_OPTS   Default global options, e.g. "-v --no-color"
///   ALLUXIO_LOG        Log filter (tracing EnvFilter syntax), overrides -v/-q
///
/// Examples:
///   alluxio info
///   alluxio info master --format json
///   alluxio -m master-1:19998 info doctor connectivity
///   alluxio info collect all -o /tmp/alluxio-bundle
#[derive(Parser, Debug)]
#[command(
    name = "alluxio",
    version,
    about = "Alluxio CLI - operate and introspect an Alluxio cluster",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Errors only
    #[arg(short, long)]
    quiet: bool,

    /// Installation root (overrides ALLUXIO_HOME)
    #[arg(long, value_name = "DIR")]
    home: Option<PathBuf>,

    /// Extra configuration file, applied over conf/alluxio-site.yaml
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Master endpoint(s), replacing the configured list (repeatable)
    #[arg(short = 'm', long = "master", value_name = "HOST[:PORT]")]
    masters: Vec<String>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Command path, flags and arguments
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command: Vec<String>,
}

/// Inserts the words of `opts` right after the program name.
fn prepend_env_opts(mut args: Vec<OsString>, opts: Option<&str>) -> Result<Vec<OsString>, StartupError> {
    let Some(raw) = opts.filter(|o| !o.trim().is_empty()) else {
        return Ok(args);
    };
    let words = shell_words::split(raw).map_err(|e| StartupError::InvalidEnv {
        var: CLI_OPTS_VAR.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    let at = args.len().min(1);
    args.splice(at..at, words.into_iter().map(OsString::from));
    Ok(args)
}

/// Parses the global options. Help and version requests print and exit 0
/// here; anything else clap rejects is a usage error.
fn parse_globals(args: Vec<OsString>) -> Result<Cli, CliError> {
    Cli::try_parse_from(args).map_err(|err| match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
        _ => cli::flags::usage_error(cmd::ROOT, &err),
    })
}

fn fail_usage(err: &CliError) -> ExitCode {
    eprintln!("{}\nRun '{} --help' for usage.", err.report(), cmd::ROOT);
    Exit::Usage.into()
}

fn fail_startup(err: impl Into<CliError>) -> ExitCode {
    let err = err.into();
    tracing::error!(error = %err, "startup failed");
    eprintln!("{}", err.report());
    Exit::Internal.into()
}

fn main() -> ExitCode {
    let env_opts = std::env::var(CLI_OPTS_VAR).ok();
    let args = match prepend_env_opts(std::env::args_os().collect(), env_opts.as_deref()) {
        Ok(args) => args,
        Err(e) => return fail_startup(e),
    };
    let cli = match parse_globals(args) {
        Ok(cli) => cli,
        Err(e) => return fail_usage(&e),
    };

    // Initialize logging
    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    let registry = match cmd::registry() {
        Ok(registry) => registry,
        Err(e) => return fail_startup(CliError::execution(format!("invalid command tree: {e}"))),
    };

    let dispatcher = Dispatcher::new(&registry);
    let style = StyleOptions::for_terminal(std::io::stdout().is_terminal(), cli.no_color);
    if let Some(exit) = dispatcher.help_only(&cli.command, &Output::stdout(), &style) {
        return exit.into();
    }

    let opts = ContextOptions {
        home: cli.home,
        config_file: cli.config,
        masters: cli.masters,
    };
    let ctx = match ExecutionContext::build(&Environment::capture(), &opts) {
        Ok(ctx) => ctx.with_style(style),
        Err(e) => return fail_startup(e),
    };

    dispatcher
        .partial_path(ctx.config().cli.partial_path)
        .dispatch(&cli.command, &ctx)
        .into()
}
