//! Dispatcher: argv -> resolve -> help | parse -> run -> Exit.

use std::time::Instant;

use tracing::{debug, warn};

use super::PartialPathPolicy;
use super::error::{CliError, Exit};
use super::flags::{self, HELP_LONG, HELP_SHORT};
use super::help;
use super::tree::{Registry, Resolution, Target};
use crate::context::{ExecutionContext, Output};
use crate::utils::format::StyleOptions;

/// A failed invocation plus the path whose help the user should consult.
struct Failure {
    error: CliError,
    help_path: String,
}

pub struct Dispatcher<'r> {
    registry: &'r Registry,
    policy: PartialPathPolicy,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            policy: PartialPathPolicy::default(),
        }
    }

    pub fn partial_path(mut self, policy: PartialPathPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Answers `<path> --help` without an execution context, so help works
    /// even where the installation cannot be loaded. `None` when `argv` is
    /// not a help request for a known path.
    pub fn help_only(&self, argv: &[String], out: &Output, style: &StyleOptions) -> Option<Exit> {
        let resolution = self.registry.resolve(argv).ok()?;
        if !wants_help(resolution.remainder) {
            return None;
        }
        let written = render_help(&resolution, out, style).and_then(|()| out.flush());
        Some(match written {
            Ok(()) => Exit::Success,
            Err(e) => {
                warn!(error = %e, "failed to write help");
                Exit::Internal
            }
        })
    }

    /// Runs one invocation. `argv` excludes the program name and global options.
    pub fn dispatch(&self, argv: &[String], ctx: &ExecutionContext) -> Exit {
        let _entered = ctx.span().enter();
        let exit = match self.try_dispatch(argv, ctx) {
            Ok(()) => Exit::Success,
            Err(failure) => {
                self.report(&failure, ctx);
                failure.error.exit()
            }
        };
        for sink in [ctx.out(), ctx.err()] {
            if let Err(e) = sink.flush() {
                warn!(error = %e, "failed to flush output");
            }
        }
        exit
    }

    fn try_dispatch(&self, argv: &[String], ctx: &ExecutionContext) -> Result<(), Failure> {
        let root = self.registry.root().name();
        let resolution = self.registry.resolve(argv).map_err(|error| Failure {
            help_path: not_found_help_path(root, &error),
            error,
        })?;
        let path = resolution.display_path();
        debug!(path = %path, remainder = ?resolution.remainder, "resolved");

        let fail = |error: CliError| Failure {
            error,
            help_path: path.clone(),
        };

        if wants_help(resolution.remainder) {
            return render_help(&resolution, ctx.out(), ctx.style()).map_err(|e| fail(e.into()));
        }

        match resolution.target {
            Target::Service(_) => match resolution.remainder.first() {
                None => match self.policy {
                    PartialPathPolicy::Help => {
                        render_help(&resolution, ctx.out(), ctx.style()).map_err(|e| fail(e.into()))
                    }
                    PartialPathPolicy::Error => Err(fail(CliError::IncompletePath {
                        path: path.clone(),
                    })),
                },
                Some(flag) => Err(fail(CliError::UnknownFlag {
                    command: path.clone(),
                    flag: flag.clone(),
                })),
            },
            Target::Command(command) => {
                let spec = command.flags();
                let positional = command.positionals();
                let args = flags::parse(&path, &spec, positional.as_ref(), resolution.remainder)
                    .map_err(fail)?;

                let started = Instant::now();
                let outcome = command.run(ctx, &args);
                debug!(
                    command = %path,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    ok = outcome.is_ok(),
                    "command finished"
                );
                outcome.map_err(fail)
            }
        }
    }

    fn report(&self, failure: &Failure, ctx: &ExecutionContext) {
        let written = if failure.error.is_usage() {
            writeln!(
                ctx.err(),
                "{}\nRun '{} --help' for usage.",
                failure.error.report(),
                failure.help_path
            )
        } else {
            writeln!(ctx.err(), "{}", failure.error.report())
        };
        if let Err(e) = written {
            warn!(error = %e, "failed to write error report");
        }
    }
}

fn render_help(resolution: &Resolution<'_, '_>, out: &Output, style: &StyleOptions) -> std::io::Result<()> {
    let path = resolution.display_path();
    match resolution.target {
        Target::Service(service) => help::render_service(out, &path, service, style),
        Target::Command(command) => help::render_command(out, &path, command, style),
    }
}

/// `-h` / `--help` anywhere before a `--` terminator.
fn wants_help(remainder: &[String]) -> bool {
    let short = format!("-{HELP_SHORT}");
    let long = format!("--{HELP_LONG}");
    remainder
        .iter()
        .take_while(|t| t.as_str() != "--")
        .any(|t| *t == short || *t == long)
}

/// For `NotFound("info bogus")` the closest help is `alluxio info`.
fn not_found_help_path(root: &str, error: &CliError) -> String {
    let CliError::NotFound { path } = error else {
        return root.to_string();
    };
    let mut parts = vec![root];
    let consumed: Vec<&str> = path.split(' ').collect();
    parts.extend(consumed.iter().take(consumed.len().saturating_sub(1)));
    parts.join(" ")
}
