/*!
Command framework: a tree of services and commands, resolution of a token
path down to one node, per-command flag binding and help.

Layout:
  src/cli/
    mod.rs       (this file: re-exports + partial path policy)
    tree.rs      (Command trait, Node composite, Service builder, Registry)
    flags.rs     (FlagSpec / PositionalSpec, clap-backed binding, ParsedArgs)
    help.rs      (service and command help screens)
    dispatch.rs  (argv -> resolve -> help | parse -> run -> Exit)
    error.rs     (CliError, RegistryError, Exit)

Adding a command never touches this module: implement `Command` and
register it on a `Service`.
*/

pub mod dispatch;
pub mod error;
pub mod flags;
pub mod help;
pub mod tree;

use serde::{Deserialize, Serialize};

pub use dispatch::Dispatcher;
pub use error::{CliError, Exit, RegistryError};
pub use flags::{FlagSpec, ParsedArgs, PositionalSpec};
pub use tree::{Command, Registry, Service};

/// What to do when the path stops at a service with nothing after it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialPathPolicy {
    /// List the service's immediate children and exit 0.
    #[default]
    Help,
    /// Fail with `IncompletePath` (exit 1).
    Error,
}
