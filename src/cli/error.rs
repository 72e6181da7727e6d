//! Error taxonomy for registration, dispatch and execution.
//!
//! Two classes reach the user:
//!   - usage errors (bad path, bad flags)        -> exit 1, short message + help hint
//!   - startup / execution failures               -> exit 2, full message + cause chain
//!
//! Registration errors never reach a user in a correct build; they surface as
//! internal errors when the registry is assembled at startup.

use std::error::Error as StdError;
use std::fmt;

use crate::context::StartupError;

/// Process exit status produced by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success,
    Usage,
    Internal,
}

impl Exit {
    pub fn code(self) -> u8 {
        match self {
            Exit::Success => 0,
            Exit::Usage => 1,
            Exit::Internal => 2,
        }
    }
}

impl From<Exit> for std::process::ExitCode {
    fn from(exit: Exit) -> Self {
        std::process::ExitCode::from(exit.code())
    }
}

/// Failure of a single CLI invocation.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("unknown command \"{path}\"")]
    NotFound { path: String },

    #[error("unknown flag '{flag}' for \"{command}\"")]
    UnknownFlag { command: String, flag: String },

    #[error("flag '{flag}' of \"{command}\" requires a value")]
    MissingValue { command: String, flag: String },

    #[error("invalid value '{value}' for '{flag}' of \"{command}\": {reason}")]
    InvalidValue {
        command: String,
        flag: String,
        value: String,
        reason: String,
    },

    #[error("unexpected argument '{arg}' for \"{command}\"")]
    UnexpectedArgument { command: String, arg: String },

    #[error("\"{path}\" requires a subcommand")]
    IncompletePath { path: String },

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("{message}")]
    Execution {
        message: String,
        #[source]
        cause: Option<Box<dyn StdError + Send + Sync + 'static>>,
    },
}

impl CliError {
    /// Execution failure without an underlying cause.
    pub fn execution(message: impl Into<String>) -> Self {
        CliError::Execution {
            message: message.into(),
            cause: None,
        }
    }

    /// Convenience for commands rejecting a value after flag parsing succeeded.
    pub fn invalid_value(
        command: impl Into<String>,
        flag: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CliError::InvalidValue {
            command: command.into(),
            flag: flag.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn is_usage(&self) -> bool {
        !matches!(self, CliError::Startup(_) | CliError::Execution { .. })
    }

    pub fn exit(&self) -> Exit {
        if self.is_usage() {
            Exit::Usage
        } else {
            Exit::Internal
        }
    }

    /// Renders the message and, for internal failures, every link of the cause chain.
    pub fn report(&self) -> Report<'_> {
        Report(self)
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Execution {
            message: err.to_string(),
            cause: err.source().is_some().then(|| err.into()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Execution {
            message: format!("failed to write output: {err}"),
            cause: None,
        }
    }
}

/// Display adapter produced by [`CliError::report`].
pub struct Report<'a>(&'a CliError);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {}", self.0)?;
        if self.0.is_usage() {
            return Ok(());
        }
        let mut next = match self.0 {
            // The cause carries the same top-level message; start below it.
            CliError::Execution { cause: Some(c), .. } => c.source(),
            other => other.source(),
        };
        while let Some(cause) = next {
            write!(f, "\n  caused by: {cause}")?;
            next = cause.source();
        }
        Ok(())
    }
}

/// Invalid command tree, detected while the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid command name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("duplicate command '{name}' under \"{parent}\"")]
    DuplicateChild { parent: String, name: String },

    #[error("duplicate flag '--{flag}' on command '{command}'")]
    DuplicateFlag { command: String, flag: String },

    #[error("duplicate shorthand '-{short}' on command '{command}'")]
    DuplicateShorthand { command: String, short: char },

    #[error("flag '{flag}' on command '{command}' collides with the reserved help flag")]
    ReservedFlag { command: String, flag: String },

    #[error("invalid default '{value}' for flag '--{flag}' on command '{command}'")]
    InvalidDefault {
        command: String,
        flag: String,
        value: String,
    },

    #[error("positional '{name}' on command '{command}' shares its name with a flag")]
    PositionalConflict { command: String, name: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn exit_classes() {
        assert_eq!(CliError::NotFound { path: "x".into() }.exit(), Exit::Usage);
        assert_eq!(
            CliError::MissingValue {
                command: "c".into(),
                flag: "--f".into()
            }
            .exit(),
            Exit::Usage
        );
        assert_eq!(CliError::execution("boom").exit(), Exit::Internal);
        assert_eq!(Exit::Success.code(), 0);
        assert_eq!(Exit::Usage.code(), 1);
        assert_eq!(Exit::Internal.code(), 2);
    }

    #[test]
    fn report_includes_cause_chain_once() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: anyhow::Error = Err::<(), _>(io)
            .context("failed to read conf/masters")
            .unwrap_err();
        let rendered = CliError::from(err).report().to_string();
        assert_eq!(
            rendered,
            "error: failed to read conf/masters\n  caused by: no such file"
        );
    }

    #[test]
    fn usage_report_has_no_chain() {
        let err = CliError::NotFound {
            path: "info bogus".into(),
        };
        assert_eq!(err.report().to_string(), "error: unknown command \"info bogus\"");
    }

    #[test]
    fn plain_anyhow_has_no_cause() {
        let err = CliError::from(anyhow::anyhow!("no master reachable"));
        match &err {
            CliError::Execution { message, cause } => {
                assert_eq!(message, "no master reachable");
                assert!(cause.is_none());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
