//! Flag declarations and per-invocation argument binding.
//!
//! Commands declare `FlagSpec`s; at dispatch time the specs are turned into a
//! throwaway `clap::Command` and the remaining argv is parsed against it. clap
//! failures are mapped onto the framework's usage errors.

use std::collections::BTreeMap;

use clap::builder::PossibleValuesParser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Arg, ArgAction, ArgMatches, value_parser};

use super::error::{CliError, RegistryError};

/// Names reserved for the framework's help interception.
pub const HELP_LONG: &str = "help";
pub const HELP_SHORT: char = 'h';

/// Value type of a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    String,
    Int,
    Bool,
    Enum(&'static [&'static str]),
    Repeated,
}

impl FlagKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FlagKind::String => "string",
            FlagKind::Int => "int",
            FlagKind::Bool => "bool",
            FlagKind::Enum(_) => "enum",
            FlagKind::Repeated => "strings",
        }
    }
}

/// Declaration of one flag of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    pub name: &'static str,
    pub short: Option<char>,
    pub kind: FlagKind,
    pub default: Option<&'static str>,
    pub required: bool,
    pub description: &'static str,
}

impl FlagSpec {
    fn new(name: &'static str, kind: FlagKind, description: &'static str) -> Self {
        Self {
            name,
            short: None,
            kind,
            default: None,
            required: false,
            description,
        }
    }

    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FlagKind::String, description)
    }

    pub fn int(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FlagKind::Int, description)
    }

    pub fn bool(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FlagKind::Bool, description)
    }

    pub fn choice(
        name: &'static str,
        choices: &'static [&'static str],
        description: &'static str,
    ) -> Self {
        Self::new(name, FlagKind::Enum(choices), description)
    }

    pub fn repeated(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FlagKind::Repeated, description)
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn default_value(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// `--name` as typed by a user.
    pub fn long_form(&self) -> String {
        format!("--{}", self.name)
    }

    fn default_is_valid(&self, value: &str) -> bool {
        match self.kind {
            FlagKind::String | FlagKind::Repeated => true,
            FlagKind::Int => value.parse::<i64>().is_ok(),
            FlagKind::Bool => value == "false",
            FlagKind::Enum(choices) => choices.contains(&value),
        }
    }

    fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.name)
            .long(self.name)
            .help(self.description);
        if let Some(short) = self.short {
            arg = arg.short(short);
        }
        arg = match self.kind {
            FlagKind::String => arg.action(ArgAction::Set).value_parser(value_parser!(String)),
            FlagKind::Int => arg
                .action(ArgAction::Set)
                .value_parser(value_parser!(i64))
                .allow_negative_numbers(true),
            FlagKind::Bool => arg.action(ArgAction::SetTrue),
            FlagKind::Enum(choices) => arg
                .action(ArgAction::Set)
                .value_parser(PossibleValuesParser::new(choices.iter().copied())),
            FlagKind::Repeated => arg
                .action(ArgAction::Append)
                .value_parser(value_parser!(String)),
        };
        match (self.kind, self.default) {
            (FlagKind::Bool, _) | (_, None) => arg,
            (_, Some(default)) => arg.default_value(default),
        }
    }
}

/// Declaration of a command's positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub choices: Option<&'static [&'static str]>,
    pub multiple: bool,
}

impl PositionalSpec {
    pub fn one(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            choices: None,
            multiple: false,
        }
    }

    pub fn many(name: &'static str, description: &'static str) -> Self {
        Self {
            multiple: true,
            ..Self::one(name, description)
        }
    }

    pub fn choices(mut self, choices: &'static [&'static str]) -> Self {
        self.choices = Some(choices);
        self
    }

    /// Usage fragment, e.g. `[check]` or `[category...]`.
    pub fn usage(&self) -> String {
        if self.multiple {
            format!("[{}...]", self.name)
        } else {
            format!("[{}]", self.name)
        }
    }

    fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.name)
            .value_name(self.name.to_uppercase())
            .help(self.description)
            .index(1);
        arg = if self.multiple {
            arg.action(ArgAction::Append).num_args(1..)
        } else {
            arg.action(ArgAction::Set).num_args(1)
        };
        match self.choices {
            Some(choices) => arg.value_parser(PossibleValuesParser::new(choices.iter().copied())),
            None => arg.value_parser(value_parser!(String)),
        }
    }
}

/// Checks flag and positional declarations of one command.
pub fn validate_flags(
    command: &str,
    flags: &[FlagSpec],
    positional: Option<&PositionalSpec>,
) -> Result<(), RegistryError> {
    for (idx, flag) in flags.iter().enumerate() {
        if flag.name.is_empty() || flag.name.starts_with('-') || flag.name.contains(char::is_whitespace) {
            return Err(RegistryError::InvalidName {
                name: flag.name.to_string(),
                reason: "flag names must be non-empty words without a leading '-'",
            });
        }
        if flag.name == HELP_LONG || flag.short == Some(HELP_SHORT) {
            return Err(RegistryError::ReservedFlag {
                command: command.to_string(),
                flag: flag.name.to_string(),
            });
        }
        let earlier = &flags[..idx];
        if earlier.iter().any(|f| f.name == flag.name) {
            return Err(RegistryError::DuplicateFlag {
                command: command.to_string(),
                flag: flag.name.to_string(),
            });
        }
        if let Some(short) = flag.short
            && earlier.iter().any(|f| f.short == Some(short))
        {
            return Err(RegistryError::DuplicateShorthand {
                command: command.to_string(),
                short,
            });
        }
        if let Some(default) = flag.default
            && !flag.default_is_valid(default)
        {
            return Err(RegistryError::InvalidDefault {
                command: command.to_string(),
                flag: flag.name.to_string(),
                value: default.to_string(),
            });
        }
    }
    if let Some(pos) = positional
        && flags.iter().any(|f| f.name == pos.name)
    {
        return Err(RegistryError::PositionalConflict {
            command: command.to_string(),
            name: pos.name.to_string(),
        });
    }
    Ok(())
}

/// Bound value of a single flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

/// Flag values and positionals of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    values: BTreeMap<&'static str, FlagValue>,
    positionals: Vec<String>,
}

impl ParsedArgs {
    pub fn str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FlagValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(FlagValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// Boolean switch; absent means false.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(FlagValue::Bool(true)))
    }

    pub fn list(&self, name: &str) -> &[String] {
        match self.values.get(name) {
            Some(FlagValue::List(items)) => items,
            _ => &[],
        }
    }

    pub fn positionals(&self) -> &[String] {
        &self.positionals
    }
}

/// Parses `tokens` against the declared flags of `command_path`'s leaf.
pub fn parse(
    command_path: &str,
    flags: &[FlagSpec],
    positional: Option<&PositionalSpec>,
    tokens: &[String],
) -> Result<ParsedArgs, CliError> {
    let mut cmd = clap::Command::new(command_path.to_string())
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .args_override_self(true);
    for flag in flags {
        cmd = cmd.arg(flag.to_arg());
    }
    if let Some(pos) = positional {
        cmd = cmd.arg(pos.to_arg());
    }

    let matches = cmd
        .try_get_matches_from(tokens)
        .map_err(|err| map_clap_error(command_path, flags, &err))?;

    let mut args = ParsedArgs::default();
    for flag in flags {
        if let Some(value) = bind(flag, &matches) {
            args.values.insert(flag.name, value);
        } else if flag.required {
            return Err(CliError::MissingValue {
                command: command_path.to_string(),
                flag: flag.long_form(),
            });
        }
    }
    if let Some(pos) = positional {
        args.positionals = matches
            .get_many::<String>(pos.name)
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default();
    }
    Ok(args)
}

fn bind(flag: &FlagSpec, matches: &ArgMatches) -> Option<FlagValue> {
    match flag.kind {
        FlagKind::String | FlagKind::Enum(_) => matches
            .get_one::<String>(flag.name)
            .map(|s| FlagValue::Str(s.clone())),
        FlagKind::Int => matches.get_one::<i64>(flag.name).map(|n| FlagValue::Int(*n)),
        FlagKind::Bool => Some(FlagValue::Bool(matches.get_flag(flag.name))),
        FlagKind::Repeated => matches
            .get_many::<String>(flag.name)
            .map(|vals| FlagValue::List(vals.cloned().collect())),
    }
}

fn context_str(err: &clap::Error, kind: ContextKind) -> Option<String> {
    match err.get(kind)? {
        ContextValue::String(s) => Some(s.clone()),
        ContextValue::Strings(items) => Some(items.join(", ")),
        _ => None,
    }
}

/// clap renders `--name <NAME>`; keep just the flag token.
fn flag_token(raw: &str) -> String {
    raw.split([' ', '=']).next().unwrap_or(raw).to_string()
}

/// Maps a clap failure from a parser the framework does not own (the global
/// options of the binary) onto the same usage errors leaf commands produce.
pub fn usage_error(command: &str, err: &clap::Error) -> CliError {
    map_clap_error(command, &[], err)
}

fn map_clap_error(command: &str, flags: &[FlagSpec], err: &clap::Error) -> CliError {
    let arg = context_str(err, ContextKind::InvalidArg).unwrap_or_default();
    let value = context_str(err, ContextKind::InvalidValue).unwrap_or_default();
    let command = command.to_string();

    match err.kind() {
        ErrorKind::UnknownArgument if arg.starts_with('-') => CliError::UnknownFlag {
            command,
            flag: flag_token(&arg),
        },
        ErrorKind::UnknownArgument => CliError::UnexpectedArgument { command, arg },
        ErrorKind::InvalidValue if value.is_empty() => CliError::MissingValue {
            command,
            flag: flag_token(&arg),
        },
        ErrorKind::MissingRequiredArgument
        | ErrorKind::TooFewValues
        | ErrorKind::WrongNumberOfValues => CliError::MissingValue {
            command,
            flag: flag_token(&arg),
        },
        ErrorKind::InvalidValue => {
            let flag = flag_token(&arg);
            let reason = match flags.iter().find(|f| f.long_form() == flag).map(|f| f.kind) {
                Some(FlagKind::Enum(choices)) => format!("expected one of {}", choices.join(", ")),
                _ => context_str(err, ContextKind::ValidValue)
                    .map(|valid| format!("expected one of {valid}"))
                    .unwrap_or_else(|| "value is not accepted".to_string()),
            };
            CliError::InvalidValue {
                command,
                flag,
                value,
                reason,
            }
        }
        ErrorKind::ValueValidation => {
            let reason = std::error::Error::source(err)
                .map(|e| e.to_string())
                .unwrap_or_else(|| "value is not accepted".to_string());
            CliError::InvalidValue {
                command,
                flag: flag_token(&arg),
                value,
                reason,
            }
        }
        other => CliError::InvalidValue {
            command,
            flag: flag_token(&arg),
            value,
            reason: other.as_str().unwrap_or("malformed arguments").to_string(),
        },
    }
}
