//! Help screens for services and commands.

use std::io;

use super::flags::{FlagKind, FlagSpec};
use super::tree::{Command, Service};
use crate::context::Output;
use crate::utils::format::{Role, StyleOptions, TableOpts, color, table};

/// Lists the immediate children of `service`; grandchildren are never shown.
pub fn render_service(
    out: &Output,
    path: &str,
    service: &Service,
    style: &StyleOptions,
) -> io::Result<()> {
    if !service.description().is_empty() {
        writeln!(out, "{}\n", service.description())?;
    }
    writeln!(out, "{}", color(Role::Bold, "Usage:", style))?;
    writeln!(out, "  {path} [command]\n")?;

    writeln!(out, "{}", color(Role::Bold, "Available Commands:", style))?;
    let rows: Vec<Vec<String>> = service
        .children()
        .iter()
        .map(|child| vec![child.name().to_string(), child.description().to_string()])
        .collect();
    writeln!(
        out,
        "{}\n",
        table(&["NAME", "DESCRIPTION"], &rows, indented(), style)
    )?;

    writeln!(out, "{}", color(Role::Bold, "Flags:", style))?;
    writeln!(out, "  -h, --help   help for {}\n", service.name())?;

    writeln!(
        out,
        "{}",
        color(
            Role::Dim,
            format!("Use \"{path} [command] --help\" for more information about a command."),
            style
        )
    )
}

/// Shows a command's description, usage line, positionals and flags.
pub fn render_command(
    out: &Output,
    path: &str,
    command: &dyn Command,
    style: &StyleOptions,
) -> io::Result<()> {
    let flags = command.flags();
    let positional = command.positionals();

    if !command.description().is_empty() {
        writeln!(out, "{}\n", command.description())?;
    }

    writeln!(out, "{}", color(Role::Bold, "Usage:", style))?;
    let mut usage = format!("  {path} [flags]");
    if let Some(pos) = &positional {
        usage.push(' ');
        usage.push_str(&pos.usage());
    }
    writeln!(out, "{usage}\n")?;

    if let Some(pos) = &positional {
        writeln!(out, "{}", color(Role::Bold, "Arguments:", style))?;
        let mut desc = pos.description.to_string();
        if let Some(choices) = pos.choices {
            desc.push_str(&format!(" (one of: {})", choices.join(", ")));
        }
        writeln!(
            out,
            "{}\n",
            table(
                &["NAME", "DESCRIPTION"],
                &[vec![pos.name.to_string(), desc]],
                indented(),
                style
            )
        )?;
    }

    writeln!(out, "{}", color(Role::Bold, "Flags:", style))?;
    let mut rows: Vec<Vec<String>> = flags.iter().map(flag_row).collect();
    rows.push(vec![
        "-h, --help".to_string(),
        String::new(),
        String::new(),
        format!("help for {}", command.name()),
    ]);
    writeln!(
        out,
        "{}",
        table(&["FLAG", "TYPE", "DEFAULT", "DESCRIPTION"], &rows, indented(), style)
    )
}

fn indented() -> TableOpts {
    TableOpts {
        indent: 2,
        ..TableOpts::default()
    }
}

fn flag_row(flag: &FlagSpec) -> Vec<String> {
    let names = match flag.short {
        Some(short) => format!("-{short}, --{}", flag.name),
        None => format!("    --{}", flag.name),
    };
    let default = if flag.required {
        "required".to_string()
    } else {
        match (flag.kind, flag.default) {
            (FlagKind::Bool, _) => "false".to_string(),
            (_, Some(d)) => d.to_string(),
            (_, None) => String::new(),
        }
    };
    let mut description = flag.description.to_string();
    if let FlagKind::Enum(choices) = flag.kind {
        description.push_str(&format!(" (one of: {})", choices.join(", ")));
    }
    vec![names, flag.kind.type_name().to_string(), default, description]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tree::tests::sample;

    #[test]
    fn service_help_lists_children_in_order() {
        let reg = sample();
        let (out, captured) = Output::capture();
        render_service(&out, "tool", reg.root(), &StyleOptions::plain()).unwrap();
        let text = captured.contents();
        assert!(text.starts_with("sample tool\n"));
        let alpha = text.find("\n  alpha").unwrap();
        let epsilon = text.find("\n  epsilon").unwrap();
        assert!(alpha < epsilon);
        assert!(!text.contains("delta"));
        assert!(text.contains("Use \"tool [command] --help\""));
    }

    #[test]
    fn flag_rows_describe_defaults() {
        let required = FlagSpec::string("output-dir", "where").short('o').required();
        assert_eq!(
            flag_row(&required),
            vec!["-o, --output-dir", "string", "required", "where"]
        );
        let choice = FlagSpec::choice("format", &["text", "json"], "fmt").default_value("text");
        assert_eq!(
            flag_row(&choice),
            vec!["    --format", "enum", "text", "fmt (one of: text, json)"]
        );
        assert_eq!(flag_row(&FlagSpec::bool("force", "f"))[2], "false");
    }
}
