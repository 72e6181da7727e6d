/*!
Command tree of the `alluxio` binary.

Layout:
  src/cmd/
    mod.rs          (this file: root registry)
    shared.rs       (flags, output and size helpers used by several commands)
    info/           (the `info` service: one file per subcommand)

Conventions:
  - Each subcommand is a unit struct implementing `cli::Command`.
  - Command bodies return `anyhow` errors with context; the framework turns
    them into exit code 2. User mistakes are `CliError` usage variants.
  - A new service is a module exposing `service() -> Result<Service, RegistryError>`
    and one `.service(..)` line below.
*/

pub mod info;
pub mod shared;

use crate::cli::{Registry, RegistryError, Service};

pub const ROOT: &str = "alluxio";

pub fn registry() -> Result<Registry, RegistryError> {
    let root = Service::builder(ROOT, "Command line interface for operating an Alluxio cluster")
        .service(info::service()?)
        .build()?;
    Ok(Registry::new(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Dispatcher, Exit, PartialPathPolicy};
    use crate::context::Output;
    use crate::context::tests::{captured_context, install};
    use crate::utils::format::StyleOptions;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn info_lists_commands_in_registration_order() {
        let dir = install(None);
        let (ctx, out, _err) = captured_context(&dir);
        let reg = registry().unwrap();
        let exit = Dispatcher::new(&reg).dispatch(&argv(&["info"]), &ctx);
        assert_eq!(exit, Exit::Success);

        let text = out.contents();
        let listed: Vec<&str> = text
            .lines()
            .skip_while(|l| !l.starts_with("Available Commands:"))
            .skip(3) // heading, column header, separator
            .take_while(|l| !l.is_empty())
            .filter_map(|l| l.split_whitespace().next())
            .collect();
        assert_eq!(
            listed,
            vec!["cache", "collect", "doctor", "master", "nodes", "report", "version"]
        );
    }

    #[test]
    fn info_bogus_is_not_found() {
        let dir = install(None);
        let (ctx, out, err) = captured_context(&dir);
        let reg = registry().unwrap();
        let exit = Dispatcher::new(&reg).dispatch(&argv(&["info", "bogus"]), &ctx);
        assert_eq!(exit, Exit::Usage);
        assert!(out.contents().is_empty());
        let text = err.contents();
        assert!(text.contains("unknown command \"info bogus\""), "{text}");
        assert!(text.contains("Run 'alluxio info --help' for usage."), "{text}");
    }

    #[test]
    fn version_help_does_not_run_version() {
        let dir = install(None);
        let (ctx, out, _err) = captured_context(&dir);
        let reg = registry().unwrap();
        let exit = Dispatcher::new(&reg).dispatch(&argv(&["info", "version", "--help"]), &ctx);
        assert_eq!(exit, Exit::Success);

        let text = out.contents();
        assert!(text.starts_with("Print the version of the Alluxio CLI\n"), "{text}");
        assert!(text.contains("alluxio info version [flags]"), "{text}");
        assert!(!text.lines().any(|l| l == info::version::VERSION), "{text}");
    }

    #[test]
    fn info_help_without_installation() {
        let reg = registry().unwrap();
        let (out, buf) = Output::capture();
        let exit = Dispatcher::new(&reg).help_only(&argv(&["info", "--help"]), &out, &StyleOptions::plain());
        assert_eq!(exit, Some(Exit::Success));
        let text = buf.contents();
        assert!(text.starts_with("Retrieve and/or display info about the running Alluxio cluster\n"), "{text}");
        assert!(text.contains("collect"), "{text}");
    }

    #[test]
    fn root_lists_info_only() {
        let dir = install(None);
        let (ctx, out, _err) = captured_context(&dir);
        let reg = registry().unwrap();
        assert_eq!(Dispatcher::new(&reg).dispatch(&[], &ctx), Exit::Success);
        let text = out.contents();
        assert!(text.contains("  info "), "{text}");
        assert!(!text.contains("collect"), "{text}");
    }

    #[test]
    fn bare_info_under_error_policy() {
        let dir = install(None);
        let (ctx, _out, err) = captured_context(&dir);
        let reg = registry().unwrap();
        let exit = Dispatcher::new(&reg)
            .partial_path(PartialPathPolicy::Error)
            .dispatch(&argv(&["info"]), &ctx);
        assert_eq!(exit, Exit::Usage);
        assert!(err.contents().contains("\"alluxio info\" requires a subcommand"));
    }
}
