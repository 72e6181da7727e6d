//! Command tree: the `Command` capability, the `Node` composite and the
//! `Registry` that resolves a token path down to one node.

use super::error::{CliError, RegistryError};
use super::flags::{self, FlagSpec, ParsedArgs, PositionalSpec};
use crate::context::ExecutionContext;

/// A leaf of the command tree.
///
/// Implementors are standalone types registered into a [`Service`]; the
/// registry and dispatcher never need to know what `run` does.
pub trait Command {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn flags(&self) -> Vec<FlagSpec> {
        Vec::new()
    }

    fn positionals(&self) -> Option<PositionalSpec> {
        None
    }

    fn run(&self, ctx: &ExecutionContext, args: &ParsedArgs) -> Result<(), CliError>;
}

/// One node of the tree: either an executable command or a nested service.
pub enum Node {
    Command(Box<dyn Command>),
    Service(Service),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Command(c) => c.name(),
            Node::Service(s) => &s.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Node::Command(c) => c.description(),
            Node::Service(s) => &s.description,
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Command(c) => f.debug_tuple("Command").field(&c.name()).finish(),
            Node::Service(s) => s.fmt(f),
        }
    }
}

/// Named, described, ordered group of nodes.
#[derive(Debug)]
pub struct Service {
    name: String,
    description: String,
    children: Vec<Node>,
}

impl Service {
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> ServiceBuilder {
        ServiceBuilder {
            name: name.into(),
            description: description.into(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Immediate children in registration order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name() == name)
    }
}

/// Collects children and validates the whole level on `build`.
pub struct ServiceBuilder {
    name: String,
    description: String,
    children: Vec<Node>,
}

impl ServiceBuilder {
    pub fn command(mut self, command: impl Command + 'static) -> Self {
        self.children.push(Node::Command(Box::new(command)));
        self
    }

    pub fn service(mut self, service: Service) -> Self {
        self.children.push(Node::Service(service));
        self
    }

    pub fn build(self) -> Result<Service, RegistryError> {
        validate_name(&self.name)?;
        for (idx, child) in self.children.iter().enumerate() {
            validate_name(child.name())?;
            if self.children[..idx].iter().any(|c| c.name() == child.name()) {
                return Err(RegistryError::DuplicateChild {
                    parent: self.name.clone(),
                    name: child.name().to_string(),
                });
            }
            if let Node::Command(cmd) = child {
                flags::validate_flags(cmd.name(), &cmd.flags(), cmd.positionals().as_ref())?;
            }
        }
        Ok(Service {
            name: self.name,
            description: self.description,
            children: self.children,
        })
    }
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains(['/', '\\']) {
        "name contains a path separator"
    } else if name.contains(char::is_whitespace) {
        "name contains whitespace"
    } else if name.starts_with('-') {
        "name starts with '-'"
    } else {
        return Ok(());
    };
    Err(RegistryError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

/// What a token path resolved to.
#[derive(Clone, Copy)]
pub enum Target<'r> {
    Service(&'r Service),
    Command(&'r dyn Command),
}

/// Result of walking the tree.
pub struct Resolution<'r, 't> {
    pub target: Target<'r>,
    /// Names from the root (inclusive) to the target.
    pub path: Vec<&'r str>,
    /// Tokens left for flag parsing or help handling.
    pub remainder: &'t [String],
}

impl Resolution<'_, '_> {
    pub fn display_path(&self) -> String {
        self.path.join(" ")
    }
}

/// Root of the command tree. Immutable once built.
#[derive(Debug)]
pub struct Registry {
    root: Service,
}

impl Registry {
    pub fn new(root: Service) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Service {
        &self.root
    }

    /// Walks `tokens` from the root.
    ///
    /// Path tokens are consumed while they name a child of the current
    /// service. The walk stops at the first command, the first token that
    /// looks like a flag, or when tokens run out. A non-flag token that names
    /// no child fails with `NotFound` carrying the path up to that token.
    pub fn resolve<'r, 't>(&'r self, tokens: &'t [String]) -> Result<Resolution<'r, 't>, CliError> {
        let mut current = &self.root;
        let mut path = vec![self.root.name()];
        let mut consumed: Vec<&str> = Vec::new();

        for (idx, token) in tokens.iter().enumerate() {
            if token.starts_with('-') {
                return Ok(Resolution {
                    target: Target::Service(current),
                    path,
                    remainder: &tokens[idx..],
                });
            }
            match current.child(token) {
                Some(Node::Service(service)) => {
                    current = service;
                    path.push(service.name());
                    consumed.push(token);
                }
                Some(Node::Command(command)) => {
                    path.push(command.name());
                    return Ok(Resolution {
                        target: Target::Command(command.as_ref()),
                        path,
                        remainder: &tokens[idx + 1..],
                    });
                }
                None => {
                    consumed.push(token);
                    return Err(CliError::NotFound {
                        path: consumed.join(" "),
                    });
                }
            }
        }

        Ok(Resolution {
            target: Target::Service(current),
            path,
            remainder: &[],
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) struct Probe {
        pub name: &'static str,
    }

    impl Command for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "probe command"
        }

        fn run(&self, _ctx: &ExecutionContext, _args: &ParsedArgs) -> Result<(), CliError> {
            Ok(())
        }
    }

    /// tool -> alpha -> (beta -> gamma), delta ; tool -> epsilon
    pub(crate) fn sample() -> Registry {
        let beta = Service::builder("beta", "second level")
            .command(Probe { name: "gamma" })
            .build()
            .unwrap();
        let alpha = Service::builder("alpha", "first level")
            .service(beta)
            .command(Probe { name: "delta" })
            .build()
            .unwrap();
        let root = Service::builder("tool", "sample tool")
            .service(alpha)
            .command(Probe { name: "epsilon" })
            .build()
            .unwrap();
        Registry::new(root)
    }

    fn toks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn assert_resolves(reg: &Registry, input: &[&str], path: &str, rest: &[&str]) {
        let tokens = toks(input);
        let res = reg.resolve(&tokens).unwrap();
        assert_eq!(res.display_path(), path, "input {input:?}");
        assert_eq!(res.remainder, toks(rest).as_slice(), "input {input:?}");
    }

    #[test]
    fn resolves_every_prefix_with_exact_remainder() {
        let reg = sample();
        assert_resolves(&reg, &[], "tool", &[]);
        assert_resolves(&reg, &["alpha"], "tool alpha", &[]);
        assert_resolves(&reg, &["alpha", "beta"], "tool alpha beta", &[]);
        assert_resolves(
            &reg,
            &["alpha", "beta", "gamma", "x", "--y"],
            "tool alpha beta gamma",
            &["x", "--y"],
        );
        assert_resolves(&reg, &["alpha", "delta", "beta"], "tool alpha delta", &["beta"]);
        assert_resolves(&reg, &["epsilon"], "tool epsilon", &[]);
        assert_resolves(&reg, &["alpha", "--flag", "beta"], "tool alpha", &["--flag", "beta"]);
    }

    #[test]
    fn resolves_to_expected_kind() {
        let reg = sample();
        let tokens = toks(&["alpha", "beta"]);
        assert!(matches!(reg.resolve(&tokens).unwrap().target, Target::Service(_)));
        let tokens = toks(&["alpha", "beta", "gamma"]);
        let res = reg.resolve(&tokens).unwrap();
        assert!(matches!(res.target, Target::Command(c) if c.name() == "gamma"));
    }

    #[test]
    fn unknown_token_reports_path_prefix() {
        let reg = sample();
        let tokens = toks(&["alpha", "bogus", "more"]);
        match reg.resolve(&tokens) {
            Err(CliError::NotFound { path }) => assert_eq!(path, "alpha bogus"),
            other => panic!("unexpected: {:?}", other.map(|r| r.display_path())),
        }
    }

    #[test]
    fn matching_is_case_sensitive() {
        let reg = sample();
        let tokens = toks(&["Alpha"]);
        assert!(matches!(reg.resolve(&tokens), Err(CliError::NotFound { .. })));
    }

    #[test]
    fn duplicate_siblings_rejected() {
        let err = Service::builder("info", "dup")
            .command(Probe { name: "nodes" })
            .command(Probe { name: "nodes" })
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateChild {
                parent: "info".into(),
                name: "nodes".into()
            }
        );
    }

    #[test]
    fn duplicate_service_and_command_rejected() {
        let nested = Service::builder("nodes", "group").build().unwrap();
        let err = Service::builder("info", "dup")
            .service(nested)
            .command(Probe { name: "nodes" })
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateChild { .. }));
    }

    #[test]
    fn invalid_names_rejected() {
        for bad in ["", "a/b", "a b", "-x", "a\\b"] {
            let err = Service::builder("info", "bad")
                .command(Probe { name: bad })
                .build()
                .unwrap_err();
            assert!(matches!(err, RegistryError::InvalidName { .. }), "{bad:?}");
        }
    }
}
