//! Execution context: everything a command may read, built once per process.
//!
//! Construction order: environment discovery -> layered config -> host files
//! -> endpoint parsing. Any failure aborts startup; a context is never handed
//! out half-built. After construction nothing in it changes except the bytes
//! written through its output sinks.

pub mod config;
pub mod env;

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::rc::Rc;

use crate::cluster::Endpoint;
use crate::utils::format::StyleOptions;
pub use config::{CacheDir, ClusterConfig};
pub use env::{Environment, Installation};

/// Startup failures. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(
        "cannot locate the Alluxio installation; set {} or pass --home",
        env::HOME_VAR
    )]
    HomeNotFound,

    #[error("installation home {} is not a directory", .path.display())]
    NotADirectory { path: PathBuf },

    #[error("configuration directory {} does not exist", .path.display())]
    ConfDirMissing { path: PathBuf },

    #[error("invalid configuration in {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    #[error("invalid value '{value}' for {var}: {reason}")]
    InvalidEnv {
        var: String,
        value: String,
        reason: String,
    },

    #[error("invalid {role} endpoint '{raw}': {reason}")]
    InvalidEndpoint {
        role: &'static str,
        raw: String,
        reason: String,
    },

    #[error("no master endpoints configured")]
    NoMasters,
}

/// Write sink shared by the dispatcher and the running command.
pub struct Output {
    sink: RefCell<Box<dyn Write>>,
}

impl Output {
    pub fn new(sink: impl Write + 'static) -> Self {
        Self {
            sink: RefCell::new(Box::new(sink)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// In-memory sink plus a handle to read back what was written.
    #[cfg(test)]
    pub fn capture() -> (Self, Captured) {
        let captured = Captured::default();
        (Self::new(captured.clone()), captured)
    }

    /// Target of `write!` / `writeln!`.
    pub fn write_fmt(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.sink.borrow_mut().write_fmt(args)
    }

    #[cfg(test)]
    pub fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        self.sink.borrow_mut().write_all(bytes)
    }

    pub fn flush(&self) -> io::Result<()> {
        self.sink.borrow_mut().flush()
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Output { .. }")
    }
}

/// Shared in-memory buffer behind [`Output::capture`].
#[cfg(test)]
#[derive(Clone, Default)]
pub struct Captured(Rc<RefCell<Vec<u8>>>);

#[cfg(test)]
impl Captured {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

#[cfg(test)]
impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Startup inputs that come from the command line.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    pub home: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub masters: Vec<String>,
}

#[derive(Debug)]
pub struct ExecutionContext {
    env: Environment,
    install: Installation,
    logs_dir: PathBuf,
    config: ClusterConfig,
    config_files: Vec<PathBuf>,
    masters: Vec<Endpoint>,
    workers: Vec<Endpoint>,
    out: Output,
    err: Output,
    style: StyleOptions,
    span: tracing::Span,
}

impl ExecutionContext {
    /// Discovers the installation, loads configuration and parses endpoints.
    /// Output goes to the process stdout / stderr.
    pub fn build(env: &Environment, opts: &ContextOptions) -> Result<Self, StartupError> {
        let install = env::discover(env, opts.home.as_deref())?;
        let loaded = config::load(
            &install.conf_dir,
            env,
            opts.config_file.as_deref(),
            &opts.masters,
        )?;
        let mut config = loaded.config;

        // Host files only extend the lists when no explicit override replaced them.
        if opts.masters.is_empty() && env.var(config::MASTER_HOSTNAME_VAR).is_none() {
            extend_unique(
                &mut config.masters,
                config::read_host_file(&install.conf_dir.join("masters"))?,
            );
        }
        extend_unique(
            &mut config.workers,
            config::read_host_file(&install.conf_dir.join("workers"))?,
        );

        let masters = parse_endpoints("master", &config.masters, config.master_rpc_port)?;
        if masters.is_empty() {
            return Err(StartupError::NoMasters);
        }
        let workers = parse_endpoints("worker", &config.workers, config.worker_rpc_port)?;

        let logs_dir = install
            .logs_dir_override
            .clone()
            .or_else(|| config.logs_dir.clone())
            .unwrap_or_else(|| install.home.join("logs"));

        let span = tracing::info_span!("alluxio", home = %install.home.display());
        tracing::debug!(
            parent: &span,
            masters = masters.len(),
            workers = workers.len(),
            files = ?loaded.files,
            "execution context ready"
        );

        Ok(Self {
            env: env.clone(),
            install,
            logs_dir,
            config,
            config_files: loaded.files,
            masters,
            workers,
            out: Output::stdout(),
            err: Output::stderr(),
            style: StyleOptions::plain(),
            span,
        })
    }

    /// Replaces the output sinks; used to capture output.
    #[cfg(test)]
    pub fn with_outputs(mut self, out: Output, err: Output) -> Self {
        self.out = out;
        self.err = err;
        self
    }

    /// Terminal styling for human output; plain unless the caller opts in.
    pub fn with_style(mut self, style: StyleOptions) -> Self {
        self.style = style;
        self
    }

    /// Environment snapshot taken at startup.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn home(&self) -> &Path {
        &self.install.home
    }

    pub fn conf_dir(&self) -> &Path {
        &self.install.conf_dir
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Files that contributed to the configuration, lowest precedence first.
    pub fn config_files(&self) -> &[PathBuf] {
        &self.config_files
    }

    pub fn masters(&self) -> &[Endpoint] {
        &self.masters
    }

    pub fn workers(&self) -> &[Endpoint] {
        &self.workers
    }

    pub fn out(&self) -> &Output {
        &self.out
    }

    pub fn err(&self) -> &Output {
        &self.err
    }

    pub fn style(&self) -> &StyleOptions {
        &self.style
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

fn extend_unique(list: &mut Vec<String>, extra: Vec<String>) {
    for item in extra {
        if !list.contains(&item) {
            list.push(item);
        }
    }
}

fn parse_endpoints(
    role: &'static str,
    raw: &[String],
    default_port: u16,
) -> Result<Vec<Endpoint>, StartupError> {
    let mut endpoints: Vec<Endpoint> = Vec::with_capacity(raw.len());
    for item in raw {
        let ep = Endpoint::parse(item, default_port).map_err(|e| StartupError::InvalidEndpoint {
            role,
            raw: item.clone(),
            reason: format!("{e:#}"),
        })?;
        if !endpoints.contains(&ep) {
            endpoints.push(ep);
        }
    }
    Ok(endpoints)
}
