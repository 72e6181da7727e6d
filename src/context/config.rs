//! Layered cluster configuration.
//!
//! Lowest to highest precedence: built-in defaults, `<conf>/alluxio-site.yaml`,
//! an explicit `--config` file, environment variables, command-line overrides.
//! Layers are merged as YAML mappings (later wins, sequences replaced) and the
//! result is deserialized once.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use super::StartupError;
use super::env::Environment;
use crate::cli::PartialPathPolicy;

pub const SITE_FILE: &str = "alluxio-site.yaml";
pub const MASTER_HOSTNAME_VAR: &str = "ALLUXIO_MASTER_HOSTNAME";
pub const MASTER_RPC_PORT_VAR: &str = "ALLUXIO_MASTER_RPC_PORT";
pub const WORKER_RPC_PORT_VAR: &str = "ALLUXIO_WORKER_RPC_PORT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterConfig {
    pub masters: Vec<String>,
    pub master_rpc_port: u16,
    pub workers: Vec<String>,
    pub worker_rpc_port: u16,
    pub logs_dir: Option<PathBuf>,
    pub probe_timeout_ms: u64,
    pub cache: CacheConfig,
    pub cli: CliSettings,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            masters: vec!["localhost".to_string()],
            master_rpc_port: 19998,
            workers: Vec::new(),
            worker_rpc_port: 29999,
            logs_dir: None,
            probe_timeout_ms: 2000,
            cache: CacheConfig::default(),
            cli: CliSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub dirs: Vec<CacheDir>,
}

/// One page-store directory of the local worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheDir {
    pub path: PathBuf,
    /// Human size, e.g. `512MB`, `10GB`.
    pub quota: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliSettings {
    pub partial_path: PartialPathPolicy,
}

/// Result of loading: the merged config plus the files that contributed.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ClusterConfig,
    pub files: Vec<PathBuf>,
}

pub fn load(
    conf_dir: &Path,
    env: &Environment,
    explicit: Option<&Path>,
    cli_masters: &[String],
) -> Result<LoadedConfig, StartupError> {
    let mut merged = serde_yaml::to_value(ClusterConfig::default()).map_err(|e| {
        StartupError::Config {
            path: PathBuf::from("<defaults>"),
            reason: e.to_string(),
        }
    })?;
    let mut files = Vec::new();

    let site = conf_dir.join(SITE_FILE);
    if site.is_file() {
        merge(&mut merged, read_layer(&site)?);
        files.push(site);
    }

    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(StartupError::Config {
                path: path.to_path_buf(),
                reason: "file does not exist".to_string(),
            });
        }
        merge(&mut merged, read_layer(path)?);
        files.push(path.to_path_buf());
    }

    merge(&mut merged, env_layer(env)?);

    if !cli_masters.is_empty() {
        let mut layer = Mapping::new();
        layer.insert(
            Value::from("masters"),
            Value::Sequence(cli_masters.iter().map(|m| Value::from(m.as_str())).collect()),
        );
        merge(&mut merged, Value::Mapping(layer));
    }

    let config = serde_yaml::from_value(merged).map_err(|e| StartupError::Config {
        path: files.last().cloned().unwrap_or_else(|| PathBuf::from("<merged>")),
        reason: e.to_string(),
    })?;
    Ok(LoadedConfig { config, files })
}

/// Reads one YAML file and checks it against the schema on its own, so errors
/// point at the file that caused them.
fn read_layer(path: &Path) -> Result<Value, StartupError> {
    let config_err = |reason: String| StartupError::Config {
        path: path.to_path_buf(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
    let value: Value = serde_yaml::from_str(&raw).map_err(|e| config_err(e.to_string()))?;
    if !value.is_null() {
        serde_yaml::from_value::<ClusterConfig>(value.clone())
            .map_err(|e| config_err(e.to_string()))?;
    }
    Ok(value)
}

fn env_layer(env: &Environment) -> Result<Value, StartupError> {
    let mut layer = Mapping::new();
    if let Some(host) = env.var(MASTER_HOSTNAME_VAR) {
        layer.insert(
            Value::from("masters"),
            Value::Sequence(vec![Value::from(host)]),
        );
    }
    for (var, key) in [
        (MASTER_RPC_PORT_VAR, "master_rpc_port"),
        (WORKER_RPC_PORT_VAR, "worker_rpc_port"),
    ] {
        if let Some(raw) = env.var(var) {
            let port: u16 = raw.parse().map_err(|e: std::num::ParseIntError| {
                StartupError::InvalidEnv {
                    var: var.to_string(),
                    value: raw.to_string(),
                    reason: e.to_string(),
                }
            })?;
            layer.insert(Value::from(key), Value::from(port));
        }
    }
    Ok(Value::Mapping(layer))
}

/// Deep merge of mappings; anything else in `overlay` replaces `base`.
/// A null overlay (empty file) changes nothing.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, other) => *slot = other,
    }
}

/// Hosts listed one per line in `conf/masters` / `conf/workers`; `#` starts a comment.
pub fn read_host_file(path: &Path) -> Result<Vec<String>, StartupError> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| StartupError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(raw
        .lines()
        .map(|l| l.split('#').next().unwrap_or("").trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}
