//! Environment discovery: where the installation lives.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::StartupError;

pub const HOME_VAR: &str = "ALLUXIO_HOME";
pub const CONF_DIR_VAR: &str = "ALLUXIO_CONF_DIR";
pub const LOGS_DIR_VAR: &str = "ALLUXIO_LOGS_DIR";

/// Snapshot of the process environment taken once at startup.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: BTreeMap<String, String>,
    exe: Option<PathBuf>,
}

impl Environment {
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
            exe: std::env::current_exe().ok(),
        }
    }

    #[cfg(test)]
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            exe: None,
        }
    }

    #[cfg(test)]
    pub fn with_exe(mut self, exe: impl Into<PathBuf>) -> Self {
        self.exe = Some(exe.into());
        self
    }

    /// Non-empty, trimmed value of `key`.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Variables with the given prefix, for diagnostics.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.vars
            .iter()
            .filter(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Resolved installation layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub home: PathBuf,
    pub conf_dir: PathBuf,
    /// Explicit logs dir from the environment, if any; config may supply one later.
    pub logs_dir_override: Option<PathBuf>,
}

/// Locates the installation.
///
/// Home: explicit override > ALLUXIO_HOME > `<exe dir>/..` when it holds `conf/`.
/// Conf dir: ALLUXIO_CONF_DIR > `<home>/conf`, and it must exist.
pub fn discover(env: &Environment, home_override: Option<&Path>) -> Result<Installation, StartupError> {
    let home = match home_override {
        Some(p) => p.to_path_buf(),
        None => match env.var(HOME_VAR) {
            Some(h) => PathBuf::from(h),
            None => home_from_exe(env.exe.as_deref()).ok_or(StartupError::HomeNotFound)?,
        },
    };
    if !home.is_dir() {
        return Err(StartupError::NotADirectory { path: home });
    }

    let conf_dir = env
        .var(CONF_DIR_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join("conf"));
    if !conf_dir.is_dir() {
        return Err(StartupError::ConfDirMissing { path: conf_dir });
    }

    Ok(Installation {
        home,
        conf_dir,
        logs_dir_override: env.var(LOGS_DIR_VAR).map(PathBuf::from),
    })
}

/// `<home>/bin/alluxio` -> `<home>`, accepted only when `<home>/conf` exists.
fn home_from_exe(exe: Option<&Path>) -> Option<PathBuf> {
    let home = exe?.parent()?.parent()?;
    home.join("conf").is_dir().then(|| home.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn install() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("conf")).unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        dir
    }

    #[test]
    fn home_from_variable() {
        let dir = install();
        let env = Environment::from_vars([(HOME_VAR, dir.path().to_str().unwrap())]);
        let inst = discover(&env, None).unwrap();
        assert_eq!(inst.home, dir.path());
        assert_eq!(inst.conf_dir, dir.path().join("conf"));
        assert_eq!(inst.logs_dir_override, None);
    }

    #[test]
    fn override_beats_variable() {
        let dir = install();
        let env = Environment::from_vars([(HOME_VAR, "/definitely/not/here")]);
        let inst = discover(&env, Some(dir.path())).unwrap();
        assert_eq!(inst.home, dir.path());
    }

    #[test]
    fn home_from_executable_location() {
        let dir = install();
        let env = Environment::default().with_exe(dir.path().join("bin").join("alluxio"));
        assert_eq!(discover(&env, None).unwrap().home, dir.path());
    }

    #[test]
    fn missing_home_is_fatal() {
        let env = Environment::from_vars([(HOME_VAR, "  ")]);
        assert!(matches!(discover(&env, None), Err(StartupError::HomeNotFound)));

        let env = Environment::from_vars([(HOME_VAR, "/definitely/not/here")]);
        assert!(matches!(
            discover(&env, None),
            Err(StartupError::NotADirectory { .. })
        ));
    }

    #[test]
    fn missing_conf_dir_is_fatal() {
        let dir = TempDir::new().unwrap();
        let env = Environment::from_vars([(HOME_VAR, dir.path().to_str().unwrap())]);
        assert!(matches!(
            discover(&env, None),
            Err(StartupError::ConfDirMissing { .. })
        ));
    }

    #[test]
    fn conf_and_logs_overrides() {
        let dir = install();
        let conf = dir.path().join("etc");
        std::fs::create_dir_all(&conf).unwrap();
        let env = Environment::from_vars([
            (HOME_VAR, dir.path().to_str().unwrap()),
            (CONF_DIR_VAR, conf.to_str().unwrap()),
            (LOGS_DIR_VAR, "/var/log/alluxio"),
        ]);
        let inst = discover(&env, None).unwrap();
        assert_eq!(inst.conf_dir, conf);
        assert_eq!(inst.logs_dir_override, Some(PathBuf::from("/var/log/alluxio")));
    }
}
