//! Utilities: logging setup (verbosity flags -> tracing subscriber) and
//! human output formatting.
//!
//! Key items:
//!   init_logging / derive_level
//!   format::* (styles, tables, wrapping)

pub mod format;

/// Logging helpers.
pub mod logging {
    use tracing_subscriber::EnvFilter;

    /// Variable holding an `EnvFilter` directive that overrides `-v` / `-q`.
    pub const LOG_VAR: &str = "ALLUXIO_LOG";

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
    pub enum LogLevel {
        Error = 0,
        Warn = 1,
        Info = 2,
        Debug = 3,
        Trace = 4,
    }

    impl LogLevel {
        pub fn as_str(&self) -> &'static str {
            match self {
                LogLevel::Error => "error",
                LogLevel::Warn => "warn",
                LogLevel::Info => "info",
                LogLevel::Debug => "debug",
                LogLevel::Trace => "trace",
            }
        }
    }

    pub fn derive_level(verbose: u8, quiet: bool) -> LogLevel {
        if quiet {
            return LogLevel::Error;
        }
        match verbose {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Filter used when `ALLUXIO_LOG` is unset or unparsable.
    pub fn filter_for(level: LogLevel) -> EnvFilter {
        EnvFilter::new(level.as_str())
    }

    /// Installs the global subscriber (stderr, no ANSI when stderr is piped).
    /// A second call is a no-op.
    pub fn init_logging(level: LogLevel) {
        let filter = EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| filter_for(level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
            .with_target(false)
            .try_init();
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn verbosity_maps_to_levels() {
            assert_eq!(derive_level(0, false), LogLevel::Warn);
            assert_eq!(derive_level(1, false), LogLevel::Info);
            assert_eq!(derive_level(2, false), LogLevel::Debug);
            assert_eq!(derive_level(7, false), LogLevel::Trace);
            assert_eq!(derive_level(3, true), LogLevel::Error);
        }

        #[test]
        fn filter_renders_level() {
            assert_eq!(filter_for(LogLevel::Debug).to_string(), "debug");
        }

        #[test]
        fn init_twice_is_harmless() {
            init_logging(LogLevel::Error);
            init_logging(LogLevel::Trace);
        }
    }
}

pub use logging::{derive_level, init_logging};
