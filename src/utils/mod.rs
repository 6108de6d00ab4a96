//! Utilities: logging setup (level from -v/-q, RUST_LOG override).
//!
//! Key items:
//!   init_logging / derive_level

/// Logging helpers. Everything goes to stderr; stdout carries model output only.
pub mod logging {
    use tracing_subscriber::EnvFilter;

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

    /// `RUST_LOG` wins when set; otherwise the crate logs at `level` and
    /// dependencies stay at warn.
    pub fn filter_for(level: LogLevel) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("warn,ai_cli={0},ai={0}", level.as_str()))
        })
    }

    pub fn init_logging(level: LogLevel) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter_for(level))
            .with_writer(std::io::stderr)
            .with_target(level >= LogLevel::Debug)
            .try_init();
    }
}

pub use logging::{derive_level, init_logging};

#[cfg(test)]
mod tests {
    use super::logging::*;

    #[test]
    fn quiet_wins_over_verbose() {
        assert_eq!(derive_level(3, true), LogLevel::Error);
    }

    #[test]
    fn verbosity_steps() {
        assert_eq!(derive_level(0, false), LogLevel::Warn);
        assert_eq!(derive_level(1, false), LogLevel::Info);
        assert_eq!(derive_level(2, false), LogLevel::Debug);
        assert_eq!(derive_level(9, false), LogLevel::Trace);
    }
}
