//! Diagnostic logging to stderr.
//!
//! Stdout carries the result table, so all `tracing` output goes to stderr.
//! `RUST_LOG` takes precedence over the verbosity chosen on the command line.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Verbosity {
    /// Warnings and errors only.
    #[default]
    Quiet,
    /// Run progress (`-v`).
    Verbose,
    /// Everything including request details (`-vv`).
    Debug,
}

impl Verbosity {
    /// One step more verbose, saturating at [`Verbosity::Debug`].
    pub(crate) fn increase(self) -> Self {
        match self {
            Self::Quiet => Self::Verbose,
            Self::Verbose | Self::Debug => Self::Debug,
        }
    }

    fn filter_str(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Verbose => "pdfjornada=info,warn",
            Self::Debug => "pdfjornada=debug,info",
        }
    }
}

/// Install the global subscriber. Call once, at startup.
pub(crate) fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_str()));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_saturates() {
        assert_eq!(Verbosity::default().increase(), Verbosity::Verbose);
        assert_eq!(Verbosity::Verbose.increase(), Verbosity::Debug);
        assert_eq!(Verbosity::Debug.increase(), Verbosity::Debug);
    }

    #[test]
    fn filters_parse() {
        for v in [Verbosity::Quiet, Verbosity::Verbose, Verbosity::Debug] {
            assert!(v.filter_str().parse::<EnvFilter>().is_ok());
        }
    }
}
