use clap::ValueEnum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Output format for log lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` overrides the default `info` filter. Returns `false` if a
/// subscriber was already installed, in which case nothing changes.
pub fn init_logging(format: LogFormat) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_writer(std::io::stderr);
            Registry::default().with(env_filter).with(fmt_layer).try_init().is_ok()
        }
        LogFormat::Text => {
            let fmt_layer = fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            Registry::default().with(env_filter).with(fmt_layer).try_init().is_ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_a_no_op() {
        init_logging(LogFormat::Text);
        assert!(!init_logging(LogFormat::Json));
    }
}
