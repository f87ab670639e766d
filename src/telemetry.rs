use tracing_subscriber::{prelude::*, EnvFilter, Registry};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or(EnvFilter::try_new("info"))
        .unwrap()
}

/// Initialize tracing
pub fn init(format: LogFormat) {
    let collector = Registry::default().with(env_filter());

    // Decide on layers
    match format {
        LogFormat::Compact => {
            let logger = tracing_subscriber::fmt::layer().compact();
            tracing::subscriber::set_global_default(collector.with(logger)).unwrap();
        }
        LogFormat::Json => {
            let logger = tracing_subscriber::fmt::layer().json();
            tracing::subscriber::set_global_default(collector.with(logger)).unwrap();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_filter_is_info() {
        // only meaningful when RUST_LOG isn't set by the test runner
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(env_filter().to_string(), "info");
        }
    }
}
