use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rxr_lifecycle::{
    config::{Clock, LifecycleConfig},
    lifecycle::{self, Stdout},
};

/// Subscribes to a timed observable and unsubscribes from it after a delay.
///
/// Emitted values go to stdout, logs go to stderr.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file overriding the default run
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Milliseconds between subscribing and unsubscribing
    #[arg(long)]
    unsubscribe_after_ms: Option<u64>,

    /// Let pending timers fire after unsubscribe instead of cancelling them
    #[arg(long)]
    leak_pending_timers: bool,

    /// Fire timers back to back instead of waiting in real time
    #[arg(long)]
    virtual_clock: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> anyhow::Result<LifecycleConfig> {
        let mut config = match &self.config {
            Some(path) => LifecycleConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => LifecycleConfig::default(),
        };
        if let Some(ms) = self.unsubscribe_after_ms {
            config.unsubscribe_after_ms = ms;
        }
        if self.leak_pending_timers {
            config.cancel_pending = false;
        }
        if self.virtual_clock {
            config.clock = Clock::Virtual;
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("rxr_lifecycle={}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = args.into_config()?;
    tracing::debug!(?config, "starting lifecycle");

    lifecycle::run(&config, Arc::new(Stdout)).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn config_from(argv: &[&str]) -> LifecycleConfig {
        let argv = std::iter::once("rxr-lifecycle").chain(argv.iter().copied());
        let args = Args::try_parse_from(argv).unwrap();
        args.into_config().unwrap()
    }

    #[test]
    fn no_flags_is_the_default_run() {
        assert_eq!(config_from(&[]), LifecycleConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let config = config_from(&[
            "--unsubscribe-after-ms",
            "1000",
            "--leak-pending-timers",
            "--virtual-clock",
        ]);

        assert_eq!(config.unsubscribe_after_ms, 1000);
        assert!(!config.cancel_pending);
        assert_eq!(config.clock, Clock::Virtual);
        assert_eq!(config.emissions, LifecycleConfig::default().emissions);
    }

    #[test]
    fn flags_override_the_config_file() {
        let path = std::env::temp_dir()
            .join(format!("rxr-lifecycle-cli-{}.toml", std::process::id()));
        fs::write(
            &path,
            "unsubscribe_after_ms = 5000\ncancel_pending = true\n\n[[emissions]]\nvalue = \"a\"\n",
        )
        .unwrap();
        let path_arg = path.to_string_lossy().into_owned();

        let from_file = config_from(&["--config", &path_arg]);
        let overridden = config_from(&[
            "--config",
            &path_arg,
            "--unsubscribe-after-ms",
            "250",
            "--leak-pending-timers",
        ]);
        fs::remove_file(&path).unwrap();

        assert_eq!(from_file.unsubscribe_after_ms, 5000);
        assert!(from_file.cancel_pending);
        assert_eq!(from_file.emissions.len(), 1);

        assert_eq!(overridden.unsubscribe_after_ms, 250);
        assert!(!overridden.cancel_pending);
        assert_eq!(overridden.emissions, from_file.emissions);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = Args::try_parse_from([
            "rxr-lifecycle",
            "--config",
            "/nonexistent/rxr-lifecycle.toml",
        ])
        .unwrap();
        assert!(args.into_config().is_err());
    }
}
