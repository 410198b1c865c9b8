use std::{path::Path, str::FromStr, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Events of this crate are the only ones written. Dependencies stay silent.
const LOG_TARGET: &str = env!("CARGO_CRATE_NAME");
const LOG_DIR: &str = "logs";
const MAX_LOG_FILES: usize = 5;

/// Level used by `--log`.
pub const VERBOSE_LEVEL: LevelFilter = LevelFilter::DEBUG;
const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;

/// `--log` wins, then a plain level in `RUST_LOG`, then info.
pub fn resolve_level(verbose: bool, env_level: Option<&str>) -> LevelFilter {
    if verbose {
        return VERBOSE_LEVEL;
    }
    env_level
        .and_then(|level| LevelFilter::from_str(level.trim()).ok())
        .unwrap_or(DEFAULT_LEVEL)
}

fn filter_directive(level: LevelFilter) -> String {
    format!("{LOG_TARGET}={level}")
}

/// Writes `chronotrack.<date>.log` files under `<app dir>/logs`. With `mirror_stderr` events
/// are also printed to stderr, keeping stdout for command output.
pub fn enable_logging(
    application_data_path: &Path,
    level: LevelFilter,
    mirror_stderr: bool,
) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(LOG_TARGET)
        .filename_suffix("log")
        .build(application_data_path.join(LOG_DIR))?;

    let file_layer = fmt::layer().with_ansi(false).with_writer(appender);
    let stderr_layer = mirror_stderr.then(|| fmt::layer().compact().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter_directive(level)))
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .try_init();
});

#[cfg(test)]
mod tests {
    use tracing::level_filters::LevelFilter;

    use super::{filter_directive, resolve_level, VERBOSE_LEVEL};

    #[test]
    fn test_filter_targets_this_crate() {
        assert_eq!(filter_directive(LevelFilter::WARN).to_lowercase(), "chronotrack=warn");
    }

    #[test]
    fn test_resolve_level() {
        assert_eq!(resolve_level(true, Some("error")), VERBOSE_LEVEL);
        assert_eq!(resolve_level(false, Some("warn")), LevelFilter::WARN);
        assert_eq!(resolve_level(false, Some(" TRACE ")), LevelFilter::TRACE);
        assert_eq!(resolve_level(false, Some("chronotrack=debug")), LevelFilter::INFO);
        assert_eq!(resolve_level(false, None), LevelFilter::INFO);
    }
}
