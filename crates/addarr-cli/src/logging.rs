use addarr_core::config::{AppConfig, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const CRATES: &[&str] = &["addarr", "addarr_api", "addarr_core", "addarr_runtime"];

/// Install the global subscriber. `RUST_LOG` wins over `level`.
///
/// The returned guard flushes the log file on drop; keep it alive for the
/// whole program.
pub fn init(config: &LoggingConfig, level: Option<&str>) -> Option<WorkerGuard> {
    let level = level.unwrap_or(config.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
        EnvFilter::new(directives.join(","))
    });

    let (file_layer, guard) = if config.file {
        let appender = tracing_appender::rolling::daily(AppConfig::log_dir(), "addarr.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    guard
}
