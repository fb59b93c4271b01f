use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub struct LoggingOptions {
    /// Directory for the daily rotated JSON log. `None` logs to console only.
    pub log_dir: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            log_dir: None,
            default_filter: "archive_cleaner=debug,info".to_string(),
        }
    }
}

/// Initializes console logging plus an optional JSON file log.
///
/// Keep the returned guard alive until exit so buffered file output is flushed.
pub fn init_logging(options: &LoggingOptions) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&options.default_filter));

    let console_layer = fmt::layer().with_target(true).with_writer(std::io::stdout);

    let (file_layer, guard) = match &options.log_dir {
        Some(dir) => {
            if let Err(e) = fs::create_dir_all(dir) {
                eprintln!("Could not create log dir '{}': {}", dir.display(), e);
                (None, None)
            } else {
                let file_appender = tracing_appender::rolling::daily(dir, "cleaner.log");
                let (writer, guard) = tracing_appender::non_blocking(file_appender);
                (Some(fmt::layer().json().with_writer(writer)), Some(guard))
            }
        }
        None => (None, None),
    };

    // try_init so tests and embedders that already set a subscriber keep theirs
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    guard
}
