//! Logging setup shared by the server and the command-line tools.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

pub const DEFAULT_FILTER: &str = "crash_radar=info,tower_http=info";

/// Install the global subscriber. With `log_dir`, logs also go to a daily
/// rolling file; keep the returned guard alive until exit so it flushes.
pub fn init_tracing(log_dir: Option<&str>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stdout = fmt::layer().with_target(true);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "crash_radar.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = fmt::layer().with_ansi(false).with_writer(writer);
            let _ = Registry::default().with(filter).with(stdout).with(file).try_init();
            Some(guard)
        }
        None => {
            let _ = Registry::default().with(filter).with(stdout).try_init();
            None
        }
    }
}
