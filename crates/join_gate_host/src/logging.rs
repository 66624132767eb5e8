use std::fs;
use std::path::Path;

use color_eyre::eyre::{eyre, Result, WrapErr};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::filter_fn, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
    Layer,
};

#[cfg(debug_assertions)]
const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;

#[cfg(not(debug_assertions))]
const DEFAULT_LEVEL: LevelFilter = LevelFilter::WARN;

/// Console logging, plus a non-blocking file layer when `log_file` is given.
///
/// The returned guard flushes the file writer and must live until exit.
pub fn init(level: Option<LevelFilter>, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = level.unwrap_or(DEFAULT_LEVEL);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre!("log file path {} has no file name", path.display()))?;
            fs::create_dir_all(dir)
                .wrap_err_with(|| format!("creating log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::Layer::default()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter_fn(move |metadata| metadata.level() <= &level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = fmt::Layer::default()
        .with_target(false)
        .with_filter(filter_fn(move |metadata| metadata.level() <= &level));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .wrap_err("installing tracing subscriber")?;

    Ok(guard)
}
