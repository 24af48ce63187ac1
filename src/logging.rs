use std::path::Path;

pub const LOG_FILE_BASENAME: &str = "tasklist";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 5;
pub const LOG_ENV: &str = "TASKLIST_LOG";

/// Log files live next to `storage.json` and `settings.json`.
pub fn log_directory(data_dir: &Path) -> &Path {
    data_dir
}

/// Picks the first non-blank of `TASKLIST_LOG` and `RUST_LOG`, else the build default.
pub fn log_spec(tasklist_log: Option<String>, rust_log: Option<String>) -> String {
    // Dependency logs stay at WARN; our crate is more verbose in debug builds.
    let default_spec = if cfg!(debug_assertions) {
        "warn,tasklist_lib=debug,tasklist=debug"
    } else {
        "warn,tasklist_lib=info,tasklist=info"
    };
    tasklist_log
        .filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

#[cfg(all(feature = "cli", not(test)))]
pub fn init_logging(
    data_dir: &Path,
) -> Result<flexi_logger::LoggerHandle, flexi_logger::FlexiLoggerError> {
    use flexi_logger::{detailed_format, Cleanup, Criterion, FileSpec, Logger, Naming, WriteMode};

    std::fs::create_dir_all(data_dir)?;

    let spec = log_spec(std::env::var(LOG_ENV).ok(), std::env::var("RUST_LOG").ok());

    // Terminal output belongs to the list view, so logs only go to files.
    let handle = Logger::try_with_str(spec)?
        .log_to_file(
            FileSpec::default()
                .directory(log_directory(data_dir))
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .start()?;

    install_panic_hook();

    log::info!(
        "logger initialized dir={} rotate_size_bytes={} keep_files={}",
        log_directory(data_dir).display(),
        LOG_ROTATE_SIZE_BYTES,
        LOG_ROTATE_KEEP_FILES
    );
    Ok(handle)
}

#[cfg(all(feature = "cli", not(test)))]
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("<non-string panic payload>");
        let location = info
            .location()
            .map(|loc| format!("{loc}"))
            .unwrap_or_else(|| "<unknown>".to_string());
        let backtrace = std::backtrace::Backtrace::force_capture();

        log::error!("panic: payload={payload} location={location}\nbacktrace:\n{backtrace}");
        default_hook(info);
    }));
}
