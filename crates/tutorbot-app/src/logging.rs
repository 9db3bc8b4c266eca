use anyhow::Result;
use log::LevelFilter;
use std::path::Path;

/// Overrides the log-file level (`error`, `warn`, `info`, `debug`, `trace`).
pub const LOG_LEVEL_ENV: &str = "TUTORBOT_LOG";

pub const LOG_FILE: &str = "tutorbot.log";

fn file_level() -> LevelFilter {
    std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(LevelFilter::Debug)
}

/// Everything at the file level goes to `<data_dir>/tutorbot.log`; warnings
/// and errors also go to stderr.
pub fn init(data_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let level = file_level();

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {:<5} {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(fern::log_file(data_dir.join(LOG_FILE))?);

    let stderr = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "  {}: {}",
                record.level().as_str().to_lowercase(),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .chain(std::io::stderr());

    fern::Dispatch::new()
        .level(level.max(LevelFilter::Warn))
        .level_for("hyper", LevelFilter::Info)
        .level_for("hyper_util", LevelFilter::Info)
        .level_for("reqwest", LevelFilter::Info)
        .level_for("rustls", LevelFilter::Info)
        .chain(file)
        .chain(stderr)
        .apply()?;
    Ok(())
}
