//! Logger setup.

use crate::error::SetupError;

/// Installs a stderr logger with local timestamps. Can only succeed once per process.
pub fn init(level: log::LevelFilter) -> Result<(), SetupError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {:<5} {}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}
