//! `fern`-based logger init, colored on a terminal, one file per day when a
//! log directory is given. Config/CLI wiring that picks the level and
//! directory lives outside the core (spec §1); this just builds the
//! dispatcher from already-resolved values.

use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::path::Path;

pub fn init_logger(level: LevelFilter, log_dir: Option<&Path>) -> Result<(), fern::InitError> {
    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let mut dispatch = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if let Some(dir) = log_dir {
        std::fs::create_dir_all(dir).map_err(fern::InitError::Io)?;
        dispatch = dispatch.chain(fern::DateBased::new(
            dir.join("chainlens."),
            "%Y-%m-%d.log",
        ));
    }

    dispatch.apply()?;
    Ok(())
}
