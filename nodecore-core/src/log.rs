//! Logger setup and logging macros.
//!
//! Library crates never configure a logger themselves; they only call the `log`
//! crate's macros (re-exported here) and leave initialization to the `nodecored`
//! binary via [`init_logger`].

mod appender;
mod consts;
mod logger;

use consts::*;

pub use log::{debug, error, info, trace, warn};
pub use log::{Level, LevelFilter};

/// Initializes the process-wide logger with a console appender and, if `log_dir`
/// is given, rotating file appenders for all levels and for warnings/errors only.
///
/// `filters` is a `RUST_LOG`-style expression: either a single level (applies to
/// the root logger) or a comma-separated list of `target=level` pairs, e.g.
/// `"info,nodecore_chain_store=debug"`.
pub fn init_logger(log_dir: Option<&str>, filters: &str) {
    use appender::AppenderSpec;
    use log4rs::{config::Root, Config};
    use std::iter::once;

    const CONSOLE_APPENDER: &str = "stdout";
    const LOG_FILE_APPENDER: &str = "log_file";
    const ERR_LOG_FILE_APPENDER: &str = "err_log_file";

    let loggers = logger::Builder::new().root_level(LevelFilter::Info).parse_env(DEFAULT_LOGGER_ENV).parse_expression(filters).build();

    let mut stdout_appender = AppenderSpec::console(CONSOLE_APPENDER, None);
    let mut file_appender = log_dir.map(|x| AppenderSpec::roller(LOG_FILE_APPENDER, None, x, LOG_FILE_NAME));
    let mut err_file_appender =
        log_dir.map(|x| AppenderSpec::roller(ERR_LOG_FILE_APPENDER, Some(LevelFilter::Warn), x, ERR_LOG_FILE_NAME));
    let appenders = once(&mut stdout_appender).chain(&mut file_appender).chain(&mut err_file_appender).map(|x| x.appender());

    let config = Config::builder()
        .appenders(appenders)
        .loggers(loggers.items())
        .build(
            Root::builder()
                .appenders(once(&stdout_appender).chain(&file_appender).chain(&err_file_appender).map(|x| x.name))
                .build(loggers.root_level()),
        )
        .unwrap();

    let _ = log4rs::init_config(config);
}

/// Initializes a bare console logger; does not panic if a logger is already installed.
/// Intended for use from `#[test]` functions.
pub fn try_init_logger(filters: &str) {
    use appender::AppenderSpec;
    use log4rs::{config::Root, Config};

    const CONSOLE_APPENDER: &str = "stdout";

    let loggers = logger::Builder::new().root_level(LevelFilter::Info).parse_env(DEFAULT_LOGGER_ENV).parse_expression(filters).build();
    let mut stdout_appender = AppenderSpec::console(CONSOLE_APPENDER, None);
    let config = Config::builder()
        .appender(stdout_appender.appender())
        .loggers(loggers.items())
        .build(Root::builder().appender(CONSOLE_APPENDER).build(loggers.root_level()))
        .unwrap();
    let _ = log4rs::init_config(config);
}
