/*
 * Driver Logging
 *
 * Backend for the `log` facade. Every record is written to a console
 * supplied by the host as `[LEVEL] message`; driver messages carry a
 * `VPMU:` prefix of their own so they stand out in a shared kernel log.
 *
 * The host picks the console and the maximum level once, at load time.
 * Until then records are dropped, which keeps the driver usable in
 * environments that never install a logger.
 */

use core::fmt::{self, Write};

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use spin::Once;

/// Line-oriented output the logger writes to
pub trait Console: Sync {
    fn write_str(&self, s: &str);
}

struct ConsoleWriter<'a>(&'a dyn Console);

impl Write for ConsoleWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}

/// Logger writing to the console installed by `init`
struct VpmuLogger {
    console: Once<&'static dyn Console>,
}

impl log::Log for VpmuLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(console) = self.console.get() {
            let _ = writeln!(ConsoleWriter(*console), "[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: VpmuLogger = VpmuLogger {
    console: Once::new(),
};

/// Install the driver logger
///
/// # Arguments
/// * `console` - Where records are written
/// * `level` - Most verbose level that is emitted
///
/// # Returns
/// An error if a logger was already installed; the first console stays.
pub fn init(console: &'static dyn Console, level: LevelFilter) -> Result<(), SetLoggerError> {
    LOGGER.console.call_once(|| console);
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}
