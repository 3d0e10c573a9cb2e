//! Log records go out on the console UART

use log::{LevelFilter, Metadata, Record};

use crate::serial::uart1;

pub const LOG_LEVEL: LevelFilter = LevelFilter::Info;

pub struct UartLogger;

static LOGGER: UartLogger = UartLogger;

impl log::Log for UartLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= LOG_LEVEL
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            core::fmt::write(
                &mut uart1::writer(),
                format_args!("{} - {}\r\n", record.level(), record.args()),
            )
            .ok();
        }
    }

    fn flush(&self) {}
}

/// Install the logger. Call after `uart1::init`.
pub fn init() {
    // thumbv6m has no compare-and-swap, so only the racy setter exists there
    unsafe {
        log::set_logger_racy(&LOGGER)
            .map(|()| log::set_max_level(LOG_LEVEL))
            .ok();
    }
}
