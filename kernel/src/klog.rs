//! Консоль ядра и логгер / Kernel console and logger
//!
//! Ядро не знает, куда писать: платформа регистрирует приёмник
//! (UART, framebuffer, буфер в тестах) один раз через `init`.
//! The kernel does not know where output goes: the platform registers a
//! sink (UART, framebuffer, a buffer in tests) once through `init`.
//!
//! Использование / Usage:
//!   klog::init(&mut UART, log::LevelFilter::Debug)?;
//!   kprintln!("ferrux: {} process slots", cfg.max_procs);

use core::fmt;
use log::{LevelFilter, Metadata, Record};
use spin::Mutex;

use crate::{Error, Result};

pub type Sink = &'static mut (dyn fmt::Write + Send);

static CONSOLE: Mutex<Option<Sink>> = Mutex::new(None);

struct KernelLogger;

static LOGGER: KernelLogger = KernelLogger;

impl log::Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            _print(format_args!("[{:<5} {}] {}\n", record.level(), record.target(), record.args()));
        }
    }

    fn flush(&self) {}
}

/// Зарегистрировать приёмник и уровень; второй вызов: `Busy`.
/// Register the sink and level; a second call fails with `Busy`.
pub fn init(sink: Sink, level: LevelFilter) -> Result<()> {
    let mut console = CONSOLE.lock();
    if console.is_some() {
        return Err(Error::Busy);
    }
    log::set_logger(&LOGGER).map_err(|_| Error::Busy)?;
    log::set_max_level(level);
    *console = Some(sink);
    Ok(())
}

/// Внутренняя функция для макроса kprint!
/// Internal function for the kprint! macro
pub fn _print(args: fmt::Arguments) {
    if let Some(sink) = CONSOLE.lock().as_mut() {
        sink.write_fmt(args).ok();
    }
}

/// Вывод на консоль ядра; без приёмника молча отбрасывается.
/// Print to the kernel console; discarded while no sink is registered.
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {
        $crate::klog::_print(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! kprintln {
    ()           => ($crate::kprint!("\n"));
    ($($arg:tt)*) => ($crate::kprint!("{}\n", format_args!($($arg)*)));
}
