//! Ferrux Kernel: аппаратно-независимое ядро планирования и IPC
//! Ferrux Kernel: hardware-independent scheduling and IPC core
//!
//! Подсистемы / Subsystems:
//!   queue  - кольцевая очередь и min-куча / ring queue and min-heap
//!   proc   - таблица дескрипторов процессов / process descriptor table
//!   sched  - block/unblock, тики, таймауты / block/unblock, ticks, timeouts
//!   ipc    - семафоры и очереди сообщений / semaphores and message queues
//!
//! Платформа поставляет переключение контекста (`ContextSwitch`),
//! источник тиков (`Kernel::tick`) и глобальный аллокатор.
//! The platform supplies the context switch (`ContextSwitch`), the tick
//! source (`Kernel::tick`) and the global allocator.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

// Подключить стандартный alloc крейт (Box, Vec, ...)
// Connect standard alloc crate (Box, Vec, ...)
extern crate alloc;

pub mod klog;
pub mod config;
pub mod queue;
pub mod proc;
pub mod sched;
pub mod ipc;
mod kernel;

#[cfg(test)]
mod testing;

pub use kernel::{Kernel, KernelStats};
pub use libferrux::{
    Error, MsgCtl, MsgFlags, MsgKey, MsgqId, MsgqStat, Pid, Priority, ProcessStat,
    ProcessState, ProcessStatus, Result, SemId,
};

use alloc::boxed::Box;
use spin::Mutex;

use crate::config::Config;
use crate::proc::ContextSwitch;

/// Единственный экземпляр ядра; замок и есть критическая секция.
/// The single kernel instance; holding the lock is the critical section.
static KERNEL: Mutex<Option<Kernel>> = Mutex::new(None);

/// Установить глобальное ядро; повторный вызов: `Busy`.
/// Install the global kernel; a second call fails with `Busy`.
pub fn init(config: Config, switch: Box<dyn ContextSwitch + Send>) -> Result<()> {
    let mut slot = KERNEL.lock();
    if slot.is_some() {
        return Err(Error::Busy);
    }
    *slot = Some(Kernel::new(config, switch)?);
    log::debug!("ferrux: kernel installed");
    Ok(())
}

/// Выполнить `f` внутри критической секции ядра.
/// Run `f` inside the kernel critical section.
pub fn with_kernel<R>(f: impl FnOnce(&mut Kernel) -> R) -> Result<R> {
    KERNEL.lock().as_mut().map(f).ok_or(Error::NotFound)
}
