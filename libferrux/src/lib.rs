//! libferrux: Ferrux kernel ABI
//!
//! Общие типы ядра и задач: идентификаторы, состояния, флаги, ошибки.
//! Types shared by the kernel and its tasks: identifiers, states, flags, errors.
//!
//! Использование / Usage:
//!   use libferrux::{ipc::MsgFlags, Error, Result};
//!   let flags = MsgFlags::CREATE | MsgFlags::EXCLUSIVE;

#![cfg_attr(not(test), no_std)]

pub mod ipc;
pub mod task;

pub use ipc::{MsgCtl, MsgFlags, MsgKey, MsgqId, MsgqStat, SemId};
pub use task::{Pid, Priority, ProcessStat, ProcessState, ProcessStatus};

use core::fmt;

/// Ошибки ядра / Kernel errors
///
/// Ни одна операция не повторяется внутри ядра: повтор решает вызывающий.
/// No operation is retried inside the kernel; retrying is caller policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Таблица или очередь заполнена / A table or queue is at capacity.
    NoSpace,
    /// Аллокатор не выдал память / The allocator failed.
    NoMemory,
    /// Идентификатор вне диапазона или слот свободен.
    /// Identifier out of range or its slot is unallocated.
    NotFound,
    /// Эксклюзивное создание при существующем ключе.
    /// Exclusive creation found an existing key.
    AlreadyExists,
    /// Объект удалён, пока мы ждали / The object was removed while waiting.
    Removed,
    /// Сообщение длиннее буфера приёма / Message longer than the receive limit.
    TooBig,
    /// Неблокирующий приём из пустой очереди / Non-blocking receive on an empty queue.
    NoMessage,
    /// Истёк таймаут ожидания / A timed wait expired.
    TimedOut,
    InvalidArg,
    Busy,
}

impl Error {
    /// errno-style code for a syscall return register.
    pub const fn code(self) -> isize {
        match self {
            Error::NoSpace       => -28, // ENOSPC
            Error::NoMemory      => -12, // ENOMEM
            Error::NotFound      => -2,  // ENOENT
            Error::AlreadyExists => -17, // EEXIST
            Error::Removed       => -43, // EIDRM
            Error::TooBig        => -7,  // E2BIG
            Error::NoMessage     => -42, // ENOMSG
            Error::TimedOut      => -110, // ETIMEDOUT
            Error::InvalidArg    => -22, // EINVAL
            Error::Busy          => -16, // EBUSY
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Error::NoSpace       => "capacity exhausted",
            Error::NoMemory      => "out of memory",
            Error::NotFound      => "no such object",
            Error::AlreadyExists => "object already exists",
            Error::Removed       => "object removed while waiting",
            Error::TooBig        => "message too large",
            Error::NoMessage     => "no message available",
            Error::TimedOut      => "wait timed out",
            Error::InvalidArg    => "invalid argument",
            Error::Busy          => "resource busy",
        };
        f.write_str(text)
    }
}

pub type Result<T> = core::result::Result<T, Error>;
