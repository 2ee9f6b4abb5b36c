//! IPC ABI: семафоры и очереди сообщений
//!
//! Флаги и структуры для msg_get / msg_ctl / msg_send / msg_recv.
//! Flags and records for msg_get / msg_ctl / msg_send / msg_recv.

use bitflags::bitflags;

use crate::task::Pid;

/// Идентификатор семафора / Semaphore identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SemId(pub u32);

impl SemId {
    pub const fn new(index: usize) -> Self { Self(index as u32) }
    pub const fn index(self) -> usize    { self.0 as usize }
}

/// Идентификатор очереди сообщений / Message queue identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct MsgqId(pub u32);

impl MsgqId {
    pub const fn new(index: usize) -> Self { Self(index as u32) }
    pub const fn index(self) -> usize    { self.0 as usize }
}

/// Ключ, выбранный вызывающим / Caller-chosen queue key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MsgKey(pub u32);

bitflags! {
    /// Флаги вызовов очереди сообщений / Message queue call flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MsgFlags: u32 {
        /// msg_get: создать, если нет / create when absent
        const CREATE    = 1 << 0;
        /// msg_get: вместе с CREATE: ошибка, если уже есть
        /// msg_get: with CREATE, fail when the key exists
        const EXCLUSIVE = 1 << 1;
        /// send/recv: не блокироваться / never block
        const NOWAIT    = 1 << 2;
        /// recv: разрешить усечение длинного сообщения
        /// recv: accept truncation of an oversized message
        const NOERROR   = 1 << 3;
    }
}

/// Статистика очереди / Queue statistics (STAT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MsgqStat {
    /// Сообщений в очереди / Messages currently queued
    pub qnum:      usize,
    /// Ёмкость в сообщениях, не в байтах / Capacity in messages, not bytes
    pub qcapacity: usize,
    /// Последний отправитель / Last sender
    pub lspid:     Option<Pid>,
    /// Последний получатель / Last receiver
    pub lrpid:     Option<Pid>,
}

/// Команда msg_ctl / msg_ctl command
pub enum MsgCtl<'a> {
    Stat(&'a mut MsgqStat),
    /// Принимается, но ничего не меняет / Accepted, changes nothing.
    Set(&'a MsgqStat),
    Remove,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine() {
        let f = MsgFlags::CREATE | MsgFlags::EXCLUSIVE;
        assert!(f.contains(MsgFlags::CREATE));
        assert!(!f.contains(MsgFlags::NOWAIT));
        assert_eq!(MsgFlags::default(), MsgFlags::empty());
    }
}
