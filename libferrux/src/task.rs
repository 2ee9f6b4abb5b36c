//! Task ABI: процессы и планирование
//!
//! Идентификатор процесса совпадает с индексом слота в таблице ядра.
//! A process identifier is the index of its slot in the kernel table.

use core::fmt;

/// Идентификатор процесса / Process identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Pid(pub u32);

impl Pid {
    /// Зарезервированный слот idle/bootstrap / Reserved idle/bootstrap slot.
    pub const IDLE: Pid = Pid(0);

    pub const fn new(index: usize) -> Self { Self(index as u32) }
    pub const fn index(self) -> usize    { self.0 as usize }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid{}", self.0)
    }
}

/// Приоритет: 0: наивысший / Priority: 0 is the highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Priority(pub u8);

impl Priority {
    pub const HIGHEST: Priority = Priority(0);

    pub const fn new(level: u8) -> Self { Self(level) }
    pub const fn level(self) -> u8     { self.0 }
}

/// Состояние процесса / Process lifecycle state
///
///   NEW → READY → RUNNING → {BLOCKED, TIMED_BLOCKED} → READY → … → DEAD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    New,
    Ready,
    Running,
    /// Ждёт в очереди ожидания / Waiting on a wait queue.
    Blocked,
    /// Ждёт с таймаутом / Waiting with a pending timeout.
    TimedBlocked,
    /// Терминальное; слот можно переиспользовать / Terminal; the slot is reusable.
    Dead,
}

impl ProcessState {
    /// Процесс стоит в очереди готовых / The process sits on the ready queue.
    pub const fn is_queued_ready(self) -> bool {
        matches!(self, ProcessState::New | ProcessState::Ready)
    }

    pub const fn is_blocked(self) -> bool {
        matches!(self, ProcessState::Blocked | ProcessState::TimedBlocked)
    }
}

/// Ответ на `status(pid)` / Reply to `status(pid)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStatus {
    pub pid:      Pid,
    pub state:    ProcessState,
    pub priority: Priority,
}

/// Учёт одного процесса в `statistics()` / Per-process accounting record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStat {
    pub pid:      Pid,
    pub state:    ProcessState,
    pub priority: Priority,
    /// Тики на процессоре / Ticks spent running.
    pub ticks:    u64,
}

impl ProcessStat {
    pub const fn empty() -> Self {
        Self { pid: Pid::IDLE, state: ProcessState::Dead, priority: Priority::HIGHEST, ticks: 0 }
    }
}
