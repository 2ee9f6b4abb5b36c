//! Process Descriptor Table
//!
//! Фиксированный массив дескрипторов; индекс слота = идентификатор процесса.
//! Fixed array of descriptors; the slot index is the process identifier.
//!
//! Слот 0 зарезервирован за idle/bootstrap процессом.
//! Slot 0 is reserved for the idle/bootstrap process.

pub mod context;

pub use context::{ContextSwitch, SavedContext};

use alloc::vec::Vec;

use libferrux::{Pid, Priority, ProcessState, ProcessStatus};

use crate::sched::{Completion, PendingOp, WaitQueueRef, WakeReason};
use crate::{Error, Result};

/// Ключ для свободных слотов: ниже любого реального приоритета.
/// Key used for unallocated slots: below any real priority.
pub const LOWEST_KEY: Priority = Priority(u8::MAX);

/// Дескриптор процесса / Process descriptor
pub struct Process {
    pid: Pid,
    pub(crate) allocated:  bool,
    pub(crate) state:      ProcessState,
    pub(crate) priority:   Priority,
    pub(crate) context:    SavedContext,
    /// Слабая ссылка на очередь ожидания: только индекс, не владение.
    /// Weak reference to the wait queue: a handle, never ownership.
    pub(crate) wait_queue: Option<WaitQueueRef>,
    /// Тик, на котором истекает ожидание / Tick at which a timed wait expires.
    pub(crate) deadline:   Option<u64>,
    /// Операция, на которой процесс заснул / Operation the process suspended in.
    pub(crate) pending:    Option<PendingOp>,
    pub(crate) wake:       Option<WakeReason>,
    pub(crate) result:     Option<Result<Completion>>,
    pub(crate) ticks:      u64,
}

impl Process {
    fn vacant(pid: Pid) -> Self {
        Self {
            pid,
            allocated:  false,
            state:      ProcessState::Dead,
            priority:   LOWEST_KEY,
            context:    SavedContext::empty(),
            wait_queue: None,
            deadline:   None,
            pending:    None,
            wake:       None,
            result:     None,
            ticks:      0,
        }
    }

    pub fn pid(&self) -> Pid                          { self.pid }
    pub fn state(&self) -> ProcessState               { self.state }
    pub fn priority(&self) -> Priority                { self.priority }
    pub fn ticks(&self) -> u64                        { self.ticks }
    pub fn wait_queue(&self) -> Option<WaitQueueRef>  { self.wait_queue }
    pub fn deadline(&self) -> Option<u64>             { self.deadline }
    pub fn context(&self) -> &SavedContext            { &self.context }

    pub fn status(&self) -> ProcessStatus {
        ProcessStatus { pid: self.pid, state: self.state, priority: self.priority }
    }
}

/// Таблица процессов / Process table
pub struct ProcessTable {
    slots: Vec<Process>,
}

impl ProcessTable {
    pub fn new(capacity: usize) -> Self {
        Self { slots: (0..capacity).map(|i| Process::vacant(Pid::new(i))).collect() }
    }

    pub fn capacity(&self) -> usize { self.slots.len() }

    /// Занять первый свободный слот / Claim the first free slot.
    ///
    /// Очередью готовых занимается планировщик, не таблица.
    /// The scheduler, not the table, puts the new pid on the ready queue.
    pub fn alloc(&mut self, priority: Priority) -> Result<Pid> {
        let slot = self.slots.iter_mut().find(|p| !p.allocated).ok_or(Error::NoSpace)?;
        let pid = slot.pid;
        *slot = Process::vacant(pid);
        slot.allocated = true;
        slot.state = ProcessState::New;
        slot.priority = priority;
        Ok(pid)
    }

    /// Пометить слот мёртвым и свободным. Из очередей не убирает,
    /// это делает вызывающий заранее.
    /// Mark the slot dead and free. Does not touch any queue: callers
    /// remove the pid first.
    pub fn invalidate(&mut self, pid: Pid) {
        if let Some(slot) = self.slots.get_mut(pid.index()) {
            slot.allocated = false;
            slot.state = ProcessState::Dead;
            slot.wait_queue = None;
            slot.deadline = None;
            // Конверт ждущего отправителя освобождается здесь
            // A waiting sender's envelope is freed here
            slot.pending = None;
            slot.wake = None;
            slot.result = None;
        }
    }

    pub fn get(&self, pid: Pid) -> Result<&Process> {
        self.slots.get(pid.index()).filter(|p| p.allocated).ok_or(Error::NotFound)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Result<&mut Process> {
        self.slots.get_mut(pid.index()).filter(|p| p.allocated).ok_or(Error::NotFound)
    }

    /// Живой ключ кучи / Live heap key.
    pub fn priority_of(&self, pid: Pid) -> Priority {
        self.get(pid).map_or(LOWEST_KEY, |p| p.priority)
    }

    pub fn live(&self) -> impl Iterator<Item = &Process> + '_ {
        self.slots.iter().filter(|p| p.allocated)
    }

    pub fn live_mut(&mut self) -> impl Iterator<Item = &mut Process> + '_ {
        self.slots.iter_mut().filter(|p| p.allocated)
    }

    pub fn live_count(&self) -> usize {
        self.live().count()
    }
}
