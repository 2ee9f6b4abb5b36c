//! Очереди процессов: FIFO (round-robin) или куча по приоритету.
//! Process queues: FIFO (round-robin) or a priority heap.

use libferrux::Pid;

use super::Queue;
use crate::proc::ProcessTable;
use crate::Result;

/// Дисциплина очереди / Queue discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    /// В порядке прибытия / Arrival order
    Fifo,
    /// Min-куча; ключ читается из таблицы процессов.
    /// Min-heap keyed by the live priority in the process table.
    Heap,
}

/// Очередь готовых или ожидающих процессов / Ready or wait queue of pids
pub struct PidQueue {
    inner:      Queue<Pid>,
    discipline: Discipline,
}

impl PidQueue {
    pub fn new(capacity: usize, discipline: Discipline) -> Self {
        Self { inner: Queue::with_capacity(capacity), discipline }
    }

    pub fn discipline(&self) -> Discipline { self.discipline }
    pub fn len(&self) -> usize             { self.inner.len() }
    pub fn is_empty(&self) -> bool         { self.inner.is_empty() }

    pub fn contains(&self, pid: Pid) -> bool {
        self.inner.position(|&p| p == pid).is_some()
    }

    pub fn insert(&mut self, pid: Pid, procs: &ProcessTable) -> Result<()> {
        match self.discipline {
            Discipline::Fifo => self.inner.enqueue(pid),
            Discipline::Heap => self.inner.heap_insert(pid, |&p| procs.priority_of(p)),
        }
    }

    /// Следующий по порядку: самый старый или самый приоритетный.
    /// Next in order: the oldest, or the highest-priority member.
    pub fn take(&mut self, procs: &ProcessTable) -> Option<Pid> {
        match self.discipline {
            Discipline::Fifo => self.inner.dequeue(),
            Discipline::Heap => self.inner.heap_extract_min(|&p| procs.priority_of(p)),
        }
    }

    /// Кто выйдет следующим, без извлечения / Who `take` would return.
    pub fn peek(&self) -> Option<Pid> {
        self.inner.peek().copied()
    }

    pub fn remove(&mut self, pid: Pid, procs: &ProcessTable) -> Result<()> {
        match self.discipline {
            Discipline::Fifo => self.inner.fifo_delete(|&p| p == pid),
            Discipline::Heap => self.inner.heap_delete(|&p| p == pid, |&p| procs.priority_of(p)),
        }
        .map(drop)
    }

    pub fn iter(&self) -> impl Iterator<Item = Pid> + '_ {
        self.inner.iter().copied()
    }

    /// Инвариант кучи для FIFO тривиально истинен.
    /// The heap invariant; trivially true for a FIFO.
    pub fn is_consistent(&self, procs: &ProcessTable) -> bool {
        match self.discipline {
            Discipline::Fifo => true,
            Discipline::Heap => self.inner.is_heap(&|&p: &Pid| procs.priority_of(p)),
        }
    }
}
