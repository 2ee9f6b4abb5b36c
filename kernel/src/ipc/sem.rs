//! Счётные семафоры / Counting semaphores
//!
//! Каждый семафор: счётчик и очередь ожидания с дисциплиной планировщика.
//! `post` передаёт разрешение ожидающему напрямую, не трогая счётчик:
//! проснувшийся процесс уже владеет разрешением.
//! Each semaphore is a count plus a wait queue using the scheduler's
//! discipline. `post` hands the permit straight to a waiter without
//! touching the count: the woken process already owns the permit.

use alloc::vec::Vec;
use core::task::Poll;
use log::{debug, trace};

use libferrux::SemId;

use crate::proc::ProcessTable;
use crate::queue::{Discipline, PidQueue};
use crate::sched::{PendingOp, WaitQueueRef, WakeReason};
use crate::{Error, Kernel, Result};

pub struct Semaphore {
    count:   u32,
    waiters: PidQueue,
}

impl Semaphore {
    pub fn count(&self) -> u32      { self.count }
    pub fn waiters(&self) -> usize  { self.waiters.len() }
}

/// Таблица семафоров / Semaphore table
pub struct SemTable {
    slots:       Vec<Option<Semaphore>>,
    max_waiters: usize,
    discipline:  Discipline,
}

impl SemTable {
    pub fn new(capacity: usize, max_waiters: usize, discipline: Discipline) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            max_waiters,
            discipline,
        }
    }

    pub fn alloc(&mut self, value: u32) -> Result<SemId> {
        let index = self.slots.iter().position(Option::is_none).ok_or(Error::NoSpace)?;
        self.slots[index] = Some(Semaphore {
            count:   value,
            waiters: PidQueue::new(self.max_waiters, self.discipline),
        });
        Ok(SemId::new(index))
    }

    /// Освободить слот; ожидающих должен разбудить вызывающий.
    /// Free the slot; the caller must have released every waiter.
    pub fn free(&mut self, id: SemId) -> Result<Semaphore> {
        self.slots.get_mut(id.index()).and_then(Option::take).ok_or(Error::NotFound)
    }

    pub fn get(&self, id: SemId) -> Result<&Semaphore> {
        self.slots.get(id.index()).and_then(Option::as_ref).ok_or(Error::NotFound)
    }

    pub fn get_mut(&mut self, id: SemId) -> Result<&mut Semaphore> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut).ok_or(Error::NotFound)
    }

    pub fn waiters_mut(&mut self, id: SemId) -> Result<&mut PidQueue> {
        self.get_mut(id).map(|s| &mut s.waiters)
    }

    pub fn in_use(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn all_consistent(&self, procs: &ProcessTable) -> bool {
        self.slots.iter().flatten().all(|s| s.waiters.is_consistent(procs))
    }
}

impl Kernel {
    pub fn sem_init(&mut self, value: u32) -> Result<SemId> {
        let id = self.sems.alloc(value)?;
        debug!("sem: {:?} created with {}", id, value);
        Ok(id)
    }

    pub fn sem_value(&self, id: SemId) -> Result<u32> {
        self.sems.get(id).map(Semaphore::count)
    }

    /// Взять разрешение без ожидания / Take a permit without waiting.
    pub(crate) fn sem_try_acquire(&mut self, id: SemId) -> Result<bool> {
        let sem = self.sems.get_mut(id)?;
        if sem.count == 0 {
            return Ok(false);
        }
        sem.count -= 1;
        Ok(true)
    }

    pub fn sem_try_wait(&mut self, id: SemId) -> Result<()> {
        if self.sem_try_acquire(id)? { Ok(()) } else { Err(Error::Busy) }
    }

    pub fn sem_wait(&mut self, id: SemId) -> Poll<Result<()>> {
        if self.sem_try_acquire(id)? {
            return Poll::Ready(Ok(()));
        }
        self.block(Some(WaitQueueRef::Semaphore(id)), None, PendingOp::SemWait { sem: id })?;
        Poll::Pending
    }

    /// Ожидание с таймаутом; `ticks == 0`: только попытка.
    /// Wait with a timeout; `ticks == 0` only tries.
    pub fn sem_timed_wait(&mut self, id: SemId, ticks: u64) -> Poll<Result<()>> {
        if self.sem_try_acquire(id)? {
            return Poll::Ready(Ok(()));
        }
        if ticks == 0 {
            return Poll::Ready(Err(Error::TimedOut));
        }
        self.block(Some(WaitQueueRef::Semaphore(id)), Some(ticks), PendingOp::SemWait { sem: id })?;
        Poll::Pending
    }

    pub fn sem_post(&mut self, id: SemId) -> Result<()> {
        self.sem_release(id)
    }

    pub(crate) fn sem_release(&mut self, id: SemId) -> Result<()> {
        if let Some(pid) = self.unblock(WaitQueueRef::Semaphore(id), WakeReason::Posted)? {
            trace!("sem: {:?} handed to {}", id, pid);
            return Ok(());
        }
        let sem = self.sems.get_mut(id)?;
        sem.count = sem.count.checked_add(1).ok_or(Error::NoSpace)?;
        Ok(())
    }

    /// Разбудить всех ожидающих с `Removed` / Wake every waiter with `Removed`.
    pub(crate) fn sem_release_all(&mut self, id: SemId) -> Result<usize> {
        let mut woken = 0;
        while self.unblock(WaitQueueRef::Semaphore(id), WakeReason::Removed)?.is_some() {
            woken += 1;
        }
        Ok(woken)
    }

    /// Разбуженные, но ещё не запущенные владельцы разрешения получают
    /// `Removed`: слот объекта может быть сразу переиспользован.
    /// Woken permit holders that have not run yet get `Removed` instead,
    /// since the object's slot may be reused right away.
    pub(crate) fn revoke_handed(&mut self, owns: impl Fn(&PendingOp) -> bool) -> usize {
        let mut revoked = 0;
        for p in self.procs.live_mut() {
            if p.wake == Some(WakeReason::Posted) && p.pending.as_ref().is_some_and(&owns) {
                p.wake = Some(WakeReason::Removed);
                revoked += 1;
            }
        }
        revoked
    }

    /// Семафоры очередей сообщений уничтожаются только через `msg_ctl`.
    /// Message-queue semaphores are destroyed only through `msg_ctl`.
    pub fn sem_destroy(&mut self, id: SemId) -> Result<()> {
        self.sems.get(id)?;
        if self.msgqs.uses_sem(id) {
            return Err(Error::Busy);
        }
        let woken = self.sem_release_all(id)?
            + self.revoke_handed(|op| matches!(op, PendingOp::SemWait { sem } if *sem == id));
        self.sems.free(id)?;
        debug!("sem: {:?} destroyed, {} waiter(s) released", id, woken);
        Ok(())
    }
}
