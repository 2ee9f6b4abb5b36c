//! Scheduler Core: выбор следующего процесса, блокировка и пробуждение
//! Scheduler Core: next-process selection, block and unblock
//!
//! Режимы / Modes:
//!   RoundRobin - очередь готовых FIFO, вытеснение по истечении кванта
//!                FIFO ready queue, preemption when the slice runs out
//!   Priority   - min-куча по приоритету, пробуждение более важного
//!                процесса сразу требует перепланирования
//!                priority min-heap; waking a more important process
//!                requests a reschedule at once
//!
//! Одноядерная модель: весь код ядра исполняется в критической секции
//! (прерывания замаскированы), внутренних блокировок нет.
//! Single-core model: all kernel code runs inside the critical section
//! (interrupts masked); there are no internal locks.
//!
//! Засыпает только `block`. Операция, на которой процесс заснул, хранится
//! в дескрипторе и доделывается, когда процесс снова получает процессор.
//! Only `block` suspends. The operation a process suspended in is parked
//! in its descriptor and finished when the process is dispatched again.

pub mod timer;

use alloc::vec::Vec;
use core::task::Poll;
use log::{debug, trace, warn};

use libferrux::{MsgqId, Pid, ProcessState, SemId};

use crate::config::SchedPolicy;
use crate::ipc::msgq::Envelope;
use crate::ipc::sem::SemTable;
use crate::queue::PidQueue;
use crate::{Error, Kernel, Result};

/// Слабая ссылка на очередь ожидания / Weak handle to a wait queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitQueueRef {
    Semaphore(SemId),
}

/// Почему процесс разбудили / Why a process was woken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// Получил разрешение семафора (передано напрямую).
    /// Received a semaphore permit, handed over directly.
    Posted,
    TimedOut,
    /// Объект ожидания уничтожен / The object waited on was destroyed.
    Removed,
}

/// Операция, на которой процесс заснул / Operation a process suspended in
pub enum PendingOp {
    SemWait { sem: SemId },
    Sleep,
    MsgSend { msgq: MsgqId, envelope: Envelope },
    MsgRecv { msgq: MsgqId, limit: usize, truncate: bool },
}

/// Итог доделанной операции / Outcome of a finished suspended operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Acquired,
    Slept,
    Sent,
    Received(Vec<u8>),
}

/// Очередь ожидания по ссылке / Resolve a wait-queue handle.
pub(crate) fn wait_queue(sems: &mut SemTable, at: WaitQueueRef) -> Result<&mut PidQueue> {
    match at {
        WaitQueueRef::Semaphore(id) => sems.waiters_mut(id),
    }
}

impl Kernel {
    /// Точка планирования / Scheduling point.
    ///
    /// Ещё работающий текущий процесс возвращается в очередь готовых,
    /// затем выбирается следующий (idle, если очередь пуста).
    /// A still-running current process goes back on the ready queue, then
    /// the next one is picked (idle when the queue is empty).
    pub fn schedule(&mut self) -> Pid {
        self.need_resched = false;
        let prev = self.current;

        let prev_running = self.procs.get(prev).is_ok_and(|p| p.state == ProcessState::Running);
        if prev_running {
            if let Ok(p) = self.procs.get_mut(prev) {
                p.state = ProcessState::Ready;
            }
            if prev != Pid::IDLE {
                if let Err(e) = self.ready.insert(prev, &self.procs) {
                    warn!("sched: cannot requeue {}: {}", prev, e);
                }
            }
        }

        let next = self.ready.take(&self.procs).unwrap_or(Pid::IDLE);
        if next != prev {
            if let Ok(p) = self.procs.get_mut(prev) {
                self.switch.save(prev, &mut p.context);
            }
        }
        if let Ok(p) = self.procs.get_mut(next) {
            p.state = ProcessState::Running;
            if next != prev {
                self.switch.restore(next, &p.context);
            }
        }

        self.current = next;
        self.slice_left = self.config.timeslice_ticks;
        if self.history.is_full() {
            self.history.dequeue();
        }
        self.history.enqueue(next).ok();
        trace!("sched: {} -> {}", prev, next);

        self.resume(next);
        next
    }

    /// Заблокировать текущий процесс и отдать процессор.
    /// Block the current process and give up the processor.
    ///
    /// `timeout` в тиках делает ожидание TIMED_BLOCKED; без очереди это sleep.
    /// A `timeout` in ticks makes the wait TIMED_BLOCKED; with no queue it is a sleep.
    pub(crate) fn block(
        &mut self,
        on: Option<WaitQueueRef>,
        timeout: Option<u64>,
        op: PendingOp,
    ) -> Result<()> {
        let pid = self.current;
        if pid == Pid::IDLE {
            return Err(Error::InvalidArg);
        }
        if let Some(at) = on {
            wait_queue(&mut self.sems, at)?.insert(pid, &self.procs)?;
        }
        let deadline = timeout.map(|t| self.ticks.saturating_add(t));

        let p = self.procs.get_mut(pid)?;
        p.state = if deadline.is_some() { ProcessState::TimedBlocked } else { ProcessState::Blocked };
        p.wait_queue = on;
        p.deadline = deadline;
        p.pending = Some(op);
        p.wake = None;
        p.result = None;
        if let Some(d) = deadline {
            self.timers.register(pid, d);
        }

        debug!("sched: {} blocked on {:?} (deadline {:?})", pid, on, deadline);
        self.schedule();
        Ok(())
    }

    /// Разбудить одного ожидающего: старейшего или самого приоритетного.
    /// Wake one waiter: the oldest, or the highest-priority one.
    pub(crate) fn unblock(&mut self, at: WaitQueueRef, reason: WakeReason) -> Result<Option<Pid>> {
        let Some(pid) = wait_queue(&mut self.sems, at)?.take(&self.procs) else {
            return Ok(None);
        };
        self.make_ready(pid, reason)?;
        Ok(Some(pid))
    }

    /// Перевести уже снятый с очереди процесс в READY.
    /// Move a process that has left its wait queue to READY.
    fn make_ready(&mut self, pid: Pid, reason: WakeReason) -> Result<()> {
        let p = self.procs.get_mut(pid)?;
        if let Some(d) = p.deadline.take() {
            self.timers.cancel(pid, d);
        }
        p.wait_queue = None;
        p.state = ProcessState::Ready;
        p.wake = Some(reason);
        self.ready.insert(pid, &self.procs)?;

        // В round-robin не обрезаем квант текущего процесса
        // Round-robin leaves the current slice intact
        if self.config.policy == SchedPolicy::Priority {
            self.need_resched = true;
        }
        trace!("sched: {} ready ({:?})", pid, reason);
        Ok(())
    }

    /// Снять заблокированный процесс с очереди ожидания и отменить таймаут.
    /// Detach a blocked process from its wait queue and cancel its timeout.
    pub(crate) fn detach(&mut self, pid: Pid) -> Result<()> {
        let p = self.procs.get_mut(pid)?;
        let (at, deadline) = (p.wait_queue.take(), p.deadline.take());
        if let Some(d) = deadline {
            self.timers.cancel(pid, d);
        }
        if let Some(at) = at {
            wait_queue(&mut self.sems, at)?.remove(pid, &self.procs)?;
        }
        Ok(())
    }

    /// Прерывание таймера / Timer interrupt entry.
    ///
    /// Возвращает процесс, который работает после тика.
    /// Returns the process running after the tick.
    pub fn tick(&mut self) -> Pid {
        self.ticks += 1;
        if let Ok(p) = self.procs.get_mut(self.current) {
            p.ticks += 1;
        }

        let expired = match self.timers.next_deadline() {
            Some(d) if d <= self.ticks => self.timers.collect_expired(self.ticks),
            _ => Vec::new(),
        };
        for pid in expired {
            let Ok(p) = self.procs.get_mut(pid) else { continue };
            // Запись в списке таймеров уже удалена / Already off the timer list
            p.deadline = None;
            if p.state != ProcessState::TimedBlocked {
                continue;
            }
            if let Err(e) = self.detach(pid).and_then(|()| self.make_ready(pid, WakeReason::TimedOut)) {
                warn!("sched: timeout of {} failed: {}", pid, e);
            }
        }

        if self.current == Pid::IDLE {
            if !self.ready.is_empty() {
                self.need_resched = true;
            }
        } else if self.config.policy == SchedPolicy::RoundRobin {
            self.slice_left = self.slice_left.saturating_sub(1);
            if self.slice_left == 0 {
                self.need_resched = true;
            }
        }

        if self.need_resched {
            self.schedule()
        } else {
            self.current
        }
    }

    /// Заснуть на `ticks` тиков; 0 просто уступает процессор.
    /// Sleep for `ticks` ticks; 0 just yields.
    pub fn sleep(&mut self, ticks: u64) -> Poll<Result<()>> {
        if ticks == 0 {
            self.yield_now();
            return Poll::Ready(Ok(()));
        }
        self.block(None, Some(ticks), PendingOp::Sleep)?;
        Poll::Pending
    }

    /// Доделать операцию, на которой `pid` заснул; он уже RUNNING.
    /// Finish the operation `pid` suspended in; it is RUNNING now.
    fn resume(&mut self, pid: Pid) {
        let Ok(p) = self.procs.get_mut(pid) else { return };
        let Some(op) = p.pending.take() else { return };
        let reason = p.wake.take().unwrap_or(WakeReason::Posted);

        let outcome = match (op, reason) {
            (PendingOp::Sleep, _) => Ok(Completion::Slept),
            (_, WakeReason::Removed) => Err(Error::Removed),
            (_, WakeReason::TimedOut) => Err(Error::TimedOut),
            (PendingOp::SemWait { .. }, WakeReason::Posted) => Ok(Completion::Acquired),
            (PendingOp::MsgSend { msgq, envelope }, WakeReason::Posted) => {
                self.msg_commit_send(msgq, envelope).map(|()| Completion::Sent)
            }
            (PendingOp::MsgRecv { msgq, limit, truncate }, WakeReason::Posted) => {
                self.msg_commit_recv(msgq, limit, truncate).map(Completion::Received)
            }
        };

        debug!("sched: {} resumed with {:?}", pid, outcome);
        if let Ok(p) = self.procs.get_mut(pid) {
            p.result = Some(outcome);
        }
    }
}
