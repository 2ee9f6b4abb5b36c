//! Kernel: все таблицы ядра в одной арене
//! Kernel: every kernel table in one arena
//!
//! Таблицы ссылаются друг на друга только индексами (Pid, SemId, MsgqId).
//! Tables refer to each other by index only (Pid, SemId, MsgqId).
//!
//! Жизненный цикл процесса / Process lifecycle:
//!   create, kill, exit, status, yield_now, set_priority, statistics

use alloc::boxed::Box;
use alloc::vec::Vec;
use log::debug;

use libferrux::{Pid, Priority, ProcessStat, ProcessState, ProcessStatus};

use crate::config::{Config, SchedPolicy};
use crate::ipc::msgq::MsgqTable;
use crate::ipc::sem::SemTable;
use crate::proc::{ContextSwitch, Process, ProcessTable};
use crate::queue::{Discipline, PidQueue, Queue};
use crate::sched::timer::TimerList;
use crate::sched::{wait_queue, Completion, WakeReason};
use crate::{Error, Result};

/// Снимок `statistics()` / Snapshot returned by `statistics()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelStats {
    /// Тиков с момента старта / Ticks since start
    pub total_ticks: u64,
    /// Записей в буфере вызывающего / Records written to the caller's buffer
    pub written:     usize,
    /// Живых процессов, включая idle / Live processes, idle included
    pub live:        usize,
    /// Последние диспетчеризации, старые первыми / Latest dispatches, oldest first
    pub history:     Vec<Pid>,
}

pub struct Kernel {
    pub(crate) config:       Config,
    pub(crate) procs:        ProcessTable,
    pub(crate) ready:        PidQueue,
    pub(crate) current:      Pid,
    pub(crate) need_resched: bool,
    pub(crate) timers:       TimerList,
    pub(crate) ticks:        u64,
    pub(crate) slice_left:   u32,
    pub(crate) history:      Queue<Pid>,
    pub(crate) sems:         SemTable,
    pub(crate) msgqs:        MsgqTable,
    pub(crate) switch:       Box<dyn ContextSwitch + Send>,
}

impl Kernel {
    /// Собрать таблицы и idle процесс в слоте 0.
    /// Build all tables plus the idle process in slot 0.
    pub fn new(config: Config, switch: Box<dyn ContextSwitch + Send>) -> Result<Self> {
        config.validate()?;
        let discipline = match config.policy {
            SchedPolicy::RoundRobin => Discipline::Fifo,
            SchedPolicy::Priority   => Discipline::Heap,
        };

        let mut procs = ProcessTable::new(config.max_procs);
        let idle = procs.alloc(Priority(config.lowest_priority()))?;
        procs.get_mut(idle)?.state = ProcessState::Running;

        debug!(
            "kernel: {:?} scheduling, {} process slots, {} semaphores, {} message queues",
            config.policy, config.max_procs, config.num_semaphores, config.num_msgqs,
        );
        Ok(Self {
            ready:        PidQueue::new(config.max_procs, discipline),
            sems:         SemTable::new(config.num_semaphores, config.sem_max_waiters, discipline),
            msgqs:        MsgqTable::new(config.num_msgqs, config.msgq_capacity),
            history:      Queue::with_capacity(config.history_len),
            timers:       TimerList::new(),
            current:      idle,
            need_resched: false,
            ticks:        0,
            slice_left:   config.timeslice_ticks,
            procs,
            switch,
            config,
        })
    }

    pub fn config(&self) -> &Config   { &self.config }
    pub fn current(&self) -> Pid      { self.current }
    pub fn ticks(&self) -> u64        { self.ticks }
    pub fn need_resched(&self) -> bool { self.need_resched }

    pub fn process(&self, pid: Pid) -> Result<&Process> {
        self.procs.get(pid)
    }

    fn check_priority(&self, priority: Priority) -> Result<()> {
        if priority.level() as usize >= self.config.priority_levels {
            return Err(Error::InvalidArg);
        }
        Ok(())
    }

    /// Создать процесс и поставить его в очередь готовых.
    /// Create a process and put it on the ready queue.
    pub fn create(&mut self, priority: Priority) -> Result<Pid> {
        self.check_priority(priority)?;
        let pid = self.procs.alloc(priority)?;
        if let Err(e) = self.ready.insert(pid, &self.procs) {
            self.procs.invalidate(pid);
            return Err(e);
        }
        if self.config.policy == SchedPolicy::Priority
            && priority < self.procs.priority_of(self.current)
        {
            self.need_resched = true;
        }
        debug!("proc: created {} at priority {}", pid, priority.level());
        Ok(pid)
    }

    /// Завершить текущий процесс / Terminate the current process.
    pub fn exit(&mut self) -> Result<()> {
        let pid = self.current;
        if pid == Pid::IDLE {
            return Err(Error::InvalidArg);
        }
        self.procs.invalidate(pid);
        debug!("proc: {} exited", pid);
        self.schedule();
        Ok(())
    }

    /// Убить процесс; для текущего это `exit`.
    /// Kill a process; for the current one this is `exit`.
    pub fn kill(&mut self, pid: Pid) -> Result<()> {
        if pid == Pid::IDLE {
            return Err(Error::InvalidArg);
        }
        let state = self.procs.get(pid)?.state;
        if pid == self.current {
            return self.exit();
        }

        match state {
            ProcessState::New | ProcessState::Ready => self.ready.remove(pid, &self.procs)?,
            ProcessState::Blocked | ProcessState::TimedBlocked => self.detach(pid)?,
            ProcessState::Running | ProcessState::Dead => {}
        }
        self.return_handed_permit(pid)?;
        self.procs.invalidate(pid);
        self.need_resched = true;
        debug!("proc: killed {} ({:?})", pid, state);
        Ok(())
    }

    /// Разбуженный, но ещё не запущенный процесс уже владеет разрешением
    /// семафора; при убийстве его надо вернуть.
    /// A woken process that has not run yet already owns a semaphore
    /// permit; killing it must give the permit back.
    fn return_handed_permit(&mut self, pid: Pid) -> Result<()> {
        let p = self.procs.get_mut(pid)?;
        if p.wake != Some(WakeReason::Posted) {
            return Ok(());
        }
        let Some(op) = p.pending.take() else { return Ok(()) };
        match self.permit_of(&op).map(|sem| self.sem_release(sem)) {
            // Семафор уже уничтожен / The semaphore is already gone
            Some(Err(Error::NotFound)) | None => Ok(()),
            Some(result) => result,
        }
    }

    pub fn status(&self, pid: Pid) -> Result<ProcessStatus> {
        self.procs.get(pid).map(Process::status)
    }

    /// Запросить перепланирование в ближайшей точке планирования.
    /// Request a reschedule at the next scheduling point.
    pub fn yield_now(&mut self) {
        self.need_resched = true;
    }

    pub fn priority(&self, pid: Pid) -> Result<Priority> {
        self.procs.get(pid).map(Process::priority)
    }

    /// Сменить приоритет; в куче процесс переставляется под новый ключ,
    /// в FIFO остаётся на своём месте.
    /// Change a priority. In a heap the process is requeued under the new
    /// key; in a FIFO it keeps its place.
    pub fn set_priority(&mut self, pid: Pid, priority: Priority) -> Result<()> {
        self.check_priority(priority)?;
        let p = self.procs.get(pid)?;
        let (state, at) = (p.state, p.wait_queue);

        let queue = if state.is_queued_ready() {
            Some(&mut self.ready)
        } else if let Some(at) = at {
            Some(wait_queue(&mut self.sems, at)?)
        } else {
            None
        };

        match queue {
            Some(queue) if queue.discipline() == Discipline::Heap => {
                queue.remove(pid, &self.procs)?;
                self.procs.get_mut(pid)?.priority = priority;
                queue.insert(pid, &self.procs)?;
            }
            _ => self.procs.get_mut(pid)?.priority = priority,
        }

        if self.config.policy == SchedPolicy::Priority {
            self.need_resched = true;
        }
        debug!("proc: {} priority -> {}", pid, priority.level());
        Ok(())
    }

    /// Забрать итог операции, на которой процесс засыпал.
    /// Take the outcome of the operation the process suspended in.
    pub fn take_result(&mut self, pid: Pid) -> Option<Result<Completion>> {
        self.procs.get_mut(pid).ok()?.result.take()
    }

    /// Учёт по процессам с усечением, общее время и история; история
    /// после чтения очищается.
    /// Per-process accounting (truncated to `out`), total ticks and the
    /// rescheduling history; reading the history clears it.
    pub fn statistics(&mut self, out: &mut [ProcessStat]) -> KernelStats {
        let mut written = 0;
        for (slot, p) in out.iter_mut().zip(self.procs.live()) {
            *slot = ProcessStat {
                pid:      p.pid(),
                state:    p.state(),
                priority: p.priority(),
                ticks:    p.ticks(),
            };
            written += 1;
        }
        KernelStats {
            total_ticks: self.ticks,
            written,
            live: self.procs.live_count(),
            history: self.history.drain().collect(),
        }
    }

    /// Инварианты очередей (для тестов и отладки).
    /// Queue invariants, for tests and debugging.
    pub fn queues_consistent(&self) -> bool {
        self.ready.is_consistent(&self.procs) && self.sems.all_consistent(&self.procs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::kernel;

    #[test]
    fn create_fails_when_table_is_full() {
        let cfg = Config { max_procs: 3, ..Config::default() };
        let (mut k, _) = crate::testing::kernel_with(cfg);
        k.create(Priority(1)).unwrap();
        k.create(Priority(1)).unwrap();
        assert_eq!(k.create(Priority(1)), Err(Error::NoSpace));
    }

    #[test]
    fn create_rejects_out_of_range_priority() {
        let (mut k, _) = kernel(SchedPolicy::Priority);
        assert_eq!(k.create(Priority(200)), Err(Error::InvalidArg));
    }

    #[test]
    fn kill_ready_process_removes_it_from_the_heap() {
        let (mut k, _) = kernel(SchedPolicy::Priority);
        let pids: Vec<_> = [4, 2, 6, 1, 3].iter().map(|&p| k.create(Priority(p)).unwrap()).collect();
        k.kill(pids[1]).unwrap();
        assert_eq!(k.status(pids[1]), Err(Error::NotFound));
        assert!(k.queues_consistent());
        assert_eq!(k.schedule(), pids[3]);
    }

    #[test]
    fn kill_current_is_exit() {
        let (mut k, _) = kernel(SchedPolicy::Priority);
        let a = k.create(Priority(1)).unwrap();
        let b = k.create(Priority(2)).unwrap();
        assert_eq!(k.schedule(), a);
        k.kill(a).unwrap();
        assert_eq!(k.current(), b);
        assert_eq!(k.kill(a), Err(Error::NotFound));
        assert_eq!(k.kill(Pid::IDLE), Err(Error::InvalidArg));
    }

    #[test]
    fn yield_only_flags_a_reschedule() {
        let (mut k, _) = kernel(SchedPolicy::RoundRobin);
        let a = k.create(Priority(0)).unwrap();
        let b = k.create(Priority(0)).unwrap();
        k.schedule();
        k.yield_now();
        assert_eq!(k.status(a).unwrap().state, ProcessState::Running);
        assert!(k.need_resched());
        assert_eq!(k.schedule(), b);
    }

    #[test]
    fn set_priority_reorders_the_ready_heap() {
        let (mut k, _) = kernel(SchedPolicy::Priority);
        let a = k.create(Priority(3)).unwrap();
        let b = k.create(Priority(4)).unwrap();
        k.set_priority(b, Priority(1)).unwrap();
        assert_eq!(k.priority(b), Ok(Priority(1)));
        assert!(k.queues_consistent());
        assert_eq!(k.schedule(), b);
        assert_eq!(k.status(a).unwrap().state, ProcessState::New);
    }

    #[test]
    fn set_priority_keeps_fifo_wait_order() {
        let (mut k, _) = kernel(SchedPolicy::RoundRobin);
        let s = k.sem_init(0).unwrap();
        let a = k.create(Priority(0)).unwrap();
        let b = k.create(Priority(0)).unwrap();
        k.schedule();
        assert_eq!(k.sem_wait(s), core::task::Poll::Pending);
        assert_eq!(k.current(), b);
        assert_eq!(k.sem_wait(s), core::task::Poll::Pending);

        k.set_priority(a, Priority(0)).unwrap();
        k.sem_post(s).unwrap();
        assert_eq!(k.status(a).unwrap().state, ProcessState::Ready);
        assert_eq!(k.status(b).unwrap().state, ProcessState::Blocked);
    }

    #[test]
    fn set_priority_keeps_fifo_ready_order() {
        let (mut k, _) = kernel(SchedPolicy::RoundRobin);
        let a = k.create(Priority(0)).unwrap();
        let b = k.create(Priority(0)).unwrap();
        k.set_priority(a, Priority(7)).unwrap();
        assert_eq!(k.priority(a), Ok(Priority(7)));
        assert_eq!(k.schedule(), a);
        assert_eq!(k.schedule(), b);
    }

    #[test]
    fn statistics_truncate_to_the_buffer() {
        let (mut k, _) = kernel(SchedPolicy::Priority);
        let a = k.create(Priority(1)).unwrap();
        k.create(Priority(2)).unwrap();
        k.schedule();
        k.tick();
        k.tick();
        let mut out = [ProcessStat::empty(); 2];
        let stats = k.statistics(&mut out);
        assert_eq!(stats.written, 2);
        assert_eq!(stats.live, 3);
        assert_eq!(stats.total_ticks, 2);
        assert_eq!(out[1].pid, a);
        assert_eq!(out[1].ticks, 2);
        assert_eq!(stats.history, vec![a]);
        assert!(k.statistics(&mut out).history.is_empty());
    }
}
