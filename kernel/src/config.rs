//! Конфигурация ядра / Kernel configuration
//!
//! Все таблицы фиксированного размера; размеры задаются здесь один раз
//! при создании ядра.
//! Every table is fixed-size; sizes are chosen here once, at kernel creation.

use crate::{Error, Result};

/// Процессов, включая idle / Process slots, idle included
pub const MAX_PROCS: usize = 16;
/// Уровней приоритета / Priority levels
pub const PRIORITY_LEVELS: usize = 32;
/// Тиков на квант round-robin / Ticks per round-robin slice
pub const TIMESLICE_TICKS: u32 = 10;
pub const NUM_SEMAPHORES: usize = 32;
/// Ожидающих на одном семафоре / Waiters per semaphore
pub const SEM_MAX_WAITERS: usize = MAX_PROCS;
pub const NUM_MSGQS: usize = 8;
/// Сообщений в одной очереди / Messages per queue
pub const MSGQ_CAPACITY: usize = 10;
/// Длина истории перепланирований / Rescheduling history length
pub const HISTORY_LEN: usize = 32;

/// Политика планирования / Scheduling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedPolicy {
    /// Один класс приоритета, FIFO, вытеснение по кванту.
    /// Single priority class, FIFO, preempted when the slice runs out.
    RoundRobin,
    /// Min-куча по приоритету, вытеснение при пробуждении более важного.
    /// Priority min-heap, preempted when a more important process wakes.
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub max_procs:       usize,
    pub priority_levels: usize,
    pub policy:          SchedPolicy,
    pub timeslice_ticks: u32,
    pub num_semaphores:  usize,
    pub sem_max_waiters: usize,
    pub num_msgqs:       usize,
    pub msgq_capacity:   usize,
    pub history_len:     usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_procs:       MAX_PROCS,
            priority_levels: PRIORITY_LEVELS,
            policy:          SchedPolicy::Priority,
            timeslice_ticks: TIMESLICE_TICKS,
            num_semaphores:  NUM_SEMAPHORES,
            sem_max_waiters: SEM_MAX_WAITERS,
            num_msgqs:       NUM_MSGQS,
            msgq_capacity:   MSGQ_CAPACITY,
            history_len:     HISTORY_LEN,
        }
    }
}

impl Config {
    pub fn with_policy(mut self, policy: SchedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let sizes = [
            self.priority_levels, self.num_semaphores, self.sem_max_waiters,
            self.msgq_capacity, self.history_len,
        ];
        if sizes.contains(&0) || self.timeslice_ticks == 0 {
            return Err(Error::InvalidArg);
        }
        // idle + хотя бы одна задача / idle plus at least one task
        if self.max_procs < 2 || self.priority_levels > 256 {
            return Err(Error::InvalidArg);
        }
        // Каждой очереди нужны два семафора / Each queue needs two semaphores
        if self.num_msgqs * 2 > self.num_semaphores {
            return Err(Error::InvalidArg);
        }
        Ok(())
    }

    /// Самый низкий допустимый приоритет / Lowest valid priority level.
    pub fn lowest_priority(&self) -> u8 {
        (self.priority_levels - 1) as u8
    }
}
