//! IPC: семафоры и очереди сообщений
//! IPC: semaphores and message queues
//!
//! Основные примитивы / Core primitives:
//!   Semaphore    - счётчик + очередь ожидания / count plus wait queue
//!   MessageQueue - ограниченный буфер на двух семафорах
//!                  bounded buffer over two semaphores
//!
//! Всё ожидание сводится к `block`/`unblock` планировщика.
//! Every wait bottoms out in the scheduler's `block`/`unblock`.

pub mod msgq;
pub mod sem;

pub use msgq::{Envelope, MessageQueue, MsgqTable};
pub use sem::{SemTable, Semaphore};
