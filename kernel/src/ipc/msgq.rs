//! Очереди сообщений / Message queues
//!
//! Ограниченный буфер производитель/потребитель на двух семафорах:
//!   send_permits - свободные места, начально = ёмкость
//!   recv_permits - сообщения в очереди, начально = 0
//! Bounded producer/consumer buffer over two semaphores:
//!   send_permits - free slots, starts at capacity
//!   recv_permits - queued messages, starts at 0
//!
//! Доставка строго FIFO при любой политике планирования.
//! Delivery is strict FIFO under either scheduling policy.

use alloc::vec::Vec;
use core::task::Poll;
use log::{debug, trace};

use libferrux::{MsgCtl, MsgFlags, MsgKey, MsgqId, MsgqStat, Pid, SemId};

use crate::queue::Queue;
use crate::sched::{PendingOp, WaitQueueRef};
use crate::{Error, Kernel, Result};

/// Копия полезной нагрузки в куче / Heap copy of a payload
#[derive(Debug, PartialEq, Eq)]
pub struct Envelope {
    bytes: Vec<u8>,
}

impl Envelope {
    /// Отказ аллокатора даёт `NoMemory`, без паники.
    /// Allocator failure is `NoMemory`, never a panic.
    pub fn copy_from(payload: &[u8]) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(payload.len()).map_err(|_| Error::NoMemory)?;
        bytes.extend_from_slice(payload);
        Ok(Self { bytes })
    }

    pub fn len(&self) -> usize { self.bytes.len() }
    pub fn is_empty(&self) -> bool { self.bytes.is_empty() }
    pub fn into_bytes(self) -> Vec<u8> { self.bytes }
}

pub struct MessageQueue {
    key:          MsgKey,
    send_permits: SemId,
    recv_permits: SemId,
    envelopes:    Queue<Envelope>,
    lspid:        Option<Pid>,
    lrpid:        Option<Pid>,
}

impl MessageQueue {
    pub fn key(&self) -> MsgKey { self.key }
    pub fn len(&self) -> usize  { self.envelopes.len() }
    pub fn is_empty(&self) -> bool { self.envelopes.is_empty() }
    pub fn send_permits(&self) -> SemId { self.send_permits }
    pub fn recv_permits(&self) -> SemId { self.recv_permits }

    fn stat(&self) -> MsgqStat {
        MsgqStat {
            qnum:      self.envelopes.len(),
            qcapacity: self.envelopes.capacity(),
            lspid:     self.lspid,
            lrpid:     self.lrpid,
        }
    }
}

/// Таблица очередей сообщений / Message queue table
pub struct MsgqTable {
    slots:    Vec<Option<MessageQueue>>,
    capacity: usize,
}

impl MsgqTable {
    pub fn new(slots: usize, capacity: usize) -> Self {
        Self { slots: (0..slots).map(|_| None).collect(), capacity }
    }

    pub fn find(&self, key: MsgKey) -> Option<MsgqId> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|q| q.key == key))
            .map(MsgqId::new)
    }

    pub fn get(&self, id: MsgqId) -> Result<&MessageQueue> {
        self.slots.get(id.index()).and_then(Option::as_ref).ok_or(Error::NotFound)
    }

    pub fn get_mut(&mut self, id: MsgqId) -> Result<&mut MessageQueue> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut).ok_or(Error::NotFound)
    }

    fn take(&mut self, id: MsgqId) -> Result<MessageQueue> {
        self.slots.get_mut(id.index()).and_then(Option::take).ok_or(Error::NotFound)
    }

    fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    pub fn uses_sem(&self, sem: SemId) -> bool {
        self.slots.iter().flatten().any(|q| q.send_permits == sem || q.recv_permits == sem)
    }
}

impl Kernel {
    pub fn msgq(&self, id: MsgqId) -> Result<&MessageQueue> {
        self.msgqs.get(id)
    }

    /// Найти очередь по ключу или создать её.
    /// Look a queue up by key, or create it.
    pub fn msg_get(&mut self, key: MsgKey, flags: MsgFlags) -> Result<MsgqId> {
        if let Some(id) = self.msgqs.find(key) {
            if flags.contains(MsgFlags::CREATE | MsgFlags::EXCLUSIVE) {
                return Err(Error::AlreadyExists);
            }
            return Ok(id);
        }
        if !flags.contains(MsgFlags::CREATE) {
            return Err(Error::NotFound);
        }

        let index = self.msgqs.free_slot().ok_or(Error::NoSpace)?;
        let capacity = self.msgqs.capacity;
        let slots = u32::try_from(capacity).map_err(|_| Error::InvalidArg)?;

        let send_permits = self.sems.alloc(slots)?;
        let recv_permits = match self.sems.alloc(0) {
            Ok(id) => id,
            Err(e) => {
                self.sems.free(send_permits)?;
                return Err(e);
            }
        };

        self.msgqs.slots[index] = Some(MessageQueue {
            key,
            send_permits,
            recv_permits,
            envelopes: Queue::with_capacity(capacity),
            lspid: None,
            lrpid: None,
        });
        let id = MsgqId::new(index);
        debug!("msgq: {:?} created for key {:#x}, capacity {}", id, key.0, capacity);
        Ok(id)
    }

    pub fn msg_ctl(&mut self, id: MsgqId, cmd: MsgCtl<'_>) -> Result<()> {
        match cmd {
            MsgCtl::Stat(out) => {
                *out = self.msgqs.get(id)?.stat();
                Ok(())
            }
            MsgCtl::Set(_) => self.msgqs.get(id).map(drop),
            MsgCtl::Remove => self.msg_remove(id),
        }
    }

    fn msg_remove(&mut self, id: MsgqId) -> Result<()> {
        let mut queue = self.msgqs.take(id)?;
        let woken = self.sem_release_all(queue.send_permits)?
            + self.sem_release_all(queue.recv_permits)?
            + self.revoke_handed(|op| matches!(
                op,
                PendingOp::MsgSend { msgq, .. } | PendingOp::MsgRecv { msgq, .. } if *msgq == id
            ));
        self.sems.free(queue.send_permits)?;
        self.sems.free(queue.recv_permits)?;
        let dropped = queue.envelopes.drain().count();
        debug!("msgq: {:?} removed, {} waiter(s) released, {} message(s) dropped", id, woken, dropped);
        Ok(())
    }

    /// Отправить копию `payload`; блокируется, пока очередь полна.
    /// Send a copy of `payload`; blocks while the queue is full.
    pub fn msg_send(&mut self, id: MsgqId, payload: &[u8], flags: MsgFlags) -> Poll<Result<()>> {
        let permit = self.msgqs.get(id)?.send_permits;
        let envelope = Envelope::copy_from(payload)?;

        if self.sem_try_acquire(permit)? {
            return Poll::Ready(self.msg_commit_send(id, envelope));
        }
        if flags.contains(MsgFlags::NOWAIT) {
            return Poll::Ready(Err(Error::NoSpace));
        }
        self.block(
            Some(WaitQueueRef::Semaphore(permit)),
            None,
            PendingOp::MsgSend { msgq: id, envelope },
        )?;
        Poll::Pending
    }

    /// Принять самое старое сообщение не длиннее `limit` байт.
    /// Receive the oldest message, at most `limit` bytes long.
    pub fn msg_recv(&mut self, id: MsgqId, limit: usize, flags: MsgFlags) -> Poll<Result<Vec<u8>>> {
        let permit = self.msgqs.get(id)?.recv_permits;
        let truncate = flags.contains(MsgFlags::NOERROR);

        if self.sem_try_acquire(permit)? {
            return Poll::Ready(self.msg_commit_recv(id, limit, truncate));
        }
        if flags.contains(MsgFlags::NOWAIT) {
            return Poll::Ready(Err(Error::NoMessage));
        }
        self.block(
            Some(WaitQueueRef::Semaphore(permit)),
            None,
            PendingOp::MsgRecv { msgq: id, limit, truncate },
        )?;
        Poll::Pending
    }

    /// Разрешение send_permits уже взято / A send permit is already held.
    pub(crate) fn msg_commit_send(&mut self, id: MsgqId, envelope: Envelope) -> Result<()> {
        let sender = self.current;
        // Очередь удалили, пока мы ждали / Removed while we waited
        let queue = self.msgqs.get_mut(id).map_err(|_| Error::Removed)?;
        let len = envelope.len();
        queue.envelopes.enqueue(envelope)?;
        queue.lspid = Some(sender);
        let wake = queue.recv_permits;
        trace!("msgq: {} sent {} byte(s) to {:?}", sender, len, id);
        self.sem_release(wake)
    }

    /// Разрешение recv_permits уже взято / A receive permit is already held.
    pub(crate) fn msg_commit_recv(&mut self, id: MsgqId, limit: usize, truncate: bool) -> Result<Vec<u8>> {
        let receiver = self.current;
        let queue = self.msgqs.get_mut(id).map_err(|_| Error::Removed)?;

        let oversized = queue.envelopes.peek().is_some_and(|e| e.len() > limit);
        if oversized && !truncate {
            // Сообщение остаётся в очереди, разрешение возвращается
            // The message stays queued and the permit goes back
            let permit = queue.recv_permits;
            self.sem_release(permit)?;
            return Err(Error::TooBig);
        }

        let envelope = queue.envelopes.dequeue().ok_or(Error::NoMessage)?;
        queue.lrpid = Some(receiver);
        let wake = queue.send_permits;

        let mut bytes = envelope.into_bytes();
        bytes.truncate(limit);
        trace!("msgq: {} received {} byte(s) from {:?}", receiver, bytes.len(), id);
        self.sem_release(wake)?;
        Ok(bytes)
    }

    /// Семафор, разрешение которого держит приостановленная операция.
    /// The semaphore whose permit a suspended operation holds.
    pub(crate) fn permit_of(&self, op: &PendingOp) -> Option<SemId> {
        match *op {
            PendingOp::SemWait { sem } => Some(sem),
            PendingOp::Sleep => None,
            PendingOp::MsgSend { msgq, .. } => self.msgqs.get(msgq).ok().map(|q| q.send_permits),
            PendingOp::MsgRecv { msgq, .. } => self.msgqs.get(msgq).ok().map(|q| q.recv_permits),
        }
    }
}
