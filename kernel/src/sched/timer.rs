//! Список таймаутов / Timed-wait list
//!
//! BTreeMap отсортирован по тику истечения; несколько процессов могут
//! делить один тик. Отмена ищет процесс по его сохранённому дедлайну.
//! The BTreeMap is ordered by expiry tick; several processes may share a
//! tick. Cancellation finds a process through its recorded deadline.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use log::trace;

use libferrux::Pid;

#[derive(Default)]
pub struct TimerList {
    deadlines: BTreeMap<u64, Vec<Pid>>,
}

impl TimerList {
    pub fn new() -> Self {
        Self { deadlines: BTreeMap::new() }
    }

    pub fn register(&mut self, pid: Pid, deadline: u64) {
        self.deadlines.entry(deadline).or_default().push(pid);
    }

    /// Снять таймаут (пробуждение или kill) / Drop a timeout (wake-up or kill).
    pub fn cancel(&mut self, pid: Pid, deadline: u64) {
        if let Some(pids) = self.deadlines.get_mut(&deadline) {
            pids.retain(|&p| p != pid);
            if pids.is_empty() {
                self.deadlines.remove(&deadline);
            }
        }
    }

    /// Collect every pid whose deadline is `<= now`, earliest first.
    pub fn collect_expired(&mut self, now: u64) -> Vec<Pid> {
        let later = self.deadlines.split_off(&now.saturating_add(1));
        let expired = core::mem::replace(&mut self.deadlines, later);
        let pids: Vec<Pid> = expired.into_values().flatten().collect();
        if !pids.is_empty() {
            trace!("timer: {} wait(s) expired at tick {}", pids.len(), now);
        }
        pids
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.deadlines.keys().next().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_in_deadline_order() {
        let mut t = TimerList::new();
        t.register(Pid(3), 20);
        t.register(Pid(1), 10);
        t.register(Pid(2), 10);
        assert_eq!(t.next_deadline(), Some(10));
        assert!(t.collect_expired(9).is_empty());
        assert_eq!(t.collect_expired(15), vec![Pid(1), Pid(2)]);
        assert_eq!(t.collect_expired(20), vec![Pid(3)]);
        assert_eq!(t.next_deadline(), None);
    }

    #[test]
    fn cancel_removes_only_that_pid() {
        let mut t = TimerList::new();
        t.register(Pid(1), 5);
        t.register(Pid(2), 5);
        t.cancel(Pid(1), 5);
        t.cancel(Pid(9), 5);
        assert_eq!(t.collect_expired(5), vec![Pid(2)]);
    }
}
