//! Сквозные сценарии ядра / End-to-end kernel scenarios

use std::task::Poll;

use ferrux_kernel::config::{Config, SchedPolicy};
use ferrux_kernel::proc::{ContextSwitch, SavedContext};
use ferrux_kernel::sched::Completion;
use ferrux_kernel::{
    Error, Kernel, MsgCtl, MsgFlags, MsgKey, MsgqStat, Pid, Priority, ProcessState,
};

struct NoSwitch;

impl ContextSwitch for NoSwitch {
    fn save(&mut self, _pid: Pid, _ctx: &mut SavedContext) {}
    fn restore(&mut self, _pid: Pid, _ctx: &SavedContext) {}
}

fn boot(config: Config) -> Kernel {
    Kernel::new(config, Box::new(NoSwitch)).unwrap()
}

/// Создать процесс и сразу его запустить / Create a process and dispatch it.
fn spawn_running(k: &mut Kernel, prio: u8) -> Pid {
    let pid = k.create(Priority(prio)).unwrap();
    assert_eq!(k.schedule(), pid);
    pid
}

#[test]
fn waiters_are_released_in_priority_order() {
    let mut k = boot(Config::default().with_policy(SchedPolicy::Priority));
    let sem = k.sem_init(0).unwrap();
    for _ in 0..3 {
        k.create(Priority(10)).unwrap();
    }
    k.schedule();

    // Блокируются в порядке 5, 1, 3 / Block in priority order 5, 1, 3.
    let mut blocked = Vec::new();
    for prio in [5, 1, 3] {
        let cur = k.current();
        k.set_priority(cur, Priority(prio)).unwrap();
        assert_eq!(k.sem_wait(sem), Poll::Pending);
        blocked.push(cur);
    }
    assert_eq!(k.current(), Pid::IDLE);

    let mut woken = Vec::new();
    for _ in 0..3 {
        k.sem_post(sem).unwrap();
        let next = k.schedule();
        assert_eq!(k.take_result(next), Some(Ok(Completion::Acquired)));
        woken.push(next);
        k.exit().unwrap();
    }
    assert_eq!(woken, vec![blocked[1], blocked[2], blocked[0]]);
}

#[test]
fn queue_capacity_round_trip() {
    let cfg = Config::default();
    let capacity = cfg.msgq_capacity;
    let mut k = boot(cfg);
    spawn_running(&mut k, 2);
    let id = k.msg_get(MsgKey(7), MsgFlags::CREATE).unwrap();

    for i in 0..capacity {
        assert_eq!(k.msg_send(id, &[i as u8], MsgFlags::NOWAIT), Poll::Ready(Ok(())));
    }
    assert_eq!(k.msg_send(id, b"x", MsgFlags::NOWAIT), Poll::Ready(Err(Error::NoSpace)));
    assert_eq!(k.msg_recv(id, 1, MsgFlags::NOWAIT), Poll::Ready(Ok(vec![0])));
    assert_eq!(k.msg_send(id, b"x", MsgFlags::NOWAIT), Poll::Ready(Ok(())));
}

#[test]
fn kill_leaves_a_fifo_wait_queue_intact() {
    let mut k = boot(Config::default().with_policy(SchedPolicy::RoundRobin));
    let sem = k.sem_init(0).unwrap();
    let a = spawn_running(&mut k, 0);
    assert_eq!(k.sem_wait(sem), Poll::Pending);
    let b = spawn_running(&mut k, 0);
    assert_eq!(k.sem_wait(sem), Poll::Pending);
    let c = spawn_running(&mut k, 0);
    assert_eq!(k.sem_wait(sem), Poll::Pending);

    k.kill(b).unwrap();
    assert_eq!(k.status(b), Err(Error::NotFound));

    k.sem_post(sem).unwrap();
    k.sem_post(sem).unwrap();
    assert_eq!(k.status(a).unwrap().state, ProcessState::Ready);
    assert_eq!(k.status(c).unwrap().state, ProcessState::Ready);
    assert_eq!(k.sem_value(sem), Ok(0));
    assert!(k.queues_consistent());
}

#[test]
fn kill_keeps_the_ready_heap_valid() {
    let mut k = boot(Config::default().with_policy(SchedPolicy::Priority));
    let prios = [9, 4, 7, 2, 8, 3, 6];
    let pids: Vec<Pid> = prios.iter().map(|&p| k.create(Priority(p)).unwrap()).collect();

    k.kill(pids[3]).unwrap();
    k.kill(pids[0]).unwrap();
    assert!(k.queues_consistent());

    let mut order = Vec::new();
    for _ in 0..pids.len() - 2 {
        order.push(k.schedule());
        k.exit().unwrap();
    }
    let got: Vec<u8> = order.iter().map(|&p| prios[pids.iter().position(|&q| q == p).unwrap()]).collect();
    assert_eq!(got, vec![3, 4, 6, 7, 8]);
}

#[test]
fn timed_sleeper_killed_before_expiry() {
    let mut k = boot(Config::default());
    let p = spawn_running(&mut k, 1);
    assert_eq!(k.sleep(5), Poll::Pending);
    k.kill(p).unwrap();
    for _ in 0..10 {
        assert_eq!(k.tick(), Pid::IDLE);
    }
    let q = k.create(Priority(1)).unwrap();
    assert_eq!(q, p);
    assert_eq!(k.tick(), q);
}

#[test]
fn hello_world_message_flow() {
    let cfg = Config { msgq_capacity: 2, ..Config::default() };
    let mut k = boot(cfg);
    let key = MsgKey(0x4b);
    let id = k.msg_get(key, MsgFlags::CREATE | MsgFlags::EXCLUSIVE).unwrap();
    let (send, recv) = {
        let q = k.msgq(id).unwrap();
        (q.send_permits(), q.recv_permits())
    };
    let me = spawn_running(&mut k, 1);

    assert_eq!(k.msg_send(id, b"hello", MsgFlags::empty()), Poll::Ready(Ok(())));
    assert_eq!((k.sem_value(recv), k.sem_value(send)), (Ok(1), Ok(1)));
    assert_eq!(k.msg_send(id, b"world", MsgFlags::empty()), Poll::Ready(Ok(())));
    assert_eq!(k.sem_value(send), Ok(0));
    assert_eq!(k.msg_send(id, b"!", MsgFlags::NOWAIT), Poll::Ready(Err(Error::NoSpace)));

    assert_eq!(k.msg_recv(id, 16, MsgFlags::empty()), Poll::Ready(Ok(b"hello".to_vec())));
    assert_eq!(k.sem_value(send), Ok(1));
    assert_eq!(k.msg_recv(id, 16, MsgFlags::empty()), Poll::Ready(Ok(b"world".to_vec())));

    let mut stat = MsgqStat::default();
    k.msg_ctl(id, MsgCtl::Stat(&mut stat)).unwrap();
    assert_eq!(stat, MsgqStat { qnum: 0, qcapacity: 2, lspid: Some(me), lrpid: Some(me) });

    // Получатель засыпает на пустой очереди / The receiver sleeps on the empty queue
    assert_eq!(k.msg_recv(id, 16, MsgFlags::empty()), Poll::Pending);
    assert_eq!(k.current(), Pid::IDLE);

    k.msg_ctl(id, MsgCtl::Remove).unwrap();
    assert_eq!(k.schedule(), me);
    assert_eq!(k.take_result(me), Some(Err(Error::Removed)));
    assert_eq!(k.msg_get(key, MsgFlags::empty()), Err(Error::NotFound));
    assert_eq!(k.sem_value(send), Err(Error::NotFound));
}
