//! Тестовые помощники / Test helpers

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use libferrux::Pid;

use crate::config::{Config, SchedPolicy};
use crate::proc::{ContextSwitch, SavedContext};
use crate::Kernel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    Save(Pid),
    Restore(Pid),
}

/// Записывает каждое переключение контекста / Records every context switch.
#[derive(Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<Switch>>>,
}

impl Recorder {
    pub fn saves(&self) -> Vec<Pid> {
        self.log.lock().iter().filter_map(|s| match *s {
            Switch::Save(p) => Some(p),
            Switch::Restore(_) => None,
        }).collect()
    }

    pub fn restores(&self) -> Vec<Pid> {
        self.log.lock().iter().filter_map(|s| match *s {
            Switch::Restore(p) => Some(p),
            Switch::Save(_) => None,
        }).collect()
    }
}

impl ContextSwitch for Recorder {
    fn save(&mut self, pid: Pid, ctx: &mut SavedContext) {
        ctx.words_mut()[0] = pid.index();
        self.log.lock().push(Switch::Save(pid));
    }

    fn restore(&mut self, pid: Pid, _ctx: &SavedContext) {
        self.log.lock().push(Switch::Restore(pid));
    }
}

pub fn kernel_with(config: Config) -> (Kernel, Recorder) {
    let rec = Recorder::default();
    let k = Kernel::new(config, Box::new(rec.clone())).unwrap();
    (k, rec)
}

pub fn kernel(policy: SchedPolicy) -> (Kernel, Recorder) {
    kernel_with(Config::default().with_policy(policy))
}
