//! Глобальный экземпляр ядра / Global kernel instance

use ferrux_kernel::config::Config;
use ferrux_kernel::proc::{ContextSwitch, SavedContext};
use ferrux_kernel::{Error, Pid, Priority};

struct NoSwitch;

impl ContextSwitch for NoSwitch {
    fn save(&mut self, _pid: Pid, _ctx: &mut SavedContext) {}
    fn restore(&mut self, _pid: Pid, _ctx: &SavedContext) {}
}

#[test]
fn install_once_then_use() {
    assert_eq!(ferrux_kernel::with_kernel(|k| k.current()), Err(Error::NotFound));

    ferrux_kernel::init(Config::default(), Box::new(NoSwitch)).unwrap();
    assert_eq!(
        ferrux_kernel::init(Config::default(), Box::new(NoSwitch)),
        Err(Error::Busy)
    );

    let pid = ferrux_kernel::with_kernel(|k| k.create(Priority(3))).unwrap().unwrap();
    let running = ferrux_kernel::with_kernel(|k| k.tick()).unwrap();
    assert_eq!(running, pid);
}
