//! Сохранённый контекст и примитив переключения.
//! Saved context and the context-switch primitive.
//!
//! Само переключение регистров: внешний коллаборатор: ядро лишь
//! говорит, чей контекст сохранить и чей восстановить.
//! The register-level switch is an external collaborator: the kernel only
//! says whose context to save and whose to restore.

use libferrux::Pid;

/// Слов в блоке регистров / Words in the register block
pub const CONTEXT_WORDS: usize = 32;

/// Непрозрачный блок регистров, принадлежит дескриптору процесса.
/// Opaque register block, owned by the process descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct SavedContext {
    words: [usize; CONTEXT_WORDS],
}

impl SavedContext {
    pub const fn empty() -> Self {
        Self { words: [0; CONTEXT_WORDS] }
    }

    pub fn words(&self) -> &[usize; CONTEXT_WORDS]         { &self.words }
    pub fn words_mut(&mut self) -> &mut [usize; CONTEXT_WORDS] { &mut self.words }
}

impl Default for SavedContext {
    fn default() -> Self { Self::empty() }
}

/// Трейт для архитектурно-зависимого переключения контекста.
/// Trait for the arch-specific context switch.
pub trait ContextSwitch {
    /// Сохранить уходящий процесс / Capture the outgoing process.
    fn save(&mut self, pid: Pid, ctx: &mut SavedContext);
    /// Загрузить входящий процесс / Load the incoming process.
    fn restore(&mut self, pid: Pid, ctx: &SavedContext);
}
