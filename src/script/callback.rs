use std::cell::RefCell;
use std::rc::Rc;

use crate::hooks::HookPayload;
use crate::script::thread::ScriptThread;

/// Opaque handle to a registered script callback. Handles are what hook
/// registrations and keymap bindings carry across the bridge; the callable
/// side never leaves the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u32);

impl CallbackId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

/// Spawns a fresh resumable thread for one invocation of the callback,
/// optionally seeded with the hook event that triggered it.
pub type SpawnFn = dyn Fn(Option<HookPayload>) -> Box<dyn ScriptThread>;

/// Script-side table of callback factories. Shared between the script
/// packages that register callbacks and the scheduler that spawns them.
#[derive(Default)]
pub struct CallbackRegistry {
    factories: Vec<Rc<SpawnFn>>,
}

pub type SharedCallbacks = Rc<RefCell<CallbackRegistry>>;

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    pub fn shared() -> SharedCallbacks {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn register(
        &mut self,
        factory: impl Fn(Option<HookPayload>) -> Box<dyn ScriptThread> + 'static,
    ) -> CallbackId {
        let id = CallbackId(self.factories.len() as u32);
        self.factories.push(Rc::new(factory));
        id
    }

    pub fn spawn(&self, id: CallbackId, payload: Option<HookPayload>) -> Option<Box<dyn ScriptThread>> {
        self.factories
            .get(id.0 as usize)
            .map(|factory| factory(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::CallbackRegistry;
    use crate::script::thread::{Resume, Routine, Step};

    #[test]
    fn spawn_should_create_a_fresh_thread_per_invocation() {
        let mut registry = CallbackRegistry::new();
        let id = registry.register(|_| Box::new(Routine::finished()));

        let mut first = registry.spawn(id, None).expect("callback exists");
        let mut second = registry.spawn(id, None).expect("callback exists");
        assert!(matches!(first.resume(Resume::Start), Step::Done(Ok(None))));
        assert!(matches!(second.resume(Resume::Start), Step::Done(Ok(None))));
    }

    #[test]
    fn spawn_should_miss_for_unknown_handles() {
        let registry = CallbackRegistry::new();
        assert!(registry
            .spawn(super::CallbackId::from_raw(3), None)
            .is_none());
    }
}
