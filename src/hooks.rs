use std::collections::HashMap;

use crate::editor::{BufferId, FileId};
use crate::pane::PaneId;
use crate::script::callback::CallbackId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    KeyEvent,
    BufferFileLinked,
    PaneClosed,
    Error,
    SecondaryError,
}

/// The event handed to a hook task when it is spawned.
#[derive(Debug, Clone, PartialEq)]
pub enum HookPayload {
    KeyEvent(String),
    BufferFileLinked { buffer_id: BufferId, file_id: FileId },
    PaneClosed { pane_id: PaneId },
    Error(String),
    SecondaryError(String),
}

impl HookPayload {
    pub fn kind(&self) -> HookKind {
        match self {
            HookPayload::KeyEvent(_) => HookKind::KeyEvent,
            HookPayload::BufferFileLinked { .. } => HookKind::BufferFileLinked,
            HookPayload::PaneClosed { .. } => HookKind::PaneClosed,
            HookPayload::Error(_) => HookKind::Error,
            HookPayload::SecondaryError(_) => HookKind::SecondaryError,
        }
    }
}

/// Narrows a registration to one id; unscoped registrations fire for every
/// event of their kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookScope {
    Pane(PaneId),
    Buffer(BufferId),
}

impl HookScope {
    fn matches(self, payload: &HookPayload) -> bool {
        match (self, payload) {
            (HookScope::Pane(scope), HookPayload::PaneClosed { pane_id }) => scope == *pane_id,
            (HookScope::Buffer(scope), HookPayload::BufferFileLinked { buffer_id, .. }) => {
                scope == *buffer_id
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HookEntry {
    callback: CallbackId,
    scope: Option<HookScope>,
}

/// Registered callbacks per hook kind, iterated in registration order.
/// Stores only opaque handles; the callable side lives in the script-side
/// callback registry.
#[derive(Default)]
pub struct HookRegistry {
    map: HashMap<HookKind, Vec<HookEntry>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn add(&mut self, kind: HookKind, callback: CallbackId, scope: Option<HookScope>) {
        self.map
            .entry(kind)
            .or_default()
            .push(HookEntry { callback, scope });
    }

    /// Callbacks to spawn for `payload`: unscoped entries plus entries whose
    /// scope matches, in registration order.
    pub fn callbacks_for(&self, payload: &HookPayload) -> Vec<CallbackId> {
        self.map
            .get(&payload.kind())
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| match entry.scope {
                        None => true,
                        Some(scope) => scope.matches(payload),
                    })
                    .map(|entry| entry.callback)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drops every entry scoped to `pane_id`. Scope-bound `pane_closed`
    /// callbacks are one-shot; their pane id never comes back.
    pub fn remove_pane_scoped(&mut self, pane_id: PaneId) {
        for entries in self.map.values_mut() {
            entries.retain(|entry| entry.scope != Some(HookScope::Pane(pane_id)));
        }
    }
}

#[cfg(test)]
mod tests {
    use slotmap::KeyData;

    use super::{HookKind, HookPayload, HookRegistry, HookScope};
    use crate::pane::PaneId;
    use crate::script::callback::CallbackId;

    fn pane(raw: u64) -> PaneId {
        PaneId::from(KeyData::from_ffi(raw))
    }

    #[test]
    fn callbacks_should_come_back_in_registration_order() {
        let mut registry = HookRegistry::new();
        let first = CallbackId::from_raw(0);
        let second = CallbackId::from_raw(1);
        registry.add(HookKind::KeyEvent, first, None);
        registry.add(HookKind::KeyEvent, second, None);

        let spawned = registry.callbacks_for(&HookPayload::KeyEvent("a".to_string()));
        assert_eq!(spawned, vec![first, second]);
    }

    #[test]
    fn scoped_entries_should_only_fire_for_their_id() {
        let mut registry = HookRegistry::new();
        let scoped = CallbackId::from_raw(0);
        let unscoped = CallbackId::from_raw(1);
        registry.add(HookKind::PaneClosed, scoped, Some(HookScope::Pane(pane(7))));
        registry.add(HookKind::PaneClosed, unscoped, None);

        let matching = registry.callbacks_for(&HookPayload::PaneClosed { pane_id: pane(7) });
        assert_eq!(matching, vec![scoped, unscoped]);

        let other = registry.callbacks_for(&HookPayload::PaneClosed { pane_id: pane(9) });
        assert_eq!(other, vec![unscoped]);
    }

    #[test]
    fn remove_pane_scoped_should_leave_unscoped_entries() {
        let mut registry = HookRegistry::new();
        let scoped = CallbackId::from_raw(0);
        let unscoped = CallbackId::from_raw(1);
        registry.add(HookKind::PaneClosed, scoped, Some(HookScope::Pane(pane(7))));
        registry.add(HookKind::PaneClosed, unscoped, None);

        registry.remove_pane_scoped(pane(7));

        let remaining = registry.callbacks_for(&HookPayload::PaneClosed { pane_id: pane(7) });
        assert_eq!(remaining, vec![unscoped]);
    }
}
