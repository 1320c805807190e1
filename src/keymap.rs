use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::call::RedCall;
use crate::hooks::{HookKind, HookPayload, HookRegistry};
use crate::keys::text_for_key;
use crate::script::callback::{CallbackId, SharedCallbacks};
use crate::script::thread::{Outcome, Routine, ScriptThread, call_then, delegate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeymapNodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Callback(CallbackId),
    Submap(KeymapNodeId),
}

struct KeymapNode {
    parent: Option<KeymapNodeId>,
    bindings: HashMap<String, Binding>,
    fallback: Option<CallbackId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResolution {
    /// A callback was bound for the key (or a fallback caught it).
    Run(CallbackId),
    /// The key entered a submap; the next key resolves inside it.
    Deeper,
    Unbound,
}

/// Tree of key bindings. Lookup starts at the pending submap (or the root)
/// and walks parent links upward, so submaps inherit everything they do
/// not override; a node's fallback is the default handler for keys nothing
/// binds explicitly.
pub struct Keymap {
    nodes: Vec<KeymapNode>,
    pending: Option<KeymapNodeId>,
}

pub type SharedKeymap = Rc<RefCell<Keymap>>;

impl Keymap {
    pub fn new() -> Self {
        Self {
            nodes: vec![KeymapNode {
                parent: None,
                bindings: HashMap::new(),
                fallback: None,
            }],
            pending: None,
        }
    }

    pub fn shared() -> SharedKeymap {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn root(&self) -> KeymapNodeId {
        KeymapNodeId(0)
    }

    pub fn add_submap(&mut self, parent: KeymapNodeId) -> KeymapNodeId {
        let id = KeymapNodeId(self.nodes.len());
        self.nodes.push(KeymapNode {
            parent: Some(parent),
            bindings: HashMap::new(),
            fallback: None,
        });
        id
    }

    pub fn bind(&mut self, node: KeymapNodeId, key: impl Into<String>, binding: Binding) {
        self.nodes[node.0].bindings.insert(key.into(), binding);
    }

    pub fn set_fallback(&mut self, node: KeymapNodeId, callback: CallbackId) {
        self.nodes[node.0].fallback = Some(callback);
    }

    /// Resolves one key event, updating the pending-submap position. A miss
    /// resets to the root so a mistyped prefix does not poison the next key.
    pub fn resolve(&mut self, key: &str) -> KeyResolution {
        let start = self.pending.unwrap_or(self.root());

        let mut node = Some(start);
        while let Some(id) = node {
            if let Some(binding) = self.nodes[id.0].bindings.get(key) {
                return match binding {
                    Binding::Callback(callback) => {
                        self.pending = None;
                        KeyResolution::Run(*callback)
                    }
                    Binding::Submap(submap) => {
                        self.pending = Some(*submap);
                        KeyResolution::Deeper
                    }
                };
            }
            node = self.nodes[id.0].parent;
        }

        let mut node = Some(start);
        while let Some(id) = node {
            if let Some(callback) = self.nodes[id.0].fallback {
                self.pending = None;
                return KeyResolution::Run(callback);
            }
            node = self.nodes[id.0].parent;
        }

        self.pending = None;
        KeyResolution::Unbound
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! try_reply {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => return Outcome::Fail(err.to_string()),
        }
    };
}

/// Wires the `key_event` hook to a keymap whose root fallback echoes: keys
/// with text insert themselves, editing and motion keys edit, everything
/// else is dropped. Everything below speaks pure RedCalls. Returns the
/// keymap so scripts can bind over the defaults.
pub fn install_default_keymap(
    hooks: &mut HookRegistry,
    callbacks: &SharedCallbacks,
) -> SharedKeymap {
    let keymap = Keymap::shared();

    let echo = callbacks.borrow_mut().register(|payload| {
        let Some(HookPayload::KeyEvent(key)) = payload else {
            return Box::new(Routine::finished());
        };
        echo_thread(key)
    });
    let exit = callbacks.borrow_mut().register(|_| {
        Routine::boxed(|_| call_then(RedCall::EditorExit, |_| Outcome::Finish(None)))
    });

    {
        let mut map = keymap.borrow_mut();
        let root = map.root();
        map.set_fallback(root, echo);
        map.bind(root, "C+q", Binding::Callback(exit));
    }

    let handler = {
        let keymap = keymap.clone();
        let spawn_from = callbacks.clone();
        callbacks.borrow_mut().register(move |payload| {
            let Some(HookPayload::KeyEvent(key)) = payload else {
                return Box::new(Routine::finished());
            };
            match keymap.borrow_mut().resolve(&key) {
                KeyResolution::Run(callback) => {
                    let thread = spawn_from
                        .borrow()
                        .spawn(callback, Some(HookPayload::KeyEvent(key)));
                    match thread {
                        Some(thread) => Routine::boxed(move |input| delegate(thread, input)),
                        None => Box::new(Routine::finished()),
                    }
                }
                KeyResolution::Deeper | KeyResolution::Unbound => Box::new(Routine::finished()),
            }
        })
    };
    hooks.add(HookKind::KeyEvent, handler, None);

    keymap
}

fn echo_thread(key: String) -> Box<dyn ScriptThread> {
    match key.as_str() {
        "Backspace" => backspace_thread(),
        "Delete" => delete_thread(),
        "Left" => horizontal_move_thread(-1),
        "Right" => horizontal_move_thread(1),
        "Up" => vertical_move_thread(-1),
        "Down" => vertical_move_thread(1),
        "Tab" => tab_thread(),
        _ => match text_for_key(&key) {
            Some(text) => insert_text_thread(text),
            None => Box::new(Routine::finished()),
        },
    }
}

fn insert_text_thread(text: String) -> Box<dyn ScriptThread> {
    Routine::boxed(move |_| {
        call_then(RedCall::CurrentBufferId, move |response| {
            let buffer_id = try_reply!(response.into_buffer_id());
            call_then(
                RedCall::BufferInsert {
                    buffer_id,
                    content: text,
                },
                |_| Outcome::Finish(None),
            )
        })
    })
}

fn tab_thread() -> Box<dyn ScriptThread> {
    Routine::boxed(|_| {
        call_then(RedCall::EditorOptions, |response| {
            let options = try_reply!(response.into_options());
            let text = if options.expand_tabs {
                " ".repeat(options.tab_width as usize)
            } else {
                "\t".to_string()
            };
            delegate(insert_text_thread(text), crate::script::thread::Resume::Start)
        })
    })
}

fn delete_thread() -> Box<dyn ScriptThread> {
    Routine::boxed(|_| {
        call_then(RedCall::CurrentBufferId, |response| {
            let buffer_id = try_reply!(response.into_buffer_id());
            call_then(
                RedCall::BufferDelete {
                    buffer_id,
                    char_count: 1,
                },
                |_| Outcome::Finish(None),
            )
        })
    })
}

fn backspace_thread() -> Box<dyn ScriptThread> {
    Routine::boxed(|_| {
        call_then(RedCall::CurrentBufferId, |response| {
            let buffer_id = try_reply!(response.into_buffer_id());
            call_then(RedCall::BufferCursor { buffer_id }, move |response| {
                let cursor = try_reply!(response.into_byte_index());
                call_then(
                    RedCall::BufferCursorMovedByChar {
                        buffer_id,
                        char_delta: -1,
                    },
                    move |response| {
                        let moved = try_reply!(response.into_byte_index());
                        if moved >= cursor {
                            return Outcome::Finish(None);
                        }
                        call_then(
                            RedCall::BufferSetCursor {
                                buffer_id,
                                byte_index: moved,
                                keep_col: false,
                            },
                            move |_| {
                                call_then(
                                    RedCall::BufferDelete {
                                        buffer_id,
                                        char_count: 1,
                                    },
                                    |_| Outcome::Finish(None),
                                )
                            },
                        )
                    },
                )
            })
        })
    })
}

fn horizontal_move_thread(char_delta: i32) -> Box<dyn ScriptThread> {
    Routine::boxed(move |_| {
        call_then(RedCall::CurrentBufferId, move |response| {
            let buffer_id = try_reply!(response.into_buffer_id());
            call_then(
                RedCall::BufferCursorMovedByChar {
                    buffer_id,
                    char_delta,
                },
                move |response| {
                    let moved = try_reply!(response.into_byte_index());
                    call_then(
                        RedCall::BufferSetCursor {
                            buffer_id,
                            byte_index: moved,
                            keep_col: false,
                        },
                        |_| Outcome::Finish(None),
                    )
                },
            )
        })
    })
}

fn vertical_move_thread(line_delta: i32) -> Box<dyn ScriptThread> {
    Routine::boxed(move |_| {
        call_then(RedCall::CurrentBufferId, move |response| {
            let buffer_id = try_reply!(response.into_buffer_id());
            call_then(RedCall::BufferCursorLine { buffer_id }, move |response| {
                let line = try_reply!(response.into_line());
                let Some(target) = line.checked_add_signed(line_delta as i16) else {
                    return Outcome::Finish(None);
                };
                call_then(
                    RedCall::BufferSetCursorLine {
                        buffer_id,
                        line: target,
                    },
                    |_| Outcome::Finish(None),
                )
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::{Binding, KeyResolution, Keymap};
    use crate::script::callback::CallbackId;

    fn callback(raw: u32) -> CallbackId {
        CallbackId::from_raw(raw)
    }

    #[test]
    fn explicit_binding_should_win_over_fallback() {
        let mut map = Keymap::new();
        let root = map.root();
        map.set_fallback(root, callback(0));
        map.bind(root, "x", Binding::Callback(callback(1)));

        assert_eq!(map.resolve("x"), KeyResolution::Run(callback(1)));
        assert_eq!(map.resolve("y"), KeyResolution::Run(callback(0)));
    }

    #[test]
    fn submap_should_capture_the_following_key() {
        let mut map = Keymap::new();
        let root = map.root();
        let submap = map.add_submap(root);
        map.bind(root, "C+w", Binding::Submap(submap));
        map.bind(submap, "v", Binding::Callback(callback(2)));

        assert_eq!(map.resolve("C+w"), KeyResolution::Deeper);
        assert_eq!(map.resolve("v"), KeyResolution::Run(callback(2)));
    }

    #[test]
    fn submap_lookup_should_walk_parents_for_unbound_keys() {
        let mut map = Keymap::new();
        let root = map.root();
        let submap = map.add_submap(root);
        map.bind(root, "C+w", Binding::Submap(submap));
        map.bind(root, "q", Binding::Callback(callback(3)));

        assert_eq!(map.resolve("C+w"), KeyResolution::Deeper);
        assert_eq!(map.resolve("q"), KeyResolution::Run(callback(3)));
    }

    #[test]
    fn miss_should_reset_the_pending_submap() {
        let mut map = Keymap::new();
        let root = map.root();
        let submap = map.add_submap(root);
        map.bind(root, "C+w", Binding::Submap(submap));
        map.bind(submap, "v", Binding::Callback(callback(4)));

        assert_eq!(map.resolve("C+w"), KeyResolution::Deeper);
        assert_eq!(map.resolve("zz"), KeyResolution::Unbound);
        // back at the root: "v" no longer resolves through the submap
        assert_eq!(map.resolve("v"), KeyResolution::Unbound);
    }

    #[test]
    fn fallback_should_inherit_through_parent_links() {
        let mut map = Keymap::new();
        let root = map.root();
        map.set_fallback(root, callback(5));
        let submap = map.add_submap(root);
        map.bind(root, "g", Binding::Submap(submap));

        assert_eq!(map.resolve("g"), KeyResolution::Deeper);
        assert_eq!(map.resolve("?"), KeyResolution::Run(callback(5)));
    }
}
