use std::time::Duration;

use slotmap::{SlotMap, new_key_type};
use tracing::debug;

use crate::buffer::EditorBuffer;
use crate::error::{ErrorKind, RedError, Result};
use crate::file_io::FileHandle;
use crate::hooks::{HookPayload, HookRegistry};
use crate::pane::{CloseOutcome, Frame, PaneId, PaneTree, SplitAxis};
use crate::script::callback::SharedCallbacks;
use crate::script::scheduler::{PassOutcome, Scheduler};
use crate::style::TextStyleMap;

new_key_type! { pub struct BufferId; }
new_key_type! { pub struct FileId; }

/// Process-wide editor options, read and merged through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EditorOptions {
    pub tab_width: u16,
    pub expand_tabs: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            tab_width: 4,
            expand_tabs: false,
        }
    }
}

/// Field-wise partial update; unset fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
pub struct OptionsUpdate {
    #[serde(default)]
    pub tab_width: Option<u16>,
    #[serde(default)]
    pub expand_tabs: Option<bool>,
}

impl EditorOptions {
    pub fn merge(&mut self, update: OptionsUpdate) {
        if let Some(tab_width) = update.tab_width {
            self.tab_width = tab_width;
        }
        if let Some(expand_tabs) = update.expand_tabs {
            self.expand_tabs = expand_tabs;
        }
    }
}

/// The exclusively-owned editor aggregate: buffer, file and pane tables,
/// the active pane, options and the script-visible style names. RedCall
/// handlers are its only mutators while scripts run.
pub struct EditorState {
    pub buffers: SlotMap<BufferId, EditorBuffer>,
    pub files: SlotMap<FileId, FileHandle>,
    pub pane_tree: PaneTree,
    pub active_pane: PaneId,
    pub root_frame: Frame,
    pub options: EditorOptions,
    pub text_styles: TextStyleMap,
    pub input_poll_rate: Duration,
}

impl EditorState {
    pub fn new() -> Self {
        let mut buffers = SlotMap::with_key();
        let initial_buffer = buffers.insert(EditorBuffer::new());
        let pane_tree = PaneTree::new(initial_buffer);
        let active_pane = pane_tree.root();
        Self {
            buffers,
            files: SlotMap::with_key(),
            pane_tree,
            active_pane,
            root_frame: Frame::default(),
            options: EditorOptions::default(),
            text_styles: TextStyleMap::new(),
            input_poll_rate: Duration::from_millis(10),
        }
    }

    pub fn buffer(&self, id: BufferId) -> Result<&EditorBuffer> {
        self.buffers.get(id).ok_or_else(|| RedError::invalid_buffer(id))
    }

    pub fn buffer_mut(&mut self, id: BufferId) -> Result<&mut EditorBuffer> {
        self.buffers
            .get_mut(id)
            .ok_or_else(|| RedError::invalid_buffer(id))
    }

    pub fn create_buffer(&mut self) -> BufferId {
        self.buffers.insert(EditorBuffer::new())
    }

    pub fn remove_buffer(&mut self, id: BufferId) -> Result<()> {
        self.buffers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RedError::invalid_buffer(id))
    }

    /// The buffer shown by the active pane, descending to the nearest
    /// first-leaf when a script made a split the active pane.
    pub fn active_buffer_id(&self) -> Result<BufferId> {
        self.pane_tree.first_leaf_buffer(self.active_pane)
    }

    pub fn set_active_pane(&mut self, id: PaneId) -> Result<()> {
        if !self.pane_tree.contains(id) {
            return Err(RedError::invalid_pane(id));
        }
        self.active_pane = id;
        Ok(())
    }

    pub fn split_pane(&mut self, id: PaneId, axis: SplitAxis) -> Result<PaneId> {
        // Child ids survive the split, so the active pane needs no fixup:
        // when it was `id`, it stays `id`, now the first child.
        self.pane_tree.split(id, axis)
    }

    pub fn close_pane_child(&mut self, split: PaneId, first_child: bool) -> Result<CloseOutcome> {
        let outcome = self.pane_tree.close_child(split, first_child)?;
        if outcome.removed.contains(&self.active_pane) {
            self.active_pane = outcome.survivor;
        }
        Ok(outcome)
    }

    pub fn open_file(&mut self, path: &str) -> Result<FileId> {
        if self
            .files
            .values()
            .any(|handle| handle.path().to_string_lossy() == path)
        {
            return Err(RedError::new(
                ErrorKind::IoFailure,
                format!("file is already open: {}", path),
            ));
        }
        let handle =
            FileHandle::open(path).map_err(|err| RedError::io("failed to open file", err))?;
        Ok(self.files.insert(handle))
    }

    pub fn close_file(&mut self, id: FileId) -> Result<()> {
        if !self.files.contains_key(id) {
            return Err(RedError::invalid_file(id));
        }
        for buffer in self.buffers.values_mut() {
            if buffer.linked_file == Some(id) {
                buffer.linked_file = None;
            }
        }
        self.files.remove(id);
        Ok(())
    }

    /// Links a buffer to a file. With `overwrite`, the buffer content is
    /// replaced by the file bytes. The caller fires `buffer_file_linked`.
    pub fn link_buffer_file(
        &mut self,
        buffer_id: BufferId,
        file_id: FileId,
        overwrite: bool,
    ) -> Result<()> {
        if self.buffer(buffer_id)?.linked_file.is_some() {
            return Err(RedError::new(
                ErrorKind::AlreadyLinked,
                format!("buffer {:?} is already linked to a file", buffer_id),
            ));
        }
        if let Some((other, _)) = self
            .buffers
            .iter()
            .find(|(_, buffer)| buffer.linked_file == Some(file_id))
        {
            return Err(RedError::new(
                ErrorKind::AlreadyLinked,
                format!("file {:?} is already linked to buffer {:?}", file_id, other),
            ));
        }
        let content = if overwrite {
            let handle = self
                .files
                .get(file_id)
                .ok_or_else(|| RedError::invalid_file(file_id))?;
            Some(
                handle
                    .read_to_string()
                    .map_err(|err| RedError::io("failed to read linked file", err))?,
            )
        } else {
            if !self.files.contains_key(file_id) {
                return Err(RedError::invalid_file(file_id));
            }
            None
        };

        let buffer = self.buffer_mut(buffer_id)?;
        buffer.linked_file = Some(file_id);
        if let Some(content) = content {
            buffer.replace_content(&content);
        }
        debug!("linked buffer {:?} to file {:?}", buffer_id, file_id);
        Ok(())
    }

    pub fn unlink_buffer_file(&mut self, buffer_id: BufferId) -> Result<FileId> {
        let buffer = self.buffer_mut(buffer_id)?;
        buffer.linked_file.take().ok_or_else(|| {
            RedError::new(
                ErrorKind::NotLinked,
                format!("buffer {:?} is not linked to a file", buffer_id),
            )
        })
    }

    pub fn write_buffer_to_file(&mut self, buffer_id: BufferId) -> Result<()> {
        let buffer = self.buffer(buffer_id)?;
        let file_id = buffer.linked_file.ok_or_else(|| {
            RedError::new(
                ErrorKind::NotLinked,
                format!("buffer {:?} is not linked to a file", buffer_id),
            )
        })?;
        let content = buffer.content();
        let handle = self
            .files
            .get(file_id)
            .ok_or_else(|| RedError::invalid_file(file_id))?;
        handle
            .write_all(content.as_bytes())
            .map_err(|err| RedError::io("failed to write buffer to file", err))
    }

    pub fn linked_file(&self, buffer_id: BufferId) -> Result<FileId> {
        self.buffer(buffer_id)?.linked_file.ok_or_else(|| {
            RedError::new(
                ErrorKind::NotLinked,
                format!("buffer {:?} is not linked to a file", buffer_id),
            )
        })
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}

/// State, scheduler and hook registry wired together; one of these is the
/// whole editor.
pub struct Editor {
    pub state: EditorState,
    pub scheduler: Scheduler,
    pub hooks: HookRegistry,
}

impl Editor {
    pub fn new() -> Self {
        Self {
            state: EditorState::new(),
            scheduler: Scheduler::new(),
            hooks: HookRegistry::new(),
        }
    }

    pub fn callbacks(&self) -> SharedCallbacks {
        self.scheduler.callbacks()
    }

    /// Queues the `key_event` hook for the next scheduler pass. The key is
    /// already in its string form; the core passes it through unchanged.
    pub fn dispatch_key(&mut self, key: impl Into<String>) {
        self.scheduler
            .enqueue_hook(HookPayload::KeyEvent(key.into()));
    }

    pub fn run_until_idle(&mut self) -> Result<PassOutcome> {
        self.scheduler.run_until_idle(&mut self.state, &mut self.hooks)
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}
