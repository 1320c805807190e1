use std::collections::VecDeque;

use slotmap::{SlotMap, new_key_type};
use tracing::{error, trace};

use crate::buffer::EditorBuffer;
use crate::call::{PaneTypeView, RedCall, RedResponse, SizingView};
use crate::editor::EditorState;
use crate::error::{RedError, Result};
use crate::hooks::{HookKind, HookPayload, HookRegistry};
use crate::pane::{PaneKind, Sizing, SplitAxis};
use crate::script::callback::{CallbackRegistry, SharedCallbacks};
use crate::script::thread::{Resume, ScriptThread, Step};
use crate::style::TextStyle;

new_key_type! { pub struct TaskId; }

/// The out-of-scope interpreter's seam: turns script source into a
/// resumable thread. `run_script` answers `ScriptFault` when no compiler
/// is installed.
pub trait ScriptCompiler {
    fn compile(&self, source: &str) -> std::result::Result<Box<dyn ScriptThread>, String>;
}

/// How one scheduler pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every task ran dry; wait for the next external event.
    Idle,
    /// A task requested editor exit.
    Quit,
}

enum StepOutcome {
    Continue,
    Quit,
}

struct Task {
    thread: Box<dyn ScriptThread>,
    wake: Option<Resume>,
    cause: Option<HookKind>,
}

/// Single-threaded cooperative scheduler. Owns every live task; tasks
/// suspend only by yielding a `RedCall`, and the scheduler is the only
/// code that touches editor state while scripts run.
///
/// A task runs to completion through consecutive request/response pairs
/// unless it yields explicitly; `pane_closed` cleanup preempts the task
/// that caused the close.
pub struct Scheduler {
    tasks: SlotMap<TaskId, Task>,
    run_queue: VecDeque<TaskId>,
    hook_queue: VecDeque<HookPayload>,
    callbacks: SharedCallbacks,
    compiler: Option<Box<dyn ScriptCompiler>>,
}

impl Scheduler {
    /// Bounds one pass; a script looping without yielding hits this
    /// instead of hanging the editor.
    const MAX_STEPS_PER_PASS: usize = 1 << 16;

    pub fn new() -> Self {
        Self {
            tasks: SlotMap::with_key(),
            run_queue: VecDeque::new(),
            hook_queue: VecDeque::new(),
            callbacks: CallbackRegistry::shared(),
            compiler: None,
        }
    }

    pub fn callbacks(&self) -> SharedCallbacks {
        self.callbacks.clone()
    }

    pub fn set_compiler(&mut self, compiler: Box<dyn ScriptCompiler>) {
        self.compiler = Some(compiler);
    }

    /// Queues an event for hook dispatch at the head of the next pass.
    pub fn enqueue_hook(&mut self, payload: HookPayload) {
        self.hook_queue.push_back(payload);
    }

    /// Spawns a plain task at the tail of the run queue.
    pub fn spawn_thread(&mut self, thread: Box<dyn ScriptThread>) -> TaskId {
        let id = self.tasks.insert(Task {
            thread,
            wake: Some(Resume::Start),
            cause: None,
        });
        self.run_queue.push_back(id);
        id
    }

    pub fn has_work(&self) -> bool {
        !self.run_queue.is_empty() || !self.hook_queue.is_empty()
    }

    /// One scheduler pass: drain queued hooks into tasks, then step tasks
    /// until everything is parked waiting on external events.
    pub fn run_until_idle(
        &mut self,
        state: &mut EditorState,
        hooks: &mut HookRegistry,
    ) -> Result<PassOutcome> {
        for _ in 0..Self::MAX_STEPS_PER_PASS {
            self.drain_hook_queue(hooks);
            let Some(task_id) = self.run_queue.pop_front() else {
                return Ok(PassOutcome::Idle);
            };
            if let StepOutcome::Quit = self.step_task(task_id, state, hooks)? {
                return Ok(PassOutcome::Quit);
            }
        }
        Err(RedError::script_fault(
            "scheduler step budget exhausted without yielding",
        ))
    }

    fn drain_hook_queue(&mut self, hooks: &HookRegistry) {
        while let Some(payload) = self.hook_queue.pop_front() {
            let callbacks = hooks.callbacks_for(&payload);
            if callbacks.is_empty() && payload.kind() == HookKind::Error {
                let HookPayload::Error(ref message) = payload else {
                    continue;
                };
                error!("script fault with no error hook registered: {}", message);
                continue;
            }
            for callback in callbacks {
                let spawned = self.callbacks.borrow().spawn(callback, Some(payload.clone()));
                match spawned {
                    Some(thread) => {
                        let id = self.tasks.insert(Task {
                            thread,
                            wake: Some(Resume::Hook(payload.clone())),
                            cause: Some(payload.kind()),
                        });
                        self.run_queue.push_back(id);
                    }
                    None => error!("hook callback {:?} is not registered", callback),
                }
            }
        }
    }

    fn step_task(
        &mut self,
        task_id: TaskId,
        state: &mut EditorState,
        hooks: &mut HookRegistry,
    ) -> Result<StepOutcome> {
        let Some(task) = self.tasks.get_mut(task_id) else {
            return Ok(StepOutcome::Continue);
        };
        let wake = task.wake.take().unwrap_or(Resume::Start);
        match task.thread.resume(wake) {
            Step::Done(result) => {
                let cause = task.cause;
                self.tasks.remove(task_id);
                self.finish_task(cause, result)
            }
            Step::Request(call) => self.handle_call(task_id, call, state, hooks),
        }
    }

    fn finish_task(
        &mut self,
        cause: Option<HookKind>,
        result: std::result::Result<Option<String>, String>,
    ) -> Result<StepOutcome> {
        match result {
            Ok(Some(value)) => trace!("task returned: {}", value),
            Ok(None) => {}
            Err(message) => match cause {
                Some(HookKind::Error) => {
                    self.enqueue_hook(HookPayload::SecondaryError(message));
                }
                Some(HookKind::SecondaryError) => {
                    return Err(RedError::script_fault(format!(
                        "secondary error hook faulted: {}",
                        message
                    )));
                }
                _ => self.enqueue_hook(HookPayload::Error(message)),
            },
        }
        Ok(StepOutcome::Continue)
    }

    fn requeue_front(&mut self, task_id: TaskId, wake: Resume) {
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.wake = Some(wake);
            self.run_queue.push_front(task_id);
        }
    }

    fn requeue_back(&mut self, task_id: TaskId, wake: Resume) {
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.wake = Some(wake);
            self.run_queue.push_back(task_id);
        }
    }

    fn reply(&mut self, task_id: TaskId, result: Result<RedResponse>) {
        match result {
            Ok(response) => self.requeue_front(task_id, Resume::Reply(response)),
            Err(err) => self.requeue_front(task_id, Resume::Fault(err)),
        }
    }

    /// Executes one request. Most calls dispatch statelessly; the arms
    /// handled here need scheduler context (spawning, queue placement,
    /// hook firing).
    fn handle_call(
        &mut self,
        task_id: TaskId,
        call: RedCall,
        state: &mut EditorState,
        hooks: &mut HookRegistry,
    ) -> Result<StepOutcome> {
        match call {
            RedCall::Yield => {
                self.requeue_back(task_id, Resume::Reply(RedResponse::None));
            }
            RedCall::EditorExit => {
                self.tasks.remove(task_id);
                return Ok(StepOutcome::Quit);
            }
            RedCall::SetHook {
                kind,
                callback,
                scope,
            } => {
                hooks.add(kind, callback, scope);
                self.reply(task_id, Ok(RedResponse::None));
            }
            RedCall::RunScript { source } => {
                let compiled = match &self.compiler {
                    Some(compiler) => compiler
                        .compile(&source)
                        .map_err(RedError::script_fault),
                    None => Err(RedError::script_fault(
                        "no script compiler installed for run_script",
                    )),
                };
                match compiled {
                    Ok(thread) => {
                        self.spawn_thread(thread);
                        self.reply(task_id, Ok(RedResponse::None));
                    }
                    Err(err) => self.reply(task_id, Err(err)),
                }
            }
            RedCall::BufferLinkFile {
                buffer_id,
                file_id,
                overwrite,
            } => {
                let result = state
                    .link_buffer_file(buffer_id, file_id, overwrite)
                    .map(|_| {
                        self.enqueue_hook(HookPayload::BufferFileLinked { buffer_id, file_id });
                        RedResponse::None
                    });
                self.reply(task_id, result);
            }
            RedCall::PaneCloseChild {
                pane_id,
                first_child,
            } => match state.close_pane_child(pane_id, first_child) {
                Ok(outcome) => {
                    // Cleanup tasks go ahead of the closing task's
                    // continuation so they observe the close first.
                    let mut spawned = Vec::new();
                    for closed in &outcome.removed {
                        let payload = HookPayload::PaneClosed { pane_id: *closed };
                        for callback in hooks.callbacks_for(&payload) {
                            let thread =
                                self.callbacks.borrow().spawn(callback, Some(payload.clone()));
                            match thread {
                                Some(thread) => {
                                    spawned.push(self.tasks.insert(Task {
                                        thread,
                                        wake: Some(Resume::Hook(payload.clone())),
                                        cause: Some(HookKind::PaneClosed),
                                    }));
                                }
                                None => {
                                    error!("pane_closed callback {:?} is not registered", callback)
                                }
                            }
                        }
                        hooks.remove_pane_scoped(*closed);
                    }
                    self.requeue_front(task_id, Resume::Reply(RedResponse::None));
                    for id in spawned.into_iter().rev() {
                        self.run_queue.push_front(id);
                    }
                }
                Err(err) => self.reply(task_id, Err(err)),
            },
            other => {
                let result = dispatch_call(state, other);
                self.reply(task_id, result);
            }
        }
        Ok(StepOutcome::Continue)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Stateless dispatch: one request in, one response or error out, editor
/// state the only thing touched.
fn dispatch_call(state: &mut EditorState, call: RedCall) -> Result<RedResponse> {
    match call {
        RedCall::CurrentBufferId => state.active_buffer_id().map(RedResponse::Buffer),
        RedCall::ActivePaneIndex => Ok(RedResponse::Pane(state.active_pane)),
        RedCall::RootPaneIndex => Ok(RedResponse::Pane(state.pane_tree.root())),
        RedCall::SetActivePane { pane_id } => {
            state.set_active_pane(pane_id).map(|_| RedResponse::None)
        }
        RedCall::EditorOptions => Ok(RedResponse::Options(state.options)),
        RedCall::UpdateOptions { update } => {
            state.options.merge(update);
            Ok(RedResponse::None)
        }
        RedCall::SetTextStyle {
            name,
            background,
            foreground,
        } => {
            state.text_styles.insert(
                name,
                TextStyle {
                    background,
                    foreground,
                },
            );
            Ok(RedResponse::None)
        }

        RedCall::BufferOpen => Ok(RedResponse::Buffer(state.create_buffer())),
        RedCall::BufferClose { buffer_id } => {
            state.remove_buffer(buffer_id).map(|_| RedResponse::None)
        }
        RedCall::BufferInsert { buffer_id, content } => {
            state.buffer_mut(buffer_id)?.insert(&content);
            Ok(RedResponse::None)
        }
        RedCall::BufferDelete {
            buffer_id,
            char_count,
        } => Ok(RedResponse::Text(
            state.buffer_mut(buffer_id)?.delete(char_count as usize),
        )),
        RedCall::BufferCursor { buffer_id } => {
            let cursor = state.buffer(buffer_id)?.cursor();
            wire_u32(cursor, "cursor byte").map(RedResponse::ByteIndex)
        }
        RedCall::BufferCursorLine { buffer_id } => {
            let line = state.buffer(buffer_id)?.cursor_line();
            wire_u16(line, "cursor line").map(RedResponse::Line)
        }
        RedCall::BufferCursorMovedByChar {
            buffer_id,
            char_delta,
        } => {
            let buffer = state.buffer(buffer_id)?;
            let moved = buffer.cursor_moved_by_char(char_delta as isize);
            wire_u32(moved, "moved byte").map(RedResponse::ByteIndex)
        }
        RedCall::BufferIndexMovedByChar {
            buffer_id,
            byte_index,
            char_delta,
        } => {
            let buffer = state.buffer(buffer_id)?;
            let from = boundary_checked(buffer, byte_index)?;
            let moved = buffer.index_moved_by_char(from, char_delta as isize);
            wire_u32(moved, "moved byte").map(RedResponse::ByteIndex)
        }
        RedCall::BufferSetCursor {
            buffer_id,
            byte_index,
            keep_col,
        } => {
            let buffer = state.buffer_mut(buffer_id)?;
            let byte_index = boundary_checked(buffer, byte_index)?;
            buffer.set_cursor(byte_index, keep_col);
            Ok(RedResponse::None)
        }
        RedCall::BufferSetCursorLine { buffer_id, line } => {
            state
                .buffer_mut(buffer_id)?
                .set_cursor_line(line as usize);
            Ok(RedResponse::None)
        }
        RedCall::BufferLength { buffer_id } => {
            wire_u32(state.buffer(buffer_id)?.len(), "buffer length").map(RedResponse::Count)
        }
        RedCall::BufferLineCount { buffer_id } => {
            wire_u32(state.buffer(buffer_id)?.line_count(), "line count").map(RedResponse::Count)
        }
        RedCall::BufferClear { buffer_id } => {
            state.buffer_mut(buffer_id)?.clear();
            Ok(RedResponse::None)
        }
        RedCall::BufferContent { buffer_id } => {
            Ok(RedResponse::Text(state.buffer(buffer_id)?.content()))
        }
        RedCall::BufferContentAt {
            buffer_id,
            byte_index,
            char_count,
        } => {
            let buffer = state.buffer(buffer_id)?;
            let from = boundary_checked(buffer, byte_index)?;
            let content = buffer
                .content_at(from, char_count as usize)
                .ok_or_else(|| RedError::out_of_bounds("byte", from, buffer.len()))?;
            Ok(RedResponse::Text(content))
        }
        RedCall::BufferLineContent { buffer_id, line } => {
            let buffer = state.buffer(buffer_id)?;
            buffer
                .line_content(line as usize)
                .map(RedResponse::Text)
                .ok_or_else(|| RedError::out_of_bounds("line", line as usize, buffer.line_count()))
        }
        RedCall::BufferLineContaining {
            buffer_id,
            byte_index,
        } => {
            let line = state.buffer(buffer_id)?.line_for_index(byte_index as usize);
            wire_u16(line, "line").map(RedResponse::Line)
        }
        RedCall::BufferLineLength { buffer_id, line } => {
            let buffer = state.buffer(buffer_id)?;
            let length = buffer.line_length(line as usize).ok_or_else(|| {
                RedError::out_of_bounds("line", line as usize, buffer.line_count())
            })?;
            wire_u32(length, "line length").map(RedResponse::Count)
        }
        RedCall::BufferLineStart { buffer_id, line } => {
            let buffer = state.buffer(buffer_id)?;
            let start = buffer.line_start(line as usize).ok_or_else(|| {
                RedError::out_of_bounds("line", line as usize, buffer.line_count())
            })?;
            wire_u32(start, "line start").map(RedResponse::ByteIndex)
        }
        RedCall::BufferLineEnd { buffer_id, line } => {
            let buffer = state.buffer(buffer_id)?;
            let end = buffer.line_end(line as usize).ok_or_else(|| {
                RedError::out_of_bounds("line", line as usize, buffer.line_count())
            })?;
            wire_u32(end, "line end").map(RedResponse::ByteIndex)
        }
        RedCall::BufferUnlinkFile { buffer_id } => {
            state.unlink_buffer_file(buffer_id).map(RedResponse::File)
        }
        RedCall::BufferWriteToFile { buffer_id } => {
            state.write_buffer_to_file(buffer_id).map(|_| RedResponse::None)
        }
        RedCall::BufferCurrentFile { buffer_id } => {
            state.linked_file(buffer_id).map(RedResponse::File)
        }
        RedCall::BufferType { buffer_id } => {
            Ok(RedResponse::BufferType(state.buffer(buffer_id)?.kind()))
        }
        RedCall::BufferSetType { buffer_id, kind } => {
            state.buffer_mut(buffer_id)?.set_kind(kind);
            Ok(RedResponse::None)
        }
        RedCall::BufferClearStyles { buffer_id } => {
            state.buffer_mut(buffer_id)?.clear_styles();
            Ok(RedResponse::None)
        }
        RedCall::BufferPushStyle {
            buffer_id,
            name,
            pattern,
        } => state
            .buffer_mut(buffer_id)?
            .push_style(name, &pattern)
            .map(|_| RedResponse::None)
            .map_err(RedError::script_fault),

        RedCall::PaneIsFirst { pane_id } => {
            state.pane_tree.is_first(pane_id).map(RedResponse::MaybeBool)
        }
        RedCall::PaneIndexUpFrom { pane_id } => {
            state.pane_tree.parent_of(pane_id).map(RedResponse::MaybePane)
        }
        RedCall::PaneIndexDownFrom { pane_id, to_first } => state
            .pane_tree
            .child_of(pane_id, to_first)
            .map(RedResponse::MaybePane),
        RedCall::PaneType { pane_id } => {
            let view = match state.pane_tree.kind(pane_id)? {
                PaneKind::Leaf(_) => PaneTypeView::Leaf,
                PaneKind::Split { axis, sizing, .. } => {
                    let sizing = sizing_view(*sizing);
                    match axis {
                        SplitAxis::Vertical => PaneTypeView::VSplit(sizing),
                        SplitAxis::Horizontal => PaneTypeView::HSplit(sizing),
                    }
                }
            };
            Ok(RedResponse::PaneType(view))
        }
        RedCall::PaneBufferIndex { pane_id } => {
            state.pane_tree.buffer_of(pane_id).map(RedResponse::MaybeBuffer)
        }
        RedCall::PaneSetBuffer { pane_id, buffer_id } => {
            state.buffer(buffer_id)?;
            state
                .pane_tree
                .set_buffer(pane_id, buffer_id)
                .map(|_| RedResponse::None)
        }
        RedCall::PaneVSplit { pane_id } => state
            .split_pane(pane_id, SplitAxis::Vertical)
            .map(RedResponse::Pane),
        RedCall::PaneHSplit { pane_id } => state
            .split_pane(pane_id, SplitAxis::Horizontal)
            .map(RedResponse::Pane),
        RedCall::PaneSetSplitPercent {
            pane_id,
            percent,
            on_first,
        } => state
            .pane_tree
            .set_split_percent(pane_id, percent, on_first.unwrap_or(true))
            .map(|_| RedResponse::None),
        RedCall::PaneSetSplitFixed {
            pane_id,
            size,
            on_first,
        } => state
            .pane_tree
            .set_split_fixed(pane_id, size, on_first)
            .map(|_| RedResponse::None),
        RedCall::PaneTopLine { pane_id } => {
            state.pane_tree.top_line(pane_id).map(RedResponse::MaybeLine)
        }
        RedCall::PaneSetTopLine { pane_id, line } => state
            .pane_tree
            .set_top_line(pane_id, line)
            .map(|_| RedResponse::None),
        RedCall::PaneFrame { pane_id } => state
            .pane_tree
            .frame(pane_id, state.root_frame)
            .map(RedResponse::Frame),
        RedCall::PaneWrap { pane_id } => {
            state.pane_tree.wrap(pane_id).map(RedResponse::MaybeBool)
        }
        RedCall::PaneSetWrap { pane_id, wrap } => state
            .pane_tree
            .set_wrap(pane_id, wrap)
            .map(|_| RedResponse::None),

        RedCall::FileOpen { path } => state.open_file(&path).map(RedResponse::File),
        RedCall::FileClose { file_id } => state.close_file(file_id).map(|_| RedResponse::None),

        RedCall::Yield
        | RedCall::EditorExit
        | RedCall::SetHook { .. }
        | RedCall::RunScript { .. }
        | RedCall::BufferLinkFile { .. }
        | RedCall::PaneCloseChild { .. } => Err(RedError::script_fault(format!(
            "call needs scheduler context: {:?}",
            call
        ))),
    }
}

fn sizing_view(sizing: Sizing) -> SizingView {
    match sizing {
        Sizing::Percent(first_percent) => SizingView::Percent { first_percent },
        Sizing::FirstFixed(size) => SizingView::FirstFixed { size },
        Sizing::SecondFixed(size) => SizingView::SecondFixed { size },
    }
}

fn wire_u32(value: usize, what: &str) -> Result<u32> {
    value
        .try_into()
        .map_err(|_| RedError::out_of_bounds(what, value, u32::MAX as usize))
}

fn wire_u16(value: usize, what: &str) -> Result<u16> {
    value
        .try_into()
        .map_err(|_| RedError::out_of_bounds(what, value, u16::MAX as usize))
}

fn boundary_checked(buffer: &EditorBuffer, byte_index: u32) -> Result<usize> {
    let byte_index = byte_index as usize;
    if byte_index > buffer.len() {
        return Err(RedError::out_of_bounds("byte", byte_index, buffer.len()));
    }
    if !buffer.is_boundary(byte_index) {
        return Err(RedError::boundary(byte_index));
    }
    Ok(byte_index)
}
