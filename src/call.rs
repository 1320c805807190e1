use crate::buffer::BufferKind;
use crate::editor::{BufferId, EditorOptions, FileId, OptionsUpdate};
use crate::error::{RedError, Result};
use crate::hooks::{HookKind, HookScope};
use crate::pane::{Frame, PaneId};
use crate::script::callback::CallbackId;
use crate::style::Color;

/// Version of the closed request/response contract below. Bumped whenever a
/// variant is added, removed or changes shape.
pub const PROTOCOL_VERSION: u32 = 1;

/// One request on the script-to-editor bridge; emitting one is the only
/// suspension point a task has. Byte offsets are `u32`, char deltas `i32`,
/// line and frame values `u16` on this surface regardless of what the core
/// uses internally.
#[derive(Debug, Clone, PartialEq)]
pub enum RedCall {
    /// Explicit fairness point: reschedules the task behind its peers.
    Yield,
    EditorExit,
    RunScript {
        source: String,
    },
    SetHook {
        kind: HookKind,
        callback: CallbackId,
        scope: Option<HookScope>,
    },
    SetTextStyle {
        name: String,
        background: Option<Color>,
        foreground: Color,
    },
    EditorOptions,
    UpdateOptions {
        update: OptionsUpdate,
    },

    CurrentBufferId,
    ActivePaneIndex,
    RootPaneIndex,
    SetActivePane {
        pane_id: PaneId,
    },

    BufferOpen,
    BufferClose {
        buffer_id: BufferId,
    },
    BufferInsert {
        buffer_id: BufferId,
        content: String,
    },
    BufferDelete {
        buffer_id: BufferId,
        char_count: u32,
    },
    BufferCursor {
        buffer_id: BufferId,
    },
    BufferCursorLine {
        buffer_id: BufferId,
    },
    BufferCursorMovedByChar {
        buffer_id: BufferId,
        char_delta: i32,
    },
    BufferIndexMovedByChar {
        buffer_id: BufferId,
        byte_index: u32,
        char_delta: i32,
    },
    BufferSetCursor {
        buffer_id: BufferId,
        byte_index: u32,
        keep_col: bool,
    },
    BufferSetCursorLine {
        buffer_id: BufferId,
        line: u16,
    },
    BufferLength {
        buffer_id: BufferId,
    },
    BufferLineCount {
        buffer_id: BufferId,
    },
    BufferClear {
        buffer_id: BufferId,
    },
    BufferContent {
        buffer_id: BufferId,
    },
    BufferContentAt {
        buffer_id: BufferId,
        byte_index: u32,
        char_count: u32,
    },
    BufferLineContent {
        buffer_id: BufferId,
        line: u16,
    },
    BufferLineContaining {
        buffer_id: BufferId,
        byte_index: u32,
    },
    BufferLineLength {
        buffer_id: BufferId,
        line: u16,
    },
    BufferLineStart {
        buffer_id: BufferId,
        line: u16,
    },
    BufferLineEnd {
        buffer_id: BufferId,
        line: u16,
    },
    BufferLinkFile {
        buffer_id: BufferId,
        file_id: FileId,
        overwrite: bool,
    },
    BufferUnlinkFile {
        buffer_id: BufferId,
    },
    BufferWriteToFile {
        buffer_id: BufferId,
    },
    BufferCurrentFile {
        buffer_id: BufferId,
    },
    BufferType {
        buffer_id: BufferId,
    },
    BufferSetType {
        buffer_id: BufferId,
        kind: BufferKind,
    },
    BufferClearStyles {
        buffer_id: BufferId,
    },
    BufferPushStyle {
        buffer_id: BufferId,
        name: String,
        pattern: String,
    },

    PaneIsFirst {
        pane_id: PaneId,
    },
    PaneIndexUpFrom {
        pane_id: PaneId,
    },
    PaneIndexDownFrom {
        pane_id: PaneId,
        to_first: bool,
    },
    PaneType {
        pane_id: PaneId,
    },
    PaneBufferIndex {
        pane_id: PaneId,
    },
    PaneSetBuffer {
        pane_id: PaneId,
        buffer_id: BufferId,
    },
    PaneVSplit {
        pane_id: PaneId,
    },
    PaneHSplit {
        pane_id: PaneId,
    },
    PaneCloseChild {
        pane_id: PaneId,
        first_child: bool,
    },
    PaneSetSplitPercent {
        pane_id: PaneId,
        percent: f32,
        on_first: Option<bool>,
    },
    PaneSetSplitFixed {
        pane_id: PaneId,
        size: u16,
        on_first: bool,
    },
    PaneTopLine {
        pane_id: PaneId,
    },
    PaneSetTopLine {
        pane_id: PaneId,
        line: u16,
    },
    PaneFrame {
        pane_id: PaneId,
    },
    PaneWrap {
        pane_id: PaneId,
    },
    PaneSetWrap {
        pane_id: PaneId,
        wrap: bool,
    },

    FileOpen {
        path: String,
    },
    FileClose {
        file_id: FileId,
    },
}

/// Shape of a split pane as scripts see it: no child ids, just the division.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizingView {
    Percent { first_percent: f32 },
    FirstFixed { size: u16 },
    SecondFixed { size: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaneTypeView {
    Leaf,
    VSplit(SizingView),
    HSplit(SizingView),
}

/// The value half of the bridge; every call answers with one of these or a
/// `RedError`.
#[derive(Debug, Clone, PartialEq)]
pub enum RedResponse {
    None,
    Buffer(BufferId),
    Pane(PaneId),
    File(FileId),
    MaybePane(Option<PaneId>),
    MaybeBuffer(Option<BufferId>),
    MaybeBool(Option<bool>),
    MaybeLine(Option<u16>),
    ByteIndex(u32),
    Line(u16),
    Count(u32),
    Text(String),
    BufferType(BufferKind),
    PaneType(PaneTypeView),
    Frame(Frame),
    Options(EditorOptions),
}

fn shape_fault(expected: &str, got: &RedResponse) -> RedError {
    RedError::script_fault(format!("expected {} response, got {:?}", expected, got))
}

impl RedResponse {
    pub fn into_unit(self) -> Result<()> {
        match self {
            RedResponse::None => Ok(()),
            other => Err(shape_fault("unit", &other)),
        }
    }

    pub fn into_buffer_id(self) -> Result<BufferId> {
        match self {
            RedResponse::Buffer(id) => Ok(id),
            other => Err(shape_fault("buffer id", &other)),
        }
    }

    pub fn into_pane_id(self) -> Result<PaneId> {
        match self {
            RedResponse::Pane(id) => Ok(id),
            other => Err(shape_fault("pane id", &other)),
        }
    }

    pub fn into_file_id(self) -> Result<FileId> {
        match self {
            RedResponse::File(id) => Ok(id),
            other => Err(shape_fault("file id", &other)),
        }
    }

    pub fn into_maybe_pane(self) -> Result<Option<PaneId>> {
        match self {
            RedResponse::MaybePane(id) => Ok(id),
            other => Err(shape_fault("optional pane id", &other)),
        }
    }

    pub fn into_maybe_buffer(self) -> Result<Option<BufferId>> {
        match self {
            RedResponse::MaybeBuffer(id) => Ok(id),
            other => Err(shape_fault("optional buffer id", &other)),
        }
    }

    pub fn into_maybe_bool(self) -> Result<Option<bool>> {
        match self {
            RedResponse::MaybeBool(value) => Ok(value),
            other => Err(shape_fault("optional bool", &other)),
        }
    }

    pub fn into_maybe_line(self) -> Result<Option<u16>> {
        match self {
            RedResponse::MaybeLine(value) => Ok(value),
            other => Err(shape_fault("optional line", &other)),
        }
    }

    pub fn into_byte_index(self) -> Result<u32> {
        match self {
            RedResponse::ByteIndex(value) => Ok(value),
            other => Err(shape_fault("byte index", &other)),
        }
    }

    pub fn into_line(self) -> Result<u16> {
        match self {
            RedResponse::Line(value) => Ok(value),
            other => Err(shape_fault("line index", &other)),
        }
    }

    pub fn into_count(self) -> Result<u32> {
        match self {
            RedResponse::Count(value) => Ok(value),
            other => Err(shape_fault("count", &other)),
        }
    }

    pub fn into_text(self) -> Result<String> {
        match self {
            RedResponse::Text(value) => Ok(value),
            other => Err(shape_fault("text", &other)),
        }
    }

    pub fn into_buffer_type(self) -> Result<BufferKind> {
        match self {
            RedResponse::BufferType(kind) => Ok(kind),
            other => Err(shape_fault("buffer type", &other)),
        }
    }

    pub fn into_pane_type(self) -> Result<PaneTypeView> {
        match self {
            RedResponse::PaneType(view) => Ok(view),
            other => Err(shape_fault("pane type", &other)),
        }
    }

    pub fn into_frame(self) -> Result<Frame> {
        match self {
            RedResponse::Frame(frame) => Ok(frame),
            other => Err(shape_fault("frame", &other)),
        }
    }

    pub fn into_options(self) -> Result<EditorOptions> {
        match self {
            RedResponse::Options(options) => Ok(options),
            other => Err(shape_fault("options", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RedResponse;
    use crate::error::ErrorKind;

    #[test]
    fn accessor_should_fault_on_shape_mismatch() {
        let err = RedResponse::Text("x".to_string())
            .into_byte_index()
            .expect_err("shape mismatch faults");
        assert_eq!(err.kind, ErrorKind::ScriptFault);
    }

    #[test]
    fn accessor_should_unwrap_matching_shape() {
        assert_eq!(
            RedResponse::ByteIndex(9).into_byte_index().expect("shape matches"),
            9
        );
        assert_eq!(RedResponse::None.into_unit().expect("shape matches"), ());
    }
}
