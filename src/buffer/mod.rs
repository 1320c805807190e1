use crate::editor::FileId;
use crate::style::StyleStack;

pub use storage::{FlatStorage, TextStorage};

pub mod gap;
pub mod storage;

use gap::GapStorage;

/// Storage strategy tag, stable across the script boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Naive,
    Gap,
}

#[derive(Debug)]
enum TextStore {
    Flat(FlatStorage),
    Gap(GapStorage),
}

impl TextStore {
    fn store(&self) -> &dyn TextStorage {
        match self {
            TextStore::Flat(storage) => storage,
            TextStore::Gap(storage) => storage,
        }
    }

    fn store_mut(&mut self) -> &mut dyn TextStorage {
        match self {
            TextStore::Flat(storage) => storage,
            TextStore::Gap(storage) => storage,
        }
    }
}

/// A unit of editable text: byte storage behind the backend contract, a
/// cursor held on UTF-8 codepoint boundaries, a sticky column for vertical
/// motion, an optional file link, and an opaque style stack.
#[derive(Debug)]
pub struct EditorBuffer {
    store: TextStore,
    kind: BufferKind,
    cursor: usize,
    sticky_column: Option<usize>,
    pub linked_file: Option<FileId>,
    pub styles: StyleStack,
}

impl EditorBuffer {
    pub fn new() -> Self {
        Self::new_with_kind(BufferKind::Gap)
    }

    pub fn new_with_kind(kind: BufferKind) -> Self {
        let store = match kind {
            BufferKind::Naive => TextStore::Flat(FlatStorage::new()),
            BufferKind::Gap => TextStore::Gap(GapStorage::new()),
        };
        Self {
            store,
            kind,
            cursor: 0,
            sticky_column: None,
            linked_file: None,
            styles: StyleStack::new(),
        }
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Switches the storage backend, copying content end-to-end. Cursor,
    /// sticky column and file link are untouched; switching to the current
    /// kind is a no-op.
    pub fn set_kind(&mut self, kind: BufferKind) {
        if kind == self.kind {
            return;
        }
        let bytes = self.store.store().slice(0, self.len());
        self.store = match kind {
            BufferKind::Naive => TextStore::Flat(FlatStorage::from_bytes(&bytes)),
            BufferKind::Gap => TextStore::Gap(GapStorage::from_bytes(&bytes)),
        };
        self.kind = kind;
    }

    pub fn len(&self) -> usize {
        self.store.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn sticky_column(&self) -> Option<usize> {
        self.sticky_column
    }

    pub fn insert(&mut self, content: &str) {
        self.store.store_mut().insert(self.cursor, content.as_bytes());
        self.cursor += content.len();
        self.sticky_column = None;
    }

    /// Deletes the next `char_count` codepoints starting at the cursor,
    /// stopping at end of buffer. Returns the removed text.
    pub fn delete(&mut self, char_count: usize) -> String {
        let end = self.index_moved_by_char(self.cursor, char_count as isize);
        let removed = self.store.store_mut().delete(self.cursor, end - self.cursor);
        self.sticky_column = None;
        String::from_utf8_lossy(&removed).into_owned()
    }

    pub fn clear(&mut self) {
        let len = self.len();
        self.store.store_mut().delete(0, len);
        self.cursor = 0;
        self.sticky_column = None;
    }

    pub fn content(&self) -> String {
        String::from_utf8_lossy(&self.store.store().slice(0, self.len())).into_owned()
    }

    /// Text covering `char_count` codepoints starting at `byte_index`.
    /// `None` when the index is out of range or off a codepoint boundary.
    pub fn content_at(&self, byte_index: usize, char_count: usize) -> Option<String> {
        if byte_index > self.len() || !self.is_boundary(byte_index) {
            return None;
        }
        let end = self.index_moved_by_char(byte_index, char_count as isize);
        let bytes = self.store.store().slice(byte_index, end - byte_index);
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Content of `line` without its terminating newline.
    pub fn line_content(&self, line: usize) -> Option<String> {
        let start = self.store.store().line_start(line)?;
        let end = self.store.store().line_end(line)?;
        let bytes = self.store.store().slice(start, end - start);
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn line_count(&self) -> usize {
        self.store.store().line_count()
    }

    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.store.store().line_start(line)
    }

    pub fn line_end(&self, line: usize) -> Option<usize> {
        self.store.store().line_end(line)
    }

    /// Line length in bytes, excluding the newline.
    pub fn line_length(&self, line: usize) -> Option<usize> {
        let start = self.store.store().line_start(line)?;
        let end = self.store.store().line_end(line)?;
        Some(end - start)
    }

    pub fn line_for_index(&self, byte_index: usize) -> usize {
        self.store.store().line_containing(byte_index.min(self.len()))
    }

    pub fn cursor_line(&self) -> usize {
        self.line_for_index(self.cursor)
    }

    pub fn cursor_line_content(&self) -> String {
        self.line_content(self.cursor_line()).unwrap_or_default()
    }

    /// The codepoint under the cursor, empty at end of buffer.
    pub fn cursor_content(&self) -> String {
        self.content_at(self.cursor, 1).unwrap_or_default()
    }

    pub fn is_boundary(&self, byte_index: usize) -> bool {
        if byte_index == self.len() {
            return true;
        }
        match self.store.store().byte_at(byte_index) {
            Some(byte) => leading_byte_len(byte).is_some(),
            None => false,
        }
    }

    /// Steps `char_delta` codepoints from `from`, clamped to `[0, len]`.
    /// The only sanctioned way to cross multibyte characters.
    pub fn index_moved_by_char(&self, from: usize, char_delta: isize) -> usize {
        let storage = self.store.store();
        let len = storage.len();
        let mut index = from.min(len);
        if char_delta >= 0 {
            for _ in 0..char_delta {
                if index >= len {
                    break;
                }
                let step = storage
                    .byte_at(index)
                    .and_then(leading_byte_len)
                    .unwrap_or(1);
                index = (index + step).min(len);
            }
        } else {
            for _ in 0..char_delta.unsigned_abs() {
                if index == 0 {
                    break;
                }
                index -= 1;
                while index > 0 && !self.is_leading_at(index) {
                    index -= 1;
                }
            }
        }
        index
    }

    pub fn cursor_moved_by_char(&self, char_delta: isize) -> usize {
        self.index_moved_by_char(self.cursor, char_delta)
    }

    fn is_leading_at(&self, index: usize) -> bool {
        self.store
            .store()
            .byte_at(index)
            .and_then(leading_byte_len)
            .is_some()
    }

    /// Horizontal cursor placement. `byte_index` must be a codepoint
    /// boundary or the buffer length; callers never synthesize offsets.
    pub fn set_cursor(&mut self, byte_index: usize, keep_col: bool) {
        debug_assert!(
            byte_index <= self.len() && self.is_boundary(byte_index),
            "cursor set off codepoint boundary: {}",
            byte_index
        );
        self.cursor = byte_index.min(self.len());
        if !keep_col {
            self.sticky_column = None;
        }
    }

    pub fn set_cursor_line(&mut self, line: usize) {
        self.set_cursor_line_skipping(line, false);
    }

    /// Vertical cursor placement. Targets the sticky column when present,
    /// the current byte column otherwise, clamped to the target line and
    /// snapped back to the nearest preceding codepoint boundary. Seeds the
    /// sticky column when unset; never overwrites an existing one. With
    /// `skip_newlines`, a cursor landing on a newline that is not alone on
    /// its line steps one codepoint onward in the direction of motion.
    pub fn set_cursor_line_skipping(&mut self, line: usize, skip_newlines: bool) {
        let from_line = self.cursor_line();
        let line = line.min(self.line_count().saturating_sub(1));

        let column = self.sticky_column.unwrap_or_else(|| {
            let start = self.line_start(from_line).unwrap_or(0);
            self.cursor - start
        });

        let start = self.line_start(line).unwrap_or(0);
        let length = self.line_length(line).unwrap_or(0);
        let mut target = start + column.min(length);
        while target > start && !self.is_boundary(target) {
            target -= 1;
        }

        if skip_newlines
            && length > 0
            && self.store.store().byte_at(target) == Some(b'\n')
        {
            target = if line >= from_line {
                self.index_moved_by_char(target, 1)
            } else {
                self.index_moved_by_char(target, -1)
            };
        }

        self.cursor = target;
        if self.sticky_column.is_none() {
            self.sticky_column = Some(column);
        }
    }

    pub fn clear_styles(&mut self) {
        self.styles.clear();
    }

    pub fn push_style(&mut self, name: String, pattern: &str) -> Result<(), String> {
        self.styles.push(name, pattern)
    }

    /// Replaces the whole content, resetting cursor and sticky column.
    /// Used by file linkage when overwriting from disk.
    pub fn replace_content(&mut self, text: &str) {
        let len = self.len();
        let storage = self.store.store_mut();
        storage.delete(0, len);
        storage.insert(0, text.as_bytes());
        self.cursor = 0;
        self.sticky_column = None;
    }
}

impl Default for EditorBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// UTF-8 leading-byte classification: `None` for continuation bytes.
fn leading_byte_len(byte: u8) -> Option<usize> {
    if byte & 0b1000_0000 == 0 {
        Some(1)
    } else if byte & 0b1110_0000 == 0b1100_0000 {
        Some(2)
    } else if byte & 0b1111_0000 == 0b1110_0000 {
        Some(3)
    } else if byte & 0b1111_1000 == 0b1111_0000 {
        Some(4)
    } else {
        None
    }
}
