/// Byte-level storage contract shared by the flat and gap backends.
///
/// All positions are raw byte offsets. Backends never check codepoint
/// boundaries; the buffer layer above owes them valid UTF-8 splits.
pub trait TextStorage {
    fn len(&self) -> usize;
    fn byte_at(&self, index: usize) -> Option<u8>;
    fn insert(&mut self, index: usize, bytes: &[u8]);
    fn delete(&mut self, index: usize, count: usize) -> Vec<u8>;
    fn slice(&self, index: usize, count: usize) -> Vec<u8>;

    fn line_count(&self) -> usize;
    fn line_start(&self, line: usize) -> Option<usize>;
    fn line_end(&self, line: usize) -> Option<usize>;
    fn line_containing(&self, index: usize) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Flat storage: a plain string, line arithmetic by scanning.
#[derive(Debug, Default)]
pub struct FlatStorage {
    content: String,
}

impl FlatStorage {
    pub fn new() -> Self {
        Self {
            content: String::new(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            content: String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    fn newline_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.content
            .bytes()
            .enumerate()
            .filter_map(|(index, byte)| (byte == b'\n').then_some(index))
    }
}

impl TextStorage for FlatStorage {
    fn len(&self) -> usize {
        self.content.len()
    }

    fn byte_at(&self, index: usize) -> Option<u8> {
        self.content.as_bytes().get(index).copied()
    }

    fn insert(&mut self, index: usize, bytes: &[u8]) {
        let text =
            std::str::from_utf8(bytes).expect("invariant: storage insert receives valid utf-8");
        self.content.insert_str(index, text);
    }

    fn delete(&mut self, index: usize, count: usize) -> Vec<u8> {
        let end = (index + count).min(self.content.len());
        let removed = self.content[index..end].to_string();
        self.content.replace_range(index..end, "");
        removed.into_bytes()
    }

    fn slice(&self, index: usize, count: usize) -> Vec<u8> {
        let end = (index + count).min(self.content.len());
        self.content.as_bytes()[index..end].to_vec()
    }

    fn line_count(&self) -> usize {
        self.newline_positions().count() + 1
    }

    fn line_start(&self, line: usize) -> Option<usize> {
        if line == 0 {
            return Some(0);
        }
        self.newline_positions().nth(line - 1).map(|index| index + 1)
    }

    fn line_end(&self, line: usize) -> Option<usize> {
        if line >= self.line_count() {
            return None;
        }
        Some(
            self.newline_positions()
                .nth(line)
                .unwrap_or(self.content.len()),
        )
    }

    fn line_containing(&self, index: usize) -> usize {
        self.newline_positions().take_while(|nl| *nl < index).count()
    }
}

#[cfg(test)]
mod tests {
    use super::{FlatStorage, TextStorage};

    #[test]
    fn empty_storage_should_have_one_empty_line() {
        let storage = FlatStorage::new();
        assert_eq!(storage.len(), 0);
        assert_eq!(storage.line_count(), 1);
        assert_eq!(storage.line_start(0), Some(0));
        assert_eq!(storage.line_end(0), Some(0));
        assert_eq!(storage.line_containing(0), 0);
    }

    #[test]
    fn insert_should_shift_following_content_right() {
        let mut storage = FlatStorage::new();
        storage.insert(0, b"hello");
        storage.insert(2, b"__");
        assert_eq!(storage.slice(0, storage.len()), b"he__llo");
    }

    #[test]
    fn delete_should_return_removed_bytes() {
        let mut storage = FlatStorage::from_bytes(b"abcdef");
        let removed = storage.delete(1, 3);
        assert_eq!(removed, b"bcd");
        assert_eq!(storage.slice(0, storage.len()), b"aef");
    }

    #[test]
    fn delete_past_end_should_stop_at_length() {
        let mut storage = FlatStorage::from_bytes(b"abc");
        let removed = storage.delete(2, 10);
        assert_eq!(removed, b"c");
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn line_bounds_should_exclude_the_newline() {
        let storage = FlatStorage::from_bytes(b"ab\ncd\n");
        assert_eq!(storage.line_count(), 3);
        assert_eq!(storage.line_start(0), Some(0));
        assert_eq!(storage.line_end(0), Some(2));
        assert_eq!(storage.line_start(1), Some(3));
        assert_eq!(storage.line_end(1), Some(5));
        assert_eq!(storage.line_start(2), Some(6));
        assert_eq!(storage.line_end(2), Some(6));
        assert_eq!(storage.line_start(3), None);
        assert_eq!(storage.line_end(3), None);
    }

    #[test]
    fn line_containing_should_claim_the_newline_for_its_own_line() {
        let storage = FlatStorage::from_bytes(b"ab\ncd");
        assert_eq!(storage.line_containing(0), 0);
        assert_eq!(storage.line_containing(2), 0);
        assert_eq!(storage.line_containing(3), 1);
        assert_eq!(storage.line_containing(5), 1);
    }
}
