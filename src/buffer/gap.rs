use super::storage::TextStorage;

const MIN_GAP: usize = 64;

/// Byte gap buffer.
///
/// Content is stored in one allocation with a movable hole: bytes before
/// `gap_start`, then `gap_len` dead bytes, then the rest. Insertion at the
/// gap is amortized O(1); moving the gap costs O(distance). A sorted table
/// of newline positions is maintained incrementally so line arithmetic is a
/// binary search instead of a scan. The table is always equal to what a
/// rescan of the content would produce.
#[derive(Debug, Default)]
pub struct GapStorage {
    bytes: Vec<u8>,
    gap_start: usize,
    gap_len: usize,
    newlines: Vec<usize>,
}

impl GapStorage {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            gap_start: 0,
            gap_len: 0,
            newlines: Vec::new(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let newlines = scan_newlines(bytes);
        Self {
            bytes: bytes.to_vec(),
            gap_start: bytes.len(),
            gap_len: 0,
            newlines,
        }
    }

    fn physical(&self, index: usize) -> usize {
        if index < self.gap_start {
            index
        } else {
            index + self.gap_len
        }
    }

    fn move_gap(&mut self, to: usize) {
        debug_assert!(to <= self.len());
        if to < self.gap_start {
            self.bytes.copy_within(to..self.gap_start, to + self.gap_len);
        } else if to > self.gap_start {
            let tail = self.gap_start + self.gap_len;
            self.bytes.copy_within(tail..to + self.gap_len, self.gap_start);
        }
        self.gap_start = to;
    }

    fn ensure_gap(&mut self, needed: usize) {
        if self.gap_len >= needed {
            return;
        }
        let grow = needed.max(self.len().max(MIN_GAP));
        self.bytes.splice(
            self.gap_start..self.gap_start,
            std::iter::repeat_n(0u8, grow),
        );
        self.gap_len += grow;
    }

    #[cfg(test)]
    fn rescanned_newlines(&self) -> Vec<usize> {
        scan_newlines(&self.slice(0, self.len()))
    }
}

impl TextStorage for GapStorage {
    fn len(&self) -> usize {
        self.bytes.len() - self.gap_len
    }

    fn byte_at(&self, index: usize) -> Option<u8> {
        if index >= self.len() {
            return None;
        }
        Some(self.bytes[self.physical(index)])
    }

    fn insert(&mut self, index: usize, bytes: &[u8]) {
        debug_assert!(index <= self.len());
        self.move_gap(index);
        self.ensure_gap(bytes.len());
        self.bytes[self.gap_start..self.gap_start + bytes.len()].copy_from_slice(bytes);
        self.gap_start += bytes.len();
        self.gap_len -= bytes.len();

        let shift_from = self.newlines.partition_point(|nl| *nl < index);
        for nl in &mut self.newlines[shift_from..] {
            *nl += bytes.len();
        }
        let inserted = scan_newlines(bytes);
        self.newlines.splice(
            shift_from..shift_from,
            inserted.into_iter().map(|nl| nl + index),
        );
    }

    fn delete(&mut self, index: usize, count: usize) -> Vec<u8> {
        let count = count.min(self.len().saturating_sub(index));
        self.move_gap(index);
        let tail = self.gap_start + self.gap_len;
        let removed = self.bytes[tail..tail + count].to_vec();
        self.gap_len += count;

        let drop_from = self.newlines.partition_point(|nl| *nl < index);
        let drop_to = self.newlines.partition_point(|nl| *nl < index + count);
        self.newlines.drain(drop_from..drop_to);
        for nl in &mut self.newlines[drop_from..] {
            *nl -= count;
        }

        removed
    }

    fn slice(&self, index: usize, count: usize) -> Vec<u8> {
        let end = (index + count).min(self.len());
        if index >= end {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(end - index);
        if index < self.gap_start {
            let head_end = end.min(self.gap_start);
            out.extend_from_slice(&self.bytes[index..head_end]);
        }
        if end > self.gap_start {
            let tail_start = index.max(self.gap_start);
            out.extend_from_slice(
                &self.bytes[tail_start + self.gap_len..end + self.gap_len],
            );
        }
        out
    }

    fn line_count(&self) -> usize {
        self.newlines.len() + 1
    }

    fn line_start(&self, line: usize) -> Option<usize> {
        if line == 0 {
            return Some(0);
        }
        self.newlines.get(line - 1).map(|nl| nl + 1)
    }

    fn line_end(&self, line: usize) -> Option<usize> {
        if line < self.newlines.len() {
            Some(self.newlines[line])
        } else if line == self.newlines.len() {
            Some(self.len())
        } else {
            None
        }
    }

    fn line_containing(&self, index: usize) -> usize {
        self.newlines.partition_point(|nl| *nl < index)
    }
}

fn scan_newlines(bytes: &[u8]) -> Vec<usize> {
    bytes
        .iter()
        .enumerate()
        .filter_map(|(index, byte)| (*byte == b'\n').then_some(index))
        .collect()
}
