use crate::{fields::Tag, parser::RecordReader};

use anyhow::{bail, Result};

use fnv::FnvHashMap;
use memmap::Mmap;

use std::fs::File;
use std::io::prelude::*;
use std::io::Cursor;

use bstr::ByteSlice;

/// A memory-mapped record file, readable line by line from arbitrary
/// offsets.
pub struct MmapRecords {
    pub cursor: Cursor<Mmap>,
    pub line_buf: Vec<u8>,
    pub current_line_len: usize,
    pub last_buf_offset: usize,
}

/// Byte offsets of the opening line of every top-level record, per
/// record tag.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordIndex {
    offsets: FnvHashMap<Tag, Vec<usize>>,
}

impl RecordIndex {
    pub fn offsets(&self, tag: Tag) -> &[usize] {
        self.offsets.get(&tag).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Record counts, ordered by tag.
    pub fn counts(&self) -> Vec<(Tag, usize)> {
        let mut counts: Vec<_> =
            self.offsets.iter().map(|(t, o)| (*t, o.len())).collect();
        counts.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        counts
    }

    pub fn total(&self) -> usize {
        self.offsets.values().map(|o| o.len()).sum()
    }
}

impl MmapRecords {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        let cursor = Cursor::new(mmap);
        let line_buf = Vec::with_capacity(1024);

        Ok(Self {
            cursor,
            line_buf,
            current_line_len: 0,
            last_buf_offset: 0,
        })
    }

    /// Reads the next line, terminator included.
    pub fn next_line(&mut self) -> Result<&[u8]> {
        self.line_buf.clear();

        self.last_buf_offset = self.cursor.position() as usize;

        let n_read = self.cursor.read_until(b'\n', &mut self.line_buf)?;

        self.current_line_len = n_read;

        Ok(&self.line_buf[..n_read])
    }

    pub fn current_line(&self) -> &[u8] {
        &self.line_buf[..self.current_line_len]
    }

    /// Finds every top-level record in the file. Nested records,
    /// e.g. the fragment blocks of a unit, are not indexed.
    pub fn build_index(&mut self) -> Result<RecordIndex> {
        let start_position = self.cursor.position();
        let current_line_len = self.current_line_len;
        let last_buf_offset = self.last_buf_offset;

        let mut offsets: FnvHashMap<Tag, Vec<usize>> = FnvHashMap::default();
        let mut depth = 0usize;

        self.cursor.set_position(0);

        let mut line_start = 0;

        loop {
            let line = self.next_line()?;
            let length = line.len();
            if length == 0 {
                break;
            }
            let trimmed = line.trim_end_with(|c| c == '\n' || c == '\r');

            if trimmed.first() == Some(&b'{') {
                if depth == 0 {
                    if let Some(tag) = Tag::from_line(trimmed) {
                        offsets.entry(tag).or_default().push(line_start);
                    }
                }
                depth += 1;
            } else if trimmed == b"}" {
                if depth == 0 {
                    bail!("Unmatched record close at offset {}", line_start);
                }
                depth -= 1;
            }

            line_start += length;
        }

        self.cursor.set_position(start_position);
        self.current_line_len = current_line_len;
        self.last_buf_offset = last_buf_offset;

        if depth != 0 {
            bail!("File ends inside a record, {} still open", depth);
        }

        Ok(RecordIndex { offsets })
    }

    /// Hands the mapped file to a record reader, starting from the
    /// beginning.
    pub fn into_reader(mut self) -> RecordReader<Cursor<Mmap>> {
        self.cursor.set_position(0);
        RecordReader::new(self.cursor)
    }
}
