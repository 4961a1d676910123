pub mod error;

pub use self::error::*;

use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;

use bstr::{BString, ByteSlice};

use crate::fields::{
    decode, Accession, Coordinates, FieldKind, FieldValue, Tag,
};

/// A forward-only cursor over the lines of a message file.
///
/// Nothing is looked ahead beyond the line just consumed, so callers
/// reading a nested record have to ask for its tags in the order the
/// producer writes them. Scanning for a tag discards every line in
/// between.
pub struct RecordReader<R> {
    input: R,
    line_buf: Vec<u8>,
    current_line_len: usize,
    line_no: usize,
}

impl RecordReader<BufReader<File>> {
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> ParseResult<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(input: R) -> Self {
        RecordReader {
            input,
            line_buf: Vec::with_capacity(1024),
            current_line_len: 0,
            line_no: 0,
        }
    }

    /// Number of lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    /// The most recently consumed line, without its line terminator
    pub fn current_line(&self) -> &[u8] {
        &self.line_buf[..self.current_line_len]
    }

    /// Reads the next line into the buffer. Returns false once the
    /// input is exhausted.
    fn advance(&mut self) -> ParseResult<bool> {
        self.line_buf.clear();
        let n_read = self.input.read_until(b'\n', &mut self.line_buf)?;
        if n_read == 0 {
            self.current_line_len = 0;
            return Ok(false);
        }
        self.line_no += 1;
        let trimmed = self.line_buf.trim_end_with(|c| c == '\n' || c == '\r');
        self.current_line_len = trimmed.len();
        Ok(true)
    }

    fn end_of_stream(&self, tag: Tag) -> ParseError {
        ParseError::UnexpectedEndOfStream {
            tag,
            line: self.line_no,
        }
    }

    /// Discard lines until one starting with `tag`, and return it.
    pub fn scan_to(&mut self, tag: Tag) -> ParseResult<&[u8]> {
        loop {
            if !self.advance()? {
                return Err(self.end_of_stream(tag));
            }
            if tag.matches(self.current_line()) {
                return Ok(self.current_line());
            }
        }
    }

    /// Discard lines until one starting with any of `tags`. Returns
    /// the tag that was found along with the value following it.
    pub fn scan_to_any(&mut self, tags: &[Tag]) -> ParseResult<(Tag, &[u8])> {
        loop {
            if !self.advance()? {
                // report the tag the caller is ultimately waiting for
                let tag = tags.last().copied().unwrap_or(Tag(*b"????"));
                return Err(self.end_of_stream(tag));
            }
            let found =
                tags.iter().copied().find(|t| t.matches(self.current_line()));
            if let Some(tag) = found {
                return Ok((tag, &self.current_line()[4..]));
            }
        }
    }

    /// `scan_to_any` over tags written in a fixed order. The tag found
    /// and every tag listed before it are dropped from `tags`, so free
    /// text further down the record (`cns:`, `qlt:` bodies) can't be
    /// mistaken for an earlier field.
    pub fn scan_in_order<'t>(&mut self, tags: &mut &'t [Tag]) -> ParseResult<Tag> {
        let remaining: &'t [Tag] = *tags;
        let (tag, _) = self.scan_to_any(remaining)?;
        let pos = remaining.iter().position(|t| *t == tag).unwrap_or(0);
        *tags = &remaining[pos + 1..];
        Ok(tag)
    }

    /// Advance to the next top-level record opened by one of
    /// `tags`. Unlike the other scans, running out of input here is
    /// the normal way a file ends, and produces `None`.
    pub fn next_record(&mut self, tags: &[Tag]) -> ParseResult<Option<Tag>> {
        loop {
            if !self.advance()? {
                return Ok(None);
            }
            let line = self.current_line();
            if let Some(tag) = tags.iter().find(|t| t.matches(line)) {
                return Ok(Some(*tag));
            }
        }
    }

    /// Scan to `tag` and return the value following it.
    pub fn read_tag(&mut self, tag: Tag) -> ParseResult<&[u8]> {
        let line = self.scan_to(tag)?;
        Ok(&line[4..])
    }

    /// Scan to `tag` and decode its value according to the schema.
    pub fn read_field(&mut self, tag: Tag) -> ParseResult<FieldValue> {
        let value = self.read_tag(tag)?;
        let decoded = decode(tag, value);
        decoded.map_err(|err| {
            ParseError::invalid_line(err, self.line_no, self.current_line())
        })
    }

    pub fn read_int(&mut self, tag: Tag) -> ParseResult<i64> {
        match self.read_field(tag)? {
            FieldValue::Int(x) => Ok(x),
            _ => Err(wrong_kind(tag, FieldKind::Integer)),
        }
    }

    pub fn read_float(&mut self, tag: Tag) -> ParseResult<f64> {
        match self.read_field(tag)? {
            FieldValue::Float(x) => Ok(x),
            _ => Err(wrong_kind(tag, FieldKind::Float)),
        }
    }

    pub fn read_coords(&mut self, tag: Tag) -> ParseResult<Coordinates> {
        match self.read_field(tag)? {
            FieldValue::Coords(c) => Ok(c),
            _ => Err(wrong_kind(tag, FieldKind::Coordinates)),
        }
    }

    pub fn read_ident(&mut self, tag: Tag) -> ParseResult<BString> {
        match self.read_field(tag)? {
            FieldValue::Ident(id) => Ok(id),
            _ => Err(wrong_kind(tag, FieldKind::Identifier)),
        }
    }

    pub fn read_code(&mut self, tag: Tag) -> ParseResult<u8> {
        match self.read_field(tag)? {
            FieldValue::Code(c) => Ok(c),
            _ => Err(wrong_kind(tag, FieldKind::Code)),
        }
    }

    pub fn read_accession(&mut self, tag: Tag) -> ParseResult<Accession> {
        match self.read_field(tag)? {
            FieldValue::Accession(acc) => Ok(acc),
            _ => Err(wrong_kind(tag, FieldKind::Accession)),
        }
    }

    /// Decode a value already returned by `scan_to_any`, reporting
    /// errors against the current line.
    pub fn decode_current(&self, tag: Tag) -> ParseResult<FieldValue> {
        let line = self.current_line();
        decode(tag, &line[4..])
            .map_err(|err| ParseError::invalid_line(err, self.line_no, line))
    }

    /// Like `read_int`, but for counts, which must not be negative.
    pub fn read_count(&mut self, tag: Tag) -> ParseResult<usize> {
        let count = self.read_int(tag)?;
        if count < 0 {
            return Err(self.unexpected_value());
        }
        Ok(count as usize)
    }

    /// Error for a current line whose value decoded fine but can't
    /// be used where it appears.
    pub fn unexpected_value(&self) -> ParseError {
        ParseError::invalid_line(
            ParseFieldError::ParseFromStringError,
            self.line_no,
            self.current_line(),
        )
    }
}

fn wrong_kind(tag: Tag, expected: FieldKind) -> ParseError {
    ParseError::InvalidField(ParseFieldError::WrongKind { tag, expected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(input: &str) -> RecordReader<Cursor<&[u8]>> {
        RecordReader::new(Cursor::new(input.as_bytes()))
    }

    #[test]
    fn scan_discards_until_tag() {
        let mut r = reader("{IUM\nacc:12\ncov:0.000\nnfr:3\n}\n");
        assert_eq!(r.scan_to(Tag::NFR).unwrap(), b"nfr:3");
        assert_eq!(r.line_number(), 4);
    }

    #[test]
    fn read_tag_strips_prefix_and_newline() {
        let mut r = reader("{UTG\r\nacc:(77,3)\r\n");
        assert_eq!(r.read_tag(Tag::ACC).unwrap(), b"(77,3)");
    }

    #[test]
    fn missing_tag_is_end_of_stream() {
        let mut r = reader("{IUM\nacc:12\n}\n");
        let err = r.read_tag(Tag::NFR).unwrap_err();
        assert!(err.is_end_of_stream());
        match err {
            ParseError::UnexpectedEndOfStream { tag, line } => {
                assert_eq!(tag, Tag::NFR);
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn typed_reads() {
        let mut r = reader("mid:1001\ncon:0\npos:80,40\nori:N\nmea:12.5\n");
        assert_eq!(r.read_ident(Tag::MID).unwrap(), "1001");
        assert_eq!(r.read_int(Tag::CON).unwrap(), 0);
        assert_eq!(
            r.read_coords(Tag::POS).unwrap(),
            Coordinates { begin: 80, end: 40 }
        );
        assert_eq!(r.read_code(Tag::ORI).unwrap(), b'N');
        assert_eq!(r.read_float(Tag::MEA).unwrap(), 12.5);
    }

    #[test]
    fn typed_read_of_wrong_kind_fails() {
        let mut r = reader("mid:1001\n");
        match r.read_int(Tag::MID) {
            Err(ParseError::InvalidField(ParseFieldError::WrongKind {
                tag,
                expected,
            })) => {
                assert_eq!(tag, Tag::MID);
                assert_eq!(expected, FieldKind::Integer);
            }
            _ => panic!("expected a wrong kind error"),
        }
    }

    #[test]
    fn malformed_value_names_the_line() {
        let mut r = reader("{IUM\npos:10-50\n");
        match r.read_coords(Tag::POS) {
            Err(ParseError::InvalidLine(err, line_no, line)) => {
                assert_eq!(err, ParseFieldError::CoordinateError);
                assert_eq!(line_no, 2);
                assert_eq!(line, "pos:10-50");
            }
            _ => panic!("expected an invalid line error"),
        }
    }

    #[test]
    fn scan_to_any_stops_at_first_match() {
        let mut r = reader("mid:5\ndln:0\ncon:1\npos:1,2\n");
        r.read_ident(Tag::MID).unwrap();
        let (tag, value) = r.scan_to_any(&[Tag::CON, Tag::POS]).unwrap();
        assert_eq!(tag, Tag::CON);
        assert_eq!(value, b"1");
        let (tag, _) = r.scan_to_any(&[Tag::CON, Tag::POS]).unwrap();
        assert_eq!(tag, Tag::POS);
    }

    #[test]
    fn ordered_scan_drops_passed_tags() {
        let mut r = reader("sta:U\nlen:40\nqlt:\nsta:XX\nnfr:2\n");
        let mut tags: &[Tag] = &[Tag::IID, Tag::STA, Tag::LEN, Tag::NFR];
        assert_eq!(r.scan_in_order(&mut tags).unwrap(), Tag::STA);
        assert_eq!(tags, &[Tag::LEN, Tag::NFR]);
        assert_eq!(r.scan_in_order(&mut tags).unwrap(), Tag::LEN);
        assert_eq!(r.scan_in_order(&mut tags).unwrap(), Tag::NFR);
        assert_eq!(r.line_number(), 5);
        assert!(tags.is_empty());
    }

    #[test]
    fn next_record_ends_cleanly() {
        let mut r = reader("{UTG\nacc:1\n}\n{ULK\nut1:1\n}\n{UTG\n}\n");
        let tags = [Tag::UTG];
        assert_eq!(r.next_record(&tags).unwrap(), Some(Tag::UTG));
        assert_eq!(r.next_record(&tags).unwrap(), Some(Tag::UTG));
        assert_eq!(r.next_record(&tags).unwrap(), None);
    }
}
