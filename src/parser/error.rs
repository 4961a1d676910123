use std::{error, fmt};

use bstr::ByteSlice;

use crate::fields::{FieldKind, Tag};

pub type ParseFieldResult<T> = Result<T, ParseFieldError>;
pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseFieldError {
    /// A bytestring couldn't be parsed as a bytestring, can happen
    /// when the contents aren't UTF8.
    Utf8Error,
    /// A field couldn't be parsed into the correct type
    ParseFromStringError,
    /// A `pos:` value wasn't two comma-separated integers.
    CoordinateError,
    /// An accession was neither a bare identifier nor `(uid,iid)`.
    AccessionError,
    /// A tag was decoded as a kind other than the one the tag
    /// schema assigns to it.
    WrongKind { tag: Tag, expected: FieldKind },
    /// A whitespace-delimited line had the wrong number of columns.
    MissingFields,
}

macro_rules! impl_many_from {
    ($to:ty, $(($from:ty, $out:expr)),* $(,)?) => (
        $(
            impl From<$from> for $to {
                fn from(_: $from) -> Self {
                    $out
                }
            }
        )*
    );
}

impl_many_from!(
    ParseFieldError,
    (std::str::Utf8Error, ParseFieldError::Utf8Error),
    (bstr::Utf8Error, ParseFieldError::Utf8Error),
    (
        std::num::ParseIntError,
        ParseFieldError::ParseFromStringError
    ),
    (
        std::num::ParseFloatError,
        ParseFieldError::ParseFromStringError
    )
);

impl fmt::Display for ParseFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ParseFieldError as PFE;
        match self {
            PFE::Utf8Error => {
                write!(f, "Failed to parse a bytestring as a UTF-8 string")
            }
            PFE::ParseFromStringError => {
                write!(f, "Failed to parse a field from a string")
            }
            PFE::CoordinateError => {
                write!(f, "Failed to parse a begin,end coordinate pair")
            }
            PFE::AccessionError => write!(f, "Failed to parse an accession"),
            PFE::WrongKind { tag, expected } => write!(
                f,
                "Tag `{}` is not a {:?} field",
                tag, expected
            ),
            PFE::MissingFields => write!(f, "Line is missing required fields"),
        }
    }
}

impl error::Error for ParseFieldError {}

/// Type encapsulating the ways reading a message file can fail. All
/// of them are fatal; the format is produced by a trusted upstream
/// stage and there is no recovery.
#[derive(Debug)]
pub enum ParseError {
    /// The input ran out before a line with the required tag
    /// appeared. Includes the tag and the number of lines read.
    UnexpectedEndOfStream { tag: Tag, line: usize },
    /// A line couldn't be parsed. Includes the line number, the
    /// problem line and a variant describing the error.
    InvalidLine(ParseFieldError, usize, String),
    /// A field couldn't be parsed
    InvalidField(ParseFieldError),
    /// Wrapper for an IO error.
    IOError(std::io::Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ParseError as PE;
        match self {
            PE::UnexpectedEndOfStream { tag, line } => write!(
                f,
                "Input ended after line {} while looking for `{}`",
                line, tag
            ),
            PE::InvalidLine(field_err, line_no, line) => write!(
                f,
                "Failed to parse line {} `{}`, error: {}",
                line_no, line, field_err
            ),
            PE::InvalidField(field_err) => {
                write!(f, "Failed to parse field: {}", field_err)
            }
            PE::IOError(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl From<std::io::Error> for ParseError {
    #[inline]
    fn from(err: std::io::Error) -> Self {
        Self::IOError(err)
    }
}

impl From<ParseFieldError> for ParseError {
    #[inline]
    fn from(err: ParseFieldError) -> Self {
        Self::InvalidField(err)
    }
}

impl error::Error for ParseError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ParseError::IOError(err) => Some(err),
            ParseError::InvalidLine(err, _, _) => Some(err),
            ParseError::InvalidField(err) => Some(err),
            _ => None,
        }
    }
}

impl ParseError {
    #[inline]
    pub(crate) fn invalid_line(
        error: ParseFieldError,
        line_no: usize,
        line: &[u8],
    ) -> Self {
        let mut dest = String::new();
        line.to_str_lossy_into(&mut dest);
        Self::InvalidLine(error, line_no, dest)
    }

    /// True if the error was caused by running out of input.
    #[inline]
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, ParseError::UnexpectedEndOfStream { .. })
    }
}
