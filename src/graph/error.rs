use std::{error, fmt};

use bstr::BString;

use crate::parser::ParseError;

use super::FragmentEnd;

pub type BuildResult<T> = Result<T, BuildError>;

/// Fatal conditions hit while turning records into units and links.
#[derive(Debug)]
pub enum BuildError {
    /// The underlying record stream couldn't be read or decoded.
    Parse(ParseError),
    /// A fragment id occurs twice in the same unit record.
    DuplicateFragmentInUnit { unit: BString, fragment: BString },
    /// Two unit records share an accession.
    DuplicateAccession(BString),
    /// The orientation recorded for a fragment matches neither end
    /// label of its best-edge line.
    UnresolvableEdge { fragment: BString, end: FragmentEnd },
    /// A link record carries an `ori:` code other than N, A, O, I.
    InvalidOrientationCode { code: u8, line: usize },
    /// A link record names a unit that was never declared.
    DanglingEdgeReference { accession: BString, line: usize },
    /// A unit accession given by the caller isn't in the graph.
    UnknownUnit(BString),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BuildError as BE;
        match self {
            BE::Parse(err) => write!(f, "{}", err),
            BE::DuplicateFragmentInUnit { unit, fragment } => write!(
                f,
                "Fragment {} appears more than once in unit {}",
                fragment, unit
            ),
            BE::DuplicateAccession(acc) => {
                write!(f, "Unit accession {} is declared twice", acc)
            }
            BE::UnresolvableEdge { fragment, end } => write!(
                f,
                "Best edge of fragment {} has no candidate for its {} end",
                fragment, end
            ),
            BE::InvalidOrientationCode { code, line } => write!(
                f,
                "Invalid link orientation code '{}' on line {}",
                char::from(*code),
                line
            ),
            BE::DanglingEdgeReference { accession, line } => write!(
                f,
                "Link on line {} refers to undeclared unit {}",
                line, accession
            ),
            BE::UnknownUnit(acc) => write!(f, "Unit {} is not in the graph", acc),
        }
    }
}

impl From<ParseError> for BuildError {
    #[inline]
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<std::io::Error> for BuildError {
    #[inline]
    fn from(err: std::io::Error) -> Self {
        Self::Parse(ParseError::IOError(err))
    }
}

impl error::Error for BuildError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            BuildError::Parse(err) => Some(err),
            _ => None,
        }
    }
}
