#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::fields::Coordinates;

use super::EdgeColor;

/// Which end of a fragment faces outward from its unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub enum FragmentEnd {
    FivePrime,
    ThreePrime,
}

impl FragmentEnd {
    /// A fragment laid out with `end < begin` is reversed in the
    /// unit, so its 3' end is the outward one.
    #[inline]
    pub fn from_coordinates(pos: &Coordinates) -> Self {
        if pos.is_reversed() {
            FragmentEnd::ThreePrime
        } else {
            FragmentEnd::FivePrime
        }
    }

    /// Parse the end labels used by best-edge tables, where `fv` is
    /// the 5' end and `th` the 3' end.
    #[inline]
    pub fn from_label<T: AsRef<[u8]>>(bs: T) -> Option<Self> {
        match bs.as_ref() {
            b"fv" => Some(FragmentEnd::FivePrime),
            b"th" => Some(FragmentEnd::ThreePrime),
            _ => None,
        }
    }

    #[inline]
    pub fn label(&self) -> &'static str {
        match self {
            Self::FivePrime => "fv",
            Self::ThreePrime => "th",
        }
    }
}

impl std::fmt::Display for FragmentEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FivePrime => write!(f, "5'"),
            Self::ThreePrime => write!(f, "3'"),
        }
    }
}

/// The relative orientation of the two units joined by a link, named
/// by the ends that meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub enum LinkOrientation {
    ThreeToFive,
    FiveToThree,
    FiveToFive,
    ThreeToThree,
}

impl LinkOrientation {
    /// Decode the single-character `ori:` code of a link record:
    /// `N` normal, `A` anti-normal, `O` outie, `I` innie.
    #[inline]
    pub fn from_code(code: u8) -> Option<Self> {
        use LinkOrientation::*;
        match code {
            b'N' => Some(ThreeToFive),
            b'A' => Some(FiveToThree),
            b'O' => Some(FiveToFive),
            b'I' => Some(ThreeToThree),
            _ => None,
        }
    }

    #[inline]
    pub fn code(&self) -> u8 {
        use LinkOrientation::*;
        match self {
            ThreeToFive => b'N',
            FiveToThree => b'A',
            FiveToFive => b'O',
            ThreeToThree => b'I',
        }
    }

    /// The color a link gets from its orientation alone.
    #[inline]
    pub fn base_color(&self) -> EdgeColor {
        use LinkOrientation::*;
        match self {
            ThreeToFive => EdgeColor::Blue,
            FiveToThree => EdgeColor::Green,
            FiveToFive => EdgeColor::Yellow,
            ThreeToThree => EdgeColor::Red,
        }
    }

    /// The orientation of an edge leaving through `from` and
    /// arriving at `to`.
    #[inline]
    pub fn from_ends(from: FragmentEnd, to: FragmentEnd) -> Self {
        use FragmentEnd::*;
        use LinkOrientation::*;
        match (from, to) {
            (ThreePrime, FivePrime) => ThreeToFive,
            (FivePrime, ThreePrime) => FiveToThree,
            (FivePrime, FivePrime) => FiveToFive,
            (ThreePrime, ThreePrime) => ThreeToThree,
        }
    }
}

/// Display uses the end names, e.g. `5'-3'`. If the alternate format
/// flag is used, i.e. `{:#}`, the `ori:` code is written instead.
///
/// # Examples
///
/// ```
/// use asmgraph::graph::LinkOrientation as O;
///
/// assert_eq!(&format!("{}", O::FiveToThree), "5'-3'");
/// assert_eq!(&format!("{:#}", O::FiveToThree), "A");
/// ```
impl std::fmt::Display for LinkOrientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use LinkOrientation::*;
        if f.alternate() {
            return write!(f, "{}", char::from(self.code()));
        }
        let s = match self {
            ThreeToFive => "3'-5'",
            FiveToThree => "5'-3'",
            FiveToFive => "5'-5'",
            ThreeToThree => "3'-3'",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_end_from_coordinates() {
        let fwd = Coordinates { begin: 10, end: 50 };
        let rev = Coordinates { begin: 80, end: 40 };
        let flat = Coordinates { begin: 7, end: 7 };
        assert_eq!(FragmentEnd::from_coordinates(&fwd), FragmentEnd::FivePrime);
        assert_eq!(
            FragmentEnd::from_coordinates(&rev),
            FragmentEnd::ThreePrime
        );
        assert_eq!(
            FragmentEnd::from_coordinates(&flat),
            FragmentEnd::FivePrime
        );
    }

    #[test]
    fn end_labels() {
        assert_eq!(FragmentEnd::from_label("fv"), Some(FragmentEnd::FivePrime));
        assert_eq!(FragmentEnd::from_label("th"), Some(FragmentEnd::ThreePrime));
        assert_eq!(FragmentEnd::from_label("5p"), None);
        assert_eq!(FragmentEnd::ThreePrime.label(), "th");
    }

    #[test]
    fn orientation_codes() {
        use LinkOrientation::*;
        let table = [
            (b'N', ThreeToFive, EdgeColor::Blue),
            (b'A', FiveToThree, EdgeColor::Green),
            (b'O', FiveToFive, EdgeColor::Yellow),
            (b'I', ThreeToThree, EdgeColor::Red),
        ];
        for (code, orient, color) in table.iter() {
            assert_eq!(LinkOrientation::from_code(*code), Some(*orient));
            assert_eq!(orient.code(), *code);
            assert_eq!(orient.base_color(), *color);
        }
        assert_eq!(LinkOrientation::from_code(b'X'), None);
        assert_eq!(LinkOrientation::from_code(b'n'), None);
    }

    #[test]
    fn orientation_from_ends() {
        use FragmentEnd::*;
        assert_eq!(
            LinkOrientation::from_ends(ThreePrime, FivePrime),
            LinkOrientation::ThreeToFive
        );
        assert_eq!(
            LinkOrientation::from_ends(FivePrime, FivePrime),
            LinkOrientation::FiveToFive
        );
    }
}
