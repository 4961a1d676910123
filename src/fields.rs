use bstr::{BString, ByteSlice};

use fnv::FnvHashMap;
use lazy_static::lazy_static;
use regex::bytes::Regex;

use nom::{
    bytes::complete::{is_not, tag},
    character::complete::{digit1, one_of},
    combinator::{all_consuming, map_res, opt, recognize},
    sequence::{delimited, pair, separated_pair},
    IResult,
};

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::parser::error::{ParseFieldError, ParseFieldResult};

/// The fixed-width prefix of a line in a message file. Record
/// openers look like `{IUM`, nested fields like `acc:`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const IUM: Tag = Tag(*b"{IUM");
    pub const UTG: Tag = Tag(*b"{UTG");
    pub const CCO: Tag = Tag(*b"{CCO");
    pub const ULK: Tag = Tag(*b"{ULK");
    pub const CLK: Tag = Tag(*b"{CLK");
    pub const IMP: Tag = Tag(*b"{IMP");
    pub const MPS: Tag = Tag(*b"{MPS");
    pub const UPS: Tag = Tag(*b"{UPS");

    pub const ACC: Tag = Tag(*b"acc:");
    pub const IID: Tag = Tag(*b"iid:");
    pub const STA: Tag = Tag(*b"sta:");
    pub const LEN: Tag = Tag(*b"len:");
    pub const COV: Tag = Tag(*b"cov:");
    pub const NFR: Tag = Tag(*b"nfr:");
    pub const TYP: Tag = Tag(*b"typ:");
    pub const MID: Tag = Tag(*b"mid:");
    pub const CON: Tag = Tag(*b"con:");
    pub const POS: Tag = Tag(*b"pos:");
    pub const PLA: Tag = Tag(*b"pla:");
    pub const NPC: Tag = Tag(*b"npc:");
    pub const NOU: Tag = Tag(*b"nou:");
    pub const LID: Tag = Tag(*b"lid:");
    pub const UT1: Tag = Tag(*b"ut1:");
    pub const UT2: Tag = Tag(*b"ut2:");
    pub const CO1: Tag = Tag(*b"co1:");
    pub const CO2: Tag = Tag(*b"co2:");
    pub const ORI: Tag = Tag(*b"ori:");
    pub const MEA: Tag = Tag(*b"mea:");
    pub const NUM: Tag = Tag(*b"num:");

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True if the line starts with this tag.
    #[inline]
    pub fn matches(&self, line: &[u8]) -> bool {
        line.len() >= 4 && line[..4] == self.0
    }

    /// Returns the tag at the start of the line if it has the shape
    /// of a record opener or a field tag.
    pub fn from_line(line: &[u8]) -> Option<Tag> {
        lazy_static! {
            static ref RE: Regex =
                Regex::new(r"(?-u)^(\{[A-Z]{3}|[a-z0-9]{3}:)").unwrap();
        }
        let m = RE.find(line)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(m.as_bytes());
        Some(Tag(bytes))
    }

    /// The kind of value this tag carries, from the schema table.
    pub fn kind(&self) -> Option<FieldKind> {
        SCHEMA_MAP.get(self).copied()
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_bstr())
    }
}

impl std::fmt::Debug for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tag({})", self.0.as_bstr())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Opens a record; carries no value
    Record,
    Integer,
    Float,
    /// `begin,end`
    Coordinates,
    Identifier,
    /// Either `(uid,iid)` or a bare identifier
    Accession,
    /// A single character
    Code,
}

const SCHEMA: &[(Tag, FieldKind)] = &[
    (Tag::IUM, FieldKind::Record),
    (Tag::UTG, FieldKind::Record),
    (Tag::CCO, FieldKind::Record),
    (Tag::ULK, FieldKind::Record),
    (Tag::CLK, FieldKind::Record),
    (Tag::IMP, FieldKind::Record),
    (Tag::MPS, FieldKind::Record),
    (Tag::UPS, FieldKind::Record),
    (Tag::ACC, FieldKind::Accession),
    (Tag::IID, FieldKind::Integer),
    (Tag::STA, FieldKind::Code),
    (Tag::LEN, FieldKind::Integer),
    (Tag::COV, FieldKind::Float),
    (Tag::NFR, FieldKind::Integer),
    (Tag::TYP, FieldKind::Code),
    (Tag::MID, FieldKind::Identifier),
    (Tag::CON, FieldKind::Integer),
    (Tag::POS, FieldKind::Coordinates),
    (Tag::PLA, FieldKind::Code),
    (Tag::NPC, FieldKind::Integer),
    (Tag::NOU, FieldKind::Integer),
    (Tag::LID, FieldKind::Identifier),
    (Tag::UT1, FieldKind::Identifier),
    (Tag::UT2, FieldKind::Identifier),
    (Tag::CO1, FieldKind::Identifier),
    (Tag::CO2, FieldKind::Identifier),
    (Tag::ORI, FieldKind::Code),
    (Tag::MEA, FieldKind::Float),
    (Tag::NUM, FieldKind::Integer),
];

lazy_static! {
    static ref SCHEMA_MAP: FnvHashMap<Tag, FieldKind> =
        SCHEMA.iter().copied().collect();
}

/// A `pos:` value. Orientation is read off the order of the two
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct Coordinates {
    pub begin: i64,
    pub end: i64,
}

impl Coordinates {
    pub fn is_reversed(&self) -> bool {
        self.end < self.begin
    }
}

/// A record accession. Internal (`{IUM`) records carry a bare
/// integer, external ones `(uid,iid)`; links refer to the uid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accession {
    pub uid: BString,
    pub iid: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Record,
    Int(i64),
    Float(f64),
    Coords(Coordinates),
    Ident(BString),
    Accession(Accession),
    Code(u8),
}

fn parse_signed(input: &[u8]) -> IResult<&[u8], i64> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |bs: &[u8]| {
        bs.to_str()
            .map_err(ParseFieldError::from)
            .and_then(|s| s.parse::<i64>().map_err(ParseFieldError::from))
    })(input)
}

fn parse_coordinates(input: &[u8]) -> IResult<&[u8], Coordinates> {
    let (i, (begin, end)) = all_consuming(separated_pair(
        parse_signed,
        tag(","),
        parse_signed,
    ))(input)?;
    Ok((i, Coordinates { begin, end }))
}

fn parse_external_accession(input: &[u8]) -> IResult<&[u8], Accession> {
    let iid = map_res(digit1, |bs: &[u8]| {
        bs.to_str()
            .map_err(ParseFieldError::from)
            .and_then(|s| s.parse::<u64>().map_err(ParseFieldError::from))
    });
    let (i, (uid, iid)) = all_consuming(delimited(
        tag("("),
        separated_pair(is_not(",)"), tag(","), iid),
        tag(")"),
    ))(input)?;
    Ok((
        i,
        Accession {
            uid: uid.into(),
            iid: Some(iid),
        },
    ))
}

fn parse_identifier(input: &[u8]) -> Option<BString> {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"(?-u)^[!-~]+$").unwrap();
    }
    RE.find(input).map(|s| BString::from(s.as_bytes()))
}

fn parse_accession(input: &[u8]) -> ParseFieldResult<Accession> {
    if input.starts_with(b"(") {
        parse_external_accession(input)
            .map(|(_, acc)| acc)
            .map_err(|_| ParseFieldError::AccessionError)
    } else {
        let uid =
            parse_identifier(input).ok_or(ParseFieldError::AccessionError)?;
        Ok(Accession { uid, iid: None })
    }
}

/// Decode the value of a tagged line according to the kind the
/// schema assigns to the tag. Tags missing from the schema are
/// decoded as identifiers.
pub fn decode(tag: Tag, value: &[u8]) -> ParseFieldResult<FieldValue> {
    use FieldValue::*;
    let value = value.trim_with(|c| c.is_whitespace());
    let kind = tag.kind().unwrap_or(FieldKind::Identifier);
    match kind {
        FieldKind::Record => Ok(Record),
        FieldKind::Integer => {
            let (_, x) = all_consuming(parse_signed)(value)
                .map_err(|_| ParseFieldError::ParseFromStringError)?;
            Ok(Int(x))
        }
        FieldKind::Float => {
            let x = value.to_str()?.parse::<f64>()?;
            Ok(Float(x))
        }
        FieldKind::Coordinates => parse_coordinates(value)
            .map(|(_, c)| Coords(c))
            .map_err(|_| ParseFieldError::CoordinateError),
        FieldKind::Identifier => parse_identifier(value)
            .map(Ident)
            .ok_or(ParseFieldError::ParseFromStringError),
        FieldKind::Accession => {
            parse_accession(value).map(FieldValue::Accession)
        }
        FieldKind::Code => match value {
            [c] => Ok(Code(*c)),
            _ => Err(ParseFieldError::ParseFromStringError),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_from_lines() {
        assert_eq!(Tag::from_line(b"{IUM"), Some(Tag::IUM));
        assert_eq!(Tag::from_line(b"acc:(1234,56)"), Some(Tag::ACC));
        assert_eq!(Tag::from_line(b"}"), None);
        assert_eq!(Tag::from_line(b"ACGTACGT"), None);
    }

    #[test]
    fn decode_by_schema() {
        assert_eq!(decode(Tag::NFR, b"12"), Ok(FieldValue::Int(12)));
        assert_eq!(
            decode(Tag::POS, b"80,40"),
            Ok(FieldValue::Coords(Coordinates { begin: 80, end: 40 }))
        );
        assert_eq!(decode(Tag::ORI, b"N"), Ok(FieldValue::Code(b'N')));
        assert_eq!(decode(Tag::MEA, b"1532.000"), Ok(FieldValue::Float(1532.0)));
        assert_eq!(
            decode(Tag::MID, b"1001\r"),
            Ok(FieldValue::Ident("1001".into()))
        );
    }

    #[test]
    fn decode_accessions() {
        let ext = decode(Tag::ACC, b"(1099511627776,17)").unwrap();
        assert_eq!(
            ext,
            FieldValue::Accession(Accession {
                uid: "1099511627776".into(),
                iid: Some(17),
            })
        );

        let int = decode(Tag::ACC, b"42").unwrap();
        assert_eq!(
            int,
            FieldValue::Accession(Accession {
                uid: "42".into(),
                iid: None,
            })
        );

        assert_eq!(
            decode(Tag::ACC, b"(12,x)"),
            Err(ParseFieldError::AccessionError)
        );
    }

    #[test]
    fn decode_rejects_malformed_values() {
        assert_eq!(
            decode(Tag::POS, b"10;50"),
            Err(ParseFieldError::CoordinateError)
        );
        assert_eq!(
            decode(Tag::NFR, b"3x"),
            Err(ParseFieldError::ParseFromStringError)
        );
        assert_eq!(
            decode(Tag::ORI, b"NA"),
            Err(ParseFieldError::ParseFromStringError)
        );
    }
}
