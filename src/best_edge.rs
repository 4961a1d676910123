//! Best overlap edges per fragment end.
//!
//! A best-edge table has one whitespace-delimited line per fragment,
//! holding two independent overlap evaluations, each anchored at one
//! end label:
//!
//! ```text
//! frag  fv s s s status c c c  th s s s status c c c
//! ```
//!
//! Normalizing a line leaves one candidate per end label, and the
//! orientation the unit index recorded for the fragment decides which
//! one is its best edge.

use std::io::BufRead;

use bstr::{io::BufReadExt, BStr, BString, ByteSlice};
use fnv::FnvHashMap;
use log::{debug, info};

use crate::{
    graph::{BuildError, BuildResult, FragmentEnd},
    parser::{ParseError, ParseFieldError, ParseFieldResult},
    unitig::{BuildContext, FragmentId},
};

const LINE_FIELDS: usize = 17;

/// Where a best edge leads. The table writes `0` for "no edge".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeTarget {
    NoEdge,
    Fragment(FragmentId),
}

impl EdgeTarget {
    pub fn from_bytes<T: AsRef<[u8]>>(bs: T) -> Self {
        match bs.as_ref() {
            b"0" => EdgeTarget::NoEdge,
            other => EdgeTarget::Fragment(other.into()),
        }
    }

    pub fn fragment(&self) -> Option<&BStr> {
        match self {
            EdgeTarget::NoEdge => None,
            EdgeTarget::Fragment(frag) => Some(frag.as_bstr()),
        }
    }
}

/// One of the two overlap evaluations on a best-edge line.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub label: BString,
    pub best: bool,
    pub candidates: [BString; 3],
}

impl Evaluation {
    fn parse(fields: &[&[u8]]) -> Self {
        Evaluation {
            label: fields[0].into(),
            best: fields[4] == b"best",
            candidates: [fields[5].into(), fields[6].into(), fields[7].into()],
        }
    }

    pub fn end(&self) -> Option<FragmentEnd> {
        FragmentEnd::from_label(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BestEdgeLine {
    pub fragment: FragmentId,
    pub evaluations: [Evaluation; 2],
}

impl BestEdgeLine {
    pub fn parse(line: &[u8]) -> ParseFieldResult<Self> {
        let fields: Vec<&[u8]> = line.fields().collect();
        if fields.len() != LINE_FIELDS {
            return Err(ParseFieldError::MissingFields);
        }
        Ok(BestEdgeLine {
            fragment: fields[0].into(),
            evaluations: [
                Evaluation::parse(&fields[1..9]),
                Evaluation::parse(&fields[9..17]),
            ],
        })
    }

    /// The candidate left for each end label once the "best" flags
    /// are applied. Each evaluation is read through its middle
    /// candidate. If the first evaluation is best, its candidate
    /// moves to the second label and the first label is left with no
    /// edge. If the second is best, only its own middle candidate
    /// survives, for the second label.
    pub fn slots(&self) -> [(Option<FragmentEnd>, EdgeTarget); 2] {
        let [first, second] = &self.evaluations;
        let mut slot_first = EdgeTarget::from_bytes(&first.candidates[1]);
        let mut slot_second = EdgeTarget::from_bytes(&second.candidates[1]);

        if first.best {
            slot_second = EdgeTarget::from_bytes(&first.candidates[1]);
            slot_first = EdgeTarget::NoEdge;
        }
        if second.best {
            slot_second = EdgeTarget::from_bytes(&second.candidates[1]);
        }

        [(first.end(), slot_first), (second.end(), slot_second)]
    }

    /// Picks the candidate whose end label matches the orientation
    /// recorded for the fragment.
    pub fn resolve(&self, orientation: FragmentEnd) -> BuildResult<EdgeTarget> {
        let [first, second] = self.slots();
        if first.0 == Some(orientation) {
            Ok(first.1)
        } else if second.0 == Some(orientation) {
            Ok(second.1)
        } else {
            Err(BuildError::UnresolvableEdge {
                fragment: self.fragment.clone(),
                end: orientation,
            })
        }
    }
}

/// The resolved best edge of every fragment the unit index knows an
/// orientation for.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BestEdges {
    edges: FnvHashMap<FragmentId, EdgeTarget>,
}

impl BestEdges {
    pub fn from_reader<R: BufRead>(
        reader: R,
        ctx: &BuildContext,
    ) -> BuildResult<Self> {
        let mut edges = FnvHashMap::default();
        let mut skipped = 0usize;

        for (ix, line) in reader.byte_lines().enumerate() {
            let line = line?;
            let trimmed = line.trim_with(|c| c.is_whitespace());
            if trimmed.is_empty() || trimmed.starts_with(b"#") {
                continue;
            }

            // Lines for fragments outside the unit index are skipped
            // without being checked.
            let fragment = trimmed.fields().next().unwrap_or_default();
            let orientation = match ctx.orientation(fragment) {
                Some(o) => o,
                None => {
                    skipped += 1;
                    continue;
                }
            };
            let parsed = BestEdgeLine::parse(trimmed).map_err(|err| {
                ParseError::invalid_line(err, ix + 1, trimmed)
            })?;
            let target = parsed.resolve(orientation)?;
            debug!("Best edge {} {} -> {:?}", parsed.fragment, orientation, target);
            edges.insert(parsed.fragment, target);
        }

        info!(
            "Resolved {} best edges, skipped {} lines for fragments outside the unit index",
            edges.len(),
            skipped
        );
        Ok(BestEdges { edges })
    }

    pub fn from_path<P: AsRef<std::path::Path>>(
        path: P,
        ctx: &BuildContext,
    ) -> BuildResult<Self> {
        use std::{fs::File, io::BufReader};
        info!("Reading best edges from {}", path.as_ref().display());
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file), ctx)
    }

    pub fn get<N: AsRef<[u8]>>(&self, frag: N) -> Option<&EdgeTarget> {
        self.edges.get(frag.as_ref().as_bstr())
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
