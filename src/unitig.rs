//! Reconstructs units from `{IUM`/`{UTG` records: which fragments
//! sit at the two extremities, which are interior, and which end of
//! each placed fragment faces outward.

use std::io::BufRead;

use bstr::{BStr, BString, ByteSlice};
use fnv::{FnvHashMap, FnvHashSet};
use log::{debug, info};

use crate::{
    fields::{Accession, FieldValue, Tag},
    graph::{
        name_conversion::NameMap, BuildError, BuildResult, FragmentEnd,
    },
    parser::RecordReader,
};

pub type FragmentId = BString;

/// What to do with the first fragment of a unit whose every other
/// fragment is contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegeneratePolicy {
    /// Forget the unit and all of its fragments.
    Purge,
    /// Forget the unit, but leave its first fragment registered to
    /// the discarded accession. Edges reaching it are reported as
    /// dangling.
    KeepFirstFragment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitigConfig {
    pub degenerate: DegeneratePolicy,
}

impl Default for UnitigConfig {
    fn default() -> Self {
        UnitigConfig {
            degenerate: DegeneratePolicy::Purge,
        }
    }
}

impl UnitigConfig {
    pub fn keep_first_fragment() -> Self {
        UnitigConfig {
            degenerate: DegeneratePolicy::KeepFirstFragment,
        }
    }
}

/// The fields of a unit record that precede its fragment list.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitHeader {
    pub accession: Accession,
    pub status: Option<u8>,
    pub length: Option<i64>,
    pub fragment_count: usize,
}

impl UnitHeader {
    pub fn name(&self) -> &BStr {
        self.accession.uid.as_bstr()
    }

    /// Surrogate (repeat-derived) units have status `S`.
    pub fn is_surrogate(&self) -> bool {
        self.status == Some(b'S')
    }
}

/// A unit with well-defined first and last fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub header: UnitHeader,
    pub first: FragmentId,
    pub last: FragmentId,
    pub internal: FnvHashSet<FragmentId>,
    pub orientation: FnvHashMap<FragmentId, FragmentEnd>,
}

impl Unit {
    pub fn name(&self) -> &BStr {
        self.header.name()
    }

    /// All non-contained fragments, first and last included.
    pub fn fragments(&self) -> impl Iterator<Item = &'_ FragmentId> {
        std::iter::once(&self.first)
            .chain(self.internal.iter())
            .chain(std::iter::once(&self.last))
    }
}

/// The result of reading one unit record.
#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    /// `nfr == 1`; the only fragment.
    Singleton(FragmentId),
    /// Every fragment after the first is contained.
    Degenerate(FragmentId),
    Unit(Unit),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitRecord {
    pub header: UnitHeader,
    pub layout: Layout,
}

/// Reads the body of a unit record whose opening line has just been
/// consumed.
pub fn read_unit_record<R: BufRead>(
    reader: &mut RecordReader<R>,
) -> BuildResult<UnitRecord> {
    let accession = reader.read_accession(Tag::ACC)?;
    let mut header = UnitHeader {
        accession,
        status: None,
        length: None,
        fragment_count: 0,
    };

    // Not every producer writes iid/sta/len, so pick up whichever of
    // them appear before the fragment count.
    let mut header_tags: &[Tag] = &[Tag::IID, Tag::STA, Tag::LEN, Tag::NFR];
    loop {
        let tag = reader.scan_in_order(&mut header_tags)?;
        match (tag, reader.decode_current(tag)?) {
            (Tag::IID, FieldValue::Int(iid)) => {
                if header.accession.iid.is_none() && iid >= 0 {
                    header.accession.iid = Some(iid as u64);
                }
            }
            (Tag::STA, FieldValue::Code(c)) => header.status = Some(c),
            (Tag::LEN, FieldValue::Int(len)) => header.length = Some(len),
            (Tag::NFR, FieldValue::Int(nfr)) if nfr > 0 => {
                header.fragment_count = nfr as usize;
                break;
            }
            _ => return Err(reader.unexpected_value().into()),
        }
    }

    let first = reader.read_ident(Tag::MID)?;
    if header.fragment_count == 1 {
        return Ok(UnitRecord {
            header,
            layout: Layout::Singleton(first),
        });
    }

    let mut orientation = FnvHashMap::default();
    let first_pos = reader.read_coords(Tag::POS)?;
    orientation.insert(first.clone(), FragmentEnd::from_coordinates(&first_pos));

    let mut seen: FnvHashSet<FragmentId> = FnvHashSet::default();
    seen.insert(first.clone());
    let mut internal: FnvHashSet<FragmentId> = FnvHashSet::default();
    let mut last: Option<FragmentId> = None;

    for _ in 1..header.fragment_count {
        let frag = reader.read_ident(Tag::MID)?;
        if !seen.insert(frag.clone()) {
            return Err(BuildError::DuplicateFragmentInUnit {
                unit: header.accession.uid.clone(),
                fragment: frag,
            });
        }

        // `{UTG` fragment blocks carry no containment flag
        let mut contained = false;
        let pos = loop {
            let (tag, _) = reader.scan_to_any(&[Tag::CON, Tag::POS])?;
            match reader.decode_current(tag)? {
                FieldValue::Int(con) => contained = con != 0,
                FieldValue::Coords(pos) => break pos,
                _ => return Err(reader.unexpected_value().into()),
            }
        };

        if contained {
            continue;
        }
        orientation.insert(frag.clone(), FragmentEnd::from_coordinates(&pos));
        internal.insert(frag.clone());
        last = Some(frag);
    }

    let layout = match last {
        None => Layout::Degenerate(first),
        Some(last) => {
            internal.remove(&last);
            Layout::Unit(Unit {
                header: header.clone(),
                first,
                last,
                internal,
                orientation,
            })
        }
    };

    Ok(UnitRecord { header, layout })
}

/// Who a fragment belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentOwner {
    /// A committed unit, by graph id.
    Unit(usize),
    /// A unit that was read but left out of the index.
    Discarded(BString),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub records: usize,
    pub committed: usize,
    pub singletons: usize,
    pub degenerate: usize,
}

/// The unit index together with the fragment lookup tables derived
/// from it. Built once, then shared read-only by the best-edge
/// resolver and the graph builders.
#[derive(Debug, Clone)]
pub struct BuildContext {
    config: UnitigConfig,
    units: Vec<Unit>,
    names: NameMap,
    owners: FnvHashMap<FragmentId, FragmentOwner>,
    orientation: FnvHashMap<FragmentId, FragmentEnd>,
    singletons: FnvHashSet<FragmentId>,
    stats: BuildStats,
}

impl BuildContext {
    pub fn new(config: UnitigConfig) -> Self {
        BuildContext {
            config,
            units: Vec::new(),
            names: NameMap::new(),
            owners: FnvHashMap::default(),
            orientation: FnvHashMap::default(),
            singletons: FnvHashSet::default(),
            stats: BuildStats::default(),
        }
    }

    /// Reads every `{IUM`/`{UTG` record of the stream, ignoring
    /// records of any other type.
    pub fn from_reader<R: BufRead>(
        reader: &mut RecordReader<R>,
        config: UnitigConfig,
    ) -> BuildResult<Self> {
        let mut ctx = BuildContext::new(config);
        while reader.next_record(&[Tag::IUM, Tag::UTG])?.is_some() {
            let record = read_unit_record(reader)?;
            ctx.add_record(record)?;
        }
        info!(
            "Read {} unit records: {} committed, {} singletons, {} degenerate",
            ctx.stats.records,
            ctx.stats.committed,
            ctx.stats.singletons,
            ctx.stats.degenerate
        );
        Ok(ctx)
    }

    pub fn from_path<P: AsRef<std::path::Path>>(
        path: P,
        config: UnitigConfig,
    ) -> BuildResult<Self> {
        info!("Reading units from {}", path.as_ref().display());
        let mut reader = RecordReader::from_path(path)?;
        Self::from_reader(&mut reader, config)
    }

    pub fn add_record(&mut self, record: UnitRecord) -> BuildResult<()> {
        self.stats.records += 1;
        let name = record.header.accession.uid;
        match record.layout {
            Layout::Singleton(frag) => {
                debug!("Skipping singleton unit {}", name);
                self.stats.singletons += 1;
                self.singletons.insert(frag);
            }
            Layout::Degenerate(first) => {
                debug!("Skipping unit {}, all but its first fragment are contained", name);
                self.stats.degenerate += 1;
                if self.config.degenerate == DegeneratePolicy::KeepFirstFragment {
                    self.owners.insert(first, FragmentOwner::Discarded(name));
                }
            }
            Layout::Unit(unit) => {
                if self.names.map_name(&name).is_some() {
                    return Err(BuildError::DuplicateAccession(name));
                }
                let id = self.names.get_or_insert(&name);
                debug_assert_eq!(id, self.units.len());
                for frag in unit.fragments() {
                    let prev =
                        self.owners.insert(frag.clone(), FragmentOwner::Unit(id));
                    if let Some(FragmentOwner::Unit(prev)) = prev {
                        debug!(
                            "Fragment {} moves from unit {} to unit {}",
                            frag, self.units[prev].name(), name
                        );
                    }
                }
                for (frag, end) in unit.orientation.iter() {
                    self.orientation.insert(frag.clone(), *end);
                }
                self.stats.committed += 1;
                self.units.push(unit);
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Committed units, in input order; a unit's index is its id.
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, id: usize) -> Option<&Unit> {
        self.units.get(id)
    }

    pub fn unit_id<N: AsRef<[u8]>>(&self, name: N) -> Option<usize> {
        self.names.map_name(name)
    }

    pub fn owner<N: AsRef<[u8]>>(&self, frag: N) -> Option<&FragmentOwner> {
        self.owners.get(frag.as_ref().as_bstr())
    }

    pub fn orientation<N: AsRef<[u8]>>(&self, frag: N) -> Option<FragmentEnd> {
        self.orientation.get(frag.as_ref().as_bstr()).copied()
    }

    pub fn is_singleton<N: AsRef<[u8]>>(&self, frag: N) -> bool {
        self.singletons.contains(frag.as_ref().as_bstr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn imp(mid: &str, con: u8, pos: (i64, i64)) -> String {
        format!(
            "{{IMP\ntyp:R\nmid:{}\ncon:{}\npos:{},{}\ndln:0\ndel:\n}}\n",
            mid, con, pos.0, pos.1
        )
    }

    fn ium(acc: &str, frags: &[String]) -> String {
        let mut s = format!(
            "{{IUM\nacc:{}\ncov:0.000\nsta:U\nfur:X\nabp:0\nbbp:0\nlen:900\ncns:\nACGT\n.\nqlt:\nXXXX\n.\nfor:0\nnfr:{}\n",
            acc,
            frags.len()
        );
        for f in frags {
            s.push_str(f);
        }
        s.push_str("}\n");
        s
    }

    fn build(input: &str, config: UnitigConfig) -> BuildResult<BuildContext> {
        let mut reader = RecordReader::new(Cursor::new(input.as_bytes()));
        BuildContext::from_reader(&mut reader, config)
    }

    #[test]
    fn contained_fragments_are_dropped() {
        let input = ium(
            "7",
            &[imp("A", 0, (10, 50)), imp("B", 1, (20, 30)), imp("C", 0, (80, 40))],
        );
        let ctx = build(&input, UnitigConfig::default()).unwrap();
        assert_eq!(ctx.units().len(), 1);

        let unit = &ctx.units()[0];
        assert_eq!(unit.name(), "7");
        assert_eq!(unit.header.length, Some(900));
        assert_eq!(unit.header.status, Some(b'U'));
        assert_eq!(unit.first, "A");
        assert_eq!(unit.last, "C");
        assert!(unit.internal.is_empty());
        assert_eq!(ctx.orientation("A"), Some(FragmentEnd::FivePrime));
        assert_eq!(ctx.orientation("C"), Some(FragmentEnd::ThreePrime));
        assert_eq!(ctx.orientation("B"), None);
        assert_eq!(ctx.owner("B"), None);
        assert_eq!(ctx.owner("C"), Some(&FragmentOwner::Unit(0)));
    }

    #[test]
    fn internal_fragments_account_for_every_placed_fragment() {
        let frags = [
            imp("1", 0, (700, 0)),
            imp("2", 0, (100, 800)),
            imp("3", 1, (150, 300)),
            imp("4", 0, (200, 950)),
            imp("5", 0, (990, 300)),
            imp("6", 1, (400, 500)),
        ];
        let ctx = build(&ium("9", &frags), UnitigConfig::default()).unwrap();
        let unit = &ctx.units()[0];

        let contained = 2;
        assert_eq!(unit.internal.len() + 2, frags.len() - contained);
        assert_ne!(unit.first, unit.last);
        assert!(!unit.internal.contains(&unit.first));
        assert!(!unit.internal.contains(&unit.last));
        assert_eq!(unit.last, "5");
        assert!(unit.internal.contains(&BString::from("2")));
        assert!(unit.internal.contains(&BString::from("4")));
        assert_eq!(ctx.orientation("1"), Some(FragmentEnd::ThreePrime));
        assert_eq!(ctx.orientation("2"), Some(FragmentEnd::FivePrime));
    }

    #[test]
    fn singletons_are_excluded() {
        let input = ium("3", &[imp("301", 0, (0, 400))]);
        let ctx = build(&input, UnitigConfig::default()).unwrap();
        assert!(ctx.units().is_empty());
        assert!(ctx.is_singleton("301"));
        assert_eq!(ctx.owner("301"), None);
        assert_eq!(ctx.stats().singletons, 1);
    }

    #[test]
    fn degenerate_units_follow_policy() {
        let input = ium("4", &[imp("401", 0, (0, 500)), imp("402", 1, (10, 200))]);

        let purged = build(&input, UnitigConfig::default()).unwrap();
        assert!(purged.units().is_empty());
        assert_eq!(purged.owner("401"), None);
        assert_eq!(purged.owner("402"), None);
        assert_eq!(purged.stats().degenerate, 1);

        let kept = build(&input, UnitigConfig::keep_first_fragment()).unwrap();
        assert!(kept.units().is_empty());
        assert_eq!(
            kept.owner("401"),
            Some(&FragmentOwner::Discarded("4".into()))
        );
        assert_eq!(kept.owner("402"), None);
    }

    #[test]
    fn duplicate_fragment_is_fatal() {
        let input = ium(
            "5",
            &[imp("A", 0, (0, 10)), imp("B", 0, (5, 20)), imp("A", 0, (9, 30))],
        );
        match build(&input, UnitigConfig::default()) {
            Err(BuildError::DuplicateFragmentInUnit { unit, fragment }) => {
                assert_eq!(unit, "5");
                assert_eq!(fragment, "A");
            }
            other => panic!("expected duplicate fragment, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_first_fragment_is_fatal() {
        let input = ium("6", &[imp("A", 0, (0, 10)), imp("A", 0, (5, 20))]);
        assert!(matches!(
            build(&input, UnitigConfig::default()),
            Err(BuildError::DuplicateFragmentInUnit { .. })
        ));
    }

    #[test]
    fn utg_records_without_containment() {
        let input = "{UTG\nacc:(1000,1)\nsrc:\n.\ncov:1.000\nsta:S\nabp:0\nbbp:0\nlen:4000\ncns:\n.\nqlt:\n.\nfor:0\nnfr:2\n\
{MPS\ntyp:R\nmid:11\npos:0,2000\ndln:0\ndel:\n}\n\
{MPS\ntyp:R\nmid:12\npos:3900,1500\ndln:0\ndel:\n}\n}\n";
        let ctx = build(input, UnitigConfig::default()).unwrap();
        let unit = &ctx.units()[0];
        assert_eq!(unit.name(), "1000");
        assert_eq!(unit.header.accession.iid, Some(1));
        assert!(unit.header.is_surrogate());
        assert_eq!(unit.first, "11");
        assert_eq!(unit.last, "12");
        assert_eq!(ctx.unit_id("1000"), Some(0));
    }

    #[test]
    fn quality_line_shaped_like_a_header_field() {
        let input = "{IUM\nacc:12\niid:3\ncov:0.000\nsta:U\nlen:800\ncns:\nACGT\n.\nqlt:\niid:llllllllllllllll\n.\nfor:0\nnfr:2\n"
            .to_string()
            + &imp("A", 0, (0, 500))
            + &imp("B", 0, (300, 800))
            + "}\n";
        let ctx = build(&input, UnitigConfig::default()).unwrap();
        assert_eq!(ctx.units().len(), 1);
        let unit = &ctx.units()[0];
        assert_eq!(unit.header.accession.iid, Some(3));
        assert_eq!(unit.header.length, Some(800));
        assert_eq!(unit.first, "A");
        assert_eq!(unit.last, "B");
    }

    #[test]
    fn truncated_record_is_end_of_stream() {
        let input = "{IUM\nacc:8\nnfr:2\n{IMP\nmid:1\ncon:0\npos:0,10\n}\n";
        match build(input, UnitigConfig::default()) {
            Err(BuildError::Parse(err)) => assert!(err.is_end_of_stream()),
            other => panic!("expected end of stream, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_accession_is_fatal() {
        let unit = ium("2", &[imp("A", 0, (0, 10)), imp("B", 0, (5, 20))]);
        let other = ium("2", &[imp("C", 0, (0, 10)), imp("D", 0, (5, 20))]);
        let input = format!("{}{}", unit, other);
        assert!(matches!(
            build(&input, UnitigConfig::default()),
            Err(BuildError::DuplicateAccession(_))
        ));
    }
}
