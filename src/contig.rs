//! `{CCO` contig records: a placed or unplaced contig, the fragments
//! laid out in it, and the unitigs it was built from.

use std::io::BufRead;

use bstr::{BStr, BString, ByteSlice};
use log::info;

use crate::{
    fields::{Accession, FieldValue, Tag},
    parser::{ParseResult, RecordReader},
    unitig::FragmentId,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ContigRecord {
    pub accession: Accession,
    /// `pla:P`
    pub placed: bool,
    pub length: Option<i64>,
    pub fragments: Vec<FragmentId>,
    pub unitigs: Vec<BString>,
}

impl ContigRecord {
    pub fn name(&self) -> &BStr {
        self.accession.uid.as_bstr()
    }
}

/// Reads the body of a contig record whose opening line has just
/// been consumed.
pub fn read_contig_record<R: BufRead>(
    reader: &mut RecordReader<R>,
) -> ParseResult<ContigRecord> {
    let accession = reader.read_accession(Tag::ACC)?;
    let mut placed = false;
    let mut length = None;

    let mut header_tags: &[Tag] = &[Tag::PLA, Tag::LEN, Tag::NPC];
    let fragment_count = loop {
        let tag = reader.scan_in_order(&mut header_tags)?;
        match (tag, reader.decode_current(tag)?) {
            (Tag::PLA, FieldValue::Code(c)) => placed = c == b'P',
            (Tag::LEN, FieldValue::Int(len)) => length = Some(len),
            (Tag::NPC, FieldValue::Int(npc)) if npc >= 0 => break npc as usize,
            _ => return Err(reader.unexpected_value()),
        }
    };

    // Some writers put the unitig count ahead of the fragment
    // blocks, others after them.
    let mut unitig_count = None;
    let mut fragments = Vec::with_capacity(fragment_count);
    while fragments.len() < fragment_count {
        let (tag, _) = reader.scan_to_any(&[Tag::NOU, Tag::MID])?;
        match (tag, reader.decode_current(tag)?) {
            (Tag::NOU, FieldValue::Int(nou)) if nou >= 0 => {
                unitig_count = Some(nou as usize)
            }
            (Tag::MID, FieldValue::Ident(frag)) => fragments.push(frag),
            _ => return Err(reader.unexpected_value()),
        }
    }

    let unitig_count = match unitig_count {
        Some(nou) => nou,
        None => reader.read_count(Tag::NOU)?,
    };
    let mut unitigs = Vec::with_capacity(unitig_count);
    for _ in 0..unitig_count {
        unitigs.push(reader.read_ident(Tag::LID)?);
    }

    Ok(ContigRecord {
        accession,
        placed,
        length,
        fragments,
        unitigs,
    })
}

/// Reads every `{CCO` record of the stream.
pub fn read_contigs<R: BufRead>(
    reader: &mut RecordReader<R>,
) -> ParseResult<Vec<ContigRecord>> {
    let mut contigs = Vec::new();
    while reader.next_record(&[Tag::CCO])?.is_some() {
        contigs.push(read_contig_record(reader)?);
    }
    info!(
        "Read {} contigs, {} placed",
        contigs.len(),
        contigs.iter().filter(|c| c.placed).count()
    );
    Ok(contigs)
}
