//! The two ways of building a [`LinkGraph`]: inferring unit-to-unit
//! edges from the best overlap of each unit's extremities, or reading
//! explicit `{ULK`/`{CLK` link records.

use std::io::BufRead;

use bstr::BString;
use fnv::FnvHashSet;
use log::{debug, info, warn};

use crate::{
    best_edge::{BestEdges, EdgeTarget},
    contig::read_contig_record,
    fields::Tag,
    parser::RecordReader,
    unitig::{read_unit_record, BuildContext, FragmentOwner, Layout},
};

use super::{
    BuildError, BuildResult, EdgeColor, FragmentEnd, GraphSource, LinkEdge,
    LinkGraph, LinkOrientation, Node,
};

/// Builds the graph of committed units, with one edge for every unit
/// extremity whose best edge leads into another committed unit. Node
/// ids are the unit ids of `ctx`.
pub fn from_best_edges(ctx: &BuildContext, best: &BestEdges) -> LinkGraph {
    let mut graph = LinkGraph::new(GraphSource::BestEdges);

    for unit in ctx.units() {
        graph.add_node(Node {
            accession: unit.header.accession.uid.clone(),
            surrogate: unit.header.is_surrogate(),
            length: unit.header.length,
        });
    }

    for (id, unit) in ctx.units().iter().enumerate() {
        let extremities = [
            (&unit.first, FragmentEnd::FivePrime),
            (&unit.last, FragmentEnd::ThreePrime),
        ];

        for &(frag, end) in extremities.iter() {
            let target = match best.get(frag) {
                Some(EdgeTarget::Fragment(target)) => target,
                _ => {
                    debug!("Unit {} {} end {}: no best edge", unit.name(), end, frag);
                    graph.skips.no_edge += 1;
                    continue;
                }
            };

            let other = match ctx.owner(target) {
                Some(FragmentOwner::Unit(other)) => *other,
                Some(FragmentOwner::Discarded(acc)) => {
                    warn!(
                        "Unit {} {} end: best edge to {} in discarded unit {}",
                        unit.name(),
                        end,
                        target,
                        acc
                    );
                    graph.skips.dangling += 1;
                    continue;
                }
                None if ctx.is_singleton(target) => {
                    debug!(
                        "Unit {} {} end: singleton edge to {}",
                        unit.name(),
                        end,
                        target
                    );
                    graph.skips.singleton += 1;
                    continue;
                }
                None => {
                    warn!(
                        "Unit {} {} end: best edge to {} which belongs to no unit",
                        unit.name(),
                        end,
                        target
                    );
                    graph.skips.dangling += 1;
                    continue;
                }
            };

            let (color, orientation) = match ctx.unit(other) {
                Some(o) if &o.first == target => (
                    EdgeColor::BEGIN_TO_BEGIN,
                    Some(LinkOrientation::from_ends(end, FragmentEnd::FivePrime)),
                ),
                Some(o) if &o.last == target => (
                    EdgeColor::END_TO_END,
                    Some(LinkOrientation::from_ends(end, FragmentEnd::ThreePrime)),
                ),
                _ => (EdgeColor::Black, None),
            };

            graph.add_edge(LinkEdge {
                from: id,
                to: other,
                orientation,
                color,
                multiplicity: 1,
                mean_distance: None,
                support: 0,
            });
        }
    }

    info!(
        "Best-edge graph: {} units, {} edges; skipped {} ends without an edge, {} singleton edges, {} dangling edges",
        graph.nodes().len(),
        graph.edges().len(),
        graph.skips.no_edge,
        graph.skips.singleton,
        graph.skips.dangling
    );
    graph
}

/// Which records declare the units of a link graph, which records
/// link them, and which units are too short to keep.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkConfig {
    pub unit_tags: Vec<Tag>,
    pub link_tag: Tag,
    pub endpoints: (Tag, Tag),
    /// Units with a known length below this are left out, along with
    /// their links.
    pub min_length: Option<i64>,
}

impl LinkConfig {
    pub fn unitigs() -> Self {
        LinkConfig {
            unit_tags: vec![Tag::UTG, Tag::IUM],
            link_tag: Tag::ULK,
            endpoints: (Tag::UT1, Tag::UT2),
            min_length: None,
        }
    }

    pub fn contigs() -> Self {
        LinkConfig {
            unit_tags: vec![Tag::CCO],
            link_tag: Tag::CLK,
            endpoints: (Tag::CO1, Tag::CO2),
            min_length: None,
        }
    }

    pub fn with_min_length(mut self, min_length: i64) -> Self {
        self.min_length = Some(min_length);
        self
    }

    fn is_short(&self, node: &Node) -> bool {
        match (self.min_length, node.length) {
            (Some(min), Some(len)) => len < min,
            _ => false,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::unitigs()
    }
}

/// Reads a unit or contig record as a node. The flag is false for
/// units without distinct end fragments (singleton and degenerate
/// units), which stay out of the graph.
fn read_node<R: BufRead>(
    reader: &mut RecordReader<R>,
    tag: Tag,
) -> BuildResult<(Node, bool)> {
    if tag == Tag::CCO {
        let contig = read_contig_record(reader)?;
        let node = Node {
            accession: contig.accession.uid,
            surrogate: false,
            length: contig.length,
        };
        Ok((node, true))
    } else {
        let unit = read_unit_record(reader)?;
        let has_ends = matches!(unit.layout, Layout::Unit(_));
        let node = Node {
            surrogate: unit.header.is_surrogate(),
            length: unit.header.length,
            accession: unit.header.accession.uid,
        };
        Ok((node, has_ends))
    }
}

struct LinkRecord {
    line: usize,
    from: BString,
    to: BString,
    orientation: LinkOrientation,
    mean_distance: f64,
    support: u64,
}

fn read_link_record<R: BufRead>(
    reader: &mut RecordReader<R>,
    config: &LinkConfig,
) -> BuildResult<LinkRecord> {
    let line = reader.line_number();
    let from = reader.read_ident(config.endpoints.0)?;
    let to = reader.read_ident(config.endpoints.1)?;
    let code = reader.read_code(Tag::ORI)?;
    let orientation = LinkOrientation::from_code(code).ok_or(
        BuildError::InvalidOrientationCode {
            code,
            line: reader.line_number(),
        },
    )?;
    let mean_distance = reader.read_float(Tag::MEA)?;
    let support = reader.read_count(Tag::NUM)? as u64;
    Ok(LinkRecord {
        line,
        from,
        to,
        orientation,
        mean_distance,
        support,
    })
}

/// Builds a graph from the unit and link records of one file. Every
/// unit record becomes a node, unless it's shorter than the
/// configured minimum or has no distinct end fragments. Links must
/// refer to units declared earlier in the file; links to a left out
/// unit are skipped.
pub fn from_link_records<R: BufRead>(
    reader: &mut RecordReader<R>,
    config: &LinkConfig,
) -> BuildResult<LinkGraph> {
    let mut graph = LinkGraph::new(GraphSource::Links);
    let mut excluded: FnvHashSet<BString> = FnvHashSet::default();
    let mut singletons: FnvHashSet<BString> = FnvHashSet::default();

    let mut tags = config.unit_tags.clone();
    tags.push(config.link_tag);

    while let Some(tag) = reader.next_record(&tags)? {
        if tag != config.link_tag {
            let (node, has_ends) = read_node(reader, tag)?;
            if !has_ends {
                debug!("Excluding unit {} without distinct end fragments", node.accession);
                singletons.insert(node.accession);
                continue;
            }
            if config.is_short(&node) {
                debug!(
                    "Excluding unit {} of length {:?}",
                    node.accession, node.length
                );
                graph.skips.short_units += 1;
                excluded.insert(node.accession);
                continue;
            }
            if graph.node_id(&node.accession).is_some() {
                return Err(BuildError::DuplicateAccession(node.accession));
            }
            graph.add_node(node);
            continue;
        }

        let link = read_link_record(reader, config)?;
        if singletons.contains(&link.from) || singletons.contains(&link.to) {
            debug!("Skipping link {} - {} to a singleton unit", link.from, link.to);
            graph.skips.singleton += 1;
            continue;
        }
        if excluded.contains(&link.from) || excluded.contains(&link.to) {
            debug!("Skipping link {} - {} to a short unit", link.from, link.to);
            graph.skips.short_links += 1;
            continue;
        }

        let endpoint = |acc: &BString| {
            graph.node_id(acc).ok_or_else(|| BuildError::DanglingEdgeReference {
                accession: acc.clone(),
                line: link.line,
            })
        };
        let from = endpoint(&link.from)?;
        let to = endpoint(&link.to)?;
        graph.add_link(
            from,
            to,
            link.orientation,
            Some(link.mean_distance),
            link.support,
        );
    }

    info!(
        "Link graph: {} units, {} edges; excluded {} singleton links, {} short units and {} of their links",
        graph.nodes().len(),
        graph.edges().len(),
        graph.skips.singleton,
        graph.skips.short_units,
        graph.skips.short_links
    );
    Ok(graph)
}
