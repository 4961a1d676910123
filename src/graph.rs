pub mod build;
pub mod error;
pub mod name_conversion;
pub mod orientation;
pub mod traits;

pub use self::error::*;
pub use self::orientation::*;
pub use self::traits::*;

use bstr::{BStr, BString};
use fnv::FnvHashMap;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::neighborhood::{neighborhood, Subgraph};

use self::name_conversion::NameMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub enum EdgeColor {
    Black,
    Blue,
    Green,
    Yellow,
    Orange,
    Red,
}

impl EdgeColor {
    /// Best-edge link into the other unit's first fragment.
    pub const BEGIN_TO_BEGIN: EdgeColor = EdgeColor::Red;
    /// Best-edge link into the other unit's last fragment.
    pub const END_TO_END: EdgeColor = EdgeColor::Blue;

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeColor::Black => "black",
            EdgeColor::Blue => "blue",
            EdgeColor::Green => "green",
            EdgeColor::Yellow => "yellow",
            EdgeColor::Orange => "orange",
            EdgeColor::Red => "red",
        }
    }

    /// Display color of a link supported by `count` records.
    pub fn from_multiplicity(count: usize) -> Self {
        if count > 15 {
            EdgeColor::Yellow
        } else if count > 11 {
            EdgeColor::Orange
        } else if count > 7 {
            EdgeColor::Red
        } else if count > 4 {
            EdgeColor::Green
        } else if count > 2 {
            EdgeColor::Blue
        } else {
            EdgeColor::Black
        }
    }
}

impl std::fmt::Display for EdgeColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub accession: BString,
    pub surrogate: bool,
    pub length: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkEdge {
    pub from: usize,
    pub to: usize,
    /// Unknown for best edges that land on an interior fragment.
    pub orientation: Option<LinkOrientation>,
    pub color: EdgeColor,
    pub multiplicity: usize,
    pub mean_distance: Option<f64>,
    /// Sum of the `num:` mate counts of every merged link record.
    pub support: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub enum GraphSource {
    BestEdges,
    Links,
}

/// Non-fatal reasons an edge or unit was left out of the graph.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct SkipCounts {
    pub no_edge: usize,
    pub singleton: usize,
    pub dangling: usize,
    pub short_units: usize,
    pub short_links: usize,
}

/// Directed multigraph of units. Node ids are dense and follow the
/// order units were added in.
#[derive(Debug, Clone)]
pub struct LinkGraph {
    source: GraphSource,
    names: NameMap,
    nodes: Vec<Node>,
    edges: Vec<LinkEdge>,
    adjacency: Vec<Vec<usize>>,
    pairs: FnvHashMap<(usize, usize), usize>,
    pub(crate) skips: SkipCounts,
}

impl LinkGraph {
    pub fn new(source: GraphSource) -> Self {
        LinkGraph {
            source,
            names: NameMap::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            adjacency: Vec::new(),
            pairs: FnvHashMap::default(),
            skips: SkipCounts::default(),
        }
    }

    pub fn source(&self) -> GraphSource {
        self.source
    }

    /// Adds a node for the accession, or returns the existing id.
    pub fn add_node(&mut self, node: Node) -> usize {
        let id = self.names.get_or_insert(&node.accession);
        if id == self.nodes.len() {
            self.nodes.push(node);
            self.adjacency.push(Vec::new());
        }
        id
    }

    /// Adds an edge as-is, without merging it with earlier edges
    /// between the same units.
    pub fn add_edge(&mut self, edge: LinkEdge) -> usize {
        let ix = self.edges.len();
        self.adjacency[edge.from].push(edge.to);
        if edge.from != edge.to {
            self.adjacency[edge.to].push(edge.from);
        }
        self.pairs.entry((edge.from, edge.to)).or_insert(ix);
        self.edges.push(edge);
        ix
    }

    /// Records one link between `from` and `to`. The first link of an
    /// ordered pair creates the edge; later ones only add to its
    /// multiplicity and support.
    pub fn add_link(
        &mut self,
        from: usize,
        to: usize,
        orientation: LinkOrientation,
        mean_distance: Option<f64>,
        support: u64,
    ) -> usize {
        if let Some(&ix) = self.pairs.get(&(from, to)) {
            let edge = &mut self.edges[ix];
            edge.multiplicity += 1;
            edge.support += support;
            return ix;
        }
        self.add_edge(LinkEdge {
            from,
            to,
            orientation: Some(orientation),
            color: orientation.base_color(),
            multiplicity: 1,
            mean_distance,
            support,
        })
    }

    pub fn node_id<N: AsRef<[u8]>>(&self, accession: N) -> Option<usize> {
        self.names.map_name(accession)
    }

    pub fn node(&self, id: usize) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn name(&self, id: usize) -> Option<&BStr> {
        self.names.inverse_map_name(id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[LinkEdge] {
        &self.edges
    }

    pub fn edge_between(&self, from: usize, to: usize) -> Option<&LinkEdge> {
        self.pairs.get(&(from, to)).map(|&ix| &self.edges[ix])
    }

    pub fn skips(&self) -> SkipCounts {
        self.skips
    }

    /// The color an edge is drawn with. Best edges keep the color
    /// they were classified with; links are colored by multiplicity.
    pub fn display_color(&self, edge: &LinkEdge) -> EdgeColor {
        match self.source {
            GraphSource::BestEdges => edge.color,
            GraphSource::Links => EdgeColor::from_multiplicity(edge.multiplicity),
        }
    }

    /// The subgraph induced by every unit within `depth` links of the
    /// named one.
    pub fn neighborhood_of<N: AsRef<[u8]>>(
        &self,
        accession: N,
        depth: usize,
    ) -> BuildResult<Subgraph> {
        let accession = accession.as_ref();
        let start = self
            .node_id(accession)
            .ok_or_else(|| BuildError::UnknownUnit(BString::from(accession)))?;
        Ok(neighborhood(self, start, depth))
    }
}

impl Adjacency for LinkGraph {
    fn vertex_count(&self) -> usize {
        self.nodes.len()
    }

    fn neighbors(&self, vertex: usize) -> &[usize] {
        &self.adjacency[vertex]
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn edge_endpoints(&self, edge: usize) -> (usize, usize) {
        let e = &self.edges[edge];
        (e.from, e.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::ByteSlice;

    fn node(acc: &str) -> Node {
        Node {
            accession: acc.into(),
            surrogate: false,
            length: None,
        }
    }

    #[test]
    fn multiplicity_colors() {
        use EdgeColor::*;
        let expected = [
            (1, Black),
            (2, Black),
            (3, Blue),
            (4, Blue),
            (5, Green),
            (7, Green),
            (8, Red),
            (11, Red),
            (12, Orange),
            (15, Orange),
            (16, Yellow),
            (40, Yellow),
        ];
        for (count, color) in expected.iter() {
            assert_eq!(EdgeColor::from_multiplicity(*count), *color, "{}", count);
        }
    }

    #[test]
    fn nodes_are_deduplicated() {
        let mut graph = LinkGraph::new(GraphSource::Links);
        assert_eq!(graph.add_node(node("10")), 0);
        assert_eq!(graph.add_node(node("11")), 1);
        assert_eq!(graph.add_node(node("10")), 0);
        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.name(1), Some("11".as_bytes().as_bstr()));
        assert_eq!(graph.node_id("12"), None);
    }

    #[test]
    fn links_accumulate_per_ordered_pair() {
        let mut graph = LinkGraph::new(GraphSource::Links);
        let a = graph.add_node(node("a"));
        let b = graph.add_node(node("b"));

        let o = LinkOrientation::FiveToThree;
        let first = graph.add_link(a, b, o, Some(250.0), 4);
        assert_eq!(graph.add_link(a, b, LinkOrientation::ThreeToFive, Some(90.0), 2), first);
        let back = graph.add_link(b, a, LinkOrientation::FiveToFive, None, 1);
        assert_ne!(first, back);

        let edge = graph.edge_between(a, b).unwrap();
        assert_eq!(edge.multiplicity, 2);
        assert_eq!(edge.support, 6);
        assert_eq!(edge.orientation, Some(o));
        assert_eq!(edge.color, EdgeColor::Green);
        assert_eq!(edge.mean_distance, Some(250.0));
        assert_eq!(graph.display_color(edge), EdgeColor::Black);

        assert_eq!(graph.neighbors(a), &[b, b]);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn best_edge_colors_are_kept() {
        let mut graph = LinkGraph::new(GraphSource::BestEdges);
        let a = graph.add_node(node("a"));
        let ix = graph.add_edge(LinkEdge {
            from: a,
            to: a,
            orientation: None,
            color: EdgeColor::BEGIN_TO_BEGIN,
            multiplicity: 1,
            mean_distance: None,
            support: 0,
        });
        assert_eq!(graph.display_color(&graph.edges()[ix]), EdgeColor::Red);
        assert_eq!(graph.neighbors(a), &[a]);
    }

    #[test]
    fn neighborhood_of_unknown_unit() {
        let mut graph = LinkGraph::new(GraphSource::Links);
        graph.add_node(node("a"));
        assert!(graph.neighborhood_of("a", 1).is_ok());
        match graph.neighborhood_of("z", 1) {
            Err(BuildError::UnknownUnit(acc)) => assert_eq!(acc, "z"),
            other => panic!("expected unknown unit, got {:?}", other),
        }
    }
}
