use crate::{
    contig::ContigRecord,
    graph::{GraphSource, LinkEdge, LinkGraph},
    neighborhood::Subgraph,
    unitig::Unit,
};
use std::fmt::Write;

/// The nodes and edges to export: a whole graph, or one of its
/// subgraphs.
fn selection(
    graph: &LinkGraph,
    subgraph: Option<&Subgraph>,
) -> (Vec<usize>, Vec<usize>) {
    match subgraph {
        Some(sub) => (sub.vertices.clone(), sub.edges.clone()),
        None => ((0..graph.nodes().len()).collect(), (0..graph.edges().len()).collect()),
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// The label drawn on an edge. Links show their orientation, how
/// many records support them, and the mean distance if known.
pub fn edge_label(graph: &LinkGraph, edge: &LinkEdge) -> String {
    let mut label = String::new();
    if let Some(orient) = edge.orientation {
        let _ = write!(label, "{}", orient);
    }
    if graph.source() == GraphSource::Links {
        let _ = write!(label, " x{}", edge.multiplicity);
        if let Some(dist) = edge.mean_distance {
            let _ = write!(label, " ({:.0})", dist);
        }
    }
    label
}

// Write graph as dot
pub fn write_dot<T: Write>(
    graph: &LinkGraph,
    subgraph: Option<&Subgraph>,
    stream: &mut T,
) -> std::fmt::Result {
    let (nodes, edges) = selection(graph, subgraph);

    writeln!(stream, "digraph units {{")?;
    for id in nodes {
        let node = match graph.node(id) {
            Some(node) => node,
            None => continue,
        };
        let shape = if node.surrogate { "triangle" } else { "ellipse" };
        writeln!(
            stream,
            "    n{} [label=\"{}\", shape={}];",
            id,
            escape(&node.accession.to_string()),
            shape
        )?;
    }
    for ix in edges {
        let edge = &graph.edges()[ix];
        writeln!(
            stream,
            "    n{} -> n{} [color={}, label=\"{}\"];",
            edge.from,
            edge.to,
            graph.display_color(edge),
            escape(&edge_label(graph, edge))
        )?;
    }
    writeln!(stream, "}}")
}

pub fn dot_string(graph: &LinkGraph, subgraph: Option<&Subgraph>) -> String {
    let mut result = String::new();
    // writing to a String can't fail
    let _ = write_dot(graph, subgraph, &mut result);
    result
}

// Write unit summary
pub fn write_unit<T: Write>(unit: &Unit, stream: &mut T) -> std::fmt::Result {
    write!(
        stream,
        "{}\t{}\t{}\t{}\t{}",
        unit.name(),
        unit.header.fragment_count,
        unit.first,
        unit.last,
        unit.internal.len()
    )
}

pub fn unit_string(unit: &Unit) -> String {
    let mut result = String::new();
    let _ = write_unit(unit, &mut result);
    result
}

// Write edge summary
pub fn write_edge<T: Write>(
    graph: &LinkGraph,
    edge: &LinkEdge,
    stream: &mut T,
) -> std::fmt::Result {
    let name = |id| graph.name(id).map(|n| n.to_string()).unwrap_or_default();
    write!(stream, "{}\t{}\t{}\t", name(edge.from), name(edge.to), graph.display_color(edge))?;
    match edge.orientation {
        Some(orient) => write!(stream, "{:#}", orient)?,
        None => write!(stream, "*")?,
    }
    write!(stream, "\t{}", edge.multiplicity)
}

pub fn edge_string(graph: &LinkGraph, edge: &LinkEdge) -> String {
    let mut result = String::new();
    let _ = write_edge(graph, edge, &mut result);
    result
}

// Write contig summary
pub fn write_contig<T: Write>(
    contig: &ContigRecord,
    stream: &mut T,
) -> std::fmt::Result {
    write!(stream, "{}\t{}\t", contig.name(), if contig.placed { 'P' } else { 'U' })?;
    match contig.length {
        Some(len) => write!(stream, "{}", len)?,
        None => write!(stream, "*")?,
    }
    write!(stream, "\t{}\t{}", contig.fragments.len(), contig.unitigs.len())
}

pub fn contig_string(contig: &ContigRecord) -> String {
    let mut result = String::new();
    let _ = write_contig(contig, &mut result);
    result
}

/// Runs graphviz `dot` on a dot file, writing an image in the given
/// format to `out`.
pub fn render<P, Q>(dot: P, format: &str, out: Q) -> std::io::Result<()>
where
    P: AsRef<std::path::Path>,
    Q: AsRef<std::path::Path>,
{
    use std::io::{Error, ErrorKind};
    use std::process::Command;

    let status = Command::new("dot")
        .arg(format!("-T{}", format))
        .arg("-o")
        .arg(out.as_ref())
        .arg(dot.as_ref())
        .status()?;
    if !status.success() {
        return Err(Error::new(
            ErrorKind::Other,
            format!("dot exited with {}", status),
        ));
    }
    Ok(())
}

#[cfg(feature = "serde1")]
mod json {
    use serde::Serialize;

    use crate::graph::{EdgeColor, GraphSource, LinkGraph, LinkOrientation, SkipCounts};

    #[derive(Serialize)]
    pub(super) struct JsonNode {
        id: usize,
        accession: String,
        surrogate: bool,
        length: Option<i64>,
    }

    #[derive(Serialize)]
    pub(super) struct JsonEdge {
        from: usize,
        to: usize,
        orientation: Option<LinkOrientation>,
        color: EdgeColor,
        display_color: EdgeColor,
        multiplicity: usize,
        mean_distance: Option<f64>,
        support: u64,
    }

    #[derive(Serialize)]
    pub(super) struct JsonGraph {
        source: GraphSource,
        nodes: Vec<JsonNode>,
        edges: Vec<JsonEdge>,
        skips: SkipCounts,
    }

    impl JsonGraph {
        pub(super) fn new(graph: &LinkGraph, nodes: &[usize], edges: &[usize]) -> Self {
            let nodes = nodes
                .iter()
                .filter_map(|&id| {
                    let node = graph.node(id)?;
                    Some(JsonNode {
                        id,
                        accession: node.accession.to_string(),
                        surrogate: node.surrogate,
                        length: node.length,
                    })
                })
                .collect();
            let edges = edges
                .iter()
                .map(|&ix| {
                    let e = &graph.edges()[ix];
                    JsonEdge {
                        from: e.from,
                        to: e.to,
                        orientation: e.orientation,
                        color: e.color,
                        display_color: graph.display_color(e),
                        multiplicity: e.multiplicity,
                        mean_distance: e.mean_distance,
                        support: e.support,
                    }
                })
                .collect();
            JsonGraph {
                source: graph.source(),
                nodes,
                edges,
                skips: graph.skips(),
            }
        }
    }
}

/// Dump a graph, or one of its subgraphs, as JSON.
#[cfg(feature = "serde1")]
pub fn write_json<W: std::io::Write>(
    graph: &LinkGraph,
    subgraph: Option<&Subgraph>,
    writer: W,
) -> serde_json::Result<()> {
    let (nodes, edges) = selection(graph, subgraph);
    let json = json::JsonGraph::new(graph, &nodes, &edges);
    serde_json::to_writer_pretty(writer, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeColor, LinkOrientation, Node};
    use crate::unitig::{BuildContext, UnitigConfig};

    fn sample() -> LinkGraph {
        let mut graph = LinkGraph::new(GraphSource::Links);
        for (acc, surrogate) in &[("1000", false), ("1002", true), ("1003", false)] {
            graph.add_node(Node {
                accession: (*acc).into(),
                surrogate: *surrogate,
                length: Some(5000),
            });
        }
        for _ in 0..3 {
            graph.add_link(0, 1, LinkOrientation::FiveToThree, Some(850.0), 2);
        }
        graph.add_link(1, 2, LinkOrientation::ThreeToThree, None, 1);
        graph
    }

    #[test]
    fn print_dot() {
        let graph = sample();
        let dot = dot_string(&graph, None);
        let expected = "digraph units {
    n0 [label=\"1000\", shape=ellipse];
    n1 [label=\"1002\", shape=triangle];
    n2 [label=\"1003\", shape=ellipse];
    n0 -> n1 [color=blue, label=\"5'-3' x3 (850)\"];
    n1 -> n2 [color=black, label=\"3'-3' x1\"];
}
";
        assert_eq!(dot, expected);
    }

    #[test]
    fn print_dot_subgraph() {
        let graph = sample();
        let sub = graph.neighborhood_of("1000", 0).unwrap();
        let dot = dot_string(&graph, Some(&sub));
        assert!(dot.contains("n0 [label=\"1000\""));
        assert!(!dot.contains("n1 ["));
        assert!(!dot.contains("->"));
    }

    #[test]
    fn print_edges() {
        let graph = sample();
        let lines: Vec<_> =
            graph.edges().iter().map(|e| edge_string(&graph, e)).collect();
        assert_eq!(lines, vec!["1000\t1002\tblue\tA\t3", "1002\t1003\tblack\tI\t1"]);
    }

    #[test]
    fn best_edge_labels() {
        let ctx = BuildContext::from_path("./test/asm/small.asm", UnitigConfig::default())
            .unwrap();
        let best = crate::best_edge::BestEdges::from_path("./test/asm/small.best", &ctx)
            .unwrap();
        let graph = crate::graph::build::from_best_edges(&ctx, &best);

        let dot = dot_string(&graph, None);
        assert!(dot.contains("n0 -> n1 [color=red, label=\"5'-5'\"];"));
        assert!(dot.contains("n0 -> n1 [color=blue, label=\"3'-3'\"];"));
        assert!(dot.contains("n2 -> n2 [color=black, label=\"\"];"));
        assert!(dot.contains("n2 [label=\"5\", shape=triangle];"));

        assert_eq!(graph.display_color(&graph.edges()[0]), EdgeColor::Red);
        assert_eq!(edge_string(&graph, &graph.edges()[2]), "5\t5\tblack\t*\t1");
    }

    #[test]
    fn print_unit() {
        let ctx = BuildContext::from_path("./test/asm/small.asm", UnitigConfig::default())
            .unwrap();
        let lines: Vec<_> = ctx.units().iter().map(unit_string).collect();
        assert_eq!(lines, vec!["1\t3\t101\t103\t0", "2\t2\t201\t202\t0", "5\t4\t501\t503\t1"]);
    }

    #[test]
    fn print_contig() {
        let contig = ContigRecord {
            accession: crate::fields::Accession {
                uid: "7".into(),
                iid: Some(70),
            },
            placed: true,
            length: None,
            fragments: vec!["11".into(), "12".into()],
            unitigs: vec!["1000".into()],
        };
        assert_eq!(contig_string(&contig), "7\tP\t*\t2\t1");
    }

    #[test]
    fn failed_render_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.dot");
        let out = dir.path().join("out.png");
        assert!(render(&missing, "png", &out).is_err());
    }

    #[test]
    #[cfg(feature = "serde1")]
    fn json_dump() {
        let graph = sample();
        let sub = graph.neighborhood_of("1000", 1).unwrap();
        let mut buf = Vec::new();
        write_json(&graph, Some(&sub), &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(value["edges"][0]["multiplicity"], 3);
        assert_eq!(value["edges"][0]["display_color"], "Blue");
        assert_eq!(value["nodes"][1]["accession"], "1002");
    }
}
