use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Builder;
use log::{info, LevelFilter};

use asmgraph::{
    best_edge::BestEdges,
    contig::read_contigs,
    graph::{
        build::{from_best_edges, from_link_records, LinkConfig},
        LinkGraph,
    },
    mmap::MmapRecords,
    neighborhood::Subgraph,
    parser::RecordReader,
    unitig::{BuildContext, UnitigConfig},
    writer,
};

#[derive(Parser, Debug)]
#[command(name = "asmgraph")]
#[command(about = "Unit link graphs from assembler message files")]
struct Cli {
    /// More output; repeat for debug logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count the top-level records of each type
    Census { file: PathBuf },
    /// Summarize the units of a file: accession, fragments, first, last, interior count
    Unitigs {
        asm: PathBuf,
        #[arg(long)]
        keep_degenerate_first: bool,
    },
    /// Summarize the contigs of a file
    Contigs { asm: PathBuf },
    /// Graph of units joined by the best edges of their end fragments
    BestGraph {
        asm: PathBuf,
        best: PathBuf,
        #[arg(long)]
        keep_degenerate_first: bool,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Graph of units or contigs joined by link records
    LinkGraph {
        asm: PathBuf,
        /// Use contigs and contig links instead of unitigs
        #[arg(long)]
        contigs: bool,
        /// Leave out units shorter than this
        #[arg(long)]
        min_length: Option<i64>,
        /// Memory-map the input
        #[arg(long)]
        mmap: bool,
        #[command(flatten)]
        export: ExportArgs,
    },
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Only export the neighborhood of this unit
    #[arg(long)]
    start: Option<String>,
    /// Neighborhood radius
    #[arg(long, default_value_t = 2)]
    depth: usize,
    /// Write the graph in dot format
    #[arg(long)]
    dot: Option<PathBuf>,
    /// Render the dot graph with graphviz into this format, e.g. png
    #[arg(long, requires = "out")]
    render: Option<String>,
    /// Rendered image path
    #[arg(long)]
    out: Option<PathBuf>,
    /// Write the graph as JSON
    #[cfg(feature = "serde1")]
    #[arg(long)]
    json: Option<PathBuf>,
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Error,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let mut builder = Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn unitig_config(keep_degenerate_first: bool) -> UnitigConfig {
    if keep_degenerate_first {
        UnitigConfig::keep_first_fragment()
    } else {
        UnitigConfig::default()
    }
}

fn census(path: &Path) -> Result<()> {
    let mut records = MmapRecords::new(path)
        .with_context(|| format!("Couldn't map {}", path.display()))?;
    let index = records.build_index()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (tag, count) in index.counts() {
        writeln!(out, "{}\t{}", tag, count)?;
    }
    writeln!(out, "total\t{}", index.total())?;
    Ok(())
}

fn unitigs(path: &Path, config: UnitigConfig) -> Result<()> {
    let ctx = BuildContext::from_path(path, config)
        .with_context(|| format!("Couldn't read units from {}", path.display()))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for unit in ctx.units() {
        writeln!(out, "{}", writer::unit_string(unit))?;
    }
    Ok(())
}

fn contigs(path: &Path) -> Result<()> {
    let mut reader = RecordReader::from_path(path)?;
    let contigs = read_contigs(&mut reader)
        .with_context(|| format!("Couldn't read contigs from {}", path.display()))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for contig in contigs.iter() {
        writeln!(out, "{}", writer::contig_string(contig))?;
    }
    Ok(())
}

fn export(graph: &LinkGraph, args: &ExportArgs) -> Result<()> {
    let subgraph: Option<Subgraph> = match &args.start {
        Some(start) => Some(graph.neighborhood_of(start, args.depth)?),
        None => None,
    };
    if let Some(sub) = &subgraph {
        info!(
            "Neighborhood of {} within {}: {} units, {} edges",
            args.start.as_deref().unwrap_or_default(),
            args.depth,
            sub.vertices.len(),
            sub.edges.len()
        );
    }
    let mut exported = false;

    let dot_path = match (&args.dot, &args.out) {
        (Some(dot), _) => Some(dot.clone()),
        (None, Some(out)) if args.render.is_some() => Some(out.with_extension("dot")),
        _ => None,
    };
    if let Some(dot_path) = &dot_path {
        let dot = writer::dot_string(graph, subgraph.as_ref());
        std::fs::write(dot_path, dot)
            .with_context(|| format!("Couldn't write {}", dot_path.display()))?;
        exported = true;

        if let (Some(format), Some(out)) = (&args.render, &args.out) {
            writer::render(dot_path, format, out)
                .with_context(|| format!("Couldn't render {}", dot_path.display()))?;
        }
    }

    #[cfg(feature = "serde1")]
    {
        if let Some(json_path) = &args.json {
            let file = std::fs::File::create(json_path)
                .with_context(|| format!("Couldn't create {}", json_path.display()))?;
            writer::write_json(graph, subgraph.as_ref(), BufWriter::new(file))?;
            exported = true;
        }
    }

    if !exported {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        let edges: Vec<usize> = match &subgraph {
            Some(sub) => sub.edges.clone(),
            None => (0..graph.edges().len()).collect(),
        };
        for ix in edges {
            writeln!(out, "{}", writer::edge_string(graph, &graph.edges()[ix]))?;
        }
    }

    let skips = graph.skips();
    info!(
        "Skipped: {} ends without best edge, {} singleton edges, {} dangling edges, {} short units, {} links to short units",
        skips.no_edge, skips.singleton, skips.dangling, skips.short_units, skips.short_links
    );
    Ok(())
}

fn best_graph(
    asm: &Path,
    best: &Path,
    config: UnitigConfig,
    args: &ExportArgs,
) -> Result<()> {
    let ctx = BuildContext::from_path(asm, config)
        .with_context(|| format!("Couldn't read units from {}", asm.display()))?;
    let best_edges = BestEdges::from_path(best, &ctx)
        .with_context(|| format!("Couldn't resolve best edges from {}", best.display()))?;
    let graph = from_best_edges(&ctx, &best_edges);
    export(&graph, args)
}

fn link_graph(
    asm: &Path,
    config: &LinkConfig,
    use_mmap: bool,
    args: &ExportArgs,
) -> Result<()> {
    let built = if use_mmap {
        let mut reader = MmapRecords::new(asm)?.into_reader();
        from_link_records(&mut reader, config)
    } else {
        let mut reader = RecordReader::from_path(asm)?;
        from_link_records(&mut reader, config)
    };
    let graph = built
        .with_context(|| format!("Couldn't build link graph from {}", asm.display()))?;
    export(&graph, args)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match &cli.command {
        Command::Census { file } => census(file),
        Command::Unitigs {
            asm,
            keep_degenerate_first,
        } => unitigs(asm, unitig_config(*keep_degenerate_first)),
        Command::Contigs { asm } => contigs(asm),
        Command::BestGraph {
            asm,
            best,
            keep_degenerate_first,
            export,
        } => best_graph(asm, best, unitig_config(*keep_degenerate_first), export),
        Command::LinkGraph {
            asm,
            contigs,
            min_length,
            mmap,
            export,
        } => {
            let mut config = if *contigs {
                LinkConfig::contigs()
            } else {
                LinkConfig::unitigs()
            };
            if let Some(min) = min_length {
                if *min < 0 {
                    bail!("Minimum length can't be negative");
                }
                config = config.with_min_length(*min);
            }
            link_graph(asm, &config, *mmap, export)
        }
    }
}
