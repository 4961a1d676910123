//! Reads assembler message files (`{IUM`, `{UTG`, `{CCO`, `{ULK`,
//! `{CLK` records), reconstructs units and their best overlap edges,
//! and builds directed link graphs between units that can be cut
//! down to the neighborhood of a unit and exported.

pub mod best_edge;
pub mod contig;
pub mod fields;
pub mod graph;
pub mod mmap;
pub mod neighborhood;
pub mod parser;
pub mod unitig;
pub mod writer;
