/// Read-only view of a multigraph over the vertices `0..vertex_count`,
/// as needed for neighborhood extraction. Adjacency ignores edge
/// direction.
pub trait Adjacency {
    fn vertex_count(&self) -> usize;

    /// Every vertex sharing an edge with `vertex`, in either
    /// direction. May contain duplicates if there are parallel edges.
    fn neighbors(&self, vertex: usize) -> &[usize];

    fn edge_count(&self) -> usize;

    /// The `(from, to)` endpoints of the edge with the given index.
    fn edge_endpoints(&self, edge: usize) -> (usize, usize);

    fn has_vertex(&self, vertex: usize) -> bool {
        vertex < self.vertex_count()
    }
}
