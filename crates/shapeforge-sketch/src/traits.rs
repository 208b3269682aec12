/// Common surface of a mergeable streaming summary.
///
/// `merge` must be commutative and associative: merging summaries of
/// disjoint shards in any grouping yields the state the concatenated
/// stream would have produced.
pub trait Sketch {
    /// Fold another summary of the same shape into this one.
    fn merge(&mut self, other: &Self);

    /// Reset to the empty state.
    fn clear(&mut self);
}
