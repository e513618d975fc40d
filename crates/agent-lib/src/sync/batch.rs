//! Fixed-size partitioning of entity lists

/// Split `items` into contiguous batches of at most `size` elements
///
/// Order is preserved and every batch except the last has exactly `size`
/// elements. An empty input or a zero size yields no batches.
pub fn chunk<T>(items: &[T], size: usize) -> Vec<&[T]> {
    if items.is_empty() || size == 0 {
        return Vec::new();
    }
    items.chunks(size).collect()
}
