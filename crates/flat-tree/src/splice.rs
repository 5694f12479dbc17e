//! Copy-on-write splicing for id sequences

/// Result of a [`splice`]: the rebuilt sequence and the items cut out of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spliced<T> {
    /// The new sequence with the range replaced
    pub sequence: Vec<T>,
    /// The items that occupied the replaced range, in order
    pub removed: Vec<T>,
}

/// Build a new sequence from `source` with `delete_count` items starting at
/// `start` replaced by `items`. `source` is left untouched.
///
/// Both `start` and the end of the deleted range are clamped to the length of
/// `source`: splicing into an empty sequence is a pure insert at position 0,
/// and an empty `items` slice is a pure delete.
pub fn splice<T: Copy>(source: &[T], start: usize, delete_count: usize, items: &[T]) -> Spliced<T> {
    let start = start.min(source.len());
    let end = start.saturating_add(delete_count).min(source.len());

    let mut sequence = Vec::with_capacity(source.len() - (end - start) + items.len());
    sequence.extend_from_slice(&source[..start]);
    sequence.extend_from_slice(items);
    sequence.extend_from_slice(&source[end..]);

    Spliced {
        sequence,
        removed: source[start..end].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_replace_middle() {
        let source = [1u32, 2, 3, 4, 5];
        let out = splice(&source, 1, 2, &[9, 8, 7]);
        assert_eq!(out.sequence, vec![1, 9, 8, 7, 4, 5]);
        assert_eq!(out.removed, vec![2, 3]);
        // input is not mutated
        assert_eq!(source, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_pure_delete() {
        let out = splice(&[1u32, 2, 3, 4], 1, 3, &[]);
        assert_eq!(out.sequence, vec![1]);
        assert_eq!(out.removed, vec![2, 3, 4]);
    }

    #[test]
    fn test_insert_into_empty() {
        let out = splice::<u32>(&[], 0, 0, &[4, 5]);
        assert_eq!(out.sequence, vec![4, 5]);
        assert!(out.removed.is_empty());
    }

    #[test]
    fn test_insert_without_delete() {
        let out = splice(&[1u32, 4], 1, 0, &[2, 3]);
        assert_eq!(out.sequence, vec![1, 2, 3, 4]);
        assert!(out.removed.is_empty());
    }

    #[test]
    fn test_range_is_clamped() {
        let out = splice(&[1u32, 2, 3], 2, usize::MAX, &[]);
        assert_eq!(out.sequence, vec![1, 2]);
        assert_eq!(out.removed, vec![3]);

        let out = splice(&[1u32, 2], 10, 1, &[3]);
        assert_eq!(out.sequence, vec![1, 2, 3]);
        assert!(out.removed.is_empty());
    }
}
