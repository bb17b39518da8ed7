use std::cmp::Ordering;

/// Defines the strict total order of an [`AvlTree`](crate::AvlTree).
///
/// The comparator is an explicit value handed to the tree at construction,
/// so several trees over the same element type may use different orders.
/// An implementation that is not a strict total order over the inserted
/// elements leaves the element order unspecified.
pub trait Comparator<K> {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Orders elements by their `Ord` implementation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NaturalOrder;

impl<K: Ord> Comparator<K> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

impl<K, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}
