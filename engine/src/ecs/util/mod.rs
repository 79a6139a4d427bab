pub(crate) mod macros;

/// Strip the module path from a type name, keeping generic arguments intact.
pub(crate) fn short_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

/// Borrow two distinct elements of a slice mutably at the same time.
///
/// # Panics
/// - If `a == b`, or either index is out of bounds.
pub(crate) fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    assert_ne!(a, b, "pair_mut requires two distinct indices");
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

#[cfg(test)]
mod tests {
    use super::{pair_mut, short_name};

    #[test]
    fn pair_mut_in_both_orders() {
        // Given
        let mut items = vec![1, 2, 3, 4];

        // When
        let (a, b) = pair_mut(&mut items, 0, 3);
        *a += 10;
        *b += 20;
        let (c, d) = pair_mut(&mut items, 2, 1);
        *c += 30;
        *d += 40;

        // Then
        assert_eq!(items, vec![11, 42, 33, 24]);
    }

    #[test]
    #[should_panic]
    fn pair_mut_same_index_panics() {
        let mut items = vec![1, 2];
        let _ = pair_mut(&mut items, 1, 1);
    }

    #[test]
    fn short_name_keeps_generics() {
        assert_eq!(short_name("a::b::Position"), "Position");
        assert_eq!(short_name("a::Wrapper<b::Inner>"), "Wrapper<b::Inner>");
        assert_eq!(short_name("u32"), "u32");
    }
}
