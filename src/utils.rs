/// Borrows `items[i]` and `items[i + 1]` together.
pub fn adjacent<T>(items: &[T], i: usize) -> (&T, &T) {
    (&items[i], &items[i + 1])
}

/// Mutably borrows `items[i]` and `items[i + 1]` together.
///
/// # Panics
///
/// Panics if `i + 1` is out of bounds.
pub fn adjacent_mut<T>(items: &mut [T], i: usize) -> (&mut T, &mut T) {
    let (head, tail) = items.split_at_mut(i + 1);
    (&mut head[i], &mut tail[0])
}
