//! Positions of a packed buffer whose stencil straddles two rows.
//!
//! For a buffer of `len = rows * n` samples the row starts are `0, n, 2n, ...`.
//! Around every start `b` the second order operator discards `b` and `b - 1`,
//! the fourth order operator additionally `b - 2` and `b + 1`. Indices below
//! zero wrap to the end of the buffer. For the fourth order the `b + 1` entry
//! of the last row start is replaced by `0`, so the second sample of the last
//! row keeps its value.
use crate::stencil::Order;

/// Row start indices `0, n, 2n, ...` below `len`.
pub fn boundary_starts(len: usize, n: usize) -> impl Iterator<Item = usize> {
    debug_assert!(n > 0);
    (0..len).step_by(n)
}

/// Every index zeroed by the boundary correction, in the order it is applied.
///
/// May contain duplicates. `len` must be a positive multiple of `n`.
pub fn correction_indices(len: usize, n: usize, order: Order) -> Vec<usize> {
    debug_assert!(len > 0 && len % n == 0);
    let starts: Vec<usize> = boundary_starts(len, n).collect();
    let wrap = |b: usize, back: usize| (b + len - back) % len;

    let mut idx = Vec::with_capacity(starts.len() * order.width());
    idx.extend(starts.iter().cloned());
    idx.extend(starts.iter().map(|&b| wrap(b, 1)));

    if order == Order::Fourth {
        idx.extend(starts.iter().map(|&b| wrap(b, 2)));
        let last = starts.len() - 1;
        idx.extend(starts.iter()
            .enumerate()
            .map(|(k, &b)| if k == last { 0 } else { b + 1 }));
    }
    idx
}

/// Whether the boundary correction zeroes index `i`.
///
/// Equivalent to `correction_indices(len, n, order).contains(&i)` for a valid
/// layout (`len` a positive multiple of `n`, `n >= order.min_row_len()`).
#[inline]
pub fn is_corrected(i: usize, len: usize, n: usize, order: Order) -> bool {
    debug_assert!(i < len && len % n == 0);
    let j = i % n;
    match order {
        Order::Second => j == 0 || j == n - 1,
        Order::Fourth => {
            let last_row = i / n == len / n - 1;
            j == 0 || j + 2 >= n || (j == 1 && !last_row)
        }
    }
}
