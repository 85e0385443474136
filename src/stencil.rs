//! Derivative orders, stencil coefficients and the shifted index maps of the packed buffer.
use std::fmt;

use crate::error::DeriveError;

/// Weight of the inner pair `f[i+1] - f[i]` in the fourth order stencil.
pub const C0: f64 = 9. / 8.;
/// Weight of the outer pair `f[i+2] - f[i-1]` in the fourth order stencil.
pub const C1: f64 = 1. / 24.;

/// Accuracy order of the difference operator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Order {
    /// Two point forward difference.
    Second,
    /// Four point staggered difference.
    Fourth,
}

impl Order {
    pub fn as_u32(self) -> u32 {
        match self {
            Order::Second => 2,
            Order::Fourth => 4,
        }
    }

    /// Number of samples read by one stencil evaluation.
    pub fn width(self) -> usize {
        match self {
            Order::Second => 2,
            Order::Fourth => 4,
        }
    }

    /// Shortest row for which the stencil has room on both sides without the
    /// corrected positions of neighbouring boundaries colliding.
    pub fn min_row_len(self) -> usize {
        match self {
            Order::Second => 2,
            Order::Fourth => 5,
        }
    }
}

impl TryFrom<u32> for Order {
    type Error = DeriveError;

    fn try_from(order: u32) -> Result<Self, Self::Error> {
        match order {
            2 => Ok(Order::Second),
            4 => Ok(Order::Fourth),
            _ => Err(DeriveError::InvalidConfiguration { order }),
        }
    }
}

impl From<Order> for u32 {
    fn from(order: Order) -> u32 {
        order.as_u32()
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// `i + 1`, with the last index of the buffer wrapping to `0`.
#[inline]
pub fn next1(i: usize, len: usize) -> usize {
    debug_assert!(i < len);
    if i + 1 < len { i + 1 } else { 0 }
}

/// `i + 2`, with the last two indices of the buffer sent to `0`.
///
/// Note that `len - 2` maps to `0` rather than to `(i + 2) % len`.
#[inline]
pub fn next2(i: usize, len: usize) -> usize {
    debug_assert!(i < len);
    if i + 2 < len { i + 2 } else { 0 }
}

/// `i - 1`, with `0` wrapping to the last index of the buffer.
#[inline]
pub fn prev1(i: usize, len: usize) -> usize {
    debug_assert!(i < len);
    (i + len - 1) % len
}

/// Unscaled difference at `i`, using the global wrap of the index maps.
#[inline]
pub fn raw_difference(field: &[f64], i: usize, order: Order) -> f64 {
    let len = field.len();
    let fi = field[i];
    let f1 = field[next1(i, len)];
    match order {
        Order::Second => f1 - fi,
        Order::Fourth => {
            let f2 = field[next2(i, len)];
            let fm = field[prev1(i, len)];
            C0 * (f1 - fi) - C1 * (f2 - fm)
        }
    }
}
