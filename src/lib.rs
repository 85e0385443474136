//! Boundary-corrected finite difference first derivative for packed row-major fields, the
//! spatial operator of a staggered-grid elastic wave scheme.
//!
//! A field of `rows` rows of `n` samples each is stored as one flat buffer `[[f64; n]; rows]`.
//! The derivative is taken along the packed axis. Positions whose stencil would reach into a
//! neighbouring row are set to exactly `0.0`, see [`boundary`].
#[cfg(feature = "parallel")]
extern crate rayon;

pub mod boundary;
pub mod config;
pub mod error;
pub mod stencil;

pub use config::{Concurrency, DeriveConfig};
pub use error::{DeriveError, Result};
pub use stencil::Order;

use ndarray::{Array2, ArrayView2};

use boundary::is_corrected;
use stencil::raw_difference;

/// Checks that `len` samples split into rows of `n` samples wide enough for `order`.
///
/// Returns `(rows, n)`.
fn layout(len: usize, n: usize, order: Order) -> Result<(usize, usize)> {
    if n == 0 {
        return Err(DeriveError::invalid_input("n must be positive"));
    }
    if len == 0 {
        return Err(DeriveError::invalid_input("field must not be empty"));
    }
    if len % n != 0 {
        return Err(DeriveError::invalid_input(format!(
            "field length {} is not a multiple of n = {}",
            len, n
        )));
    }
    if n < order.min_row_len() {
        return Err(DeriveError::invalid_input(format!(
            "n = {} is too short for the {}-point stencil of order {} (need n >= {})",
            n,
            order.width(),
            order,
            order.min_row_len()
        )));
    }
    Ok((len / n, n))
}

/// Validates all arguments of one evaluation, returning the layout `(rows, n)`.
fn check_args(field: &[f64], out: &[f64], n: usize, dx: f64, order: Order) -> Result<(usize, usize)> {
    let dim = layout(field.len(), n, order)?;
    config::check_dx(dx)?;
    if out.len() != field.len() {
        return Err(DeriveError::invalid_input(format!(
            "output length {} differs from field length {}",
            out.len(),
            field.len()
        )));
    }
    Ok(dim)
}

/// Computes rows `rows.0..rows.1` of the derivative into `out`, which holds exactly those rows.
fn derive_sub(field: &[f64],
              out: &mut [f64],
              dim: (usize, usize),
              rows: (usize, usize),
              dx: f64,
              order: Order) {
    let (ny, nx) = dim;
    let (rs, re) = rows;
    let len = nx * ny;
    debug_assert!(rs < re);
    debug_assert!(re <= ny);
    debug_assert_eq!(field.len(), len);
    debug_assert_eq!(out.len(), (re - rs) * nx);

    let offset = rs * nx;
    for (k, w) in out.iter_mut().enumerate() {
        let i = offset + k;
        *w = if is_corrected(i, len, nx, order) {
            0.
        } else {
            raw_difference(field, i, order) / dx
        };
    }
}

/// Writes the derivative of `field` into `out`.
///
/// `out` must have the length of `field`. On error `out` is left untouched.
pub fn derive_into(field: &[f64], out: &mut [f64], n: usize, dx: f64, order: Order) -> Result<()> {
    let dim = check_args(field, out, n, dx, order)?;
    log::debug!("derive: {} rows of {} samples, order {}, dx = {}", dim.0, dim.1, order, dx);

    derive_sub(field, out, dim, (0, dim.0), dx, order);
    Ok(())
}

/// First derivative of the packed field `field` with `n` samples per row and grid spacing `dx`.
///
/// The discretization is the forward difference `f[i+1] - f[i]` for `Order::Second` and the
/// staggered `9/8 (f[i+1] - f[i]) - 1/24 (f[i+2] - f[i-1])` for `Order::Fourth`, divided by `dx`.
/// Neighbour indices wrap around the whole buffer, not per row; every value whose stencil spans
/// two rows is then replaced by `0.0`.
///
/// - `field`: `[[f64; n]; rows]`, not modified
/// - `n`: samples per row, at least `order.min_row_len()`
/// - `dx`: positive grid spacing
pub fn derive(field: &[f64], n: usize, dx: f64, order: Order) -> Result<Vec<f64>> {
    let mut out = vec![0.; field.len()];
    derive_into(field, &mut out, n, dx, order)?;
    Ok(out)
}

/// Same as `derive`, with the order given as the integer `2` or `4`.
pub fn derive_with_order_code(field: &[f64], n: usize, dx: f64, order: u32) -> Result<Vec<f64>> {
    let order = Order::try_from(order)?;
    derive(field, n, dx, order)
}

#[cfg(feature = "parallel")]
fn derive_parallel_into(field: &[f64],
                        out: &mut [f64],
                        n: usize,
                        dx: f64,
                        order: Order,
                        elems_per_task: usize)
                        -> Result<()> {
    let dim = check_args(field, out, n, dx, order)?;
    log::debug!("derive_parallel: {} rows of {} samples, order {}, dx = {}",
                dim.0,
                dim.1,
                order,
                dx);

    fn inner(field: &[f64],
             out: &mut [f64],
             dim: (usize, usize),
             rows: (usize, usize),
             dx: f64,
             order: Order,
             elems_per_task: usize) {
        let (row_start, row_end) = rows;
        if row_end - row_start > 1 && out.len() > elems_per_task {
            let (_, nx) = dim;
            let mid = (row_start + row_end) / 2;
            let (left, right) = out.split_at_mut((mid - row_start) * nx);
            rayon::join(|| inner(field, left, dim, (row_start, mid), dx, order, elems_per_task),
                        || inner(field, right, dim, (mid, row_end), dx, order, elems_per_task));
        } else {
            derive_sub(field, out, dim, rows, dx, order);
        }
    }

    inner(field, out, dim, (0, dim.0), dx, order, elems_per_task.max(1));
    Ok(())
}

/// Same as `derive`, splitting the rows over the rayon pool.
///
/// The result is identical to the serial one.
#[cfg(feature = "parallel")]
pub fn derive_parallel(field: &[f64], n: usize, dx: f64, order: Order) -> Result<Vec<f64>> {
    let mut out = vec![0.; field.len()];
    derive_parallel_into(field,
                         &mut out,
                         n,
                         dx,
                         order,
                         config::DEFAULT_ELEMS_PER_TASK)?;
    Ok(out)
}

/// Runs the operator described by `config` on `field`.
pub fn derive_with(field: &[f64], config: &DeriveConfig) -> Result<Vec<f64>> {
    let order = config.order()?;
    match config.concurrency {
        Concurrency::Serial => derive(field, config.row_len, config.dx, order),
        #[cfg(feature = "parallel")]
        Concurrency::Rayon { elems_per_task } => {
            let mut out = vec![0.; field.len()];
            derive_parallel_into(field, &mut out, config.row_len, config.dx, order, elems_per_task)?;
            Ok(out)
        }
        #[cfg(not(feature = "parallel"))]
        Concurrency::Rayon { .. } => {
            log::warn!("built without the `parallel` feature, deriving serially");
            derive(field, config.row_len, config.dx, order)
        }
    }
}

/// Derivative along the rows of a 2-D array, each array row being one packed row.
pub fn derive_rows(field: ArrayView2<f64>, dx: f64, order: Order) -> Result<Array2<f64>> {
    let (ny, nx) = field.dim();
    let data = field.as_standard_layout();
    let slice = data.as_slice()
        .ok_or_else(|| DeriveError::invalid_input("field is not contiguous"))?;
    let out = derive(slice, nx, dx, order)?;
    Array2::from_shape_vec((ny, nx), out).map_err(|e| DeriveError::invalid_input(e.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Reference implementation with explicit index arrays.
    fn derive_reference(field: &[f64], n: usize, dx: f64, order: Order) -> Vec<f64> {
        let len = field.len();
        let mut next1: Vec<usize> = (1..len + 1).collect();
        next1[len - 1] = 0;
        let mut next2: Vec<usize> = (2..len + 2).collect();
        for k in len.saturating_sub(2)..len {
            next2[k] = 0;
        }
        let prev1: Vec<usize> = (0..len).map(|i| if i == 0 { len - 1 } else { i - 1 }).collect();

        let mut diff: Vec<f64> = (0..len)
            .map(|i| match order {
                Order::Second => field[next1[i]] - field[i],
                Order::Fourth => {
                    9. / 8. * (field[next1[i]] - field[i]) -
                    1. / 24. * (field[next2[i]] - field[prev1[i]])
                }
            })
            .collect();

        let starts: Vec<usize> = (0..len).step_by(n).collect();
        for &b in &starts {
            diff[b] = 0.;
            diff[(b + len - 1) % len] = 0.;
        }
        if order == Order::Fourth {
            let mut post: Vec<usize> = starts.iter().map(|b| b + 1).collect();
            let last = post.len() - 1;
            post[last] = 0;
            for &b in &starts {
                diff[(b + len - 2) % len] = 0.;
            }
            for &p in &post {
                diff[p] = 0.;
            }
        }
        diff.iter().map(|d| d / dx).collect()
    }

    fn test_dim(ny: usize, nx: usize, order: Order) {
        let mut rng = StdRng::seed_from_u64((ny * 1000 + nx) as u64);
        let field = Array::random_using(ny * nx, Uniform::new(0., 1.), &mut rng).to_vec();
        let dx = 0.37;

        let w_ref = derive_reference(&field, nx, dx, order);
        let w = derive(&field, nx, dx, order).unwrap();
        assert_eq!(w.len(), field.len());
        for (a, b) in w.iter().zip(&w_ref) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }

        #[cfg(feature = "parallel")]
        {
            let mut w_par = vec![0.; field.len()];
            // tiny tasks so that small grids are split too
            derive_parallel_into(&field, &mut w_par, nx, dx, order, 7).unwrap();
            assert_eq!(w_par, w);
            assert_eq!(derive_parallel(&field, nx, dx, order).unwrap(), w);
        }
    }

    #[test]
    fn test_equal() {
        for &order in &[Order::Second, Order::Fourth] {
            test_dim(1, 5, order);
            test_dim(3, 5, order);
            test_dim(3, 20, order);
            test_dim(20, 6, order);
            test_dim(20, 20, order);
            test_dim(512, 512, order);
        }
        test_dim(4, 2, Order::Second);
    }

    #[test]
    fn linear_ramp_two_rows() {
        let field: Vec<f64> = (0..10).map(|k| k as f64).collect();
        let w = derive(&field, 5, 1., Order::Second).unwrap();
        assert_eq!(w, vec![0., 1., 1., 1., 0., 0., 1., 1., 1., 0.]);

        let w = derive(&field, 5, 1., Order::Fourth).unwrap();
        let expected = [0., 0., 1., 0., 0., 0., 1., 1., 0., 0.];
        for (a, b) in w.iter().zip(&expected) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn derive_into_leaves_output_on_error() {
        let field = vec![1.; 10];
        let mut out = vec![7.; 10];
        assert!(derive_into(&field, &mut out, 3, 1., Order::Second).is_err());
        assert!(derive_into(&field, &mut out, 5, 0., Order::Second).is_err());
        assert!(derive_into(&field, &mut out[..9], 5, 1., Order::Second).is_err());
        assert!(out.iter().all(|&x| x == 7.));
    }

    #[test]
    fn rejects_bad_layout() {
        let field = vec![0.; 12];
        for &(n, order) in &[(0, Order::Second),
                             (5, Order::Second),
                             (4, Order::Fourth),
                             (1, Order::Second)] {
            match derive(&field, n, 1., order) {
                Err(DeriveError::InvalidInput(_)) => {}
                other => panic!("n = {}: expected InvalidInput, got {:?}", n, other),
            }
        }
        match derive(&[], 5, 1., Order::Second) {
            Err(DeriveError::InvalidInput(_)) => {}
            other => panic!("expected InvalidInput, got {:?}", other),
        }
        for &dx in &[0., -1., f64::NAN, f64::INFINITY] {
            assert!(derive(&field, 6, dx, Order::Second).is_err());
        }
    }

    #[test]
    fn order_code_checked_first() {
        // a bad order wins over a bad layout
        match derive_with_order_code(&[0.; 7], 5, -1., 3) {
            Err(DeriveError::InvalidConfiguration { order }) => assert_eq!(order, 3),
            other => panic!("expected InvalidConfiguration, got {:?}", other),
        }
        let field: Vec<f64> = (0..10).map(|k| k as f64).collect();
        assert_eq!(derive_with_order_code(&field, 5, 1., 2).unwrap(),
                   derive(&field, 5, 1., Order::Second).unwrap());
    }

    #[test]
    fn config_variants_agree() {
        let field: Vec<f64> = (0..60).map(|k| (k as f64 * 0.3).sin()).collect();
        let mut config = DeriveConfig::new(12, 0.3, Order::Fourth);
        config.concurrency = Concurrency::Serial;
        let serial = derive_with(&field, &config).unwrap();
        config.concurrency = Concurrency::Rayon { elems_per_task: 10 };
        assert_eq!(derive_with(&field, &config).unwrap(), serial);
        assert_eq!(serial, derive(&field, 12, 0.3, Order::Fourth).unwrap());

        config.order = 6;
        assert!(derive_with(&field, &config).is_err());
    }

    #[test]
    fn rows_of_array() {
        let field = Array::from_shape_fn((3, 8), |(j, i)| (j * 8 + i) as f64);
        let w = derive_rows(field.view(), 0.5, Order::Second).unwrap();
        assert_eq!(w.dim(), (3, 8));
        let flat = derive(field.as_slice().unwrap(), 8, 0.5, Order::Second).unwrap();
        assert_eq!(w.as_slice().unwrap(), &flat[..]);

        // transposed views are packed before deriving
        let t = field.t().to_owned();
        let w_t = derive_rows(t.t(), 0.5, Order::Second).unwrap();
        assert_eq!(w_t, w);
    }
}
