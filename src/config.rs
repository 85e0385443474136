//! Serializable description of one derivative evaluation.
use serde::{Deserialize, Serialize};

use crate::error::{DeriveError, Result};
use crate::stencil::Order;

/// Work per rayon task below which rows are no longer split.
pub const DEFAULT_ELEMS_PER_TASK: usize = 200 * 1024;

/// How the rows of the packed buffer are distributed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Concurrency {
    /// Single-threaded evaluation.
    Serial,
    /// Recursive row splitting on the rayon pool.
    Rayon {
        #[serde(default = "default_elems_per_task")]
        elems_per_task: usize,
    },
}

const fn default_elems_per_task() -> usize {
    DEFAULT_ELEMS_PER_TASK
}

impl Default for Concurrency {
    fn default() -> Self {
        if cfg!(feature = "parallel") {
            Concurrency::Rayon { elems_per_task: DEFAULT_ELEMS_PER_TASK }
        } else {
            Concurrency::Serial
        }
    }
}

/// Parameters of the operator, e.g.
///
/// ```toml
/// row_len = 126
/// dx = 0.05
/// order = 4
///
/// [concurrency]
/// mode = "serial"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeriveConfig {
    /// Samples per row, `N`.
    pub row_len: usize,
    /// Grid spacing.
    pub dx: f64,
    /// Derivative order as written in the file; only 2 and 4 are accepted.
    pub order: u32,
    #[serde(default)]
    pub concurrency: Concurrency,
}

impl DeriveConfig {
    pub fn new(row_len: usize, dx: f64, order: Order) -> Self {
        DeriveConfig {
            row_len,
            dx,
            order: order.as_u32(),
            concurrency: Concurrency::default(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: DeriveConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn order(&self) -> Result<Order> {
        Order::try_from(self.order)
    }

    /// Checks the parameters that do not depend on the field.
    pub fn validate(&self) -> Result<()> {
        let order = self.order()?;
        if self.row_len < order.min_row_len() {
            return Err(DeriveError::invalid_input(format!(
                "row_len = {} is shorter than the {} samples required by order {}",
                self.row_len,
                order.min_row_len(),
                order
            )));
        }
        check_dx(self.dx)?;
        if let Concurrency::Rayon { elems_per_task: 0 } = self.concurrency {
            return Err(DeriveError::invalid_input("concurrency.elems_per_task must be positive"));
        }
        Ok(())
    }
}

pub(crate) fn check_dx(dx: f64) -> Result<()> {
    if dx.is_finite() && dx > 0. {
        Ok(())
    } else {
        Err(DeriveError::invalid_input(format!("dx = {} must be positive and finite", dx)))
    }
}
