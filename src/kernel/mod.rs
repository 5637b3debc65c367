//! Kernel functions for the SVM trainer
//!
//! A closed set of kernel families with explicit per-family parameters,
//! dispatched by match. The distance-based families (gaussian,
//! exponential, laplacian) are symmetric by construction; the polynomial
//! family scales the components of the first argument before the dot
//! product is taken, so its rounding follows that evaluation order rather
//! than the symmetric textbook form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::ShapeError;
use crate::linalg;

/// Kernel family with its parameters.
///
/// Parameters are trusted as supplied: a zero or negative `sigma` is the
/// caller's responsibility, matching the permissive behavior of the
/// underlying formulas.
///
/// # Examples
/// ```
/// use lpsvm::Kernel;
///
/// let kernel = Kernel::Polynomial { scale: 1.0, c: 1.0, degree: 2.0 };
/// let k = kernel.compute(&[1.0, 1.0], &[1.0, 1.0]).unwrap();
/// assert_eq!(k, 9.0); // (2 + 1)^2
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Kernel {
    /// `K(x, y) = x . y + c`
    Linear { c: f64 },
    /// `K(x, y) = ((scale * x) . y + c) ^ degree`
    ///
    /// The scale factor multiplies the components of `x` before the dot
    /// product is taken.
    Polynomial { scale: f64, c: f64, degree: f64 },
    /// `K(x, y) = exp(-||x - y||^2 / (2 * sigma^2))`
    Gaussian { sigma: f64 },
    /// `K(x, y) = exp(-||x - y|| / (2 * sigma^2))`
    Exponential { sigma: f64 },
    /// `K(x, y) = exp(-||x - y|| / sigma)`
    Laplacian { sigma: f64 },
}

impl Kernel {
    /// Evaluate the kernel on a pair of equally sized vectors.
    ///
    /// # Errors
    /// `ShapeError::LengthMismatch` if the vectors differ in length.
    pub fn compute(&self, x: &[f64], y: &[f64]) -> Result<f64, ShapeError> {
        match *self {
            Kernel::Linear { c } => Ok(linalg::dot(x, y)? + c),
            Kernel::Polynomial { scale, c, degree } => {
                let scaled: Vec<f64> = x.iter().map(|&v| scale * v).collect();
                Ok((linalg::dot(&scaled, y)? + c).powf(degree))
            }
            Kernel::Gaussian { sigma } => {
                let distance = linalg::euclidean_distance(x, y)?;
                Ok((-(distance * distance) / (2.0 * sigma * sigma)).exp())
            }
            Kernel::Exponential { sigma } => {
                let distance = linalg::euclidean_distance(x, y)?;
                Ok((-distance / (2.0 * sigma * sigma)).exp())
            }
            Kernel::Laplacian { sigma } => {
                let distance = linalg::euclidean_distance(x, y)?;
                Ok((-distance / sigma).exp())
            }
        }
    }
}

impl Default for Kernel {
    /// Plain dot product
    fn default() -> Self {
        Kernel::Linear { c: 0.0 }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kernel::Linear { .. } => "linear",
            Kernel::Polynomial { .. } => "polynomial",
            Kernel::Gaussian { .. } => "gaussian",
            Kernel::Exponential { .. } => "exponential",
            Kernel::Laplacian { .. } => "laplacian",
        };
        write!(f, "{}", name)
    }
}
