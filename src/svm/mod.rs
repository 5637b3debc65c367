//! Training and classification
//!
//! [`SvmTrainer`] is the public entry point: configure a kernel, a box
//! constraint and a solve strategy, hand over parallel slices of sample
//! vectors and ±1 labels, and get a [`TrainedModel`] back.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::error::{
    Result, ShapeError, SimplexError, SolveError, TrainError, ValidationError,
};
use crate::core::types::Prediction;
use crate::dual;
use crate::kernel::Kernel;
use crate::simplex::DEFAULT_PIVOT_LIMIT;

/// Multipliers at or below this count as zero when locating support
/// vectors.
const SUPPORT_EPS: f64 = 1e-9;

/// Slack allowed when checking a direct solution against the box.
const BOUND_EPS: f64 = 1e-9;

/// How the dual problem is solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStrategy {
    /// Direct stationarity solve first; fall back to Wolfe's reduction
    /// when the system is not uniquely solvable or the multipliers land
    /// outside the box constraint.
    Auto,
    /// Direct stationarity solve only. The result is taken as-is, box
    /// constraint unchecked.
    Stationarity,
    /// Wolfe's reduction only.
    Wolfe,
}

/// Trainer with builder-style configuration.
///
/// Defaults: plain dot-product kernel, `C = 1.0`, automatic strategy
/// selection, pivot limit of [`DEFAULT_PIVOT_LIMIT`].
///
/// # Examples
/// ```
/// use lpsvm::SvmTrainer;
///
/// let x = vec![vec![-1.0], vec![1.0]];
/// let y = vec![-1.0, 1.0];
/// let model = SvmTrainer::new().train(&x, &y).unwrap();
/// assert_eq!(model.classify(&[0.7]).unwrap(), 1.0);
/// assert_eq!(model.classify(&[-0.7]).unwrap(), -1.0);
/// ```
#[derive(Debug, Clone)]
pub struct SvmTrainer {
    kernel: Kernel,
    c: f64,
    strategy: SolveStrategy,
    pivot_limit: usize,
}

impl SvmTrainer {
    /// Trainer with the default kernel and parameters.
    pub fn new() -> Self {
        Self {
            kernel: Kernel::default(),
            c: 1.0,
            strategy: SolveStrategy::Auto,
            pivot_limit: DEFAULT_PIVOT_LIMIT,
        }
    }

    /// Set the kernel.
    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Set the box constraint (upper bound on every multiplier).
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set the solve strategy.
    pub fn with_strategy(mut self, strategy: SolveStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the pivot cap handed to the simplex solver.
    pub fn with_pivot_limit(mut self, limit: usize) -> Self {
        self.pivot_limit = limit;
        self
    }

    /// Train a classifier on parallel sample and label slices.
    ///
    /// Labels must be exactly `-1.0` or `1.0` and every sample must
    /// share one dimensionality.
    ///
    /// # Errors
    /// `ValidationError` for malformed training sets, `NotSeparable`
    /// when no admissible multiplier solution exists, and wrapped
    /// solver errors for everything the optimization layer reports.
    pub fn train(&self, x: &[Vec<f64>], y: &[f64]) -> Result<TrainedModel> {
        validate_training_set(x, y, self.c)?;
        debug!(
            "training on {} samples with the {} kernel, C = {}",
            x.len(),
            self.kernel,
            self.c
        );

        let gram = dual::gram_matrix(&self.kernel, x, y).map_err(SimplexError::from)?;

        let alpha = match self.strategy {
            SolveStrategy::Auto => self.solve_auto(&gram, y)?,
            SolveStrategy::Stationarity => solve_direct(&gram, y)?,
            SolveStrategy::Wolfe => self.run_wolfe(&gram, y)?,
        };

        let bias = compute_bias(&self.kernel, x, y, &alpha)?;
        debug!(
            "trained: {} support vectors out of {} samples, bias {}",
            alpha.iter().filter(|a| a.abs() > SUPPORT_EPS).count(),
            x.len(),
            bias
        );

        Ok(TrainedModel {
            kernel: self.kernel,
            c: self.c,
            x: x.to_vec(),
            y: y.to_vec(),
            alpha,
            bias,
        })
    }

    fn solve_auto(&self, gram: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>> {
        match dual::solve_stationarity(gram, y) {
            Ok(alpha) if within_box(&alpha, self.c) => {
                debug!("stationarity solution respects the box constraint");
                Ok(alpha)
            }
            Ok(_) => {
                debug!("stationarity solution leaves the box, switching to Wolfe's method");
                self.run_wolfe(gram, y)
            }
            Err(SolveError::Singular) | Err(SolveError::Degenerate) => {
                debug!("stationarity system not uniquely solvable, switching to Wolfe's method");
                self.run_wolfe(gram, y)
            }
            Err(SolveError::Shape(e)) => Err(TrainError::Lp(e.into())),
        }
    }

    fn run_wolfe(&self, gram: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>> {
        match dual::solve_wolfe(gram, y, self.c, self.pivot_limit) {
            Ok(alpha) => Ok(alpha),
            Err(SimplexError::Infeasible) => Err(TrainError::NotSeparable),
            Err(e) => Err(TrainError::Lp(e)),
        }
    }
}

impl Default for SvmTrainer {
    fn default() -> Self {
        Self::new()
    }
}

/// Trained classifier: training samples, multipliers and bias.
///
/// Serializable so consumers can persist models however they like; the
/// crate itself does no file I/O.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    kernel: Kernel,
    c: f64,
    x: Vec<Vec<f64>>,
    y: Vec<f64>,
    alpha: Vec<f64>,
    bias: f64,
}

impl TrainedModel {
    /// Raw decision value for a sample.
    ///
    /// Computed as `sum_i (alpha_i * y_i * K(x_i, v) + b)`: the bias
    /// participates once per summed term, for every training point.
    ///
    /// # Errors
    /// `ShapeError::LengthMismatch` if `v` differs from the training
    /// dimensionality.
    pub fn decision_value(&self, v: &[f64]) -> Result<f64, ShapeError> {
        let mut result = 0.0;
        for i in 0..self.x.len() {
            result += self.alpha[i] * self.y[i] * self.kernel.compute(&self.x[i], v)? + self.bias;
        }
        Ok(result)
    }

    /// Class label for a sample: decision values at or below zero map
    /// to `-1.0`, everything else to `1.0`.
    pub fn classify(&self, v: &[f64]) -> Result<f64, ShapeError> {
        let value = self.decision_value(v)?;
        Ok(if value <= 0.0 { -1.0 } else { 1.0 })
    }

    /// Label and decision value together.
    pub fn predict(&self, v: &[f64]) -> Result<Prediction, ShapeError> {
        let decision_value = self.decision_value(v)?;
        let label = if decision_value <= 0.0 { -1.0 } else { 1.0 };
        Ok(Prediction::new(label, decision_value))
    }

    /// Kernel the model was trained with.
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Box constraint the model was trained with.
    pub fn c(&self) -> f64 {
        self.c
    }

    /// Lagrange multipliers, one per training sample.
    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    /// Bias term.
    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Indices of training samples with a nonzero multiplier.
    pub fn support_indices(&self) -> Vec<usize> {
        self.alpha
            .iter()
            .enumerate()
            .filter(|(_, a)| a.abs() > SUPPORT_EPS)
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of support vectors.
    pub fn n_support_vectors(&self) -> usize {
        self.support_indices().len()
    }
}

fn solve_direct(gram: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>> {
    match dual::solve_stationarity(gram, y) {
        Ok(alpha) => Ok(alpha),
        Err(SolveError::Singular) | Err(SolveError::Degenerate) => Err(TrainError::NotSeparable),
        Err(SolveError::Shape(e)) => Err(TrainError::Lp(e.into())),
    }
}

fn within_box(alpha: &[f64], c: f64) -> bool {
    alpha.iter().all(|&a| a >= -BOUND_EPS && a <= c + BOUND_EPS)
}

/// Bias anchored at the first support vector:
/// `b = 1 / y_m - sum_i alpha_i * y_i * K(x_i, x_m)`.
fn compute_bias(kernel: &Kernel, x: &[Vec<f64>], y: &[f64], alpha: &[f64]) -> Result<f64> {
    let m = alpha
        .iter()
        .position(|a| a.abs() > SUPPORT_EPS)
        .ok_or(TrainError::NotSeparable)?;

    let mut total = 0.0;
    for i in 0..x.len() {
        let k = kernel.compute(&x[i], &x[m]).map_err(SimplexError::from)?;
        total += alpha[i] * y[i] * k;
    }
    Ok(1.0 / y[m] - total)
}

fn validate_training_set(x: &[Vec<f64>], y: &[f64], c: f64) -> Result<(), ValidationError> {
    if x.is_empty() || y.is_empty() {
        return Err(ValidationError::EmptyTrainingSet);
    }
    if x.len() != y.len() {
        return Err(ValidationError::SampleCountMismatch {
            vectors: x.len(),
            labels: y.len(),
        });
    }
    if c <= 0.0 {
        return Err(ValidationError::InvalidBound(c));
    }
    for (index, &label) in y.iter().enumerate() {
        if label != 1.0 && label != -1.0 {
            return Err(ValidationError::InvalidLabel { index, label });
        }
    }
    let expected = x[0].len();
    for (index, sample) in x.iter().enumerate() {
        if sample.len() != expected {
            return Err(ValidationError::DimensionMismatch {
                index,
                expected,
                actual: sample.len(),
            });
        }
    }
    Ok(())
}
