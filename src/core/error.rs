//! Error types for the linear-programming SVM implementation
//!
//! Errors are layered the way results flow through the crate: shape
//! violations are caller bugs and sit at the bottom, linear-system and
//! simplex failures wrap them, and `TrainError` is what the public
//! training API returns.

use thiserror::Error;

/// Dimension or size violations in matrix and vector inputs.
///
/// These indicate misuse by the caller (malformed systems, mismatched
/// vector lengths) and are never retried internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("Matrix is not square: {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("Matrix is not an augmented {rows}x{} system: got {rows}x{cols}", rows + 1)]
    NotAugmented { rows: usize, cols: usize },

    #[error("Row {row} has {len} entries, expected {expected}")]
    RaggedRow {
        row: usize,
        len: usize,
        expected: usize,
    },

    #[error("Vector length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Empty matrix or vector")]
    Empty,

    #[error("Objective has {len} coefficients for {columns} variable columns")]
    ObjectiveMismatch { len: usize, columns: usize },

    #[error("Basis has {len} columns for {rows} constraint rows")]
    BasisSize { len: usize, rows: usize },

    #[error("Column {column} out of range for {columns} columns")]
    ColumnOutOfRange { column: usize, columns: usize },
}

/// Failures of the exact linear-system solvers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// Main-matrix determinant is (numerically) zero.
    #[error("Singular system: zero determinant")]
    Singular,

    /// Elimination found no usable pivot; the system has no unique solution.
    #[error("Degenerate system: no usable pivot during elimination")]
    Degenerate,
}

/// Failures of the simplex solver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimplexError {
    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    /// An improving column had no positive ratio-test entry.
    #[error("Objective is unbounded in the direction of optimization")]
    Unbounded,

    /// Phase one terminated with artificial variables still positive.
    #[error("Constraint system is infeasible")]
    Infeasible,

    #[error("Did not converge within {limit} pivots")]
    DidNotConverge { limit: usize },
}

/// Rejections of malformed training sets.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Empty training set")]
    EmptyTrainingSet,

    #[error("Sample count mismatch: {vectors} vectors, {labels} labels")]
    SampleCountMismatch { vectors: usize, labels: usize },

    #[error("Invalid label at sample {index}: expected -1 or +1, got {label}")]
    InvalidLabel { index: usize, label: f64 },

    #[error("Dimension mismatch at sample {index}: expected {expected}, got {actual}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Box constraint must be positive, got {0}")]
    InvalidBound(f64),
}

/// Failures of the training pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No admissible multiplier solution exists for the training set
    /// under the configured kernel and box constraint.
    #[error("Training set is not separable under the configured kernel")]
    NotSeparable,

    #[error("Optimization failed: {0}")]
    Lp(#[from] SimplexError),
}

pub type Result<T, E = TrainError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_error_messages() {
        let err = ShapeError::NotSquare { rows: 2, cols: 3 };
        assert_eq!(err.to_string(), "Matrix is not square: 2x3");

        let err = ShapeError::NotAugmented { rows: 3, cols: 3 };
        assert_eq!(err.to_string(), "Matrix is not an augmented 3x4 system: got 3x3");

        let err = ShapeError::LengthMismatch { left: 2, right: 5 };
        assert_eq!(err.to_string(), "Vector length mismatch: 2 vs 5");
    }

    #[test]
    fn test_error_layering() {
        // Shape errors convert upward through the solver layers
        let shape = ShapeError::Empty;
        let solve: SolveError = shape.clone().into();
        let simplex: SimplexError = solve.into();
        assert_eq!(
            simplex,
            SimplexError::Solve(SolveError::Shape(ShapeError::Empty))
        );

        let validation = ValidationError::EmptyTrainingSet;
        let train: TrainError = validation.into();
        assert_eq!(
            train,
            TrainError::Validation(ValidationError::EmptyTrainingSet)
        );
    }

    #[test]
    fn test_transparent_display() {
        // Transparent variants forward the inner message unchanged
        let solve = SolveError::Shape(ShapeError::Empty);
        assert_eq!(solve.to_string(), "Empty matrix or vector");

        let simplex = SimplexError::DidNotConverge { limit: 500 };
        assert_eq!(simplex.to_string(), "Did not converge within 500 pivots");
    }
}
