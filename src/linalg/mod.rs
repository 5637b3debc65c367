//! Exact linear-system solvers and dense vector primitives
//!
//! Everything here works on plain `Vec<f64>` rows. Linear systems are
//! passed in augmented form: n coefficient columns followed by one
//! right-hand-side column. Systems are solved by Cramer's rule first;
//! when the determinant test reports a singular system the caller-facing
//! [`solve`] falls back to Gauss-Jordan elimination, whose verdict is
//! final.

use crate::core::error::{ShapeError, SolveError};

/// Determinants with absolute value at or below this count as zero.
pub(crate) const DET_EPS: f64 = 1e-12;

/// Pivot entries with absolute value at or below this are unusable.
const PIVOT_EPS: f64 = 1e-12;

/// Cofactor expansion is used up to this size, elimination beyond.
const COFACTOR_LIMIT: usize = 6;

/// Dot product of two dense vectors.
///
/// # Errors
/// `ShapeError::LengthMismatch` if the vectors differ in length.
pub fn dot(x: &[f64], y: &[f64]) -> Result<f64, ShapeError> {
    if x.len() != y.len() {
        return Err(ShapeError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    Ok(x.iter().zip(y).map(|(a, b)| a * b).sum())
}

/// Euclidean distance between two dense vectors.
///
/// # Errors
/// `ShapeError::LengthMismatch` if the vectors differ in length.
pub fn euclidean_distance(x: &[f64], y: &[f64]) -> Result<f64, ShapeError> {
    if x.len() != y.len() {
        return Err(ShapeError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    let sum: f64 = x.iter().zip(y).map(|(a, b)| (a - b) * (a - b)).sum();
    Ok(sum.sqrt())
}

/// Determinant of a square matrix.
///
/// Computed by cofactor expansion along the first row. Matrices larger
/// than a small threshold go through elimination with partial pivoting
/// instead, which yields the same value within floating tolerance while
/// staying polynomial in the matrix size.
///
/// # Errors
/// `ShapeError` if the matrix is empty, ragged, or not square.
pub fn determinant(matrix: &[Vec<f64>]) -> Result<f64, ShapeError> {
    let n = check_square(matrix)?;
    if n <= COFACTOR_LIMIT {
        Ok(cofactor_determinant(matrix, n))
    } else {
        Ok(elimination_determinant(matrix, n))
    }
}

/// Coefficient matrix of an augmented system (right-hand side dropped).
pub fn cramer_main_matrix(augmented: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ShapeError> {
    let n = check_augmented(augmented)?;
    Ok(augmented.iter().map(|row| row[..n].to_vec()).collect())
}

/// Coefficient matrix with `column` replaced by the right-hand side.
pub fn cramer_matrix(augmented: &[Vec<f64>], column: usize) -> Result<Vec<Vec<f64>>, ShapeError> {
    let n = check_augmented(augmented)?;
    if column >= n {
        return Err(ShapeError::ColumnOutOfRange { column, columns: n });
    }
    Ok(augmented
        .iter()
        .map(|row| {
            let mut out = row[..n].to_vec();
            out[column] = row[n];
            out
        })
        .collect())
}

/// Solve an augmented system by Cramer's rule.
///
/// Each unknown is the quotient of a column-substituted determinant and
/// the main-matrix determinant.
///
/// # Errors
/// `SolveError::Singular` when the main determinant is numerically zero;
/// malformed systems are `SolveError::Shape`.
pub fn solve_cramer(augmented: &[Vec<f64>]) -> Result<Vec<f64>, SolveError> {
    let n = check_augmented(augmented)?;
    let main = cramer_main_matrix(augmented)?;
    let d = determinant(&main)?;
    if d.abs() <= DET_EPS {
        return Err(SolveError::Singular);
    }

    let mut solution = Vec::with_capacity(n);
    for column in 0..n {
        let numerator = determinant(&cramer_matrix(augmented, column)?)?;
        solution.push(numerator / d);
    }
    Ok(solution)
}

/// Solve an augmented system by Gauss-Jordan elimination.
///
/// A zero pivot triggers a row interchange with the first later row that
/// can supply a nonzero one.
///
/// # Errors
/// `SolveError::Degenerate` when no row can supply a pivot for some
/// column, i.e. the system has no unique solution.
pub fn solve_gauss_jordan(augmented: &[Vec<f64>]) -> Result<Vec<f64>, SolveError> {
    let n = check_augmented(augmented)?;
    let mut a: Vec<Vec<f64>> = augmented.to_vec();

    for col in 0..n {
        if a[col][col].abs() <= PIVOT_EPS {
            let swap = (col + 1..n)
                .find(|&row| a[row][col].abs() > PIVOT_EPS)
                .ok_or(SolveError::Degenerate)?;
            a.swap(col, swap);
        }

        let pivot = a[col][col];
        for k in col..=n {
            a[col][k] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                a[row][k] -= factor * a[col][k];
            }
        }
    }

    Ok(a.iter().map(|row| row[n]).collect())
}

/// Solve an augmented system, preferring Cramer's rule.
///
/// Falls back to Gauss-Jordan elimination when the determinant test
/// reports a singular system. If elimination also fails its error is
/// returned unchanged.
pub fn solve(augmented: &[Vec<f64>]) -> Result<Vec<f64>, SolveError> {
    match solve_cramer(augmented) {
        Err(SolveError::Singular) => solve_gauss_jordan(augmented),
        other => other,
    }
}

/// Check that every row of `matrix` has the same nonzero width.
fn check_rectangular(matrix: &[Vec<f64>]) -> Result<usize, ShapeError> {
    let first = matrix.first().ok_or(ShapeError::Empty)?;
    let width = first.len();
    if width == 0 {
        return Err(ShapeError::Empty);
    }
    for (row, r) in matrix.iter().enumerate() {
        if r.len() != width {
            return Err(ShapeError::RaggedRow {
                row,
                len: r.len(),
                expected: width,
            });
        }
    }
    Ok(width)
}

fn check_square(matrix: &[Vec<f64>]) -> Result<usize, ShapeError> {
    let width = check_rectangular(matrix)?;
    if width != matrix.len() {
        return Err(ShapeError::NotSquare {
            rows: matrix.len(),
            cols: width,
        });
    }
    Ok(matrix.len())
}

fn check_augmented(matrix: &[Vec<f64>]) -> Result<usize, ShapeError> {
    let width = check_rectangular(matrix)?;
    if width != matrix.len() + 1 {
        return Err(ShapeError::NotAugmented {
            rows: matrix.len(),
            cols: width,
        });
    }
    Ok(matrix.len())
}

fn cofactor_determinant(matrix: &[Vec<f64>], n: usize) -> f64 {
    if n == 1 {
        return matrix[0][0];
    }

    let mut det = 0.0;
    let mut sign = 1.0;
    for col in 0..n {
        let sub = minor(matrix, 0, col);
        det += sign * matrix[0][col] * cofactor_determinant(&sub, n - 1);
        sign = -sign;
    }
    det
}

/// Copy of `matrix` with row `i` and column `j` removed.
fn minor(matrix: &[Vec<f64>], i: usize, j: usize) -> Vec<Vec<f64>> {
    matrix
        .iter()
        .enumerate()
        .filter(|&(row, _)| row != i)
        .map(|(_, r)| {
            r.iter()
                .enumerate()
                .filter(|&(col, _)| col != j)
                .map(|(_, &v)| v)
                .collect()
        })
        .collect()
}

fn elimination_determinant(matrix: &[Vec<f64>], n: usize) -> f64 {
    let mut a: Vec<Vec<f64>> = matrix.to_vec();
    let mut det = 1.0;

    for col in 0..n {
        let mut pivot = col;
        for row in col + 1..n {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() <= PIVOT_EPS {
            return 0.0;
        }
        if pivot != col {
            a.swap(pivot, col);
            det = -det;
        }

        det *= a[col][col];
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
        }
    }

    det
}
