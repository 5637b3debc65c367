//! Dual formulation of the soft-margin training problem
//!
//! After the label-scaled Gram matrix `G[i][j] = y_i * y_j * K(x_i,
//! x_j)` is built, raw samples are out of the picture and two routes
//! recover the Lagrange multipliers:
//!
//! * [`solve_stationarity`] solves the equality-constrained
//!   stationarity system directly with the exact linear solvers. The
//!   result is a valid optimum whenever it happens to respect the box
//!   constraint, because the bound multipliers are then zero and every
//!   KKT condition holds.
//! * [`solve_wolfe`] encodes the full KKT system, box constraint
//!   included, as a phase-one linear program whose complementarity
//!   conditions map onto the simplex paired-exclusion rule. This is
//!   Wolfe's reduction of a quadratic program to linear programming.

use log::debug;

use crate::core::error::{ShapeError, SimplexError, SolveError};
use crate::kernel::Kernel;
use crate::linalg;
use crate::simplex::{LinearProgram, SimplexSolver};

/// Artificial sums above this mean no complementary feasible point.
const FEASIBILITY_EPS: f64 = 1e-7;

/// Label-scaled Gram matrix: `G[i][j] = y[i] * y[j] * K(x[i], x[j])`.
///
/// Every pair is evaluated independently, without a symmetry shortcut,
/// so any asymmetry in the kernel construction surfaces exactly as
/// computed.
pub fn gram_matrix(
    kernel: &Kernel,
    x: &[Vec<f64>],
    y: &[f64],
) -> Result<Vec<Vec<f64>>, ShapeError> {
    if x.len() != y.len() {
        return Err(ShapeError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }

    let mut gram = Vec::with_capacity(x.len());
    for (i, xi) in x.iter().enumerate() {
        let mut row = Vec::with_capacity(x.len());
        for (j, xj) in x.iter().enumerate() {
            row.push(y[i] * y[j] * kernel.compute(xi, xj)?);
        }
        gram.push(row);
    }
    Ok(gram)
}

/// Solve the stationarity system of the equality-constrained dual.
///
/// Stacks the gradient rows `G_i . alpha + y_i * mu = 1` over the
/// equality row `y . alpha = 0` into one augmented system and hands it
/// to the exact solver. The equality multiplier is discarded.
///
/// # Errors
/// `Singular` and `Degenerate` pass through from the linear solver;
/// malformed inputs are shape errors.
pub fn solve_stationarity(gram: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>, SolveError> {
    let n = check_gram(gram, y)?;

    let mut system = Vec::with_capacity(n + 1);
    for i in 0..n {
        let mut row = Vec::with_capacity(n + 2);
        row.extend_from_slice(&gram[i]);
        row.push(y[i]);
        row.push(1.0);
        system.push(row);
    }
    let mut equality = y.to_vec();
    equality.push(0.0);
    equality.push(0.0);
    system.push(equality);

    let mut solution = linalg::solve(&system)?;
    solution.truncate(n);
    Ok(solution)
}

/// Solve the box-constrained dual through Wolfe's reduction.
///
/// Builds the KKT program with [`kkt_program`]'s layout, seeds the
/// simplex with the artificial identity basis, and runs phase one under
/// the paired-exclusion rule so no complementary pair ever shares the
/// basis. A zero artificial sum certifies a KKT point; its first `n`
/// values are the multipliers.
///
/// # Errors
/// `SimplexError::Infeasible` when the artificial sum cannot be driven
/// to zero; `DidNotConverge` when the pivot cap is exceeded.
pub fn solve_wolfe(
    gram: &[Vec<f64>],
    y: &[f64],
    c: f64,
    max_pivots: usize,
) -> Result<Vec<f64>, SimplexError> {
    let n = check_gram(gram, y)?;

    let (program, layout) = kkt_program(gram, y, c);
    let artificial_basis: Vec<usize> = (0..layout.rows())
        .map(|row| layout.artificial(row))
        .collect();

    let solver = SimplexSolver::new()
        .with_max_pivots(max_pivots)
        .with_paired_exclusion(layout.pair_offset());
    let solution = solver.solve_with_basis(&program, &artificial_basis)?;

    if solution.objective > FEASIBILITY_EPS {
        return Err(SimplexError::Infeasible);
    }
    debug!(
        "complementary feasible point after {} pivots",
        solution.pivots
    );

    Ok(solution.values[..n].to_vec())
}

/// Column layout of the KKT program for `samples` training points.
///
/// Variables in column order: `alpha` (n), bound slacks `s` (n), the
/// positive part of the equality multiplier `mu+`, lower-bound duals
/// `v` (n), upper-bound duals `lambda` (n), the negative part `mu-`,
/// artificials (2n + 1). The equality multiplier is sign-split because
/// simplex variables are nonnegative.
///
/// The first `2n + 1` columns and the following `2n + 1` line up so a
/// single exclusion offset pairs `(alpha_i, v_i)`, `(s_i, lambda_i)`
/// and `(mu+, mu-)`.
struct KktLayout {
    samples: usize,
}

impl KktLayout {
    fn new(samples: usize) -> Self {
        Self { samples }
    }

    fn alpha(&self, i: usize) -> usize {
        i
    }

    fn slack(&self, i: usize) -> usize {
        self.samples + i
    }

    fn mu_plus(&self) -> usize {
        2 * self.samples
    }

    fn lower_dual(&self, i: usize) -> usize {
        2 * self.samples + 1 + i
    }

    fn upper_dual(&self, i: usize) -> usize {
        3 * self.samples + 1 + i
    }

    fn mu_minus(&self) -> usize {
        4 * self.samples + 1
    }

    fn artificial(&self, row: usize) -> usize {
        4 * self.samples + 2 + row
    }

    fn pair_offset(&self) -> usize {
        2 * self.samples + 1
    }

    fn rows(&self) -> usize {
        2 * self.samples + 1
    }

    fn columns(&self) -> usize {
        6 * self.samples + 3
    }
}

/// Assemble the KKT conditions of the box-constrained dual as a
/// phase-one linear program.
///
/// Rows: the equality `sum_i y_i alpha_i = 0`, the box rows `alpha_i +
/// s_i = C`, and the stationarity rows `G_i . alpha + y_i mu+ - y_i
/// mu- - v_i + lambda_i = 1`. Every right-hand side is nonnegative, so
/// the artificial identity is a feasible start.
fn kkt_program(gram: &[Vec<f64>], y: &[f64], c: f64) -> (LinearProgram, KktLayout) {
    let n = y.len();
    let layout = KktLayout::new(n);
    let columns = layout.columns();

    let mut constraints = Vec::with_capacity(layout.rows());

    let mut equality = vec![0.0; columns + 1];
    for (i, &label) in y.iter().enumerate() {
        equality[layout.alpha(i)] = label;
    }
    equality[layout.artificial(0)] = 1.0;
    constraints.push(equality);

    for i in 0..n {
        let mut row = vec![0.0; columns + 1];
        row[layout.alpha(i)] = 1.0;
        row[layout.slack(i)] = 1.0;
        row[layout.artificial(1 + i)] = 1.0;
        row[columns] = c;
        constraints.push(row);
    }

    for i in 0..n {
        let mut row = vec![0.0; columns + 1];
        for j in 0..n {
            row[layout.alpha(j)] = gram[i][j];
        }
        row[layout.mu_plus()] = y[i];
        row[layout.mu_minus()] = -y[i];
        row[layout.lower_dual(i)] = -1.0;
        row[layout.upper_dual(i)] = 1.0;
        row[layout.artificial(1 + n + i)] = 1.0;
        row[columns] = 1.0;
        constraints.push(row);
    }

    let mut objective = vec![0.0; columns];
    for row in 0..layout.rows() {
        objective[layout.artificial(row)] = 1.0;
    }

    (LinearProgram::minimize(objective, constraints), layout)
}

fn check_gram(gram: &[Vec<f64>], y: &[f64]) -> Result<usize, ShapeError> {
    let n = y.len();
    if n == 0 || gram.is_empty() {
        return Err(ShapeError::Empty);
    }
    if gram.len() != n {
        return Err(ShapeError::LengthMismatch {
            left: gram.len(),
            right: n,
        });
    }
    for (row, r) in gram.iter().enumerate() {
        if r.len() != n {
            return Err(ShapeError::RaggedRow {
                row,
                len: r.len(),
                expected: n,
            });
        }
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn xor_samples() -> (Vec<Vec<f64>>, Vec<f64>) {
        (
            vec![
                vec![1.0, 1.0],
                vec![1.0, -1.0],
                vec![-1.0, 1.0],
                vec![-1.0, -1.0],
            ],
            vec![1.0, -1.0, -1.0, 1.0],
        )
    }

    fn xor_kernel() -> Kernel {
        Kernel::Polynomial {
            scale: 1.0,
            c: 1.0,
            degree: 2.0,
        }
    }

    #[test]
    fn test_gram_matrix_xor_fixture() {
        let (x, y) = xor_samples();
        let gram = gram_matrix(&xor_kernel(), &x, &y).unwrap();
        assert_eq!(
            gram,
            vec![
                vec![9.0, -1.0, -1.0, 1.0],
                vec![-1.0, 9.0, 1.0, -1.0],
                vec![-1.0, 1.0, 9.0, -1.0],
                vec![1.0, -1.0, -1.0, 9.0],
            ]
        );
    }

    #[test]
    fn test_gram_matrix_rejects_count_mismatch() {
        let err = gram_matrix(&Kernel::default(), &[vec![1.0]], &[1.0, -1.0]).unwrap_err();
        assert_eq!(err, ShapeError::LengthMismatch { left: 1, right: 2 });
    }

    #[test]
    fn test_stationarity_xor() {
        let (x, y) = xor_samples();
        let gram = gram_matrix(&xor_kernel(), &x, &y).unwrap();
        let alpha = solve_stationarity(&gram, &y).unwrap();

        assert_eq!(alpha.len(), 4);
        for a in &alpha {
            assert_relative_eq!(*a, 0.125, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_stationarity_two_point_problem() {
        // points -1 and +1 on the line, plain dot product
        let gram = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let y = [-1.0, 1.0];
        let alpha = solve_stationarity(&gram, &y).unwrap();
        assert_relative_eq!(alpha[0], 0.5, epsilon = 1e-10);
        assert_relative_eq!(alpha[1], 0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_stationarity_shape_errors() {
        let err = solve_stationarity(&[], &[]).unwrap_err();
        assert_eq!(err, SolveError::Shape(ShapeError::Empty));

        let gram = vec![vec![1.0, 1.0]];
        let err = solve_stationarity(&gram, &[1.0]).unwrap_err();
        assert_eq!(
            err,
            SolveError::Shape(ShapeError::RaggedRow {
                row: 0,
                len: 2,
                expected: 1
            })
        );
    }

    #[test]
    fn test_kkt_layout_pairs_complementary_columns() {
        let layout = KktLayout::new(2);
        let offset = layout.pair_offset();
        assert_eq!(offset, 5);

        // alpha_i pairs with its lower-bound dual
        assert_eq!(layout.alpha(0) + offset, layout.lower_dual(0));
        assert_eq!(layout.alpha(1) + offset, layout.lower_dual(1));
        // slack_i pairs with its upper-bound dual
        assert_eq!(layout.slack(0) + offset, layout.upper_dual(0));
        assert_eq!(layout.slack(1) + offset, layout.upper_dual(1));
        // the sign-split halves of the equality multiplier pair up
        assert_eq!(layout.mu_plus() + offset, layout.mu_minus());
        // artificials sit beyond the exclusion range
        assert!(layout.artificial(0) >= 2 * offset);
        assert_eq!(layout.columns(), 15);
    }

    #[test]
    fn test_kkt_program_rows() {
        let gram = vec![vec![9.0, -1.0], vec![-1.0, 9.0]];
        let y = [-1.0, 1.0];
        let (program, layout) = kkt_program(&gram, &y, 2.0);

        assert_eq!(program.constraints.len(), layout.rows());
        assert_eq!(
            program.constraints[0],
            vec![-1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
        assert_eq!(
            program.constraints[1],
            vec![1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0]
        );
        assert_eq!(
            program.constraints[3],
            vec![9.0, -1.0, 0.0, 0.0, -1.0, -1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0]
        );

        // phase-one objective charges exactly the artificial columns
        let artificial_cost: f64 = (0..layout.rows())
            .map(|row| program.objective[layout.artificial(row)])
            .sum();
        assert_eq!(artificial_cost, layout.rows() as f64);
        let real_cost: f64 = program.objective[..layout.artificial(0)].iter().sum();
        assert_eq!(real_cost, 0.0);
    }

    #[test]
    fn test_wolfe_clamps_at_bound() {
        // the unconstrained optimum (0.5, 0.5) violates C = 0.3, so the
        // complementary point sits on the bound
        let gram = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let y = [-1.0, 1.0];
        let alpha = solve_wolfe(&gram, &y, 0.3, 1000).unwrap();
        assert_relative_eq!(alpha[0], 0.3, epsilon = 1e-9);
        assert_relative_eq!(alpha[1], 0.3, epsilon = 1e-9);
    }

    #[test]
    fn test_wolfe_interior_optimum() {
        let gram = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let y = [-1.0, 1.0];
        let alpha = solve_wolfe(&gram, &y, 1.0, 1000).unwrap();
        assert_relative_eq!(alpha[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(alpha[1], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_wolfe_recovers_stationarity_solution() {
        // with a loose bound both routes agree on the XOR multipliers
        let (x, y) = xor_samples();
        let gram = gram_matrix(&xor_kernel(), &x, &y).unwrap();
        let alpha = solve_wolfe(&gram, &y, 1.0, 1000).unwrap();
        for a in &alpha {
            assert_relative_eq!(*a, 0.125, epsilon = 1e-9);
        }
    }
}
