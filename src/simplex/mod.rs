//! Two-phase primal simplex over dense equality constraints
//!
//! The solver keeps an explicit basis (one column index per constraint
//! row) and re-derives everything it needs each pivot from exact
//! linear-system solves against the basis submatrix. That costs more
//! than incremental tableau updates but keeps every pivot numerically
//! independent: no rounding error accumulates across iterations, and
//! the basis is always the single source of truth.
//!
//! Constraints are augmented rows `[coefficients | rhs]` with all
//! variables implicitly nonnegative. An optional paired-exclusion rule
//! restricts which columns may enter the basis; Wolfe's method for
//! quadratic programs is built on it.

use log::{debug, trace};

use crate::core::error::{ShapeError, SimplexError, SolveError};
use crate::linalg;

/// Reduced costs within this tolerance of zero do not count as improving.
const REDUCED_COST_EPS: f64 = 1e-9;

/// Ratio-test denominators at or below this are treated as nonpositive.
const RATIO_EPS: f64 = 1e-9;

/// Phase-one artificial objective values above this are infeasible.
const FEASIBILITY_EPS: f64 = 1e-7;

/// Default cap on pivots before reporting `DidNotConverge`.
pub const DEFAULT_PIVOT_LIMIT: usize = 1000;

/// Direction of optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Minimize,
    Maximize,
}

/// A linear program over equality constraints in standard form.
#[derive(Debug, Clone)]
pub struct LinearProgram {
    /// One cost coefficient per variable column.
    pub objective: Vec<f64>,
    /// Augmented rows: variable coefficients followed by the RHS.
    pub constraints: Vec<Vec<f64>>,
    /// Direction of optimization.
    pub direction: Direction,
}

impl LinearProgram {
    /// Minimization program over the given augmented constraint rows.
    pub fn minimize(objective: Vec<f64>, constraints: Vec<Vec<f64>>) -> Self {
        Self {
            objective,
            constraints,
            direction: Direction::Minimize,
        }
    }

    /// Maximization program over the given augmented constraint rows.
    pub fn maximize(objective: Vec<f64>, constraints: Vec<Vec<f64>>) -> Self {
        Self {
            objective,
            constraints,
            direction: Direction::Maximize,
        }
    }

    /// Number of variable columns.
    fn columns(&self) -> usize {
        self.constraints
            .first()
            .map(|row| row.len().saturating_sub(1))
            .unwrap_or(0)
    }

    fn validate(&self) -> Result<(), ShapeError> {
        if self.constraints.is_empty() {
            return Err(ShapeError::Empty);
        }
        let width = self.constraints[0].len();
        if width < 2 {
            return Err(ShapeError::Empty);
        }
        for (row, r) in self.constraints.iter().enumerate() {
            if r.len() != width {
                return Err(ShapeError::RaggedRow {
                    row,
                    len: r.len(),
                    expected: width,
                });
            }
        }
        let columns = width - 1;
        if self.objective.len() != columns {
            return Err(ShapeError::ObjectiveMismatch {
                len: self.objective.len(),
                columns,
            });
        }
        if self.constraints.len() > columns {
            // a basis needs one distinct column per row
            return Err(ShapeError::BasisSize {
                len: columns,
                rows: self.constraints.len(),
            });
        }
        Ok(())
    }
}

/// Optimal point returned by the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexSolution {
    /// Value of every variable column; non-basic columns are zero.
    pub values: Vec<f64>,
    /// Objective value at the optimum.
    pub objective: f64,
    /// Final basis, one column index per constraint row.
    pub basis: Vec<usize>,
    /// Number of pivots performed.
    pub pivots: usize,
}

/// Primal simplex solver with an explicit basis.
///
/// The entering column is the one with the most improving reduced cost
/// (most positive when minimizing, most negative when maximizing), ties
/// going to the lowest index. The leaving row is picked by the usual
/// minimum-ratio test over strictly positive decomposition entries,
/// ties going to the first row.
///
/// # Examples
/// ```
/// use lpsvm::simplex::{LinearProgram, SimplexSolver};
///
/// let lp = LinearProgram::maximize(
///     vec![9.0, 5.0, 4.0, 3.0, 2.0, 0.0],
///     vec![
///         vec![1.0, -2.0, 2.0, 0.0, 0.0, 1.0, 6.0],
///         vec![1.0, 2.0, 1.0, 1.0, 0.0, 0.0, 24.0],
///         vec![2.0, 1.0, -4.0, 0.0, 1.0, 0.0, 30.0],
///     ],
/// );
/// let solution = SimplexSolver::new().solve(&lp).unwrap();
/// assert_eq!(solution.values, vec![0.0, 7.0, 10.0, 0.0, 63.0, 0.0]);
/// ```
#[derive(Debug, Clone)]
pub struct SimplexSolver {
    max_pivots: usize,
    paired_exclusion: Option<usize>,
}

impl SimplexSolver {
    /// Solver with the default pivot cap and no exclusion rule.
    pub fn new() -> Self {
        Self {
            max_pivots: DEFAULT_PIVOT_LIMIT,
            paired_exclusion: None,
        }
    }

    /// Cap on pivots before the solver reports `DidNotConverge`.
    pub fn with_max_pivots(mut self, limit: usize) -> Self {
        self.max_pivots = limit;
        self
    }

    /// Enable the paired-exclusion entering rule.
    ///
    /// Columns `i` and `i + offset` (for `i < offset`) form a pair; a
    /// paired column may not enter the basis while its partner is
    /// basic. Columns at `2 * offset` and beyond are unaffected. If the
    /// rule removes every improving candidate the state is optimal.
    pub fn with_paired_exclusion(mut self, offset: usize) -> Self {
        self.paired_exclusion = Some(offset);
        self
    }

    /// Solve from the default basis (the highest-numbered columns).
    ///
    /// Suitable when the trailing columns form a feasible slack-style
    /// identity, as in the canonical test programs.
    pub fn solve(&self, lp: &LinearProgram) -> Result<SimplexSolution, SimplexError> {
        lp.validate()?;
        let basis = self.seed_basis(lp, &[])?;
        self.run(lp, basis)
    }

    /// Solve from a caller-supplied starting basis.
    ///
    /// The basis must index a nonsingular, feasible column set. Fewer
    /// entries than constraint rows are padded with the highest-numbered
    /// unused columns; duplicates are dropped.
    pub fn solve_with_basis(
        &self,
        lp: &LinearProgram,
        basis: &[usize],
    ) -> Result<SimplexSolution, SimplexError> {
        lp.validate()?;
        let basis = self.seed_basis(lp, basis)?;
        self.run(lp, basis)
    }

    /// Solve by the two-phase method.
    ///
    /// Phase one appends one artificial column per row (negating rows
    /// with a negative right-hand side first) and minimizes the
    /// artificial sum from the artificial identity basis. Phase two
    /// optimizes the real objective from the feasible basis found, with
    /// the artificial columns removed.
    ///
    /// # Errors
    /// `SimplexError::Infeasible` when phase one cannot drive the
    /// artificial sum to zero. A zero-valued artificial that cannot be
    /// pivoted out marks a dependent constraint row and surfaces as a
    /// wrapped `SolveError::Degenerate`.
    pub fn solve_two_phase(&self, lp: &LinearProgram) -> Result<SimplexSolution, SimplexError> {
        lp.validate()?;
        let rows = lp.constraints.len();
        let columns = lp.columns();

        // append an artificial identity, canonicalizing RHS signs
        let mut extended: Vec<Vec<f64>> = Vec::with_capacity(rows);
        for row in &lp.constraints {
            let sign = if row[columns] < 0.0 { -1.0 } else { 1.0 };
            let mut out = Vec::with_capacity(columns + rows + 1);
            out.extend(row[..columns].iter().map(|&v| sign * v));
            out.extend(std::iter::repeat(0.0).take(rows));
            out.push(sign * row[columns]);
            extended.push(out);
        }
        for (i, row) in extended.iter_mut().enumerate() {
            row[columns + i] = 1.0;
        }

        let mut phase_one_costs = vec![0.0; columns + rows];
        for cost in phase_one_costs.iter_mut().skip(columns) {
            *cost = 1.0;
        }
        let artificial_basis: Vec<usize> = (columns..columns + rows).collect();

        let phase_one = LinearProgram::minimize(phase_one_costs, extended.clone());
        let feasible = self.run(&phase_one, artificial_basis)?;
        if feasible.objective > FEASIBILITY_EPS {
            return Err(SimplexError::Infeasible);
        }
        debug!(
            "phase one found a feasible basis after {} pivots",
            feasible.pivots
        );

        // pivot out any artificial still basic at value zero
        let mut basis = feasible.basis;
        for position in 0..rows {
            if basis[position] < columns {
                continue;
            }
            basis[position] = self.driveable_column(&extended, &basis, position, columns)?;
        }

        let trimmed: Vec<Vec<f64>> = extended
            .iter()
            .map(|row| {
                let mut out = row[..columns].to_vec();
                out.push(row[columns + rows]);
                out
            })
            .collect();
        let phase_two = LinearProgram {
            objective: lp.objective.clone(),
            constraints: trimmed,
            direction: lp.direction,
        };
        let mut solution = self.run(&phase_two, basis)?;
        solution.pivots += feasible.pivots;
        Ok(solution)
    }

    /// Main pivot loop from a completed basis.
    fn run(&self, lp: &LinearProgram, mut basis: Vec<usize>) -> Result<SimplexSolution, SimplexError> {
        let columns = lp.columns();
        let mut pivots = 0usize;

        loop {
            let basis_values = decompose(&lp.constraints, &basis, Target::Rhs)?;

            let Some((column, decomposition)) = self.entering_column(lp, &basis)? else {
                let mut values = vec![0.0; columns];
                for (position, &col) in basis.iter().enumerate() {
                    values[col] = basis_values[position];
                }
                let objective = basis
                    .iter()
                    .zip(&basis_values)
                    .map(|(&col, &value)| lp.objective[col] * value)
                    .sum();
                debug!("optimal after {} pivots, objective {}", pivots, objective);
                return Ok(SimplexSolution {
                    values,
                    objective,
                    basis,
                    pivots,
                });
            };

            let Some(position) = ratio_test(&basis_values, &decomposition) else {
                return Err(SimplexError::Unbounded);
            };

            trace!(
                "pivot {}: column {} enters, column {} leaves",
                pivots + 1,
                column,
                basis[position]
            );
            basis[position] = column;
            pivots += 1;
            if pivots > self.max_pivots {
                return Err(SimplexError::DidNotConverge {
                    limit: self.max_pivots,
                });
            }
        }
    }

    /// Most improving non-basic, non-excluded column and its basis
    /// decomposition, or `None` at optimality.
    fn entering_column(
        &self,
        lp: &LinearProgram,
        basis: &[usize],
    ) -> Result<Option<(usize, Vec<f64>)>, SolveError> {
        let columns = lp.columns();
        let mut best: Option<(usize, f64, Vec<f64>)> = None;

        for column in 0..columns {
            if basis.contains(&column) || self.is_excluded(column, basis) {
                continue;
            }

            let decomposition = decompose(&lp.constraints, basis, Target::Column(column))?;
            let basis_cost: f64 = basis
                .iter()
                .zip(&decomposition)
                .map(|(&b, &d)| lp.objective[b] * d)
                .sum();
            let reduced = basis_cost - lp.objective[column];

            let improving = match lp.direction {
                Direction::Minimize => reduced > REDUCED_COST_EPS,
                Direction::Maximize => reduced < -REDUCED_COST_EPS,
            };
            if !improving {
                continue;
            }

            // strict comparison: ties stay with the lowest column index
            let better = match &best {
                None => true,
                Some((_, incumbent, _)) => match lp.direction {
                    Direction::Minimize => reduced > *incumbent,
                    Direction::Maximize => reduced < *incumbent,
                },
            };
            if better {
                best = Some((column, reduced, decomposition));
            }
        }

        Ok(best.map(|(column, _, decomposition)| (column, decomposition)))
    }

    fn is_excluded(&self, column: usize, basis: &[usize]) -> bool {
        let Some(offset) = self.paired_exclusion else {
            return false;
        };
        if column >= 2 * offset {
            return false;
        }
        let partner = if column < offset {
            column + offset
        } else {
            column - offset
        };
        basis.contains(&partner)
    }

    /// Complete a starting basis: validate supplied columns, drop
    /// duplicates, pad with the highest-numbered unused columns.
    fn seed_basis(&self, lp: &LinearProgram, supplied: &[usize]) -> Result<Vec<usize>, ShapeError> {
        let rows = lp.constraints.len();
        let columns = lp.columns();
        if supplied.len() > rows {
            return Err(ShapeError::BasisSize {
                len: supplied.len(),
                rows,
            });
        }

        let mut basis: Vec<usize> = Vec::with_capacity(rows);
        for &column in supplied {
            if column >= columns {
                return Err(ShapeError::ColumnOutOfRange { column, columns });
            }
            if !basis.contains(&column) {
                basis.push(column);
            }
        }

        let mut candidate = columns;
        while basis.len() < rows {
            // cannot underflow: rows <= columns is validated upfront
            candidate -= 1;
            if !basis.contains(&candidate) {
                basis.push(candidate);
            }
        }
        Ok(basis)
    }

    /// First real column that can replace the artificial basic at
    /// `position` without changing the (zero) basis value.
    fn driveable_column(
        &self,
        constraints: &[Vec<f64>],
        basis: &[usize],
        position: usize,
        columns: usize,
    ) -> Result<usize, SimplexError> {
        for column in 0..columns {
            if basis.contains(&column) {
                continue;
            }
            let decomposition = decompose(constraints, basis, Target::Column(column))?;
            if decomposition[position].abs() > RATIO_EPS {
                return Ok(column);
            }
        }
        // the row is linearly dependent on the others
        Err(SolveError::Degenerate.into())
    }
}

impl Default for SimplexSolver {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
enum Target {
    Rhs,
    Column(usize),
}

/// Solve the basis subsystem `B * d = target`, where `B` is the basic
/// column submatrix and the target is a variable column or the RHS.
fn decompose(
    constraints: &[Vec<f64>],
    basis: &[usize],
    target: Target,
) -> Result<Vec<f64>, SolveError> {
    let mut system = Vec::with_capacity(constraints.len());
    for row in constraints {
        let mut out: Vec<f64> = basis.iter().map(|&b| row[b]).collect();
        out.push(match target {
            Target::Rhs => row[row.len() - 1],
            Target::Column(column) => row[column],
        });
        system.push(out);
    }
    linalg::solve(&system)
}

/// Leaving row: minimum ratio of basis value to a strictly positive
/// decomposition entry, ties to the first row. `None` means unbounded.
fn ratio_test(basis_values: &[f64], decomposition: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (position, (&value, &coeff)) in basis_values.iter().zip(decomposition).enumerate() {
        if coeff <= RATIO_EPS {
            continue;
        }
        let ratio = value / coeff;
        let better = match best {
            None => true,
            Some((_, incumbent)) => ratio < incumbent,
        };
        if better {
            best = Some((position, ratio));
        }
    }
    best.map(|(position, _)| position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn maximize_fixture() -> LinearProgram {
        LinearProgram::maximize(
            vec![9.0, 5.0, 4.0, 3.0, 2.0, 0.0],
            vec![
                vec![1.0, -2.0, 2.0, 0.0, 0.0, 1.0, 6.0],
                vec![1.0, 2.0, 1.0, 1.0, 0.0, 0.0, 24.0],
                vec![2.0, 1.0, -4.0, 0.0, 1.0, 0.0, 30.0],
            ],
        )
    }

    fn minimize_fixture() -> LinearProgram {
        LinearProgram::minimize(
            vec![1.0, 9.0, 5.0, 3.0, 4.0, 14.0],
            vec![
                vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 20.0],
                vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 50.0],
                vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 30.0],
                vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 60.0],
            ],
        )
    }

    #[test]
    fn test_maximize_fixture() {
        let solution = SimplexSolver::new().solve(&maximize_fixture()).unwrap();
        assert_eq!(solution.values, vec![0.0, 7.0, 10.0, 0.0, 63.0, 0.0]);
        assert_relative_eq!(solution.objective, 201.0);
        assert_eq!(solution.basis, vec![2, 4, 1]);
        assert_eq!(solution.pivots, 2);
    }

    #[test]
    fn test_minimize_fixture_with_custom_basis() {
        let solution = SimplexSolver::new()
            .solve_with_basis(&minimize_fixture(), &[1, 3, 4, 5])
            .unwrap();
        assert_eq!(solution.values, vec![10.0, 0.0, 30.0, 10.0, 50.0, 0.0]);
        assert_relative_eq!(solution.objective, 390.0);
        assert_eq!(solution.basis, vec![0, 3, 4, 2]);
    }

    #[test]
    fn test_resolving_from_optimal_basis_is_idempotent() {
        let solver = SimplexSolver::new();
        let first = solver.solve(&maximize_fixture()).unwrap();
        let again = solver
            .solve_with_basis(&maximize_fixture(), &first.basis)
            .unwrap();
        assert_eq!(again.values, first.values);
        assert_eq!(again.objective, first.objective);
        assert_eq!(again.pivots, 0);
    }

    #[test]
    fn test_unbounded() {
        // x1 = 2 + x0 grows without bound
        let lp = LinearProgram::maximize(vec![1.0, 0.0], vec![vec![-1.0, 1.0, 2.0]]);
        assert_eq!(
            SimplexSolver::new().solve(&lp).unwrap_err(),
            SimplexError::Unbounded
        );
    }

    #[test]
    fn test_pivot_cap() {
        let solver = SimplexSolver::new().with_max_pivots(1);
        assert_eq!(
            solver.solve(&maximize_fixture()).unwrap_err(),
            SimplexError::DidNotConverge { limit: 1 }
        );
    }

    #[test]
    fn test_paired_exclusion_blocks_partner() {
        // without the rule, column 0 enters and wins
        let lp = LinearProgram::maximize(vec![2.0, 1.0], vec![vec![1.0, 1.0, 1.0]]);
        let free = SimplexSolver::new().solve(&lp).unwrap();
        assert_eq!(free.values, vec![1.0, 0.0]);
        assert_relative_eq!(free.objective, 2.0);

        // pairing (0, 1) keeps column 0 out while 1 is basic
        let excluded = SimplexSolver::new()
            .with_paired_exclusion(1)
            .solve(&lp)
            .unwrap();
        assert_eq!(excluded.values, vec![0.0, 1.0]);
        assert_relative_eq!(excluded.objective, 1.0);
    }

    #[test]
    fn test_shape_validation() {
        let solver = SimplexSolver::new();

        let empty = LinearProgram::minimize(vec![], vec![]);
        assert_eq!(
            solver.solve(&empty).unwrap_err(),
            SimplexError::Shape(ShapeError::Empty)
        );

        let bad_objective =
            LinearProgram::minimize(vec![1.0], vec![vec![1.0, 1.0, 1.0]]);
        assert_eq!(
            solver.solve(&bad_objective).unwrap_err(),
            SimplexError::Shape(ShapeError::ObjectiveMismatch { len: 1, columns: 2 })
        );

        let ragged = LinearProgram::minimize(
            vec![1.0, 1.0],
            vec![vec![1.0, 1.0, 1.0], vec![1.0, 1.0]],
        );
        assert_eq!(
            solver.solve(&ragged).unwrap_err(),
            SimplexError::Shape(ShapeError::RaggedRow {
                row: 1,
                len: 2,
                expected: 3
            })
        );

        // more rows than variables leaves no complete basis
        let overdetermined = LinearProgram::minimize(
            vec![1.0],
            vec![vec![1.0, 1.0], vec![1.0, 2.0]],
        );
        assert_eq!(
            solver.solve(&overdetermined).unwrap_err(),
            SimplexError::Shape(ShapeError::BasisSize { len: 1, rows: 2 })
        );
    }

    #[test]
    fn test_basis_validation() {
        let solver = SimplexSolver::new();
        let lp = maximize_fixture();

        assert_eq!(
            solver.solve_with_basis(&lp, &[0, 1, 2, 3]).unwrap_err(),
            SimplexError::Shape(ShapeError::BasisSize { len: 4, rows: 3 })
        );
        assert_eq!(
            solver.solve_with_basis(&lp, &[9]).unwrap_err(),
            SimplexError::Shape(ShapeError::ColumnOutOfRange {
                column: 9,
                columns: 6
            })
        );
    }

    #[test]
    fn test_partial_basis_is_padded() {
        // padding fills the remaining rows with the highest unused columns
        let solution = SimplexSolver::new()
            .solve_with_basis(&maximize_fixture(), &[5])
            .unwrap();
        assert_eq!(solution.values, vec![0.0, 7.0, 10.0, 0.0, 63.0, 0.0]);
    }

    #[test]
    fn test_two_phase_finds_feasible_point() {
        // x0 + x1 = 2, x0 - x1 = 0  =>  (1, 1)
        let lp = LinearProgram::minimize(
            vec![1.0, 1.0],
            vec![vec![1.0, 1.0, 2.0], vec![1.0, -1.0, 0.0]],
        );
        let solution = SimplexSolver::new().solve_two_phase(&lp).unwrap();
        assert_relative_eq!(solution.values[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(solution.values[1], 1.0, epsilon = 1e-10);
        assert_relative_eq!(solution.objective, 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_two_phase_negates_negative_rhs() {
        // x0 - x1 = -2 with x >= 0 admits (0, 2)
        let lp = LinearProgram::minimize(vec![1.0, 0.0], vec![vec![1.0, -1.0, -2.0]]);
        let solution = SimplexSolver::new().solve_two_phase(&lp).unwrap();
        assert_relative_eq!(solution.values[0], 0.0);
        assert_relative_eq!(solution.values[1], 2.0);
        assert_relative_eq!(solution.objective, 0.0);
    }

    #[test]
    fn test_two_phase_infeasible() {
        // x0 + x1 = -1 has no nonnegative solution
        let lp = LinearProgram::minimize(vec![0.0, 0.0], vec![vec![1.0, 1.0, -1.0]]);
        assert_eq!(
            SimplexSolver::new().solve_two_phase(&lp).unwrap_err(),
            SimplexError::Infeasible
        );
    }

    #[test]
    fn test_decompose_reports_singular_basis() {
        // duplicate basis columns make the subsystem singular
        let constraints = vec![
            vec![1.0, 1.0, 0.0, 2.0],
            vec![1.0, 1.0, 1.0, 3.0],
        ];
        let err = decompose(&constraints, &[0, 1], Target::Rhs).unwrap_err();
        assert_eq!(err, SolveError::Degenerate);
    }
}
