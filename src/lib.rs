//! Support vector machine training by linear programming
//!
//! Training reduces the soft-margin dual problem to linear programming
//! through Wolfe's method and solves it with a from-first-principles
//! stack: exact linear-system solvers (Cramer's rule with a
//! Gauss-Jordan fallback), a two-phase primal simplex with custom
//! starting bases and a paired-exclusion pivoting rule, and a small
//! library of kernel functions.
//!
//! ```
//! use lpsvm::{Kernel, SvmTrainer};
//!
//! // the XOR problem, separable under a quadratic kernel
//! let x = vec![
//!     vec![1.0, 1.0],
//!     vec![1.0, -1.0],
//!     vec![-1.0, 1.0],
//!     vec![-1.0, -1.0],
//! ];
//! let y = vec![1.0, -1.0, -1.0, 1.0];
//!
//! let model = SvmTrainer::new()
//!     .with_kernel(Kernel::Polynomial { scale: 1.0, c: 1.0, degree: 2.0 })
//!     .train(&x, &y)
//!     .unwrap();
//!
//! assert_eq!(model.classify(&[1.0, 1.0]).unwrap(), 1.0);
//! assert_eq!(model.classify(&[1.0, -1.0]).unwrap(), -1.0);
//! ```

pub mod core;
pub mod dual;
pub mod kernel;
pub mod linalg;
pub mod simplex;
pub mod svm;

// Re-export main types for convenience
pub use crate::core::error::{
    Result, ShapeError, SimplexError, SolveError, TrainError, ValidationError,
};
pub use crate::core::types::Prediction;
pub use crate::kernel::Kernel;
pub use crate::simplex::{Direction, LinearProgram, SimplexSolution, SimplexSolver};
pub use crate::svm::{SolveStrategy, SvmTrainer, TrainedModel};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
