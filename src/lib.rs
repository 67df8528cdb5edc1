#![warn(missing_docs)]
//! A CDCL satisfiability engine with cardinality and pseudo-Boolean
//! constraints, model enumeration and weighted optimization.
//!
//! The entry point is [`sat::problem::Problem`], which collects
//! constraints in DIMACS-style integers, and [`sat::solver::Solver`],
//! which decides it:
//!
//! ```
//! use pbsat::sat::assignment::Status;
//! use pbsat::sat::problem::Problem;
//! use pbsat::sat::solver::Solver;
//!
//! let mut problem = Problem::new(2);
//! problem.add_clause(&[1, 2]).unwrap();
//! problem.add_clause(&[-1, 2]).unwrap();
//!
//! let mut solver = Solver::new(problem);
//! assert_eq!(solver.solve(), Status::Sat);
//! assert!(solver.model()[1]);
//! ```

/// The `sat` module implements the satisfiability engine: constraint
/// representation, watched-literal propagation, conflict-driven clause
/// learning, and the enumeration and optimization drivers built on top.
pub mod sat;
