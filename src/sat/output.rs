#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Textual views of the solver state.
//!
//! Two serializations are provided: an OPB-flavoured dump of the whole
//! solver state (constraints, learned clauses, top-level facts and the
//! objective, preceded by a summary comment), and the competition-style
//! `s`/`v` answer lines. Neither performs any I/O; callers print or store
//! the strings as they see fit.

use crate::sat::assignment::Status;
use crate::sat::solver::Solver;
use itertools::Itertools;
use std::fmt::Write as _;

impl Solver {
    /// Dumps the solver state as a pseudo-Boolean problem: a header
    /// comment, the objective if any, one line per problem and learned
    /// constraint, and one line per top-level fact.
    #[must_use]
    pub fn pb_string(&self) -> String {
        let mut out = format!(
            "* #variable= {} #constraint= {} #learned= {}\n",
            self.nb_vars,
            self.db.nb_problem(),
            self.db.nb_learned()
        );
        if self.optim() {
            let terms = self
                .min_lits
                .iter()
                .enumerate()
                .map(|(i, lit)| {
                    let weight = self.min_weights.as_ref().map_or(1, |ws| ws[i]);
                    let var = lit.variable() + 1;
                    if lit.is_positive() {
                        format!("{weight} x{var}")
                    } else {
                        format!("{weight} ~x{var}")
                    }
                })
                .join(" +");
            let _ = writeln!(out, "min: {terms} ;");
        }
        for &cref in self.db.problem().iter().chain(self.db.learned()) {
            out.push_str(&self.db[cref].pb_string());
            out.push('\n');
        }
        for v in 0..self.nb_vars {
            #[allow(clippy::cast_possible_truncation)]
            let signed = self.model.signed(v as u32);
            if signed == 1 {
                let _ = writeln!(out, "1 x{} = 1 ;", v + 1);
            } else if signed == -1 {
                let _ = writeln!(out, "1 x{} = 0 ;", v + 1);
            }
        }
        out
    }

    /// The answer in DIMACS competition style: an `s` status line and, when
    /// a model is known, a `v` line of signed variable numbers. A model
    /// found before the search turned Unsat (as optimization does) is still
    /// reported.
    #[must_use]
    pub fn solution_string(&self) -> String {
        if let Some(model) = &self.last_model {
            let values = (0..self.nb_vars)
                .map(|v| {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                    let external = v as i32 + 1;
                    #[allow(clippy::cast_possible_truncation)]
                    let var = v as u32;
                    if model.signed(var) > 0 {
                        external
                    } else {
                        -external
                    }
                })
                .join(" ");
            return format!("s SATISFIABLE\nv {values}\n");
        }
        match self.status() {
            Status::Unsat => "s UNSATISFIABLE\n".to_owned(),
            _ => "s INDETERMINATE\n".to_owned(),
        }
    }

    /// One row of the periodic progress table.
    #[must_use]
    pub(crate) fn progress_line(&self) -> String {
        let deleted_pct = if self.stats.nb_learned == 0 {
            0
        } else {
            100 * self.stats.nb_deleted / self.stats.nb_learned
        };
        format!(
            "c | {:8} | {:11} | {:9} | {:9} | {:3}% | {:6} | {:8}/{:8} |",
            self.stats.nb_restarts + 1,
            self.stats.nb_conflicts,
            self.db.nb_learned(),
            self.stats.nb_deleted,
            deleted_pct,
            self.manager.reduce_epoch(),
            self.stats.nb_unit_learned,
            self.nb_vars,
        )
    }
}
