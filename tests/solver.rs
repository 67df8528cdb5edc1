//! End-to-end scenarios exercising the public API.

use pbsat::sat::assignment::Status;
use pbsat::sat::problem::Problem;
use pbsat::sat::solver::Solver;

fn problem(nb_vars: usize, clauses: &[&[i32]]) -> Problem {
    let mut p = Problem::new(nb_vars);
    for c in clauses {
        p.add_clause(c).unwrap();
    }
    p
}

#[test]
fn forced_model_is_found() {
    // (x1 v x2) & (!x1 v x2) & (x1 v !x2) has the unique model {T, T}.
    let p = problem(2, &[&[1, 2], &[-1, 2], &[1, -2]]);
    let mut solver = Solver::new(p);
    assert_eq!(solver.solve(), Status::Sat);
    assert_eq!(solver.model(), vec![true, true]);

    let map = solver.model_map();
    assert_eq!(map[&1], true);
    assert_eq!(map[&2], true);
}

#[test]
fn contradictory_units_are_unsat() {
    let p = problem(1, &[&[1], &[-1]]);
    let mut solver = Solver::new(p);
    assert_eq!(solver.solve(), Status::Unsat);
}

/// Pigeonhole principle: `pigeons` pigeons do not fit into `holes` holes.
fn pigeonhole(pigeons: i32, holes: i32) -> Problem {
    let var = |p: i32, h: i32| p * holes + h + 1;
    let mut problem = Problem::new((pigeons * holes) as usize);
    for p in 0..pigeons {
        let lits: Vec<i32> = (0..holes).map(|h| var(p, h)).collect();
        problem.add_clause(&lits).unwrap();
    }
    for h in 0..holes {
        for a in 0..pigeons {
            for b in (a + 1)..pigeons {
                problem.add_clause(&[-var(a, h), -var(b, h)]).unwrap();
            }
        }
    }
    problem
}

#[test]
fn pigeonhole_is_unsat() {
    let mut small = Solver::new(pigeonhole(3, 2));
    assert_eq!(small.solve(), Status::Unsat);

    let mut larger = Solver::new(pigeonhole(5, 4));
    assert_eq!(larger.solve(), Status::Unsat);
}

#[test]
fn count_models_of_single_clause() {
    let mut solver = Solver::new(problem(3, &[&[1, 2, 3]]));
    assert_eq!(solver.count_models(), 7);
}

#[test]
fn count_models_of_free_variables() {
    for k in 0..5 {
        let mut solver = Solver::new(problem(k, &[]));
        assert_eq!(solver.count_models(), 1 << k, "2^{k} models expected");
    }
}

#[test]
fn minimize_over_disjunction() {
    let mut p = problem(3, &[&[1, 2, 3]]);
    p.set_objective(&[1, 2, 3], None).unwrap();
    let check = p.clone();
    let mut solver = Solver::new(p);
    assert_eq!(solver.minimize(), 1);
    let model = solver.model();
    assert_eq!(model.iter().filter(|&&b| b).count(), 1);
    assert!(check.check_model(&model));
}

#[test]
fn minimize_weighted_pb_constraint() {
    let mut p = Problem::new(3);
    p.add_pb(&[1, 2, 3], &[3, 2, 1], 3).unwrap();
    p.set_objective(&[1, 2, 3], None).unwrap();
    let mut solver = Solver::new(p);
    assert_eq!(solver.minimize(), 1);
    assert_eq!(solver.model(), vec![true, false, false]);
}

#[test]
fn optimization_status_survives_in_output() {
    let mut p = Problem::new(2);
    p.add_clause(&[1, 2]).unwrap();
    p.set_objective(&[1, 2], None).unwrap();
    let mut solver = Solver::new(p);
    assert!(solver.optim());
    assert_eq!(solver.minimize(), 1);
    // The tightening loop ends on Unsat, but the optimal model is reported.
    let answer = solver.solution_string();
    assert!(answer.starts_with("s SATISFIABLE\nv "), "{answer}");
}

#[test]
fn cardinality_constraints_solve() {
    // At least 2 of {x1, x2, x3}, at least 2 of {!x1, !x2, !x3}: impossible.
    let mut p = Problem::new(3);
    p.add_cardinality(&[1, 2, 3], 2).unwrap();
    p.add_cardinality(&[-1, -2, -3], 2).unwrap();
    let mut solver = Solver::new(p);
    assert_eq!(solver.solve(), Status::Unsat);

    // Relaxing one side makes it satisfiable with exactly two true.
    let mut p = Problem::new(3);
    p.add_cardinality(&[1, 2, 3], 2).unwrap();
    p.add_cardinality(&[-1, -2, -3], 1).unwrap();
    let check = p.clone();
    let mut solver = Solver::new(p);
    assert_eq!(solver.solve(), Status::Sat);
    let model = solver.model();
    assert_eq!(model.iter().filter(|&&b| b).count(), 2);
    assert!(check.check_model(&model));
}

#[test]
fn enumeration_after_solve_continues() {
    let mut solver = Solver::new(problem(2, &[&[1, 2]]));
    assert_eq!(solver.solve(), Status::Sat);
    // The model already found is counted, then the others.
    assert_eq!(solver.enumerate(None, None), 3);
    assert_eq!(solver.status(), Status::Unsat);
}

#[test]
fn pb_state_round_trips_through_problem() {
    let mut p = Problem::new(3);
    p.add_clause(&[1, -2]).unwrap();
    p.add_pb(&[1, 2, 3], &[2, 1, 1], 2).unwrap();
    let solver = Solver::new(p);
    let dump = solver.pb_string();
    assert!(dump.starts_with("* #variable= 3 #constraint= 2 #learned= 0"));
    assert!(dump.contains(">= 1 ;"));
    assert!(dump.contains(">= 2 ;"));
}

#[test]
fn stats_reflect_the_search() {
    let mut solver = Solver::new(pigeonhole(4, 3));
    assert_eq!(solver.solve(), Status::Unsat);
    let stats = solver.stats;
    assert!(stats.nb_conflicts > 0);
    assert!(stats.nb_decisions > 0);
}
