//! End-to-end scenarios against the public `Board`/`Controller` surface,
//! mirroring the teacher's split between `tests/integration_tests.rs`
//! (external behavior) and in-module `#[cfg(test)]` unit tests.

use quoridor_mcts::board::{Board, Side};
use quoridor_mcts::controller::{Controller, ControllerConfig};
use quoridor_mcts::error::EngineError;

fn config(seed: u64, min_simulations: u64, max_simulations: u64, sim_increment: u64) -> ControllerConfig {
    ControllerConfig {
        c: 0.158,
        seed,
        min_simulations,
        max_simulations,
        sim_increment,
        use_rollout: false,
        eval_children: false,
        use_puct: false,
        use_probs: false,
        decide_using_visits: false,
    }
}

// S1 (initial legality): 9x9 fresh board, 3 token moves + 128 wall placements,
// forward move and a corner wall both present, opponent's cell absent.
#[test]
fn s1_initial_legality() {
    let controller = Controller::new(Board::new(9), config(1, 1, 100, 4)).unwrap();
    let moves = controller.get_legal_moves(false);

    assert_eq!(moves.len(), 131);
    assert!(moves.contains(&"*(4,1)".to_string()));
    assert!(moves.contains(&"H(0,0)".to_string()));
    assert!(!moves.contains(&"*(4,8)".to_string()));
}

// S2 (single simulation correctness): after ensure_sims(1) the root has
// exactly one visit, and its value_sum equals the heuristic value of the
// (symmetric, hence zero) starting position.
#[test]
fn s2_single_simulation_correctness() {
    let controller = Controller::new(Board::new(9), config(2, 1, 100, 1)).unwrap();
    let visits = controller.ensure_sims(1);

    assert_eq!(visits, 1);
    assert_eq!(controller.get_visit_count(), 1);
    let equity = controller.get_evaluation().unwrap();
    assert!((equity - 0.0).abs() < 1e-9);
}

// S3 (reroot preserves statistics): the visit count of the child for
// "*(4,1)" before rerooting equals the new root's visit count after.
#[test]
fn s3_reroot_preserves_statistics() {
    let controller = Controller::new(Board::new(9), config(3, 1, 2000, 32)).unwrap();
    controller.ensure_sims(1000);

    let before = controller
        .get_sorted_actions(false)
        .into_iter()
        .find(|(_, _, action)| action == "*(4,1)")
        .map(|(visits, _, _)| visits)
        .expect("forward move should be a root child after 1000 simulations");

    controller.make_move("*(4,1)", false).unwrap();
    assert_eq!(controller.get_visit_count(), before);
}

// S4 (determinism under fixed seed): two engines with identical
// configuration and seed produce identical sorted-action sequences.
#[test]
fn s4_determinism_under_fixed_seed() {
    let cfg = config(4, 1, 1000, 16);
    let a = Controller::new(Board::new(9), cfg).unwrap();
    let b = Controller::new(Board::new(9), cfg).unwrap();

    a.ensure_sims(500);
    b.ensure_sims(500);

    assert_eq!(a.get_sorted_actions(false), b.get_sorted_actions(false));
}

// S5 (terminal detection): hero on its goal row is terminal, hero is the
// winner, and choosing an action fails with NoLegalMoves.
#[test]
fn s5_terminal_detection() {
    let mut board = Board::new(9);
    board.hero_pos = (4, 8);
    board.to_move = Side::Villain;

    let controller = Controller::new(board, config(5, 1, 100, 4)).unwrap();
    assert!(controller.is_terminal());
    assert_eq!(controller.get_winner(), Some(Side::Hero));
    assert!(matches!(
        controller.choose_best_action(0.0),
        Err(EngineError::NoLegalMoves)
    ));
}

// S6 (wall fencing rejected): on a 5x5 board, a wall sequence that would
// fully seal the villain in a corner is rejected, leaving the board state
// unchanged after the failed call.
#[test]
fn s6_wall_fencing_rejected() {
    let mut board = Board::new(5);
    board.hero_pos = (0, 0);
    board.villain_pos = (4, 4);
    board.to_move = Side::Hero;

    let after_top = board.apply("H(3,2)").unwrap();
    let mut sealed_attempt = after_top.clone();
    sealed_attempt.to_move = Side::Hero;

    let before = sealed_attempt.clone();
    let result = sealed_attempt.apply("V(2,3)");
    assert!(matches!(result, Err(EngineError::IllegalMove(_))));
    assert_eq!(sealed_attempt, before);
}

#[test]
fn ensure_sims_zero_is_a_no_op() {
    let controller = Controller::new(Board::new(9), config(6, 0, 100, 4)).unwrap();
    assert_eq!(controller.ensure_sims(0), 0);
}

#[test]
fn sim_increment_zero_is_rejected_at_construction() {
    let result = Controller::new(Board::new(9), config(7, 100, 100, 0));
    assert!(matches!(result, Err(EngineError::Configuration(_))));
}

#[test]
fn reset_to_initial_state_matches_a_fresh_engine() {
    let controller = Controller::new(Board::new(9), config(8, 50, 200, 8)).unwrap();
    controller.ensure_sims(50);
    controller.make_move("*(4,1)", false).unwrap();

    controller.reset_to_initial_state();
    assert_eq!(controller.get_visit_count(), 0);
    assert_eq!(controller.display(false), Board::new(9).display(false));
}

#[test]
fn make_move_rejects_action_not_legal_in_current_position() {
    let controller = Controller::new(Board::new(9), config(9, 1, 100, 4)).unwrap();
    let result = controller.make_move("*(4,8)", false);
    assert!(matches!(result, Err(EngineError::IllegalMove(_))));
}

#[test]
fn set_state_and_make_best_move_replaces_tree_at_given_board() {
    let controller = Controller::new(Board::new(9), config(11, 50, 200, 8)).unwrap();
    controller.ensure_sims(50);
    controller.make_move("*(4,1)", false).unwrap();

    let fresh = Board::new(9);
    let action = controller
        .set_state_and_make_best_move(fresh.clone(), false)
        .unwrap();
    assert_eq!(controller.display(false), fresh.apply(&action).unwrap().display(false));
}

#[test]
fn set_state_and_make_best_move_rejects_terminal_board() {
    let controller = Controller::new(Board::new(9), config(12, 50, 200, 8)).unwrap();
    let mut terminal = Board::new(9);
    terminal.hero_pos = (4, 8);
    terminal.to_move = Side::Villain;
    let result = controller.set_state_and_make_best_move(terminal, false);
    assert!(matches!(result, Err(EngineError::NoLegalMoves)));
}

#[test]
fn shutdown_joins_worker_without_hanging() {
    let controller = Controller::new(Board::new(9), config(10, 1, 100, 4)).unwrap();
    controller.run_simulations(50);
    drop(controller);
}
