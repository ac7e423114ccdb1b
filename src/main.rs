//! Minimal self-play demo for the Quoridor-family MCTS engine.
//!
//! Runs a fixed number of moves of hero-vs-villain self-play, printing the
//! board and the engine's top-ranked actions after each move. Not a GUI, a
//! network front-end, or a GTP-style protocol loop — those are out of scope
//! for this crate (see `SPEC_FULL.md` §1) — just enough to watch the engine
//! think.

use anyhow::Context;

use quoridor_mcts::board::Board;
use quoridor_mcts::controller::{Controller, ControllerConfig};

const BOARD_SIZE: u8 = 9;
const SIMS_PER_MOVE: u64 = 400;
const MAX_MOVES: u32 = 60;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ControllerConfig {
        min_simulations: SIMS_PER_MOVE,
        ..ControllerConfig::default()
    };
    let controller = Controller::new(Board::new(BOARD_SIZE), config)
        .context("constructing controller with the demo's own fixed config")?;

    println!("{}", controller.display(false));

    for ply in 1..=MAX_MOVES {
        if controller.is_terminal() {
            break;
        }

        let visits = controller.ensure_sims(SIMS_PER_MOVE);
        let top = controller.get_sorted_actions(false);
        let action = controller
            .choose_best_action(0.0)
            .context("picking a move from a non-terminal root")?;
        controller
            .make_move(&action, false)
            .context("committing choose_best_action's own suggestion")?;

        println!("ply {ply}: {action} (root visits={visits})");
        for (n, q, a) in top.iter().take(3) {
            println!("  {a}: visits={n} q={q:.3}");
        }
        println!("{}", controller.display(false));
    }

    match controller.get_winner() {
        Some(winner) => println!("winner: {winner:?}"),
        None => println!("no winner after {MAX_MOVES} plies"),
    }

    Ok(())
}
