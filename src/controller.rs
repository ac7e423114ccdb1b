//! Concurrent controller: wraps a [`TreeNode`] with a background worker
//! thread that continuously runs simulations, and a synchronous control
//! surface the foreground caller uses to query and commit moves.
//!
//! Modeled on the teacher's `GtpEngine` (construct-then-command shape,
//! `with_*` builder-style configuration) generalized with the one-thread-
//! plus-condvar worker protocol this crate's specification calls for — no
//! example repo in this pack runs its own search in a background thread, so
//! the worker loop itself follows plain `std::sync` convention rather than
//! any one teacher file.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::board::{Board, Side};
use crate::error::EngineError;
use crate::tree::{SearchParams, TreeNode};

/// How long `ensure_sims` will wait for the worker to reach the requested
/// visit count before giving up and returning what was achieved so far.
const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll interval used while waiting for the worker to make progress.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Tunable knobs for a [`Controller`]. Constructible directly — there is no
/// file, environment, or wire-protocol configuration surface, per the
/// engine's non-goals.
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    /// UCB1/PUCT exploration constant.
    pub c: f64,
    /// Seed for the controller's random number generator.
    pub seed: u64,
    /// Lower bound the controller tries to reach before any decision query.
    pub min_simulations: u64,
    /// Upper bound `run_simulations`/`ensure_sims` will ever raise the
    /// target to, regardless of how it is called.
    pub max_simulations: u64,
    /// Number of simulations the worker runs per claimed batch.
    pub sim_increment: u64,
    /// Use rollout-to-terminal leaf evaluation instead of the static
    /// heuristic.
    pub use_rollout: bool,
    /// Seed newly-expanded children with a heuristic value at expansion.
    pub eval_children: bool,
    /// PUCT selection instead of UCB1.
    pub use_puct: bool,
    /// Use stored priors instead of uniform in PUCT.
    pub use_probs: bool,
    /// Rank `choose_best_action`/`set_state_and_make_best_move` by visit
    /// count rather than by q-value.
    pub decide_using_visits: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            c: std::f64::consts::SQRT_2,
            seed: 0,
            min_simulations: 100,
            max_simulations: 100_000,
            sim_increment: 64,
            use_rollout: true,
            eval_children: false,
            use_puct: false,
            use_probs: false,
            decide_using_visits: true,
        }
    }
}

impl ControllerConfig {
    fn search_params(&self) -> SearchParams {
        SearchParams {
            c: self.c,
            use_rollout: self.use_rollout,
            eval_children: self.eval_children,
            use_puct: self.use_puct,
            use_probs: self.use_probs,
        }
    }
}

/// The tree root and RNG, protected by one coarse mutex — every foreground
/// operation and every worker pass acquires this lock for the duration of
/// its work, per the design notes' "single coarse mutex" choice.
struct Locked {
    root: TreeNode,
    rng: fastrand::Rng,
}

/// A background-searched Quoridor-family engine.
pub struct Controller {
    locked: Arc<Mutex<Locked>>,
    wait_lock: Arc<Mutex<()>>,
    condvar: Arc<Condvar>,
    stop: Arc<AtomicBool>,
    target_simulations: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
    config: Arc<ControllerConfig>,
}

impl Controller {
    /// Construct a controller rooted at `board` with the given `config`.
    /// Fails with [`EngineError::Configuration`] if `sim_increment == 0`.
    pub fn new(board: Board, config: ControllerConfig) -> Result<Controller, EngineError> {
        if config.sim_increment == 0 {
            warn!("rejecting controller configuration: sim_increment must be >= 1");
            return Err(EngineError::Configuration(
                "sim_increment must be >= 1".to_string(),
            ));
        }

        let locked = Arc::new(Mutex::new(Locked {
            root: TreeNode::new(board),
            rng: fastrand::Rng::with_seed(config.seed),
        }));
        let wait_lock = Arc::new(Mutex::new(()));
        let condvar = Arc::new(Condvar::new());
        let stop = Arc::new(AtomicBool::new(false));
        let target_simulations = Arc::new(AtomicU64::new(0));
        let config = Arc::new(config);

        let worker = {
            let locked = Arc::clone(&locked);
            let wait_lock = Arc::clone(&wait_lock);
            let condvar = Arc::clone(&condvar);
            let stop = Arc::clone(&stop);
            let target_simulations = Arc::clone(&target_simulations);
            let config = Arc::clone(&config);
            std::thread::spawn(move || {
                worker_loop(locked, wait_lock, condvar, stop, target_simulations, config)
            })
        };

        info!(seed = config.seed, "controller constructed, worker started");

        Ok(Controller {
            locked,
            wait_lock,
            condvar,
            stop,
            target_simulations,
            worker: Some(worker),
            config,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Locked> {
        self.locked.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Raise the simulation target by `n` (clamped to `max_simulations`) and
    /// wake the worker. Does not wait for the work to complete. The clamp is
    /// applied as a single atomic read-modify-write so a concurrent
    /// decrement from the worker's batch loop is never stomped by a stale
    /// `store`.
    pub fn run_simulations(&self, n: u64) {
        let max = self.config.max_simulations;
        let _ = self
            .target_simulations
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(n).min(max))
            });
        let _guard = self.wait_lock.lock().unwrap_or_else(|p| p.into_inner());
        self.condvar.notify_one();
    }

    /// Block (up to a ~10s watchdog) until the root has at least `n` total
    /// visits, raising the target as needed. Returns the visit count
    /// actually achieved; never errors — a watchdog timeout is best-effort,
    /// not a failure.
    pub fn ensure_sims(&self, n: u64) -> u64 {
        self.ensure_visits(n)
    }

    fn ensure_visits(&self, target: u64) -> u64 {
        let start = Instant::now();
        let current = self.lock().root.get_visit_count();
        if current < target {
            self.run_simulations(target - current);
        }
        loop {
            let current = self.lock().root.get_visit_count();
            if current >= target {
                return current;
            }
            if start.elapsed() >= WATCHDOG_TIMEOUT {
                self.target_simulations.store(0, Ordering::SeqCst);
                warn!(
                    requested = target,
                    achieved = current,
                    "ensure_sims watchdog timeout; force-draining target and returning best effort"
                );
                return current;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Human-readable board rendering of the current root.
    pub fn display(&self, flip: bool) -> String {
        self.lock().root.get_state().display(flip)
    }

    /// Legal action strings at the current root, in stable order.
    pub fn get_legal_moves(&self, flip: bool) -> Vec<String> {
        self.lock()
            .root
            .get_state()
            .legal_actions(flip)
            .into_iter()
            .map(|(s, _)| s)
            .collect()
    }

    /// `(visits, q_value, action)` for every child of the current root,
    /// sorted by visits descending.
    pub fn get_sorted_actions(&self, flip: bool) -> Vec<(u64, f64, String)> {
        self.lock().root.get_sorted_actions(flip)
    }

    /// Root equity from hero's perspective.
    pub fn get_evaluation(&self) -> Result<f64, EngineError> {
        self.lock().root.get_equity()
    }

    pub fn get_visit_count(&self) -> u64 {
        self.lock().root.get_visit_count()
    }

    pub fn is_terminal(&self) -> bool {
        self.lock().root.get_state().is_terminal()
    }

    pub fn get_winner(&self) -> Option<Side> {
        self.lock().root.get_state().winner()
    }

    /// Pick the current root's best action without committing it.
    pub fn choose_best_action(&self, epsilon: f64) -> Result<String, EngineError> {
        let mut guard = self.lock();
        let decide_using_visits = self.config.decide_using_visits;
        let Locked { root, rng } = &mut *guard;
        root.choose_best_action(rng, epsilon, decide_using_visits)
    }

    /// Commit `action` (possibly flipped) as a move, rerooting the tree at
    /// the matching child (or a freshly synthesized one) and discarding the
    /// rest of the search.
    pub fn make_move(&self, action: &str, flip: bool) -> Result<(), EngineError> {
        let mut guard = self.lock();
        let new_root = guard.root.make_move(action, flip)?;
        debug!(action, "reroot after make_move");
        guard.root = new_root;
        Ok(())
    }

    /// Replace the tree with a fresh root at `board`, run `min_simulations`
    /// simulations synchronously, reroot to the action `choose_best_action`
    /// judges best (`epsilon = 0`), and return it. Fails with
    /// [`EngineError::NoLegalMoves`] when `board` is already terminal.
    pub fn set_state_and_make_best_move(
        &self,
        board: Board,
        flip: bool,
    ) -> Result<String, EngineError> {
        if board.is_terminal() {
            return Err(EngineError::NoLegalMoves);
        }
        {
            let mut guard = self.lock();
            guard.root = TreeNode::new(board);
        }
        debug!("tree replaced via set_state_and_make_best_move");
        self.ensure_sims(self.config.min_simulations);
        let action = self.choose_best_action(0.0)?;
        self.make_move(&action, false)?;
        if flip {
            self.lock().root.get_state().flip_action_str(&action).map_err(|_| {
                EngineError::IllegalMove(action.clone())
            })
        } else {
            Ok(action)
        }
    }

    /// Discard all search state and reroot at a fresh starting position of
    /// the same board size.
    pub fn reset_to_initial_state(&self) {
        let size = self.lock().root.get_state().size;
        let mut guard = self.lock();
        guard.root = TreeNode::new(Board::new(size));
        debug!(size, "controller reset to initial state");
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        info!("controller shutting down, stopping worker");
        self.stop.store(true, Ordering::SeqCst);
        {
            let _guard = self.wait_lock.lock().unwrap_or_else(|p| p.into_inner());
            self.condvar.notify_all();
        }
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        info!("controller worker joined, shutdown complete");
    }
}

fn worker_loop(
    locked: Arc<Mutex<Locked>>,
    wait_lock: Arc<Mutex<()>>,
    condvar: Arc<Condvar>,
    stop: Arc<AtomicBool>,
    target_simulations: Arc<AtomicU64>,
    config: Arc<ControllerConfig>,
) {
    loop {
        {
            let mut guard = wait_lock.lock().unwrap_or_else(|p| p.into_inner());
            while !stop.load(Ordering::SeqCst) && target_simulations.load(Ordering::SeqCst) == 0 {
                guard = condvar.wait(guard).unwrap_or_else(|p| p.into_inner());
            }
        }
        if stop.load(Ordering::SeqCst) {
            break;
        }

        let remaining = target_simulations.load(Ordering::SeqCst);
        let batch = remaining.min(config.sim_increment);
        for _ in 0..batch {
            if stop.load(Ordering::SeqCst) {
                break;
            }
            if target_simulations.load(Ordering::SeqCst) == 0 {
                break;
            }
            run_one_simulation(&locked, &config);
            target_simulations.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some(v.saturating_sub(1))
            })
            .ok();
        }
    }
}

/// Run exactly one simulation, containing any panic so a single bad pass
/// never takes down the worker thread or poisons the tree permanently.
fn run_one_simulation(locked: &Arc<Mutex<Locked>>, config: &ControllerConfig) {
    let locked = Arc::clone(locked);
    let params = config.search_params();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut guard = locked.lock().unwrap_or_else(|p| p.into_inner());
        let Locked { root, rng } = &mut *guard;
        root.simulate(1, rng, &params);
    }));
    if let Err(panic) = result {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        warn!(message, "simulation panicked; containing and continuing");
    }
}
