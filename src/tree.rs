//! Search tree: node statistics, selection/expansion/evaluation/backup, and
//! action ranking.
//!
//! Nodes form a strict tree — each [`TreeNode`] owns its `children` in a
//! plain `Vec`, the same single-owner convention the teacher's `board.rs` 2D
//! board and `mcts.rs` `TreeNode` both use, rather than the `Rc<RefCell<_>>`
//! graph some MCTS engines reach for. Selection/backup is implemented with
//! plain recursion (the call stack carries the path, per the design notes);
//! Rust's recursion is cheap enough at Quoridor's search depths that no
//! explicit path vector is needed.

use crate::board::{Board, Side};
use crate::error::EngineError;

/// The algorithm-selection flag group threaded through every `simulate` and
/// `choose_best_action` call. Bundled into one struct because every caller
/// in practice passes the same tuple repeatedly — the runtime analogue of
/// the teacher's compile-time `constants` module.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    /// Exploration constant `c`.
    pub c: f64,
    /// Rollout-to-terminal leaf evaluation instead of the static heuristic.
    pub use_rollout: bool,
    /// Seed newly-expanded children with a heuristic value at expansion time.
    pub eval_children: bool,
    /// PUCT (AlphaZero-style) selection instead of UCB1.
    pub use_puct: bool,
    /// Use stored priors instead of a uniform distribution in PUCT.
    pub use_probs: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            c: std::f64::consts::SQRT_2,
            use_rollout: true,
            eval_children: false,
            use_puct: false,
            use_probs: false,
        }
    }
}

/// A node in the Monte Carlo search tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// The board position at this node.
    pub state: Board,
    /// The action string that produced this node from its parent, `None` at
    /// the root.
    pub action: Option<String>,
    /// Number of completed simulations through this node.
    pub visit_count: u64,
    /// Accumulated leaf value, hero-positive, in `[-visit_count, visit_count]`.
    pub value_sum: f64,
    /// Prior move probability in `[0, 1]`, `None` means uniform.
    pub prior: Option<f64>,
    /// Whether `children` has been populated.
    pub expanded: bool,
    /// Child nodes, one per legal successor, in `Board::legal_actions` order.
    pub children: Vec<TreeNode>,
    /// Whether `cached_value` holds a leaf estimate.
    pub evaluated: bool,
    /// Cached leaf value (rollout outcome or heuristic), hero-positive.
    pub cached_value: f64,
}

impl TreeNode {
    /// Create a fresh, unexpanded node for `state` (used both for the root
    /// and internally when `make_move` must synthesize a child).
    pub fn new(state: Board) -> Self {
        TreeNode {
            state,
            action: None,
            visit_count: 0,
            value_sum: 0.0,
            prior: None,
            expanded: false,
            children: Vec::new(),
            evaluated: false,
            cached_value: 0.0,
        }
    }

    #[inline]
    pub fn get_visit_count(&self) -> u64 {
        self.visit_count
    }

    #[inline]
    pub fn get_state(&self) -> &Board {
        &self.state
    }

    /// Equity from hero's perspective. `Err(NotEvaluated)` if never visited.
    pub fn get_equity(&self) -> Result<f64, EngineError> {
        if self.visit_count == 0 {
            Err(EngineError::NotEvaluated)
        } else {
            Ok(self.value_sum / self.visit_count as f64)
        }
    }

    fn terminal_value(state: &Board) -> f64 {
        match state.winner() {
            Some(Side::Hero) => 1.0,
            Some(Side::Villain) => -1.0,
            None => 0.0,
        }
    }

    /// Run `n` select→expand→evaluate→backup passes rooted at `self`.
    pub fn simulate(&mut self, n: usize, rng: &mut fastrand::Rng, params: &SearchParams) {
        for _ in 0..n {
            self.simulate_one(rng, params);
        }
    }

    /// One pass. Returns the backed-up leaf value (hero-positive) so the
    /// caller (an ancestor frame) can fold it into its own statistics.
    fn simulate_one(&mut self, rng: &mut fastrand::Rng, params: &SearchParams) -> f64 {
        if self.state.is_terminal() {
            let value = Self::terminal_value(&self.state);
            self.visit_count += 1;
            self.value_sum += value;
            return value;
        }

        if !self.expanded {
            self.expand(params);
            let value = Self::evaluate_leaf(&self.state, rng, params);
            self.evaluated = true;
            self.cached_value = value;
            self.visit_count += 1;
            self.value_sum += value;
            return value;
        }

        let idx = self.select_child_index(params);
        let value = self.children[idx].simulate_one(rng, params);
        self.visit_count += 1;
        self.value_sum += value;
        value
    }

    /// Populate `children` with one node per legal successor. No-op if
    /// already expanded.
    fn expand(&mut self, params: &SearchParams) {
        if self.expanded {
            return;
        }
        self.children = self
            .state
            .legal_actions(false)
            .into_iter()
            .map(|(action, successor)| {
                let mut child = TreeNode::new(successor);
                child.action = Some(action);
                if params.eval_children && !child.state.is_terminal() {
                    child.cached_value = child.state.heuristic_value();
                    child.evaluated = true;
                }
                child
            })
            .collect();
        self.expanded = true;
    }

    fn evaluate_leaf(state: &Board, rng: &mut fastrand::Rng, params: &SearchParams) -> f64 {
        if params.use_rollout {
            Self::rollout(state, rng)
        } else {
            state.heuristic_value()
        }
    }

    /// Uniform-random playout to terminal or a hard ply cap.
    fn rollout(state: &Board, rng: &mut fastrand::Rng) -> f64 {
        let cap = 4 * (state.size as u32) * (state.size as u32);
        let mut board = state.clone();
        let mut plies = 0u32;
        while !board.is_terminal() && plies < cap {
            let actions = board.legal_actions(false);
            if actions.is_empty() {
                break;
            }
            let idx = rng.usize(..actions.len());
            board = actions.into_iter().nth(idx).unwrap().1;
            plies += 1;
        }
        if board.is_terminal() {
            Self::terminal_value(&board)
        } else {
            board.heuristic_value()
        }
    }

    /// Selection score for one child, from `parent_side`'s perspective.
    fn selection_score(
        parent_visits: u64,
        parent_side: Side,
        child: &TreeNode,
        num_children: usize,
        params: &SearchParams,
    ) -> f64 {
        let n_i = child.visit_count;
        let q_hero = if n_i > 0 {
            child.value_sum / n_i as f64
        } else if child.evaluated {
            child.cached_value
        } else {
            0.0
        };
        let q_i = match parent_side {
            Side::Hero => q_hero,
            Side::Villain => -q_hero,
        };

        if params.use_puct {
            let p_i = if params.use_probs {
                child.prior.unwrap_or(1.0 / num_children as f64)
            } else {
                1.0 / num_children as f64
            };
            q_i + params.c * p_i * (parent_visits as f64).sqrt() / (1.0 + n_i as f64)
        } else {
            if parent_visits == 0 && n_i == 0 {
                return f64::INFINITY;
            }
            q_i + params.c * ((parent_visits.max(1) as f64).ln() / (n_i.max(1) as f64)).sqrt()
        }
    }

    /// Index of the child with the maximum selection score, ties broken by
    /// lowest index.
    fn select_child_index(&self, params: &SearchParams) -> usize {
        let parent_visits = self.visit_count;
        let parent_side = self.state.to_move;
        let num_children = self.children.len();
        let mut best_idx = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (i, child) in self.children.iter().enumerate() {
            let score =
                Self::selection_score(parent_visits, parent_side, child, num_children, params);
            if score > best_score {
                best_score = score;
                best_idx = i;
            }
        }
        best_idx
    }

    /// Pick a child: with probability `epsilon` a uniformly random legal
    /// child, otherwise the child maximising visit count or q-value (ties
    /// broken by lowest index).
    pub fn choose_best_action(
        &self,
        rng: &mut fastrand::Rng,
        epsilon: f64,
        decide_using_visits: bool,
    ) -> Result<String, EngineError> {
        if self.children.is_empty() {
            return Err(EngineError::NoLegalMoves);
        }
        if epsilon > 0.0 && rng.f64() < epsilon {
            let idx = rng.usize(..self.children.len());
            return Ok(self.children[idx].action.clone().unwrap());
        }

        let side = self.state.to_move;
        let mut best_idx = 0;
        let mut best_key = f64::NEG_INFINITY;
        for (i, child) in self.children.iter().enumerate() {
            let key = if decide_using_visits {
                child.visit_count as f64
            } else {
                let q_hero = if child.visit_count > 0 {
                    child.value_sum / child.visit_count as f64
                } else if child.evaluated {
                    child.cached_value
                } else {
                    0.0
                };
                match side {
                    Side::Hero => q_hero,
                    Side::Villain => -q_hero,
                }
            };
            if key > best_key {
                best_key = key;
                best_idx = i;
            }
        }
        Ok(self.children[best_idx].action.clone().unwrap())
    }

    /// Reroot to the child matching `action` (after optionally un-flipping
    /// it), reusing accumulated statistics. If no child matches — the node
    /// is unexpanded, or the action simply wasn't among the children —
    /// synthesizes a fresh child for that legal successor and discards the
    /// rest of the tree.
    pub fn make_move(&mut self, action: &str, flip: bool) -> Result<TreeNode, EngineError> {
        let real_action = if flip {
            self.state.flip_action_str(action)?
        } else {
            action.to_string()
        };

        if let Some(idx) = self
            .children
            .iter()
            .position(|c| c.action.as_deref() == Some(real_action.as_str()))
        {
            return Ok(self.children.swap_remove(idx));
        }

        let successor = self.state.apply(&real_action)?;
        let mut child = TreeNode::new(successor);
        child.action = Some(real_action);
        Ok(child)
    }

    /// One `(visits, q_value, action)` entry per child, sorted by visits
    /// descending, `q_value` in the current side-to-move's perspective.
    pub fn get_sorted_actions(&self, flip: bool) -> Vec<(u64, f64, String)> {
        let side = self.state.to_move;
        let mut out: Vec<(u64, f64, String)> = self
            .children
            .iter()
            .map(|c| {
                let q_hero = if c.visit_count > 0 {
                    c.value_sum / c.visit_count as f64
                } else if c.evaluated {
                    c.cached_value
                } else {
                    0.0
                };
                let q = match side {
                    Side::Hero => q_hero,
                    Side::Villain => -q_hero,
                };
                let action = c.action.clone().unwrap();
                let rendered = if flip {
                    self.state
                        .flip_action_str(&action)
                        .unwrap_or(action)
                } else {
                    action
                };
                (c.visit_count, q, rendered)
            })
            .collect();
        out.sort_by(|a, b| b.0.cmp(&a.0));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SearchParams {
        SearchParams {
            c: 0.158,
            use_rollout: false,
            eval_children: false,
            use_puct: false,
            use_probs: false,
        }
    }

    #[test]
    fn single_simulation_visits_root_once() {
        // S2: after one simulation the root has exactly one visit and its
        // value_sum equals the leaf's heuristic value.
        let board = Board::new(9);
        let expected_heuristic = board.heuristic_value();
        let mut root = TreeNode::new(board);
        let mut rng = fastrand::Rng::with_seed(1);
        root.simulate(1, &mut rng, &params());
        assert_eq!(root.visit_count, 1);
        assert!((root.value_sum - expected_heuristic).abs() < 1e-9);
        assert!(root.expanded);
    }

    #[test]
    fn reroot_preserves_statistics() {
        let board = Board::new(9);
        let mut root = TreeNode::new(board);
        let mut rng = fastrand::Rng::with_seed(7);
        root.simulate(200, &mut rng, &params());
        let child_visits = root
            .children
            .iter()
            .find(|c| c.action.as_deref() == Some("*(4,1)"))
            .map(|c| c.visit_count)
            .expect("forward move should exist");
        let new_root = root.make_move("*(4,1)", false).unwrap();
        assert_eq!(new_root.visit_count, child_visits);
    }

    #[test]
    fn determinism_under_fixed_seed() {
        let board = Board::new(9);
        let mut a = TreeNode::new(board.clone());
        let mut b = TreeNode::new(board);
        let mut rng_a = fastrand::Rng::with_seed(42);
        let mut rng_b = fastrand::Rng::with_seed(42);
        a.simulate(150, &mut rng_a, &params());
        b.simulate(150, &mut rng_b, &params());
        assert_eq!(a.get_sorted_actions(false), b.get_sorted_actions(false));
    }

    #[test]
    fn choose_best_action_fails_without_children() {
        let mut board = Board::new(9);
        board.hero_pos = (4, 8);
        board.to_move = Side::Villain;
        let root = TreeNode::new(board);
        let mut rng = fastrand::Rng::with_seed(3);
        // Root is terminal and was never expanded, so it has no children.
        assert!(matches!(
            root.choose_best_action(&mut rng, 0.0, true),
            Err(EngineError::NoLegalMoves)
        ));
    }

    #[test]
    fn value_sum_never_exceeds_visit_count() {
        let board = Board::new(9);
        let mut root = TreeNode::new(board);
        let mut rng = fastrand::Rng::with_seed(9);
        root.simulate(100, &mut rng, &params());

        fn check(node: &TreeNode) {
            assert!(node.value_sum.abs() <= node.visit_count as f64 + 1e-9);
            for c in &node.children {
                check(c);
            }
        }
        check(&root);
    }
}
