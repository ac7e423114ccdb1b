//! Quoridor-family board position: tokens, walls, legality, and move encoding.
//!
//! The board is a pure value type. Cells are `(col, row)` pairs with `(0, 0)`
//! at the top-left; wall intersections are indexed the same way but only run
//! `0..=size-2` in each axis, matching the teacher's `board.rs` 2D-coordinate
//! convention rather than the 1D padded array `position.rs` uses for Go.

use std::collections::HashSet;
use std::fmt;

use crate::error::EngineError;

/// A cell coordinate `(col, row)`, `0 <= col, row < size`.
pub type Cell = (u8, u8);

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Hero,
    Villain,
}

impl Side {
    #[inline]
    pub fn opponent(self) -> Side {
        match self {
            Side::Hero => Side::Villain,
            Side::Villain => Side::Hero,
        }
    }
}

/// Wall orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A placed wall, anchored at its top-left interior intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Wall {
    pub col: u8,
    pub row: u8,
    pub orientation: Orientation,
}

impl fmt::Display for Wall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self.orientation {
            Orientation::Horizontal => 'H',
            Orientation::Vertical => 'V',
        };
        write!(f, "{letter}({},{})", self.col, self.row)
    }
}

/// A legal action: move your token, or place a wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Move(Cell),
    Wall(Wall),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move((c, r)) => write!(f, "*({c},{r})"),
            Action::Wall(w) => write!(f, "{w}"),
        }
    }
}

/// The game position.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub size: u8,
    pub to_move: Side,
    pub hero_pos: Cell,
    pub villain_pos: Cell,
    pub hero_walls_remaining: u8,
    pub villain_walls_remaining: u8,
    pub walls: HashSet<Wall>,
    pub last_action: Option<Action>,
}

/// Default starting wall count for a given board size.
///
/// The distilled spec constrains this only to "non-negative integer"; 9x9
/// Quoridor conventionally starts each side with 10 walls, and the 5x5
/// variant used in testing (spec.md S6) conventionally starts with 3. Other
/// sizes fall back to a proportional estimate — an implementation-defined
/// choice recorded in DESIGN.md.
fn default_wall_count(size: u8) -> u8 {
    match size {
        5 => 3,
        7 => 5,
        9 => 10,
        _ => (((size as u32 - 1) * 5) / 4) as u8,
    }
}

impl Board {
    /// Create the standard starting position for a `size x size` board.
    ///
    /// `size` must be odd and at least 3; this is a precondition, not a
    /// recoverable error, since it is a construction-time constant chosen by
    /// the caller rather than data arriving from a move stream.
    pub fn new(size: u8) -> Self {
        debug_assert!(size >= 3 && size % 2 == 1, "board size must be odd and >= 3");
        let mid = size / 2;
        let walls = default_wall_count(size);
        Board {
            size,
            to_move: Side::Hero,
            hero_pos: (mid, 0),
            villain_pos: (mid, size - 1),
            hero_walls_remaining: walls,
            villain_walls_remaining: walls,
            walls: HashSet::new(),
            last_action: None,
        }
    }

    #[inline]
    pub fn goal_row(&self, side: Side) -> u8 {
        match side {
            Side::Hero => self.size - 1,
            Side::Villain => 0,
        }
    }

    #[inline]
    pub fn pos(&self, side: Side) -> Cell {
        match side {
            Side::Hero => self.hero_pos,
            Side::Villain => self.villain_pos,
        }
    }

    #[inline]
    fn walls_remaining(&self, side: Side) -> u8 {
        match side {
            Side::Hero => self.hero_walls_remaining,
            Side::Villain => self.villain_walls_remaining,
        }
    }

    #[inline]
    fn in_bounds(&self, cell: Cell) -> bool {
        (cell.0 as i32) >= 0
            && (cell.1 as i32) >= 0
            && (cell.0 as i32) < self.size as i32
            && (cell.1 as i32) < self.size as i32
    }

    fn occupant(&self, cell: Cell) -> Option<Side> {
        if cell == self.hero_pos {
            Some(Side::Hero)
        } else if cell == self.villain_pos {
            Some(Side::Villain)
        } else {
            None
        }
    }

    /// The two edge segments a wall blocks, each as a canonical `(lo, hi)`
    /// pair of adjacent cells.
    fn wall_edges(w: &Wall) -> [(Cell, Cell); 2] {
        let (x, y) = (w.col, w.row);
        match w.orientation {
            Orientation::Horizontal => [
                ((x, y), (x, y + 1)),
                ((x + 1, y), (x + 1, y + 1)),
            ],
            Orientation::Vertical => [
                ((x, y), (x + 1, y)),
                ((x, y + 1), (x + 1, y + 1)),
            ],
        }
    }

    fn edge_blocked(&self, a: Cell, b: Cell) -> bool {
        let edge = if a <= b { (a, b) } else { (b, a) };
        self.walls.iter().any(|w| {
            Board::wall_edges(w)
                .iter()
                .any(|&(p, q)| (if p <= q { (p, q) } else { (q, p) }) == edge)
        })
    }

    /// Orthogonal neighbors of `cell` not blocked by a wall, ignoring
    /// occupancy. Used for path-existence BFS and heuristic distances.
    fn open_neighbors(&self, cell: Cell) -> Vec<Cell> {
        let (c, r) = (cell.0 as i32, cell.1 as i32);
        let mut out = Vec::with_capacity(4);
        for (dc, dr) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
            let nc = c + dc;
            let nr = r + dr;
            if nc < 0 || nr < 0 || nc >= self.size as i32 || nr >= self.size as i32 {
                continue;
            }
            let n = (nc as u8, nr as u8);
            if !self.edge_blocked(cell, n) {
                out.push(n);
            }
        }
        out
    }

    /// Breadth-first search distance (in steps) from `start` to the nearest
    /// cell on `goal_row`, or `None` if unreachable.
    fn bfs_distance_to_row(&self, start: Cell, goal_row: u8) -> Option<u32> {
        if start.1 == goal_row {
            return Some(0);
        }
        let mut visited = HashSet::new();
        visited.insert(start);
        let mut frontier = vec![start];
        let mut dist = 0u32;
        while !frontier.is_empty() {
            dist += 1;
            let mut next = Vec::new();
            for cell in frontier {
                for n in self.open_neighbors(cell) {
                    if visited.insert(n) {
                        if n.1 == goal_row {
                            return Some(dist);
                        }
                        next.push(n);
                    }
                }
            }
            frontier = next;
        }
        None
    }

    /// Whether `side` has at least one simple path from its current cell to
    /// its goal row, ignoring the other token's position (standard rule:
    /// the opponent's pawn can always step aside).
    pub fn path_exists(&self, side: Side) -> bool {
        self.bfs_distance_to_row(self.pos(side), self.goal_row(side))
            .is_some()
    }

    /// Heuristic value in `[-1, 1]`, positive favoring the hero, from the
    /// signed difference of shortest-path distances normalised by
    /// `2*(size-1)`.
    pub fn heuristic_value(&self) -> f64 {
        let hero_dist = self
            .bfs_distance_to_row(self.hero_pos, self.goal_row(Side::Hero))
            .unwrap_or((2 * (self.size as u32 - 1)) as u32) as f64;
        let villain_dist = self
            .bfs_distance_to_row(self.villain_pos, self.goal_row(Side::Villain))
            .unwrap_or((2 * (self.size as u32 - 1)) as u32) as f64;
        let norm = 2.0 * (self.size as f64 - 1.0);
        ((villain_dist - hero_dist) / norm).clamp(-1.0, 1.0)
    }

    /// `true` iff the side not-to-move stands on its goal row (it just moved
    /// there, ending the game).
    pub fn is_terminal(&self) -> bool {
        self.winner().is_some()
    }

    pub fn winner(&self) -> Option<Side> {
        let mover = self.to_move.opponent();
        if self.pos(mover).1 == self.goal_row(mover) {
            Some(mover)
        } else {
            None
        }
    }

    /// Mirror a cell across the board center.
    fn flip_cell(&self, cell: Cell) -> Cell {
        (self.size - 1 - cell.0, self.size - 1 - cell.1)
    }

    /// Mirror a wall-intersection coordinate across the board center.
    fn flip_wall(&self, w: Wall) -> Wall {
        Wall {
            col: self.size - 2 - w.col,
            row: self.size - 2 - w.row,
            orientation: w.orientation,
        }
    }

    fn flip_action(&self, action: Action) -> Action {
        match action {
            Action::Move(c) => Action::Move(self.flip_cell(c)),
            Action::Wall(w) => Action::Wall(self.flip_wall(w)),
        }
    }

    /// Parse `s`, mirror it across the board center, and re-render it —
    /// the inverse transform used to translate a flipped action string a
    /// caller supplies back into the board's own unflipped frame (flipping
    /// is its own inverse, so this also flips forward).
    pub fn flip_action_str(&self, s: &str) -> Result<String, EngineError> {
        let action = Board::parse_action(s)?;
        Ok(self.flip_action(action).to_string())
    }

    /// Parse an action string per the `*(X,Y)` / `H(X,Y)` / `V(X,Y)` grammar.
    pub fn parse_action(s: &str) -> Result<Action, EngineError> {
        let bad = || EngineError::IllegalMove(format!("unparseable action: {s}"));
        let mut chars = s.chars();
        let kind = chars.next().ok_or_else(bad)?;
        let rest = chars.as_str();
        let rest = rest
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .ok_or_else(bad)?;
        let (x_str, y_str) = rest.split_once(',').ok_or_else(bad)?;
        let x: u8 = x_str.trim().parse().map_err(|_| bad())?;
        let y: u8 = y_str.trim().parse().map_err(|_| bad())?;
        match kind {
            '*' => Ok(Action::Move((x, y))),
            'H' => Ok(Action::Wall(Wall {
                col: x,
                row: y,
                orientation: Orientation::Horizontal,
            })),
            'V' => Ok(Action::Wall(Wall {
                col: x,
                row: y,
                orientation: Orientation::Vertical,
            })),
            _ => Err(bad()),
        }
    }

    fn wall_placement_legal(&self, w: &Wall) -> bool {
        let size = self.size;
        if w.col > size - 2 || w.row > size - 2 {
            return false;
        }
        // No other wall may anchor at the same intersection, regardless of
        // orientation (catches both exact duplicates and perpendicular
        // crossings at the same point).
        if self.walls.iter().any(|e| e.col == w.col && e.row == w.row) {
            return false;
        }
        // No segment of the new wall may coincide with a segment of an
        // existing wall (catches in-line same-orientation overlap).
        let new_edges = Board::wall_edges(w);
        for existing in &self.walls {
            let existing_edges = Board::wall_edges(existing);
            for &(a, b) in &new_edges {
                let ab = if a <= b { (a, b) } else { (b, a) };
                for &(c, d) in &existing_edges {
                    let cd = if c <= d { (c, d) } else { (d, c) };
                    if ab == cd {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Legal successor actions, in the stable order defined by the spec:
    /// token moves (forward, forward-forward jump, diagonal-left jump,
    /// diagonal-right jump, side-left, side-right, back) before walls
    /// (orientation, then `(row, col)` ascending).
    pub fn legal_actions(&self, flip: bool) -> Vec<(String, Board)> {
        let mut out = Vec::new();
        let side = self.to_move;
        let me = self.pos(side);
        let fwd: i32 = match side {
            Side::Hero => 1,
            Side::Villain => -1,
        };
        let opp = self.pos(side.opponent());

        let step = |dc: i32, dr: i32| -> Option<Cell> {
            let nc = me.0 as i32 + dc;
            let nr = me.1 as i32 + dr;
            if nc < 0 || nr < 0 || nc >= self.size as i32 || nr >= self.size as i32 {
                return None;
            }
            Some((nc as u8, nr as u8))
        };

        let mut candidates: Vec<Cell> = Vec::with_capacity(7);

        // forward
        if let Some(f) = step(0, fwd) {
            if self.occupant(f).is_none() && !self.edge_blocked(me, f) {
                candidates.push(f);
            }
        }

        // the opponent sits directly ahead: jump logic replaces the plain step
        if let Some(f) = step(0, fwd) {
            if self.occupant(f) == Some(side.opponent()) && !self.edge_blocked(me, f) {
                // forward-forward (straight jump)
                let mut jumped = false;
                if let Some(ff) = step(0, 2 * fwd) {
                    if self.occupant(ff).is_none() && !self.edge_blocked(f, ff) {
                        candidates.push(ff);
                        jumped = true;
                    }
                }
                if !jumped {
                    // diagonal-left then diagonal-right jump around the opponent
                    for dc in [-1i32, 1i32] {
                        if let Some(d) = step(dc, fwd) {
                            if self.occupant(d).is_none()
                                && !self.edge_blocked(me, f)
                                && !self.edge_blocked(f, d)
                            {
                                candidates.push(d);
                            }
                        }
                    }
                }
            }
        }

        // side-left, side-right
        for dc in [-1i32, 1i32] {
            if let Some(s) = step(dc, 0) {
                if self.occupant(s).is_none() && !self.edge_blocked(me, s) {
                    candidates.push(s);
                }
            }
        }

        // back
        if let Some(b) = step(0, -fwd) {
            if self.occupant(b).is_none() && !self.edge_blocked(me, b) {
                candidates.push(b);
            }
        }

        let _ = opp; // used only through occupant() above
        for dest in candidates {
            let mut next = self.clone();
            next.set_pos(side, dest);
            next.to_move = side.opponent();
            let action = Action::Move(dest);
            next.last_action = Some(action);
            let encoded = if flip { self.flip_action(action) } else { action };
            out.push((encoded.to_string(), next));
        }

        // Walls: orientation (Horizontal, then Vertical), then (row, col) ascending.
        if self.walls_remaining(side) > 0 {
            for orientation in [Orientation::Horizontal, Orientation::Vertical] {
                for row in 0..=(self.size.saturating_sub(2)) {
                    for col in 0..=(self.size.saturating_sub(2)) {
                        let w = Wall { col, row, orientation };
                        if !self.wall_placement_legal(&w) {
                            continue;
                        }
                        let mut next = self.clone();
                        next.walls.insert(w);
                        if !next.path_exists(Side::Hero) || !next.path_exists(Side::Villain) {
                            continue;
                        }
                        match side {
                            Side::Hero => next.hero_walls_remaining -= 1,
                            Side::Villain => next.villain_walls_remaining -= 1,
                        }
                        next.to_move = side.opponent();
                        let action = Action::Wall(w);
                        next.last_action = Some(action);
                        let encoded =
                            if flip { self.flip_action(action) } else { action };
                        out.push((encoded.to_string(), next));
                    }
                }
            }
        }

        out
    }

    fn set_pos(&mut self, side: Side, cell: Cell) {
        match side {
            Side::Hero => self.hero_pos = cell,
            Side::Villain => self.villain_pos = cell,
        }
    }

    /// Apply an action string, failing with [`EngineError::IllegalMove`] if
    /// it is not among `legal_actions(false)`.
    pub fn apply(&self, action_str: &str) -> Result<Board, EngineError> {
        self.legal_actions(false)
            .into_iter()
            .find(|(s, _)| s == action_str)
            .map(|(_, board)| board)
            .ok_or_else(|| EngineError::IllegalMove(action_str.to_string()))
    }

    /// Human-readable multi-line board rendering.
    pub fn display(&self, flip: bool) -> String {
        let hero = if flip { self.flip_cell(self.hero_pos) } else { self.hero_pos };
        let villain = if flip { self.flip_cell(self.villain_pos) } else { self.villain_pos };
        let mut s = String::new();
        for row in 0..self.size {
            for col in 0..self.size {
                let cell = (col, row);
                let ch = if cell == hero {
                    'H'
                } else if cell == villain {
                    'V'
                } else {
                    '.'
                };
                s.push(ch);
                s.push(' ');
            }
            s.push('\n');
        }
        s.push_str(&format!(
            "to_move={:?} hero_walls={} villain_walls={}\n",
            self.to_move, self.hero_walls_remaining, self.villain_walls_remaining
        ));
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_board_has_expected_legal_move_count() {
        // S1: 9x9 fresh board — 3 token moves (forward, side-left, side-right)
        // plus 128 wall placements (8*8 intersections * 2 orientations).
        let board = Board::new(9);
        let actions = board.legal_actions(false);
        let token_moves = actions
            .iter()
            .filter(|(s, _)| s.starts_with('*'))
            .count();
        let wall_moves = actions.iter().filter(|(s, _)| s.starts_with(['H', 'V'])).count();
        assert_eq!(token_moves, 3);
        assert_eq!(wall_moves, 128);
        assert!(actions.iter().any(|(s, _)| s == "*(4,1)"));
        assert!(actions.iter().any(|(s, _)| s == "H(0,0)"));
        assert!(!actions.iter().any(|(s, _)| s == "*(4,8)"));
    }

    #[test]
    fn legal_actions_is_deterministic() {
        let board = Board::new(9);
        let a: Vec<String> = board.legal_actions(false).into_iter().map(|(s, _)| s).collect();
        let b: Vec<String> = board.legal_actions(false).into_iter().map(|(s, _)| s).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn flipping_twice_is_identity() {
        let board = Board::new(9);
        let cell = (2, 3);
        let once = board.flip_cell(cell);
        let twice = board.flip_cell(once);
        assert_eq!(cell, twice);
    }

    #[test]
    fn terminal_detection_on_goal_row() {
        let mut board = Board::new(9);
        board.hero_pos = (4, 8);
        board.to_move = Side::Villain;
        assert!(board.is_terminal());
        assert_eq!(board.winner(), Some(Side::Hero));
    }

    #[test]
    fn wall_fencing_is_rejected_on_small_board() {
        // 5x5 board: corner-trap the villain in the {3,4}x{3,4} 2x2 box.
        // The first wall (top of the box) still leaves the left side open;
        // the second (left of the box) would seal the villain in with no
        // path back to its goal row (0) and must be rejected.
        let mut board = Board::new(5);
        board.hero_pos = (0, 0);
        board.villain_pos = (4, 4);
        board.to_move = Side::Hero;

        let top = board.apply("H(3,2)").expect("top wall alone leaves a path");
        assert!(top.path_exists(Side::Villain));

        let mut sealed = top.clone();
        sealed.to_move = Side::Hero;
        let actions = sealed.legal_actions(false);
        assert!(
            !actions.iter().any(|(s, _)| s == "V(2,3)"),
            "wall that fences off the villain entirely must not be legal"
        );

        // Confirm it truly would have sealed the box, so the rejection above
        // is meaningful rather than an unrelated legality failure.
        let mut hypothetically_sealed = top.clone();
        hypothetically_sealed.walls.insert(Wall {
            col: 2,
            row: 3,
            orientation: Orientation::Vertical,
        });
        assert!(!hypothetically_sealed.path_exists(Side::Villain));
    }

    #[test]
    fn heuristic_value_is_zero_on_symmetric_start() {
        let board = Board::new(9);
        assert_eq!(board.heuristic_value(), 0.0);
    }

    #[test]
    fn parse_render_round_trip() {
        for s in ["*(4,1)", "H(0,0)", "V(3,2)"] {
            let action = Board::parse_action(s).unwrap();
            assert_eq!(action.to_string(), s);
        }
    }
}
