//! Multi-directional win-line evaluation

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::grid::{GridPos, SymbolGrid};
use crate::symbols::{MIN_RUN_LENGTH, SymbolDefinition, SymbolId, SymbolRegistry};

/// A scan direction in (column, row) steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Direction {
    pub d_col: i32,
    pub d_row: i32,
}

impl Direction {
    pub const HORIZONTAL: Self = Self::new(1, 0);
    pub const VERTICAL: Self = Self::new(0, 1);
    pub const DIAGONAL_DOWN: Self = Self::new(1, 1);
    pub const DIAGONAL_UP: Self = Self::new(1, -1);

    /// Directions every game scans
    pub const STANDARD: [Self; 4] = [
        Self::HORIZONTAL,
        Self::VERTICAL,
        Self::DIAGONAL_DOWN,
        Self::DIAGONAL_UP,
    ];

    pub const fn new(d_col: i32, d_row: i32) -> Self {
        Self { d_col, d_row }
    }

    /// Cell `steps` along this direction from `start`, if it stays on the grid
    fn step(self, start: GridPos, steps: usize, reels: usize, rows: usize) -> Option<GridPos> {
        let steps = i64::try_from(steps).ok()?;
        let col = start.col as i64 + self.d_col as i64 * steps;
        let row = start.row as i64 + self.d_row as i64 * steps;
        if col < 0 || row < 0 || col >= reels as i64 || row >= rows as i64 {
            return None;
        }
        Some(GridPos::new(col as usize, row as usize))
    }

    /// A start cell is one whose predecessor along the direction is off the grid
    fn is_start(self, pos: GridPos, reels: usize, rows: usize) -> bool {
        let col = pos.col as i64 - self.d_col as i64;
        let row = pos.row as i64 - self.d_row as i64;
        col < 0 || row < 0 || col >= reels as i64 || row >= rows as i64
    }
}

/// A single winning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinLine {
    /// Symbol whose paytable pays this run
    pub symbol: SymbolId,
    /// Run length
    pub count: usize,
    /// Cells in scan order
    pub positions: Vec<GridPos>,
    /// Win amount (bet × pay value)
    pub payout: f64,
    /// Direction the run was found in
    pub direction: Direction,
}

/// Result of evaluating a grid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub total_win: f64,
    pub win_lines: Vec<WinLine>,
}

impl EvaluationResult {
    pub fn is_win(&self) -> bool {
        self.total_win > 0.0
    }

    pub fn win_count(&self) -> usize {
        self.win_lines.len()
    }
}

/// Scans a grid for runs of matching symbols with wild substitution
#[derive(Debug, Clone)]
pub struct WinEvaluator {
    registry: Arc<SymbolRegistry>,
    directions: Vec<Direction>,
    min_run: usize,
}

impl WinEvaluator {
    pub fn new(registry: Arc<SymbolRegistry>) -> Self {
        Self::with_directions(registry, Direction::STANDARD.to_vec())
    }

    pub fn with_directions(registry: Arc<SymbolRegistry>, directions: Vec<Direction>) -> Self {
        Self {
            registry,
            directions,
            min_run: MIN_RUN_LENGTH,
        }
    }

    pub fn registry(&self) -> &Arc<SymbolRegistry> {
        &self.registry
    }

    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    /// Evaluate all win lines. Malformed grids and non-positive or NaN bets
    /// evaluate to an empty result.
    pub fn evaluate(&self, grid: &SymbolGrid, bet: f64) -> EvaluationResult {
        if !grid.is_rectangular() {
            log::debug!("Rejecting malformed grid ({} reels)", grid.reel_count());
            return EvaluationResult::default();
        }
        if !bet.is_finite() || bet <= 0.0 {
            log::debug!("Rejecting bet {bet}");
            return EvaluationResult::default();
        }

        let reels = grid.reel_count();
        let rows = grid.rows_per_reel();
        let mut win_lines = Vec::new();
        let mut seen: HashSet<Vec<GridPos>> = HashSet::new();

        for &direction in &self.directions {
            if direction.d_col == 0 && direction.d_row == 0 {
                continue;
            }
            for col in 0..reels {
                for row in 0..rows {
                    let start = GridPos::new(col, row);
                    if !direction.is_start(start, reels, rows) {
                        continue;
                    }
                    let Some(line) = self.longest_run(grid, start, direction, bet) else {
                        continue;
                    };
                    let mut key = line.positions.clone();
                    key.sort_unstable();
                    if seen.insert(key) {
                        win_lines.push(line);
                    }
                }
            }
        }

        let total_win = win_lines.iter().map(|line| line.payout).sum();
        EvaluationResult {
            total_win,
            win_lines,
        }
    }

    /// Longest matching run from `start`, trying the full reel count first
    fn longest_run(
        &self,
        grid: &SymbolGrid,
        start: GridPos,
        direction: Direction,
        bet: f64,
    ) -> Option<WinLine> {
        let reels = grid.reel_count();
        let rows = grid.rows_per_reel();

        for length in (self.min_run..=reels).rev() {
            let Some(positions) = (0..length)
                .map(|i| direction.step(start, i, reels, rows))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            let symbols: Option<Vec<&SymbolDefinition>> = positions
                .iter()
                .map(|&pos| grid.get(pos).and_then(|id| self.registry.get(id)))
                .collect();
            let Some(symbols) = symbols else {
                continue;
            };
            if let Some(base) = match_base(&symbols) {
                return Some(WinLine {
                    symbol: base.id.clone(),
                    count: length,
                    positions,
                    payout: base.pay_for(length) * bet,
                    direction,
                });
            }
        }
        None
    }
}

/// Base symbol of a run, if every cell matches it.
///
/// The base is the first non-wild symbol; an all-wild run uses the first
/// wild. Scatter and bonus bases accept no substitutes.
fn match_base<'a>(run: &[&'a SymbolDefinition]) -> Option<&'a SymbolDefinition> {
    let first = *run.first()?;
    let base = run.iter().copied().find(|s| !s.is_wild()).unwrap_or(first);
    let substitutes = !base.blocks_substitution();

    let matches = run
        .iter()
        .all(|s| s.id == base.id || (substitutes && s.is_wild()));
    matches.then_some(base)
}
