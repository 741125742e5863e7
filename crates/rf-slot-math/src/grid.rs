//! Symbol grid produced by an outcome source

use serde::{Deserialize, Serialize};

use crate::symbols::SymbolId;

/// A cell coordinate on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub col: usize,
    pub row: usize,
}

impl GridPos {
    pub const fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }
}

/// Reels × rows of symbol ids. `reels[col][row]`, row 0 is the top row.
///
/// Nothing stops a caller from building a ragged grid; consumers check
/// [`SymbolGrid::is_rectangular`] before trusting the shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolGrid {
    reels: Vec<Vec<SymbolId>>,
}

impl SymbolGrid {
    pub fn new(reels: Vec<Vec<SymbolId>>) -> Self {
        Self { reels }
    }

    /// Build from string ids, reel by reel
    pub fn from_ids<R, S>(reels: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<SymbolId>,
    {
        Self {
            reels: reels
                .into_iter()
                .map(|reel| reel.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Build from rows (as a player reads the screen)
    pub fn from_rows<S: Into<SymbolId> + Clone>(rows: &[Vec<S>]) -> Self {
        let reel_count = rows.first().map_or(0, Vec::len);
        let reels = (0..reel_count)
            .map(|col| {
                rows.iter()
                    .filter_map(|row| row.get(col).cloned().map(Into::into))
                    .collect()
            })
            .collect();
        Self { reels }
    }

    pub fn reel_count(&self) -> usize {
        self.reels.len()
    }

    /// Rows of the first reel (0 for an empty grid)
    pub fn rows_per_reel(&self) -> usize {
        self.reels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.reels.is_empty() || self.rows_per_reel() == 0
    }

    /// Every reel has the same, non-zero, row count
    pub fn is_rectangular(&self) -> bool {
        let rows = self.rows_per_reel();
        rows > 0 && self.reels.iter().all(|reel| reel.len() == rows)
    }

    pub fn get(&self, pos: GridPos) -> Option<&SymbolId> {
        self.reels.get(pos.col).and_then(|reel| reel.get(pos.row))
    }

    pub fn reel(&self, col: usize) -> Option<&[SymbolId]> {
        self.reels.get(col).map(Vec::as_slice)
    }

    pub fn reels(&self) -> &[Vec<SymbolId>] {
        &self.reels
    }

    pub fn into_reels(self) -> Vec<Vec<SymbolId>> {
        self.reels
    }
}
