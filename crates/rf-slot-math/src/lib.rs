//! # rf-slot-math: Symbols, outcomes and win evaluation
//!
//! The math side of a spin: which symbols exist, which grid lands, and what
//! it pays. Everything here is pure and in-memory; the reel crates only
//! consume the resulting [`SymbolGrid`].
//!
//! ## Architecture
//!
//! ```text
//! SymbolRegistry (read-only, shared via Arc)
//!     │
//!     ├── OutcomeSource::generate(reels, rows) → SymbolGrid
//!     │       └── WeightedOutcomeGenerator (ChaCha8, weighted draw)
//!     │
//!     └── WinEvaluator::evaluate(grid, bet) → EvaluationResult
//!             └── horizontal / vertical / diagonal runs, wild substitution
//! ```

pub mod error;
pub mod evaluator;
pub mod generator;
pub mod grid;
pub mod symbols;

pub use error::*;
pub use evaluator::*;
pub use generator::*;
pub use grid::*;
pub use symbols::*;
