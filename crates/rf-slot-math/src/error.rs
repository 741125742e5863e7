//! Error types for symbol registry loading

use crate::symbols::SymbolId;

/// Symbol registry validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SymbolRegistryError {
    #[error("Symbol registry is empty")]
    Empty,

    #[error("Symbol #{0} has an empty id")]
    EmptyId(usize),

    #[error("Duplicate symbol id: {0}")]
    DuplicateId(SymbolId),

    #[error("Symbol {id} has invalid weight {weight} (must be finite and > 0)")]
    InvalidWeight { id: SymbolId, weight: f64 },

    #[error("Symbol {id} has invalid payout {pay} for run length {run}")]
    InvalidPayout { id: SymbolId, run: usize, pay: f64 },
}
