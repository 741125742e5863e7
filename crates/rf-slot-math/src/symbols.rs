//! Symbol definitions and the read-only symbol registry

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SymbolRegistryError;

/// Shortest run that can ever pay
pub const MIN_RUN_LENGTH: usize = 3;

/// Symbol identifier (e.g. "pig", "wild")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(String);

impl SymbolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SymbolId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for SymbolId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for SymbolId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SymbolId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Symbol type classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolType {
    /// Regular paying symbol
    #[default]
    Regular,
    /// Wild - substitutes for regular symbols
    Wild,
    /// Scatter - never substituted by wilds
    Scatter,
    /// Bonus - never substituted by wilds
    Bonus,
}

/// A symbol definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolDefinition {
    /// Unique symbol ID
    pub id: SymbolId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Spawn weight for the weighted draw (> 0)
    pub weight: f64,
    /// Payout multiplier by run length
    #[serde(default)]
    pub paytable: BTreeMap<usize, f64>,
    /// Symbol type
    #[serde(default, rename = "type")]
    pub symbol_type: SymbolType,
    /// Image path inside the symbol bundle
    #[serde(default)]
    pub image_path: String,
    /// Motion-blurred variant, if the bundle ships one
    #[serde(default)]
    pub blur_image_path: Option<String>,
}

impl SymbolDefinition {
    fn build(id: &str, symbol_type: SymbolType, weight: f64, pays: &[f64]) -> Self {
        let paytable = pays
            .iter()
            .enumerate()
            .map(|(i, &pay)| (MIN_RUN_LENGTH + i, pay))
            .collect();
        Self {
            id: SymbolId::from(id),
            name: id.to_uppercase(),
            weight,
            paytable,
            symbol_type,
            image_path: format!("symbols/{id}.png"),
            blur_image_path: Some(format!("symbols/{id}_blur.png")),
        }
    }

    /// Create a regular symbol. `pays[0]` is the 3-run multiplier, `pays[1]` the 4-run, ...
    pub fn regular(id: &str, weight: f64, pays: &[f64]) -> Self {
        Self::build(id, SymbolType::Regular, weight, pays)
    }

    /// Create a wild symbol
    pub fn wild(id: &str, weight: f64, pays: &[f64]) -> Self {
        Self::build(id, SymbolType::Wild, weight, pays)
    }

    /// Create a scatter symbol
    pub fn scatter(id: &str, weight: f64, pays: &[f64]) -> Self {
        Self::build(id, SymbolType::Scatter, weight, pays)
    }

    /// Create a bonus symbol
    pub fn bonus(id: &str, weight: f64) -> Self {
        Self::build(id, SymbolType::Bonus, weight, &[])
    }

    /// Payout multiplier for a run; missing or non-positive entries pay nothing
    pub fn pay_for(&self, run_length: usize) -> f64 {
        match self.paytable.get(&run_length) {
            Some(&pay) if pay > 0.0 => pay,
            _ => 0.0,
        }
    }

    pub fn is_wild(&self) -> bool {
        self.symbol_type == SymbolType::Wild
    }

    pub fn is_scatter(&self) -> bool {
        self.symbol_type == SymbolType::Scatter
    }

    pub fn is_bonus(&self) -> bool {
        self.symbol_type == SymbolType::Bonus
    }

    /// Scatter and bonus symbols only ever match themselves
    pub fn blocks_substitution(&self) -> bool {
        matches!(self.symbol_type, SymbolType::Scatter | SymbolType::Bonus)
    }
}

/// Read-only lookup of every symbol a game can show
///
/// Registration order is significant: the weighted draw walks symbols in
/// this order and falls back to the first one.
#[derive(Debug, Clone)]
pub struct SymbolRegistry {
    symbols: Vec<SymbolDefinition>,
    index: HashMap<SymbolId, usize>,
    total_weight: f64,
}

impl SymbolRegistry {
    /// Build a registry, rejecting definitions the draw or the paytable can't use
    pub fn new(symbols: Vec<SymbolDefinition>) -> Result<Self, SymbolRegistryError> {
        if symbols.is_empty() {
            return Err(SymbolRegistryError::Empty);
        }

        let mut index = HashMap::with_capacity(symbols.len());
        let mut seen = HashSet::with_capacity(symbols.len());
        for (i, symbol) in symbols.iter().enumerate() {
            if symbol.id.as_str().is_empty() {
                return Err(SymbolRegistryError::EmptyId(i));
            }
            if !seen.insert(symbol.id.clone()) {
                return Err(SymbolRegistryError::DuplicateId(symbol.id.clone()));
            }
            if !symbol.weight.is_finite() || symbol.weight <= 0.0 {
                return Err(SymbolRegistryError::InvalidWeight {
                    id: symbol.id.clone(),
                    weight: symbol.weight,
                });
            }
            if let Some((&run, &pay)) = symbol.paytable.iter().find(|(_, p)| !p.is_finite()) {
                return Err(SymbolRegistryError::InvalidPayout {
                    id: symbol.id.clone(),
                    run,
                    pay,
                });
            }
            index.insert(symbol.id.clone(), i);
        }

        let registry = Self::from_validated(symbols, index);
        log::debug!(
            "Symbol registry loaded: {} symbols, total weight {}",
            registry.len(),
            registry.total_weight
        );
        Ok(registry)
    }

    fn from_validated(symbols: Vec<SymbolDefinition>, index: HashMap<SymbolId, usize>) -> Self {
        let total_weight = symbols.iter().map(|s| s.weight).sum();
        Self {
            symbols,
            index,
            total_weight,
        }
    }

    /// Stock farm-themed symbol set
    pub fn farm() -> Self {
        let symbols = vec![
            SymbolDefinition::regular("pig", 10.0, &[5.0, 20.0, 100.0]),
            SymbolDefinition::regular("cow", 12.0, &[4.0, 15.0, 75.0]),
            SymbolDefinition::regular("chicken", 14.0, &[3.0, 10.0, 50.0]),
            SymbolDefinition::regular("sheep", 16.0, &[2.0, 8.0, 30.0]),
            SymbolDefinition::regular("horse", 18.0, &[1.5, 5.0, 20.0]),
            SymbolDefinition::regular("dog", 20.0, &[1.0, 4.0, 15.0]),
            SymbolDefinition::wild("wild", 4.0, &[10.0, 50.0, 250.0]),
            SymbolDefinition::scatter("scatter", 3.0, &[2.0, 10.0, 50.0]),
            SymbolDefinition::bonus("bonus", 3.0),
        ];
        let index = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        Self::from_validated(symbols, index)
    }

    pub fn get(&self, id: &SymbolId) -> Option<&SymbolDefinition> {
        self.index.get(id).map(|&i| &self.symbols[i])
    }

    pub fn get_str(&self, id: &str) -> Option<&SymbolDefinition> {
        self.get(&SymbolId::from(id))
    }

    pub fn contains(&self, id: &SymbolId) -> bool {
        self.index.contains_key(id)
    }

    /// Symbols in registration order
    pub fn symbols(&self) -> &[SymbolDefinition] {
        &self.symbols
    }

    /// First registered symbol (draw fallback)
    pub fn first(&self) -> &SymbolDefinition {
        &self.symbols[0]
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn is_wild(&self, id: &SymbolId) -> bool {
        self.get(id).is_some_and(SymbolDefinition::is_wild)
    }

    /// All wild symbol IDs
    pub fn wild_ids(&self) -> Vec<SymbolId> {
        self.symbols
            .iter()
            .filter(|s| s.is_wild())
            .map(|s| s.id.clone())
            .collect()
    }

    /// All regular symbol IDs
    pub fn regular_ids(&self) -> Vec<SymbolId> {
        self.symbols
            .iter()
            .filter(|s| s.symbol_type == SymbolType::Regular)
            .map(|s| s.id.clone())
            .collect()
    }
}

impl Default for SymbolRegistry {
    fn default() -> Self {
        Self::farm()
    }
}
