//! Game configuration
//!
//! One file describes a whole game: symbols, reel tuning, spin timing and
//! the starting wallet. JSON and YAML are both accepted, picked by file
//! extension.

use std::path::{Path, PathBuf};

use rf_reel::{ReelConfig, ReelConfigError};
use rf_slot_math::{Direction, SymbolDefinition, SymbolRegistry, SymbolRegistryError};
use serde::{Deserialize, Serialize};

/// Spin timing and grid shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinConfig {
    /// Number of reels (grid columns)
    pub reel_count: usize,
    /// Rows per reel; must match the reels' visible rows
    pub rows_per_reel: usize,
    /// Time before the first reel is told to stop (s)
    pub min_spin_time: f64,
    /// Gap between consecutive reel stops (s)
    pub stop_stagger: f64,
    /// Gap between consecutive reel starts (s)
    pub start_stagger: f64,
    /// Seed for the outcome generator and reel fillers; `None` = OS entropy
    pub seed: Option<u64>,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            reel_count: 5,
            rows_per_reel: 3,
            min_spin_time: 1.0,
            stop_stagger: 0.25,
            start_stagger: 0.0,
            seed: None,
        }
    }
}

impl SpinConfig {
    /// Instant profile for headless runs
    pub fn quick() -> Self {
        Self {
            min_spin_time: 0.2,
            stop_stagger: 0.05,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), GameConfigError> {
        if self.reel_count == 0 {
            return Err(GameConfigError::InvalidSpin("reel_count must be > 0"));
        }
        if self.rows_per_reel == 0 {
            return Err(GameConfigError::InvalidSpin("rows_per_reel must be > 0"));
        }
        for (name, value) in [
            ("min_spin_time", self.min_spin_time),
            ("stop_stagger", self.stop_stagger),
            ("start_stagger", self.start_stagger),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(GameConfigError::InvalidValue { name, value });
            }
        }
        Ok(())
    }

    /// When reel `index` should be told to stop, measured from spin start
    pub fn stop_time(&self, index: usize) -> f64 {
        self.min_spin_time + index as f64 * self.stop_stagger
    }

    /// Start delay for reel `index`
    pub fn start_delay(&self, index: usize) -> f64 {
        index as f64 * self.start_stagger
    }
}

/// Starting balance when no saved wallet exists
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub starting_coins: f64,
    pub default_bet: f64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            starting_coins: 1000.0,
            default_bet: 1.0,
        }
    }
}

/// Complete game description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Game name (for logs)
    pub name: String,
    /// Symbol set, in draw order
    pub symbols: Vec<SymbolDefinition>,
    /// Win scan directions
    pub directions: Vec<Direction>,
    pub reel: ReelConfig,
    pub spin: SpinConfig,
    pub wallet: WalletConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            name: "Farm".to_string(),
            symbols: SymbolRegistry::farm().symbols().to_vec(),
            directions: Direction::STANDARD.to_vec(),
            reel: ReelConfig::default(),
            spin: SpinConfig::default(),
            wallet: WalletConfig::default(),
        }
    }
}

impl GameConfig {
    /// Load and validate a `.json`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GameConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| GameConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let config = match extension.as_deref() {
            Some("json") => Self::from_json(&text)?,
            Some("yaml" | "yml") => Self::from_yaml(&text)?,
            _ => return Err(GameConfigError::UnsupportedFormat(path.to_path_buf())),
        };

        log::info!(
            "Loaded game '{}' from {}: {} symbols, {}x{} grid",
            config.name,
            path.display(),
            config.symbols.len(),
            config.spin.reel_count,
            config.spin.rows_per_reel
        );
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, GameConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, GameConfigError> {
        let config: Self = serde_yml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, GameConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every section and their agreement
    pub fn validate(&self) -> Result<(), GameConfigError> {
        self.spin.validate()?;
        self.reel.validate()?;
        SymbolRegistry::new(self.symbols.clone())?;

        if self.spin.rows_per_reel != self.reel.visible_rows {
            return Err(GameConfigError::RowMismatch {
                rows_per_reel: self.spin.rows_per_reel,
                visible_rows: self.reel.visible_rows,
            });
        }
        if self.directions.iter().any(|d| d.d_col == 0 && d.d_row == 0) {
            return Err(GameConfigError::InvalidSpin("direction (0, 0) scans nothing"));
        }
        let wallet = &self.wallet;
        if !wallet.starting_coins.is_finite() || wallet.starting_coins < 0.0 {
            return Err(GameConfigError::InvalidValue {
                name: "starting_coins",
                value: wallet.starting_coins,
            });
        }
        if !wallet.default_bet.is_finite() || wallet.default_bet <= 0.0 {
            return Err(GameConfigError::InvalidValue {
                name: "default_bet",
                value: wallet.default_bet,
            });
        }
        Ok(())
    }

    /// Build the symbol registry this config describes
    pub fn registry(&self) -> Result<SymbolRegistry, GameConfigError> {
        Ok(SymbolRegistry::new(self.symbols.clone())?)
    }
}

/// Game configuration errors
#[derive(Debug, thiserror::Error)]
pub enum GameConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported config format: {} (expected .json, .yaml or .yml)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("Symbol error: {0}")]
    Symbols(#[from] SymbolRegistryError),

    #[error("Reel error: {0}")]
    Reel(#[from] ReelConfigError),

    #[error("Invalid spin config: {0}")]
    InvalidSpin(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: f64 },

    #[error("rows_per_reel ({rows_per_reel}) must equal reel.visible_rows ({visible_rows})")]
    RowMismatch {
        rows_per_reel: usize,
        visible_rows: usize,
    },
}
