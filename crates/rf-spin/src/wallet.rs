//! Coin balance and bet, with pluggable persistence

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Persisted wallet fields
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub coins: f64,
    pub bet: f64,
}

/// Where a wallet is saved between sessions
pub trait WalletStore: Send + Sync {
    fn save(&self, coins: f64, bet: f64) -> Result<(), WalletError>;

    /// `None` when nothing has been saved yet
    fn load(&self) -> Result<Option<WalletSnapshot>, WalletError>;
}

/// Keeps the last save in memory
#[derive(Debug, Default)]
pub struct MemoryWalletStore {
    saved: Mutex<Option<WalletSnapshot>>,
}

impl MemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: WalletSnapshot) -> Self {
        Self {
            saved: Mutex::new(Some(snapshot)),
        }
    }
}

impl WalletStore for MemoryWalletStore {
    fn save(&self, coins: f64, bet: f64) -> Result<(), WalletError> {
        *self.saved.lock() = Some(WalletSnapshot { coins, bet });
        Ok(())
    }

    fn load(&self) -> Result<Option<WalletSnapshot>, WalletError> {
        Ok(*self.saved.lock())
    }
}

/// Saves the wallet as a small JSON document
#[derive(Debug, Clone)]
pub struct JsonFileWalletStore {
    path: PathBuf,
}

impl JsonFileWalletStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WalletStore for JsonFileWalletStore {
    fn save(&self, coins: f64, bet: f64) -> Result<(), WalletError> {
        let json = serde_json::to_string_pretty(&WalletSnapshot { coins, bet })?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<WalletSnapshot>, WalletError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path)?;
        let snapshot: WalletSnapshot = serde_json::from_str(&text)?;
        Ok(Some(snapshot))
    }
}

/// Player balance and current bet
pub struct Wallet {
    coins: f64,
    bet: f64,
    store: Option<Box<dyn WalletStore>>,
}

impl Wallet {
    /// Unpersisted wallet
    pub fn new(coins: f64, bet: f64) -> Self {
        Self {
            coins,
            bet,
            store: None,
        }
    }

    /// Restore from `store`, or start from the given defaults if it is empty
    pub fn open(
        store: Box<dyn WalletStore>,
        default_coins: f64,
        default_bet: f64,
    ) -> Result<Self, WalletError> {
        let (coins, bet) = match store.load()? {
            Some(snapshot)
                if snapshot.coins.is_finite() && snapshot.bet.is_finite() && snapshot.bet > 0.0 =>
            {
                log::info!("Wallet restored: {} coins, bet {}", snapshot.coins, snapshot.bet);
                (snapshot.coins.max(0.0), snapshot.bet)
            }
            Some(snapshot) => {
                log::warn!("Ignoring corrupt wallet snapshot {snapshot:?}");
                (default_coins, default_bet)
            }
            None => (default_coins, default_bet),
        };
        let wallet = Self {
            coins,
            bet,
            store: Some(store),
        };
        wallet.save()?;
        Ok(wallet)
    }

    pub fn coins(&self) -> f64 {
        self.coins
    }

    pub fn bet(&self) -> f64 {
        self.bet
    }

    pub fn can_afford(&self, amount: f64) -> bool {
        amount <= self.coins
    }

    pub fn set_bet(&mut self, bet: f64) -> Result<(), WalletError> {
        if !bet.is_finite() || bet <= 0.0 {
            return Err(WalletError::InvalidAmount(bet));
        }
        self.bet = bet;
        self.persist();
        Ok(())
    }

    /// Take `amount` out of the balance
    pub fn debit(&mut self, amount: f64) -> Result<(), WalletError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(WalletError::InvalidAmount(amount));
        }
        if !self.can_afford(amount) {
            return Err(WalletError::InsufficientFunds {
                coins: self.coins,
                needed: amount,
            });
        }
        self.coins -= amount;
        self.persist();
        Ok(())
    }

    pub fn credit(&mut self, amount: f64) -> Result<(), WalletError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(WalletError::InvalidAmount(amount));
        }
        self.coins += amount;
        self.persist();
        Ok(())
    }

    /// Write the current balance to the store, if any
    pub fn save(&self) -> Result<(), WalletError> {
        match &self.store {
            Some(store) => store.save(self.coins, self.bet),
            None => Ok(()),
        }
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            log::warn!("Wallet save failed: {e}");
        }
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("coins", &self.coins)
            .field("bet", &self.bet)
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new(1000.0, 1.0)
    }
}

/// Wallet errors
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Insufficient funds: {coins} coins, {needed} needed")]
    InsufficientFunds { coins: f64, needed: f64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("Wallet I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Wallet format error: {0}")]
    Format(#[from] serde_json::Error),
}
