//! # rf-spin: Spin coordination for a reel game
//!
//! Wires the math crate and the reel crate into a playable loop:
//!
//! ```text
//! GameConfig (json / yaml)
//!     │
//!     └── SpinCoordinator
//!             ├── OutcomeSource::generate → SymbolGrid ──► WinEvaluator
//!             ├── ReelMotionController × reel_count   (column i → reel i)
//!             ├── Receiver<ReelEvent>                 (all Stopped → settle)
//!             └── Wallet ── WalletStore               (debit, credit, refund)
//! ```
//!
//! The `rf-spin` binary runs the same loop headlessly and reports RTP.

pub mod config;
pub mod coordinator;
pub mod stats;
pub mod wallet;

pub use config::*;
pub use coordinator::*;
pub use stats::*;
pub use wallet::*;
