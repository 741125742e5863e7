//! # rf-reel: Reel motion and outcome landing
//!
//! One [`ReelMotionController`] per reel column. It owns a small pool of
//! symbol slots wrapping through a hidden buffer, accelerates them to top
//! speed, then eases them onto a grid-aligned offset so the requested
//! symbols rest on the visible rows.
//!
//! ## Architecture
//!
//! ```text
//! ReelMotionController
//!     ├── ReelStateMachine   Idle → Spinning → Stopping → Result
//!     ├── SymbolSlotPool     slot arena, row lookup, blur, highlights
//!     ├── StopTween          eased interpolation to the final offset
//!     └── Sender<ReelEvent>  Stopped / StateChanged notifications
//! ```
//!
//! Symbol identities only change while a slot is hidden: a swap is gated
//! on the slot's lap number, which changes exactly when it wraps.

pub mod assets;
pub mod config;
pub mod easing;
pub mod event;
pub mod motion;
pub mod pool;
pub mod state;

pub use assets::*;
pub use config::*;
pub use easing::*;
pub use event::*;
pub use motion::*;
pub use pool::*;
pub use state::*;
