//! Spin coordinator
//!
//! Composition root for one game: owns the outcome source, the evaluator,
//! one motion controller per reel and the wallet. A spin draws one grid,
//! hands each reel its column, staggers the stops and settles the bet once
//! every reel has reported `Stopped`.

use std::sync::Arc;

use crossbeam_channel::{Receiver, unbounded};
use rf_reel::{ReelConfig, ReelConfigError, ReelEvent, ReelMotionController, SoundEffects};
use rf_slot_math::{
    EvaluationResult, OutcomeSource, SymbolGrid, SymbolId, SymbolRegistry, WeightedOutcomeGenerator,
    WinEvaluator,
};
use serde::{Deserialize, Serialize};

use crate::config::{GameConfig, GameConfigError, SpinConfig};
use crate::stats::SessionStats;
use crate::wallet::{Wallet, WalletError};

/// Extra time a blocking spin may take beyond its schedule (s)
const STALL_SLACK: f64 = 5.0;

/// A settled spin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub grid: SymbolGrid,
    pub evaluation: EvaluationResult,
    pub bet: f64,
}

impl SpinOutcome {
    pub fn win(&self) -> f64 {
        self.evaluation.total_win
    }
}

/// Bookkeeping for the spin in flight
#[derive(Debug)]
struct ActiveSpin {
    grid: SymbolGrid,
    evaluation: EvaluationResult,
    bet: f64,
    elapsed: f64,
    stop_at: Vec<f64>,
    stop_issued: Vec<bool>,
    stopped: Vec<bool>,
}

impl ActiveSpin {
    fn all_stopped(&self) -> bool {
        self.stopped.iter().all(|&s| s)
    }
}

/// Drives all reels of one game through spin cycles
pub struct SpinCoordinator {
    config: SpinConfig,
    source: Arc<dyn OutcomeSource>,
    evaluator: WinEvaluator,
    reels: Vec<ReelMotionController>,
    events: Receiver<ReelEvent>,
    wallet: Wallet,
    active: Option<ActiveSpin>,
    stats: SessionStats,
}

impl SpinCoordinator {
    pub fn new(
        registry: Arc<SymbolRegistry>,
        reel_config: ReelConfig,
        config: SpinConfig,
        source: Arc<dyn OutcomeSource>,
        wallet: Wallet,
    ) -> Result<Self, CoordinatorError> {
        config.validate()?;
        if config.rows_per_reel != reel_config.visible_rows {
            return Err(GameConfigError::RowMismatch {
                rows_per_reel: config.rows_per_reel,
                visible_rows: reel_config.visible_rows,
            }
            .into());
        }

        let (sender, events) = unbounded();
        let mut reels = Vec::with_capacity(config.reel_count);
        for index in 0..config.reel_count {
            let mut reel = ReelMotionController::new(index, reel_config.clone(), registry.clone())?
                .with_event_sink(sender.clone());
            if let Some(seed) = config.seed {
                reel = reel.with_seed(seed.wrapping_add(index as u64 + 1));
            }
            reel.initialize();
            reels.push(reel);
        }

        log::info!(
            "Spin coordinator ready: {} reels x {} rows, {} coins",
            config.reel_count,
            config.rows_per_reel,
            wallet.coins()
        );

        Ok(Self {
            config,
            source,
            evaluator: WinEvaluator::new(registry),
            reels,
            events,
            wallet,
            active: None,
            stats: SessionStats::default(),
        })
    }

    /// Build everything a game config describes, with a weighted generator
    pub fn from_game(game: &GameConfig, wallet: Wallet) -> Result<Self, CoordinatorError> {
        game.validate()?;
        let registry = Arc::new(game.registry()?);
        let source: Arc<dyn OutcomeSource> = match game.spin.seed {
            Some(seed) => Arc::new(WeightedOutcomeGenerator::with_seed(registry.clone(), seed)),
            None => Arc::new(WeightedOutcomeGenerator::new(registry.clone())),
        };
        let evaluator = WinEvaluator::with_directions(registry.clone(), game.directions.clone());
        Ok(
            Self::new(registry, game.reel.clone(), game.spin.clone(), source, wallet)?
                .with_evaluator(evaluator),
        )
    }

    pub fn with_evaluator(mut self, evaluator: WinEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Route every reel's sounds to `sound`
    pub fn with_sound(mut self, sound: Arc<dyn SoundEffects>) -> Self {
        self.reels = self
            .reels
            .into_iter()
            .map(|reel| reel.with_sound(sound.clone()))
            .collect();
        self
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SPIN CYCLE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Take the bet, draw and evaluate a grid, and set every reel spinning
    pub fn spin(&mut self, bet: f64) -> Result<(), CoordinatorError> {
        if self.active.is_some() {
            return Err(CoordinatorError::SpinInProgress);
        }
        if let Some(reel) = self.reels.iter().find(|r| !r.can_spin()) {
            return Err(CoordinatorError::ReelBusy(reel.reel_index()));
        }
        if !bet.is_finite() || bet <= 0.0 {
            return Err(CoordinatorError::InvalidBet(bet));
        }
        self.wallet.debit(bet)?;

        let (reels, rows) = (self.config.reel_count, self.config.rows_per_reel);
        let grid = self.source.generate(reels, rows);
        if grid.reel_count() != reels || !grid.is_rectangular() || grid.rows_per_reel() != rows {
            self.refund(bet);
            return Err(CoordinatorError::MalformedGrid {
                expected_reels: reels,
                expected_rows: rows,
                reels: grid.reel_count(),
                rows: grid.rows_per_reel(),
            });
        }
        let registry = self.evaluator.registry();
        let unknown = grid.reels().iter().enumerate().find_map(|(col, column)| {
            column
                .iter()
                .position(|id| !registry.contains(id))
                .map(|row| (col, row, column[row].clone()))
        });
        if let Some((col, row, id)) = unknown {
            self.refund(bet);
            return Err(CoordinatorError::UnknownSymbol { col, row, id });
        }
        let evaluation = self.evaluator.evaluate(&grid, bet);

        for (index, reel) in self.reels.iter_mut().enumerate() {
            reel.start_spin(grid.reel(index), Some(self.config.start_delay(index)));
        }

        // Owed signals from earlier illegal stops belong to no spin
        for event in self.events.try_iter() {
            log::trace!("Discarding stale {} from reel {}", event.type_name(), event.reel_index());
        }

        log::info!(
            "Spin started: bet {}, {} coins left, pending win {}",
            bet,
            self.wallet.coins(),
            evaluation.total_win
        );

        let stop_at = (0..reels)
            .map(|i| self.config.start_delay(i) + self.config.stop_time(i))
            .collect();
        self.active = Some(ActiveSpin {
            grid,
            evaluation,
            bet,
            elapsed: 0.0,
            stop_at,
            stop_issued: vec![false; reels],
            stopped: vec![false; reels],
        });
        Ok(())
    }

    /// Advance every reel by one frame. Returns the outcome on the frame the
    /// last reel reports stopped.
    pub fn tick(&mut self, dt: f64) -> Option<SpinOutcome> {
        for reel in &mut self.reels {
            reel.tick(dt);
        }

        let Some(active) = self.active.as_mut() else {
            for event in self.events.try_iter() {
                log::trace!("Idle {} from reel {}", event.type_name(), event.reel_index());
            }
            return None;
        };

        if dt.is_finite() && dt > 0.0 {
            active.elapsed += dt;
        }

        for (index, reel) in self.reels.iter_mut().enumerate() {
            // A reel still waiting on its start delay is not stoppable yet
            if !active.stop_issued[index]
                && active.elapsed >= active.stop_at[index]
                && reel.is_spinning()
            {
                active.stop_issued[index] = reel.stop_spin(None);
            }
        }

        for event in self.events.try_iter() {
            match event {
                ReelEvent::Stopped(stopped) => {
                    let index = stopped.reel_index;
                    if active.stop_issued.get(index).copied().unwrap_or(false) {
                        active.stopped[index] = true;
                        log::debug!("Reel {index} settled at {:.3}s", active.elapsed);
                    }
                }
                ReelEvent::StateChanged(change) => {
                    log::trace!(
                        "Reel {}: {} -> {}",
                        change.reel_index,
                        change.old.name(),
                        change.new.name()
                    );
                }
            }
        }

        if !active.all_stopped() {
            return None;
        }
        let active = self.active.take()?;
        Some(self.settle(active))
    }

    fn settle(&mut self, active: ActiveSpin) -> SpinOutcome {
        let win = active.evaluation.total_win;
        if win > 0.0 {
            if let Err(e) = self.wallet.credit(win) {
                log::error!("Could not credit win {win}: {e}");
            }
        }
        self.stats.record(active.bet, win);

        for line in active.evaluation.win_lines.iter().filter(|l| l.payout > 0.0) {
            for pos in &line.positions {
                if let Some(reel) = self.reels.get_mut(pos.col) {
                    reel.highlight_row(pos.row);
                }
            }
        }

        log::info!(
            "Spin settled: bet {}, win {} ({} lines), balance {}",
            active.bet,
            win,
            active.evaluation.win_count(),
            self.wallet.coins()
        );

        SpinOutcome {
            grid: active.grid,
            evaluation: active.evaluation,
            bet: active.bet,
        }
    }

    /// Pull every outstanding stop forward to now. Returns `false` when no
    /// spin is in flight.
    pub fn request_stop(&mut self) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        let now = active.elapsed;
        for stop_at in &mut active.stop_at {
            *stop_at = stop_at.min(now);
        }
        log::debug!("Slam stop at {now:.3}s");
        true
    }

    /// Force every reel back to Idle and abandon the spin in flight,
    /// refunding its bet
    pub fn force_stop_all(&mut self) {
        for reel in &mut self.reels {
            reel.force_stop();
        }
        if let Some(active) = self.active.take() {
            self.refund(active.bet);
            self.stats.aborted_spins += 1;
            log::warn!("Spin abandoned, bet {} refunded", active.bet);
        }
        for _ in self.events.try_iter() {}
    }

    /// Start a spin and tick it to completion at a fixed frame time
    pub fn run_spin(&mut self, bet: f64, dt: f64) -> Result<SpinOutcome, CoordinatorError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(CoordinatorError::InvalidFrameTime(dt));
        }
        self.spin(bet)?;

        let last = self.config.reel_count.saturating_sub(1);
        let (stop_duration, max_tick_dt) = self
            .reels
            .first()
            .map_or((0.0, dt), |r| (r.config().stop_duration, r.config().max_tick_dt));
        let budget = self.config.start_delay(last)
            + self.config.stop_time(last)
            + stop_duration
            + STALL_SLACK;
        let frames = (budget / dt.min(max_tick_dt)).ceil() as usize + 1;

        for _ in 0..frames {
            if let Some(outcome) = self.tick(dt) {
                return Ok(outcome);
            }
        }
        self.force_stop_all();
        Err(CoordinatorError::Stalled { seconds: budget })
    }

    fn refund(&mut self, bet: f64) {
        if let Err(e) = self.wallet.credit(bet) {
            log::error!("Could not refund bet {bet}: {e}");
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn is_spinning(&self) -> bool {
        self.active.is_some()
    }

    pub fn reels(&self) -> &[ReelMotionController] {
        &self.reels
    }

    pub fn reel(&self, index: usize) -> Option<&ReelMotionController> {
        self.reels.get(index)
    }

    /// What the reels currently show, one column per reel; `None` where no
    /// slot rests on a row
    pub fn displayed_symbols(&mut self) -> Vec<Vec<Option<SymbolId>>> {
        self.reels
            .iter_mut()
            .map(ReelMotionController::visible_symbols)
            .collect()
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn wallet_mut(&mut self) -> &mut Wallet {
        &mut self.wallet
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn evaluator(&self) -> &WinEvaluator {
        &self.evaluator
    }

    pub fn config(&self) -> &SpinConfig {
        &self.config
    }
}

impl std::fmt::Debug for SpinCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinCoordinator")
            .field("config", &self.config)
            .field("reels", &self.reels)
            .field("wallet", &self.wallet)
            .field("spinning", &self.active.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Spin coordination errors
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("A spin is already in progress")]
    SpinInProgress,

    #[error("Reel {0} cannot start a spin")]
    ReelBusy(usize),

    #[error("Invalid bet: {0}")]
    InvalidBet(f64),

    #[error("Invalid frame time: {0}")]
    InvalidFrameTime(f64),

    #[error("Outcome source produced a {reels}x{rows} grid, expected {expected_reels}x{expected_rows}")]
    MalformedGrid {
        expected_reels: usize,
        expected_rows: usize,
        reels: usize,
        rows: usize,
    },

    #[error("Outcome source produced unknown symbol '{id}' at reel {col}, row {row}")]
    UnknownSymbol { col: usize, row: usize, id: SymbolId },

    #[error("Spin did not settle within {seconds:.1}s")]
    Stalled { seconds: f64 },

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Config error: {0}")]
    Config(#[from] GameConfigError),

    #[error("Reel error: {0}")]
    Reel(#[from] ReelConfigError),
}
