//! Reel motion controller
//!
//! Drives one reel from rest, through a free spin, into an eased stop that
//! lands externally chosen symbols on the visible rows.
//!
//! ## Landing
//!
//! A stop picks a final offset that is grid aligned and at least
//! `min_extra_wraps` wrap periods away, so every slot wraps at least once
//! more before rest. Slot identities change only when a slot's lap number
//! changes, which happens while it sits in the hidden buffer. On the lap a
//! slot will still occupy at rest it receives its final symbol; on earlier
//! laps it receives a random filler.

use std::sync::Arc;

use crossbeam_channel::Sender;
use rand::prelude::*;
use rf_slot_math::{SymbolId, SymbolRegistry, draw_symbol};

use crate::assets::{NoImages, Silence, SoundEffects, SymbolImageLoader, sounds};
use crate::config::{ReelConfig, ReelConfigError};
use crate::easing::StopTween;
use crate::event::{ReelEvent, ReelStoppedEvent, StateChangedEvent};
use crate::pool::{SlotId, SlotRecord, SymbolSlotPool};
use crate::state::{ObserverError, ReelState, ReelStateMachine, StateObserver};

/// Where a slot ends up when the current stop completes
#[derive(Debug, Clone)]
struct Landing {
    lap: i64,
    /// `None` for slots resting in the hidden buffer
    target: Option<SymbolId>,
}

#[derive(Debug, Clone)]
struct PendingStart {
    remaining: f64,
    targets: Option<Vec<SymbolId>>,
}

/// One reel's motion and landing logic
pub struct ReelMotionController {
    reel_index: usize,
    config: ReelConfig,
    registry: Arc<SymbolRegistry>,
    rng: StdRng,
    machine: ReelStateMachine,
    pool: SymbolSlotPool,
    /// Pooled slots, topmost origin first
    slot_ids: Vec<SlotId>,
    sound: Arc<dyn SoundEffects>,
    events: Option<Sender<ReelEvent>>,

    position_offset: f64,
    speed: f64,
    wrap_height: f64,
    moved_since_sync: f64,
    ticking: bool,
    blur_hinted: bool,

    targets: Vec<SymbolId>,
    landing: Vec<Landing>,
    tween: Option<StopTween>,
    pending_start: Option<PendingStart>,
    stopped_signal_pending: bool,
}

impl ReelMotionController {
    /// Create a controller. Call [`initialize`](Self::initialize) before the first spin.
    pub fn new(
        reel_index: usize,
        config: ReelConfig,
        registry: Arc<SymbolRegistry>,
    ) -> Result<Self, ReelConfigError> {
        config.validate()?;
        let pool = SymbolSlotPool::new(
            registry.clone(),
            Arc::new(NoImages),
            "",
            config.row_positions(),
            config.row_tolerance,
        );
        Ok(Self {
            reel_index,
            wrap_height: config.wrap_height(),
            config,
            registry,
            rng: StdRng::from_os_rng(),
            machine: ReelStateMachine::new(reel_index),
            pool,
            slot_ids: Vec::new(),
            sound: Arc::new(Silence),
            events: None,
            position_offset: 0.0,
            speed: 0.0,
            moved_since_sync: 0.0,
            ticking: false,
            blur_hinted: false,
            targets: Vec::new(),
            landing: Vec::new(),
            tween: None,
            pending_start: None,
            stopped_signal_pending: false,
        })
    }

    /// Seed the filler RNG
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Use a real image loader; takes effect for slots acquired afterwards
    pub fn with_image_loader(
        mut self,
        loader: Arc<dyn SymbolImageLoader>,
        bundle: impl Into<String>,
    ) -> Self {
        self.pool = SymbolSlotPool::new(
            self.registry.clone(),
            loader,
            bundle,
            self.config.row_positions(),
            self.config.row_tolerance,
        );
        self.slot_ids.clear();
        self
    }

    pub fn with_sound(mut self, sound: Arc<dyn SoundEffects>) -> Self {
        self.sound = sound;
        self
    }

    /// Publish `Stopped` and `StateChanged` events on `sender`
    pub fn with_event_sink(mut self, sender: Sender<ReelEvent>) -> Self {
        let state_sender = sender.clone();
        self.machine.add_observer(Box::new(move |event: &StateChangedEvent| {
            state_sender
                .send(ReelEvent::StateChanged(*event))
                .map_err(|_| ObserverError::Disconnected)
        }));
        self.events = Some(sender);
        self
    }

    /// Extra state observer
    pub fn add_state_observer(&mut self, observer: StateObserver) {
        self.machine.add_observer(observer);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════════

    /// (Re)build the slot pool with random symbols at rest positions
    pub fn initialize(&mut self) {
        for id in self.slot_ids.drain(..) {
            self.pool.release(id);
        }
        for index in 0..self.config.slot_count() {
            let symbol = draw_symbol(&self.registry, &mut self.rng);
            let id = self.pool.acquire(&symbol);
            if let Some(slot) = self.pool.get_mut(id) {
                slot.origin = self.config.slot_origin(index);
            }
            self.slot_ids.push(id);
        }
        self.sync_positions(false);
        log::debug!(
            "Reel {} initialized with {} slots, wrap height {}",
            self.reel_index,
            self.slot_ids.len(),
            self.wrap_height
        );
    }

    /// Start spinning now, or after `delay` seconds.
    ///
    /// `targets` preloads the symbols a later target-less stop will land.
    /// Returns `false` (and does nothing) unless the reel can spin.
    pub fn start_spin(&mut self, targets: Option<&[SymbolId]>, delay: Option<f64>) -> bool {
        if !self.machine.can_spin() || self.pending_start.is_some() {
            log::debug!(
                "Reel {}: start_spin ignored in {}",
                self.reel_index,
                self.machine.state().name()
            );
            return false;
        }

        // A signal owed to an earlier illegal stop belongs to that cycle
        if self.stopped_signal_pending {
            self.stopped_signal_pending = false;
            self.emit_stopped();
        }

        let targets = targets.map(|t| self.normalize_targets(t));
        match delay {
            Some(delay) if delay.is_finite() && delay > 0.0 => {
                self.pending_start = Some(PendingStart {
                    remaining: delay,
                    targets,
                });
            }
            _ => self.begin_spin(targets),
        }
        true
    }

    /// Request a stop, optionally replacing the targets.
    ///
    /// Legal only while spinning. An illegal request still produces a
    /// (deferred) `Stopped` event so nobody waiting on this reel hangs;
    /// a reel already stopping will signal when its own stop completes.
    pub fn stop_spin(&mut self, targets: Option<&[SymbolId]>) -> bool {
        if !self.machine.is_spinning() || self.tween.is_some() {
            if self.machine.is_stopping() {
                log::debug!("Reel {}: already stopping", self.reel_index);
            } else {
                log::debug!(
                    "Reel {}: stop_spin in {}, signalling stopped",
                    self.reel_index,
                    self.machine.state().name()
                );
                self.pending_start = None;
                self.stopped_signal_pending = true;
            }
            return false;
        }

        if let Some(targets) = targets {
            self.targets = self.normalize_targets(targets);
        } else if self.targets.len() != self.config.visible_rows {
            let preset = std::mem::take(&mut self.targets);
            self.targets = self.normalize_targets(&preset);
        }

        self.machine.start_stopping();

        let final_offset = self.final_offset();
        self.landing = self.plan_landing(final_offset);
        self.tween = Some(StopTween::new(
            self.position_offset,
            final_offset,
            self.config.stop_duration,
            self.config.easing,
        ));
        self.ticking = true;

        log::debug!(
            "Reel {}: stopping from {:.1} to {:.1} at speed {:.1}, targets {:?}",
            self.reel_index,
            self.position_offset,
            final_offset,
            self.speed,
            self.targets
        );
        true
    }

    /// Abandon whatever the reel is doing and return to Idle immediately.
    ///
    /// Cancels the stop interpolation, a pending delayed start and a pending
    /// stopped signal. Targets are dropped and no `Stopped` event is sent.
    pub fn force_stop(&mut self) {
        self.tween = None;
        self.pending_start = None;
        self.stopped_signal_pending = false;
        self.landing.clear();
        self.targets.clear();

        self.position_offset = self.position_offset.rem_euclid(self.wrap_height);
        self.speed = 0.0;
        self.ticking = false;
        self.clear_blur_hint();

        self.machine.reset();
        self.sync_positions(false);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FRAME TICK
    // ═══════════════════════════════════════════════════════════════════════════

    /// Advance by one frame
    pub fn tick(&mut self, dt: f64) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let dt = dt.min(self.config.max_tick_dt);

        self.run_scheduled(dt);
        if !self.ticking {
            return;
        }

        let steps = (dt / self.config.max_substep).ceil().max(1.0) as usize;
        let step_dt = dt / steps as f64;
        for _ in 0..steps {
            if !self.ticking {
                break;
            }
            self.step(step_dt);
        }
    }

    fn run_scheduled(&mut self, dt: f64) {
        if self.stopped_signal_pending {
            self.stopped_signal_pending = false;
            self.emit_stopped();
        }

        if let Some(pending) = self.pending_start.as_mut() {
            pending.remaining -= dt;
            if pending.remaining <= 0.0 {
                let targets = pending.targets.take();
                self.pending_start = None;
                self.begin_spin(targets);
            }
        }
    }

    fn step(&mut self, dt: f64) {
        let mut finished = false;
        match self.machine.state() {
            ReelState::Spinning => {
                self.speed = (self.speed + self.config.acceleration * dt).min(self.config.max_speed);
                if self.speed >= self.config.max_speed && !self.blur_hinted {
                    self.blur_hinted = true;
                    self.pool.set_blur(true);
                }
                let delta = self.speed * dt;
                self.position_offset += delta;
                self.moved_since_sync += delta;
            }
            ReelState::Stopping => {
                let Some(tween) = self.tween.as_mut() else {
                    return;
                };
                let previous = self.position_offset;
                self.position_offset = tween.advance_stop(dt);
                finished = tween.is_finished();

                let delta = self.position_offset - previous;
                self.speed = delta / dt;
                self.moved_since_sync += delta.abs();
            }
            ReelState::Idle | ReelState::Result => {
                self.ticking = false;
                return;
            }
        }

        if finished {
            self.complete_stop();
        } else if self.moved_since_sync >= self.config.sync_threshold {
            self.sync_positions(self.machine.is_stopping());
        }
    }

    fn complete_stop(&mut self) {
        if let Some(tween) = self.tween.take() {
            self.position_offset = tween.target();
        }
        // Last lap changes still belong to the stop
        self.sync_positions(true);

        self.speed = 0.0;
        self.ticking = false;
        self.clear_blur_hint();
        self.landing.clear();
        self.machine.set_result();

        self.position_offset = self.position_offset.rem_euclid(self.wrap_height);
        self.sync_positions(false);

        let shown = self.visible_symbols();
        log::debug!("Reel {} stopped on {:?}", self.reel_index, shown);
        self.sound.play_sound_effect(sounds::REEL_STOP);
        self.emit_stopped();
    }

    fn begin_spin(&mut self, targets: Option<Vec<SymbolId>>) {
        if !self.machine.start_spin() {
            return;
        }
        self.targets = targets.unwrap_or_default();
        self.speed = 0.0;
        self.blur_hinted = false;
        self.ticking = true;
        self.moved_since_sync = 0.0;
        self.pool.reset_highlights();
        self.sound.play_sound_effect(sounds::REEL_SPIN);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // POSITIONS
    // ═══════════════════════════════════════════════════════════════════════════

    fn wrapped_position(&self, origin: f64, offset: f64) -> f64 {
        let half = self.wrap_height / 2.0;
        (origin - offset + half).rem_euclid(self.wrap_height) - half
    }

    fn lap_at(&self, origin: f64, offset: f64) -> i64 {
        ((origin - offset + self.wrap_height / 2.0) / self.wrap_height).floor() as i64
    }

    /// Visible row for a resting position, if it is on one
    fn row_for_position(&self, position: f64) -> Option<usize> {
        let row = (self.config.visible_rows as f64 - 1.0) / 2.0 - position / self.config.cell_pitch;
        let nearest = row.round();
        let on_row = (row - nearest).abs() * self.config.cell_pitch <= self.config.row_tolerance;
        if on_row && nearest >= 0.0 && (nearest as usize) < self.config.visible_rows {
            Some(nearest as usize)
        } else {
            None
        }
    }

    /// Grid-aligned offset far enough away to decelerate smoothly and to
    /// wrap every slot at least `min_extra_wraps` times
    fn final_offset(&self) -> f64 {
        let decel = self.speed * self.config.stop_duration / self.config.easing.initial_slope();
        let wraps = self.config.min_extra_wraps * self.wrap_height;
        let distance = decel.max(wraps);
        let pitch = self.config.cell_pitch;
        ((self.position_offset + distance) / pitch).ceil() * pitch
    }

    fn plan_landing(&self, final_offset: f64) -> Vec<Landing> {
        self.slot_ids
            .iter()
            .map(|&id| {
                let origin = self.pool.get(id).map_or(0.0, |s| s.origin);
                let position = self.wrapped_position(origin, final_offset);
                Landing {
                    lap: self.lap_at(origin, final_offset),
                    target: self
                        .row_for_position(position)
                        .and_then(|row| self.targets.get(row).cloned()),
                }
            })
            .collect()
    }

    /// Recompute positions, visibility and laps. With `allow_swaps`, a lap
    /// change re-dresses the slot.
    fn sync_positions(&mut self, allow_swaps: bool) {
        let extent = self.config.visible_extent();
        for i in 0..self.slot_ids.len() {
            let id = self.slot_ids[i];
            let Some(origin) = self.pool.get(id).map(|s| s.origin) else {
                continue;
            };
            let position = self.wrapped_position(origin, self.position_offset);
            let lap = self.lap_at(origin, self.position_offset);

            let mut lap_changed = false;
            if let Some(slot) = self.pool.get_mut(id) {
                slot.position = position;
                slot.visible = position.abs() < extent;
                lap_changed = slot.lap != lap;
                slot.lap = lap;
            }

            if lap_changed && allow_swaps {
                let symbol = match self.landing.get(i) {
                    Some(Landing {
                        lap: final_lap,
                        target: Some(target),
                    }) if *final_lap == lap => target.clone(),
                    _ => draw_symbol(&self.registry, &mut self.rng),
                };
                self.pool.assign(id, &symbol);
            }
        }
        self.pool.invalidate_rows();
        self.moved_since_sync = 0.0;
    }

    /// Exactly `visible_rows` registered ids; unknown ids and gaps become random symbols
    fn normalize_targets(&mut self, targets: &[SymbolId]) -> Vec<SymbolId> {
        let rows = self.config.visible_rows;
        if targets.len() > rows {
            log::debug!(
                "Reel {}: {} targets for {} rows, truncating",
                self.reel_index,
                targets.len(),
                rows
            );
        }
        (0..rows)
            .map(|row| match targets.get(row) {
                Some(id) if self.registry.contains(id) => id.clone(),
                Some(id) => {
                    let replacement = draw_symbol(&self.registry, &mut self.rng);
                    log::warn!(
                        "Reel {}: unknown target {} on row {}, using {}",
                        self.reel_index,
                        id,
                        row,
                        replacement
                    );
                    replacement
                }
                None => draw_symbol(&self.registry, &mut self.rng),
            })
            .collect()
    }

    fn clear_blur_hint(&mut self) {
        self.blur_hinted = false;
        self.pool.set_blur(false);
    }

    fn emit_stopped(&self) {
        let event = ReelEvent::Stopped(ReelStoppedEvent {
            reel_index: self.reel_index,
        });
        if let Some(sender) = &self.events {
            if sender.send(event).is_err() {
                log::warn!("Reel {}: stopped event has no receiver", self.reel_index);
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES & VISUAL HINTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Slot resting on visible row `row` (0 = top)
    pub fn slot_at_row(&mut self, row: usize) -> Option<&SlotRecord> {
        let id = self.pool.slot_at_row(row)?;
        self.pool.get(id)
    }

    pub fn symbol_at_row(&mut self, row: usize) -> Option<SymbolId> {
        self.slot_at_row(row).map(|slot| slot.symbol.clone())
    }

    /// Symbols on the visible rows, top first
    pub fn visible_symbols(&mut self) -> Vec<Option<SymbolId>> {
        (0..self.config.visible_rows)
            .map(|row| self.symbol_at_row(row))
            .collect()
    }

    /// Highlight the slot on `row`; `false` if no slot rests there
    pub fn highlight_row(&mut self, row: usize) -> bool {
        let Some(id) = self.pool.slot_at_row(row) else {
            return false;
        };
        match self.pool.get_mut(id) {
            Some(slot) => {
                slot.highlighted = true;
                true
            }
            None => false,
        }
    }

    pub fn reset_highlights(&mut self) {
        self.pool.reset_highlights();
    }

    /// Cosmetic blur toggle; never touches offsets or identities
    pub fn set_blur(&mut self, blur: bool) {
        self.pool.set_blur(blur);
    }

    /// Pooled slots, topmost origin first, for the renderer
    pub fn slots(&self) -> impl Iterator<Item = &SlotRecord> {
        self.slot_ids.iter().filter_map(|&id| self.pool.get(id))
    }

    pub fn reel_index(&self) -> usize {
        self.reel_index
    }

    pub fn state(&self) -> ReelState {
        self.machine.state()
    }

    pub fn can_spin(&self) -> bool {
        self.machine.can_spin() && self.pending_start.is_none()
    }

    pub fn is_spinning(&self) -> bool {
        self.machine.is_spinning()
    }

    pub fn is_stopping(&self) -> bool {
        self.machine.is_stopping()
    }

    /// A delayed start is scheduled but has not fired
    pub fn is_start_pending(&self) -> bool {
        self.pending_start.is_some()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    pub fn position_offset(&self) -> f64 {
        self.position_offset
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn wrap_height(&self) -> f64 {
        self.wrap_height
    }

    pub fn is_blurred(&self) -> bool {
        self.pool.is_blurred()
    }

    pub fn targets(&self) -> &[SymbolId] {
        &self.targets
    }

    pub fn config(&self) -> &ReelConfig {
        &self.config
    }
}

impl std::fmt::Debug for ReelMotionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReelMotionController")
            .field("reel_index", &self.reel_index)
            .field("state", &self.machine.state())
            .field("position_offset", &self.position_offset)
            .field("speed", &self.speed)
            .field("ticking", &self.ticking)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn controller() -> ReelMotionController {
        let mut reel =
            ReelMotionController::new(0, ReelConfig::default(), Arc::new(SymbolRegistry::farm()))
                .unwrap()
                .with_seed(5);
        reel.initialize();
        reel
    }

    #[test]
    fn test_initialize_places_slots_on_rows() {
        let mut reel = controller();
        assert_eq!(reel.slots().count(), 5);
        assert_eq!(reel.slots().filter(|s| s.visible).count(), 3);
        for row in 0..3 {
            assert!(reel.slot_at_row(row).is_some());
        }
        assert!(reel.slot_at_row(3).is_none());
    }

    #[test]
    fn test_wrapped_position_and_lap() {
        let reel = controller();
        let w = reel.wrap_height();
        assert_relative_eq!(reel.wrapped_position(300.0, 0.0), 300.0);
        assert_relative_eq!(reel.wrapped_position(300.0, 700.0), 350.0);
        assert_relative_eq!(reel.wrapped_position(-300.0, w), -300.0);
        assert_eq!(reel.lap_at(300.0, 0.0), 0);
        assert_eq!(reel.lap_at(300.0, 700.0), -1);
        assert_eq!(reel.lap_at(0.0, w), -1);
    }

    #[test]
    fn test_row_for_position() {
        let reel = controller();
        assert_eq!(reel.row_for_position(150.0), Some(0));
        assert_eq!(reel.row_for_position(0.3), Some(1));
        assert_eq!(reel.row_for_position(-150.0), Some(2));
        assert_eq!(reel.row_for_position(300.0), None);
        assert_eq!(reel.row_for_position(75.0), None);
    }

    #[test]
    fn test_final_offset_is_aligned_and_far_enough() {
        let mut reel = controller();
        reel.start_spin(None, None);
        for _ in 0..40 {
            reel.tick(1.0 / 60.0);
        }
        let start = reel.position_offset();
        let final_offset = reel.final_offset();
        let pitch = reel.config().cell_pitch;

        assert_relative_eq!((final_offset / pitch).round() * pitch, final_offset);
        assert!(final_offset - start >= reel.wrap_height());
        assert!(final_offset - start >= reel.speed() * reel.config().stop_duration / 3.0);
    }

    #[test]
    fn test_normalize_targets_pads_and_replaces() {
        let mut reel = controller();
        let registry = SymbolRegistry::farm();

        let out = reel.normalize_targets(&["pig".into(), "unicorn".into()]);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], "pig");
        assert!(registry.contains(&out[1]));
        assert!(registry.contains(&out[2]));

        let out = reel.normalize_targets(&[
            "cow".into(),
            "cow".into(),
            "cow".into(),
            "pig".into(),
        ]);
        assert_eq!(out, vec![SymbolId::from("cow"); 3]);
    }

    #[test]
    fn test_blur_hint_on_max_speed() {
        let mut reel = controller();
        reel.start_spin(None, None);
        reel.tick(1.0 / 60.0);
        assert!(!reel.is_blurred());
        for _ in 0..60 {
            reel.tick(1.0 / 60.0);
        }
        assert_relative_eq!(reel.speed(), reel.config().max_speed);
        assert!(reel.is_blurred());

        // One-shot: a manual clear is not undone while still at top speed
        reel.set_blur(false);
        reel.tick(1.0 / 60.0);
        assert!(!reel.is_blurred());
    }
}
