//! Reel motion integration tests
//!
//! Drives a single reel through full spin cycles at frame granularity and
//! checks what a renderer and a coordinator would observe.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, unbounded};
use rf_reel::{
    PathImageLoader, ReelConfig, ReelEvent, ReelMotionController, ReelState, SoundEffects,
    sounds,
};
use rf_slot_math::{SymbolId, SymbolRegistry};

const FRAME: f64 = 1.0 / 60.0;

// ═══════════════════════════════════════════════════════════════════════════════
// TEST FIXTURES
// ═══════════════════════════════════════════════════════════════════════════════

fn reel_with(config: ReelConfig, seed: u64) -> (ReelMotionController, Receiver<ReelEvent>) {
    let (tx, rx) = unbounded();
    let mut reel = ReelMotionController::new(0, config, Arc::new(SymbolRegistry::farm()))
        .unwrap()
        .with_seed(seed)
        .with_event_sink(tx);
    reel.initialize();
    (reel, rx)
}

fn reel() -> (ReelMotionController, Receiver<ReelEvent>) {
    reel_with(ReelConfig::default(), 11)
}

fn ids(names: &[&str]) -> Vec<SymbolId> {
    names.iter().map(|&n| SymbolId::from(n)).collect()
}

fn run_frames(reel: &mut ReelMotionController, frames: usize) {
    for _ in 0..frames {
        reel.tick(FRAME);
    }
}

/// Tick until the reel stops moving; returns the frame count
fn run_until_settled(reel: &mut ReelMotionController) -> usize {
    for frame in 1..=600 {
        reel.tick(FRAME);
        if !reel.is_ticking() {
            return frame;
        }
    }
    panic!("reel never settled");
}

fn stopped_count(rx: &Receiver<ReelEvent>) -> usize {
    rx.try_iter()
        .filter(|e| matches!(e, ReelEvent::Stopped(_)))
        .count()
}

#[derive(Default)]
struct RecordingSound(Mutex<Vec<String>>);

impl SoundEffects for RecordingSound {
    fn play_sound_effect(&self, id: &str) {
        self.0.lock().unwrap().push(id.to_string());
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LANDING
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_stop_lands_requested_symbols() {
    let (mut reel, rx) = reel();
    let targets = ids(&["pig", "cow", "chicken"]);

    assert!(reel.start_spin(None, None));
    run_frames(&mut reel, 30);
    assert!(reel.stop_spin(Some(&targets)));
    run_until_settled(&mut reel);

    assert_eq!(reel.state(), ReelState::Result);
    assert_eq!(reel.speed(), 0.0);
    assert_eq!(
        reel.visible_symbols(),
        targets.into_iter().map(Some).collect::<Vec<_>>()
    );
    assert_eq!(stopped_count(&rx), 1);
}

#[test]
fn test_stop_right_after_start_still_lands() {
    let (mut reel, _rx) = reel();
    let targets = ids(&["wild", "wild", "scatter"]);

    reel.start_spin(None, None);
    reel.tick(FRAME);
    reel.stop_spin(Some(&targets));
    run_until_settled(&mut reel);

    assert_eq!(reel.symbol_at_row(0).unwrap(), "wild");
    assert_eq!(reel.symbol_at_row(1).unwrap(), "wild");
    assert_eq!(reel.symbol_at_row(2).unwrap(), "scatter");
}

#[test]
fn test_preloaded_targets_are_used_by_plain_stop() {
    let (mut reel, _rx) = reel();
    let targets = ids(&["horse", "dog", "sheep"]);

    reel.start_spin(Some(&targets), None);
    run_frames(&mut reel, 20);
    reel.stop_spin(None);
    run_until_settled(&mut reel);

    assert_eq!(
        reel.visible_symbols(),
        targets.into_iter().map(Some).collect::<Vec<_>>()
    );
}

#[test]
fn test_back_to_back_spins_land_each_time() {
    let (mut reel, rx) = reel();
    let rounds = [
        ids(&["pig", "pig", "pig"]),
        ids(&["dog", "bonus", "cow"]),
        ids(&["sheep", "horse", "wild"]),
    ];

    for (round, targets) in rounds.iter().enumerate() {
        assert!(reel.start_spin(None, None), "round {round}");
        run_frames(&mut reel, 15 + round * 17);
        reel.stop_spin(Some(targets));
        run_until_settled(&mut reel);
        assert_eq!(
            reel.visible_symbols(),
            targets.iter().cloned().map(Some).collect::<Vec<_>>(),
            "round {round}"
        );
    }
    assert_eq!(stopped_count(&rx), 3);
}

#[test]
fn test_offset_is_rebased_after_stop() {
    let (mut reel, _rx) = reel();
    let targets = ids(&["cow", "cow", "dog"]);

    reel.start_spin(None, None);
    run_frames(&mut reel, 120);
    reel.stop_spin(Some(&targets));
    run_until_settled(&mut reel);

    let offset = reel.position_offset();
    assert!(offset >= 0.0 && offset < reel.wrap_height(), "offset {offset}");
    assert_eq!(reel.symbol_at_row(2).unwrap(), "dog");
}

#[test]
fn test_unknown_and_missing_targets_are_replaced() {
    let (mut reel, _rx) = reel();
    let registry = SymbolRegistry::farm();

    reel.start_spin(None, None);
    run_frames(&mut reel, 10);
    reel.stop_spin(Some(&ids(&["pig", "unicorn"])));
    assert_eq!(reel.targets().len(), 3);
    run_until_settled(&mut reel);

    let visible = reel.visible_symbols();
    assert_eq!(visible[0].as_ref().unwrap(), "pig");
    for symbol in visible.iter().flatten() {
        assert!(registry.contains(symbol));
    }
    assert!(visible.iter().all(Option::is_some));
}

#[test]
fn test_extra_targets_are_truncated() {
    let (mut reel, _rx) = reel();
    reel.start_spin(None, None);
    run_frames(&mut reel, 10);
    reel.stop_spin(Some(&ids(&["pig", "cow", "dog", "horse", "sheep"])));
    run_until_settled(&mut reel);
    assert_eq!(
        reel.visible_symbols(),
        ids(&["pig", "cow", "dog"])
            .into_iter()
            .map(Some)
            .collect::<Vec<_>>()
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// SWAP GATING
// ═══════════════════════════════════════════════════════════════════════════════

/// Every slot visible on two consecutive frames of the same lap keeps its
/// symbol. At coarse frame steps a slot can leave, wrap and re-enter within
/// one frame, which shows up as a lap change.
fn assert_no_visible_swaps(reel: &mut ReelMotionController, frames: usize, dt: f64) {
    let mut previous: HashMap<usize, (bool, i64, SymbolId)> = HashMap::new();
    for frame in 0..frames {
        reel.tick(dt);
        for (i, slot) in reel.slots().enumerate() {
            if let Some((was_visible, lap, symbol)) = previous.get(&i) {
                if *was_visible && slot.visible && *lap == slot.lap {
                    assert_eq!(
                        &slot.symbol, symbol,
                        "slot {i} changed while visible on frame {frame}"
                    );
                }
            }
            previous.insert(i, (slot.visible, slot.lap, slot.symbol.clone()));
        }
    }
}

#[test]
fn test_symbols_never_change_while_visible() {
    for (seed, dt) in [(1, FRAME), (2, 1.0 / 30.0), (3, 0.05), (4, 0.25)] {
        let (mut reel, _rx) = reel_with(ReelConfig::default(), seed);
        reel.start_spin(None, None);
        assert_no_visible_swaps(&mut reel, 40, dt);
        reel.stop_spin(Some(&ids(&["wild", "pig", "bonus"])));
        assert_no_visible_swaps(&mut reel, 80, dt);
        assert_eq!(reel.state(), ReelState::Result);
    }
}

#[test]
fn test_turbo_profile_never_swaps_visible_slots() {
    let (mut reel, _rx) = reel_with(ReelConfig::turbo(), 9);
    reel.start_spin(None, None);
    assert_no_visible_swaps(&mut reel, 30, FRAME);
    reel.stop_spin(Some(&ids(&["cow", "cow", "cow"])));
    assert_no_visible_swaps(&mut reel, 120, FRAME);
    assert_eq!(reel.symbol_at_row(1).unwrap(), "cow");
}

#[test]
fn test_frame_hitch_is_clamped() {
    let (mut reel, _rx) = reel();
    reel.start_spin(None, None);
    run_frames(&mut reel, 60);
    let before = reel.position_offset();
    reel.tick(5.0);
    let moved = reel.position_offset() - before;
    let max_step = reel.config().max_speed * reel.config().max_tick_dt;
    assert!(moved <= max_step + 1e-9, "moved {moved}");
}

#[test]
fn test_bad_dt_is_ignored() {
    let (mut reel, _rx) = reel();
    reel.start_spin(None, None);
    run_frames(&mut reel, 5);
    let before = reel.position_offset();
    reel.tick(f64::NAN);
    reel.tick(-1.0);
    reel.tick(0.0);
    assert_eq!(reel.position_offset(), before);
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE & SIGNALS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_state_changes_are_published_in_order() {
    let (mut reel, rx) = reel();
    reel.start_spin(None, None);
    run_frames(&mut reel, 10);
    reel.stop_spin(None);
    run_until_settled(&mut reel);

    let events: Vec<ReelEvent> = rx.try_iter().collect();
    let transitions: Vec<(ReelState, ReelState)> = events
        .iter()
        .filter_map(|e| match e {
            ReelEvent::StateChanged(change) => Some((change.old, change.new)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (ReelState::Idle, ReelState::Spinning),
            (ReelState::Spinning, ReelState::Stopping),
            (ReelState::Stopping, ReelState::Result),
        ]
    );
    assert!(matches!(events.last(), Some(ReelEvent::Stopped(_))));
}

#[test]
fn test_stop_while_idle_signals_on_next_tick() {
    let (mut reel, rx) = reel();
    assert!(!reel.stop_spin(None));
    assert_eq!(reel.state(), ReelState::Idle);
    assert_eq!(stopped_count(&rx), 0);

    reel.tick(FRAME);
    assert_eq!(stopped_count(&rx), 1);
    reel.tick(FRAME);
    assert_eq!(stopped_count(&rx), 0);
}

#[test]
fn test_owed_signal_is_flushed_before_the_next_spin() {
    let (mut reel, rx) = reel();
    assert!(!reel.stop_spin(None));
    assert!(reel.start_spin(None, None));

    let events: Vec<_> = rx.try_iter().collect();
    assert!(matches!(events.first(), Some(ReelEvent::Stopped(_))));
    assert!(matches!(
        events.get(1),
        Some(ReelEvent::StateChanged(c)) if c.new == ReelState::Spinning
    ));
    assert_eq!(events.len(), 2);

    run_frames(&mut reel, 30);
    assert_eq!(reel.state(), ReelState::Spinning);
    assert_eq!(stopped_count(&rx), 0);

    assert!(reel.stop_spin(None));
    run_until_settled(&mut reel);
    assert_eq!(stopped_count(&rx), 1);
}

#[test]
fn test_stop_while_stopping_is_rejected_without_extra_signal() {
    let (mut reel, rx) = reel();
    reel.start_spin(None, None);
    run_frames(&mut reel, 10);
    assert!(reel.stop_spin(None));
    assert!(!reel.stop_spin(Some(&ids(&["pig", "pig", "pig"]))));
    run_until_settled(&mut reel);
    assert_eq!(stopped_count(&rx), 1);
}

#[test]
fn test_start_spin_rejected_while_busy() {
    let (mut reel, _rx) = reel();
    assert!(reel.start_spin(None, None));
    assert!(!reel.start_spin(None, None));
    run_frames(&mut reel, 5);
    reel.stop_spin(None);
    assert!(!reel.start_spin(None, None));
    run_until_settled(&mut reel);
    assert!(reel.can_spin());
    assert!(reel.start_spin(None, None));
}

#[test]
fn test_force_stop_returns_to_idle_silently() {
    let (mut reel, rx) = reel();
    reel.start_spin(None, None);
    run_frames(&mut reel, 20);
    reel.stop_spin(None);
    run_frames(&mut reel, 5);

    reel.force_stop();
    reel.force_stop();
    assert_eq!(reel.state(), ReelState::Idle);
    assert!(reel.can_spin());
    assert!(!reel.is_ticking());
    assert!(!reel.is_blurred());
    assert_eq!(reel.speed(), 0.0);
    assert!(reel.position_offset() >= 0.0 && reel.position_offset() < reel.wrap_height());

    run_frames(&mut reel, 10);
    assert_eq!(stopped_count(&rx), 0);

    assert!(reel.start_spin(None, None));
    run_frames(&mut reel, 10);
    reel.stop_spin(Some(&ids(&["dog", "dog", "dog"])));
    run_until_settled(&mut reel);
    assert_eq!(reel.symbol_at_row(1).unwrap(), "dog");
}

#[test]
fn test_force_stop_clears_pending_stopped_signal() {
    let (mut reel, rx) = reel();
    reel.stop_spin(None);
    reel.force_stop();
    run_frames(&mut reel, 3);
    assert_eq!(stopped_count(&rx), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// DELAYED START
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_delayed_start_waits() {
    let (mut reel, _rx) = reel();
    assert!(reel.start_spin(None, Some(0.5)));
    assert!(reel.is_start_pending());
    assert!(!reel.can_spin());
    assert!(!reel.start_spin(None, None));

    run_frames(&mut reel, 24);
    assert_eq!(reel.state(), ReelState::Idle);
    assert_eq!(reel.position_offset(), 0.0);

    run_frames(&mut reel, 10);
    assert_eq!(reel.state(), ReelState::Spinning);
    assert!(!reel.is_start_pending());
    assert!(reel.position_offset() > 0.0);
}

#[test]
fn test_force_stop_cancels_delayed_start() {
    let (mut reel, _rx) = reel();
    reel.start_spin(None, Some(0.2));
    reel.force_stop();
    run_frames(&mut reel, 30);
    assert_eq!(reel.state(), ReelState::Idle);
    assert!(reel.can_spin());
}

#[test]
fn test_stop_during_delay_cancels_and_signals() {
    let (mut reel, rx) = reel();
    reel.start_spin(None, Some(0.3));
    assert!(!reel.stop_spin(None));
    run_frames(&mut reel, 30);
    assert_eq!(reel.state(), ReelState::Idle);
    assert_eq!(stopped_count(&rx), 1);
}

#[test]
fn test_zero_delay_starts_immediately() {
    let (mut reel, _rx) = reel();
    reel.start_spin(None, Some(0.0));
    assert_eq!(reel.state(), ReelState::Spinning);
}

// ═══════════════════════════════════════════════════════════════════════════════
// VISUAL HINTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_blur_follows_top_speed_and_clears_on_stop() {
    let (mut reel, _rx) = reel();
    reel.start_spin(None, None);
    reel.tick(FRAME);
    assert!(!reel.is_blurred());
    run_frames(&mut reel, 30);
    assert!(reel.is_blurred());
    assert!(reel.slots().all(|s| s.is_blurred()));

    reel.stop_spin(None);
    run_until_settled(&mut reel);
    assert!(!reel.is_blurred());
}

#[test]
fn test_highlights_mark_rows_and_reset_on_spin() {
    let (mut reel, _rx) = reel();
    assert!(reel.highlight_row(0));
    assert!(reel.highlight_row(2));
    assert!(!reel.highlight_row(3));
    assert!(reel.slot_at_row(0).unwrap().highlighted);
    assert!(!reel.slot_at_row(1).unwrap().highlighted);

    reel.start_spin(None, None);
    assert!(reel.slots().all(|s| !s.highlighted));

    reel.highlight_row(1);
    reel.reset_highlights();
    assert!(reel.slots().all(|s| !s.highlighted));
}

#[test]
fn test_sounds_play_on_spin_and_stop() {
    let sound = Arc::new(RecordingSound::default());
    let (reel, _rx) = reel();
    let mut reel = reel.with_sound(sound.clone());

    reel.start_spin(None, None);
    run_frames(&mut reel, 10);
    reel.stop_spin(None);
    run_until_settled(&mut reel);

    assert_eq!(
        *sound.0.lock().unwrap(),
        vec![sounds::REEL_SPIN.to_string(), sounds::REEL_STOP.to_string()]
    );
}

#[test]
fn test_landed_slots_show_their_artwork() {
    let (tx, _rx) = unbounded();
    let registry = Arc::new(SymbolRegistry::farm());
    let mut reel = ReelMotionController::new(0, ReelConfig::default(), registry)
        .unwrap()
        .with_seed(3)
        .with_image_loader(Arc::new(PathImageLoader), "farm")
        .with_event_sink(tx);
    reel.initialize();

    reel.start_spin(None, None);
    run_frames(&mut reel, 40);
    let mid = reel.slot_at_row(1).map(|s| s.image().map(|i| i.key().to_string()));
    assert!(mid.is_none() || mid.unwrap().is_some_and(|k| k.ends_with("_blur.png")));

    reel.stop_spin(Some(&ids(&["pig", "cow", "sheep"])));
    run_until_settled(&mut reel);
    assert_eq!(
        reel.slot_at_row(2).unwrap().image().unwrap().key(),
        "farm/symbols/sheep.png"
    );
}
