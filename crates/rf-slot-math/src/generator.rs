//! Weighted-random outcome generation

use std::sync::Arc;

use parking_lot::Mutex;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::grid::SymbolGrid;
use crate::symbols::{SymbolId, SymbolRegistry};

/// Anything that can decide a spin's grid.
///
/// The weighted generator below is the local implementation; a remote
/// outcome authority plugs in behind the same signature.
pub trait OutcomeSource: Send + Sync {
    fn generate(&self, reel_count: usize, rows_per_reel: usize) -> SymbolGrid;
}

/// Draw one symbol by weight.
///
/// `u` is uniform in `[0, total_weight)`; weights are subtracted in
/// registration order and the first symbol that takes the remainder to
/// `<= 0` wins. Rounding that leaves nothing selected falls back to the
/// first registered symbol.
pub fn draw_symbol<R: Rng + ?Sized>(registry: &SymbolRegistry, rng: &mut R) -> SymbolId {
    let total = registry.total_weight();
    let mut remainder = rng.random::<f64>() * total;
    for symbol in registry.symbols() {
        remainder -= symbol.weight;
        if remainder <= 0.0 {
            return symbol.id.clone();
        }
    }
    registry.first().id.clone()
}

/// Fill a `reel_count × rows_per_reel` grid with independent weighted draws
pub fn generate_grid<R: Rng + ?Sized>(
    registry: &SymbolRegistry,
    rng: &mut R,
    reel_count: usize,
    rows_per_reel: usize,
) -> SymbolGrid {
    let reels = (0..reel_count)
        .map(|_| {
            (0..rows_per_reel)
                .map(|_| draw_symbol(registry, rng))
                .collect()
        })
        .collect();
    SymbolGrid::new(reels)
}

/// Local weighted outcome generator
///
/// Holds its RNG behind a mutex so one instance can be shared by reference
/// between the coordinator and anything else that needs a draw.
pub struct WeightedOutcomeGenerator {
    registry: Arc<SymbolRegistry>,
    rng: Mutex<ChaCha8Rng>,
}

impl WeightedOutcomeGenerator {
    /// Generator seeded from the OS entropy source
    pub fn new(registry: Arc<SymbolRegistry>) -> Self {
        Self {
            registry,
            rng: Mutex::new(ChaCha8Rng::from_os_rng()),
        }
    }

    /// Reproducible generator
    pub fn with_seed(registry: Arc<SymbolRegistry>, seed: u64) -> Self {
        Self {
            registry,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Reseed in place
    pub fn seed(&self, seed: u64) {
        *self.rng.lock() = ChaCha8Rng::seed_from_u64(seed);
    }

    pub fn registry(&self) -> &Arc<SymbolRegistry> {
        &self.registry
    }
}

impl OutcomeSource for WeightedOutcomeGenerator {
    fn generate(&self, reel_count: usize, rows_per_reel: usize) -> SymbolGrid {
        let mut rng = self.rng.lock();
        generate_grid(&self.registry, &mut *rng, reel_count, rows_per_reel)
    }
}

/// Replays fixed grids in order, cycling; used for scripted sessions and tests
pub struct ScriptedOutcomeSource {
    grids: Vec<SymbolGrid>,
    cursor: Mutex<usize>,
}

impl ScriptedOutcomeSource {
    pub fn new(grids: Vec<SymbolGrid>) -> Self {
        Self {
            grids,
            cursor: Mutex::new(0),
        }
    }
}

impl OutcomeSource for ScriptedOutcomeSource {
    fn generate(&self, reel_count: usize, rows_per_reel: usize) -> SymbolGrid {
        if self.grids.is_empty() {
            return SymbolGrid::default();
        }
        let mut cursor = self.cursor.lock();
        let grid = self.grids[*cursor % self.grids.len()].clone();
        *cursor += 1;
        if grid.reel_count() != reel_count || grid.rows_per_reel() != rows_per_reel {
            log::warn!(
                "Scripted grid is {}x{}, caller asked for {}x{}",
                grid.reel_count(),
                grid.rows_per_reel(),
                reel_count,
                rows_per_reel
            );
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolDefinition;

    /// Yields a fixed value for every `random::<f64>()` call
    struct FixedRng(u64);

    impl RngCore for FixedRng {
        fn next_u32(&mut self) -> u32 {
            (self.0 >> 32) as u32
        }

        fn next_u64(&mut self) -> u64 {
            self.0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            for (i, b) in dst.iter_mut().enumerate() {
                *b = self.0.to_le_bytes()[i % 8];
            }
        }
    }

    fn two_symbol_registry() -> SymbolRegistry {
        SymbolRegistry::new(vec![
            SymbolDefinition::regular("a", 1.0, &[1.0]),
            SymbolDefinition::regular("b", 3.0, &[1.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_generate_shape_and_ids() {
        let registry = Arc::new(SymbolRegistry::farm());
        let generator = WeightedOutcomeGenerator::with_seed(registry.clone(), 7);

        for (reels, rows) in [(5, 3), (3, 3), (1, 1), (6, 4)] {
            let grid = generator.generate(reels, rows);
            assert_eq!(grid.reel_count(), reels);
            assert!(grid.reels().iter().all(|reel| reel.len() == rows));
            assert!(grid.reels().iter().flatten().all(|id| registry.contains(id)));
        }
    }

    #[test]
    fn test_generate_zero_shape() {
        let generator = WeightedOutcomeGenerator::with_seed(Arc::new(SymbolRegistry::farm()), 1);
        assert_eq!(generator.generate(0, 3).reel_count(), 0);
        assert!(generator.generate(5, 0).is_empty());
    }

    #[test]
    fn test_seed_is_reproducible() {
        let registry = Arc::new(SymbolRegistry::farm());
        let a = WeightedOutcomeGenerator::with_seed(registry.clone(), 42);
        let b = WeightedOutcomeGenerator::with_seed(registry, 42);
        assert_eq!(a.generate(5, 3), b.generate(5, 3));
    }

    #[test]
    fn test_draw_low_u_picks_first() {
        let registry = two_symbol_registry();
        let mut rng = FixedRng(0);
        assert_eq!(draw_symbol(&registry, &mut rng), "a");
    }

    #[test]
    fn test_draw_high_u_picks_last() {
        let registry = two_symbol_registry();
        let mut rng = FixedRng(u64::MAX);
        assert_eq!(draw_symbol(&registry, &mut rng), "b");
    }

    #[test]
    fn test_draw_follows_weights() {
        let registry = two_symbol_registry();
        let mut rng = StdRng::seed_from_u64(99);
        let draws = 20_000;
        let b_count = (0..draws)
            .filter(|_| draw_symbol(&registry, &mut rng) == "b")
            .count();
        let ratio = b_count as f64 / draws as f64;
        assert!((ratio - 0.75).abs() < 0.02, "ratio {ratio}");
    }

    #[test]
    fn test_scripted_source_cycles() {
        let g1 = SymbolGrid::from_ids([["a"]]);
        let g2 = SymbolGrid::from_ids([["b"]]);
        let source = ScriptedOutcomeSource::new(vec![g1.clone(), g2.clone()]);
        assert_eq!(source.generate(1, 1), g1);
        assert_eq!(source.generate(1, 1), g2);
        assert_eq!(source.generate(1, 1), g1);
    }
}
