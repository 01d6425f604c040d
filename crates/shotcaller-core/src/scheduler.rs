//! Callout scheduler: decides what to say next and when.
//!
//! Pacing is a feedback loop. After each utterance the narration engine
//! reports the measured spoken duration, and the next delay is computed
//! from it plus a difficulty-dependent breathing buffer and jitter:
//!
//! ```text
//! buffer = clamp(base * buffer_fraction, buffer_floor, buffer_ceiling)
//! jitter = base * jitter_fraction * (rand - 0.5)
//! next   = clamp(spoken + buffer + jitter, min_delay, base * cap_multiplier)
//! ```
//!
//! Harder tiers use a higher cadence and tighter buffer/cap constants,
//! which is what makes "hard" feel relentless under the same formula.
//! The constants are data, not code: callers can supply their own
//! `CadenceProfile`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::mirror::mirror_stance;
use crate::pool::TechniquePool;
use crate::settings::Difficulty;
use crate::techniques::SOUTHPAW_CATEGORY;

/// Tunable pacing constants for one difficulty tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CadenceProfile {
    /// Target callouts per minute.
    pub cadence_per_min: f64,
    /// `min_delay = base_delay * floor_multiplier`.
    pub floor_multiplier: f64,
    /// Breathing room added after each utterance, as a fraction of base.
    pub buffer_fraction: f64,
    pub buffer_floor_ms: f64,
    pub buffer_ceiling_ms: f64,
    /// Jitter amplitude as a fraction of base (centered on zero).
    pub jitter_fraction: f64,
    /// `max_delay = base_delay * cap_multiplier`.
    pub cap_multiplier: f64,
}

impl CadenceProfile {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                cadence_per_min: 13.0,
                floor_multiplier: 0.50,
                buffer_fraction: 0.35,
                buffer_floor_ms: 700.0,
                buffer_ceiling_ms: 2500.0,
                jitter_fraction: 0.30,
                cap_multiplier: 2.5,
            },
            Difficulty::Medium => Self {
                cadence_per_min: 20.0,
                floor_multiplier: 0.45,
                buffer_fraction: 0.30,
                buffer_floor_ms: 500.0,
                buffer_ceiling_ms: 2000.0,
                jitter_fraction: 0.25,
                cap_multiplier: 2.2,
            },
            Difficulty::Hard => Self {
                cadence_per_min: 33.0,
                floor_multiplier: 0.35,
                buffer_fraction: 0.22,
                buffer_floor_ms: 300.0,
                buffer_ceiling_ms: 1200.0,
                jitter_fraction: 0.20,
                cap_multiplier: 1.8,
            },
        }
    }

    pub fn base_delay_ms(&self) -> f64 {
        60_000.0 / self.cadence_per_min
    }

    pub fn min_delay_ms(&self) -> f64 {
        self.base_delay_ms() * self.floor_multiplier
    }

    pub fn max_delay_ms(&self) -> f64 {
        self.base_delay_ms() * self.cap_multiplier
    }
}

/// Picks callouts from the pool and paces them.
///
/// The scheduler holds no timer handle itself; the orchestrator owns the
/// sleep and re-checks the activation rule at fire time. This struct is the
/// authoritative mutable state the ticks query, instead of values captured
/// by closures.
#[derive(Debug)]
pub struct CalloutScheduler {
    pool: TechniquePool,
    profile: CadenceProfile,
    ordered: bool,
    southpaw: bool,
    cursor: usize,
    shots_called: u64,
}

impl CalloutScheduler {
    pub fn new(pool: TechniquePool, profile: CadenceProfile, ordered: bool, southpaw: bool) -> Self {
        Self {
            pool,
            profile,
            ordered,
            southpaw,
            cursor: 0,
            shots_called: 0,
        }
    }

    pub fn profile(&self) -> &CadenceProfile {
        &self.profile
    }

    pub fn pool(&self) -> &TechniquePool {
        &self.pool
    }

    pub fn shots_called(&self) -> u64 {
        self.shots_called
    }

    /// Draw the next phrase: an advancing cursor when ordered playback is
    /// on (deterministic replay), otherwise an independent uniform draw.
    /// Southpaw mode mirrors everything except entries authored for the
    /// mirrored stance. Returns `None` on an empty pool.
    pub fn next_callout<R: Rng>(&mut self, rng: &mut R) -> Option<String> {
        if self.pool.is_empty() {
            return None;
        }
        let index = if self.ordered {
            let i = self.cursor % self.pool.len();
            self.cursor = self.cursor.wrapping_add(1);
            i
        } else {
            rng.gen_range(0..self.pool.len())
        };
        let entry = self.pool.get(index)?;
        self.shots_called += 1;
        let text = if self.southpaw && entry.category != SOUTHPAW_CATEGORY {
            mirror_stance(&entry.text)
        } else {
            entry.text.clone()
        };
        Some(text)
    }

    /// Delay before the first callout of a round.
    pub fn initial_delay_ms(&self) -> u64 {
        2_000
    }

    /// Feedback step: given the measured duration of the utterance that
    /// just finished, compute the delay until the next one.
    pub fn next_delay_ms<R: Rng>(&self, spoken_ms: u64, rng: &mut R) -> u64 {
        let base = self.profile.base_delay_ms();
        let buffer = (base * self.profile.buffer_fraction)
            .clamp(self.profile.buffer_floor_ms, self.profile.buffer_ceiling_ms);
        let jitter = base * self.profile.jitter_fraction * (rng.gen::<f64>() - 0.5);
        let proposed = spoken_ms as f64 + buffer + jitter;
        proposed.clamp(self.profile.min_delay_ms(), self.profile.max_delay_ms()) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolBuilder;
    use crate::techniques::{builtin, TechniqueGroup, TechniqueItem, TechniqueLibrary};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn pool(categories: &[&str]) -> TechniquePool {
        let lib = builtin();
        PoolBuilder::new(&lib)
            .categories(categories.iter().copied())
            .build(&mut Pcg64::seed_from_u64(1))
    }

    fn scheduler(ordered: bool, southpaw: bool) -> CalloutScheduler {
        CalloutScheduler::new(
            pool(&["boxing"]),
            CadenceProfile::for_difficulty(Difficulty::Medium),
            ordered,
            southpaw,
        )
    }

    #[test]
    fn harder_tiers_are_tighter() {
        let easy = CadenceProfile::for_difficulty(Difficulty::Easy);
        let medium = CadenceProfile::for_difficulty(Difficulty::Medium);
        let hard = CadenceProfile::for_difficulty(Difficulty::Hard);
        assert!(easy.base_delay_ms() > medium.base_delay_ms());
        assert!(medium.base_delay_ms() > hard.base_delay_ms());
        assert!(easy.max_delay_ms() > hard.max_delay_ms());
        assert!(hard.floor_multiplier < easy.floor_multiplier);
    }

    #[test]
    fn ordered_playback_cycles_pool_in_order() {
        let mut s = scheduler(true, false);
        let mut rng = Pcg64::seed_from_u64(3);
        let len = s.pool().len();
        let first: Vec<_> = (0..len).map(|_| s.next_callout(&mut rng).unwrap()).collect();
        let second: Vec<_> = (0..len).map(|_| s.next_callout(&mut rng).unwrap()).collect();
        assert_eq!(first, second);
        assert_eq!(first[0], s.pool().get(0).unwrap().text);
        assert_eq!(s.shots_called(), 2 * len as u64);
    }

    #[test]
    fn random_draws_stay_in_pool() {
        let mut s = scheduler(false, false);
        let mut rng = Pcg64::seed_from_u64(9);
        let texts: Vec<String> = s.pool().entries().iter().map(|e| e.text.clone()).collect();
        for _ in 0..50 {
            let c = s.next_callout(&mut rng).unwrap();
            assert!(texts.contains(&c));
        }
    }

    #[test]
    fn empty_pool_yields_none() {
        let mut s = CalloutScheduler::new(
            TechniquePool::default(),
            CadenceProfile::for_difficulty(Difficulty::Easy),
            false,
            false,
        );
        assert!(s.next_callout(&mut Pcg64::seed_from_u64(0)).is_none());
        assert_eq!(s.shots_called(), 0);
    }

    #[test]
    fn southpaw_mirrors_unless_exempt() {
        let mut lib = TechniqueLibrary::new();
        lib.insert(
            "tae".into(),
            TechniqueGroup {
                singles: vec![TechniqueItem::Plain("Left kick".into())],
                combos: vec![],
            },
        );
        lib.insert(
            SOUTHPAW_CATEGORY.into(),
            TechniqueGroup {
                singles: vec![TechniqueItem::Plain("Left cross".into())],
                combos: vec![],
            },
        );
        let pool = PoolBuilder::new(&lib)
            .categories(["tae", SOUTHPAW_CATEGORY])
            .build(&mut Pcg64::seed_from_u64(0));
        let mut s = CalloutScheduler::new(
            pool,
            CadenceProfile::for_difficulty(Difficulty::Medium),
            true,
            true,
        );
        let mut rng = Pcg64::seed_from_u64(0);
        assert_eq!(s.next_callout(&mut rng).unwrap(), "Right kick");
        // Authored-for-southpaw entry passes through untouched.
        assert_eq!(s.next_callout(&mut rng).unwrap(), "Left cross");
    }

    proptest! {
        /// min <= next_delay <= cap for every difficulty and any measured
        /// duration, including pathological ones.
        #[test]
        fn delay_always_clamped(
            spoken_ms in 0u64..120_000,
            seed in any::<u64>(),
            tier in 0u8..3,
        ) {
            let difficulty = match tier {
                0 => Difficulty::Easy,
                1 => Difficulty::Medium,
                _ => Difficulty::Hard,
            };
            let s = CalloutScheduler::new(
                TechniquePool::default(),
                CadenceProfile::for_difficulty(difficulty),
                false,
                false,
            );
            let mut rng = Pcg64::seed_from_u64(seed);
            let delay = s.next_delay_ms(spoken_ms, &mut rng) as f64;
            prop_assert!(delay >= s.profile().min_delay_ms().floor());
            prop_assert!(delay <= s.profile().max_delay_ms());
        }
    }

    #[test]
    fn long_utterance_pushes_delay_toward_cap() {
        let s = scheduler(false, false);
        let mut rng = Pcg64::seed_from_u64(4);
        let short = s.next_delay_ms(200, &mut rng);
        let long = s.next_delay_ms(8_000, &mut rng);
        assert!(long > short);
        assert_eq!(long as f64, s.profile().max_delay_ms());
    }
}
