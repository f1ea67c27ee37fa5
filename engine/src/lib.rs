pub mod api;
pub mod character;
pub mod combat;
pub mod content;
pub mod events;
pub mod generation;
pub mod life;
pub mod opponent;
pub mod persist;
pub mod progression;
pub mod quests;
pub mod rating;

pub use api::{ApiError, Declined, Persisted, Roster};
pub use character::{Character, CharacterSheet, InventoryItem, Stat, Stats, WeaponLoadout};
pub use combat::{Action, CombatError, CombatParticipant, CombatSession, Side};
pub use content::{GameData, Rarity};
pub use rating::Rank;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

enum Source {
    Seeded(ChaCha8Rng),
    Scripted { draws: Vec<f64>, next: usize },
}

/// Random source shared by every roll in the engine.
///
/// Everything is derived from unit draws in `[0, 1)`, so a scripted sequence
/// reproduces exact outcomes in tests.
pub struct Dice {
    source: Source,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self { source: Source::Seeded(ChaCha8Rng::seed_from_u64(seed)) }
    }

    /// Replays `draws` in order, cycling once exhausted.
    pub fn from_scripted(draws: Vec<f64>) -> Self {
        Self { source: Source::Scripted { draws, next: 0 } }
    }

    /// The unit draw that makes `int(min, max)` return `value`.
    pub fn unit_for_int(value: i32, min: i32, max: i32) -> f64 {
        let span = (max - min + 1).max(1) as f64;
        ((value - min) as f64 + 0.5) / span
    }

    pub fn unit(&mut self) -> f64 {
        match &mut self.source {
            Source::Seeded(rng) => rng.gen_range(0.0..1.0),
            Source::Scripted { draws, next } => {
                if draws.is_empty() {
                    return 0.0;
                }
                let value = draws[*next % draws.len()];
                *next += 1;
                value.clamp(0.0, 1.0 - f64::EPSILON)
            }
        }
    }

    /// Uniform integer in `[min, max]`. Callers guarantee `min <= max`; an
    /// inverted range yields `min` without consuming a draw.
    pub fn int(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (max as i64 - min as i64 + 1) as f64;
        let offset = (self.unit() * span).floor() as i64;
        (min as i64 + offset) as i32
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }
}

/// Free-function form of [`Dice::int`].
pub fn random_int(dice: &mut Dice, min: i32, max: i32) -> i32 {
    dice.int(min, max)
}

/// Anything that can take part in a weighted draw.
pub trait Weighted {
    fn name(&self) -> &str;
    fn weight(&self) -> f64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedOption {
    pub name: String,
    pub weight: f64,
}

impl WeightedOption {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self { name: name.into(), weight }
    }

    /// Every name with weight 1.
    pub fn uniform<S: AsRef<str>>(names: &[S]) -> Vec<Self> {
        names.iter().map(|n| Self::new(n.as_ref(), 1.0)).collect()
    }
}

impl Weighted for WeightedOption {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}

/// Draw one option with probability proportional to its weight.
///
/// Scans cumulative weight in list order: the first option whose weight
/// exceeds the remaining draw wins. Returns `None` only for an empty list;
/// a zero total falls back to the first option.
pub fn weighted_choice<'a, T: Weighted>(dice: &mut Dice, options: &'a [T]) -> Option<&'a T> {
    let first = options.first()?;
    let total: f64 = options.iter().map(|o| o.weight()).sum();
    let mut remaining = dice.unit() * total;
    for option in options {
        if remaining < option.weight() {
            return Some(option);
        }
        remaining -= option.weight();
    }
    Some(first)
}

/// Name-returning form of [`weighted_choice`].
pub fn weighted_choice_name<T: Weighted>(dice: &mut Dice, options: &[T]) -> Option<String> {
    weighted_choice(dice, options).map(|o| o.name().to_string())
}
