use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::character::CharacterSheet;
use crate::content::GameData;

/// Flat bonus for carrying any weapon.
pub const WEAPON_PRESENCE_BONUS: f64 = 5.0;
/// Flat penalty for any catalog flaw other than "None".
pub const FATAL_FLAW_PENALTY: f64 = 10.0;
/// The stat total is divided by this before it counts.
pub const STAT_DIVISOR: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    F,
    E,
    D,
    C,
    B,
    A,
    S,
    #[serde(rename = "SS/S+")]
    SsPlus,
}

impl Rank {
    /// Ascending by threshold.
    pub const ASCENDING: [Rank; 8] = [
        Rank::F,
        Rank::E,
        Rank::D,
        Rank::C,
        Rank::B,
        Rank::A,
        Rank::S,
        Rank::SsPlus,
    ];

    pub fn threshold(self) -> f64 {
        match self {
            Rank::F => 0.0,
            Rank::E => 40.0,
            Rank::D => 50.0,
            Rank::C => 60.0,
            Rank::B => 70.0,
            Rank::A => 80.0,
            Rank::S => 90.0,
            Rank::SsPlus => 95.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rank::F => "F",
            Rank::E => "E",
            Rank::D => "D",
            Rank::C => "C",
            Rank::B => "B",
            Rank::A => "A",
            Rank::S => "S",
            Rank::SsPlus => "SS/S+",
        }
    }

    /// Highest rank whose threshold the rating meets; F below all.
    pub fn for_rating(rating: f64) -> Rank {
        let mut rank = Rank::F;
        for candidate in Rank::ASCENDING {
            if rating >= candidate.threshold() {
                rank = candidate;
            } else {
                break;
            }
        }
        rank
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Rank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Rank::ASCENDING
            .into_iter()
            .find(|r| r.label() == wanted || (wanted == "SS" && *r == Rank::SsPlus))
            .ok_or_else(|| format!("unknown rank '{}'", s))
    }
}

/// Each additive component of a rating, in the order they apply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingBreakdown {
    pub race: f64,
    pub stats: f64,
    pub weapon: f64,
    pub mastery: f64,
    pub special_ability: f64,
    pub flaw_penalty: f64,
    pub raw_total: f64,
    pub rating: f64,
    pub rank: Rank,
}

pub fn rating_breakdown(sheet: &CharacterSheet, data: &GameData) -> RatingBreakdown {
    let race = data.race(&sheet.race).map(|r| r.rarity).unwrap_or(0.0);
    let stats = sheet.stats.total() as f64 / STAT_DIVISOR;

    let (weapon, mastery) = match &sheet.weapon {
        Some(loadout) => (
            WEAPON_PRESENCE_BONUS,
            data.mastery(&loadout.mastery).map(|m| m.nexus_bonus).unwrap_or(0.0),
        ),
        None => (0.0, 0.0),
    };

    let special_ability = sheet
        .special_ability
        .as_deref()
        .and_then(|name| data.special_ability(name))
        .and_then(|ability| data.ability_rating_bonus.get(&ability.weight).copied())
        .unwrap_or(0.0);

    let flaw_penalty = sheet
        .fatal_flaw
        .as_deref()
        .and_then(|name| data.fatal_flaw(name))
        .filter(|flaw| flaw.name != crate::content::NO_FLAW)
        .map(|_| FATAL_FLAW_PENALTY)
        .unwrap_or(0.0);

    let raw_total = race + stats + weapon + mastery + special_ability - flaw_penalty;
    let rating = round2(raw_total.clamp(0.0, 100.0));
    let rank = Rank::for_rating(rating);

    debug!(
        race = %sheet.race,
        race_score = race,
        stats_score = stats,
        weapon_score = weapon + mastery,
        ability_score = special_ability,
        flaw_penalty,
        rating,
        rank = %rank,
        "nexus rating computed"
    );

    RatingBreakdown {
        race,
        stats,
        weapon,
        mastery,
        special_ability,
        flaw_penalty,
        raw_total,
        rating,
        rank,
    }
}

/// Nexus Rating in `[0, 100]` (two decimals) and the rank it earns.
pub fn calculate_rating(sheet: &CharacterSheet, data: &GameData) -> (f64, Rank) {
    let b = rating_breakdown(sheet, data);
    (b.rating, b.rank)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
