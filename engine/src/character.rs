use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::content::{GameData, Rarity};
use crate::life;
use crate::quests::ActiveQuest;
use crate::rating::{self, Rank};

/// Lowest value a rolled stat can take.
pub const STAT_MIN: i32 = 20;
/// Highest value a rolled stat can take.
pub const STAT_MAX: i32 = 100;
/// Trained stats never exceed this; the excess becomes floating points.
pub const STAT_CAP: i32 = 90;
/// Rolled stats at or above this are "exceptional"; at most one per character.
pub const EXCEPTIONAL_STAT: i32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stat {
    Strength,
    Intelligence,
    Speed,
    Durability,
    #[serde(rename = "Combat Skill", alias = "CombatSkill")]
    CombatSkill,
}

impl Stat {
    /// Roll order.
    pub const ALL: [Stat; 5] = [
        Stat::Strength,
        Stat::Intelligence,
        Stat::Speed,
        Stat::Durability,
        Stat::CombatSkill,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stat::Strength => "Strength",
            Stat::Intelligence => "Intelligence",
            Stat::Speed => "Speed",
            Stat::Durability => "Durability",
            Stat::CombatSkill => "Combat Skill",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Stat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s.chars().filter(|c| !c.is_whitespace() && *c != '_').collect();
        match key.to_lowercase().as_str() {
            "strength" | "str" => Ok(Stat::Strength),
            "intelligence" | "int" => Ok(Stat::Intelligence),
            "speed" | "spd" => Ok(Stat::Speed),
            "durability" | "dur" => Ok(Stat::Durability),
            "combatskill" | "cs" => Ok(Stat::CombatSkill),
            _ => Err(format!("unknown stat '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub strength: i32,
    pub intelligence: i32,
    pub speed: i32,
    pub durability: i32,
    pub combat_skill: i32,
}

impl Stats {
    pub fn new(strength: i32, intelligence: i32, speed: i32, durability: i32, combat_skill: i32) -> Self {
        Self { strength, intelligence, speed, durability, combat_skill }
    }

    pub fn uniform(value: i32) -> Self {
        Self::new(value, value, value, value, value)
    }

    pub fn get(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Strength => self.strength,
            Stat::Intelligence => self.intelligence,
            Stat::Speed => self.speed,
            Stat::Durability => self.durability,
            Stat::CombatSkill => self.combat_skill,
        }
    }

    pub fn get_mut(&mut self, stat: Stat) -> &mut i32 {
        match stat {
            Stat::Strength => &mut self.strength,
            Stat::Intelligence => &mut self.intelligence,
            Stat::Speed => &mut self.speed,
            Stat::Durability => &mut self.durability,
            Stat::CombatSkill => &mut self.combat_skill,
        }
    }

    pub fn set(&mut self, stat: Stat, value: i32) {
        *self.get_mut(stat) = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stat, i32)> + '_ {
        Stat::ALL.into_iter().map(move |s| (s, self.get(s)))
    }

    pub fn total(&self) -> i32 {
        self.iter().map(|(_, v)| v).sum()
    }

    pub fn count_exceptional(&self) -> usize {
        self.iter().filter(|(_, v)| *v >= EXCEPTIONAL_STAT).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponLoadout {
    pub weapon_type: String,
    pub grade: String,
    pub mastery: String,
}

/// The rolled attributes that feed the Nexus Rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub race: String,
    pub ability: String,
    pub stats: Stats,
    #[serde(default)]
    pub weapon: Option<WeaponLoadout>,
    #[serde(default)]
    pub special_ability: Option<String>,
    #[serde(default)]
    pub fatal_flaw: Option<String>,
}

impl CharacterSheet {
    /// Unarmed, no special ability, no flaw.
    pub fn plain(race: impl Into<String>, ability: impl Into<String>, stats: Stats) -> Self {
        Self {
            race: race.into(),
            ability: ability.into(),
            stats,
            weapon: None,
            special_ability: None,
            fatal_flaw: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    pub item_type: String,
    pub rarity: Rarity,
    pub quantity: u32,
    #[serde(default)]
    pub stackable: bool,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub stat_bonus: IndexMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_damage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<u32>,
}

/// A persistent character. Sheet, rating and rank only change together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    name: String,
    sheet: CharacterSheet,
    nexus_rating: f64,
    nexus_rank: Rank,
    pub xp: u32,
    pub level: u32,
    pub floating_stat_points: u32,
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
    #[serde(default)]
    pub active_quest: Option<ActiveQuest>,
}

impl Character {
    /// A fresh level 1 character, rated against `data`.
    pub fn new(name: impl Into<String>, sheet: CharacterSheet, data: &GameData) -> Self {
        let (nexus_rating, nexus_rank) = rating::calculate_rating(&sheet, data);
        Self {
            name: name.into(),
            sheet,
            nexus_rating,
            nexus_rank,
            xp: 0,
            level: 1,
            floating_stat_points: 0,
            inventory: Vec::new(),
            active_quest: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sheet(&self) -> &CharacterSheet {
        &self.sheet
    }

    pub fn stats(&self) -> &Stats {
        &self.sheet.stats
    }

    pub fn nexus_rating(&self) -> f64 {
        self.nexus_rating
    }

    pub fn nexus_rank(&self) -> Rank {
        self.nexus_rank
    }

    pub fn is_armed(&self) -> bool {
        self.sheet.weapon.is_some()
    }

    pub fn max_hp(&self) -> i32 {
        life::max_hp(self.sheet.stats.durability)
    }

    /// Mutate the sheet and recompute rating and rank.
    pub fn update_sheet<R>(&mut self, data: &GameData, f: impl FnOnce(&mut CharacterSheet) -> R) -> R {
        let result = f(&mut self.sheet);
        self.rerate(data);
        result
    }

    /// Recompute rating and rank from the current sheet.
    pub fn rerate(&mut self, data: &GameData) {
        let (rating, rank) = rating::calculate_rating(&self.sheet, data);
        self.nexus_rating = rating;
        self.nexus_rank = rank;
    }

    pub fn item_quantity(&self, name: &str) -> u32 {
        self.inventory
            .iter()
            .filter(|i| i.name == name)
            .map(|i| i.quantity)
            .sum()
    }
}
