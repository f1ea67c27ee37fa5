use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::character::{InventoryItem, Stat};
use crate::quests::QuestTemplate;
use crate::{Weighted, WeightedOption};

const RACES_JSON: &str = include_str!("../content/races.json");
const WEAPONS_JSON: &str = include_str!("../content/weapons.json");
const SPECIAL_ABILITIES_JSON: &str = include_str!("../content/special_abilities.json");
const FATAL_FLAWS_JSON: &str = include_str!("../content/fatal_flaws.json");
const PROGRESSION_JSON: &str = include_str!("../content/progression.json");
const ITEMS_JSON: &str = include_str!("../content/items.json");
const QUESTS_JSON: &str = include_str!("../content/quests.json");

/// Name of the catalog flaw that carries no penalty.
pub const NO_FLAW: &str = "None";
/// Ability rolled for a race with no ability list.
pub const NO_ABILITY: &str = "No Ability";
/// Item category whose entries grant floating stat points.
pub const STAT_POINT_ITEM: &str = "stat_point_item";

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to parse {file}: {source}")]
    Json {
        file: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse content JSON: {0}")]
    CustomJson(#[from] serde_json::Error),
    #[error("failed to parse content YAML: {0}")]
    CustomYaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Race {
    pub name: String,
    pub weight: f64,
    pub rarity: f64,
}

impl Weighted for Race {
    fn name(&self) -> &str {
        &self.name
    }
    fn weight(&self) -> f64 {
        self.weight
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageKind {
    Physical,
    Magical,
}

impl DamageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DamageKind::Physical => "physical",
            DamageKind::Magical => "magical",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponType {
    pub name: String,
    pub weight: f64,
    pub base_damage: i32,
    pub kind: DamageKind,
}

impl Weighted for WeaponType {
    fn name(&self) -> &str {
        &self.name
    }
    fn weight(&self) -> f64 {
        self.weight
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponMastery {
    pub name: String,
    pub weight: f64,
    pub nexus_bonus: f64,
    pub dodge_penalty: f64,
    pub damage_bonus: i32,
}

impl Weighted for WeaponMastery {
    fn name(&self) -> &str {
        &self.name
    }
    fn weight(&self) -> f64 {
        self.weight
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    Magical,
    Physical,
    Healing,
    Utility,
    Defensive,
}

/// Optional payload an ability applies after its main effect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbilityEffect {
    #[serde(default)]
    pub skip_opponent_turns: Option<u32>,
    #[serde(default)]
    pub temp_str_boost: Option<i32>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub revive: bool,
    #[serde(default)]
    pub hp_restore: Option<f64>,
    #[serde(default)]
    pub self_damage: Option<i32>,
    #[serde(default)]
    pub damage_boost: Option<f64>,
    #[serde(default)]
    pub damage_reduction: Option<f64>,
    #[serde(default)]
    pub high_dodge_chance: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialAbility {
    pub name: String,
    pub weight: u32,
    pub power: i32,
    pub cooldown: u32,
    /// `None` means unlimited uses per match.
    pub uses_per_match: Option<u32>,
    pub kind: AbilityKind,
    #[serde(default)]
    pub element: Option<String>,
    #[serde(default)]
    pub effect: Option<AbilityEffect>,
}

impl Weighted for SpecialAbility {
    fn name(&self) -> &str {
        &self.name
    }
    fn weight(&self) -> f64 {
        self.weight as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlawEffect {
    #[serde(default)]
    pub self_damage_chance: Option<f64>,
    #[serde(default)]
    pub self_damage_amount: Option<i32>,
    #[serde(default)]
    pub forced_attack_chance: Option<f64>,
    #[serde(default)]
    pub opponent_damage_boost: Option<f64>,
    #[serde(default)]
    pub applies_to_type: Option<String>,
    #[serde(default)]
    pub ability_fail_chance: Option<f64>,
    #[serde(default)]
    pub stat_penalty: IndexMap<Stat, i32>,
    /// `-1` marks a penalty that lasts the whole battle.
    #[serde(default)]
    pub duration: Option<i32>,
}

impl FlawEffect {
    pub fn is_permanent(&self) -> bool {
        self.duration == Some(-1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FatalFlaw {
    pub name: String,
    #[serde(default)]
    pub combat_effect: Option<FlawEffect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    /// Weight of this rarity in the loot table.
    pub fn reward_weight(self) -> f64 {
        match self {
            Rarity::Common => 50.0,
            Rarity::Uncommon => 30.0,
            Rarity::Rare => 15.0,
            Rarity::Epic => 4.0,
            Rarity::Legendary => 0.9,
            Rarity::Mythic => 0.1,
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    pub rarity: Rarity,
    #[serde(default)]
    pub stat_bonus: IndexMap<String, f64>,
    #[serde(default)]
    pub stackable: bool,
    #[serde(default)]
    pub base_damage: Option<u32>,
    #[serde(default)]
    pub effect: Option<String>,
    #[serde(default)]
    pub uses: Option<u32>,
    #[serde(default)]
    pub value: Option<u32>,
}

impl CatalogItem {
    pub fn to_inventory_item(&self, category: &str) -> InventoryItem {
        InventoryItem {
            name: self.name.clone(),
            item_type: category.to_string(),
            rarity: self.rarity,
            quantity: 1,
            stackable: self.stackable,
            stat_bonus: self.stat_bonus.clone(),
            effect: self.effect.clone(),
            value: self.value,
            base_damage: self.base_damage,
            uses: self.uses,
        }
    }
}

/// Every static table the engine reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameData {
    pub races: Vec<Race>,
    pub racial_abilities: IndexMap<String, Vec<String>>,
    pub weapon_gate: Vec<WeightedOption>,
    pub weapon_types: Vec<WeaponType>,
    pub weapon_grades: Vec<WeightedOption>,
    pub weapon_masteries: Vec<WeaponMastery>,
    pub ability_gate: Vec<WeightedOption>,
    pub special_abilities: Vec<SpecialAbility>,
    /// Catalog weight of a special ability mapped to its rating bonus.
    pub ability_rating_bonus: IndexMap<u32, f64>,
    pub fatal_flaws: Vec<FatalFlaw>,
    /// XP needed to leave each level.
    pub level_thresholds: IndexMap<u32, u32>,
    /// Item catalog keyed by item type.
    pub items: IndexMap<String, Vec<CatalogItem>>,
    pub quests: Vec<QuestTemplate>,
}

#[derive(Deserialize)]
struct RacesFile {
    races: Vec<Race>,
    abilities: IndexMap<String, Vec<String>>,
}

#[derive(Deserialize)]
struct WeaponsFile {
    gate: Vec<WeightedOption>,
    types: Vec<WeaponType>,
    grades: Vec<WeightedOption>,
    masteries: Vec<WeaponMastery>,
}

#[derive(Deserialize)]
struct SpecialAbilitiesFile {
    gate: Vec<WeightedOption>,
    rating_bonus_by_weight: IndexMap<u32, f64>,
    abilities: Vec<SpecialAbility>,
}

#[derive(Deserialize)]
struct ProgressionFile {
    level_thresholds: IndexMap<u32, u32>,
}

fn parse<T: serde::de::DeserializeOwned>(file: &'static str, text: &str) -> Result<T, ContentError> {
    serde_json::from_str(text).map_err(|source| ContentError::Json { file, source })
}

impl GameData {
    /// Parse the tables embedded in the crate.
    pub fn parse_builtin() -> Result<Self, ContentError> {
        let races: RacesFile = parse("races.json", RACES_JSON)?;
        let weapons: WeaponsFile = parse("weapons.json", WEAPONS_JSON)?;
        let abilities: SpecialAbilitiesFile =
            parse("special_abilities.json", SPECIAL_ABILITIES_JSON)?;
        let fatal_flaws: Vec<FatalFlaw> = parse("fatal_flaws.json", FATAL_FLAWS_JSON)?;
        let progression: ProgressionFile = parse("progression.json", PROGRESSION_JSON)?;
        let items: IndexMap<String, Vec<CatalogItem>> = parse("items.json", ITEMS_JSON)?;
        let quests: Vec<QuestTemplate> = parse("quests.json", QUESTS_JSON)?;

        Ok(Self {
            races: races.races,
            racial_abilities: races.abilities,
            weapon_gate: weapons.gate,
            weapon_types: weapons.types,
            weapon_grades: weapons.grades,
            weapon_masteries: weapons.masteries,
            ability_gate: abilities.gate,
            special_abilities: abilities.abilities,
            ability_rating_bonus: abilities.rating_bonus_by_weight,
            fatal_flaws,
            level_thresholds: progression.level_thresholds,
            items,
            quests,
        })
    }

    /// Shared copy of the embedded tables.
    pub fn builtin() -> &'static GameData {
        static BUILTIN: OnceLock<GameData> = OnceLock::new();
        BUILTIN.get_or_init(|| Self::parse_builtin().expect("embedded content is valid JSON"))
    }

    /// Load a complete content pack (the shape produced by serializing `GameData`).
    pub fn from_json(text: &str) -> Result<Self, ContentError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ContentError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn race(&self, name: &str) -> Option<&Race> {
        self.races.iter().find(|r| r.name == name)
    }

    pub fn racial_abilities(&self, race: &str) -> &[String] {
        self.racial_abilities
            .get(race)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn weapon_type(&self, name: &str) -> Option<&WeaponType> {
        self.weapon_types.iter().find(|w| w.name == name)
    }

    pub fn mastery(&self, name: &str) -> Option<&WeaponMastery> {
        self.weapon_masteries.iter().find(|m| m.name == name)
    }

    pub fn special_ability(&self, name: &str) -> Option<&SpecialAbility> {
        self.special_abilities.iter().find(|a| a.name == name)
    }

    pub fn fatal_flaw(&self, name: &str) -> Option<&FatalFlaw> {
        self.fatal_flaws.iter().find(|f| f.name == name)
    }

    pub fn level_threshold(&self, level: u32) -> Option<u32> {
        self.level_thresholds.get(&level).copied()
    }

    /// Every catalog item with its category.
    pub fn catalog(&self) -> impl Iterator<Item = (&str, &CatalogItem)> + '_ {
        self.items
            .iter()
            .flat_map(|(category, items)| items.iter().map(move |i| (category.as_str(), i)))
    }

    pub fn quest(&self, name: &str) -> Option<&QuestTemplate> {
        self.quests.iter().find(|q| q.name == name)
    }
}
