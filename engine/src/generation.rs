use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::character::{Character, CharacterSheet, EXCEPTIONAL_STAT, STAT_MAX, STAT_MIN, Stat, Stats, WeaponLoadout};
use crate::content::{GameData, NO_ABILITY, NO_FLAW};
use crate::events::EngineEvent;
use crate::{Dice, Weighted, WeightedOption, weighted_choice_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStep {
    Race,
    Ability,
    Stats,
    WeaponGate,
    WeaponType,
    WeaponGrade,
    WeaponMastery,
    SpecialAbilityGate,
    SpecialAbility,
    FatalFlaw,
}

impl GenerationStep {
    pub const ORDER: [GenerationStep; 10] = [
        GenerationStep::Race,
        GenerationStep::Ability,
        GenerationStep::Stats,
        GenerationStep::WeaponGate,
        GenerationStep::WeaponType,
        GenerationStep::WeaponGrade,
        GenerationStep::WeaponMastery,
        GenerationStep::SpecialAbilityGate,
        GenerationStep::SpecialAbility,
        GenerationStep::FatalFlaw,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GenerationStep::Race => "Race",
            GenerationStep::Ability => "Ability",
            GenerationStep::Stats => "Stats",
            GenerationStep::WeaponGate => "Weapon Yes/No",
            GenerationStep::WeaponType => "Weapon Type",
            GenerationStep::WeaponGrade => "Weapon Grade",
            GenerationStep::WeaponMastery => "Weapon Mastery",
            GenerationStep::SpecialAbilityGate => "Special Ability Yes/No",
            GenerationStep::SpecialAbility => "Special Ability",
            GenerationStep::FatalFlaw => "Fatal Flaw",
        }
    }
}

impl fmt::Display for GenerationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Rolled(String),
    Stats(Stats),
    /// Gated off by a "No"; the field stays empty.
    Skipped,
    /// The option table was empty.
    NoOption,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: GenerationStep,
    pub outcome: StepOutcome,
}

impl StepReport {
    pub fn event(&self) -> EngineEvent {
        EngineEvent::StepResolved {
            step: self.step,
            outcome: self.outcome.clone(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GenerationError {
    #[error("generation is not finished; next step is {next}")]
    Incomplete { next: GenerationStep },
}

/// Roll five stats in order with `draw`. The first value at or above 90
/// stands; any later one is re-rolled into `[20, 89]`.
pub fn roll_stats(dice: &mut Dice, mut draw: impl FnMut(&mut Dice) -> i32) -> Stats {
    let mut stats = Stats::default();
    let mut exceptional_taken = false;
    for stat in Stat::ALL {
        let mut value = draw(dice);
        if value >= EXCEPTIONAL_STAT {
            if exceptional_taken {
                value = dice.int(STAT_MIN, EXCEPTIONAL_STAT - 1);
            } else {
                exceptional_taken = true;
            }
        }
        stats.set(stat, value);
    }
    stats
}

/// `Some(true)` for "Yes", `Some(false)` for anything else, `None` for an empty table.
pub(crate) fn roll_gate(dice: &mut Dice, gate: &[WeightedOption]) -> Option<bool> {
    weighted_choice_name(dice, gate).map(|answer| answer == "Yes")
}

pub(crate) fn draw_named<T: Weighted>(dice: &mut Dice, options: &[T], what: &str) -> Option<String> {
    let picked = weighted_choice_name(dice, options);
    if picked.is_none() {
        warn!(table = what, "no options to draw from");
    }
    picked
}

/// Uniform pick by index.
pub(crate) fn pick_uniform<'a, S: AsRef<str>>(dice: &mut Dice, names: &'a [S]) -> Option<&'a str> {
    if names.is_empty() {
        return None;
    }
    let idx = dice.int(0, names.len() as i32 - 1) as usize;
    names.get(idx).map(|s| s.as_ref())
}

/// The step machine that rolls a new character one attribute at a time.
#[derive(Debug, Clone)]
pub struct CharacterGenerator {
    name: String,
    next: usize,
    race: Option<String>,
    ability: Option<String>,
    stats: Stats,
    has_weapon: bool,
    weapon_type: Option<String>,
    weapon_grade: Option<String>,
    weapon_mastery: Option<String>,
    has_special_ability: bool,
    special_ability: Option<String>,
    fatal_flaw: Option<String>,
}

impl CharacterGenerator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next: 0,
            race: None,
            ability: None,
            stats: Stats::default(),
            has_weapon: false,
            weapon_type: None,
            weapon_grade: None,
            weapon_mastery: None,
            has_special_ability: false,
            special_ability: None,
            fatal_flaw: None,
        }
    }

    pub fn current_step(&self) -> Option<GenerationStep> {
        GenerationStep::ORDER.get(self.next).copied()
    }

    pub fn is_complete(&self) -> bool {
        self.next >= GenerationStep::ORDER.len()
    }

    /// Roll the next step. `None` once all ten steps are done.
    pub fn roll_next(&mut self, dice: &mut Dice, data: &GameData) -> Option<StepReport> {
        let step = self.current_step()?;
        let outcome = match step {
            GenerationStep::Race => {
                self.race = draw_named(dice, &data.races, "races");
                rolled(&self.race)
            }
            GenerationStep::Ability => {
                let race = self.race.as_deref().unwrap_or_default();
                let options = racial_ability_options(data, race);
                self.ability = draw_named(dice, &options, "racial abilities");
                rolled(&self.ability)
            }
            GenerationStep::Stats => {
                self.stats = roll_stats(dice, |d| d.int(STAT_MIN, STAT_MAX));
                StepOutcome::Stats(self.stats)
            }
            GenerationStep::WeaponGate => match roll_gate(dice, &data.weapon_gate) {
                Some(yes) => {
                    self.has_weapon = yes;
                    StepOutcome::Rolled(yes_no(yes))
                }
                None => StepOutcome::NoOption,
            },
            GenerationStep::WeaponType => self.gated(self.has_weapon, |g| {
                g.weapon_type = draw_named(dice, &data.weapon_types, "weapon types");
                rolled(&g.weapon_type)
            }),
            GenerationStep::WeaponGrade => self.gated(self.has_weapon, |g| {
                g.weapon_grade = draw_named(dice, &data.weapon_grades, "weapon grades");
                rolled(&g.weapon_grade)
            }),
            GenerationStep::WeaponMastery => self.gated(self.has_weapon, |g| {
                g.weapon_mastery = draw_named(dice, &data.weapon_masteries, "weapon masteries");
                rolled(&g.weapon_mastery)
            }),
            GenerationStep::SpecialAbilityGate => match roll_gate(dice, &data.ability_gate) {
                Some(yes) => {
                    self.has_special_ability = yes;
                    StepOutcome::Rolled(yes_no(yes))
                }
                None => StepOutcome::NoOption,
            },
            GenerationStep::SpecialAbility => self.gated(self.has_special_ability, |g| {
                g.special_ability = draw_named(dice, &data.special_abilities, "special abilities");
                rolled(&g.special_ability)
            }),
            GenerationStep::FatalFlaw => {
                let names: Vec<&str> = data.fatal_flaws.iter().map(|f| f.name.as_str()).collect();
                match pick_uniform(dice, &names) {
                    Some(flaw) => {
                        self.fatal_flaw = (flaw != NO_FLAW).then(|| flaw.to_string());
                        StepOutcome::Rolled(flaw.to_string())
                    }
                    None => StepOutcome::NoOption,
                }
            }
        };
        self.next += 1;
        debug!(character = %self.name, step = %step, ?outcome, "generation step");
        Some(StepReport { step, outcome })
    }

    fn gated(&mut self, open: bool, roll: impl FnOnce(&mut Self) -> StepOutcome) -> StepOutcome {
        if open { roll(self) } else { StepOutcome::Skipped }
    }

    /// The finished character, rated. Fails if steps remain.
    pub fn finish(self, data: &GameData) -> Result<Character, GenerationError> {
        if let Some(next) = self.current_step() {
            return Err(GenerationError::Incomplete { next });
        }
        Ok(self.assemble(data))
    }

    fn assemble(self, data: &GameData) -> Character {
        let weapon = match (self.has_weapon, self.weapon_type, self.weapon_grade, self.weapon_mastery) {
            (true, Some(weapon_type), Some(grade), Some(mastery)) => Some(WeaponLoadout {
                weapon_type,
                grade,
                mastery,
            }),
            _ => None,
        };
        let sheet = CharacterSheet {
            race: self.race.unwrap_or_default(),
            ability: self.ability.unwrap_or_else(|| NO_ABILITY.to_string()),
            stats: self.stats,
            weapon,
            special_ability: if self.has_special_ability { self.special_ability } else { None },
            fatal_flaw: self.fatal_flaw,
        };
        let character = Character::new(self.name, sheet, data);
        info!(
            name = character.name(),
            race = %character.sheet().race,
            rating = character.nexus_rating(),
            rank = %character.nexus_rank(),
            "character generated"
        );
        character
    }
}

fn rolled(value: &Option<String>) -> StepOutcome {
    match value {
        Some(v) => StepOutcome::Rolled(v.clone()),
        None => StepOutcome::NoOption,
    }
}

fn yes_no(yes: bool) -> String {
    if yes { "Yes" } else { "No" }.to_string()
}

/// A race's ability list at weight 1, or "No Ability" when it has none.
pub(crate) fn racial_ability_options(data: &GameData, race: &str) -> Vec<WeightedOption> {
    let abilities = data.racial_abilities(race);
    if abilities.is_empty() {
        vec![WeightedOption::new(NO_ABILITY, 1.0)]
    } else {
        WeightedOption::uniform(abilities)
    }
}

/// Run all ten steps in one go.
pub fn generate_character(
    name: impl Into<String>,
    dice: &mut Dice,
    data: &GameData,
) -> (Character, Vec<StepReport>) {
    let mut generator = CharacterGenerator::new(name);
    let mut reports = Vec::with_capacity(GenerationStep::ORDER.len());
    while let Some(report) = generator.roll_next(dice, data) {
        reports.push(report);
    }
    (generator.assemble(data), reports)
}
