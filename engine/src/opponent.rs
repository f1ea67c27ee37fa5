use tracing::info;

use crate::character::{Character, CharacterSheet, STAT_MAX, STAT_MIN, WeaponLoadout};
use crate::combat::{CombatError, CombatParticipant};
use crate::content::{GameData, NO_ABILITY, NO_FLAW, Race};
use crate::generation::{draw_named, pick_uniform, roll_gate, roll_stats};
use crate::rating::Rank;
use crate::{Dice, weighted_choice};

/// Races within this distance of the target rating are preferred.
pub const RACE_RARITY_WINDOW: f64 = 25.0;
/// Each stat rolls within this distance of the base target.
pub const STAT_SPREAD: i32 = 10;

/// The rank's threshold shifted by a difficulty offset in `[-10, 5]`, clamped to `[0, 100]`.
pub fn target_rating(rank: Rank, dice: &mut Dice) -> f64 {
    let offset = dice.int(-10, 5);
    (rank.threshold() + offset as f64).clamp(0.0, 100.0)
}

/// Integer bounds for the base stat target at `target`.
pub fn base_stat_bounds(target: f64) -> (i32, i32) {
    let lo = (STAT_MIN as f64).max((target * 0.45).ceil()) as i32;
    let hi = (STAT_MAX as f64).min((target * 0.75).floor()) as i32;
    (lo, hi.max(lo))
}

fn pick_race<'a>(dice: &mut Dice, data: &'a GameData, target: f64) -> Option<&'a Race> {
    let eligible: Vec<Race> = data
        .races
        .iter()
        .filter(|r| (r.rarity - target).abs() < RACE_RARITY_WINDOW)
        .cloned()
        .collect();
    let name = if eligible.is_empty() {
        weighted_choice(dice, &data.races)?.name.clone()
    } else {
        weighted_choice(dice, &eligible)?.name.clone()
    };
    data.race(&name)
}

/// Build an opposing character scaled to the player's rank.
pub fn synthesize_character(player_rank: Rank, dice: &mut Dice, data: &GameData) -> Character {
    let target = target_rating(player_rank, dice);

    let race = pick_race(dice, data, target)
        .map(|r| r.name.clone())
        .unwrap_or_default();
    let ability = pick_uniform(dice, data.racial_abilities(&race))
        .unwrap_or(NO_ABILITY)
        .to_string();

    let (lo, hi) = base_stat_bounds(target);
    let base = dice.int(lo, hi);
    let stat_lo = STAT_MIN.max(base - STAT_SPREAD);
    let stat_hi = STAT_MAX.min(base + STAT_SPREAD);
    let stats = roll_stats(dice, |d| d.int(stat_lo, stat_hi));

    let weapon = if roll_gate(dice, &data.weapon_gate).unwrap_or(false) {
        let weapon_type = draw_named(dice, &data.weapon_types, "weapon types");
        let grade = draw_named(dice, &data.weapon_grades, "weapon grades");
        let mastery = draw_named(dice, &data.weapon_masteries, "weapon masteries");
        match (weapon_type, grade, mastery) {
            (Some(weapon_type), Some(grade), Some(mastery)) => Some(WeaponLoadout {
                weapon_type,
                grade,
                mastery,
            }),
            _ => None,
        }
    } else {
        None
    };

    let special_ability = if roll_gate(dice, &data.ability_gate).unwrap_or(false) {
        draw_named(dice, &data.special_abilities, "special abilities")
    } else {
        None
    };

    let flaw_names: Vec<&str> = data.fatal_flaws.iter().map(|f| f.name.as_str()).collect();
    let fatal_flaw = pick_uniform(dice, &flaw_names)
        .filter(|f| *f != NO_FLAW)
        .map(str::to_string);

    let name = format!("AI - {} {}", race, dice.int(100, 999));
    let sheet = CharacterSheet {
        race,
        ability,
        stats,
        weapon,
        special_ability,
        fatal_flaw,
    };
    let character = Character::new(name, sheet, data);
    info!(
        name = character.name(),
        target,
        rating = character.nexus_rating(),
        rank = %character.nexus_rank(),
        "opponent synthesized"
    );
    character
}

/// [`synthesize_character`] wrapped as a fresh combat participant.
pub fn synthesize_opponent(
    player_rank: Rank,
    dice: &mut Dice,
    data: &GameData,
) -> Result<CombatParticipant, CombatError> {
    CombatParticipant::new(synthesize_character(player_rank, dice, data), data)
}
