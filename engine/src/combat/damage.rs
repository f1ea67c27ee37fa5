use crate::Dice;
use crate::character::Stats;
use crate::content::{FlawEffect, WeaponMastery, WeaponType};

pub const BASE_DODGE: f64 = 5.0;

/// `strength / 5` plus weapon base damage, mastery bonus and ability power.
pub fn physical_base(
    attacker: &Stats,
    weapon: Option<&WeaponType>,
    mastery: Option<&WeaponMastery>,
    ability_power: i32,
) -> f64 {
    let weapon_damage = weapon.map(|w| w.base_damage).unwrap_or(0);
    let mastery_damage = mastery.map(|m| m.damage_bonus).unwrap_or(0);
    attacker.strength as f64 / 5.0 + (weapon_damage + mastery_damage + ability_power) as f64
}

/// `intelligence / 5 + power`.
pub fn magical_base(attacker: &Stats, power: i32) -> f64 {
    attacker.intelligence as f64 / 5.0 + power as f64
}

/// What the defender brings to a hit.
#[derive(Debug, Clone, Copy)]
pub struct Defense<'a> {
    pub stats: &'a Stats,
    pub defending: bool,
    /// Product of `(1 - reduction)` over damage-reduction buffs.
    pub reduction_factor: f64,
    pub flaw: Option<&'a FlawEffect>,
}

/// Mitigate `base` and round; never below 1.
///
/// `attack_type` is the element (or damage kind) matched against the
/// defender flaw's `applies_to_type`. `outgoing_factor` is the attacker's
/// damage boost.
pub fn final_damage(base: f64, attack_type: &str, defense: &Defense<'_>, outgoing_factor: f64) -> i32 {
    let d = defense.stats;
    let mut dmg = base * (1.0 - d.durability as f64 / 200.0);
    if defense.defending {
        let guard = (d.durability + d.speed + d.combat_skill) as f64 / 400.0;
        dmg *= 1.0 - guard;
    }
    dmg *= defense.reduction_factor;
    let flaw_boost = defense
        .flaw
        .filter(|f| f.applies_to_type.as_deref() == Some(attack_type))
        .and_then(|f| f.opponent_damage_boost);
    if let Some(boost) = flaw_boost {
        dmg *= 1.0 + boost;
    }
    dmg *= outgoing_factor;
    (dmg.round() as i32).max(1)
}

/// Dodge chance in percent, clamped to `[0, 100]`.
pub fn dodge_chance(
    attacker: &Stats,
    defender: &Stats,
    attacker_mastery: Option<&WeaponMastery>,
    dodge_bonus: f64,
) -> f64 {
    let agility = ((defender.speed - attacker.speed) as f64 / 10.0).max(0.0);
    let penalty = attacker_mastery.map(|m| m.dodge_penalty).unwrap_or(0.0);
    let chance = BASE_DODGE + agility - penalty + dodge_bonus * 100.0;
    if chance.is_nan() {
        return 0.0;
    }
    chance.clamp(0.0, 100.0)
}

/// `d100 <= chance`.
pub fn roll_dodge(dice: &mut Dice, chance: f64) -> bool {
    dice.int(1, 100) as f64 <= chance
}
