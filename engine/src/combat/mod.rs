pub mod ai;
pub mod buffs;
pub mod damage;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::Dice;
use crate::character::{Character, Stat, Stats};
use crate::content::{
    AbilityEffect, AbilityKind, FlawEffect, GameData, SpecialAbility, WeaponMastery, WeaponType,
};
use crate::events::EngineEvent;
use crate::life::{self, Health};
use buffs::{Buff, BuffKind};
use damage::Defense;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CombatError {
    #[error("{name} cannot fight with max HP {max_hp}")]
    DegenerateParticipant { name: String, max_hp: i32 },
    #[error("combat has not started")]
    NotStarted,
    #[error("combat has already started")]
    AlreadyStarted,
    #[error("combat is over; {winner} won")]
    AlreadyEnded { winner: Side },
    #[error("{name} has no special ability")]
    NoAbility { name: String },
    #[error("{name}'s {ability} is not ready")]
    AbilityNotReady { name: String, ability: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Opponent,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Player => Side::Opponent,
            Side::Opponent => Side::Player,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Player => "player",
            Side::Opponent => "opponent",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Attack,
    Defend,
    Ability,
}

/// Per-match cooldown and remaining uses of a special ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityState {
    pub cooldown: u32,
    /// `None` is unlimited.
    pub uses_left: Option<u32>,
}

impl AbilityState {
    pub fn fresh(ability: &SpecialAbility) -> Self {
        Self { cooldown: 0, uses_left: ability.uses_per_match }
    }

    pub fn ready(&self) -> bool {
        self.cooldown == 0 && self.uses_left != Some(0)
    }

    fn spend(&mut self, ability: &SpecialAbility) {
        self.cooldown = ability.cooldown;
        if let Some(n) = &mut self.uses_left {
            *n = n.saturating_sub(1);
        }
    }

    fn tick(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }
}

/// A character's battle-scoped state. Nothing here is written back to the character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatParticipant {
    pub character: Character,
    pub health: Health,
    pub buffs: Vec<Buff>,
    pub ability_state: IndexMap<String, AbilityState>,
    /// Plain attacks resolved this battle.
    pub basic_attacks: u32,
    pub turns_taken: u32,
}

impl CombatParticipant {
    pub fn new(character: Character, data: &GameData) -> Result<Self, CombatError> {
        let max_hp = character.max_hp();
        if max_hp <= 0 {
            return Err(CombatError::DegenerateParticipant {
                name: character.name().to_string(),
                max_hp,
            });
        }
        let mut ability_state = IndexMap::new();
        let catalog_ability = character
            .sheet()
            .special_ability
            .as_deref()
            .and_then(|name| data.special_ability(name));
        if let Some(ability) = catalog_ability {
            ability_state.insert(ability.name.clone(), AbilityState::fresh(ability));
        }
        Ok(Self {
            character,
            health: Health::new(max_hp),
            buffs: Vec::new(),
            ability_state,
            basic_attacks: 0,
            turns_taken: 0,
        })
    }

    pub fn name(&self) -> &str {
        self.character.name()
    }

    pub fn effective_stats(&self) -> Stats {
        buffs::effective_stats(self.character.stats(), &self.buffs)
    }

    pub fn special_ability<'d>(&self, data: &'d GameData) -> Option<&'d SpecialAbility> {
        self.character
            .sheet()
            .special_ability
            .as_deref()
            .and_then(|name| data.special_ability(name))
    }

    pub fn ability_ready(&self, data: &GameData) -> bool {
        self.special_ability(data)
            .and_then(|a| self.ability_state.get(&a.name))
            .is_some_and(AbilityState::ready)
    }

    fn flaw<'d>(&self, data: &'d GameData) -> Option<(&'d str, &'d FlawEffect)> {
        let flaw = data.fatal_flaw(self.character.sheet().fatal_flaw.as_deref()?)?;
        flaw.combat_effect.as_ref().map(|e| (flaw.name.as_str(), e))
    }

    fn weapon<'d>(&self, data: &'d GameData) -> (Option<&'d WeaponType>, Option<&'d WeaponMastery>) {
        match &self.character.sheet().weapon {
            Some(loadout) => (
                data.weapon_type(&loadout.weapon_type),
                data.mastery(&loadout.mastery),
            ),
            None => (None, None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatPhase {
    NotStarted,
    Turn(Side),
    Ended(Side),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnResult {
    pub turn: u32,
    pub actor: Side,
    pub action: Action,
    pub log: Vec<String>,
    /// Sides brought back by a revive this turn.
    pub revived: Vec<Side>,
    /// Winner, if this turn ended the battle.
    pub ended: Option<Side>,
}

impl TurnResult {
    pub fn events(&self) -> Vec<EngineEvent> {
        let mut events: Vec<EngineEvent> = self
            .log
            .iter()
            .map(|line| EngineEvent::TurnLog {
                turn: self.turn,
                actor: self.actor,
                line: line.clone(),
            })
            .collect();
        if let Some(winner) = self.ended {
            events.push(EngineEvent::CombatEnded { winner, turns: self.turn });
        }
        events
    }
}

/// Aggregate result of a finished battle; the only thing that outlives the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatOutcome {
    pub winner: Side,
    pub turns: u32,
    pub player_hp: i32,
    pub opponent_hp: i32,
    pub opponent_race: String,
    pub player_used_basic_attack: bool,
    pub player_turns: u32,
}

/// One battle between a player and an opponent.
#[derive(Debug, Clone)]
pub struct CombatSession {
    player: CombatParticipant,
    opponent: CombatParticipant,
    phase: CombatPhase,
    turn: u32,
}

impl CombatSession {
    pub fn new(player: CombatParticipant, opponent: CombatParticipant) -> Self {
        Self { player, opponent, phase: CombatPhase::NotStarted, turn: 0 }
    }

    pub fn between(player: Character, opponent: Character, data: &GameData) -> Result<Self, CombatError> {
        Ok(Self::new(
            CombatParticipant::new(player, data)?,
            CombatParticipant::new(opponent, data)?,
        ))
    }

    pub fn phase(&self) -> CombatPhase {
        self.phase
    }

    /// Current turn number, starting at 1.
    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn current_side(&self) -> Option<Side> {
        match self.phase {
            CombatPhase::Turn(side) => Some(side),
            _ => None,
        }
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, CombatPhase::Ended(_))
    }

    pub fn participant(&self, side: Side) -> &CombatParticipant {
        match side {
            Side::Player => &self.player,
            Side::Opponent => &self.opponent,
        }
    }

    pub fn participant_mut(&mut self, side: Side) -> &mut CombatParticipant {
        match side {
            Side::Player => &mut self.player,
            Side::Opponent => &mut self.opponent,
        }
    }

    fn pair_mut(&mut self, actor: Side) -> (&mut CombatParticipant, &mut CombatParticipant) {
        match actor {
            Side::Player => (&mut self.player, &mut self.opponent),
            Side::Opponent => (&mut self.opponent, &mut self.player),
        }
    }

    /// Roll initiative and apply permanent flaw penalties. Returns the opening log.
    pub fn start(&mut self, dice: &mut Dice, data: &GameData) -> Result<Vec<String>, CombatError> {
        match self.phase {
            CombatPhase::NotStarted => {}
            CombatPhase::Ended(winner) => return Err(CombatError::AlreadyEnded { winner }),
            CombatPhase::Turn(_) => return Err(CombatError::AlreadyStarted),
        }

        let mut log = vec![format!(
            "[START] {} (HP {}) vs {} (HP {})",
            self.player.name(),
            self.player.health.max_hp,
            self.opponent.name(),
            self.opponent.health.max_hp
        )];

        for side in [Side::Player, Side::Opponent] {
            let p = self.participant_mut(side);
            if let Some((flaw_name, effect)) = p.flaw(data) {
                let penalties = buffs::flaw_penalties(effect);
                for buff in &penalties {
                    if let BuffKind::StatPenalty(stat) = buff.kind {
                        log.push(format!(
                            "[FLAW][{}] {} sets {} {:+} for the battle",
                            p.name(),
                            flaw_name,
                            stat,
                            buff.value
                        ));
                    }
                }
                p.buffs.extend(penalties);
            }
        }

        let player_speed = self.player.character.stats().speed;
        let opponent_speed = self.opponent.character.stats().speed;
        let first = if player_speed > opponent_speed {
            Side::Player
        } else if opponent_speed > player_speed {
            Side::Opponent
        } else if dice.int(0, 1) == 0 {
            Side::Player
        } else {
            Side::Opponent
        };
        log.push(format!(
            "[INIT] {} Speed {} vs {} Speed {} → {} starts",
            self.player.name(),
            player_speed,
            self.opponent.name(),
            opponent_speed,
            self.participant(first).name()
        ));

        self.phase = CombatPhase::Turn(first);
        self.turn = 1;
        info!(
            player = self.player.name(),
            opponent = self.opponent.name(),
            first = %first,
            "combat started"
        );
        Ok(log)
    }

    /// Refuse an ability the current side cannot use, without touching state.
    fn check_ability(&self, actor: Side, data: &GameData) -> Result<(), CombatError> {
        let p = self.participant(actor);
        let ability = p.special_ability(data).ok_or_else(|| CombatError::NoAbility {
            name: p.name().to_string(),
        })?;
        match p.ability_state.get(&ability.name) {
            Some(state) if state.ready() => Ok(()),
            _ => Err(CombatError::AbilityNotReady {
                name: p.name().to_string(),
                ability: ability.name.clone(),
            }),
        }
    }

    /// Resolve one turn for the side whose turn it is.
    pub fn advance_turn(
        &mut self,
        action: Action,
        dice: &mut Dice,
        data: &GameData,
    ) -> Result<TurnResult, CombatError> {
        let actor = match self.phase {
            CombatPhase::NotStarted => return Err(CombatError::NotStarted),
            CombatPhase::Ended(winner) => return Err(CombatError::AlreadyEnded { winner }),
            CombatPhase::Turn(side) => side,
        };
        if action == Action::Ability {
            self.check_ability(actor, data)?;
        }

        let turn = self.turn;
        let mut log = Vec::new();
        let ability_used = {
            let (attacker, defender) = self.pair_mut(actor);
            let attacker_name = attacker.name().to_string();
            let defender_name = defender.name().to_string();
            log.push(format!("[TURN][{}] turn {} ({:?})", attacker_name, turn, action));
            attacker.turns_taken += 1;

            buffs::tick_buffs(&attacker_name, &mut attacker.buffs, |m| log.push(m));
            buffs::tick_buffs(&defender_name, &mut defender.buffs, |m| log.push(m));

            if buffs::consume_turn_skip(&mut defender.buffs) {
                log.push(format!("[SKIP][{}] is frozen in time and loses the turn", attacker_name));
                false
            } else {
                resolve_action(attacker, defender, action, dice, data, &mut log)
            }
        };

        let (ended, revived) = self.check_end(actor, &mut log);

        if !ability_used {
            for state in self.participant_mut(actor).ability_state.values_mut() {
                state.tick();
            }
        }

        match ended {
            Some(winner) => {
                self.phase = CombatPhase::Ended(winner);
                log.push(format!(
                    "[END] {} is victorious after {} turns",
                    self.participant(winner).name(),
                    turn
                ));
                info!(winner = %winner, turns = turn, "combat ended");
            }
            None => {
                self.turn += 1;
                self.phase = CombatPhase::Turn(actor.other());
            }
        }
        debug!(turn, actor = %actor, ?action, lines = log.len(), "turn resolved");

        Ok(TurnResult { turn, actor, action, log, revived, ended })
    }

    /// Let the built-in heuristic pick the current side's action.
    pub fn auto_turn(&mut self, dice: &mut Dice, data: &GameData) -> Result<TurnResult, CombatError> {
        let side = match self.phase {
            CombatPhase::NotStarted => return Err(CombatError::NotStarted),
            CombatPhase::Ended(winner) => return Err(CombatError::AlreadyEnded { winner }),
            CombatPhase::Turn(side) => side,
        };
        let action = ai::choose_action(self, side, dice, data);
        self.advance_turn(action, dice, data)
    }

    /// Revive check, then winner. Defender is checked first; if both stay down the defender wins.
    fn check_end(&mut self, actor: Side, log: &mut Vec<String>) -> (Option<Side>, Vec<Side>) {
        let defender = actor.other();
        let mut revived = Vec::new();
        for side in [defender, actor] {
            let p = self.participant_mut(side);
            if !p.health.is_down() {
                continue;
            }
            if let Some(fraction) = buffs::take_revive(&mut p.buffs) {
                let name = p.name().to_string();
                life::revive(&name, &mut p.health, fraction, |m| log.push(m));
                revived.push(side);
            }
        }
        let actor_down = self.participant(actor).health.is_down();
        let defender_down = self.participant(defender).health.is_down();
        let winner = match (actor_down, defender_down) {
            (false, false) => None,
            (false, true) => Some(actor),
            (true, _) => Some(defender),
        };
        (winner, revived)
    }

    pub fn outcome(&self) -> Option<CombatOutcome> {
        let CombatPhase::Ended(winner) = self.phase else {
            return None;
        };
        Some(CombatOutcome {
            winner,
            turns: self.turn,
            player_hp: self.player.health.hp,
            opponent_hp: self.opponent.health.hp,
            opponent_race: self.opponent.character.sheet().race.clone(),
            player_used_basic_attack: self.player.basic_attacks > 0,
            player_turns: self.player.turns_taken,
        })
    }
}

/// Flaw hooks, then the action. Returns true if the special ability was spent.
fn resolve_action(
    attacker: &mut CombatParticipant,
    defender: &mut CombatParticipant,
    mut action: Action,
    dice: &mut Dice,
    data: &GameData,
    log: &mut Vec<String>,
) -> bool {
    let name = attacker.name().to_string();

    if let Some((flaw_name, flaw)) = attacker.flaw(data) {
        if let Some(p) = flaw.self_damage_chance {
            if dice.chance(p) {
                let amount = flaw.self_damage_amount.unwrap_or(0);
                log.push(format!("[FLAW][{}] {} causes {} self-damage", name, flaw_name, amount));
                life::apply_damage(&name, &mut attacker.health, amount, |m| log.push(m));
            }
        }
        if let Some(p) = flaw.forced_attack_chance {
            if dice.chance(p) && action != Action::Attack {
                log.push(format!("[FLAW][{}] {} forces an attack", name, flaw_name));
                action = Action::Attack;
            }
        }
        if action == Action::Ability {
            if let Some(p) = flaw.ability_fail_chance {
                if dice.chance(p) {
                    log.push(format!("[FLAW][{}] {} makes the ability fail", name, flaw_name));
                    return false;
                }
            }
        }
    }

    if attacker.health.is_down() {
        log.push(format!("[STATE][{}] collapses before acting", name));
        return false;
    }

    match action {
        Action::Attack => {
            basic_attack(attacker, defender, dice, data, log);
            false
        }
        Action::Defend => {
            attacker.buffs.push(Buff::timed(BuffKind::Defending, 1.0, 1));
            log.push(format!("[DEFEND][{}] takes a defensive stance", name));
            false
        }
        Action::Ability => use_ability(attacker, defender, data, log),
    }
}

fn defense_of<'a>(defender: &CombatParticipant, stats: &'a Stats, data: &'a GameData) -> Defense<'a> {
    Defense {
        stats,
        defending: buffs::is_defending(&defender.buffs),
        reduction_factor: buffs::incoming_damage_factor(&defender.buffs),
        flaw: defender.flaw(data).map(|(_, e)| e),
    }
}

fn basic_attack(
    attacker: &mut CombatParticipant,
    defender: &mut CombatParticipant,
    dice: &mut Dice,
    data: &GameData,
    log: &mut Vec<String>,
) {
    attacker.basic_attacks += 1;
    let attacker_stats = attacker.effective_stats();
    let defender_stats = defender.effective_stats();
    let (weapon, mastery) = attacker.weapon(data);

    let chance = damage::dodge_chance(
        &attacker_stats,
        &defender_stats,
        mastery,
        buffs::dodge_bonus(&defender.buffs),
    );
    if damage::roll_dodge(dice, chance) {
        log.push(format!(
            "[DODGE][{}] evades {}'s attack ({:.1}%)",
            defender.name(),
            attacker.name(),
            chance
        ));
        return;
    }

    let base = damage::physical_base(&attacker_stats, weapon, mastery, 0);
    let attack_type = weapon.map(|w| w.kind.as_str()).unwrap_or("physical");
    let dmg = damage::final_damage(
        base,
        attack_type,
        &defense_of(defender, &defender_stats, data),
        buffs::outgoing_damage_factor(&attacker.buffs),
    );
    log.push(format!(
        "[ATTACK][{}] hits {} for {}",
        attacker.name(),
        defender.name(),
        dmg
    ));
    let target = defender.name().to_string();
    life::apply_damage(&target, &mut defender.health, dmg, |m| log.push(m));
}

fn use_ability(
    attacker: &mut CombatParticipant,
    defender: &mut CombatParticipant,
    data: &GameData,
    log: &mut Vec<String>,
) -> bool {
    let Some(ability) = attacker.special_ability(data) else {
        return false;
    };
    let name = attacker.name().to_string();
    log.push(format!("[ABILITY][{}] uses {}", name, ability.name));

    match ability.kind {
        AbilityKind::Healing => {
            life::heal(&name, &mut attacker.health, ability.power.abs(), |m| log.push(m));
        }
        AbilityKind::Physical | AbilityKind::Magical => {
            let attacker_stats = attacker.effective_stats();
            let defender_stats = defender.effective_stats();
            let (base, fallback_type) = if ability.kind == AbilityKind::Physical {
                let (weapon, mastery) = attacker.weapon(data);
                (
                    damage::physical_base(&attacker_stats, weapon, mastery, ability.power),
                    "physical",
                )
            } else {
                (damage::magical_base(&attacker_stats, ability.power), "magical")
            };
            let attack_type = ability.element.as_deref().unwrap_or(fallback_type);
            let dmg = damage::final_damage(
                base,
                attack_type,
                &defense_of(defender, &defender_stats, data),
                buffs::outgoing_damage_factor(&attacker.buffs),
            );
            log.push(format!(
                "[ABILITY][{}] {} deals {} to {}",
                name,
                ability.name,
                dmg,
                defender.name()
            ));
            let target = defender.name().to_string();
            life::apply_damage(&target, &mut defender.health, dmg, |m| log.push(m));
        }
        AbilityKind::Utility | AbilityKind::Defensive => {}
    }

    if let Some(effect) = &ability.effect {
        apply_effect(attacker, defender.name(), effect, log);
    }
    if let Some(state) = attacker.ability_state.get_mut(&ability.name) {
        state.spend(ability);
    }
    true
}

fn apply_effect(attacker: &mut CombatParticipant, foe: &str, effect: &AbilityEffect, log: &mut Vec<String>) {
    let name = attacker.name().to_string();
    let turns = effect.duration.unwrap_or(1).max(1);

    if let Some(n) = effect.skip_opponent_turns {
        attacker.buffs.push(Buff::permanent(BuffKind::TurnSkip, n as f64));
        log.push(format!("[EFFECT][{}] {} loses the next {} turns", name, foe, n));
    }
    if let Some(boost) = effect.temp_str_boost {
        attacker
            .buffs
            .push(Buff::timed(BuffKind::StatBoost(Stat::Strength), boost as f64, turns));
        log.push(format!("[EFFECT][{}] +{} Strength for {} turns", name, boost, turns));
    }
    if let Some(amount) = effect.self_damage {
        life::apply_damage(&name, &mut attacker.health, amount, |m| log.push(m));
    }
    if let Some(factor) = effect.damage_boost {
        attacker.buffs.push(Buff::timed(BuffKind::DamageBoost, factor, turns));
        log.push(format!("[EFFECT][{}] damage x{} for {} turns", name, factor, turns));
    }
    if let Some(reduction) = effect.damage_reduction {
        attacker.buffs.push(Buff::timed(BuffKind::DamageReduction, reduction, turns));
        log.push(format!(
            "[EFFECT][{}] {:.0}% damage reduction",
            name,
            reduction * 100.0
        ));
    }
    if let Some(chance) = effect.high_dodge_chance {
        attacker.buffs.push(Buff::timed(BuffKind::DodgeBoost, chance, turns));
        log.push(format!("[EFFECT][{}] dodge +{:.0}%", name, chance * 100.0));
    }
    if effect.revive {
        let fraction = effect.hp_restore.unwrap_or(0.5);
        attacker.buffs.push(Buff::permanent(BuffKind::Revive, fraction));
        log.push(format!(
            "[EFFECT][{}] will rise again with {:.0}% HP",
            name,
            fraction * 100.0
        ));
    }
}
