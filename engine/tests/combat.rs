use nexus_engine::combat::buffs::{Buff, BuffKind};
use nexus_engine::combat::{CombatPhase, ai};
use nexus_engine::{
    Action, Character, CharacterSheet, CombatError, CombatSession, Dice, GameData, Side, Stats,
};

fn fighter(name: &str, stats: Stats, ability: Option<&str>, flaw: Option<&str>) -> Character {
    let mut sheet = CharacterSheet::plain("Humans", "Versatility", stats);
    sheet.special_ability = ability.map(str::to_string);
    sheet.fatal_flaw = flaw.map(str::to_string);
    Character::new(name, sheet, GameData::builtin())
}

/// Fast, hits for 10, 100 HP.
fn hero(ability: Option<&str>, flaw: Option<&str>) -> Character {
    fighter("Hero", Stats::new(50, 20, 80, 0, 20), ability, flaw)
}

/// Slow, hits for 10, 100 HP.
fn brute() -> Character {
    fighter("Brute", Stats::new(50, 20, 40, 0, 20), None, None)
}

fn started(player: Character, opponent: Character, dice: &mut Dice) -> CombatSession {
    let data = GameData::builtin();
    let mut session = CombatSession::between(player, opponent, data).expect("valid fighters");
    session.start(dice, data).expect("start");
    session
}

#[test]
fn faster_side_opens() {
    let mut dice = Dice::from_seed(1);
    let session = started(hero(None, None), brute(), &mut dice);
    assert_eq!(session.phase(), CombatPhase::Turn(Side::Player));
    assert_eq!(session.turn(), 1);

    let mut dice = Dice::from_seed(1);
    let session = started(brute(), hero(None, None), &mut dice);
    assert_eq!(session.current_side(), Some(Side::Opponent));
}

#[test]
fn speed_tie_is_a_coin_flip() {
    let mut dice = Dice::from_scripted(vec![0.0]);
    let session = started(brute(), brute(), &mut dice);
    assert_eq!(session.current_side(), Some(Side::Player));

    let mut dice = Dice::from_scripted(vec![0.9]);
    let session = started(brute(), brute(), &mut dice);
    assert_eq!(session.current_side(), Some(Side::Opponent));
}

#[test]
fn lifecycle_errors() {
    let data = GameData::builtin();
    let mut dice = Dice::from_scripted(vec![0.99]);
    let mut session = CombatSession::between(hero(None, None), brute(), data).expect("valid");
    assert_eq!(session.advance_turn(Action::Attack, &mut dice, data).err(), Some(CombatError::NotStarted));
    session.start(&mut dice, data).expect("start");
    assert_eq!(session.start(&mut dice, data).err(), Some(CombatError::AlreadyStarted));
    assert!(matches!(
        session.advance_turn(Action::Ability, &mut dice, data),
        Err(CombatError::NoAbility { .. })
    ));
    assert_eq!(session.turn(), 1);
}

#[test]
fn attack_hits_and_passes_the_turn() {
    let data = GameData::builtin();
    let mut dice = Dice::from_scripted(vec![0.99]);
    let mut session = started(hero(None, None), brute(), &mut dice);

    let result = session.advance_turn(Action::Attack, &mut dice, data).expect("turn");
    assert_eq!(result.actor, Side::Player);
    assert_eq!(session.participant(Side::Opponent).health.hp, 90);
    assert!(result.log.iter().any(|l| l.starts_with("[ATTACK][Hero]")));
    assert_eq!(session.current_side(), Some(Side::Opponent));
    assert_eq!(session.turn(), 2);
    assert!(result.ended.is_none());
}

#[test]
fn defend_softens_the_next_hit_then_wears_off() {
    let data = GameData::builtin();
    let mut dice = Dice::from_scripted(vec![0.99]);
    let mut session = started(hero(None, None), brute(), &mut dice);

    session.advance_turn(Action::Defend, &mut dice, data).expect("defend");
    session.advance_turn(Action::Attack, &mut dice, data).expect("attack");
    // 10 * (1 - (0 + 80 + 20) / 400) = 7.5
    assert_eq!(session.participant(Side::Player).health.hp, 92);

    let next = session.advance_turn(Action::Attack, &mut dice, data).expect("attack");
    assert!(next.log.iter().any(|l| l.contains("Defending wears off")));
    assert!(session.participant(Side::Player).buffs.is_empty());
}

#[test]
fn spent_ability_cools_down_only_on_unused_turns() {
    let data = GameData::builtin();
    let mut dice = Dice::from_scripted(vec![0.99]);
    let mut session = started(hero(Some("Fireball"), None), brute(), &mut dice);

    let cast = session.advance_turn(Action::Ability, &mut dice, data).expect("fireball");
    assert!(cast.log.iter().any(|l| l.contains("Fireball deals 24")));
    assert_eq!(session.participant(Side::Opponent).health.hp, 76);
    let cooldown = |s: &CombatSession| s.participant(Side::Player).ability_state["Fireball"].cooldown;
    assert_eq!(cooldown(&session), 2);

    session.advance_turn(Action::Attack, &mut dice, data).expect("brute");
    session.advance_turn(Action::Attack, &mut dice, data).expect("hero");
    assert_eq!(cooldown(&session), 1);

    session.advance_turn(Action::Attack, &mut dice, data).expect("brute");
    let refused = session.advance_turn(Action::Ability, &mut dice, data);
    assert!(matches!(refused, Err(CombatError::AbilityNotReady { .. })));
    assert_eq!(session.current_side(), Some(Side::Player));

    session.advance_turn(Action::Attack, &mut dice, data).expect("hero");
    assert_eq!(cooldown(&session), 0);
    assert!(session.participant(Side::Player).ability_ready(data));
}

#[test]
fn time_stop_skips_the_opponent() {
    let data = GameData::builtin();
    let mut dice = Dice::from_scripted(vec![0.99]);
    let mut session = started(hero(Some("Time Stop"), None), brute(), &mut dice);

    session.advance_turn(Action::Ability, &mut dice, data).expect("time stop");
    let state = session.participant(Side::Player).ability_state["Time Stop"];
    assert_eq!(state.uses_left, Some(0));

    for _ in 0..3 {
        let skipped = session.advance_turn(Action::Attack, &mut dice, data).expect("brute");
        assert_eq!(skipped.actor, Side::Opponent);
        assert!(skipped.log.iter().any(|l| l.starts_with("[SKIP]")));
        session.advance_turn(Action::Attack, &mut dice, data).expect("hero");
    }
    assert_eq!(session.participant(Side::Player).health.hp, 100);

    let swing = session.advance_turn(Action::Attack, &mut dice, data).expect("brute");
    assert!(!swing.log.iter().any(|l| l.starts_with("[SKIP]")));
    assert_eq!(session.participant(Side::Player).health.hp, 90);
    assert!(!session.participant(Side::Player).ability_ready(data));
}

#[test]
fn revive_triggers_once_then_defeat() {
    let data = GameData::builtin();
    let mut dice = Dice::from_scripted(vec![0.99]);
    let mut session = started(hero(None, None), brute(), &mut dice);
    session
        .participant_mut(Side::Player)
        .buffs
        .push(Buff::permanent(BuffKind::Revive, 0.5));

    session.advance_turn(Action::Attack, &mut dice, data).expect("hero");
    session.participant_mut(Side::Player).health.hp = 5;
    let fall = session.advance_turn(Action::Attack, &mut dice, data).expect("brute");
    assert_eq!(fall.revived, vec![Side::Player]);
    assert!(fall.ended.is_none());
    assert_eq!(session.participant(Side::Player).health.hp, 50);

    session.advance_turn(Action::Attack, &mut dice, data).expect("hero");
    session.participant_mut(Side::Player).health.hp = 5;
    let last = session.advance_turn(Action::Attack, &mut dice, data).expect("brute");
    assert_eq!(last.ended, Some(Side::Opponent));
    assert!(session.is_over());

    let outcome = session.outcome().expect("finished");
    assert_eq!(outcome.winner, Side::Opponent);
    assert_eq!(outcome.turns, 4);
    assert_eq!(outcome.player_hp, 0);
    assert_eq!(outcome.opponent_race, "Humans");
    assert!(outcome.player_used_basic_attack);
    assert_eq!(outcome.player_turns, 2);

    assert_eq!(
        session.advance_turn(Action::Attack, &mut dice, data).err(),
        Some(CombatError::AlreadyEnded { winner: Side::Opponent })
    );
    let events = last.events();
    assert!(matches!(
        events.last(),
        Some(nexus_engine::events::EngineEvent::CombatEnded { winner: Side::Opponent, turns: 4 })
    ));
}

#[test]
fn permanent_flaw_penalties_apply_at_start() {
    let data = GameData::builtin();
    let mut dice = Dice::from_seed(4);
    let mut session =
        CombatSession::between(hero(None, Some("Curse of Weakness")), brute(), data).expect("valid");
    let opening = session.start(&mut dice, data).expect("start");
    assert!(opening.iter().any(|l| l.starts_with("[FLAW][Hero]")));

    let stats = session.participant(Side::Player).effective_stats();
    assert_eq!(stats.strength, 45);
    assert_eq!(stats.combat_skill, 15);
    assert_eq!(session.participant(Side::Player).character.stats().strength, 50);
}

#[test]
fn arrogance_can_hurt_its_owner() {
    let data = GameData::builtin();
    // self-damage roll, then the dodge roll
    let mut dice = Dice::from_scripted(vec![0.05, 0.99]);
    let mut session = started(hero(None, Some("Arrogance")), brute(), &mut dice);
    session.advance_turn(Action::Attack, &mut dice, data).expect("turn");
    assert_eq!(session.participant(Side::Player).health.hp, 95);
    assert_eq!(session.participant(Side::Opponent).health.hp, 90);
}

#[test]
fn self_inflicted_defeat_hands_the_win_over() {
    let data = GameData::builtin();
    let mut dice = Dice::from_scripted(vec![0.05]);
    let mut session = started(hero(None, Some("Arrogance")), brute(), &mut dice);
    session.participant_mut(Side::Player).health.hp = 3;
    let result = session.advance_turn(Action::Attack, &mut dice, data).expect("turn");
    assert!(result.log.iter().any(|l| l.contains("collapses before acting")));
    assert_eq!(result.ended, Some(Side::Opponent));
    assert_eq!(session.participant(Side::Opponent).health.hp, 100);
}

#[test]
fn ai_heals_when_low_and_defends_on_a_coin_flip() {
    let data = GameData::builtin();
    let mut dice = Dice::from_scripted(vec![0.99]);
    let mut session = started(hero(Some("Healing"), None), brute(), &mut dice);

    // turn 1: ability is never considered
    session.participant_mut(Side::Player).health.hp = 30;
    assert_eq!(ai::choose_action(&session, Side::Player, &mut Dice::from_scripted(vec![0.9]), data), Action::Attack);
    assert_eq!(ai::choose_action(&session, Side::Player, &mut Dice::from_scripted(vec![0.0]), data), Action::Defend);

    session.advance_turn(Action::Attack, &mut dice, data).expect("hero");
    assert_eq!(session.turn(), 2);
    assert_eq!(ai::choose_action(&session, Side::Player, &mut dice, data), Action::Ability);

    session.participant_mut(Side::Player).health.hp = 90;
    assert_eq!(ai::choose_action(&session, Side::Player, &mut dice, data), Action::Attack);
}

#[test]
fn auto_turns_reach_a_winner() {
    let data = GameData::builtin();
    let mut dice = Dice::from_seed(2024);
    let mut session = started(hero(None, None), brute(), &mut dice);
    let mut guard = 0;
    while !session.is_over() && guard < 500 {
        session.auto_turn(&mut dice, data).expect("turn");
        guard += 1;
    }
    let outcome = session.outcome().expect("someone won");
    let loser = session.participant(outcome.winner.other());
    assert_eq!(loser.health.hp, 0);
}

#[test]
fn impulsiveness_can_force_an_attack() {
    let data = GameData::builtin();
    // forced-attack roll, then the dodge roll
    let mut dice = Dice::from_scripted(vec![0.05, 0.99]);
    let mut session = started(hero(None, Some("Impulsiveness")), brute(), &mut dice);
    let result = session.advance_turn(Action::Defend, &mut dice, data).expect("turn");
    assert!(result.log.iter().any(|l| l == "[FLAW][Hero] Impulsiveness forces an attack"));
    assert!(session.participant(Side::Player).buffs.is_empty());
    assert_eq!(session.participant(Side::Opponent).health.hp, 90);

    let mut dice = Dice::from_scripted(vec![0.5]);
    let mut session = started(hero(None, Some("Impulsiveness")), brute(), &mut dice);
    let result = session.advance_turn(Action::Defend, &mut dice, data).expect("turn");
    assert!(!result.log.iter().any(|l| l.contains("forces an attack")));
    assert_eq!(session.participant(Side::Player).buffs[0].kind, BuffKind::Defending);
    assert_eq!(session.participant(Side::Opponent).health.hp, 100);
}

#[test]
fn overconfidence_wastes_the_turn_but_not_the_ability() {
    let data = GameData::builtin();
    let mut dice = Dice::from_scripted(vec![0.05]);
    let mut session = started(hero(Some("Fireball"), Some("Overconfidence")), brute(), &mut dice);
    let before = session.participant(Side::Player).ability_state["Fireball"];

    let result = session.advance_turn(Action::Ability, &mut dice, data).expect("turn");
    assert!(result.log.iter().any(|l| l == "[FLAW][Hero] Overconfidence makes the ability fail"));
    assert!(!result.log.iter().any(|l| l.starts_with("[ABILITY]")));
    assert_eq!(session.participant(Side::Opponent).health.hp, 100);
    assert_eq!(session.participant(Side::Player).ability_state["Fireball"], before);
    assert!(session.participant(Side::Player).ability_ready(data));
    assert_eq!(session.current_side(), Some(Side::Opponent));
}

#[test]
fn celestial_shield_halves_the_next_hit() {
    let data = GameData::builtin();
    let mut dice = Dice::from_scripted(vec![0.99]);
    let mut session = started(hero(Some("Celestial Shield"), None), brute(), &mut dice);

    let cast = session.advance_turn(Action::Ability, &mut dice, data).expect("shield");
    assert!(cast.log.iter().any(|l| l == "[EFFECT][Hero] 50% damage reduction"));
    session.advance_turn(Action::Attack, &mut dice, data).expect("brute");
    assert_eq!(session.participant(Side::Player).health.hp, 95);

    let next = session.advance_turn(Action::Attack, &mut dice, data).expect("hero");
    assert!(next.log.iter().any(|l| l.contains("DamageReduction wears off")));
    session.advance_turn(Action::Attack, &mut dice, data).expect("brute");
    assert_eq!(session.participant(Side::Player).health.hp, 85);
}

#[test]
fn void_step_makes_the_holder_hard_to_hit() {
    let data = GameData::builtin();
    // d100 of 51: misses a 9% dodge, lands inside 99%
    let mut dice = Dice::from_scripted(vec![0.5]);
    let mut session = started(hero(Some("Void Step"), None), brute(), &mut dice);

    let cast = session.advance_turn(Action::Ability, &mut dice, data).expect("void step");
    assert!(cast.log.iter().any(|l| l == "[EFFECT][Hero] dodge +90%"));
    let swing = session.advance_turn(Action::Attack, &mut dice, data).expect("brute");
    assert!(swing.log.iter().any(|l| l.starts_with("[DODGE][Hero]")));
    assert_eq!(session.participant(Side::Player).health.hp, 100);

    session.advance_turn(Action::Attack, &mut dice, data).expect("hero");
    let landed = session.advance_turn(Action::Attack, &mut dice, data).expect("brute");
    assert!(!landed.log.iter().any(|l| l.starts_with("[DODGE]")));
    assert_eq!(session.participant(Side::Player).health.hp, 90);
}

#[test]
fn blood_pact_trades_health_for_damage() {
    let data = GameData::builtin();
    let mut dice = Dice::from_scripted(vec![0.99]);
    let mut session = started(hero(Some("Blood Pact"), None), brute(), &mut dice);

    let cast = session.advance_turn(Action::Ability, &mut dice, data).expect("pact");
    assert!(cast.log.iter().any(|l| l == "[EFFECT][Hero] damage x1.5 for 2 turns"));
    assert_eq!(session.participant(Side::Player).health.hp, 90);
    assert_eq!(session.participant(Side::Opponent).health.hp, 90);

    session.advance_turn(Action::Attack, &mut dice, data).expect("brute");
    session.advance_turn(Action::Attack, &mut dice, data).expect("hero");
    assert_eq!(session.participant(Side::Opponent).health.hp, 75);

    let worn = session.advance_turn(Action::Attack, &mut dice, data).expect("brute");
    assert!(worn.log.iter().any(|l| l.contains("DamageBoost wears off")));
    session.advance_turn(Action::Attack, &mut dice, data).expect("hero");
    assert_eq!(session.participant(Side::Opponent).health.hp, 65);
}

#[test]
fn super_strength_boosts_strength_for_two_turns() {
    let data = GameData::builtin();
    let mut dice = Dice::from_scripted(vec![0.99]);
    let mut session = started(hero(Some("Super Strength"), None), brute(), &mut dice);

    let cast = session.advance_turn(Action::Ability, &mut dice, data).expect("boost");
    assert!(cast.log.iter().any(|l| l == "[EFFECT][Hero] +20 Strength for 2 turns"));
    assert_eq!(session.participant(Side::Opponent).health.hp, 90);
    assert_eq!(session.participant(Side::Player).effective_stats().strength, 70);

    session.advance_turn(Action::Attack, &mut dice, data).expect("brute");
    session.advance_turn(Action::Attack, &mut dice, data).expect("hero");
    // 70 / 5
    assert_eq!(session.participant(Side::Opponent).health.hp, 76);

    session.advance_turn(Action::Attack, &mut dice, data).expect("brute");
    assert_eq!(session.participant(Side::Player).effective_stats().strength, 50);
    assert_eq!(session.participant(Side::Player).character.stats().strength, 50);
}
