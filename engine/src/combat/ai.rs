use tracing::debug;

use super::{Action, CombatSession, Side, buffs};
use crate::Dice;
use crate::content::{AbilityKind, GameData};

/// Heuristic action for `side`.
///
/// The special ability is considered from turn 2 on when it is ready: heal
/// below half HP, strike when healthy against a nearly beaten foe, shield
/// below 60% unless already defending, or open with a turn-skipping utility
/// before turn 5. Without a usable ability, a side under 40% HP defends on a
/// coin flip. Everything else is a plain attack.
pub fn choose_action(session: &CombatSession, side: Side, dice: &mut Dice, data: &GameData) -> Action {
    let me = session.participant(side);
    let foe = session.participant(side.other());
    let my_hp = me.health.fraction();
    let foe_hp = foe.health.fraction();

    let usable = session.turn() > 1 && me.ability_ready(data);
    if usable {
        if let Some(ability) = me.special_ability(data) {
            let wanted = match ability.kind {
                AbilityKind::Healing => my_hp < 0.5,
                AbilityKind::Magical | AbilityKind::Physical => my_hp > 0.7 && foe_hp < 0.3,
                AbilityKind::Defensive => my_hp < 0.6 && !buffs::is_defending(&me.buffs),
                AbilityKind::Utility => {
                    session.turn() < 5
                        && ability
                            .effect
                            .as_ref()
                            .is_some_and(|e| e.skip_opponent_turns.is_some())
                }
            };
            if wanted {
                debug!(name = me.name(), ability = %ability.name, "ai picks ability");
                return Action::Ability;
            }
        }
        return Action::Attack;
    }

    if my_hp < 0.4 && dice.int(0, 1) == 0 {
        return Action::Defend;
    }
    Action::Attack
}
