use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::Declined;
use crate::character::{Character, InventoryItem, Stat};
use crate::combat::{CombatOutcome, Side};
use crate::content::{CatalogItem, GameData, Rarity};
use crate::progression::{self, GOLD_COIN, InventoryAdd, StatGain, XpGain};
use crate::rating::Rank;
use crate::{Dice, weighted_choice_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestKind {
    Battle,
    Exploration,
    StatTraining,
    AbilityTrials,
    FlawRedemption,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestRewards {
    #[serde(default)]
    pub xp: Option<u32>,
    #[serde(default)]
    pub num_items: Option<u32>,
    #[serde(default)]
    pub item_rarity: Option<Rarity>,
    #[serde(default)]
    pub stat: Option<Stat>,
    #[serde(default)]
    pub value: Option<i32>,
    /// "Random" grants a random special ability.
    #[serde(default)]
    pub new_ability: Option<String>,
    #[serde(default)]
    pub removes_flaw: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestCosts {
    #[serde(default)]
    pub gold: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestSpecifics {
    #[serde(default)]
    pub enemy_type: Option<String>,
    #[serde(default)]
    pub wins_required: Option<u32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub rounds_to_survive: Option<u32>,
    #[serde(default)]
    pub stat_to_train: Option<Stat>,
    #[serde(default)]
    pub stat_gain: Option<i32>,
    #[serde(default)]
    pub ability_only: bool,
    #[serde(default)]
    pub flaw_to_redeem: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestTemplate {
    pub kind: QuestKind,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rank_required: Rank,
    #[serde(default)]
    pub rewards: QuestRewards,
    #[serde(default)]
    pub costs: QuestCosts,
    #[serde(default)]
    pub specifics: QuestSpecifics,
}

/// The quest a character is working on and how far along it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveQuest {
    pub name: String,
    pub kind: QuestKind,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub rounds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestCompletion {
    pub quest: String,
    pub xp: XpGain,
    pub items: Vec<InventoryItem>,
    pub new_ability: Option<String>,
    pub removed_flaw: Option<String>,
}

/// Templates a character of `rank` may take on.
pub fn available_quests(rank: Rank, data: &GameData) -> Vec<&QuestTemplate> {
    data.quests.iter().filter(|q| q.rank_required <= rank).collect()
}

fn template<'d>(data: &'d GameData, name: &str) -> Result<&'d QuestTemplate, Declined> {
    data.quest(name)
        .ok_or_else(|| Declined::UnknownQuest { quest: name.to_string() })
}

fn check_rank(character: &Character, quest: &QuestTemplate) -> Result<(), Declined> {
    if character.nexus_rank() < quest.rank_required {
        return Err(Declined::RankTooLow {
            required: quest.rank_required,
            actual: character.nexus_rank(),
        });
    }
    Ok(())
}

pub fn accept_quest<'d>(character: &mut Character, name: &str, data: &'d GameData) -> Result<&'d QuestTemplate, Declined> {
    if let Some(active) = &character.active_quest {
        return Err(Declined::QuestActive { quest: active.name.clone() });
    }
    let quest = template(data, name)?;
    if quest.kind == QuestKind::StatTraining {
        return Err(Declined::NotAcceptable { quest: quest.name.clone() });
    }
    check_rank(character, quest)?;
    character.active_quest = Some(ActiveQuest {
        name: quest.name.clone(),
        kind: quest.kind,
        wins: 0,
        rounds: 0,
    });
    info!(name = character.name(), quest = %quest.name, "quest accepted");
    Ok(quest)
}

/// Drop the active quest for a quarter of its XP reward.
pub fn abandon_quest(character: &mut Character, data: &GameData) -> Result<XpGain, Declined> {
    let active = character.active_quest.take().ok_or(Declined::NoActiveQuest)?;
    let reward = data
        .quest(&active.name)
        .and_then(|q| q.rewards.xp)
        .unwrap_or(0);
    let penalty = (reward as f64 / 4.0).round() as i64;
    info!(name = character.name(), quest = %active.name, penalty, "quest abandoned");
    Ok(progression::gain_xp(character, -penalty, data))
}

/// Pay the training cost in gold and raise the stat.
pub fn train_stat(character: &mut Character, name: &str, data: &GameData) -> Result<StatGain, Declined> {
    let quest = template(data, name)?;
    let (Some(stat), Some(gain)) = (quest.specifics.stat_to_train, quest.specifics.stat_gain) else {
        return Err(Declined::NotAcceptable { quest: quest.name.clone() });
    };
    check_rank(character, quest)?;
    let cost = quest.costs.gold.unwrap_or(0);
    let held = character.item_quantity(GOLD_COIN);
    if held < cost {
        return Err(Declined::InsufficientGold { required: cost, held });
    }
    progression::remove_item(character, GOLD_COIN, cost);
    Ok(progression::apply_stat_gain(character, stat, gain, data))
}

/// Count a finished battle towards the active quest; completes it when done.
pub fn record_combat(
    character: &mut Character,
    outcome: &CombatOutcome,
    dice: &mut Dice,
    data: &GameData,
) -> Option<QuestCompletion> {
    let won = outcome.winner == Side::Player;
    let flaw = character.sheet().fatal_flaw.clone();
    let active = character.active_quest.as_mut()?;
    let quest = data.quest(&active.name)?;
    let specifics = &quest.specifics;

    let counts = match quest.kind {
        QuestKind::Battle => won && specifics.enemy_type.as_deref() == Some(outcome.opponent_race.as_str()),
        QuestKind::AbilityTrials => won && !(specifics.ability_only && outcome.player_used_basic_attack),
        QuestKind::FlawRedemption => won && flaw.is_some() && flaw == specifics.flaw_to_redeem,
        QuestKind::Exploration | QuestKind::StatTraining => false,
    };
    if counts {
        active.wins += 1;
    }
    if quest.kind == QuestKind::Exploration {
        active.rounds += outcome.player_turns;
    }

    let done = match quest.kind {
        QuestKind::Exploration => specifics.rounds_to_survive.is_some_and(|n| active.rounds >= n),
        _ => specifics.wins_required.is_some_and(|n| active.wins >= n),
    };
    if !done {
        return None;
    }
    Some(complete_quest(character, quest, dice, data))
}

fn complete_quest(character: &mut Character, quest: &QuestTemplate, dice: &mut Dice, data: &GameData) -> QuestCompletion {
    character.active_quest = None;
    let rewards = &quest.rewards;
    let xp = progression::gain_xp(character, rewards.xp.unwrap_or(0) as i64, data);

    let mut items = Vec::new();
    if let Some(rarity) = rewards.item_rarity {
        let pool: Vec<(&str, &CatalogItem)> = data.catalog().filter(|(_, i)| i.rarity == rarity).collect();
        for _ in 0..rewards.num_items.unwrap_or(0) {
            if pool.is_empty() {
                break;
            }
            let (category, item) = pool[dice.int(0, pool.len() as i32 - 1) as usize];
            let granted = item.to_inventory_item(category);
            if progression::add_item_to_inventory(character, granted.clone()) != InventoryAdd::RejectedDuplicateMythic {
                items.push(granted);
            }
        }
    }

    let new_ability = if rewards.new_ability.is_some() && character.sheet().special_ability.is_none() {
        let drawn = weighted_choice_name(dice, &data.special_abilities);
        if let Some(ability) = &drawn {
            character.update_sheet(data, |s| s.special_ability = Some(ability.clone()));
        }
        drawn
    } else {
        None
    };

    let removed_flaw = if rewards.removes_flaw {
        character.update_sheet(data, |s| s.fatal_flaw.take())
    } else {
        None
    };

    info!(name = character.name(), quest = %quest.name, "quest completed");
    QuestCompletion {
        quest: quest.name.clone(),
        xp,
        items,
        new_ability,
        removed_flaw,
    }
}
