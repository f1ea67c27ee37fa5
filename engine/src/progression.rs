use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::Declined;
use crate::character::{Character, InventoryItem, STAT_CAP, Stat};
use crate::content::{GameData, Rarity, STAT_POINT_ITEM};
use crate::events::EngineEvent;
use crate::{Dice, Weighted, weighted_choice};

/// Name of the crystal that always sits in the reward pool.
pub const MINOR_STAT_CRYSTAL: &str = "Minor Stat Crystal";
/// Name of the currency item quests charge in.
pub const GOLD_COIN: &str = "Gold Coin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct XpGain {
    pub before: u32,
    pub after: u32,
    pub leveled_up: bool,
    pub level: u32,
    /// XP left after a level up still meets the next threshold.
    pub overflow_pending: bool,
}

impl XpGain {
    pub fn events(&self) -> Vec<EngineEvent> {
        let mut events = vec![EngineEvent::XpChanged { before: self.before, after: self.after }];
        if self.leveled_up {
            events.push(EngineEvent::LevelUp { level: self.level });
        }
        events
    }
}

/// Add (or, when negative, remove) XP. XP never drops below 0 and at most
/// one level is gained per call.
pub fn gain_xp(character: &mut Character, amount: i64, data: &GameData) -> XpGain {
    let before = character.xp;
    let mut xp = u32::try_from(i64::from(before).saturating_add(amount).max(0)).unwrap_or(u32::MAX);
    let mut leveled_up = false;

    if let Some(threshold) = data.level_threshold(character.level) {
        if xp >= threshold {
            xp -= threshold;
            character.level += 1;
            leveled_up = true;
            info!(name = character.name(), level = character.level, "level up");
        }
    }
    character.xp = xp;

    let overflow_pending = leveled_up
        && data
            .level_threshold(character.level)
            .is_some_and(|next| xp >= next);
    if overflow_pending {
        warn!(
            name = character.name(),
            xp,
            level = character.level,
            "xp still exceeds the next threshold; levels are granted one per gain"
        );
    }

    XpGain { before, after: xp, leveled_up, level: character.level, overflow_pending }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatGain {
    pub stat: Stat,
    pub before: i32,
    pub after: i32,
    /// Points above the cap moved to the floating pool.
    pub overflow: u32,
}

/// Raise `stat` by `value`, capped at 90; the excess becomes floating points.
/// Rating and rank are recomputed.
pub fn apply_stat_gain(character: &mut Character, stat: Stat, value: i32, data: &GameData) -> StatGain {
    let before = character.stats().get(stat);
    let raised = before + value;
    let (after, overflow) = if raised > STAT_CAP {
        (STAT_CAP, (raised - STAT_CAP) as u32)
    } else {
        (raised, 0)
    };
    character.update_sheet(data, |sheet| sheet.stats.set(stat, after));
    character.floating_stat_points += overflow;
    debug!(name = character.name(), %stat, before, after, overflow, "stat gain");
    StatGain { stat, before, after, overflow }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryAdd {
    Added,
    Stacked { quantity: u32 },
    RejectedDuplicateMythic,
}

/// Put `item` in the inventory: duplicate Mythics are refused, stackables
/// merge on `(name, type)`, anything else is appended.
pub fn add_item_to_inventory(character: &mut Character, mut item: InventoryItem) -> InventoryAdd {
    if item.rarity == Rarity::Mythic
        && character
            .inventory
            .iter()
            .any(|held| held.rarity == Rarity::Mythic && held.name == item.name)
    {
        debug!(name = character.name(), item = %item.name, "duplicate mythic rejected");
        return InventoryAdd::RejectedDuplicateMythic;
    }

    let incoming = item.quantity.max(1);
    if item.stackable {
        let existing = character
            .inventory
            .iter_mut()
            .find(|held| held.name == item.name && held.item_type == item.item_type);
        if let Some(held) = existing {
            held.quantity += incoming;
            return InventoryAdd::Stacked { quantity: held.quantity };
        }
    }

    item.quantity = incoming;
    character.inventory.push(item);
    InventoryAdd::Added
}

/// Take `quantity` of `name` out of the inventory. Refuses (and changes nothing)
/// when fewer are held.
pub fn remove_item(character: &mut Character, name: &str, quantity: u32) -> bool {
    if character.item_quantity(name) < quantity {
        return false;
    }
    let mut remaining = quantity;
    for held in character.inventory.iter_mut().filter(|i| i.name == name) {
        let taken = remaining.min(held.quantity);
        held.quantity -= taken;
        remaining -= taken;
        if remaining == 0 {
            break;
        }
    }
    character.inventory.retain(|i| i.quantity > 0);
    true
}

struct RewardEntry {
    item: InventoryItem,
    weight: f64,
}

impl Weighted for RewardEntry {
    fn name(&self) -> &str {
        &self.item.name
    }
    fn weight(&self) -> f64 {
        self.weight
    }
}

fn reward_pool(dice: &mut Dice, data: &GameData) -> Vec<RewardEntry> {
    let crystal = InventoryItem {
        name: MINOR_STAT_CRYSTAL.to_string(),
        item_type: STAT_POINT_ITEM.to_string(),
        rarity: Rarity::Rare,
        quantity: 1,
        stackable: true,
        stat_bonus: Default::default(),
        effect: None,
        value: Some(dice.int(1, 2) as u32),
        base_damage: None,
        uses: None,
    };
    let mut pool = vec![RewardEntry { item: crystal, weight: Rarity::Rare.reward_weight() * 0.5 }];
    pool.extend(
        data.catalog()
            .filter(|(category, _)| *category != STAT_POINT_ITEM)
            .map(|(category, item)| RewardEntry {
                item: item.to_inventory_item(category),
                weight: item.rarity.reward_weight(),
            }),
    );
    pool
}

/// Draw `count` loot items with replacement, weighted by rarity.
pub fn generate_weighted_rewards(level: u32, count: usize, dice: &mut Dice, data: &GameData) -> Vec<InventoryItem> {
    let pool = reward_pool(dice, data);
    let rewards: Vec<InventoryItem> = (0..count)
        .filter_map(|_| weighted_choice(dice, &pool).map(|e| e.item.clone()))
        .collect();
    debug!(level, count, drawn = rewards.len(), "rewards generated");
    rewards
}

/// What a finished battle did to the character.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombatRewards {
    pub won: bool,
    pub xp: XpGain,
    /// Items that made it into the inventory.
    pub items: Vec<InventoryItem>,
}

impl CombatRewards {
    pub fn events(&self) -> Vec<EngineEvent> {
        let mut events = self.xp.events();
        events.extend(
            self.items
                .iter()
                .map(|item| EngineEvent::RewardGranted { item: item.clone() }),
        );
        events
    }
}

/// Victory grants `[L*10, L*20]` XP and 1 to 4 loot items; defeat costs a
/// quarter of such a roll.
pub fn apply_combat_result(character: &mut Character, won: bool, dice: &mut Dice, data: &GameData) -> CombatRewards {
    let level = character.level as i32;
    let roll = dice.int(level * 10, level * 20) as i64;
    if !won {
        let loss = (roll as f64 / 4.0).round() as i64;
        let xp = gain_xp(character, -loss, data);
        return CombatRewards { won, xp, items: Vec::new() };
    }

    let xp = gain_xp(character, roll, data);
    let count = dice.int(1, 4) as usize;
    let items = generate_weighted_rewards(character.level, count, dice, data)
        .into_iter()
        .filter(|item| add_item_to_inventory(character, item.clone()) != InventoryAdd::RejectedDuplicateMythic)
        .collect();
    CombatRewards { won, xp, items }
}

/// Move `amount` floating points into `stat`. Anything above the cap flows back.
pub fn spend_floating_points(
    character: &mut Character,
    stat: Stat,
    amount: u32,
    data: &GameData,
) -> Result<StatGain, Declined> {
    if amount == 0 || amount > character.floating_stat_points {
        return Err(Declined::InsufficientPoints {
            requested: amount,
            available: character.floating_stat_points,
        });
    }
    character.floating_stat_points -= amount;
    Ok(apply_stat_gain(character, stat, amount as i32, data))
}

/// Consume one stat crystal and bank its value as floating points.
/// Returns the new floating total.
pub fn use_stat_crystal(character: &mut Character, item_name: &str) -> Result<u32, Declined> {
    let value = character
        .inventory
        .iter()
        .find(|i| i.name == item_name && i.item_type == STAT_POINT_ITEM && i.quantity > 0)
        .map(|i| i.value.unwrap_or(1))
        .ok_or_else(|| Declined::ItemNotHeld { item: item_name.to_string() })?;
    remove_item(character, item_name, 1);
    character.floating_stat_points += value;
    info!(name = character.name(), item = item_name, value, "stat crystal used");
    Ok(character.floating_stat_points)
}
