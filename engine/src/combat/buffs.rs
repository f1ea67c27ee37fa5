use serde::{Deserialize, Serialize};

use crate::character::{Stat, Stats};
use crate::content::FlawEffect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffKind {
    StatBoost(Stat),
    StatPenalty(Stat),
    Defending,
    DamageReduction,
    DodgeBoost,
    DamageBoost,
    /// The holder's opponent loses its next `value` turns.
    TurnSkip,
    /// Restores `value * max_hp` once, on defeat.
    Revive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffDuration {
    /// Lasts the rest of the battle (or until consumed).
    Permanent,
    Turns(u32),
}

/// A timed modifier on a combat participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buff {
    pub kind: BuffKind,
    pub value: f64,
    pub duration: BuffDuration,
    /// Set on application; the first tick only clears it.
    #[serde(default)]
    pub fresh: bool,
}

impl Buff {
    pub fn timed(kind: BuffKind, value: f64, turns: u32) -> Self {
        Self { kind, value, duration: BuffDuration::Turns(turns), fresh: true }
    }

    pub fn permanent(kind: BuffKind, value: f64) -> Self {
        Self { kind, value, duration: BuffDuration::Permanent, fresh: false }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self.duration, BuffDuration::Permanent)
    }
}

/// Permanent stat penalties a flaw imposes for the whole battle, one per stat.
pub fn flaw_penalties(effect: &FlawEffect) -> Vec<Buff> {
    if !effect.is_permanent() {
        return Vec::new();
    }
    effect
        .stat_penalty
        .iter()
        .map(|(stat, delta)| Buff::permanent(BuffKind::StatPenalty(*stat), *delta as f64))
        .collect()
}

/// Age every timed buff by one turn and drop the ones that run out.
pub fn tick_buffs(name: &str, buffs: &mut Vec<Buff>, mut log: impl FnMut(String)) {
    for buff in buffs.iter_mut() {
        if buff.fresh {
            buff.fresh = false;
            continue;
        }
        if let BuffDuration::Turns(n) = &mut buff.duration {
            *n = n.saturating_sub(1);
        }
    }
    buffs.retain(|b| {
        let expired = b.duration == BuffDuration::Turns(0);
        if expired {
            log(format!("[BUFF][{}] {:?} wears off", name, b.kind));
        }
        !expired
    });
}

/// Base stats with every boost and penalty applied; no stat goes below 0.
pub fn effective_stats(base: &Stats, buffs: &[Buff]) -> Stats {
    let mut stats = *base;
    for buff in buffs {
        if let BuffKind::StatBoost(stat) | BuffKind::StatPenalty(stat) = buff.kind {
            *stats.get_mut(stat) += buff.value.round() as i32;
        }
    }
    for stat in Stat::ALL {
        let v = stats.get_mut(stat);
        *v = (*v).max(0);
    }
    stats
}

pub fn is_defending(buffs: &[Buff]) -> bool {
    buffs.iter().any(|b| b.kind == BuffKind::Defending)
}

/// Multiplier on incoming damage from damage-reduction buffs.
pub fn incoming_damage_factor(buffs: &[Buff]) -> f64 {
    buffs
        .iter()
        .filter(|b| b.kind == BuffKind::DamageReduction)
        .map(|b| (1.0 - b.value).max(0.0))
        .product()
}

/// Multiplier on outgoing damage.
pub fn outgoing_damage_factor(buffs: &[Buff]) -> f64 {
    buffs
        .iter()
        .filter(|b| b.kind == BuffKind::DamageBoost)
        .map(|b| b.value)
        .product()
}

/// Extra dodge chance as a fraction.
pub fn dodge_bonus(buffs: &[Buff]) -> f64 {
    buffs
        .iter()
        .filter(|b| b.kind == BuffKind::DodgeBoost)
        .map(|b| b.value)
        .sum()
}

pub fn has_revive(buffs: &[Buff]) -> bool {
    buffs.iter().any(|b| b.kind == BuffKind::Revive)
}

/// Remove the first revive buff and return its restore fraction.
pub fn take_revive(buffs: &mut Vec<Buff>) -> Option<f64> {
    let idx = buffs.iter().position(|b| b.kind == BuffKind::Revive)?;
    Some(buffs.remove(idx).value)
}

/// Spend one skipped turn held against the opponent. Returns true if one was spent.
pub fn consume_turn_skip(buffs: &mut Vec<Buff>) -> bool {
    let Some(idx) = buffs
        .iter()
        .position(|b| b.kind == BuffKind::TurnSkip && b.value >= 1.0)
    else {
        return false;
    };
    buffs[idx].value -= 1.0;
    if buffs[idx].value < 1.0 {
        buffs.remove(idx);
    }
    true
}
