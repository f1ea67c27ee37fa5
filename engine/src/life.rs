use serde::{Deserialize, Serialize};

/// HP before the Durability bonus.
pub const BASE_HP: f64 = 100.0;

/// `round(100 * (1 + durability / 100))`.
pub fn max_hp(durability: i32) -> i32 {
    (BASE_HP * (1.0 + durability as f64 / 100.0)).round() as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub hp: i32,
    pub max_hp: i32,
}

impl Health {
    pub fn new(max_hp: i32) -> Self {
        Self { hp: max_hp, max_hp }
    }

    pub fn is_down(&self) -> bool {
        self.hp <= 0
    }

    pub fn fraction(&self) -> f64 {
        if self.max_hp <= 0 {
            return 0.0;
        }
        self.hp as f64 / self.max_hp as f64
    }
}

/// Apply damage (HP floors at 0). Returns true if the creature dropped to 0 this call.
pub fn apply_damage(name: &str, health: &mut Health, dmg: i32, mut log: impl FnMut(String)) -> bool {
    let before = health.hp;
    health.hp = (health.hp - dmg).max(0);
    log(format!("[HP][{}] {} → {} (−{})", name, before, health.hp, dmg));
    if before > 0 && health.hp == 0 {
        log(format!("[STATE][{}] drops to 0 HP", name));
        return true;
    }
    false
}

/// Healing, capped at max HP.
pub fn heal(name: &str, health: &mut Health, amount: i32, mut log: impl FnMut(String)) {
    if amount <= 0 {
        return;
    }
    let before = health.hp;
    health.hp = (health.hp + amount).min(health.max_hp);
    log(format!(
        "[HEAL][{}] +{} HP ({} → {})",
        name, amount, before, health.hp
    ));
}

/// Bring a downed creature back at `fraction` of max HP.
pub fn revive(name: &str, health: &mut Health, fraction: f64, mut log: impl FnMut(String)) {
    let restored = (health.max_hp as f64 * fraction).round() as i32;
    health.hp = restored.clamp(1, health.max_hp.max(1));
    log(format!(
        "[REVIVE][{}] rises again with {} HP ({:.0}% of {})",
        name,
        health.hp,
        fraction * 100.0,
        health.max_hp
    ));
}
