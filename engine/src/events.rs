use serde::Serialize;

use crate::character::InventoryItem;
use crate::combat::Side;
use crate::generation::{GenerationStep, StepOutcome};

/// Discrete things a presentation layer renders, in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    StepResolved {
        step: GenerationStep,
        outcome: StepOutcome,
    },
    TurnLog {
        turn: u32,
        actor: Side,
        line: String,
    },
    CombatEnded {
        winner: Side,
        turns: u32,
    },
    RewardGranted {
        item: InventoryItem,
    },
    XpChanged {
        before: u32,
        after: u32,
    },
    LevelUp {
        level: u32,
    },
}
