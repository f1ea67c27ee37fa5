use std::collections::HashMap;
use std::fs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::character::{Character, Stat};
use crate::combat::{Action, CombatError, CombatOutcome, CombatSession, Side, TurnResult};
use crate::content::GameData;
use crate::events::EngineEvent;
use crate::generation::{StepReport, generate_character};
use crate::opponent;
use crate::persist::{self, CharacterStore, PersistError};
use crate::progression::{self, CombatRewards, StatGain, XpGain};
use crate::quests::{self, QuestCompletion, QuestTemplate};
use crate::rating::Rank;
use crate::Dice;

const DEFAULT_MAX_TURNS: u32 = 200;

/// A user action refused by a precondition. Nothing was changed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Declined {
    #[error("a character already exists for '{id}'")]
    CharacterExists { id: String },
    #[error("character name must not be empty")]
    EmptyName,
    #[error("no character for '{id}'")]
    NoCharacter { id: String },
    #[error("'{id}' is already in combat")]
    CombatInProgress { id: String },
    #[error("'{id}' is not in combat")]
    NoActiveCombat { id: String },
    #[error("the battle has not finished")]
    CombatUnfinished,
    #[error("quest '{quest}' is already active")]
    QuestActive { quest: String },
    #[error("no active quest")]
    NoActiveQuest,
    #[error("rank {actual} is below the required {required}")]
    RankTooLow { required: Rank, actual: Rank },
    #[error("unknown quest '{quest}'")]
    UnknownQuest { quest: String },
    #[error("quest '{quest}' cannot be taken this way")]
    NotAcceptable { quest: String },
    #[error("requested {requested} floating points, {available} available")]
    InsufficientPoints { requested: u32, available: u32 },
    #[error("'{item}' is not in the inventory")]
    ItemNotHeld { item: String },
    #[error("needs {required} gold, holding {held}")]
    InsufficientGold { required: u32, held: u32 },
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Declined(#[from] Declined),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Combat(#[from] CombatError),
}

/// A completed mutation and, if saving it failed, why. The in-memory state
/// stays authoritative either way.
#[derive(Debug)]
pub struct Persisted<T> {
    pub value: T,
    pub save_error: Option<PersistError>,
}

impl<T> Persisted<T> {
    pub fn is_saved(&self) -> bool {
        self.save_error.is_none()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombatReport {
    pub outcome: CombatOutcome,
    pub rewards: CombatRewards,
    pub quest: Option<QuestCompletion>,
}

impl CombatReport {
    pub fn events(&self) -> Vec<EngineEvent> {
        let mut events = vec![EngineEvent::CombatEnded {
            winner: self.outcome.winner,
            turns: self.outcome.turns,
        }];
        events.extend(self.rewards.events());
        if let Some(done) = &self.quest {
            events.extend(done.xp.events());
            events.extend(
                done.items
                    .iter()
                    .map(|item| EngineEvent::RewardGranted { item: item.clone() }),
            );
        }
        events
    }
}

/// Characters by id, backed by a store, with one combat at a time per character.
/// The roster owns each live battle; only its own sessions pay out.
pub struct Roster<S: CharacterStore> {
    store: S,
    characters: HashMap<String, Character>,
    combats: HashMap<String, CombatSession>,
}

impl<S: CharacterStore> Roster<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            characters: HashMap::new(),
            combats: HashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn is_in_combat(&self, id: &str) -> bool {
        self.combats.contains_key(id)
    }

    /// The battle `id` is fighting, if any.
    pub fn combat(&self, id: &str) -> Option<&CombatSession> {
        self.combats.get(id)
    }

    fn combat_mut(&mut self, id: &str) -> Result<&mut CombatSession, Declined> {
        self.combats
            .get_mut(id)
            .ok_or_else(|| Declined::NoActiveCombat { id: id.to_string() })
    }

    fn ensure_loaded(&mut self, id: &str) -> Result<(), ApiError> {
        if !self.characters.contains_key(id) {
            if let Some(character) = self.store.load(id)? {
                self.characters.insert(id.to_string(), character);
            }
        }
        Ok(())
    }

    fn persist(&mut self, id: &str) -> Option<PersistError> {
        let character = self.characters.get(id)?;
        match self.store.save(id, character) {
            Ok(()) => None,
            Err(err) => {
                warn!(id, %err, "save failed; keeping in-memory state");
                Some(err)
            }
        }
    }

    pub fn character(&mut self, id: &str) -> Result<Option<&Character>, ApiError> {
        self.ensure_loaded(id)?;
        Ok(self.characters.get(id))
    }

    fn mutate<T>(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Character) -> Result<T, Declined>,
    ) -> Result<Persisted<T>, ApiError> {
        self.ensure_loaded(id)?;
        let character = self
            .characters
            .get_mut(id)
            .ok_or_else(|| Declined::NoCharacter { id: id.to_string() })?;
        let value = f(character)?;
        let save_error = self.persist(id);
        Ok(Persisted { value, save_error })
    }

    /// Roll a new character for `id`. Refused if one already exists.
    pub fn create_character(
        &mut self,
        id: &str,
        name: &str,
        dice: &mut Dice,
        data: &GameData,
    ) -> Result<Persisted<(Character, Vec<StepReport>)>, ApiError> {
        if name.trim().is_empty() {
            return Err(Declined::EmptyName.into());
        }
        // an unreadable document still counts as taken; it is never overwritten
        let exists = self.characters.contains_key(id) || self.store.load(id)?.is_some();
        if exists {
            return Err(Declined::CharacterExists { id: id.to_string() }.into());
        }

        let (character, reports) = generate_character(name.trim(), dice, data);
        self.characters.insert(id.to_string(), character.clone());
        let save_error = self.persist(id);
        Ok(Persisted { value: (character, reports), save_error })
    }

    /// Synthesize an opponent at the character's rank and open a battle.
    /// Returns the opening log.
    pub fn start_combat(&mut self, id: &str, dice: &mut Dice, data: &GameData) -> Result<Vec<String>, ApiError> {
        if self.combats.contains_key(id) {
            return Err(Declined::CombatInProgress { id: id.to_string() }.into());
        }
        self.ensure_loaded(id)?;
        let player = self
            .characters
            .get(id)
            .cloned()
            .ok_or_else(|| Declined::NoCharacter { id: id.to_string() })?;
        let foe = opponent::synthesize_character(player.nexus_rank(), dice, data);
        let mut session = CombatSession::between(player, foe, data)?;
        let opening = session.start(dice, data)?;
        self.combats.insert(id.to_string(), session);
        Ok(opening)
    }

    /// Play the current side's turn of `id`'s battle with the given action.
    pub fn combat_turn(
        &mut self,
        id: &str,
        action: Action,
        dice: &mut Dice,
        data: &GameData,
    ) -> Result<TurnResult, ApiError> {
        Ok(self.combat_mut(id)?.advance_turn(action, dice, data)?)
    }

    /// Let the built-in heuristic play the current side's turn.
    pub fn auto_combat_turn(&mut self, id: &str, dice: &mut Dice, data: &GameData) -> Result<TurnResult, ApiError> {
        Ok(self.combat_mut(id)?.auto_turn(dice, data)?)
    }

    /// Walk away from a battle. Nothing about it is kept.
    pub fn leave_combat(&mut self, id: &str) -> Result<(), Declined> {
        if self.combats.remove(id).is_none() {
            return Err(Declined::NoActiveCombat { id: id.to_string() });
        }
        info!(id, "combat abandoned");
        Ok(())
    }

    /// Apply the result of `id`'s finished battle: XP, loot and quest progress.
    pub fn finish_combat(
        &mut self,
        id: &str,
        dice: &mut Dice,
        data: &GameData,
    ) -> Result<Persisted<CombatReport>, ApiError> {
        let outcome = self
            .combats
            .get(id)
            .ok_or_else(|| Declined::NoActiveCombat { id: id.to_string() })?
            .outcome()
            .ok_or(Declined::CombatUnfinished)?;
        self.combats.remove(id);
        self.mutate(id, |character| {
            let rewards =
                progression::apply_combat_result(character, outcome.winner == Side::Player, dice, data);
            let quest = quests::record_combat(character, &outcome, dice, data);
            Ok(CombatReport { outcome, rewards, quest })
        })
    }

    pub fn accept_quest(
        &mut self,
        id: &str,
        quest: &str,
        data: &GameData,
    ) -> Result<Persisted<QuestTemplate>, ApiError> {
        self.mutate(id, |c| quests::accept_quest(c, quest, data).cloned())
    }

    pub fn abandon_quest(&mut self, id: &str, data: &GameData) -> Result<Persisted<XpGain>, ApiError> {
        self.mutate(id, |c| quests::abandon_quest(c, data))
    }

    pub fn train_stat(
        &mut self,
        id: &str,
        quest: &str,
        data: &GameData,
    ) -> Result<Persisted<StatGain>, ApiError> {
        self.mutate(id, |c| quests::train_stat(c, quest, data))
    }

    pub fn spend_floating_points(
        &mut self,
        id: &str,
        stat: Stat,
        amount: u32,
        data: &GameData,
    ) -> Result<Persisted<StatGain>, ApiError> {
        self.mutate(id, |c| progression::spend_floating_points(c, stat, amount, data))
    }

    pub fn use_stat_crystal(&mut self, id: &str, item: &str) -> Result<Persisted<u32>, ApiError> {
        self.mutate(id, |c| progression::use_stat_crystal(c, item))
    }

    /// Stored characters, highest rating first.
    pub fn rankings(&self) -> Result<Vec<(String, Character)>, PersistError> {
        persist::rankings(&self.store)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct DuelConfig {
    pub seed: u64,
    pub player_name: String,
    /// Character JSON to fight with; a fresh character is rolled when absent.
    pub player_path: Option<String>,
    /// Safety cap; a battle still running after this many turns is a draw.
    pub max_turns: u32,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            player_name: "Challenger".to_string(),
            player_path: None,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DuelResult {
    pub winner: String,
    pub turns: u32,
    pub player: String,
    pub player_rank: Rank,
    pub opponent: String,
    pub opponent_rank: Rank,
    pub player_hp_end: i32,
    pub opponent_hp_end: i32,
    pub log: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DuelStats {
    pub samples: u32,
    pub player_wins: u32,
    pub opponent_wins: u32,
    pub draws: u32,
    pub avg_turns: f64,
}

fn load_character(path: &str) -> Result<Character> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read character JSON: {}", path))?;
    let character = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse character JSON: {}", path))?;
    Ok(character)
}

/// Both sides AI-driven: the configured (or a freshly rolled) player against
/// an opponent synthesized at the player's rank.
pub fn simulate_duel(cfg: DuelConfig, data: &GameData) -> Result<DuelResult> {
    let mut dice = Dice::from_seed(cfg.seed);

    let player = match &cfg.player_path {
        Some(path) => {
            let mut loaded = load_character(path)?;
            loaded.rerate(data);
            loaded
        }
        None => generate_character(cfg.player_name.as_str(), &mut dice, data).0,
    };
    let player_name = player.name().to_string();
    let player_rank = player.nexus_rank();
    let foe = opponent::synthesize_character(player_rank, &mut dice, data);
    let opponent_name = foe.name().to_string();
    let opponent_rank = foe.nexus_rank();

    let mut session = CombatSession::between(player, foe, data)?;
    let mut log = session.start(&mut dice, data)?;
    while !session.is_over() && session.turn() <= cfg.max_turns {
        let result = session.auto_turn(&mut dice, data)?;
        log.extend(result.log);
    }

    let winner = match session.outcome() {
        Some(outcome) => outcome.winner.to_string(),
        None => {
            log.push(format!("[END] no winner after {} turns", cfg.max_turns));
            "draw".to_string()
        }
    };

    Ok(DuelResult {
        winner,
        turns: session.turn().min(cfg.max_turns),
        player: player_name,
        player_rank,
        opponent: opponent_name,
        opponent_rank,
        player_hp_end: session.participant(Side::Player).health.hp,
        opponent_hp_end: session.participant(Side::Opponent).health.hp,
        log,
    })
}

/// `n` duels; sample `i` uses seed `cfg.seed + i`.
pub fn simulate_duel_many(cfg: DuelConfig, n: u32, data: &GameData) -> Result<DuelStats> {
    let mut stats = DuelStats {
        samples: n,
        player_wins: 0,
        opponent_wins: 0,
        draws: 0,
        avg_turns: 0.0,
    };
    let mut total_turns = 0u64;
    for i in 0..n {
        let sample = DuelConfig {
            seed: cfg.seed.wrapping_add(i as u64),
            ..cfg.clone()
        };
        let result = simulate_duel(sample, data)?;
        total_turns += result.turns as u64;
        match result.winner.as_str() {
            "player" => stats.player_wins += 1,
            "opponent" => stats.opponent_wins += 1,
            _ => stats.draws += 1,
        }
    }
    if n > 0 {
        stats.avg_turns = total_turns as f64 / n as f64;
    }
    Ok(stats)
}
