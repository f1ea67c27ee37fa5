use clap::{Parser, Subcommand};
use nexus_cli::{init_tracing, load_character, load_content};
use nexus_engine::generation::generate_character;
use nexus_engine::progression::generate_weighted_rewards;
use nexus_engine::rating::rating_breakdown;
use nexus_engine::{api, opponent, Character, Dice, GameData, Rank};
use std::path::PathBuf;

#[derive(Subcommand)]
enum Cmd {
    /// Roll a new character through all ten generation steps
    Generate {
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Character name
        #[arg(long, default_value = "Wanderer")]
        name: String,
        /// Also print each generation step
        #[arg(long, default_value_t = false)]
        steps: bool,
    },
    /// Recompute the Nexus Rating of a character JSON and show its breakdown
    Rate {
        /// Path to a character JSON file
        #[arg(long)]
        file: PathBuf,
    },
    /// Synthesize an AI opponent for a player rank
    Opponent {
        /// Player rank (F, E, D, C, B, A, S, SS/S+)
        #[arg(long, default_value = "F")]
        rank: Rank,
        /// RNG seed for determinism
        #[arg(long, default_value_t = 7)]
        seed: u64,
    },
    /// Run one AI-vs-AI duel and print the combat log
    Duel {
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Name for a freshly rolled player
        #[arg(long, default_value = "Challenger")]
        name: String,
        /// Optional character JSON to fight with
        #[arg(long)]
        player: Option<PathBuf>,
        /// Safety cap on turns
        #[arg(long, default_value_t = 200)]
        max_turns: u32,
        /// Print the full result as JSON instead of the log
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Draw loot from the weighted reward pool
    Rewards {
        /// Character level
        #[arg(long, default_value_t = 1)]
        level: u32,
        /// Number of items to draw
        #[arg(long, default_value_t = 5)]
        count: usize,
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Print the active game data tables as JSON
    DumpContent {
        /// Single-line JSON
        #[arg(long, default_value_t = false)]
        compact: bool,
    },
}

#[derive(Parser)]
#[command(name = "nexus-cli")]
#[command(about = "Nexus character generator and arena harness")]
struct Cli {
    /// Custom content pack (.json or .yaml); defaults to the built-in tables
    #[arg(long, global = true)]
    content: Option<PathBuf>,
    /// Show engine diagnostics on stderr
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let data = load_content(cli.content.as_deref())?;

    match cli.cmd {
        Cmd::Generate { seed, name, steps } => {
            let mut dice = Dice::from_seed(seed);
            let (character, reports) = generate_character(name, &mut dice, &data);
            if steps {
                for report in &reports {
                    println!("{}", serde_json::to_string(&report.event())?);
                }
            }
            println!("{}", serde_json::to_string_pretty(&character)?);
        }
        Cmd::Rate { file } => {
            let character = load_character(&file)?;
            let breakdown = rating_breakdown(character.sheet(), &data);
            println!("{}", serde_json::to_string_pretty(&breakdown)?);
        }
        Cmd::Opponent { rank, seed } => {
            let mut dice = Dice::from_seed(seed);
            let foe = opponent::synthesize_character(rank, &mut dice, &data);
            println!("{}", serde_json::to_string_pretty(&foe)?);
        }
        Cmd::Duel {
            seed,
            name,
            player,
            max_turns,
            json,
        } => {
            let cfg = api::DuelConfig {
                seed,
                player_name: name,
                player_path: player.map(|p| p.display().to_string()),
                max_turns,
            };
            let result = api::simulate_duel(cfg, &data)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                for line in &result.log {
                    println!("{}", line);
                }
                println!(
                    "winner={} turns={} {} ({}) hp={} vs {} ({}) hp={}",
                    result.winner,
                    result.turns,
                    result.player,
                    result.player_rank,
                    result.player_hp_end,
                    result.opponent,
                    result.opponent_rank,
                    result.opponent_hp_end
                );
            }
        }
        Cmd::Rewards { level, count, seed } => {
            let mut dice = Dice::from_seed(seed);
            for item in generate_weighted_rewards(level, count, &mut dice, &data) {
                println!("{} [{}] ({})", item.name, item.item_type, item.rarity);
            }
        }
        Cmd::DumpContent { compact } => {
            let text = if compact {
                serde_json::to_string(&data)?
            } else {
                serde_json::to_string_pretty(&data)?
            };
            println!("{}", text);
        }
    }
    Ok(())
}
