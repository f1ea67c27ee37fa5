use clap::Parser;
use nexus_cli::{init_tracing, load_content};
use nexus_engine::api::{simulate_duel_many, DuelConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arena-sim")]
#[command(about = "Monte Carlo sim: many AI duels against rank-matched opponents")]
struct Args {
    /// Number of duels
    #[arg(long, default_value_t = 1000)]
    trials: u32,

    /// Safety cap on turns per duel
    #[arg(long, default_value_t = 200)]
    max_turns: u32,

    /// RNG base seed (duel i uses seed+i)
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Name for freshly rolled players
    #[arg(long, default_value = "Challenger")]
    name: String,

    /// Optional character JSON (if omitted, each duel rolls a new player)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Optional content pack, JSON or YAML by extension (falls back to the built-in tables)
    #[arg(long)]
    content: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(false);
    let data = load_content(args.content.as_deref())?;

    let cfg = DuelConfig {
        seed: args.seed,
        player_name: args.name.clone(),
        player_path: args.file.as_ref().map(|p| p.display().to_string()),
        max_turns: args.max_turns,
    };
    let stats = simulate_duel_many(cfg, args.trials, &data)?;

    let pct = |n: u32| {
        if stats.samples == 0 {
            0.0
        } else {
            100.0 * n as f64 / stats.samples as f64
        }
    };
    println!("Trials: {}", stats.samples);
    println!("Player wins: {} ({:.1}%)", stats.player_wins, pct(stats.player_wins));
    println!("Opponent wins: {} ({:.1}%)", stats.opponent_wins, pct(stats.opponent_wins));
    println!("Draws: {} ({:.1}%)", stats.draws, pct(stats.draws));
    println!("Avg turns: {:.2}", stats.avg_turns);
    Ok(())
}
