//! Headless spin simulator
//!
//! Usage:
//!   rf-spin --spins 1000 --bet 2            - Farm game, random seed
//!   rf-spin --config game.yaml --seed 7     - Custom game, reproducible
//!   rf-spin --wallet wallet.json            - Keep the balance between runs
//!   rf-spin --print-config                  - Dump the default game as JSON

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use rf_spin::{GameConfig, JsonFileWalletStore, SpinCoordinator, Wallet};

#[derive(Parser)]
#[command(name = "rf-spin", about = "Headless reel spin simulator")]
struct Cli {
    /// Game config (.json, .yaml or .yml); built-in farm game if omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of spins to play
    #[arg(short = 'n', long, default_value_t = 100)]
    spins: u64,

    /// Bet per spin; the wallet's bet if omitted
    #[arg(short, long)]
    bet: Option<f64>,

    /// RNG seed (overrides the config)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Simulated frame rate
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Persist the wallet to this JSON file
    #[arg(short, long)]
    wallet: Option<PathBuf>,

    /// Print the effective game config and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut game = match &cli.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("Failed to load game config {}", path.display()))?,
        None => GameConfig::default(),
    };
    if let Some(seed) = cli.seed {
        game.spin.seed = Some(seed);
    }

    if cli.print_config {
        println!("{}", game.to_json()?);
        return Ok(());
    }

    if !cli.fps.is_finite() || cli.fps <= 0.0 {
        bail!("--fps must be a positive number, got {}", cli.fps);
    }
    let dt = 1.0 / cli.fps;

    let defaults = game.wallet;
    let wallet = match &cli.wallet {
        Some(path) => Wallet::open(
            Box::new(JsonFileWalletStore::new(path)),
            defaults.starting_coins,
            defaults.default_bet,
        )
        .with_context(|| format!("Failed to open wallet {}", path.display()))?,
        None => Wallet::new(defaults.starting_coins, defaults.default_bet),
    };

    let mut coordinator =
        SpinCoordinator::from_game(&game, wallet).context("Failed to build spin coordinator")?;
    if let Some(bet) = cli.bet {
        coordinator.wallet_mut().set_bet(bet).context("Invalid --bet")?;
    }

    log::info!(
        "Playing {} spins of '{}' at {} fps",
        cli.spins,
        game.name,
        cli.fps
    );

    for round in 1..=cli.spins {
        let bet = coordinator.wallet().bet();
        if !coordinator.wallet().can_afford(bet) {
            log::warn!(
                "Out of coins after {} spins ({} left, bet {})",
                round - 1,
                coordinator.wallet().coins(),
                bet
            );
            break;
        }

        let outcome = coordinator
            .run_spin(bet, dt)
            .with_context(|| format!("Spin {round} failed"))?;
        for line in &outcome.evaluation.win_lines {
            log::debug!(
                "  {} x{} ({:?}) pays {}",
                line.symbol,
                line.count,
                line.direction,
                line.payout
            );
        }
    }

    let stats = coordinator.stats();
    log::info!(
        "Session: {} spins, bet {:.2}, won {:.2}, RTP {:.2}%, hit rate {:.2}%, best {:.1}x",
        stats.total_spins,
        stats.total_bet,
        stats.total_win,
        stats.rtp(),
        stats.hit_rate(),
        stats.max_win_ratio
    );
    log::info!("Balance: {:.2} coins", coordinator.wallet().coins());
    coordinator.wallet().save().context("Failed to save wallet")?;

    Ok(())
}
