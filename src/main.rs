use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use rand::seq::SliceRandom;

use std::cmp::Ordering;
use std::io::Write;
use std::time::Duration;

use hex_ai::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Pick a Hex move with a game tree search", long_about = None)]
struct Args {
    /// Moves played so far, player one first (e.g. "f6 e7 d5")
    #[arg(short, long, default_value = "")]
    moves: String,

    /// Width and height of the board
    #[arg(short, long, default_value_t = DEFAULT_DIMENSION)]
    size: usize,

    /// Number of plies to search
    #[arg(short, long, default_value_t = 3)]
    depth: usize,

    /// Grow the full minimax tree instead of pruning with alpha-beta
    #[arg(long)]
    no_pruning: bool,

    /// Search the root moves in parallel
    #[arg(long)]
    parallel: bool,

    /// Stop expanding after this many milliseconds and play the best move so far
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Deepest ply at which a decided board ends a branch early (defaults to the board size)
    #[arg(long)]
    outcome_check_limit: Option<usize>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, log_level),
    )
    .format(|buf, record| writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args()))
    .target(env_logger::Target::Stderr)
    .init();

    let board = HexBoard::from_moves(args.size, &args.moves)?;
    let player = board.side_to_move();
    println!("{}", board);

    if let Some(winner) = board.outcome().winner() {
        println!("{:?} has already won!", winner);
        return Ok(());
    }

    let mut config = SearchConfig::default()
        .with_depth(args.depth)
        .with_pruning(!args.no_pruning)
        .with_parallel(args.parallel)
        .with_outcome_check_limit(args.outcome_check_limit);
    if let Some(ms) = args.time_limit_ms {
        config = config.with_time_limit(Duration::from_millis(ms));
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}"));
    spinner.set_message("AI is thinking...");
    spinner.enable_steady_tick(100);

    let mut solver = Solver::new(config);
    let result = solver.solve(&board, player);
    spinner.finish_and_clear();

    let best_move = match result {
        Ok(report) => {
            if let Some(score) = report.score {
                match score.partial_cmp(&0.0) {
                    Some(Ordering::Greater) => println!("{:?} is ahead, score {}", player, score),
                    Some(Ordering::Less) => println!("{:?} is behind, score {}", player, score),
                    _ => println!("The position is level"),
                }
                println!(
                    "Searched {} nodes, {} distinct positions{}",
                    report.nodes_evaluated,
                    report.transpositions,
                    if report.timed_out { " (time limit reached)" } else { "" }
                );
            } else {
                println!("Only one legal move");
            }
            report.best_move
        }
        // a failed search should not cost the game, play any legal move instead
        Err(err) => {
            warn!("search failed: {}, playing a random move", err);
            board
                .generate_moves(player)
                .choose(&mut rand::thread_rng())
                .copied()
                .ok_or(SearchError::NoLegalMoves)?
        }
    };

    println!("Best move for {:?}: {}", player, best_move);
    Ok(())
}
