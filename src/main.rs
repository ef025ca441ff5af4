//! Goban-MCTS: Go rules engine and random-playout MCTS.
//!
//! ## Usage
//!
//! - `goban-mcts` - Show a demo
//! - `goban-mcts selfplay` - Let the search play both sides
//! - `goban-mcts playouts` - Win statistics from parallel random playouts
//! - `goban-mcts replay <MOVES>...` - Apply a move list and print the board

use anyhow::{Context, Result, bail, ensure};
use clap::{ArgAction, Parser, Subcommand};
use log::{LevelFilter, info};

use goban_mcts::board::{Board, Color, Move, Point};
use goban_mcts::constants::{MAX_SIZE, N_ITERATIONS, WIN_MARGIN};
use goban_mcts::mcts::{SearchNode, SearchParams, dump_children, tree_search};
use goban_mcts::playout::parallel_playouts;
use goban_mcts::record::{GameRecord, Replay};
use goban_mcts::zobrist;

/// Goban-MCTS: Go rules engine and random-playout MCTS
#[derive(Parser)]
#[command(name = "goban-mcts")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log more (-v for search summaries, -vv for per-move statistics)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a short capture and run a small search
    Demo,
    /// Let the search play a whole game against itself
    Selfplay {
        #[arg(long, default_value_t = 9)]
        size: usize,
        /// Search iterations per move
        #[arg(long, default_value_t = N_ITERATIONS)]
        iterations: usize,
        /// Stop after this many plies even if the game is not over
        #[arg(long, default_value_t = 300)]
        max_plies: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run random playouts in parallel from an empty board
    Playouts {
        #[arg(long, default_value_t = 9)]
        size: usize,
        #[arg(long, default_value_t = 10_000)]
        count: usize,
        /// Black wins when its raw score is above this
        #[arg(long, default_value_t = WIN_MARGIN, allow_negative_numbers = true)]
        margin: i32,
    },
    /// Apply moves (`row,col` or `pass`) and print the resulting board
    Replay {
        #[arg(long, default_value_t = 19)]
        size: usize,
        #[arg(long, default_value_t = 0.0)]
        komi: f32,
        /// Handicap stone, may be repeated
        #[arg(long = "handicap")]
        handicaps: Vec<Move>,
        moves: Vec<Move>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    simple_logging::log_to_stderr(level);
    zobrist::init();

    match cli.command {
        Some(Commands::Selfplay {
            size,
            iterations,
            max_plies,
            seed,
        }) => selfplay(size, iterations, max_plies, seed),
        Some(Commands::Playouts {
            size,
            count,
            margin,
        }) => {
            check_size(size)?;
            let summary = parallel_playouts(&Board::new(size), count, margin);
            println!(
                "{} playouts on {size}x{size}: black wins {:.1}%, mean score {:+.2}",
                summary.playouts,
                summary.black_winrate() * 100.0,
                summary.mean_score()
            );
            Ok(())
        }
        Some(Commands::Replay {
            size,
            komi,
            handicaps,
            moves,
        }) => replay(size, komi, &handicaps, moves),
        Some(Commands::Demo) | None => run_demo(),
    }
}

fn check_size(size: usize) -> Result<()> {
    ensure!(
        (1..=MAX_SIZE).contains(&size),
        "board size must be between 1 and {MAX_SIZE}, got {size}"
    );
    Ok(())
}

fn replay(size: usize, komi: f32, handicaps: &[Move], moves: Vec<Move>) -> Result<()> {
    check_size(size)?;
    let handicaps = handicaps
        .iter()
        .map(|&mv| match mv {
            Move::Stone(pt) => Ok(pt),
            Move::Pass => bail!("a handicap stone cannot be a pass"),
        })
        .collect::<Result<Vec<Point>>>()?;
    ensure!(
        handicaps.iter().all(|p| (1..=size).contains(&(p.row as usize))
            && (1..=size).contains(&(p.col as usize))),
        "handicap stone off a {size}x{size} board"
    );
    let mut distinct = handicaps.clone();
    distinct.sort();
    distinct.dedup();
    ensure!(distinct.len() == handicaps.len(), "handicap stone given twice");

    let record = GameRecord {
        size,
        handicaps,
        komi,
        moves,
    };
    let mut replay = Replay::start(&record);
    while replay.step() {}
    print!("{}", replay.state());
    if replay.move_num() < record.moves.len() {
        bail!(
            "ply {} ({}) is illegal",
            replay.move_num() + 1,
            record.moves[replay.move_num()]
        );
    }
    if let Some(result) = replay.result() {
        println!("Result after komi: {result:+}");
    }
    Ok(())
}

fn selfplay(size: usize, iterations: usize, max_plies: usize, seed: Option<u64>) -> Result<()> {
    check_size(size)?;
    let mut rng = seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
    let params = SearchParams::default();

    let mut board = Board::new(size);
    let mut root = SearchNode::new(&board)?;
    for ply in 1..=max_plies {
        if board.scored() {
            break;
        }
        let mover = board.turn();
        let mv = tree_search(&mut root, iterations, &params, &mut rng)?.unwrap_or(Move::Pass);
        dump_children(&root);
        board
            .play(mv)
            .with_context(|| format!("search chose an illegal move {mv} at ply {ply}"))?;
        info!("ply {ply}: {mover} plays {mv}");

        // keep the searched subtree for the next ply
        root = match root.descend(mv) {
            Ok(child) => child,
            Err(_) => SearchNode::new(&board)?,
        };
    }

    print!("{board}");
    Ok(())
}

fn run_demo() -> Result<()> {
    println!("Goban-MCTS: Go rules engine and random-playout MCTS\n");

    println!("=== Capture Demo ===");
    let mut record = GameRecord::new(5);
    record.moves = "3,3 3,2 pass 3,4 pass 2,3 pass 4,3"
        .split_whitespace()
        .map(str::parse::<Move>)
        .collect::<Result<_, _>>()?;
    let (board, played) = record.replay();
    ensure!(played == record.moves.len(), "demo record stopped at ply {played}");
    print!("{board}");
    println!("White captures: {}\n", board.captures(Color::White));

    println!("=== MCTS Demo ===");
    let board = Board::new(5);
    let mut root = SearchNode::new(&board)?;
    let mut rng = fastrand::Rng::new();
    println!("Running 500 MCTS iterations...");
    let best = tree_search(&mut root, 500, &SearchParams::default(), &mut rng)?;
    println!("Best move: {}", best.unwrap_or(Move::Pass));
    println!("Root black winrate: {:.1}%", root.winrate() * 100.0);
    Ok(())
}
