//! Count perft nodes for a position from the command line.

use std::time::Instant;

use chess_perft::board::{Board, STARTING_POSITION_FEN};
use chess_perft::perft::{Perft, DEFAULT_TABLE_SIZE};
use chess_perft::tt::{LockedPerftTable, LocklessPerftTable, NoPerftTable, PerftTable};
use clap::{Parser, ValueEnum};
use color_eyre::eyre::WrapErr;
use env_logger::Env;
use log::{debug, info};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TableKind {
    /// Two atomic words per entry, validated by an XOR tag
    Lockless,
    /// One mutex per entry
    Locked,
    /// No caching
    None,
}

#[derive(Parser, Debug)]
#[command(name = "perft")]
#[command(about = "Count leaf nodes of the legal move tree")]
struct Args {
    /// Position to count from
    #[arg(long, default_value = STARTING_POSITION_FEN)]
    fen: String,

    /// Number of plies to walk
    #[arg(short, long, default_value_t = 5)]
    depth: u32,

    /// Worker threads; more than one splits the root moves between workers
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    /// Subtree cache used by memoized and concurrent runs
    #[arg(long, value_enum, default_value_t = TableKind::Lockless)]
    table: TableKind,

    /// Cache slots, rounded down to a power of two
    #[arg(long, default_value_t = DEFAULT_TABLE_SIZE)]
    table_size: usize,

    /// Print the node count below each root move
    #[arg(long)]
    divide: bool,
}

fn run<T: PerftTable>(args: &Args, board: Board, table: T) -> color_eyre::Result<()> {
    debug!("perft table holds {} entries", table.capacity());
    let mut perft = Perft::with_table(board, table);

    let start = Instant::now();
    let nodes = if args.divide {
        let split = perft.divide(args.depth);
        for (mv, count) in &split {
            println!("{mv}: {count}");
        }
        split.iter().map(|(_, count)| count).sum::<u64>()
    } else if args.threads > 1 {
        perft.execute_concurrent(args.depth, args.threads)?
    } else if args.table == TableKind::None {
        perft.execute(args.depth)
    } else {
        perft.execute_memoized(args.depth)
    };
    let elapsed = start.elapsed();

    let nps = nodes as f64 / elapsed.as_secs_f64().max(1e-9);
    info!(
        "depth {} nodes {} time {:.3}s ({:.0} nodes/s, table {:.1}% full)",
        args.depth,
        nodes,
        elapsed.as_secs_f64(),
        nps,
        perft.table().fill_rate()
    );
    println!("{nodes}");
    Ok(())
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let board = Board::from_fen(&args.fen).wrap_err("could not load --fen")?;
    println!("{}", board.draw_board());

    match args.table {
        TableKind::Lockless => run(&args, board, LocklessPerftTable::new(args.table_size)),
        TableKind::Locked => run(&args, board, LockedPerftTable::new(args.table_size)),
        TableKind::None => run(&args, board, NoPerftTable),
    }
}
