//! Perft: count the leaf nodes of the legal move tree to a fixed depth.
//!
//! https://www.chessprogramming.org/Perft_Results
//!
//! Starting position:
//!
//! | Depth | Nodes           | Captures    | E.p.   | Castles | Checks    | Checkmates |
//! | ----- | --------------- | ----------- | ------ | ------- | --------- | ---------- |
//! | 1     | 20              | 0           | 0      | 0       | 0         | 0          |
//! | 2     | 400             | 0           | 0      | 0       | 0         | 0          |
//! | 3     | 8,902           | 34          | 0      | 0       | 12        | 0          |
//! | 4     | 197,281         | 1,576       | 0      | 0       | 469       | 8          |
//! | 5     | 4,865,609       | 82,719      | 258    | 0       | 27,351    | 347        |
//! | 6     | 119,060,324     | 2,812,008   | 5,248  | 0       | 809,099   | 10,828     |
//! | 7     | 3,195,901,860   | 108,329,926 | 319,617| 883,453 | 33,103,848| 435,767    |
//!
//! Three drivers share one recursion:
//! - [`Perft::execute`] walks every node.
//! - [`Perft::execute_memoized`] caches subtree counts in a [`PerftTable`].
//! - [`Perft::execute_concurrent`] hands root moves to a pool of workers, each with
//!   its own clone of the board and its own move list, sharing only the table.

use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

use crate::board::Board;
use crate::error::PerftError;
use crate::movelist::MoveList;
use crate::tt::{NoPerftTable, PerftTable};
use crate::types::Move;

/// Subtrees with fewer plies than this are counted directly rather than cached.
pub const MEMO_MIN_DEPTH: u32 = 2;

/// Default slot count for perft tables.
pub const DEFAULT_TABLE_SIZE: usize = 1 << 20;

pub struct Perft<T: PerftTable = NoPerftTable> {
    board: Board,
    move_list: MoveList,
    table: T,
}

impl Perft<NoPerftTable> {
    pub fn new(board: Board) -> Self {
        Self::with_table(board, NoPerftTable)
    }
}

impl<T: PerftTable> Perft<T> {
    pub fn with_table(board: Board, table: T) -> Self {
        Perft {
            board,
            move_list: MoveList::new(),
            table,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    /// Reset the board to the starting position.
    pub fn initialize(&mut self) {
        self.board.load_new_game_position();
    }

    pub fn execute(&mut self, depth: u32) -> u64 {
        let root_ply = self.board.ply();
        self.board.set_ply(0);
        let nodes = count_nodes(&mut self.board, &mut self.move_list, depth);
        self.board.set_ply(root_ply);
        nodes
    }

    /// Like [`Perft::execute`], reusing subtree counts from the table. Entries from
    /// earlier calls stay valid and are kept.
    pub fn execute_memoized(&mut self, depth: u32) -> u64 {
        let root_ply = self.board.ply();
        self.board.set_ply(0);
        let nodes = count_nodes_memoized(&mut self.board, &mut self.move_list, &self.table, depth);
        self.board.set_ply(root_ply);
        nodes
    }

    /// Count with `workers` threads pulling root moves from a shared queue.
    ///
    /// The table is cleared first. The board itself is only read; each worker clones it.
    pub fn execute_concurrent(&mut self, depth: u32, workers: usize) -> Result<u64, PerftError> {
        if workers == 0 {
            return Err(PerftError::InvalidWorkerCount);
        }
        if depth == 0 {
            return Ok(1);
        }

        self.table.clear();
        let mut root = self.board.clone();
        root.set_ply(0);
        root.generate_moves(&mut self.move_list);

        let (tx, rx) = crossbeam_channel::unbounded::<Move>();
        for &mv in self.move_list.get_moves(0) {
            let _ = tx.send(mv);
        }
        // workers stop once the queue is drained
        drop(tx);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("perft-{i}"))
            .build()?;

        let total = AtomicU64::new(0);
        let root = &root;
        let table = &self.table;
        let total_ref = &total;

        pool.scope(|s| {
            for id in 0..workers {
                let rx = rx.clone();
                s.spawn(move |_| {
                    debug!("perft worker {id} started");
                    let mut board = root.clone();
                    let mut list = MoveList::new();
                    let mut nodes = 0u64;
                    for mv in rx.iter() {
                        if board.make_move(mv) {
                            nodes += count_nodes_memoized(&mut board, &mut list, table, depth - 1);
                            board.unmake_move();
                        }
                    }
                    debug!("perft worker {id} finished with {nodes} nodes");
                    total_ref.fetch_add(nodes, Ordering::Relaxed);
                });
            }
        });

        Ok(total.load(Ordering::Relaxed))
    }

    /// Node count below each legal root move, in generation order.
    pub fn divide(&mut self, depth: u32) -> Vec<(Move, u64)> {
        if depth == 0 {
            return Vec::new();
        }

        let root_ply = self.board.ply();
        self.board.set_ply(0);
        self.board.generate_moves(&mut self.move_list);
        let root_moves = self.move_list.get_moves(0).to_vec();

        let mut results = Vec::with_capacity(root_moves.len());
        for mv in root_moves {
            if self.board.make_move(mv) {
                let nodes =
                    count_nodes_memoized(&mut self.board, &mut self.move_list, &self.table, depth - 1);
                self.board.unmake_move();
                results.push((mv, nodes));
            }
        }
        self.board.set_ply(root_ply);
        results
    }
}

fn count_nodes(board: &mut Board, list: &mut MoveList, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut nodes = 0;
    board.generate_moves(list);
    for idx in list.ply_range(board.ply()) {
        let mv = list.get(idx);
        if board.make_move(mv) {
            nodes += count_nodes(board, list, depth - 1);
            board.unmake_move();
        }
    }
    nodes
}

fn count_nodes_memoized<T: PerftTable>(
    board: &mut Board,
    list: &mut MoveList,
    table: &T,
    depth: u32,
) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut nodes = 0;
    board.generate_moves(list);
    for idx in list.ply_range(board.ply()) {
        let mv = list.get(idx);
        if !board.make_move(mv) {
            continue;
        }

        let remaining = depth - 1;
        if remaining >= MEMO_MIN_DEPTH {
            let hash = board.hash();
            nodes += match table.lookup(hash, remaining) {
                Some(count) => count,
                None => {
                    let count = count_nodes_memoized(board, list, table, remaining);
                    table.store(hash, remaining, count);
                    count
                }
            };
        } else {
            nodes += count_nodes_memoized(board, list, table, remaining);
        }
        board.unmake_move();
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tt::{LockedPerftTable, LocklessPerftTable};
    use crate::types::squares::*;
    use crate::types::{MoveFlag, PieceType};
    use pretty_assertions::assert_eq;

    /// Shuffle both knights out and back until `plies` moves have been played.
    fn shuffle_knights(board: &mut Board, plies: usize) {
        let cycle = [(B1, C3), (B8, C6), (C3, B1), (C6, B8)];
        for i in 0..plies {
            let (from, to) = cycle[i % cycle.len()];
            assert!(board.make_move(Move::quiet(PieceType::Knight, from, to, MoveFlag::Normal)));
        }
    }

    const START_COUNTS: [u64; 5] = [1, 20, 400, 8_902, 197_281];

    #[test]
    fn perft_start() {
        let mut perft = Perft::new(Board::start_position());
        for (depth, &expected) in START_COUNTS.iter().enumerate() {
            assert_eq!(perft.execute(depth as u32), expected, "depth {depth}");
        }
        assert_eq!(perft.board().undo_depth(), 0);
    }

    /// Run the perft test on the "position 5" from
    /// https://www.chessprogramming.org/Perft_Results
    ///
    /// Depth | Nodes
    /// ----- | -----
    /// 1     | 44
    /// 2     | 1,486
    /// 3     | 62,379
    /// 4     | 2,103,487
    #[test]
    fn perft_pos_5() {
        let board = Board::from_fen("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8").unwrap();
        let mut perft = Perft::new(board);
        let expected = [1, 44, 1_486, 62_379];
        for (depth, &nodes) in expected.iter().enumerate() {
            assert_eq!(perft.execute(depth as u32), nodes, "depth {depth}");
        }
    }

    #[test]
    fn perft_memoized_matches_plain() {
        let mut perft = Perft::with_table(Board::start_position(), LocklessPerftTable::new(1 << 16));
        assert_eq!(perft.execute_memoized(4), 197_281);
        // a second pass is served largely from the table
        assert!(perft.table().fill_rate() > 0.0);
        assert_eq!(perft.execute_memoized(4), 197_281);

        let mut locked = Perft::with_table(Board::start_position(), LockedPerftTable::new(1 << 16));
        assert_eq!(locked.execute_memoized(4), 197_281);
    }

    #[test]
    fn perft_tiny_table_still_correct() {
        let mut perft = Perft::with_table(Board::start_position(), LocklessPerftTable::new(1));
        assert_eq!(perft.execute_memoized(4), 197_281);
    }

    #[test]
    fn perft_concurrent_matches_plain() {
        let mut perft = Perft::with_table(Board::start_position(), LocklessPerftTable::new(1 << 16));
        for workers in [1, 2, 4, 6] {
            assert_eq!(perft.execute_concurrent(4, workers).unwrap(), 197_281, "{workers} workers");
        }

        let mut locked = Perft::with_table(Board::start_position(), LockedPerftTable::new(1 << 16));
        assert_eq!(locked.execute_concurrent(4, 3).unwrap(), 197_281);

        let mut plain = Perft::new(Board::start_position());
        assert_eq!(plain.execute_concurrent(3, 2).unwrap(), 8_902);
        assert_eq!(plain.execute_concurrent(0, 2).unwrap(), 1);
    }

    #[test]
    fn perft_concurrent_leaves_board_untouched() {
        let mut perft = Perft::new(Board::start_position());
        let before = perft.board().clone();
        perft.execute_concurrent(2, 2).unwrap();
        assert_eq!(perft.board(), &before);
    }

    #[test]
    fn perft_concurrent_rejects_zero_workers() {
        let mut perft = Perft::new(Board::start_position());
        assert!(matches!(
            perft.execute_concurrent(3, 0),
            Err(PerftError::InvalidWorkerCount)
        ));
    }

    #[test]
    fn perft_divide_sums_to_total() {
        let mut perft = Perft::new(Board::start_position());
        let split = perft.divide(3);
        assert_eq!(split.len(), 20);
        assert_eq!(split.iter().map(|(_, n)| n).sum::<u64>(), 8_902);
        let e2e4 = split.iter().find(|(mv, _)| mv.to_string() == "e2e4").unwrap();
        assert_eq!(e2e4.1, 600);
        assert!(perft.divide(0).is_empty());
    }

    #[test]
    fn perft_after_long_game() {
        let mut board = Board::start_position();
        shuffle_knights(&mut board, 132);
        assert!(board.ply() > crate::movelist::MAX_PLY);

        let mut perft = Perft::with_table(board, LocklessPerftTable::new(1 << 12));
        assert_eq!(perft.execute(3), 8_902);
        assert_eq!(perft.execute_memoized(3), 8_902);
        assert_eq!(perft.execute_concurrent(3, 2).unwrap(), 8_902);
        assert_eq!(perft.divide(2).len(), 20);
        assert_eq!(perft.board().ply(), 132);
    }

    #[test]
    fn perft_initialize_resets_board() {
        let board = Board::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
        let mut perft = Perft::new(board);
        assert_eq!(perft.execute(1), 14);
        perft.initialize();
        assert_eq!(perft.execute(1), 20);
    }
}
