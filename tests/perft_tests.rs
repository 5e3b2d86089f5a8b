use chess_perft::board::{Board, STARTING_POSITION_FEN};
use chess_perft::movelist::MoveList;
use chess_perft::perft::Perft;
use chess_perft::tt::{LockedPerftTable, LocklessPerftTable};
use chess_perft::types::Move;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const KIWIPETE_FEN: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const POSITION_3_FEN: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
const POSITION_4_FEN: &str = "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1";
const POSITION_5_FEN: &str = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8";

fn assert_perft(fen: &str, expected: &[u64]) {
    let mut perft = Perft::new(Board::from_fen(fen).unwrap());
    for (i, &nodes) in expected.iter().enumerate() {
        let depth = i as u32 + 1;
        assert_eq!(perft.execute(depth), nodes, "{fen} at depth {depth}");
    }
}

fn generated_moves(board: &Board) -> Vec<Move> {
    let mut list = MoveList::new();
    board.generate_moves(&mut list);
    list.get_moves(board.ply()).to_vec()
}

#[test]
fn perft_start_position() {
    assert_perft(STARTING_POSITION_FEN, &[20, 400, 8_902, 197_281, 4_865_609]);
}

#[test]
#[ignore]
fn perft_start_position_depth_6() {
    let mut perft = Perft::new(Board::start_position());
    assert_eq!(perft.execute(6), 119_060_324);
}

#[test]
fn perft_kiwipete() {
    assert_perft(KIWIPETE_FEN, &[48, 2_039, 97_862]);
}

#[test]
#[ignore]
fn perft_kiwipete_depth_4() {
    let mut perft = Perft::new(Board::from_fen(KIWIPETE_FEN).unwrap());
    assert_eq!(perft.execute(4), 4_085_603);
}

#[test]
fn perft_position_3() {
    assert_perft(POSITION_3_FEN, &[14, 191, 2_812, 43_238]);
}

#[test]
fn perft_position_4() {
    assert_perft(POSITION_4_FEN, &[6, 264, 9_467]);
}

#[test]
fn perft_position_5() {
    assert_perft(POSITION_5_FEN, &[44, 1_486, 62_379]);
}

#[test]
fn perft_concurrent_matches_single_threaded() {
    for fen in [KIWIPETE_FEN, POSITION_3_FEN, POSITION_4_FEN] {
        let mut plain = Perft::new(Board::from_fen(fen).unwrap());
        let expected = plain.execute(3);

        let mut lockless =
            Perft::with_table(Board::from_fen(fen).unwrap(), LocklessPerftTable::new(1 << 14));
        let mut locked =
            Perft::with_table(Board::from_fen(fen).unwrap(), LockedPerftTable::new(1 << 14));
        for workers in [1, 2, 4, 6] {
            assert_eq!(lockless.execute_concurrent(3, workers).unwrap(), expected, "{fen}");
            assert_eq!(locked.execute_concurrent(3, workers).unwrap(), expected, "{fen}");
        }
    }
}

#[test]
fn perft_memoized_kiwipete() {
    let mut perft =
        Perft::with_table(Board::from_fen(KIWIPETE_FEN).unwrap(), LocklessPerftTable::new(1 << 16));
    assert_eq!(perft.execute_memoized(3), 97_862);
}

/// Making and unmaking any generated move must leave generation unchanged.
#[test]
fn make_unmake_regenerates_same_moves() {
    let fens = [
        "r2qk2r/pb4pp/1n2Pb2/2B2Q2/p1p5/2P5/2B2PPP/RN2R1K1 w - - 1 0",
        STARTING_POSITION_FEN,
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
        "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2",
        "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 2",
        "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
        "rnbq1bnr/ppp1pkpp/8/3pPp2/8/8/PPPPKPPP/RNBQ1BNR w - - 0 4",
        "rnbqkbnr/p1pppppp/8/8/PpP4P/8/1P1PPPP1/RNBQKBNR b KQkq c3 0 3",
        "rnbqkbnr/p1pppppp/8/8/P6P/R1p5/1P1PPPP1/1NBQKBNR b Kkq - 0 4",
        "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPPKPPP/RNBQ1BNR b kq - 0 3",
    ];
    for fen in fens {
        let mut board = Board::from_fen(fen).unwrap();
        let expected = generated_moves(&board);
        for &mv in &expected {
            if board.make_move(mv) {
                board.unmake_move();
            }
            assert_eq!(generated_moves(&board), expected, "after {mv} in {fen}");
            assert_eq!(board.to_fen(), fen);
        }
    }
}

/// Random games: the incremental hashes must match a full recompute after every make
/// and every unmake, and unwinding must return to the starting FEN.
#[test]
fn random_playouts_keep_hashes_consistent() {
    let mut rng = StdRng::seed_from_u64(20_240_101);
    let starts = [STARTING_POSITION_FEN, KIWIPETE_FEN, POSITION_4_FEN, POSITION_5_FEN];

    for _ in 0..40 {
        let fen = starts.choose(&mut rng).copied().unwrap();
        let mut board = Board::from_fen(fen).unwrap();
        let mut played = 0;

        for _ in 0..80 {
            let mut moves = generated_moves(&board);
            moves.shuffle(&mut rng);
            let Some(&mv) = moves.iter().find(|&&mv| {
                let legal = board.make_move(mv);
                if legal {
                    board.unmake_move();
                }
                legal
            }) else {
                break;
            };

            assert!(board.make_move(mv));
            played += 1;
            assert_eq!((board.hash(), board.pawn_hash()), board.compute_hashes(), "after {mv}");
            assert!(board.validate(), "after {mv}");

            let reloaded = Board::from_fen(&board.to_fen()).unwrap();
            assert_eq!(reloaded.hash(), board.hash(), "reload of {}", board.to_fen());
        }

        for _ in 0..played {
            board.unmake_move();
            assert_eq!((board.hash(), board.pawn_hash()), board.compute_hashes());
        }
        assert_eq!(board.to_fen(), fen);
        assert_eq!(board.undo_depth(), 0);
    }
}

#[test]
fn divide_matches_execute() {
    let mut perft = Perft::new(Board::from_fen(KIWIPETE_FEN).unwrap());
    let total: u64 = perft.divide(2).iter().map(|(_, n)| n).sum();
    assert_eq!(total, perft.execute(2));
    assert_eq!(total, 2_039);
}
