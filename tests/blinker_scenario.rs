use life_synth::analyzer::global_activity;
use life_synth::automaton::{Board, NEWBORN, advance, set_cell};
use life_synth::make_rng;

#[test]
fn cleared_board_then_blinker() {
    let mut rng = make_rng(Some(1));
    let board = Board::initialize(10, 10, false, 0.37, &mut rng);
    assert_eq!(board.population(), 0);

    let board = advance(&board);
    assert_eq!(board, Board::new(10, 10));

    let board = set_cell(&board, 5, 5, 1);
    let board = set_cell(&board, 5, 6, 1);
    let board = set_cell(&board, 5, 4, 1);

    let vertical = advance(&board);
    assert_eq!(vertical.population(), 3);
    assert_eq!(vertical.get(4, 5), NEWBORN);
    assert_eq!(vertical.get(5, 5), 2);
    assert_eq!(vertical.get(6, 5), NEWBORN);
    assert_eq!(vertical.get(5, 4), 0);
    assert_eq!(vertical.get(5, 6), 0);

    let activity = global_activity(&vertical);
    assert_eq!(activity.active, 3);
    assert!((activity.average_age - 4.0 / 3.0).abs() < 1e-6);

    let horizontal = advance(&vertical);
    assert_eq!(horizontal.get(5, 4), NEWBORN);
    assert_eq!(horizontal.get(5, 5), 3);
    assert_eq!(horizontal.get(5, 6), NEWBORN);
    assert_eq!(horizontal.population(), 3);
}

#[test]
fn blinker_center_eventually_settles() {
    let mut board = Board::new(10, 10);
    for col in 4..7 {
        board = set_cell(&board, 5, col, 1);
    }
    for _ in 0..12 {
        board = advance(&board);
    }
    assert_eq!(board.get(5, 5), 7);
    // The centre no longer counts as active; the oscillating ends do.
    assert_eq!(global_activity(&board).active, 2);
}
