// Board features used as sonification inputs.
//
// "Active" means aged 1..=6. Cells at MAX_AGE are still alive for the
// automaton but count as settled background here.

use crate::automaton::{Board, DEAD, MAX_AGE};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Activity {
    pub active: usize,
    pub average_age: f32,
}

impl Activity {
    fn from_ages(ages: impl Iterator<Item = u8>) -> Self {
        let mut active = 0usize;
        let mut age_sum = 0u32;
        for age in ages.filter(|age| is_active(*age)) {
            active += 1;
            age_sum += age as u32;
        }
        let average_age = if active == 0 {
            0.0
        } else {
            age_sum as f32 / active as f32
        };
        Self {
            active,
            average_age,
        }
    }
}

pub fn is_active(age: u8) -> bool {
    age > DEAD && age < MAX_AGE
}

pub fn global_activity(board: &Board) -> Activity {
    Activity::from_ages(board.cells().iter().copied())
}

pub fn column_activity(board: &Board, col: usize) -> Activity {
    assert!(col < board.cols(), "column {col} outside board");
    Activity::from_ages((0..board.rows()).map(|row| board.get(row, col)))
}

/// Fraction of active cells in each column, left to right.
pub fn column_profile(board: &Board) -> Vec<f32> {
    let rows = board.rows() as f32;
    (0..board.cols())
        .map(|col| column_activity(board, col).active as f32 / rows)
        .collect()
}
