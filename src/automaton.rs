use rand::Rng;

pub const DEAD: u8 = 0;
pub const NEWBORN: u8 = 1;
pub const MAX_AGE: u8 = 7;

/// Toroidal life board. Each cell holds an age: 0 is dead, 1..=7 alive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
}

impl Board {
    pub fn new(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "board must be at least 1x1");
        Self {
            rows,
            cols,
            cells: vec![DEAD; rows * cols],
        }
    }

    /// Fresh board where every cell is independently born with probability
    /// `density` when `randomize` is set, otherwise an empty board.
    pub fn initialize<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        randomize: bool,
        density: f64,
        rng: &mut R,
    ) -> Self {
        let mut board = Self::new(rows, cols);
        if randomize {
            for cell in board.cells.iter_mut() {
                if rng.gen_bool(density) {
                    *cell = NEWBORN;
                }
            }
        }
        board
    }

    pub fn from_rows(rows: &[Vec<u8>]) -> Self {
        let height = rows.len();
        let width = rows.first().map(|row| row.len()).unwrap_or(0);
        let mut board = Self::new(height, width);
        for (row, values) in rows.iter().enumerate() {
            assert_eq!(values.len(), width, "row {row} has the wrong width");
            for (col, age) in values.iter().enumerate() {
                assert!(*age <= MAX_AGE, "age {age} above {MAX_AGE}");
                board.cells[row * width + col] = *age;
            }
        }
        board
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[self.index(row, col)]
    }

    pub fn is_alive(&self, row: usize, col: usize) -> bool {
        self.get(row, col) > DEAD
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[u8]> {
        self.cells.chunks(self.cols)
    }

    pub fn population(&self) -> usize {
        self.cells.iter().filter(|age| **age > DEAD).count()
    }

    /// Live cells among the eight neighbours, wrapping at every edge.
    pub fn live_neighbors(&self, row: usize, col: usize) -> usize {
        let up = if row == 0 { self.rows - 1 } else { row - 1 };
        let down = if row + 1 == self.rows { 0 } else { row + 1 };
        let left = if col == 0 { self.cols - 1 } else { col - 1 };
        let right = if col + 1 == self.cols { 0 } else { col + 1 };
        [
            (up, left),
            (up, col),
            (up, right),
            (row, left),
            (row, right),
            (down, left),
            (down, col),
            (down, right),
        ]
        .iter()
        .filter(|(r, c)| self.is_alive(*r, *c))
        .count()
    }

    fn index(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "cell ({row}, {col}) outside {}x{} board",
            self.rows,
            self.cols
        );
        row * self.cols + col
    }
}

/// Next generation of `board`. Survivors age by one up to `MAX_AGE`.
pub fn advance(board: &Board) -> Board {
    let mut cells = Vec::with_capacity(board.len());
    for row in 0..board.rows {
        for col in 0..board.cols {
            let age = board.get(row, col);
            let neighbors = board.live_neighbors(row, col);
            cells.push(next_age(age, neighbors));
        }
    }
    Board {
        rows: board.rows,
        cols: board.cols,
        cells,
    }
}

fn next_age(age: u8, neighbors: usize) -> u8 {
    if age > DEAD {
        match neighbors {
            2 | 3 => (age + 1).min(MAX_AGE),
            _ => DEAD,
        }
    } else if neighbors == 3 {
        NEWBORN
    } else {
        DEAD
    }
}

/// Copy of `board` with a single cell overwritten.
pub fn set_cell(board: &Board, row: usize, col: usize, age: u8) -> Board {
    assert!(age <= MAX_AGE, "age {age} above {MAX_AGE}");
    let mut next = board.clone();
    let index = next.index(row, col);
    next.cells[index] = age;
    next
}
