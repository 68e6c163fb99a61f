//! Win detection.
//!
//! Everything here is a pure function of a card, the called numbers and the
//! card's manual marks. A cell counts as marked when it is FREE or its value
//! was either called or daubed by hand; both sources are equivalent.

use super::{
    constants::{CARD_SIZE, MAX_NUMBER},
    entities::{BingoCard, CardGrid, Cell, Game, Player},
};

/// Set of marked numbers, one bit per value in 1..=75.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Marks(u128);

impl Marks {
    pub fn new(called: &[u8], manual: &[u8]) -> Self {
        let mut marks = Self::default();
        called.iter().chain(manual).for_each(|&n| marks.insert(n));
        marks
    }

    pub fn insert(&mut self, number: u8) {
        if (1..=MAX_NUMBER).contains(&number) {
            self.0 |= 1u128 << number;
        }
    }

    pub fn contains(&self, number: u8) -> bool {
        (1..=MAX_NUMBER).contains(&number) && self.0 & (1u128 << number) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// One of the twelve winning lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    Row(usize),
    Column(usize),
    /// Top-left to bottom-right
    Diagonal,
    /// Top-right to bottom-left
    AntiDiagonal,
}

impl Line {
    /// Rows first, then columns, then both diagonals.
    pub fn all() -> impl Iterator<Item = Line> {
        (0..CARD_SIZE)
            .map(Line::Row)
            .chain((0..CARD_SIZE).map(Line::Column))
            .chain([Line::Diagonal, Line::AntiDiagonal])
    }

    /// `(row, col)` of each cell on the line.
    pub fn cells(self) -> [(usize, usize); CARD_SIZE] {
        std::array::from_fn(|i| match self {
            Line::Row(row) => (row, i),
            Line::Column(col) => (i, col),
            Line::Diagonal => (i, i),
            Line::AntiDiagonal => (i, CARD_SIZE - 1 - i),
        })
    }
}

/// Whether the cell at `(row, col)` counts as marked.
pub fn is_marked(grid: &CardGrid, marks: &Marks, row: usize, col: usize) -> bool {
    match grid[row][col] {
        Cell::Free => true,
        Cell::Number(n) => marks.contains(n),
    }
}

/// Unmarked cells left on a line.
pub fn unmarked_on_line(grid: &CardGrid, marks: &Marks, line: Line) -> u8 {
    line.cells()
        .iter()
        .filter(|&&(row, col)| !is_marked(grid, marks, row, col))
        .count() as u8
}

/// First fully marked line, if any.
pub fn completed_line(grid: &CardGrid, marks: &Marks) -> Option<Line> {
    Line::all().find(|&line| unmarked_on_line(grid, marks, line) == 0)
}

/// Whether any row, column or diagonal is fully marked.
pub fn has_bingo(grid: &CardGrid, called: &[u8], manual: &[u8]) -> bool {
    completed_line(grid, &Marks::new(called, manual)).is_some()
}

/// Fewest unmarked cells on any line. Zero exactly when the card has bingo;
/// otherwise a progress hint only, several lines may sit at one to go.
pub fn numbers_to_bingo(grid: &CardGrid, called: &[u8], manual: &[u8]) -> u8 {
    let marks = Marks::new(called, manual);
    Line::all()
        .map(|line| unmarked_on_line(grid, &marks, line))
        .min()
        .unwrap_or(CARD_SIZE as u8)
}

impl BingoCard {
    /// Marks from the called numbers plus this card's own daubs.
    pub fn marks(&self, called: &[u8]) -> Marks {
        Marks::new(called, &self.manually_marked_numbers)
    }

    pub fn has_bingo(&self, called: &[u8]) -> bool {
        has_bingo(&self.card_data, called, &self.manually_marked_numbers)
    }

    pub fn numbers_to_bingo(&self, called: &[u8]) -> u8 {
        numbers_to_bingo(&self.card_data, called, &self.manually_marked_numbers)
    }

    pub fn completed_line(&self, called: &[u8]) -> Option<Line> {
        completed_line(&self.card_data, &self.marks(called))
    }
}

impl Player {
    /// Best progress across all cards.
    pub fn numbers_to_bingo(&self, called: &[u8]) -> u8 {
        self.cards
            .iter()
            .map(|card| card.numbers_to_bingo(called))
            .min()
            .unwrap_or(CARD_SIZE as u8)
    }

    /// Index of the first card with a completed line.
    pub fn winning_card(&self, called: &[u8]) -> Option<usize> {
        self.cards.iter().position(|card| card.has_bingo(called))
    }

    pub fn has_bingo(&self, called: &[u8]) -> bool {
        self.winning_card(called).is_some()
    }
}

impl Game {
    /// Players holding a winning card, in join order.
    pub fn players_with_bingo(&self) -> impl Iterator<Item = &Player> {
        self.players
            .iter()
            .filter(|p| p.has_bingo(&self.called_numbers))
    }
}
