//! Random card generation.

use super::{
    constants::{CARD_SIZE, FREE_CELL, column_range},
    entities::{BingoCard, Cell},
};
use rand::{Rng, seq::SliceRandom};

/// Draw `CARD_SIZE` distinct values from a column's range, uniformly and
/// without replacement.
fn draw_column<R: Rng + ?Sized>(rng: &mut R, col: usize) -> [u8; CARD_SIZE] {
    let (start, end) = column_range(col);
    let mut pool: Vec<u8> = (start..=end).collect();
    let (drawn, _) = pool.partial_shuffle(rng, CARD_SIZE);

    let mut column = [0; CARD_SIZE];
    column.copy_from_slice(drawn);
    column
}

/// Generate a card using the given source of randomness.
pub fn generate_card_with<R: Rng + ?Sized>(rng: &mut R) -> BingoCard {
    let mut grid = [[Cell::Free; CARD_SIZE]; CARD_SIZE];

    for col in 0..CARD_SIZE {
        for (row, value) in draw_column(rng, col).into_iter().enumerate() {
            grid[row][col] = Cell::Number(value);
        }
    }
    grid[FREE_CELL.0][FREE_CELL.1] = Cell::Free;

    BingoCard::new(grid)
}

/// Generate a card from the thread-local generator.
pub fn generate_card() -> BingoCard {
    generate_card_with(&mut rand::rng())
}
