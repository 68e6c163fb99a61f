//! Fixed dimensions of the game and the default economy values.

/// Rows and columns on a card.
pub const CARD_SIZE: usize = 5;

/// Row and column of the FREE cell.
pub const FREE_CELL: (usize, usize) = (2, 2);

/// Numbers available to each column (`B` = 1..=15, `I` = 16..=30, ...).
pub const COLUMN_SPAN: u8 = 15;

/// Highest number that can be called.
pub const MAX_NUMBER: u8 = 75;

/// Column headings.
pub const BINGO_LETTERS: [char; CARD_SIZE] = ['B', 'I', 'N', 'G', 'O'];

/// Length of a game code.
pub const GAME_CODE_LEN: usize = 4;

/// Characters a game code is drawn from.
pub const GAME_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Longest allowed player display name, in characters.
pub const MAX_NAME_LEN: usize = 20;

/// Coins a player starts with.
pub const DEFAULT_INITIAL_COINS: u32 = 100;

/// Coins credited for each newly called number found on one of a player's cards.
pub const DEFAULT_COIN_AWARD_MATCH: u32 = 10;

/// Price of marking an uncalled number by hand.
pub const DEFAULT_MANUAL_DAUB_COST: u32 = 50;

/// Price of an extra card.
pub const DEFAULT_BUY_CARD_COST: u32 = 200;

/// Coins granted by the "get coins" action.
pub const DEFAULT_ADD_COINS_AMOUNT: u32 = 500;

/// Cards a single player may hold.
pub const DEFAULT_MAX_CARDS: usize = 5;

/// Inclusive number range of a column. `col` must be below `CARD_SIZE`.
pub const fn column_range(col: usize) -> (u8, u8) {
    let start = col as u8 * COLUMN_SPAN + 1;
    (start, start + COLUMN_SPAN - 1)
}

/// Column a number belongs to, if it is callable at all.
pub fn column_of(number: u8) -> Option<usize> {
    if (1..=MAX_NUMBER).contains(&number) {
        Some(((number - 1) / COLUMN_SPAN) as usize)
    } else {
        None
    }
}

/// Heading letter for a number, e.g. `42` -> `'N'`.
pub fn letter_for(number: u8) -> Option<char> {
    column_of(number).map(|col| BINGO_LETTERS[col])
}
