//! Game record, players and cards as they are persisted and broadcast.
//!
//! Field names serialize in camelCase so the stored document and the
//! snapshots pushed to clients share one layout.

use super::{
    constants::{
        CARD_SIZE, FREE_CELL, GAME_CODE_ALPHABET, GAME_CODE_LEN, MAX_NAME_LEN, MAX_NUMBER,
        column_range,
    },
    errors::{GameError, InvalidGameCode, InvariantViolation},
    rules::GameRules,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::HashSet, fmt, str::FromStr};

/// Label the FREE cell serializes as.
pub const FREE_LABEL: &str = "FREE";

/// Four-character game code, always uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GameCode(String);

impl GameCode {
    /// Parse user input. Codes are case-insensitive and surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, InvalidGameCode> {
        let normalized = input.trim().to_ascii_uppercase();
        let valid = normalized.len() == GAME_CODE_LEN
            && normalized.bytes().all(|b| GAME_CODE_ALPHABET.contains(&b));

        if valid {
            Ok(Self(normalized))
        } else {
            Err(InvalidGameCode(input.to_string()))
        }
    }

    /// Draw a random code.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..GAME_CODE_LEN)
            .map(|_| GAME_CODE_ALPHABET[rng.random_range(0..GAME_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GameCode {
    type Error = InvalidGameCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<GameCode> for String {
    fn from(code: GameCode) -> Self {
        code.0
    }
}

impl FromStr for GameCode {
    type Err = InvalidGameCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for GameCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque per-session identity. Only compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identity.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One square of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Number(u8),
    Free,
}

impl Cell {
    /// The number in this cell, `None` for FREE.
    pub fn number(self) -> Option<u8> {
        match self {
            Cell::Number(n) => Some(n),
            Cell::Free => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Free => f.write_str(FREE_LABEL),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Number(n) => serializer.serialize_u8(*n),
            Cell::Free => serializer.serialize_str(FREE_LABEL),
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u8),
            Label(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Cell::Number(n)),
            Raw::Label(label) if label == FREE_LABEL => Ok(Cell::Free),
            Raw::Label(other) => Err(serde::de::Error::custom(format!(
                "unexpected cell label {other:?}"
            ))),
        }
    }
}

/// 5x5 grid indexed `[row][col]`.
pub type CardGrid = [[Cell; CARD_SIZE]; CARD_SIZE];

/// A card and the numbers its owner paid to mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BingoCard {
    pub card_data: CardGrid,
    #[serde(default)]
    pub manually_marked_numbers: Vec<u8>,
}

impl BingoCard {
    pub fn new(card_data: CardGrid) -> Self {
        Self {
            card_data,
            manually_marked_numbers: Vec::new(),
        }
    }

    /// Build a card from plain numbers laid out `[row][col]`. The center value is
    /// replaced by FREE.
    pub fn from_rows(rows: [[u8; CARD_SIZE]; CARD_SIZE]) -> Self {
        let mut grid = [[Cell::Free; CARD_SIZE]; CARD_SIZE];
        for (row, values) in rows.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                grid[row][col] = Cell::Number(*value);
            }
        }
        grid[FREE_CELL.0][FREE_CELL.1] = Cell::Free;
        Self::new(grid)
    }

    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.card_data[row][col]
    }

    /// All non-FREE values, row by row.
    pub fn numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.card_data
            .iter()
            .flat_map(|row| row.iter().filter_map(|cell| cell.number()))
    }

    pub fn contains(&self, number: u8) -> bool {
        self.numbers().any(|n| n == number)
    }

    pub fn is_manually_marked(&self, number: u8) -> bool {
        self.manually_marked_numbers.contains(&number)
    }

    /// Check column ranges, uniqueness, FREE placement and manual marks.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let mut seen = HashSet::new();

        for (row, cells) in self.card_data.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                match cell {
                    Cell::Free if (row, col) == FREE_CELL => {}
                    Cell::Free => return Err(InvariantViolation::MisplacedFree),
                    Cell::Number(_) if (row, col) == FREE_CELL => {
                        return Err(InvariantViolation::MisplacedFree);
                    }
                    Cell::Number(value) => {
                        let (start, end) = column_range(col);
                        if !(start..=end).contains(value) {
                            return Err(InvariantViolation::ColumnRange { col, value: *value });
                        }
                        if !seen.insert(*value) {
                            return Err(InvariantViolation::DuplicateCardValue(*value));
                        }
                    }
                }
            }
        }

        let mut marked = HashSet::new();
        for &number in &self.manually_marked_numbers {
            if !seen.contains(&number) {
                return Err(InvariantViolation::ManualMarkNotOnCard(number));
            }
            if !marked.insert(number) {
                return Err(InvariantViolation::DuplicateManualMark(number));
            }
        }

        Ok(())
    }
}

/// A participant and everything they own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub coins: u32,
    pub cards: Vec<BingoCard>,
    /// Display-only projection of the closest card to a line; `None` until first computed.
    pub best_numbers_to_bingo: Option<u8>,
}

impl Player {
    pub fn new(id: PlayerId, name: String, coins: u32, first_card: BingoCard) -> Self {
        Self {
            id,
            name,
            coins,
            cards: vec![first_card],
            best_numbers_to_bingo: None,
        }
    }

    /// Trim a display name and check its length.
    pub fn normalize_name(raw: &str) -> Result<String, GameError> {
        let name = raw.trim();
        let len = name.chars().count();
        if len == 0 || len > MAX_NAME_LEN {
            return Err(GameError::InvalidName(raw.to_string()));
        }
        Ok(name.to_string())
    }

    /// Manual daubs across all cards.
    pub fn manual_daub_count(&self) -> usize {
        self.cards
            .iter()
            .map(|card| card.manually_marked_numbers.len())
            .sum()
    }

    /// Name and cards on their own. The card cap depends on the rules in
    /// force and is checked on growth only, see [`Game::validate_transition`].
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let len = self.name.chars().count();
        if len == 0 || len > MAX_NAME_LEN {
            return Err(InvariantViolation::InvalidName(self.name.clone()));
        }

        if self.cards.is_empty() {
            return Err(InvariantViolation::CardCount {
                player: self.id.clone(),
                count: self.cards.len(),
            });
        }

        self.cards.iter().try_for_each(BingoCard::validate)
    }
}

/// Lifecycle state. Ordered so that a valid transition never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Playing,
    Ended,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Waiting => write!(f, "waiting"),
            GameStatus::Playing => write!(f, "playing"),
            GameStatus::Ended => write!(f, "ended"),
        }
    }
}

/// Authoritative state of one game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: GameCode,
    pub host_id: PlayerId,
    pub status: GameStatus,
    pub players: Vec<Player>,
    /// Call order is preserved; no value repeats.
    pub called_numbers: Vec<u8>,
    pub current_number: Option<u8>,
    /// Frozen copy of the winning player at the moment of victory.
    pub winner: Option<Player>,
    pub created_at: DateTime<Utc>,
}

/// Per-player row of the host's standings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub coins: u32,
    pub cards: usize,
    pub best_numbers_to_bingo: Option<u8>,
    pub manual_daubs: usize,
}

impl Game {
    /// New game in the lobby.
    pub fn new(id: GameCode, host_id: PlayerId) -> Self {
        Self {
            id,
            host_id,
            status: GameStatus::Waiting,
            players: Vec::new(),
            called_numbers: Vec::new(),
            current_number: None,
            winner: None,
            created_at: Utc::now(),
        }
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    pub fn is_called(&self, number: u8) -> bool {
        self.called_numbers.contains(&number)
    }

    /// Every number from 1 to 75 has been called.
    pub fn numbers_exhausted(&self) -> bool {
        self.called_numbers.len() >= MAX_NUMBER as usize
    }

    pub fn is_host(&self, id: &PlayerId) -> bool {
        &self.host_id == id
    }

    /// Players ordered by how close they are to a line (unknown counts as 5),
    /// ties kept in join order.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .players
            .iter()
            .map(|p| LeaderboardEntry {
                player_id: p.id.clone(),
                name: p.name.clone(),
                coins: p.coins,
                cards: p.cards.len(),
                best_numbers_to_bingo: p.best_numbers_to_bingo,
                manual_daubs: p.manual_daub_count(),
            })
            .collect();
        entries.sort_by_key(|e| e.best_numbers_to_bingo.unwrap_or(CARD_SIZE as u8));
        entries
    }

    /// Check the record on its own.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let mut called = HashSet::new();
        for &number in &self.called_numbers {
            if !(1..=MAX_NUMBER).contains(&number) {
                return Err(InvariantViolation::CalledOutOfRange(number));
            }
            if !called.insert(number) {
                return Err(InvariantViolation::DuplicateCall(number));
            }
        }

        if let Some(current) = self.current_number
            && !called.contains(&current)
        {
            return Err(InvariantViolation::CurrentNotCalled(current));
        }

        let mut ids = HashSet::new();
        for player in &self.players {
            if !ids.insert(&player.id) {
                return Err(InvariantViolation::DuplicatePlayer(player.id.clone()));
            }
            player.validate()?;
        }

        if self.winner.is_some() && self.status != GameStatus::Ended {
            return Err(InvariantViolation::WinnerWithoutEnd);
        }

        Ok(())
    }

    /// Check that `next` is a legal successor of `self`.
    ///
    /// A player may not end up above `rules.max_cards` by gaining cards. Hands
    /// that were already larger, e.g. dealt before the cap was lowered, stay valid.
    pub fn validate_transition(
        &self,
        next: &Game,
        rules: &GameRules,
    ) -> Result<(), InvariantViolation> {
        if next.id != self.id {
            return Err(InvariantViolation::ImmutableField("id"));
        }
        if next.host_id != self.host_id {
            return Err(InvariantViolation::ImmutableField("hostId"));
        }
        if next.created_at != self.created_at {
            return Err(InvariantViolation::ImmutableField("createdAt"));
        }

        if next.status < self.status {
            return Err(InvariantViolation::StatusRegression {
                from: self.status,
                to: next.status,
            });
        }

        if self.winner.is_some() && next.winner != self.winner {
            return Err(InvariantViolation::WinnerChanged);
        }

        if !next.called_numbers.starts_with(&self.called_numbers) {
            return Err(InvariantViolation::Shrunk);
        }

        // Players keep their slots; only the tail may grow.
        if next.players.len() < self.players.len() {
            return Err(InvariantViolation::Shrunk);
        }
        for (before, after) in self.players.iter().zip(&next.players) {
            if before.id != after.id || after.cards.len() < before.cards.len() {
                return Err(InvariantViolation::Shrunk);
            }
            for (old_card, new_card) in before.cards.iter().zip(&after.cards) {
                if old_card.card_data != new_card.card_data
                    || !new_card
                        .manually_marked_numbers
                        .starts_with(&old_card.manually_marked_numbers)
                {
                    return Err(InvariantViolation::Shrunk);
                }
            }
        }

        for player in &next.players {
            let held = self.player(&player.id).map_or(0, |p| p.cards.len());
            if player.cards.len() > held && player.cards.len() > rules.max_cards {
                return Err(InvariantViolation::CardCount {
                    player: player.id.clone(),
                    count: player.cards.len(),
                });
            }
        }

        Ok(())
    }
}
