/// Starting balance for lazily created accounts
pub const STARTING_SCORE: i64 = 1_000_000;

/// Nickname assigned to accounts that never set one
pub const DEFAULT_NICKNAME: &str = "Guest";

/// Points granted by a free bonus claim
pub const BONUS_AMOUNT: i64 = 100_000;

/// A bonus may only be claimed while the balance is at or below this value
pub const BONUS_BALANCE_CEILING: i64 = 1_000;

/// Number of past rolls kept in the history (most recent first)
pub const HISTORY_CAPACITY: usize = 100;

/// Number of accounts kept in the ranking snapshot
pub const RANKING_SIZE: usize = 10;

/// Characters of the uid shown in the ranking when an account has no nickname
pub const UID_PREFIX_LENGTH: usize = 6;

/// Default length of the selection window in seconds
pub const SELECTING_SECS: u64 = 15;

/// Default length of the result window in seconds
pub const RESOLVING_SECS: u64 = 5;

/// Nickname length bounds (in characters, inclusive)
pub const MIN_NICKNAME_LENGTH: usize = 2;
pub const MAX_NICKNAME_LENGTH: usize = 12;

/// Number of faces on each die
pub const DIE_FACES: u8 = 6;
