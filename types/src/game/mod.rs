mod account;
mod constants;
mod leaderboard;
mod outcome;
mod round;

pub use account::*;
pub use constants::*;
pub use leaderboard::*;
pub use outcome::*;
pub use round::*;
