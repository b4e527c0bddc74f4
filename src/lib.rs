//! Value-ranked leaderboard: contributions are shared among at most
//! [`constants::MAX_LEADERS`] leaders, outbid leaders are evicted, and value
//! that cannot take a seat becomes redeemable balance.

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod factory;
pub mod leaderboard;
pub mod ledger;
pub mod logging;
pub mod script;
pub mod service;
pub mod tokens;
pub mod types;
pub mod verify;

pub use config::GameConfig;
pub use engine::reducer::Op;
pub use engine::{Game, GameSnapshot};
pub use error::{ErrorKind, GameError, GameResult};
pub use types::{Address, Amount, SlotId};
