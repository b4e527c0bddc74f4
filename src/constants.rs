//! Fixed accounting parameters shared by every instance.

/// Number of leaderboard slots (and ownership tokens) per instance.
pub const MAX_LEADERS: usize = 12;

/// Redeemable balance units minted per unit of contribution value.
///
/// Applied in both directions: minting on eviction/deferral and converting a
/// challenger's balance back into contribution-equivalent units.
pub const CONVERSION_RATE: u128 = 100_000;

/// Minimal units per whole unit of contribution value.
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// Contribution credited to the deployer's slot 0 when no config overrides it (0.01).
pub const DEFAULT_INITIAL_AMOUNT: u128 = UNIT / 100;

pub const TOKEN_NAME: &str = "Pyramid Game";
pub const TOKEN_SYMBOL: &str = "PYRAMID";
pub const TOKEN_DECIMALS: u8 = 18;

pub const LEADER_TOKEN_NAME: &str = "Pyramid Game Leaders";
pub const LEADER_TOKEN_SYMBOL: &str = "LEADER";

/// Default palette used by instances deployed without explicit colors.
pub const DEFAULT_COLORS: [&str; 4] = ["#000", "#46ff5a", "#283fff", "#ff1b1b"];
