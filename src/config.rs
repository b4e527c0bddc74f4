//! Instance and process configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_COLORS, DEFAULT_INITIAL_AMOUNT};
use crate::error::{GameError, GameResult};
use crate::types::{amount_str, parse_units, Address, Amount};

/// Per-instance parameters. Presentation only: nothing here changes the
/// accounting rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Four CSS hex colors (`#rgb` or `#rrggbb`) used by token artwork.
    pub colors: Vec<String>,
    /// Contribution credited to the deployer's seed slot 0; zero starts empty.
    #[serde(with = "amount_str", default = "default_initial_amount")]
    pub initial_amount: Amount,
}

fn default_initial_amount() -> Amount {
    DEFAULT_INITIAL_AMOUNT
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS.iter().map(|c| c.to_string()).collect(),
            initial_amount: DEFAULT_INITIAL_AMOUNT,
        }
    }
}

impl GameConfig {
    pub fn with_colors(colors: &[&str]) -> Self {
        Self { colors: colors.iter().map(|c| c.to_string()).collect(), ..Self::default() }
    }

    /// An instance that starts with no leaders.
    pub fn empty() -> Self {
        Self { initial_amount: 0, ..Self::default() }
    }

    pub fn validate(&self) -> GameResult<()> {
        if self.colors.len() != 4 {
            return Err(GameError::InvalidConfig(format!(
                "expected 4 colors, got {}",
                self.colors.len()
            )));
        }
        for c in &self.colors {
            if !is_hex_color(c) {
                return Err(GameError::InvalidConfig(format!("bad color {:?}", c)));
            }
        }
        Ok(())
    }
}

fn is_hex_color(s: &str) -> bool {
    match s.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Process configuration for the binaries.
#[derive(Debug, Clone)]
pub struct Config {
    pub deployer: Address,
    pub game: GameConfig,
    pub script_path: Option<String>,
    pub snapshot_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let deployer = std::env::var("DEPLOYER")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| Address::from_label("deployer"));
        let colors = std::env::var("COLORS")
            .ok()
            .map(|v| v.split(',').map(|c| c.trim().to_string()).collect())
            .unwrap_or_else(|| GameConfig::default().colors);
        let initial_amount = std::env::var("INITIAL_AMOUNT")
            .ok()
            .and_then(|v| parse_units(&v))
            .unwrap_or(DEFAULT_INITIAL_AMOUNT);
        Self {
            deployer,
            game: GameConfig { colors, initial_amount },
            script_path: std::env::var("SCRIPT_PATH").ok(),
            snapshot_path: std::env::var("SNAPSHOT_PATH").ok(),
        }
    }
}
