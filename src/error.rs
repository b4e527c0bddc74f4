use thiserror::Error;

use crate::types::{Amount, SlotId};

/// Coarse failure classes callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Unauthorized,
    InsufficientBalance,
    InsufficientAllowance,
    ArithmeticOverflow,
    InstanceCreationFailed,
    Unavailable,
}

/// Every failure aborts the whole operation; no partial state survives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("contribution must be greater than zero")]
    ZeroContribution,
    #[error("zero address is not a valid participant")]
    ZeroAddress,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("sender already holds a leader slot")]
    AlreadyLeader,
    #[error("no deferred balance to claim with")]
    NothingToClaim,
    #[error("deferred balance {deferred} does not exceed lowest contribution {lowest}")]
    ClaimTooLow { deferred: Amount, lowest: Amount },
    #[error("leaderboard is full")]
    BoardFull,
    #[error("token {0} does not exist")]
    InvalidToken(SlotId),
    #[error("caller does not hold the token")]
    NotOwner,
    #[error("caller is not approved for the token")]
    NotApproved,
    #[error("insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: Amount, available: Amount },
    #[error("insufficient allowance: needed {needed}, available {available}")]
    InsufficientAllowance { needed: Amount, available: Amount },
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
    #[error("instance creation failed: {0}")]
    InstanceCreationFailed(String),
    #[error("game service stopped")]
    ServiceStopped,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::ZeroContribution
            | GameError::ZeroAddress
            | GameError::InvalidConfig(_)
            | GameError::AlreadyLeader
            | GameError::NothingToClaim
            | GameError::ClaimTooLow { .. }
            | GameError::BoardFull
            | GameError::InvalidToken(_) => ErrorKind::InvalidInput,
            GameError::NotOwner | GameError::NotApproved => ErrorKind::Unauthorized,
            GameError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            GameError::InsufficientAllowance { .. } => ErrorKind::InsufficientAllowance,
            GameError::ArithmeticOverflow => ErrorKind::ArithmeticOverflow,
            GameError::InstanceCreationFailed(_) => ErrorKind::InstanceCreationFailed,
            GameError::ServiceStopped => ErrorKind::Unavailable,
        }
    }

    /// Short machine-readable code used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::ZeroContribution => "zero_contribution",
            GameError::ZeroAddress => "zero_address",
            GameError::InvalidConfig(_) => "invalid_config",
            GameError::AlreadyLeader => "already_leader",
            GameError::NothingToClaim => "nothing_to_claim",
            GameError::ClaimTooLow { .. } => "claim_too_low",
            GameError::BoardFull => "board_full",
            GameError::InvalidToken(_) => "invalid_token",
            GameError::NotOwner => "not_owner",
            GameError::NotApproved => "not_approved",
            GameError::InsufficientBalance { .. } => "insufficient_balance",
            GameError::InsufficientAllowance { .. } => "insufficient_allowance",
            GameError::ArithmeticOverflow => "arithmetic_overflow",
            GameError::InstanceCreationFailed(_) => "instance_creation_failed",
            GameError::ServiceStopped => "service_stopped",
        }
    }
}

pub type GameResult<T> = Result<T, GameError>;
