use std::collections::BTreeSet;

use crate::constants::MAX_LEADERS;
use crate::engine::state::GameState;
use crate::tokens::TokenRegistry;

#[derive(Debug, Clone)]
pub struct InvariantViolation {
    pub msg: String,
}

impl InvariantViolation {
    fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

/// `total_supply == Σ balances == total_minted − total_burned`
pub fn assert_ledger_conservation(state: &GameState) -> Result<(), InvariantViolation> {
    let ledger = &state.ledger;
    let sum = ledger
        .sum_balances()
        .ok_or_else(|| InvariantViolation::new("balance sum overflows"))?;
    if sum != ledger.total_supply() {
        return Err(InvariantViolation::new(format!(
            "balances sum to {} but supply is {}",
            sum,
            ledger.total_supply()
        )));
    }
    if ledger.total_minted().checked_sub(ledger.total_burned()) != Some(ledger.total_supply()) {
        return Err(InvariantViolation::new("supply differs from minted minus burned"));
    }
    Ok(())
}

/// Every contributed unit was either paid to a leader or retained.
pub fn assert_native_conservation(state: &GameState) -> Result<(), InvariantViolation> {
    let paid = state
        .total_payouts()
        .map_err(|_| InvariantViolation::new("payout sum overflows"))?;
    if paid.checked_add(state.retained) != Some(state.total_contributed) {
        return Err(InvariantViolation::new(format!(
            "contributed {} but paid {} + retained {}",
            state.total_contributed, paid, state.retained
        )));
    }
    Ok(())
}

pub fn assert_capacity(state: &GameState) -> Result<(), InvariantViolation> {
    if state.board.len() > MAX_LEADERS {
        return Err(InvariantViolation::new(format!("{} slots occupied", state.board.len())));
    }
    Ok(())
}

/// Token holders and forwards are real identities; approvals point at minted tokens.
pub fn assert_token_sync(state: &GameState) -> Result<(), InvariantViolation> {
    for (id, slot) in state.board.iter() {
        if slot.owner.is_zero() {
            return Err(InvariantViolation::new(format!("slot {} owned by zero address", id)));
        }
        if slot.forward.map_or(false, |f| f.is_zero()) {
            return Err(InvariantViolation::new(format!("slot {} forwards to zero address", id)));
        }
    }
    let holders: BTreeSet<_> = state.board.iter().map(|(_, s)| s.owner).collect();
    let held: usize = holders.iter().map(|h| TokenRegistry::balance_of(&state.board, h)).sum();
    if held != TokenRegistry::total_supply(&state.board) {
        return Err(InvariantViolation::new("token balances do not cover every slot"));
    }
    for (id, _) in state.tokens.approvals() {
        if !TokenRegistry::exists(&state.board, *id) {
            return Err(InvariantViolation::new(format!("approval for unminted token {}", id)));
        }
    }
    Ok(())
}

pub fn assert_children_unique(state: &GameState) -> Result<(), InvariantViolation> {
    let mut seen = BTreeSet::new();
    for child in &state.children {
        if !seen.insert(*child) || *child == state.address {
            return Err(InvariantViolation::new(format!("duplicate child {}", child)));
        }
    }
    if (state.children.len() as u64) > state.child_nonce {
        return Err(InvariantViolation::new("more children than nonces issued"));
    }
    Ok(())
}

pub fn check_all(state: &GameState) -> Result<(), InvariantViolation> {
    assert_ledger_conservation(state)?;
    assert_native_conservation(state)?;
    assert_capacity(state)?;
    assert_token_sync(state)?;
    assert_children_unique(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::types::Address;

    fn state() -> GameState {
        GameState::new(Address::from_label("game"), Address::from_label("dep"), GameConfig::empty())
    }

    #[test]
    fn test_fresh_state_is_consistent() {
        assert!(check_all(&state()).is_ok());
    }

    #[test]
    fn test_detects_unbalanced_native_totals() {
        let mut s = state();
        s.total_contributed = 10;
        s.retained = 4;
        let v = assert_native_conservation(&s).unwrap_err();
        assert!(v.msg.contains("contributed 10"));
    }

    #[test]
    fn test_detects_duplicate_child() {
        let mut s = state();
        let c = Address::from_label("child");
        s.children = vec![c, c];
        s.child_nonce = 2;
        assert!(assert_children_unique(&s).is_err());
    }
}
