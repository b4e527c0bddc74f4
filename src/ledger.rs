//! Fungible balance ledger.
//!
//! Balances are redeemable credit granted by the engine (deferred contributions
//! and eviction payouts). Only the engine mints or burns; participants move
//! balances with `transfer` / `approve` / `transfer_from`.

use std::collections::BTreeMap;

use crate::error::{GameError, GameResult};
use crate::types::{Address, Amount};

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<(Address, Address), Amount>,
    total_supply: Amount,
    total_minted: Amount,
    total_burned: Amount,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, who: &Address) -> Amount {
        self.balances.get(who).copied().unwrap_or(0)
    }

    pub fn allowance(&self, holder: &Address, spender: &Address) -> Amount {
        self.allowances.get(&(*holder, *spender)).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn total_minted(&self) -> Amount {
        self.total_minted
    }

    pub fn total_burned(&self) -> Amount {
        self.total_burned
    }

    /// Accounts ever credited, in address order (zero balances included).
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    pub fn allowances(&self) -> impl Iterator<Item = (&(Address, Address), &Amount)> {
        self.allowances.iter()
    }

    /// Whether `mint(_, amount)` would succeed. Lets the engine check before it mutates.
    pub(crate) fn can_mint(&self, amount: Amount) -> bool {
        self.total_supply.checked_add(amount).is_some() && self.total_minted.checked_add(amount).is_some()
    }

    pub(crate) fn mint(&mut self, to: &Address, amount: Amount) -> GameResult<()> {
        if to.is_zero() {
            return Err(GameError::ZeroAddress);
        }
        let supply = self.total_supply.checked_add(amount).ok_or(GameError::ArithmeticOverflow)?;
        let minted = self.total_minted.checked_add(amount).ok_or(GameError::ArithmeticOverflow)?;
        // balance <= supply, so this cannot overflow once the supply check passed
        let entry = self.balances.entry(*to).or_insert(0);
        *entry += amount;
        self.total_supply = supply;
        self.total_minted = minted;
        Ok(())
    }

    /// Engine-only: destroys `amount` of `from`'s balance.
    pub(crate) fn burn(&mut self, from: &Address, amount: Amount) -> GameResult<()> {
        let available = self.balance_of(from);
        if amount > available {
            return Err(GameError::InsufficientBalance { needed: amount, available });
        }
        let burned = self.total_burned.checked_add(amount).ok_or(GameError::ArithmeticOverflow)?;
        if let Some(bal) = self.balances.get_mut(from) {
            *bal -= amount;
        }
        self.total_supply -= amount;
        self.total_burned = burned;
        Ok(())
    }

    pub fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> GameResult<()> {
        if to.is_zero() {
            return Err(GameError::ZeroAddress);
        }
        let available = self.balance_of(from);
        if amount > available {
            return Err(GameError::InsufficientBalance { needed: amount, available });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        if let Some(bal) = self.balances.get_mut(from) {
            *bal -= amount;
        }
        *self.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }

    pub fn approve(&mut self, holder: &Address, spender: &Address, amount: Amount) -> GameResult<()> {
        if spender.is_zero() {
            return Err(GameError::ZeroAddress);
        }
        self.allowances.insert((*holder, *spender), amount);
        Ok(())
    }

    /// Spends `spender`'s allowance over `from`. Allowance is checked before balance.
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> GameResult<()> {
        let allowed = self.allowance(from, spender);
        if amount > allowed {
            return Err(GameError::InsufficientAllowance { needed: amount, available: allowed });
        }
        self.transfer(from, to, amount)?;
        self.allowances.insert((*from, *spender), allowed - amount);
        Ok(())
    }

    /// Sum of all balances; equals `total_supply` whenever the ledger is consistent.
    pub fn sum_balances(&self) -> Option<Amount> {
        self.balances.values().try_fold(0u128, |acc, v| acc.checked_add(*v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    #[test]
    fn test_mint_tracks_supply() {
        let mut l = Ledger::new();
        l.mint(&addr("a"), 500).unwrap();
        l.mint(&addr("b"), 250).unwrap();
        assert_eq!(l.total_supply(), 750);
        assert_eq!(l.total_minted(), 750);
        assert_eq!(l.sum_balances(), Some(750));
    }

    #[test]
    fn test_mint_overflow_leaves_state() {
        let mut l = Ledger::new();
        l.mint(&addr("a"), u128::MAX).unwrap();
        assert_eq!(l.mint(&addr("b"), 1), Err(GameError::ArithmeticOverflow));
        assert_eq!(l.balance_of(&addr("b")), 0);
        assert_eq!(l.total_supply(), u128::MAX);
    }

    #[test]
    fn test_transfer_insufficient() {
        let mut l = Ledger::new();
        l.mint(&addr("a"), 10).unwrap();
        let err = l.transfer(&addr("a"), &addr("b"), 11).unwrap_err();
        assert_eq!(err, GameError::InsufficientBalance { needed: 11, available: 10 });
        l.transfer(&addr("a"), &addr("b"), 4).unwrap();
        assert_eq!(l.balance_of(&addr("a")), 6);
        assert_eq!(l.balance_of(&addr("b")), 4);
        assert_eq!(l.total_supply(), 10);
    }

    #[test]
    fn test_transfer_to_zero_rejected() {
        let mut l = Ledger::new();
        l.mint(&addr("a"), 10).unwrap();
        assert_eq!(l.transfer(&addr("a"), &Address::ZERO, 1), Err(GameError::ZeroAddress));
    }

    #[test]
    fn test_self_transfer_is_noop() {
        let mut l = Ledger::new();
        l.mint(&addr("a"), 10).unwrap();
        l.transfer(&addr("a"), &addr("a"), 10).unwrap();
        assert_eq!(l.balance_of(&addr("a")), 10);
    }

    #[test]
    fn test_allowance_consumed() {
        let mut l = Ledger::new();
        let (a, b, c) = (addr("a"), addr("b"), addr("c"));
        l.mint(&a, 100).unwrap();
        l.approve(&a, &b, 30).unwrap();
        let err = l.transfer_from(&b, &a, &c, 31).unwrap_err();
        assert_eq!(err, GameError::InsufficientAllowance { needed: 31, available: 30 });
        l.transfer_from(&b, &a, &c, 20).unwrap();
        assert_eq!(l.allowance(&a, &b), 10);
        assert_eq!(l.balance_of(&c), 20);
    }

    #[test]
    fn test_transfer_from_balance_failure_keeps_allowance() {
        let mut l = Ledger::new();
        let (a, b, c) = (addr("a"), addr("b"), addr("c"));
        l.mint(&a, 5).unwrap();
        l.approve(&a, &b, 50).unwrap();
        assert!(matches!(
            l.transfer_from(&b, &a, &c, 6),
            Err(GameError::InsufficientBalance { .. })
        ));
        assert_eq!(l.allowance(&a, &b), 50);
    }

    #[test]
    fn test_burn() {
        let mut l = Ledger::new();
        l.mint(&addr("a"), 10).unwrap();
        l.burn(&addr("a"), 10).unwrap();
        assert_eq!(l.balance_of(&addr("a")), 0);
        assert_eq!(l.total_supply(), 0);
        assert_eq!(l.total_minted() - l.total_burned(), l.total_supply());
        assert!(l.holders().any(|(a, _)| *a == addr("a")));
    }
}
