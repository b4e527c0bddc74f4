//! Ownership tokens, one per occupied slot (token id == slot id).
//!
//! The holder of a token *is* the slot's `owner`: the registry reads and
//! writes it through the leaderboard, so token and slot ownership cannot
//! diverge. The registry itself only tracks approvals.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{GameError, GameResult};
use crate::leaderboard::Leaderboard;
use crate::types::{Address, SlotId};

#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    approvals: BTreeMap<SlotId, Address>,
    operators: BTreeSet<(Address, Address)>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(board: &Leaderboard, id: SlotId) -> bool {
        board.get(id).is_some()
    }

    pub fn owner_of(board: &Leaderboard, id: SlotId) -> GameResult<Address> {
        board.get(id).map(|s| s.owner).ok_or(GameError::InvalidToken(id))
    }

    pub fn balance_of(board: &Leaderboard, holder: &Address) -> usize {
        board.count_owned(holder)
    }

    pub fn total_supply(board: &Leaderboard) -> usize {
        board.len()
    }

    pub fn get_approved(&self, board: &Leaderboard, id: SlotId) -> GameResult<Option<Address>> {
        Self::owner_of(board, id)?;
        Ok(self.approvals.get(&id).copied())
    }

    pub fn is_approved_for_all(&self, holder: &Address, operator: &Address) -> bool {
        self.operators.contains(&(*holder, *operator))
    }

    pub fn approvals(&self) -> impl Iterator<Item = (&SlotId, &Address)> {
        self.approvals.iter()
    }

    pub fn operators(&self) -> impl Iterator<Item = &(Address, Address)> {
        self.operators.iter()
    }

    fn may_move(&self, holder: &Address, caller: &Address, id: SlotId) -> bool {
        caller == holder
            || self.approvals.get(&id) == Some(caller)
            || self.is_approved_for_all(holder, caller)
    }

    /// Single-token approval; `None` clears it. Holder or operator only.
    pub fn approve(
        &mut self,
        board: &Leaderboard,
        caller: &Address,
        to: Option<Address>,
        id: SlotId,
    ) -> GameResult<Address> {
        let holder = Self::owner_of(board, id)?;
        if *caller != holder && !self.is_approved_for_all(&holder, caller) {
            return Err(GameError::NotApproved);
        }
        match to {
            Some(to) if to.is_zero() => return Err(GameError::ZeroAddress),
            Some(to) => {
                self.approvals.insert(id, to);
            }
            None => {
                self.approvals.remove(&id);
            }
        }
        Ok(holder)
    }

    pub fn set_approval_for_all(&mut self, holder: &Address, operator: &Address, approved: bool) -> GameResult<()> {
        if operator.is_zero() {
            return Err(GameError::ZeroAddress);
        }
        if approved {
            self.operators.insert((*holder, *operator));
        } else {
            self.operators.remove(&(*holder, *operator));
        }
        Ok(())
    }

    /// Moves token `id` from `from` to `to`, updating the slot owner in the same step.
    /// The slot's forward is left untouched.
    pub fn transfer_from(
        &mut self,
        board: &mut Leaderboard,
        caller: &Address,
        from: &Address,
        to: &Address,
        id: SlotId,
    ) -> GameResult<()> {
        let holder = Self::owner_of(board, id)?;
        if holder != *from {
            return Err(GameError::NotOwner);
        }
        if !self.may_move(&holder, caller, id) {
            return Err(GameError::NotApproved);
        }
        if to.is_zero() {
            return Err(GameError::ZeroAddress);
        }
        let slot = board.get_mut(id).ok_or(GameError::InvalidToken(id))?;
        slot.owner = *to;
        self.approvals.remove(&id);
        Ok(())
    }

    /// Engine-side reassignment (fresh slot or eviction): clears stale approvals.
    pub(crate) fn reset(&mut self, id: SlotId) {
        self.approvals.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    fn board() -> Leaderboard {
        let mut b = Leaderboard::new();
        b.push(addr("alice"), 10).unwrap();
        b.push(addr("bob"), 20).unwrap();
        b
    }

    #[test]
    fn test_owner_of_unknown_token() {
        let b = board();
        assert_eq!(TokenRegistry::owner_of(&b, 5), Err(GameError::InvalidToken(5)));
        assert!(!TokenRegistry::exists(&b, 5));
        assert_eq!(TokenRegistry::total_supply(&b), 2);
    }

    #[test]
    fn test_transfer_updates_slot_owner() {
        let mut b = board();
        let mut t = TokenRegistry::new();
        t.transfer_from(&mut b, &addr("alice"), &addr("alice"), &addr("carol"), 0).unwrap();
        assert_eq!(b.get(0).unwrap().owner, addr("carol"));
        assert_eq!(TokenRegistry::balance_of(&b, &addr("alice")), 0);
        assert_eq!(TokenRegistry::balance_of(&b, &addr("carol")), 1);
    }

    #[test]
    fn test_transfer_wrong_from() {
        let mut b = board();
        let mut t = TokenRegistry::new();
        let err = t.transfer_from(&mut b, &addr("bob"), &addr("bob"), &addr("carol"), 0).unwrap_err();
        assert_eq!(err, GameError::NotOwner);
        assert_eq!(b.get(0).unwrap().owner, addr("alice"));
    }

    #[test]
    fn test_transfer_by_stranger_rejected() {
        let mut b = board();
        let mut t = TokenRegistry::new();
        let err = t.transfer_from(&mut b, &addr("mallory"), &addr("alice"), &addr("mallory"), 0).unwrap_err();
        assert_eq!(err, GameError::NotApproved);
    }

    #[test]
    fn test_approved_spender_and_operator() {
        let mut b = board();
        let mut t = TokenRegistry::new();
        t.approve(&b, &addr("alice"), Some(addr("dave")), 0).unwrap();
        assert_eq!(t.get_approved(&b, 0).unwrap(), Some(addr("dave")));
        t.transfer_from(&mut b, &addr("dave"), &addr("alice"), &addr("erin"), 0).unwrap();
        assert_eq!(t.get_approved(&b, 0).unwrap(), None);

        t.set_approval_for_all(&addr("bob"), &addr("op"), true).unwrap();
        t.transfer_from(&mut b, &addr("op"), &addr("bob"), &addr("frank"), 1).unwrap();
        assert_eq!(b.get(1).unwrap().owner, addr("frank"));
    }

    #[test]
    fn test_forward_survives_transfer() {
        let mut b = board();
        b.get_mut(0).unwrap().forward = Some(addr("delegate"));
        let mut t = TokenRegistry::new();
        t.transfer_from(&mut b, &addr("alice"), &addr("alice"), &addr("carol"), 0).unwrap();
        assert_eq!(b.get(0).unwrap().recipient(), addr("delegate"));
    }
}
