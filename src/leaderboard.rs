//! Fixed-capacity leaderboard slots.
//!
//! Pure storage: slot ids are assigned in order of first occupancy and never
//! change. Distribution and eviction live in `engine`.

use serde::Serialize;

use crate::constants::MAX_LEADERS;
use crate::error::{GameError, GameResult};
use crate::types::{amount_str, Address, Amount, SlotId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub owner: Address,
    #[serde(with = "amount_str")]
    pub contribution: Amount,
    pub forward: Option<Address>,
}

impl Slot {
    pub fn new(owner: Address, contribution: Amount) -> Self {
        Self { owner, contribution, forward: None }
    }

    /// Where this slot's payouts go: the forward if set, else the owner.
    pub fn recipient(&self) -> Address {
        self.forward.unwrap_or(self.owner)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Leaderboard {
    slots: Vec<Slot>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self { slots: Vec::with_capacity(MAX_LEADERS) }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= MAX_LEADERS
    }

    pub fn get(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: SlotId) -> Option<&mut Slot> {
        self.slots.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Slot)> {
        self.slots.iter().enumerate()
    }

    /// Lowest-id slot currently owned by `owner`.
    pub fn find(&self, owner: &Address) -> Option<SlotId> {
        self.slots.iter().position(|s| s.owner == *owner)
    }

    /// Occupied slot with minimal contribution; ties go to the lowest id.
    pub fn lowest(&self) -> Option<(SlotId, &Slot)> {
        let mut best: Option<(SlotId, &Slot)> = None;
        for (id, slot) in self.slots.iter().enumerate() {
            match best {
                Some((_, b)) if slot.contribution >= b.contribution => {}
                _ => best = Some((id, slot)),
            }
        }
        best
    }

    /// Checked sum of all contributions.
    pub fn total(&self) -> GameResult<Amount> {
        self.slots
            .iter()
            .try_fold(0u128, |acc, s| acc.checked_add(s.contribution))
            .ok_or(GameError::ArithmeticOverflow)
    }

    /// Occupies the next free slot.
    pub(crate) fn push(&mut self, owner: Address, contribution: Amount) -> GameResult<SlotId> {
        if self.is_full() {
            return Err(GameError::BoardFull);
        }
        self.slots.push(Slot::new(owner, contribution));
        Ok(self.slots.len() - 1)
    }

    /// Number of slots held by `owner`.
    pub fn count_owned(&self, owner: &Address) -> usize {
        self.slots.iter().filter(|s| s.owner == *owner).count()
    }
}
