//! Contribution settlement: proportional payouts, slot placement, eviction.
//!
//! Settlement runs in two phases. `plan_*` reads the state and performs every
//! checked computation; if it returns `Ok`, `apply` cannot hit an arithmetic
//! failure. No state is touched before a plan exists, so a rejected
//! contribution leaves no trace.

use std::collections::BTreeMap;

use super::events::Event;
use super::state::GameState;
use crate::constants::CONVERSION_RATE;
use crate::error::{GameError, GameResult};
use crate::types::{Address, Amount, SlotId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub slot: SlotId,
    pub recipient: Address,
    pub share: Amount,
}

/// What happens to the sender's standing on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Sender already leads: their slot grows.
    TopUp { slot: SlotId, contribution: Amount },
    /// Board has room: a new slot and token for the sender.
    Open { slot: SlotId, contribution: Amount, burned: Amount },
    /// Board full and the sender outbids the lowest slot.
    Evict {
        slot: SlotId,
        previous_owner: Address,
        previous_contribution: Amount,
        new_contribution: Amount,
        evicted_credit: Amount,
        burned: Amount,
    },
    /// Board full and the sender falls short: value becomes redeemable balance.
    Defer { minted: Amount },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub sender: Address,
    pub amount: Amount,
    pub payouts: Vec<Payout>,
    /// Part of `amount` not paid out (empty board, truncation remainder).
    pub remainder: Amount,
    pub placement: Placement,
}

impl Settlement {
    pub fn distributed(&self) -> Amount {
        self.payouts.iter().map(|p| p.share).sum()
    }
}

/// Proportional shares of `amount` over the current board, truncating.
///
/// The truncation remainder is not redistributed; it stays with the instance.
/// Per contribution it is below the number of paid slots, in minimal units.
pub fn shares(state: &GameState, amount: Amount) -> GameResult<(Vec<Payout>, Amount)> {
    let leader_total = state.board.total()?;
    if leader_total == 0 {
        return Ok((Vec::new(), amount));
    }
    let mut payouts = Vec::with_capacity(state.board.len());
    let mut distributed: Amount = 0;
    for (id, slot) in state.board.iter() {
        let share = mul_div(amount, slot.contribution, leader_total).ok_or(GameError::ArithmeticOverflow)?;
        if share == 0 {
            continue;
        }
        distributed = distributed.checked_add(share).ok_or(GameError::ArithmeticOverflow)?;
        payouts.push(Payout { slot: id, recipient: slot.recipient(), share });
    }
    let remainder = amount.checked_sub(distributed).ok_or(GameError::ArithmeticOverflow)?;
    Ok((payouts, remainder))
}

/// `a * b / d` truncating, with a 256-bit intermediate product.
///
/// `None` when `d == 0` or the quotient does not fit in 128 bits.
pub fn mul_div(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    let (hi, lo) = widening_mul(a, b);
    if hi == 0 {
        return Some(lo / d);
    }
    if hi >= d {
        return None;
    }
    // restoring long division of hi:lo by d; rem < d holds between steps
    let mut rem = hi;
    let mut quotient: u128 = 0;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> bit) & 1);
        quotient <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quotient |= 1;
        }
    }
    Some(quotient)
}

/// Full product of two u128 as (high, low) halves.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    let mid = (ll >> 64) + (lh & MASK) + (hl & MASK);
    let lo = (ll & MASK) | (mid << 64);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}

/// Redeemable balance expressed in contribution units.
pub fn deferred_of(state: &GameState, who: &Address) -> Amount {
    state.ledger.balance_of(who) / CONVERSION_RATE
}

pub fn plan_contribution(state: &GameState, sender: &Address, amount: Amount) -> GameResult<Settlement> {
    if amount == 0 {
        return Err(GameError::ZeroContribution);
    }
    if sender.is_zero() {
        return Err(GameError::ZeroAddress);
    }

    let (payouts, remainder) = shares(state, amount)?;

    let placement = if let Some(slot) = state.board.find(sender) {
        let current = state.board.get(slot).map(|s| s.contribution).unwrap_or(0);
        let contribution = current.checked_add(amount).ok_or(GameError::ArithmeticOverflow)?;
        Placement::TopUp { slot, contribution }
    } else if !state.board.is_full() {
        Placement::Open { slot: state.board.len(), contribution: amount, burned: 0 }
    } else {
        let deferred = deferred_of(state, sender);
        let candidate = amount.checked_add(deferred).ok_or(GameError::ArithmeticOverflow)?;
        match challenge(state, sender, candidate)? {
            Some(evict) => evict,
            None => {
                let minted = amount.checked_mul(CONVERSION_RATE).ok_or(GameError::ArithmeticOverflow)?;
                if !state.ledger.can_mint(minted) {
                    return Err(GameError::ArithmeticOverflow);
                }
                Placement::Defer { minted }
            }
        }
    };

    let settlement = Settlement { sender: *sender, amount, payouts, remainder, placement };
    check_native_totals(state, &settlement)?;
    Ok(settlement)
}

/// Re-evaluates eviction using only the sender's deferred balance.
pub fn plan_claim(state: &GameState, sender: &Address) -> GameResult<Settlement> {
    if sender.is_zero() {
        return Err(GameError::ZeroAddress);
    }
    if state.board.find(sender).is_some() {
        return Err(GameError::AlreadyLeader);
    }
    let deferred = deferred_of(state, sender);
    if deferred == 0 {
        return Err(GameError::NothingToClaim);
    }

    let placement = if !state.board.is_full() {
        Placement::Open {
            slot: state.board.len(),
            contribution: deferred,
            burned: state.ledger.balance_of(sender),
        }
    } else {
        match challenge(state, sender, deferred)? {
            Some(evict) => evict,
            None => {
                let lowest = state.board.lowest().map(|(_, s)| s.contribution).unwrap_or(0);
                return Err(GameError::ClaimTooLow { deferred, lowest });
            }
        }
    };

    Ok(Settlement { sender: *sender, amount: 0, payouts: Vec::new(), remainder: 0, placement })
}

/// Eviction placement if `candidate` strictly exceeds the lowest slot.
fn challenge(state: &GameState, sender: &Address, candidate: Amount) -> GameResult<Option<Placement>> {
    let Some((slot, victim)) = state.board.lowest() else {
        return Ok(None);
    };
    if candidate <= victim.contribution {
        return Ok(None);
    }
    let evicted_credit = victim
        .contribution
        .checked_mul(CONVERSION_RATE)
        .ok_or(GameError::ArithmeticOverflow)?;
    if !state.ledger.can_mint(evicted_credit) {
        return Err(GameError::ArithmeticOverflow);
    }
    Ok(Some(Placement::Evict {
        slot,
        previous_owner: victim.owner,
        previous_contribution: victim.contribution,
        new_contribution: candidate,
        evicted_credit,
        burned: state.ledger.balance_of(sender),
    }))
}

/// Payout accounts, retained value and the contribution counter must all absorb the settlement.
fn check_native_totals(state: &GameState, s: &Settlement) -> GameResult<()> {
    let mut per_recipient: BTreeMap<Address, Amount> = BTreeMap::new();
    for p in &s.payouts {
        let entry = per_recipient.entry(p.recipient).or_insert(0);
        *entry = entry.checked_add(p.share).ok_or(GameError::ArithmeticOverflow)?;
    }
    for (who, add) in &per_recipient {
        state.payouts_of(who).checked_add(*add).ok_or(GameError::ArithmeticOverflow)?;
    }
    state.total_payouts()?.checked_add(s.distributed()).ok_or(GameError::ArithmeticOverflow)?;
    state.retained.checked_add(s.remainder).ok_or(GameError::ArithmeticOverflow)?;
    state.total_contributed.checked_add(s.amount).ok_or(GameError::ArithmeticOverflow)?;
    Ok(())
}

/// Applies a settlement produced by `plan_*` against the same state.
pub fn apply(state: &mut GameState, s: Settlement) -> GameResult<Vec<Event>> {
    let mut events = Vec::new();
    if s.amount > 0 {
        events.push(Event::Contribution { sender: s.sender, amount: s.amount });
    }
    for p in &s.payouts {
        events.push(Event::Distribution { slot: p.slot, recipient: p.recipient, amount: p.share });
    }

    // ledger effects first: they are the only fallible steps
    match &s.placement {
        Placement::TopUp { .. } => {}
        Placement::Open { burned, .. } => {
            if *burned > 0 {
                state.ledger.burn(&s.sender, *burned)?;
            }
        }
        Placement::Evict { previous_owner, evicted_credit, burned, .. } => {
            state.ledger.mint(previous_owner, *evicted_credit)?;
            if *burned > 0 {
                state.ledger.burn(&s.sender, *burned)?;
            }
        }
        Placement::Defer { minted } => {
            state.ledger.mint(&s.sender, *minted)?;
        }
    }

    match s.placement {
        Placement::TopUp { slot, contribution } => {
            if let Some(entry) = state.board.get_mut(slot) {
                entry.contribution = contribution;
            }
        }
        Placement::Open { slot, contribution, burned } => {
            if burned > 0 {
                events.push(Event::Burn { from: s.sender, amount: burned });
            }
            let id = state.board.push(s.sender, contribution)?;
            debug_assert_eq!(id, slot);
            state.tokens.reset(id);
            events.push(Event::TokenTransfer { from: Address::ZERO, to: s.sender, token_id: id });
        }
        Placement::Evict {
            slot,
            previous_owner,
            previous_contribution,
            new_contribution,
            evicted_credit,
            burned,
        } => {
            if let Some(entry) = state.board.get_mut(slot) {
                entry.owner = s.sender;
                entry.contribution = new_contribution;
                entry.forward = None;
            }
            state.tokens.reset(slot);
            events.push(Event::Mint { to: previous_owner, amount: evicted_credit });
            if burned > 0 {
                events.push(Event::Burn { from: s.sender, amount: burned });
            }
            events.push(Event::Eviction {
                slot,
                previous_owner,
                new_owner: s.sender,
                previous_contribution,
                new_contribution,
            });
            events.push(Event::TokenTransfer { from: previous_owner, to: s.sender, token_id: slot });
        }
        Placement::Defer { minted } => {
            events.push(Event::Mint { to: s.sender, amount: minted });
            events.push(Event::Deferred { sender: s.sender, minted });
        }
    }

    for p in &s.payouts {
        *state.payouts.entry(p.recipient).or_insert(0) += p.share;
    }
    state.retained += s.remainder;
    state.total_contributed += s.amount;

    Ok(events)
}
