//! Instance state with a deterministic digest for replay checks.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use super::events::{Event, Record};
use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::leaderboard::Leaderboard;
use crate::ledger::Ledger;
use crate::tokens::TokenRegistry;
use crate::types::{Address, Amount};

/// Everything one instance owns. Passed explicitly to the reducer; there is
/// no ambient registry.
#[derive(Debug, Clone)]
pub struct GameState {
    pub address: Address,
    /// Treasury identity the instance contributes from when seeded into a parent.
    pub wallet: Address,
    pub deployer: Address,
    pub config: GameConfig,

    pub board: Leaderboard,
    pub ledger: Ledger,
    pub tokens: TokenRegistry,

    /// Native value routed to each identity by proportional distribution.
    pub payouts: BTreeMap<Address, Amount>,
    /// Native value kept by the instance (empty-board contributions, rounding remainders).
    pub retained: Amount,
    /// Native value ever received through `contribute`.
    pub total_contributed: Amount,

    pub children: Vec<Address>,
    pub child_nonce: u64,

    /// Sequence of the next journal record
    pub seq: u64,
    /// Every event since deployment, in order. Unbounded: replay and audit
    /// read it back in full, so nothing is ever dropped.
    pub journal: Vec<Record>,
}

impl GameState {
    pub fn new(address: Address, deployer: Address, config: GameConfig) -> Self {
        Self {
            address,
            wallet: Address::derive("wallet", &address, 0),
            deployer,
            config,
            board: Leaderboard::new(),
            ledger: Ledger::new(),
            tokens: TokenRegistry::new(),
            payouts: BTreeMap::new(),
            retained: 0,
            total_contributed: 0,
            children: Vec::new(),
            child_nonce: 0,
            seq: 0,
            journal: Vec::new(),
        }
    }

    pub fn payouts_of(&self, who: &Address) -> Amount {
        self.payouts.get(who).copied().unwrap_or(0)
    }

    pub fn total_payouts(&self) -> GameResult<Amount> {
        self.payouts
            .values()
            .try_fold(0u128, |acc, v| acc.checked_add(*v))
            .ok_or(GameError::ArithmeticOverflow)
    }

    /// Appends events to the journal.
    pub(crate) fn record(&mut self, events: &[Event]) {
        for event in events {
            self.journal.push(Record { seq: self.seq, event: event.clone() });
            self.seq += 1;
        }
    }

    /// SHA-256 over the accounting state (slots, ledger, approvals, payouts, children).
    pub fn hash(&self) -> String {
        let mut h = Sha256::new();
        h.update(self.address.as_bytes());
        h.update(self.seq.to_be_bytes());

        h.update((self.board.len() as u64).to_be_bytes());
        for (id, slot) in self.board.iter() {
            h.update((id as u64).to_be_bytes());
            h.update(slot.owner.as_bytes());
            h.update(slot.contribution.to_be_bytes());
            match slot.forward {
                Some(f) => {
                    h.update([1u8]);
                    h.update(f.as_bytes());
                }
                None => h.update([0u8]),
            }
        }

        h.update(self.ledger.total_supply().to_be_bytes());
        h.update(self.ledger.total_minted().to_be_bytes());
        h.update(self.ledger.total_burned().to_be_bytes());
        for (who, bal) in self.ledger.holders() {
            h.update(who.as_bytes());
            h.update(bal.to_be_bytes());
        }
        for ((holder, spender), amt) in self.ledger.allowances() {
            h.update(holder.as_bytes());
            h.update(spender.as_bytes());
            h.update(amt.to_be_bytes());
        }

        for (id, approved) in self.tokens.approvals() {
            h.update((*id as u64).to_be_bytes());
            h.update(approved.as_bytes());
        }
        for (holder, operator) in self.tokens.operators() {
            h.update(holder.as_bytes());
            h.update(operator.as_bytes());
        }

        for (who, amt) in &self.payouts {
            h.update(who.as_bytes());
            h.update(amt.to_be_bytes());
        }
        h.update(self.retained.to_be_bytes());
        h.update(self.total_contributed.to_be_bytes());

        h.update(self.child_nonce.to_be_bytes());
        for child in &self.children {
            h.update(child.as_bytes());
        }

        hex::encode(h.finalize())
    }
}
