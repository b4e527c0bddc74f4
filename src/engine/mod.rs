//! Leaderboard instance engine.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Game (API)  │────►│   Reducer    │────►│ Distribution │
//! │  Op / views  │     │ validate+log │     │ plan → apply │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                             │                    │
//!                             ▼                    ▼
//!                      ┌──────────────┐     ┌──────────────┐
//!                      │   Journal    │◄────│  GameState   │
//!                      │  (events)    │     │  (hashed)    │
//!                      └──────────────┘     └──────────────┘
//! ```
//!
//! [`Game`] owns one [`state::GameState`]. Mutations take `&mut self`, which
//! is the whole serialization story for a single instance; see
//! [`crate::service`] for sharing one across tasks.

pub mod distribution;
pub mod events;
pub mod reducer;
pub mod state;

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::constants::{
    LEADER_TOKEN_NAME, LEADER_TOKEN_SYMBOL, TOKEN_DECIMALS, TOKEN_NAME, TOKEN_SYMBOL,
};
use crate::error::{GameError, GameResult};
use crate::logging::{self, Domain, Level};
use crate::tokens::TokenRegistry;
use crate::types::{amount_str, Address, Amount, SlotId};

use events::{Event, Record};
use reducer::{Op, ReducerOutput};
use state::GameState;

/// One occupied slot as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderView {
    pub slot: SlotId,
    pub owner: Address,
    pub recipient: Address,
    #[serde(with = "amount_str")]
    pub contribution: Amount,
}

/// Read-only copy of an instance, captured between operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub address: Address,
    pub wallet: Address,
    pub deployer: Address,
    pub config: GameConfig,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub leaders: Vec<LeaderView>,
    #[serde(with = "amount_str")]
    pub total_supply: Amount,
    #[serde(with = "amount_str")]
    pub total_minted: Amount,
    #[serde(with = "amount_str")]
    pub total_burned: Amount,
    #[serde(with = "amount_str")]
    pub total_contributed: Amount,
    #[serde(with = "amount_str")]
    pub retained: Amount,
    pub children: Vec<Address>,
    pub journal_len: u64,
    pub state_hash: String,
}

#[derive(Debug, Clone)]
pub struct Game {
    state: GameState,
}

impl Game {
    /// Root instance, addressed by its deployer.
    pub fn deploy(deployer: Address, config: GameConfig) -> GameResult<Self> {
        let address = Address::derive("instance", &deployer, 0);
        Self::create(address, deployer, config)
    }

    /// Validates `config` and seeds slot 0 for the deployer when
    /// `initial_amount` is non-zero. The seed moves no value.
    pub(crate) fn create(address: Address, deployer: Address, config: GameConfig) -> GameResult<Self> {
        config.validate()?;
        if deployer.is_zero() || address.is_zero() {
            return Err(GameError::ZeroAddress);
        }
        let initial = config.initial_amount;
        let mut state = GameState::new(address, deployer, config);
        if initial > 0 {
            let id = state.board.push(deployer, initial)?;
            state.record(&[Event::TokenTransfer { from: Address::ZERO, to: deployer, token_id: id }]);
        }
        logging::log(
            Level::Info,
            Domain::System,
            "deployed",
            logging::obj(&[
                ("instance", logging::v_addr(&address)),
                ("deployer", logging::v_addr(&deployer)),
                ("initial_amount", logging::v_amount(initial)),
            ]),
        );
        Ok(Self { state })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Runs `op` on behalf of `caller`; on error nothing changed.
    pub fn execute(&mut self, caller: Address, op: Op) -> GameResult<ReducerOutput> {
        reducer::reduce(&mut self.state, caller, op)
    }

    // === Engine operations ===

    pub fn contribute(&mut self, sender: Address, amount: Amount) -> GameResult<ReducerOutput> {
        self.execute(sender, Op::Contribute { amount })
    }

    pub fn claim_leadership(&mut self, sender: Address) -> GameResult<ReducerOutput> {
        self.execute(sender, Op::ClaimLeadership)
    }

    pub fn set_recipient(
        &mut self,
        caller: Address,
        token_id: SlotId,
        recipient: Option<Address>,
    ) -> GameResult<ReducerOutput> {
        self.execute(caller, Op::SetRecipient { token_id, recipient })
    }

    // === Ledger operations ===

    pub fn transfer(&mut self, caller: Address, to: Address, amount: Amount) -> GameResult<ReducerOutput> {
        self.execute(caller, Op::Transfer { to, amount })
    }

    pub fn approve(&mut self, caller: Address, spender: Address, amount: Amount) -> GameResult<ReducerOutput> {
        self.execute(caller, Op::Approve { spender, amount })
    }

    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> GameResult<ReducerOutput> {
        self.execute(caller, Op::TransferFrom { from, to, amount })
    }

    // === Token operations ===

    pub fn transfer_token(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        token_id: SlotId,
    ) -> GameResult<ReducerOutput> {
        self.execute(caller, Op::TransferToken { from, to, token_id })
    }

    pub fn approve_token(
        &mut self,
        caller: Address,
        to: Option<Address>,
        token_id: SlotId,
    ) -> GameResult<ReducerOutput> {
        self.execute(caller, Op::ApproveToken { to, token_id })
    }

    pub fn set_approval_for_all(
        &mut self,
        caller: Address,
        operator: Address,
        approved: bool,
    ) -> GameResult<ReducerOutput> {
        self.execute(caller, Op::SetApprovalForAll { operator, approved })
    }

    // === Instance views ===

    pub fn address(&self) -> Address {
        self.state.address
    }

    pub fn wallet(&self) -> Address {
        self.state.wallet
    }

    pub fn deployer(&self) -> Address {
        self.state.deployer
    }

    pub fn config(&self) -> &GameConfig {
        &self.state.config
    }

    pub fn state_hash(&self) -> String {
        self.state.hash()
    }

    pub fn journal(&self) -> &[Record] {
        &self.state.journal
    }

    // === Leaderboard views ===

    /// Slot with the smallest contribution (ties → lowest id).
    pub fn lowest_leader(&self) -> Option<(SlotId, Amount)> {
        self.state.board.lowest().map(|(id, s)| (id, s.contribution))
    }

    pub fn contributions(&self, slot: SlotId) -> GameResult<Amount> {
        self.state.board.get(slot).map(|s| s.contribution).ok_or(GameError::InvalidToken(slot))
    }

    pub fn contribution_total(&self) -> GameResult<Amount> {
        self.state.board.total()
    }

    pub fn recipient_of(&self, slot: SlotId) -> GameResult<Address> {
        self.state.board.get(slot).map(|s| s.recipient()).ok_or(GameError::InvalidToken(slot))
    }

    pub fn is_leader(&self, who: &Address) -> bool {
        self.state.board.find(who).is_some()
    }

    pub fn leader_slot(&self, who: &Address) -> Option<SlotId> {
        self.state.board.find(who)
    }

    pub fn leaders(&self) -> Vec<LeaderView> {
        self.state
            .board
            .iter()
            .map(|(slot, s)| LeaderView {
                slot,
                owner: s.owner,
                recipient: s.recipient(),
                contribution: s.contribution,
            })
            .collect()
    }

    pub fn payouts_of(&self, who: &Address) -> Amount {
        self.state.payouts_of(who)
    }

    pub fn retained(&self) -> Amount {
        self.state.retained
    }

    pub fn total_contributed(&self) -> Amount {
        self.state.total_contributed
    }

    /// Redeemable balance of `who`, in contribution units.
    pub fn deferred_of(&self, who: &Address) -> Amount {
        distribution::deferred_of(&self.state, who)
    }

    // === Ledger views ===

    pub fn name(&self) -> &'static str {
        TOKEN_NAME
    }

    pub fn symbol(&self) -> &'static str {
        TOKEN_SYMBOL
    }

    pub fn decimals(&self) -> u8 {
        TOKEN_DECIMALS
    }

    pub fn balance_of(&self, who: &Address) -> Amount {
        self.state.ledger.balance_of(who)
    }

    pub fn allowance(&self, holder: &Address, spender: &Address) -> Amount {
        self.state.ledger.allowance(holder, spender)
    }

    pub fn total_supply(&self) -> Amount {
        self.state.ledger.total_supply()
    }

    // === Token views ===

    pub fn token_name(&self) -> &'static str {
        LEADER_TOKEN_NAME
    }

    pub fn token_symbol(&self) -> &'static str {
        LEADER_TOKEN_SYMBOL
    }

    pub fn owner_of(&self, token_id: SlotId) -> GameResult<Address> {
        TokenRegistry::owner_of(&self.state.board, token_id)
    }

    pub fn exists(&self, token_id: SlotId) -> bool {
        TokenRegistry::exists(&self.state.board, token_id)
    }

    pub fn token_balance_of(&self, holder: &Address) -> usize {
        TokenRegistry::balance_of(&self.state.board, holder)
    }

    pub fn token_supply(&self) -> usize {
        TokenRegistry::total_supply(&self.state.board)
    }

    pub fn get_approved(&self, token_id: SlotId) -> GameResult<Option<Address>> {
        self.state.tokens.get_approved(&self.state.board, token_id)
    }

    pub fn is_approved_for_all(&self, holder: &Address, operator: &Address) -> bool {
        self.state.tokens.is_approved_for_all(holder, operator)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let ledger = &self.state.ledger;
        GameSnapshot {
            address: self.state.address,
            wallet: self.state.wallet,
            deployer: self.state.deployer,
            config: self.state.config.clone(),
            name: TOKEN_NAME.to_string(),
            symbol: TOKEN_SYMBOL.to_string(),
            decimals: TOKEN_DECIMALS,
            leaders: self.leaders(),
            total_supply: ledger.total_supply(),
            total_minted: ledger.total_minted(),
            total_burned: ledger.total_burned(),
            total_contributed: self.state.total_contributed,
            retained: self.state.retained,
            children: self.state.children.clone(),
            journal_len: self.state.seq,
            state_hash: self.state.hash(),
        }
    }
}
