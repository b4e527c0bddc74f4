//! Single entry point for state transitions: (State, caller, Op) -> Events.
//!
//! Every mutating call on an instance funnels through [`reduce`]. An `Err`
//! means the state is exactly as it was before the call; an `Ok` carries the
//! events in emission order plus the post-state hash, and the events are
//! already appended to the instance journal.

use serde::{Deserialize, Serialize};

use super::distribution::{self, Placement};
use super::events::Event;
use super::state::GameState;
use crate::error::{GameError, GameResult};
use crate::logging::{self, Domain, Level};
use crate::tokens::TokenRegistry;
use crate::types::{amount_str, Address, Amount, SlotId};
use crate::verify::invariants;

/// Operations a caller can submit to an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Op {
    Contribute {
        #[serde(with = "amount_str")]
        amount: Amount,
    },
    ClaimLeadership,
    SetRecipient {
        token_id: SlotId,
        #[serde(default)]
        recipient: Option<Address>,
    },
    Transfer {
        to: Address,
        #[serde(with = "amount_str")]
        amount: Amount,
    },
    Approve {
        spender: Address,
        #[serde(with = "amount_str")]
        amount: Amount,
    },
    TransferFrom {
        from: Address,
        to: Address,
        #[serde(with = "amount_str")]
        amount: Amount,
    },
    TransferToken {
        from: Address,
        to: Address,
        token_id: SlotId,
    },
    ApproveToken {
        #[serde(default)]
        to: Option<Address>,
        token_id: SlotId,
    },
    SetApprovalForAll {
        operator: Address,
        approved: bool,
    },
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Contribute { .. } => "contribute",
            Op::ClaimLeadership => "claim_leadership",
            Op::SetRecipient { .. } => "set_recipient",
            Op::Transfer { .. } => "transfer",
            Op::Approve { .. } => "approve",
            Op::TransferFrom { .. } => "transfer_from",
            Op::TransferToken { .. } => "transfer_token",
            Op::ApproveToken { .. } => "approve_token",
            Op::SetApprovalForAll { .. } => "set_approval_for_all",
        }
    }

    fn domain(&self) -> Domain {
        match self {
            Op::Contribute { .. } | Op::ClaimLeadership => Domain::Engine,
            Op::Transfer { .. } | Op::Approve { .. } | Op::TransferFrom { .. } => Domain::Ledger,
            Op::SetRecipient { .. }
            | Op::TransferToken { .. }
            | Op::ApproveToken { .. }
            | Op::SetApprovalForAll { .. } => Domain::Tokens,
        }
    }
}

/// Result of a successful operation
#[derive(Debug, Clone)]
pub struct ReducerOutput {
    pub events: Vec<Event>,
    pub state_hash: String,
}

pub fn reduce(state: &mut GameState, caller: Address, op: Op) -> GameResult<ReducerOutput> {
    let name = op.name();
    let domain = op.domain();

    let events = match dispatch(state, &caller, op) {
        Ok(events) => events,
        Err(err) => {
            logging::log_rejected(domain, &state.address, &caller, name, &err);
            return Err(err);
        }
    };

    state.record(&events);
    let state_hash = state.hash();
    logging::log_audit(&state.address, name, state.seq, &state_hash);

    if cfg!(debug_assertions) {
        if let Err(v) = invariants::check_all(state) {
            logging::log(
                Level::Error,
                Domain::Audit,
                "invariant_violation",
                logging::obj(&[("op", logging::v_str(name)), ("msg", logging::v_str(&v.msg))]),
            );
        }
    }

    Ok(ReducerOutput { events, state_hash })
}

fn dispatch(state: &mut GameState, caller: &Address, op: Op) -> GameResult<Vec<Event>> {
    match op {
        Op::Contribute { amount } => contribute(state, caller, amount),
        Op::ClaimLeadership => claim_leadership(state, caller),
        Op::SetRecipient { token_id, recipient } => set_recipient(state, caller, token_id, recipient),
        Op::Transfer { to, amount } => {
            state.ledger.transfer(caller, &to, amount)?;
            Ok(vec![Event::Transfer { from: *caller, to, amount }])
        }
        Op::Approve { spender, amount } => {
            state.ledger.approve(caller, &spender, amount)?;
            Ok(vec![Event::Approval { holder: *caller, spender, amount }])
        }
        Op::TransferFrom { from, to, amount } => {
            state.ledger.transfer_from(caller, &from, &to, amount)?;
            Ok(vec![Event::Transfer { from, to, amount }])
        }
        Op::TransferToken { from, to, token_id } => {
            state.tokens.transfer_from(&mut state.board, caller, &from, &to, token_id)?;
            Ok(vec![Event::TokenTransfer { from, to, token_id }])
        }
        Op::ApproveToken { to, token_id } => {
            let holder = state.tokens.approve(&state.board, caller, to, token_id)?;
            Ok(vec![Event::TokenApproval { holder, approved: to, token_id }])
        }
        Op::SetApprovalForAll { operator, approved } => {
            state.tokens.set_approval_for_all(caller, &operator, approved)?;
            Ok(vec![Event::ApprovalForAll { holder: *caller, operator, approved }])
        }
    }
}

fn contribute(state: &mut GameState, sender: &Address, amount: Amount) -> GameResult<Vec<Event>> {
    let plan = distribution::plan_contribution(state, sender, amount)?;
    settle(state, plan)
}

fn claim_leadership(state: &mut GameState, sender: &Address) -> GameResult<Vec<Event>> {
    let plan = distribution::plan_claim(state, sender)?;
    settle(state, plan)
}

fn settle(state: &mut GameState, plan: distribution::Settlement) -> GameResult<Vec<Event>> {
    let outcome = match &plan.placement {
        Placement::TopUp { .. } => "top_up",
        Placement::Open { .. } => "open",
        Placement::Evict { .. } => "evict",
        Placement::Defer { .. } => "defer",
    };
    if let Placement::Evict { slot, previous_owner, previous_contribution, new_contribution, .. } = &plan.placement {
        logging::log_eviction(
            &state.address,
            *slot,
            previous_owner,
            &plan.sender,
            *previous_contribution,
            *new_contribution,
        );
    }
    let (sender, amount) = (plan.sender, plan.amount);
    let events = distribution::apply(state, plan)?;
    logging::log_contribution(&state.address, &sender, amount, outcome);
    Ok(events)
}

fn set_recipient(
    state: &mut GameState,
    caller: &Address,
    token_id: SlotId,
    recipient: Option<Address>,
) -> GameResult<Vec<Event>> {
    let holder = TokenRegistry::owner_of(&state.board, token_id)?;
    if holder != *caller {
        return Err(GameError::NotOwner);
    }
    if recipient.map_or(false, |r| r.is_zero()) {
        return Err(GameError::ZeroAddress);
    }
    let slot = state.board.get_mut(token_id).ok_or(GameError::InvalidToken(token_id))?;
    slot.forward = recipient;
    Ok(vec![Event::RecipientSet { token_id, recipient }])
}
