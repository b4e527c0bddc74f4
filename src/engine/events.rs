//! Events emitted by successful operations.

use serde::{Deserialize, Serialize};

use crate::types::{amount_str, Address, Amount, SlotId};

/// Sequenced journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub seq: u64,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Value received from `sender`.
    Contribution {
        sender: Address,
        #[serde(with = "amount_str")]
        amount: Amount,
    },
    /// Native payout of a leader's proportional share.
    Distribution {
        slot: SlotId,
        recipient: Address,
        #[serde(with = "amount_str")]
        amount: Amount,
    },
    /// Lowest slot taken over by a challenger.
    Eviction {
        slot: SlotId,
        previous_owner: Address,
        new_owner: Address,
        #[serde(with = "amount_str")]
        previous_contribution: Amount,
        #[serde(with = "amount_str")]
        new_contribution: Amount,
    },
    /// Contribution converted into redeemable balance instead of a slot.
    Deferred {
        sender: Address,
        #[serde(with = "amount_str")]
        minted: Amount,
    },
    Mint {
        to: Address,
        #[serde(with = "amount_str")]
        amount: Amount,
    },
    Burn {
        from: Address,
        #[serde(with = "amount_str")]
        amount: Amount,
    },
    Transfer {
        from: Address,
        to: Address,
        #[serde(with = "amount_str")]
        amount: Amount,
    },
    Approval {
        holder: Address,
        spender: Address,
        #[serde(with = "amount_str")]
        amount: Amount,
    },
    /// Ownership token moved; `from` is zero when the token is first minted.
    TokenTransfer {
        from: Address,
        to: Address,
        token_id: SlotId,
    },
    TokenApproval {
        holder: Address,
        approved: Option<Address>,
        token_id: SlotId,
    },
    ApprovalForAll {
        holder: Address,
        operator: Address,
        approved: bool,
    },
    RecipientSet {
        token_id: SlotId,
        recipient: Option<Address>,
    },
    ChildDeployed {
        deployer: Address,
        child: Address,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Contribution { .. } => "contribution",
            Event::Distribution { .. } => "distribution",
            Event::Eviction { .. } => "eviction",
            Event::Deferred { .. } => "deferred",
            Event::Mint { .. } => "mint",
            Event::Burn { .. } => "burn",
            Event::Transfer { .. } => "transfer",
            Event::Approval { .. } => "approval",
            Event::TokenTransfer { .. } => "token_transfer",
            Event::TokenApproval { .. } => "token_approval",
            Event::ApprovalForAll { .. } => "approval_for_all",
            Event::RecipientSet { .. } => "recipient_set",
            Event::ChildDeployed { .. } => "child_deployed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let e = Event::Contribution { sender: Address::from_label("a"), amount: u128::MAX };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], "contribution");
        assert_eq!(v["amount"], u128::MAX.to_string());
        let back: Event = serde_json::from_value(v).unwrap();
        assert_eq!(back, e);
    }
}
