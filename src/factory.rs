//! Child instances seeded from a parent.
//!
//! A child is a fresh [`Game`] with its own ledger, board and tokens. The
//! parent keeps only the child's address; the child itself is handed back to
//! the caller.

use crate::config::GameConfig;
use crate::engine::events::Event;
use crate::engine::reducer::{self, Op};
use crate::engine::Game;
use crate::error::{GameError, GameResult};
use crate::logging;
use crate::types::{Address, Amount};

impl Game {
    /// Deploys a child and, when `funding > 0`, contributes it to this
    /// instance from the child's wallet. Any failure leaves the parent as it was.
    pub fn deploy_child(&mut self, deployer: Address, config: GameConfig, funding: Amount) -> GameResult<Game> {
        config.validate()?;
        if deployer.is_zero() {
            return Err(GameError::ZeroAddress);
        }

        let parent = self.state();
        let nonce = parent.child_nonce;
        let next_nonce = nonce
            .checked_add(1)
            .ok_or_else(|| GameError::InstanceCreationFailed("child nonce exhausted".to_string()))?;
        let address = Address::derive("child", &parent.address, nonce);
        if address == parent.address || address == parent.wallet || parent.children.contains(&address) {
            return Err(GameError::InstanceCreationFailed(format!("address {} already in use", address)));
        }

        let child = Game::create(address, deployer, config)?;

        let state = self.state_mut();
        if funding > 0 {
            reducer::reduce(state, child.wallet(), Op::Contribute { amount: funding })?;
        }
        state.children.push(address);
        state.child_nonce = next_nonce;
        state.record(&[Event::ChildDeployed { deployer, child: address }]);

        logging::log_child_deployed(&state.address, &deployer, &address, funding);
        Ok(child)
    }

    pub fn children(&self, index: usize) -> Option<Address> {
        self.state().children.get(index).copied()
    }

    pub fn total_children(&self) -> usize {
        self.state().children.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{milli, units};

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    #[test]
    fn test_child_addresses_are_distinct() {
        let mut parent = Game::deploy(addr("owner"), GameConfig::default()).unwrap();
        let a = parent.deploy_child(addr("owner"), GameConfig::default(), 0).unwrap();
        let b = parent.deploy_child(addr("owner"), GameConfig::default(), 0).unwrap();
        assert_ne!(a.address(), b.address());
        assert_eq!(parent.total_children(), 2);
        assert_eq!(parent.children(0), Some(a.address()));
        assert_eq!(parent.children(1), Some(b.address()));
        assert_eq!(parent.children(2), None);
    }

    #[test]
    fn test_funded_child_joins_parent_board() {
        let mut parent = Game::deploy(addr("owner"), GameConfig::default()).unwrap();
        let child = parent.deploy_child(addr("alice"), GameConfig::default(), milli(250)).unwrap();
        assert!(parent.is_leader(&child.wallet()));
        assert_eq!(parent.total_contributed(), milli(250));
        assert_eq!(child.owner_of(0).unwrap(), addr("alice"));
    }

    #[test]
    fn test_invalid_config_records_nothing() {
        let mut parent = Game::deploy(addr("owner"), GameConfig::default()).unwrap();
        let before = parent.state_hash();
        let err = parent
            .deploy_child(addr("owner"), GameConfig::with_colors(&["red", "#fff", "#000", "#111"]), units(1))
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig(_)));
        assert_eq!(parent.total_children(), 0);
        assert_eq!(parent.state_hash(), before);
    }
}
