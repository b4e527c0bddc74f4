//! End-to-end behaviour of a single instance: distribution, eviction,
//! deferral and forwarding, driven through the public `Game` surface.

use pyramid::constants::{CONVERSION_RATE, MAX_LEADERS};
use pyramid::engine::events::Event;
use pyramid::types::{milli, units};
use pyramid::{Address, Game, GameConfig, GameError};

fn addr(label: &str) -> Address {
    Address::from_label(label)
}

fn empty_game() -> Game {
    Game::deploy(addr("deployer"), GameConfig::empty()).unwrap()
}

/// Board filled with `contributions`, one leader per entry, labelled `l0..`.
fn game_with_board(contributions: &[u128]) -> Game {
    let mut game = empty_game();
    for (i, c) in contributions.iter().enumerate() {
        game.contribute(addr(&format!("l{}", i)), *c).unwrap();
    }
    game
}

#[test]
fn test_first_two_contributors() {
    let mut game = empty_game();
    let (a, b) = (addr("A"), addr("B"));

    let out = game.contribute(a, units(1)).unwrap();
    assert_eq!(game.leader_slot(&a), Some(0));
    assert_eq!(game.contributions(0).unwrap(), units(1));
    assert_eq!(game.payouts_of(&a), 0);
    assert!(!out.events.iter().any(|e| matches!(e, Event::Distribution { .. })));

    let out = game.contribute(b, units(1)).unwrap();
    assert_eq!(game.leader_slot(&b), Some(1));
    assert_eq!(game.payouts_of(&a), units(1));
    assert_eq!(
        out.events[..2],
        [
            Event::Contribution { sender: b, amount: units(1) },
            Event::Distribution { slot: 0, recipient: a, amount: units(1) },
        ]
    );
}

#[test]
fn test_full_board_eviction_of_minimum() {
    let mut board = vec![milli(10)];
    board.extend(std::iter::repeat(milli(500)).take(MAX_LEADERS - 1));
    let mut game = game_with_board(&board);
    let victim = addr("l0");
    let challenger = addr("challenger");
    assert_eq!(game.lowest_leader(), Some((0, milli(10))));

    let out = game.contribute(challenger, milli(20)).unwrap();

    assert_eq!(game.owner_of(0).unwrap(), challenger);
    assert_eq!(game.contributions(0).unwrap(), milli(20));
    assert_eq!(game.balance_of(&victim), milli(10) * CONVERSION_RATE);
    assert!(!game.is_leader(&victim));
    assert_eq!(game.token_supply(), MAX_LEADERS);
    assert!(out.events.contains(&Event::Eviction {
        slot: 0,
        previous_owner: victim,
        new_owner: challenger,
        previous_contribution: milli(10),
        new_contribution: milli(20),
    }));
    assert!(out.events.contains(&Event::TokenTransfer { from: victim, to: challenger, token_id: 0 }));
}

#[test]
fn test_eviction_counts_deferred_balance() {
    let mut game = game_with_board(&vec![units(1); MAX_LEADERS]);
    let x = addr("x");

    // too small on its own: becomes deferred balance
    game.contribute(x, milli(600)).unwrap();
    assert_eq!(game.balance_of(&x), milli(600) * CONVERSION_RATE);
    assert!(!game.is_leader(&x));

    // 0.6 deferred + 0.5 new beats the 1.0 minimum
    game.contribute(x, milli(500)).unwrap();
    let slot = game.leader_slot(&x).unwrap();
    assert_eq!(slot, 0);
    assert_eq!(game.contributions(slot).unwrap(), milli(1100));
    assert_eq!(game.balance_of(&x), 0);
    assert_eq!(game.state().ledger.total_burned(), milli(600) * CONVERSION_RATE);
}

#[test]
fn test_no_eviction_when_not_exceeding_minimum() {
    let mut game = game_with_board(&vec![units(1); MAX_LEADERS]);
    let before: Vec<_> = game.leaders();
    let x = addr("x");

    let out = game.contribute(x, units(1)).unwrap();

    assert_eq!(game.leaders().iter().map(|l| l.contribution).collect::<Vec<_>>(),
        before.iter().map(|l| l.contribution).collect::<Vec<_>>());
    assert_eq!(game.balance_of(&x), units(1) * CONVERSION_RATE);
    assert_eq!(out.events.last(), Some(&Event::Deferred { sender: x, minted: units(1) * CONVERSION_RATE }));
}

#[test]
fn test_proportional_routing_and_remainder() {
    let mut game = game_with_board(&[1, 2, 4]);
    let leaders: Vec<Address> = (0..3).map(|i| addr(&format!("l{}", i))).collect();
    let paid_before: Vec<u128> = leaders.iter().map(|l| game.payouts_of(l)).collect();
    let retained_before = game.retained();

    let out = game.contribute(addr("x"), 100).unwrap();

    // floor(100 * c / 7) for c = 1, 2, 4
    let deltas: Vec<u128> = leaders.iter().zip(&paid_before).map(|(l, b)| game.payouts_of(l) - b).collect();
    assert_eq!(deltas, vec![14, 28, 57]);
    let distributed: u128 = out
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Distribution { amount, .. } => Some(*amount),
            _ => None,
        })
        .sum();
    assert_eq!(distributed, 99);
    // truncation remainder stays with the instance and is below the leader count
    let remainder = game.retained() - retained_before;
    assert_eq!(remainder, 1);
    assert!(remainder < leaders.len() as u128);
}

#[test]
fn test_claim_leadership() {
    let mut game = game_with_board(&vec![units(2); MAX_LEADERS]);
    let (x, y) = (addr("x"), addr("y"));

    assert_eq!(game.claim_leadership(x).unwrap_err(), GameError::NothingToClaim);

    game.contribute(x, units(1)).unwrap();
    game.contribute(x, units(1)).unwrap();
    assert!(!game.is_leader(&x));
    // 2.0 deferred does not exceed 2.0
    assert_eq!(
        game.claim_leadership(x).unwrap_err(),
        GameError::ClaimTooLow { deferred: units(2), lowest: units(2) }
    );

    // y's deferred unit moves to x; x now claims with 3.0 and no new value
    game.contribute(y, units(1)).unwrap();
    let y_balance = game.balance_of(&y);
    game.transfer(y, x, y_balance).unwrap();
    let contributed = game.total_contributed();

    let out = game.claim_leadership(x).unwrap();

    assert_eq!(game.leader_slot(&x), Some(0));
    assert_eq!(game.contributions(0).unwrap(), units(3));
    assert_eq!(game.balance_of(&x), 0);
    assert_eq!(game.balance_of(&addr("l0")), units(2) * CONVERSION_RATE);
    assert_eq!(game.total_contributed(), contributed);
    assert!(!out.events.iter().any(|e| matches!(e, Event::Contribution { .. } | Event::Distribution { .. })));
    assert_eq!(game.claim_leadership(x).unwrap_err(), GameError::AlreadyLeader);
}

#[test]
fn test_forward_follows_token_holder() {
    let mut game = game_with_board(&[units(1)]);
    let (holder, buyer) = (addr("l0"), addr("buyer"));

    game.transfer_token(holder, holder, buyer, 0).unwrap();
    assert_eq!(game.recipient_of(0).unwrap(), buyer);

    game.contribute(addr("x"), units(1)).unwrap();
    assert_eq!(game.payouts_of(&buyer), units(1));
    assert_eq!(game.payouts_of(&holder), 0);
}

#[test]
fn test_explicit_forward_survives_token_transfer() {
    let mut game = game_with_board(&[units(1)]);
    let (holder, buyer, fwd) = (addr("l0"), addr("buyer"), addr("fwd"));

    game.set_recipient(holder, 0, Some(fwd)).unwrap();
    game.transfer_token(holder, holder, buyer, 0).unwrap();
    assert_eq!(game.recipient_of(0).unwrap(), fwd);

    // only the new holder may change it
    assert_eq!(game.set_recipient(holder, 0, None).unwrap_err(), GameError::NotOwner);
    game.set_recipient(buyer, 0, None).unwrap();
    assert_eq!(game.recipient_of(0).unwrap(), buyer);
}

#[test]
fn test_eviction_clears_forward_and_approval() {
    let mut board = vec![milli(10)];
    board.extend(std::iter::repeat(units(1)).take(MAX_LEADERS - 1));
    let mut game = game_with_board(&board);
    let victim = addr("l0");
    game.set_recipient(victim, 0, Some(addr("fwd"))).unwrap();
    game.approve_token(victim, Some(addr("spender")), 0).unwrap();

    game.contribute(addr("x"), milli(20)).unwrap();

    assert_eq!(game.recipient_of(0).unwrap(), addr("x"));
    assert_eq!(game.get_approved(0).unwrap(), None);
}

#[test]
fn test_token_errors() {
    let mut game = game_with_board(&[units(1), units(1)]);
    assert_eq!(game.owner_of(7).unwrap_err(), GameError::InvalidToken(7));
    assert_eq!(
        game.transfer_token(addr("l0"), addr("l0"), addr("z"), 7).unwrap_err(),
        GameError::InvalidToken(7)
    );
    assert_eq!(
        game.transfer_token(addr("l0"), addr("l1"), addr("z"), 0).unwrap_err(),
        GameError::NotOwner
    );
    assert_eq!(
        game.transfer_token(addr("l1"), addr("l0"), addr("z"), 0).unwrap_err(),
        GameError::NotApproved
    );
    assert_eq!(
        game.transfer_token(addr("l0"), addr("l0"), Address::ZERO, 0).unwrap_err(),
        GameError::ZeroAddress
    );
}

#[test]
fn test_ledger_surface() {
    let mut game = game_with_board(&vec![units(1); MAX_LEADERS]);
    let (x, y, z) = (addr("x"), addr("y"), addr("z"));
    game.contribute(x, units(1)).unwrap();
    let bal = game.balance_of(&x);

    assert!(matches!(
        game.transfer(y, z, 1).unwrap_err(),
        GameError::InsufficientBalance { needed: 1, available: 0 }
    ));
    game.approve(x, y, bal / 2).unwrap();
    assert_eq!(game.allowance(&x, &y), bal / 2);
    assert!(matches!(
        game.transfer_from(y, x, z, bal).unwrap_err(),
        GameError::InsufficientAllowance { .. }
    ));
    game.transfer_from(y, x, z, bal / 2).unwrap();
    assert_eq!(game.balance_of(&z), bal / 2);
    assert_eq!(game.allowance(&x, &y), 0);
    assert_eq!(game.total_supply(), bal);
}

#[test]
fn test_rejections_leave_state_hash() {
    let mut game = game_with_board(&vec![units(1); MAX_LEADERS]);
    let hash = game.state_hash();
    let journal = game.journal().len();

    assert_eq!(game.contribute(addr("x"), 0).unwrap_err(), GameError::ZeroContribution);
    assert!(game.claim_leadership(addr("x")).is_err());
    assert!(game.set_recipient(addr("x"), 0, Some(addr("x"))).is_err());
    assert!(game.transfer(addr("x"), addr("y"), 5).is_err());
    assert!(game.transfer_token(addr("x"), addr("l0"), addr("x"), 0).is_err());

    assert_eq!(game.state_hash(), hash);
    assert_eq!(game.journal().len(), journal);
}

#[test]
fn test_overflowing_contribution_is_atomic() {
    let big = u128::MAX / 2 + 1;
    let mut game = game_with_board(&[big]);
    let hash = game.state_hash();
    assert_eq!(game.contribute(addr("l0"), big).unwrap_err(), GameError::ArithmeticOverflow);
    assert_eq!(game.state_hash(), hash);
    assert_eq!(game.total_contributed(), big);
    assert_eq!(game.contributions(0).unwrap(), big);
}

#[test]
fn test_large_contributions_distribute() {
    let mut game = game_with_board(&[units(20)]);
    game.contribute(addr("b"), units(20)).unwrap();
    assert_eq!(game.payouts_of(&addr("l0")), units(20));

    game.contribute(addr("c"), units(40)).unwrap();
    assert_eq!(game.payouts_of(&addr("l0")), units(40));
    assert_eq!(game.payouts_of(&addr("b")), units(20));
    assert_eq!(game.total_contributed(), units(80));
    assert_eq!(game.leader_slot(&addr("c")), Some(2));
}
