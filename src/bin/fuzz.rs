//! Random operation sequences against one instance, checking invariants
//! after every step. `SEED` and `EVENTS` control the run.

use std::env;

use pyramid::config::GameConfig;
use pyramid::constants::UNIT;
use pyramid::engine::reducer::Op;
use pyramid::engine::Game;
use pyramid::types::Address;
use pyramid::verify::invariants;

fn lcg(seed: &mut u64) -> u64 {
    *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    *seed
}

fn pick(seed: &mut u64, n: u64) -> u64 {
    (lcg(seed) >> 33) % n
}

fn actor(seed: &mut u64) -> Address {
    Address::from_label(&format!("actor-{}", pick(seed, 24)))
}

fn random_op(seed: &mut u64, game: &Game) -> Op {
    let roll = pick(seed, 100);
    let token_id = pick(seed, 14) as usize;
    if roll < 55 {
        // contribution sizes from dust up to a few units
        let amount = match pick(seed, 3) {
            0 => pick(seed, 1_000) as u128,
            1 => pick(seed, 1_000) as u128 * (UNIT / 1_000),
            _ => (1 + pick(seed, 5) as u128) * UNIT,
        };
        Op::Contribute { amount }
    } else if roll < 62 {
        Op::ClaimLeadership
    } else if roll < 70 {
        let to = actor(seed);
        let amount = game.total_supply() / (1 + pick(seed, 8) as u128);
        Op::Transfer { to, amount }
    } else if roll < 75 {
        Op::Approve { spender: actor(seed), amount: pick(seed, 10) as u128 * UNIT }
    } else if roll < 80 {
        Op::TransferFrom { from: actor(seed), to: actor(seed), amount: pick(seed, 10) as u128 * UNIT }
    } else if roll < 88 {
        let from = game.owner_of(token_id).unwrap_or_else(|_| actor(seed));
        Op::TransferToken { from, to: actor(seed), token_id }
    } else if roll < 93 {
        Op::SetRecipient { token_id, recipient: Some(actor(seed)) }
    } else if roll < 97 {
        Op::ApproveToken { to: Some(actor(seed)), token_id }
    } else {
        Op::SetApprovalForAll { operator: actor(seed), approved: pick(seed, 2) == 0 }
    }
}

fn main() {
    let mut seed = env::var("SEED")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(42u64);
    let events = env::var("EVENTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(500u64);

    let deployer = Address::from_label("actor-0");
    let mut game = match Game::deploy(deployer, GameConfig::default()) {
        Ok(g) => g,
        Err(err) => {
            eprintln!("deploy failed: {}", err);
            std::process::exit(2);
        }
    };

    let mut applied = 0u64;
    let mut rejected = 0u64;
    for step in 0..events {
        let caller = actor(&mut seed);
        let op = random_op(&mut seed, &game);
        let before = game.state_hash();
        match game.execute(caller, op.clone()) {
            Ok(_) => applied += 1,
            Err(_) => {
                rejected += 1;
                if game.state_hash() != before {
                    eprintln!("step {}: rejected {:?} changed state", step, op);
                    std::process::exit(1);
                }
            }
        }
        if step % 50 == 0 && pick(&mut seed, 4) == 0 {
            let funding = pick(&mut seed, 3) as u128 * UNIT;
            if game.deploy_child(caller, GameConfig::default(), funding).is_ok() {
                applied += 1;
            }
        }
        if let Err(v) = invariants::check_all(game.state()) {
            eprintln!("step {}: invariant violated after {:?}: {}", step, op, v.msg);
            std::process::exit(1);
        }
    }

    println!(
        r#"{{"seed":{},"events":{},"applied":{},"rejected":{},"leaders":{},"state_hash":"{}"}}"#,
        env::var("SEED").unwrap_or_else(|_| "42".to_string()),
        events,
        applied,
        rejected,
        game.leaders().len(),
        game.state_hash()
    );
}
