//! Scripted sessions: a JSON list of steps replayed against one instance.
//!
//! ```json
//! {
//!   "steps": [
//!     { "step": "call", "caller": "0x…", "op": { "type": "contribute", "amount": "990000000000000000" } },
//!     { "step": "deploy_child", "deployer": "0x…", "funding": "1000000000000000000" }
//!   ]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::engine::reducer::Op;
use crate::engine::Game;
use crate::logging::{self, Domain, Level};
use crate::types::{amount_str, milli, units, Address, Amount};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Call {
        caller: Address,
        op: Op,
    },
    DeployChild {
        deployer: Address,
        #[serde(default)]
        config: GameConfig,
        #[serde(with = "amount_str", default)]
        funding: Amount,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

#[derive(Debug, Default)]
pub struct ScriptReport {
    pub applied: usize,
    pub rejected: usize,
    pub children: Vec<Game>,
}

/// Identity `i` of the demo session.
pub fn signer(i: usize) -> Address {
    Address::from_label(&format!("signer-{}", i))
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading script {}", path.display()))?;
        let script: Script =
            serde_json::from_str(&raw).with_context(|| format!("parsing script {}", path.display()))?;
        Ok(script)
    }

    /// The deployer contributes 0.99, then signers 1..=9 contribute `i + 1` each.
    pub fn demo(deployer: Address) -> Self {
        let mut steps = vec![Step::Call { caller: deployer, op: Op::Contribute { amount: milli(990) } }];
        for i in 1..10 {
            steps.push(Step::Call { caller: signer(i), op: Op::Contribute { amount: units(i as u128 + 1) } });
        }
        Script { steps }
    }

    /// Applies every step in order. Rejected steps are logged and skipped.
    pub fn run(&self, game: &mut Game) -> ScriptReport {
        let mut report = ScriptReport::default();
        for (idx, step) in self.steps.iter().enumerate() {
            let result = match step {
                Step::Call { caller, op } => game.execute(*caller, op.clone()).map(|_| ()),
                Step::DeployChild { deployer, config, funding } => game
                    .deploy_child(*deployer, config.clone(), *funding)
                    .map(|child| report.children.push(child)),
            };
            match result {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    report.rejected += 1;
                    logging::log(
                        Level::Warn,
                        Domain::System,
                        "script_step_rejected",
                        logging::obj(&[
                            ("step", serde_json::json!(idx)),
                            ("code", logging::v_str(err.code())),
                            ("msg", logging::v_str(&err.to_string())),
                        ]),
                    );
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_steps() {
        let a = signer(1);
        let raw = format!(
            r#"{{"steps":[
                {{"step":"call","caller":"{a}","op":{{"type":"contribute","amount":"5"}}}},
                {{"step":"deploy_child","deployer":"{a}","funding":7}}
            ]}}"#
        );
        let script: Script = serde_json::from_str(&raw).unwrap();
        assert_eq!(script.steps[0], Step::Call { caller: a, op: Op::Contribute { amount: 5 } });
        assert_eq!(
            script.steps[1],
            Step::DeployChild { deployer: a, config: GameConfig::default(), funding: 7 }
        );
    }

    #[test]
    fn test_bad_op_is_named_in_error() {
        let raw = format!(
            r#"{{"steps":[{{"step":"call","caller":"{}","op":{{"type":"contribut","amount":"5"}}}}]}}"#,
            signer(1)
        );
        let err = serde_json::from_str::<Script>(&raw).unwrap_err().to_string();
        assert!(err.contains("unknown variant `contribut`"), "{}", err);

        let err = serde_json::from_str::<Script>(r#"{"steps":[{"step":"vote"}]}"#).unwrap_err().to_string();
        assert!(err.contains("unknown variant `vote`"), "{}", err);
    }

    #[test]
    fn test_demo_session() {
        let mut game = Game::deploy(signer(0), GameConfig::default()).unwrap();
        let report = Script::demo(signer(0)).run(&mut game);
        assert_eq!(report.applied, 10);
        assert_eq!(report.rejected, 0);
        // deployer's seed slot plus nine new leaders; signer 0 tops up slot 0
        assert_eq!(game.token_supply(), 10);
        assert_eq!(game.contributions(0).unwrap(), milli(10) + milli(990));

        let whale = signer(10);
        game.contribute(whale, units(40)).unwrap();
        assert_eq!(game.leader_slot(&whale), Some(10));
        assert_eq!(game.total_contributed(), milli(990) + units(54) + units(40));
    }
}
