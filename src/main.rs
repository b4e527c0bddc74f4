use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use pyramid::config::Config;
use pyramid::engine::Game;
use pyramid::logging::{self, obj, v_str, Domain, Level};
use pyramid::script::Script;
use pyramid::verify::invariants;

fn main() -> Result<()> {
    let cfg = Config::from_env();
    let mut game = Game::deploy(cfg.deployer, cfg.game.clone()).context("deploying instance")?;

    let script = match &cfg.script_path {
        Some(path) => Script::load(Path::new(path))?,
        None => Script::demo(cfg.deployer),
    };
    logging::log(
        Level::Info,
        Domain::System,
        "session_start",
        obj(&[
            ("instance", logging::v_addr(&game.address())),
            ("script", v_str(cfg.script_path.as_deref().unwrap_or("demo"))),
            ("steps", json!(script.steps.len())),
        ]),
    );

    let report = script.run(&mut game);
    if let Err(v) = invariants::check_all(game.state()) {
        anyhow::bail!("invariant violated after session: {}", v.msg);
    }
    for child in &report.children {
        if let Err(v) = invariants::check_all(child.state()) {
            anyhow::bail!("invariant violated in child {}: {}", child.address(), v.msg);
        }
    }

    let snapshot = game.snapshot();
    logging::log(
        Level::Info,
        Domain::System,
        "session_summary",
        obj(&[
            ("instance", logging::v_addr(&game.address())),
            ("applied", json!(report.applied)),
            ("rejected", json!(report.rejected)),
            ("children", json!(report.children.len())),
            ("state_hash", v_str(&snapshot.state_hash)),
        ]),
    );

    let rendered = serde_json::to_string_pretty(&snapshot)?;
    match &cfg.snapshot_path {
        Some(path) => std::fs::write(path, &rendered).with_context(|| format!("writing snapshot {}", path))?,
        None => println!("{}", rendered),
    }
    Ok(())
}
