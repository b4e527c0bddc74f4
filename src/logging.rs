//! Structured logging for leaderboard instances.
//!
//! Every record is one JSON line on stdout. When `LOG_DIR` is set the same
//! lines also go to `<LOG_DIR>/<RUN_ID>/events.jsonl` (info and above) and
//! `trace.jsonl` (debug and trace), with a `manifest.json` per run.
//!
//! Filtering:
//! - `LOG_LEVEL`: trace | debug | info | warn | error (default info)
//! - `LOG_DOMAINS`: comma-separated domain list or `all` (default all)

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use crate::error::GameError;
use crate::types::{Address, Amount, SlotId};

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Engine,  // Contributions, distribution, eviction
    Ledger,  // Balance transfers and allowances
    Tokens,  // Ownership token moves and approvals
    Factory, // Child instance deployment
    System,  // Startup, scripts, snapshots
    Audit,   // State hashes for replay checks
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Engine => "engine",
            Domain::Ledger => "ledger",
            Domain::Tokens => "tokens",
            Domain::Factory => "factory",
            Domain::System => "system",
            Domain::Audit => "audit",
        }
    }

    pub fn is_enabled(&self) -> bool {
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct Sinks {
    events: Mutex<BufWriter<File>>,
    trace: Mutex<BufWriter<File>>,
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    sinks: Option<Sinks>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let sinks = std::env::var("LOG_DIR").ok().and_then(|base| open_sinks(&base, &run_id));
        RunContext { run_id, sinks }
    })
}

fn open_sinks(base: &str, run_id: &str) -> Option<Sinks> {
    let mut run_dir = PathBuf::from(base);
    run_dir.push(run_id);
    if let Err(err) = create_dir_all(&run_dir) {
        eprintln!("[log] failed to create run dir: {}", err);
        return None;
    }

    let _ = std::fs::write(
        run_dir.join("manifest.json"),
        json!({
            "run_id": run_id,
            "ts": ts_now(),
            "pid": process::id(),
            "log_dir": run_dir.to_string_lossy(),
        })
        .to_string(),
    );

    let open = |name: &str| match File::create(run_dir.join(name)) {
        Ok(f) => Some(Mutex::new(BufWriter::new(f))),
        Err(err) => {
            eprintln!("[log] failed to create {}: {}", name, err);
            None
        }
    };
    Some(Sinks { events: open("events.jsonl")?, trace: open("trace.jsonl")? })
}

fn write_line(writer: &Mutex<BufWriter<File>>, line: &str) {
    if let Ok(mut w) = writer.lock() {
        let _ = writeln!(w, "{}", line);
        let _ = w.flush();
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds
pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    emit_record(level, domain, event, fields);
}

fn emit_record(level: Level, domain: Domain, event: &str, mut fields: Map<String, Value>) {
    let ctx = ensure_run_context();

    let msg = fields.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    if let Some(instance) = fields.remove("instance") {
        entry.insert("instance".to_string(), instance);
    }
    entry.insert("data".to_string(), Value::Object(fields));

    let line = Value::Object(entry).to_string();
    if let Some(sinks) = &ctx.sinks {
        match level {
            Level::Trace | Level::Debug => write_line(&sinks.trace, &line),
            _ => write_line(&sinks.events, &line),
        }
    }
    println!("{}", line);
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_contribution(instance: &Address, sender: &Address, amount: Amount, outcome: &str) {
    log(
        Level::Debug,
        Domain::Engine,
        "contribution",
        obj(&[
            ("instance", v_addr(instance)),
            ("sender", v_addr(sender)),
            ("amount", v_amount(amount)),
            ("outcome", v_str(outcome)),
        ]),
    );
}

pub fn log_eviction(
    instance: &Address,
    slot: SlotId,
    previous_owner: &Address,
    new_owner: &Address,
    previous_contribution: Amount,
    new_contribution: Amount,
) {
    log(
        Level::Info,
        Domain::Engine,
        "eviction",
        obj(&[
            ("instance", v_addr(instance)),
            ("slot", json!(slot)),
            ("previous_owner", v_addr(previous_owner)),
            ("new_owner", v_addr(new_owner)),
            ("previous_contribution", v_amount(previous_contribution)),
            ("new_contribution", v_amount(new_contribution)),
        ]),
    );
}

/// Operation refused; state untouched.
pub fn log_rejected(domain: Domain, instance: &Address, caller: &Address, op: &str, err: &GameError) {
    log(
        Level::Warn,
        domain,
        "rejected",
        obj(&[
            ("instance", v_addr(instance)),
            ("caller", v_addr(caller)),
            ("op", v_str(op)),
            ("code", v_str(err.code())),
            ("msg", v_str(&err.to_string())),
        ]),
    );
}

pub fn log_child_deployed(parent: &Address, deployer: &Address, child: &Address, funding: Amount) {
    log(
        Level::Info,
        Domain::Factory,
        "child_deployed",
        obj(&[
            ("instance", v_addr(parent)),
            ("deployer", v_addr(deployer)),
            ("child", v_addr(child)),
            ("funding", v_amount(funding)),
        ]),
    );
}

/// A deployed child whose requester went away before taking it.
pub fn log_child_abandoned(parent: &Address, child: &Address) {
    log(
        Level::Warn,
        Domain::Factory,
        "child_abandoned",
        obj(&[("instance", v_addr(parent)), ("child", v_addr(child))]),
    );
}

/// Audit entry for replay verification
pub fn log_audit(instance: &Address, op: &str, seq: u64, state_hash: &str) {
    log(
        Level::Trace,
        Domain::Audit,
        op,
        obj(&[
            ("instance", v_addr(instance)),
            ("journal_seq", json!(seq)),
            ("state_hash", v_str(state_hash)),
        ]),
    );
}

// =============================================================================
// Field helpers
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

/// u128 amounts as decimal strings, matching their serde form.
pub fn v_amount(a: Amount) -> Value {
    Value::String(a.to_string())
}

pub fn v_addr(a: &Address) -> Value {
    Value::String(a.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("slot", json!(3)), ("amt", v_amount(u128::MAX))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("slot").unwrap(), 3);
        assert_eq!(m.get("amt").unwrap(), &Value::String(u128::MAX.to_string()));
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }

    #[test]
    fn test_domain_names() {
        assert_eq!(Domain::Factory.as_str(), "factory");
        let v = serde_json::to_value(Domain::Audit).unwrap();
        assert_eq!(v, "audit");
    }
}
