use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::debug;

/// Storage key for the durable visitor identifier.
pub const VISITOR_ID_KEY: &str = "wa_visitor_id";
/// Storage key for the session identifier (reused across page loads).
pub const SESSION_ID_KEY: &str = "session_id";

/// Durable key-value storage the host supplies (localStorage-shaped).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// In-process store for hosts without durable storage, and for tests.
/// Identifiers held here last one page lifetime only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Lowercase base-36 rendering of `n`, matching the time component format
/// identifiers have carried historically.
fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Eleven random base-36 characters. Uniqueness is best-effort, not
/// cryptographic — identifiers are opaque correlation handles, not secrets.
fn random_component() -> String {
    let mut rng = rand::thread_rng();
    (0..11)
        .map(|_| {
            let digit = rng.gen_range(0..36u32);
            char::from_digit(digit, 36).unwrap_or('0')
        })
        .collect()
}

pub fn new_visitor_id(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().max(0) as u64;
    format!("v_{}{}", random_component(), to_base36(millis))
}

pub fn new_session_id(now: DateTime<Utc>) -> String {
    format!("{}-{}", now.timestamp_millis(), random_component())
}

/// Reuse the persisted identifier under `key`, or synthesize and persist a
/// fresh one. Storage failures fall back to an in-memory identifier for the
/// current page lifetime — identity is best-effort and never errors.
fn get_or_create(
    store: &dyn KeyValueStore,
    key: &str,
    synthesize: impl FnOnce() -> String,
) -> String {
    match store.get(key) {
        Ok(Some(existing)) => return existing,
        Ok(None) => {}
        Err(error) => {
            debug!(key, %error, "storage read failed; using in-memory identifier");
            return synthesize();
        }
    }
    let id = synthesize();
    if let Err(error) = store.set(key, &id) {
        debug!(key, %error, "storage write failed; identifier will not survive this page");
    }
    id
}

pub fn get_or_create_visitor_id(store: &dyn KeyValueStore, now: DateTime<Utc>) -> String {
    get_or_create(store, VISITOR_ID_KEY, || new_visitor_id(now))
}

pub fn get_or_create_session_id(store: &dyn KeyValueStore, now: DateTime<Utc>) -> String {
    get_or_create(store, SESSION_ID_KEY, || new_session_id(now))
}
