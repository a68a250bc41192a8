//! Content hashes for log records.
//!
//! The hash input is a canonical JSON array whose first element tags the
//! record kind, so a raw line can never collide with a structured record
//! that renders to the same text. Object keys are sorted recursively, which
//! makes the hash independent of field order.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use swapsync_types::logs::{LogRecord, StructuredLog};

/// BLAKE3 digest of a record's canonical form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogHash([u8; 32]);

impl LogHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for LogHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for LogHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogHash({})", self.to_hex())
    }
}

impl Serialize for LogHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Hash a record.
pub fn hash_record(record: &LogRecord) -> LogHash {
    let canonical = canonical_form(record).to_string();
    LogHash(*blake3::hash(canonical.as_bytes()).as_bytes())
}

/// The canonical value hashed for `record`.
pub fn canonical_form(record: &LogRecord) -> Value {
    match record {
        LogRecord::Raw(line) => Value::Array(vec![
            Value::String("raw".to_string()),
            Value::String(line.clone()),
        ]),
        LogRecord::Structured(log) => structured_form(log),
    }
}

fn structured_form(log: &StructuredLog) -> Value {
    let optional = |value: Option<Value>| value.map(|v| canonicalize(&v)).unwrap_or(Value::Null);

    Value::Array(vec![
        Value::String("structured".to_string()),
        Value::String(log.timestamp.clone()),
        Value::String(log.level.clone()),
        log.target.clone().map(Value::String).unwrap_or(Value::Null),
        canonicalize_map(&log.fields),
        optional(log.span.clone()),
        optional(log.spans.clone().map(Value::Array)),
    ])
}

/// Copy `value` with every object's keys in sorted order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => canonicalize_map(map),
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn canonicalize_map(map: &Map<String, Value>) -> Value {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    let mut sorted = Map::new();
    for key in keys {
        if let Some(value) = map.get(key) {
            sorted.insert(key.clone(), canonicalize(value));
        }
    }
    Value::Object(sorted)
}
