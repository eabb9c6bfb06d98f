//! Keyspace implementation
//!
//! HashMap of typed values. The engine wraps it in an RwLock; the keyspace
//! itself is plain data so it can be cloned into a snapshot.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{MenuError, Result};
use crate::wal::Operation;

use super::FieldMap;

/// Value stored under a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Counter(u64),
    Hash(FieldMap),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Counter,
    Hash,
    Set,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Counter => "counter",
            Kind::Hash => "hash",
            Kind::Set => "set",
        }
    }
}

impl Value {
    fn kind(&self) -> Kind {
        match self {
            Value::Counter(_) => Kind::Counter,
            Value::Hash(_) => Kind::Hash,
            Value::Set(_) => Kind::Set,
        }
    }
}

/// In-memory state of every key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyspace {
    entries: HashMap<String, Value>,
}

impl Keyspace {
    /// Create a new empty keyspace
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Current counter value, 0 when the key is absent
    pub fn counter(&self, key: &str) -> Result<u64> {
        match self.entries.get(key) {
            None => Ok(0),
            Some(Value::Counter(n)) => Ok(*n),
            Some(_) => Err(wrong_type(key, Kind::Counter)),
        }
    }

    /// Hash at `key`, if any
    pub fn hash(&self, key: &str) -> Result<Option<&FieldMap>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::Hash(fields)) => Ok(Some(fields)),
            Some(_) => Err(wrong_type(key, Kind::Hash)),
        }
    }

    /// Set at `key`, if any
    pub fn set(&self, key: &str) -> Result<Option<&BTreeSet<String>>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::Set(members)) => Ok(Some(members)),
            Some(_) => Err(wrong_type(key, Kind::Set)),
        }
    }

    /// Verify that `op` would apply cleanly, without changing anything
    ///
    /// Batches are checked as a whole, including keys the batch itself
    /// creates, so a checked batch never fails half-way through `apply`.
    pub fn check(&self, op: &Operation) -> Result<()> {
        let mut pending: HashMap<&str, Kind> = HashMap::new();
        self.check_with(op, &mut pending)
    }

    fn check_with<'a>(&self, op: &'a Operation, pending: &mut HashMap<&'a str, Kind>) -> Result<()> {
        let (key, kind) = match op {
            Operation::Batch(ops) => {
                for inner in ops {
                    self.check_with(inner, pending)?;
                }
                return Ok(());
            }
            Operation::Incr { key, .. } => (key.as_str(), Kind::Counter),
            Operation::WriteFields { key, .. } => (key.as_str(), Kind::Hash),
            Operation::AddToSet { key, .. } => (key.as_str(), Kind::Set),
        };

        let existing = pending
            .get(key)
            .copied()
            .or_else(|| self.entries.get(key).map(Value::kind));
        match existing {
            Some(found) if found != kind => Err(wrong_type(key, kind)),
            _ => {
                pending.insert(key, kind);
                Ok(())
            }
        }
    }

    /// Apply a logged operation
    ///
    /// Callers check the operation first; replay during recovery relies on
    /// the log only containing operations that were checked when written.
    pub fn apply(&mut self, op: &Operation) -> Result<()> {
        match op {
            Operation::Incr { key, value } => {
                let slot = self
                    .entries
                    .entry(key.clone())
                    .or_insert(Value::Counter(0));
                match slot {
                    Value::Counter(n) => *n = (*n).max(*value),
                    _ => return Err(wrong_type(key, Kind::Counter)),
                }
            }
            Operation::WriteFields { key, fields } => {
                let slot = self
                    .entries
                    .entry(key.clone())
                    .or_insert_with(|| Value::Hash(FieldMap::new()));
                match slot {
                    Value::Hash(existing) => {
                        existing.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                    _ => return Err(wrong_type(key, Kind::Hash)),
                }
            }
            Operation::AddToSet { key, member } => {
                let slot = self
                    .entries
                    .entry(key.clone())
                    .or_insert_with(|| Value::Set(BTreeSet::new()));
                match slot {
                    Value::Set(members) => {
                        members.insert(member.clone());
                    }
                    _ => return Err(wrong_type(key, Kind::Set)),
                }
            }
            Operation::Batch(ops) => {
                for inner in ops {
                    self.apply(inner)?;
                }
            }
        }
        Ok(())
    }
}

fn wrong_type(key: &str, expected: Kind) -> MenuError {
    MenuError::WrongType {
        key: key.to_string(),
        expected: expected.name(),
    }
}
