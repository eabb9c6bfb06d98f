//! Write batches

use super::FieldMap;

/// A single write inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    WriteFields { key: String, fields: FieldMap },
    AddToSet { key: String, member: String },
}

/// Ordered group of writes committed through [`super::KvBackend::commit`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_fields(mut self, key: impl Into<String>, fields: FieldMap) -> Self {
        self.ops.push(BatchOp::WriteFields {
            key: key.into(),
            fields,
        });
        self
    }

    pub fn add_to_set(mut self, key: impl Into<String>, member: impl Into<String>) -> Self {
        self.ops.push(BatchOp::AddToSet {
            key: key.into(),
            member: member.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}
