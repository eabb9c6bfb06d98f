//! Weekly menu record and its field-map form

use crate::error::{MenuError, Result};
use crate::kv::FieldMap;

/// A stored weekly menu
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WeekMenu {
    pub id: u64,
    pub name: String,
}

/// Input for creating a weekly menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWeekMenu {
    pub name: String,
}

impl NewWeekMenu {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl WeekMenu {
    pub const ID_FIELD: &'static str = "ID";
    pub const NAME_FIELD: &'static str = "Name";

    /// Field map written to the record's hash
    pub fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert(Self::ID_FIELD.to_string(), self.id.to_string());
        fields.insert(Self::NAME_FIELD.to_string(), self.name.clone());
        fields
    }

    /// Rebuild a record from its hash
    ///
    /// A missing or non-numeric `ID`, or a missing `Name`, means the stored
    /// data is damaged and is reported as `StorageUnavailable`.
    pub fn from_fields(fields: &FieldMap) -> Result<Self> {
        let raw_id = fields.get(Self::ID_FIELD).ok_or_else(|| {
            MenuError::StorageUnavailable("stored menu has no ID field".to_string())
        })?;
        let id = raw_id.parse::<u64>().map_err(|e| {
            MenuError::StorageUnavailable(format!("stored menu ID {:?} is not a number: {}", raw_id, e))
        })?;
        let name = fields.get(Self::NAME_FIELD).cloned().ok_or_else(|| {
            MenuError::StorageUnavailable(format!("stored menu {} has no Name field", id))
        })?;

        Ok(Self { id, name })
    }
}
