//! Versioned schema of the persisted progress record.
//!
//! Stored records are parsed as raw JSON first, upcast one version at a time
//! until they reach [`CURRENT_SCHEMA_VERSION`], and only then deserialized
//! into a [`ProgressRecord`]. Records written before the version marker
//! existed are schema 0.

use std::fmt;

use serde_json::{Map, Value};

use super::progress::ProgressRecord;

pub const CURRENT_SCHEMA_VERSION: u64 = 1;

/// A pure transformation of a stored record object from one schema version
/// to the next.
pub struct SchemaUpcaster {
    pub from_version: u64,
    pub to_version: u64,
    pub transform: fn(Map<String, Value>) -> Map<String, Value>,
}

/// Upcasters applied on load, chained automatically (0 -> 1 -> ...).
pub const UPCASTERS: &[SchemaUpcaster] = &[SchemaUpcaster {
    from_version: 0,
    to_version: 1,
    transform: unversioned_to_v1,
}];

fn unversioned_to_v1(mut object: Map<String, Value>) -> Map<String, Value> {
    if !object.get("history").is_some_and(Value::is_array) {
        object.insert("history".into(), Value::Array(Vec::new()));
    }
    object.insert("version".into(), Value::from(1u64));
    object
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    NotAnObject,
    InvalidVersion,
    /// Written by a newer release than this one understands.
    UnsupportedVersion(u64),
    /// No upcaster leads away from this version.
    MissingUpcaster(u64),
    Invalid(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::NotAnObject => write!(f, "stored record is not a JSON object"),
            SchemaError::InvalidVersion => write!(f, "stored record version is not an integer"),
            SchemaError::UnsupportedVersion(version) => write!(
                f,
                "stored record schema {} is newer than supported schema {}",
                version, CURRENT_SCHEMA_VERSION
            ),
            SchemaError::MissingUpcaster(version) => {
                write!(f, "no migration from stored record schema {}", version)
            }
            SchemaError::Invalid(message) => write!(f, "invalid stored record: {}", message),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Result of reading a stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRecord {
    pub record: ProgressRecord,
    /// Schema version found in storage, before migration.
    pub stored_version: u64,
}

impl LoadedRecord {
    pub fn was_migrated(&self) -> bool {
        self.stored_version != self.record.version
    }
}

/// Parse, migrate and validate a stored record.
pub fn parse_stored(raw: &str) -> Result<LoadedRecord, SchemaError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| SchemaError::Invalid(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(SchemaError::NotAnObject);
    };

    let stored_version = stored_version(&object)?;
    if stored_version > CURRENT_SCHEMA_VERSION {
        return Err(SchemaError::UnsupportedVersion(stored_version));
    }

    let object = upcast(object, stored_version, UPCASTERS)?;
    let mut record: ProgressRecord = serde_json::from_value(Value::Object(object))
        .map_err(|e| SchemaError::Invalid(e.to_string()))?;
    record.normalize();

    Ok(LoadedRecord {
        record,
        stored_version,
    })
}

fn stored_version(object: &Map<String, Value>) -> Result<u64, SchemaError> {
    match object.get("version") {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value.as_u64().ok_or(SchemaError::InvalidVersion),
    }
}

/// Apply upcasters until the object reaches the current schema.
pub fn upcast(
    mut object: Map<String, Value>,
    mut version: u64,
    upcasters: &[SchemaUpcaster],
) -> Result<Map<String, Value>, SchemaError> {
    while version < CURRENT_SCHEMA_VERSION {
        let upcaster = upcasters
            .iter()
            .find(|u| u.from_version == version)
            .ok_or(SchemaError::MissingUpcaster(version))?;
        object = (upcaster.transform)(object);
        version = upcaster.to_version;
    }
    Ok(object)
}
