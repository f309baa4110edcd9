use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Canonical identifier for every record the backend hands out.
///
/// The API is inconsistent about ids: the same foreign key arrives as `12`
/// in one payload and `"12"` in another. Conversion happens here, once, so
/// comparisons elsewhere are plain integer equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("id is empty")]
    Empty,
    #[error("invalid id '{0}'")]
    Invalid(String),
}

impl EntityId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = IdError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(IdError::Empty);
        }
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|_| IdError::Invalid(trimmed.to_string()))
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let val = Value::deserialize(deserializer)?;
        from_value(&val)
            .map_err(serde::de::Error::custom)?
            .ok_or_else(|| serde::de::Error::custom("expected string or number for id"))
    }
}

fn from_value(val: &Value) -> Result<Option<EntityId>, IdError> {
    match val {
        Value::Number(n) => n
            .as_u64()
            .map(|id| Some(EntityId(id)))
            .ok_or_else(|| IdError::Invalid(n.to_string())),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s.parse().map(Some),
        Value::Null => Ok(None),
        other => Err(IdError::Invalid(other.to_string())),
    }
}

/// `null`, `""` and a missing field all mean "no reference".
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<EntityId>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Option::<Value>::deserialize(deserializer)?;
    match val {
        Some(val) => from_value(&val).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Reference lists sometimes carry blanks or junk; those entries are dropped.
pub fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<EntityId>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .iter()
        .filter_map(|val| from_value(val).ok().flatten())
        .collect())
}
