//! Tri-state field for partial updates: omitted keeps, `null` clears, a value sets.

use crate::error::AppError;
use serde::{Deserialize, Deserializer};

/// Use with `#[serde(default)]` so an absent key deserializes to [`Patch::Missing`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Missing,
    Null,
    Value(T),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}

impl<T> Patch<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Patch::Missing)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }

    /// New value of a nullable column.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Missing => current,
            Patch::Null => None,
            Patch::Value(v) => Some(v),
        }
    }

    /// New value of a NOT NULL column; an explicit `null` is rejected.
    pub fn apply_required(self, current: T, field: &str) -> Result<T, AppError> {
        match self {
            Patch::Missing => Ok(current),
            Patch::Null => Err(AppError::Validation(format!("{} cannot be cleared", field))),
            Patch::Value(v) => Ok(v),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Missing => Patch::Missing,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(f(v)),
        }
    }
}

impl Patch<String> {
    /// Treats an empty or whitespace-only string as a clear.
    pub fn trimmed(self) -> Patch<String> {
        match self {
            Patch::Value(s) => {
                let t = s.trim();
                if t.is_empty() {
                    Patch::Null
                } else {
                    Patch::Value(t.to_string())
                }
            }
            other => other,
        }
    }
}
