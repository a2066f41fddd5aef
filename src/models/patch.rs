//! Three-state field for partial updates.
//!
//! Every update payload in the API uses the same convention:
//! an absent key leaves the stored value alone, an explicit `null` clears it,
//! and a value replaces it. Payload structs derive `Default` and carry
//! `#[serde(default)]` so that missing keys become [`Patch::Absent`].

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    Absent,
    Null,
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|value| match value {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}

/// A `null` was sent for a field that cannot be cleared.
#[derive(Debug, thiserror::Error)]
#[error("{0} cannot be null")]
pub struct NullField(pub &'static str);

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    /// The new value, if one was sent.
    pub fn value(&self) -> Option<&T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Apply to a nullable column.
    pub fn apply_to(self, current: &mut Option<T>) {
        match self {
            Patch::Absent => {}
            Patch::Null => *current = None,
            Patch::Value(v) => *current = Some(v),
        }
    }

    /// Apply to a required column; `null` is rejected.
    pub fn apply_required(self, field: &'static str, current: &mut T) -> Result<(), NullField> {
        match self {
            Patch::Absent => Ok(()),
            Patch::Null => Err(NullField(field)),
            Patch::Value(v) => {
                *current = v;
                Ok(())
            }
        }
    }

    pub fn map<U, F>(self, f: F) -> Patch<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Patch::Absent => Patch::Absent,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(f(v)),
        }
    }
}
