use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Store-assigned identifier. Positive for every persisted customer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub i64);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    /// Opaque text; never parsed as a date.
    pub birth_date: String,
}

/// Client-supplied customer fields. Any `id` in the payload is ignored and
/// missing or null fields decode as empty strings so validation can reject
/// them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerDetails {
    #[serde(deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub last_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub birth_date: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl CustomerDetails {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        birth_date: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            birth_date: birth_date.into(),
        }
    }
}

impl Customer {
    pub fn from_details(id: CustomerId, details: CustomerDetails) -> Self {
        Self {
            id,
            first_name: details.first_name,
            last_name: details.last_name,
            birth_date: details.birth_date,
        }
    }

    /// Overwrites every mutable field; `id` is retained.
    pub fn apply_details(&mut self, details: CustomerDetails) {
        self.first_name = details.first_name;
        self.last_name = details.last_name;
        self.birth_date = details.birth_date;
    }

    /// True when either name starts with `term` under ordinal, case-insensitive
    /// comparison.
    pub fn name_starts_with(&self, term: &str) -> bool {
        starts_with_ignore_case(&self.first_name, term)
            || starts_with_ignore_case(&self.last_name, term)
    }
}

/// Char-by-char comparison with invariant upper-case folding. No locale rules
/// and no normalization are applied.
pub fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    let mut chars = value.chars();
    prefix.chars().all(|expected| {
        chars.next().is_some_and(|actual| {
            actual == expected || actual.to_uppercase().eq(expected.to_uppercase())
        })
    })
}
