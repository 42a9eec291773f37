//! Filter sets and their canonical cache keys.

use std::collections::BTreeMap;
use std::fmt;

use custgate_remote::Filters;

use crate::error::CacheError;

/// Unordered name/value parameters of a read or write request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet(Filters);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw query-string pairs.
    ///
    /// A parameter repeated in the query string keeps its first value.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut filters = Filters::new();
        for (name, value) in pairs {
            filters.entry(name.into()).or_insert_with(|| value.into());
        }
        Self(filters)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The plain map handed to the remote API.
    pub fn as_filters(&self) -> &Filters {
        &self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<Filters> for FilterSet {
    fn from(filters: Filters) -> Self {
        Self(filters)
    }
}

/// Deterministic encoding of a [`FilterSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode filters as compact JSON with parameter names in sorted order.
///
/// `{"fullName":"Mister White","lastName":"White"}`. JSON string escaping
/// keeps separators inside names or values from colliding with the framing.
pub fn encode(filters: &FilterSet) -> Result<CanonicalKey, CacheError> {
    let sorted: BTreeMap<&str, &str> = filters.iter().collect();
    Ok(CanonicalKey(serde_json::to_string(&sorted)?))
}
