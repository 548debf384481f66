//! Case-insensitive, insertion-ordered multi-valued map.
//!
//! `MultiMap` backs request headers, query arguments and decoded form bodies.
//! Keys are stored lower-cased; every key maps to a non-empty, ordered list
//! of values.
//!
//! Single-value accessors return the *last* value inserted for a key, while
//! [`MultiMap::get_all`] exposes the full list:
//!
//! ```rust
//! use tether_core::MultiMap;
//!
//! let args: MultiMap = [("tag", "music"), ("tag", "rock"), ("type", "book")]
//!     .into_iter()
//!     .collect();
//!
//! assert_eq!(args.get("Tag"), Some("rock"));
//! assert_eq!(args.get_all("tag"), ["music", "rock"]);
//! ```
//!
//! Lookups are a linear scan over the entries. Headers, query strings and
//! form bodies rarely exceed a couple dozen keys, and a scan keeps the
//! insertion order for free.

use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;

/// Most keys carry a single value; repeated headers/args spill to the heap.
pub const INLINE_VALUES: usize = 2;

type Values = SmallVec<[String; INLINE_VALUES]>;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct MultiMap {
    entries: Vec<(String, Values)>,
}

fn fold_key(key: &str) -> Cow<'_, str> {
    if key.chars().any(char::is_uppercase) {
        Cow::Owned(key.to_lowercase())
    } else {
        Cow::Borrowed(key)
    }
}

impl MultiMap {
    #[inline]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Build from a single-valued mapping: each value becomes a one-element list.
    ///
    /// Keys that fold to the same lower-cased form replace each other, so the
    /// last one wins.
    pub fn from_single<I, K, V>(map: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut out = Self::new();
        for (key, value) in map {
            out.insert(key.as_ref(), value);
        }
        out
    }

    fn position(&self, key: &str) -> Option<usize> {
        let key = fold_key(key);
        self.entries.iter().position(|(k, _)| *k == *key)
    }

    /// Last value inserted for `key`.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key)
            .and_then(|i| self.entries[i].1.last())
            .map(String::as_str)
    }

    /// Every value for `key` in insertion order (empty when the key is absent).
    #[inline]
    pub fn get_all(&self, key: &str) -> &[String] {
        match self.position(key) {
            Some(i) => self.entries[i].1.as_slice(),
            None => &[],
        }
    }

    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Replace all values for `key` with `value`.
    ///
    /// An existing key keeps its position in iteration order.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.position(key) {
            Some(i) => {
                let values = &mut self.entries[i].1;
                values.clear();
                values.push(value);
            }
            None => {
                let mut values = Values::new();
                values.push(value);
                self.entries.push((fold_key(key).into_owned(), values));
            }
        }
    }

    /// Add `value` after any existing values for `key`.
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.position(key) {
            Some(i) => self.entries[i].1.push(value),
            None => {
                let mut values = Values::new();
                values.push(value);
                self.entries.push((fold_key(key).into_owned(), values));
            }
        }
    }

    /// Replace the full value list for `key`. An empty list removes the key.
    pub fn set_all<I, V>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let values: Values = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.remove(key);
            return;
        }
        match self.position(key) {
            Some(i) => self.entries[i].1 = values,
            None => self.entries.push((fold_key(key).into_owned(), values)),
        }
    }

    /// Insert `value` only when `key` is absent; returns the current last value.
    pub fn set_default(&mut self, key: &str, value: impl Into<String>) -> &str {
        let i = match self.position(key) {
            Some(i) => i,
            None => {
                self.insert(key, value);
                self.entries.len() - 1
            }
        };
        self.entries[i].1.last().map(String::as_str).unwrap_or("")
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        let i = self.position(key)?;
        let (_, values) = self.entries.remove(i);
        Some(values.into_vec())
    }

    /// Number of distinct keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// `(key, last value)` per key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.last().map(|last| (k.as_str(), last.as_str())))
    }

    /// `(key, values)` per key.
    pub fn iter_all(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// One `(key, value)` pair per stored value, keys in insertion order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(k, v)| v.iter().map(move |value| (k.as_str(), value.as_str())))
    }

    /// Append every pair from `other`.
    pub fn extend_from(&mut self, other: &MultiMap) {
        for (key, value) in other.pairs() {
            self.append(key, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for MultiMap
where
    K: AsRef<str>,
    V: Into<String>,
{
    /// Pairs are appended in order, so repeated keys accumulate values.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = Self::new();
        out.extend(iter);
        out
    }
}

impl<K, V> Extend<(K, V)> for MultiMap
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.append(key.as_ref(), value);
        }
    }
}

impl fmt::Debug for MultiMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v.as_slice())))
            .finish()
    }
}
