//! Case-insensitive, insertion-ordered map.
//!
//! Header names are case-insensitive on the wire, but peers rarely agree on
//! a casing. [`CaseInsensitiveMap`] keeps exactly one entry per
//! case-insensitive key while remembering the casing that was written last,
//! so that headers can be displayed exactly as they were sent or received.
//!
//! ```
//! use volley::HeaderMap;
//!
//! let mut headers = HeaderMap::new();
//! headers.insert("Content-Type", "application/json".to_string());
//! headers.insert("CONTENT-TYPE", "text/html".to_string());
//!
//! assert_eq!(headers.len(), 1);
//! assert_eq!(headers.get("content-type").map(String::as_str), Some("text/html"));
//! ```
use std::{collections::HashMap, fmt, iter::FusedIterator};

/// Header names and values as seen on the wire.
pub type HeaderMap = CaseInsensitiveMap<String>;

/// Ordered key/value container with case-insensitive keys.
///
/// Entries live in a slot vector in insertion order. Removed entries leave a
/// tombstone behind so that the folded index stays valid; the slots are
/// compacted once tombstones outnumber live entries.
#[derive(Clone)]
pub struct CaseInsensitiveMap<V> {
    slots: Vec<Option<(String, V)>>,
    /// Lowercased key -> position in `slots`
    index: HashMap<String, usize>,
    len: usize,
    /// Next key handed out by [`CaseInsensitiveMap::push`]
    next_position: usize,
}

impl<V> Default for CaseInsensitiveMap<V> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            len: 0,
            next_position: 0,
        }
    }
}

fn fold(key: &str) -> String {
    key.to_ascii_lowercase()
}

impl<V> CaseInsensitiveMap<V> {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key`.
    ///
    /// If an entry with a case-insensitively equal key exists, it is removed
    /// first; the new entry is appended at the end of the iteration order
    /// with the casing of `key`. Returns the replaced value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        let previous = self.remove(&key);

        if let Ok(position) = key.parse::<usize>() {
            self.next_position = self.next_position.max(position.saturating_add(1));
        }

        self.index.insert(fold(&key), self.slots.len());
        self.slots.push(Some((key, value)));
        self.len += 1;
        previous
    }

    /// Append `value` without a name.
    ///
    /// The entry is keyed by the next free position (`"0"`, `"1"`, ...), one
    /// past the largest numeric key seen so far. Returns that key.
    pub fn push(&mut self, value: V) -> String {
        let key = self.next_position.to_string();
        self.insert(key.clone(), value);
        key
    }

    /// Look up the value stored under `key`, ignoring case.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.slot(key).map(|(_, value)| value)
    }

    /// Mutable variant of [`CaseInsensitiveMap::get`].
    ///
    /// Updating a value in place keeps its position and casing.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let position = *self.index.get(&fold(key))?;
        self.slots[position].as_mut().map(|(_, value)| value)
    }

    /// Return the stored key and value for `key`, ignoring case.
    ///
    /// The returned key carries the casing that was last written.
    pub fn get_key_value(&self, key: &str) -> Option<(&str, &V)> {
        self.slot(key).map(|(k, v)| (k.as_str(), v))
    }

    /// Whether an entry exists for `key`, ignoring case.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(&fold(key))
    }

    /// Remove the entry stored under `key`, ignoring case.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let position = self.index.remove(&fold(key))?;
        let (_, value) = self.slots[position].take()?;
        self.len -= 1;
        self.compact();
        Some(value)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.len = 0;
        self.next_position = 0;
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: self.slots.iter(),
            remaining: self.len,
        }
    }

    /// Iterate over the keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(key, _)| key)
    }

    /// Iterate over the values in insertion order
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    fn slot(&self, key: &str) -> Option<&(String, V)> {
        let position = *self.index.get(&fold(key))?;
        self.slots[position].as_ref()
    }

    fn compact(&mut self) {
        if self.slots.len() <= 2 * self.len + 8 {
            return;
        }
        self.slots.retain(Option::is_some);
        self.index.clear();
        for (position, slot) in self.slots.iter().enumerate() {
            if let Some((key, _)) = slot {
                self.index.insert(fold(key), position);
            }
        }
    }
}

impl CaseInsensitiveMap<String> {
    /// Render every entry as a `Name: Value` line, in order.
    pub fn to_lines(&self) -> Vec<String> {
        self.iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect()
    }
}

/// Iterator over the entries of a [`CaseInsensitiveMap`].
#[derive(Debug, Clone)]
pub struct Iter<'a, V> {
    slots: std::slice::Iter<'a, Option<(String, V)>>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Some((key, value)) = slot {
                self.remaining -= 1;
                return Some((key.as_str(), value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> FusedIterator for Iter<'_, V> {}

impl<'a, V> IntoIterator for &'a CaseInsensitiveMap<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Into<String>, V> Extend<(K, V)> for CaseInsensitiveMap<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for CaseInsensitiveMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<V: PartialEq> PartialEq for CaseInsensitiveMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<V: Eq> Eq for CaseInsensitiveMap<V> {}

impl<V: fmt::Debug> fmt::Debug for CaseInsensitiveMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
