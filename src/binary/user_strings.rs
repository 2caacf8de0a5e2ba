//! Per-session dictionary of interned property names.

use std::collections::HashMap;

use super::marker::MAX_USER_STRINGS;
use crate::types::Utf8Bytes;

/// Append-only dictionary of user strings.
///
/// The encoder and decoder each own one and grow it in the same order, so a
/// name written in full once can later be referenced by id. Both sides may
/// start from the same pre-seeded dictionary.
#[derive(Debug, Clone, Default)]
pub struct UserStringDictionary {
    strings: Vec<Utf8Bytes>,
    ids: HashMap<Utf8Bytes, usize>,
}

impl UserStringDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dictionary pre-seeded with `strings`, skipping duplicates.
    pub fn with_strings<I, S>(strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Utf8Bytes>,
    {
        let mut dict = Self::new();
        for s in strings {
            dict.try_add(s.into());
        }
        dict
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.strings.len() >= MAX_USER_STRINGS
    }

    pub fn get_id(&self, s: &str) -> Option<usize> {
        self.ids.get(s).copied()
    }

    pub fn get(&self, id: usize) -> Option<&Utf8Bytes> {
        self.strings.get(id)
    }

    /// Appends `s` and returns its id. Returns the existing id if present,
    /// or `None` when the dictionary is full.
    pub fn try_add(&mut self, s: Utf8Bytes) -> Option<usize> {
        if let Some(id) = self.get_id(&s) {
            return Some(id);
        }
        if self.is_full() {
            return None;
        }
        let id = self.strings.len();
        self.ids.insert(s.clone(), id);
        self.strings.push(s);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_assigned_in_order() {
        let mut dict = UserStringDictionary::new();
        assert_eq!(dict.try_add("alpha".into()), Some(0));
        assert_eq!(dict.try_add("beta".into()), Some(1));
        assert_eq!(dict.try_add("alpha".into()), Some(0));
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get(1).map(|s| s.as_str()), Some("beta"));
        assert_eq!(dict.get_id("gamma"), None);
    }

    #[test]
    fn stops_at_capacity() {
        let mut dict = UserStringDictionary::new();
        for i in 0..MAX_USER_STRINGS {
            assert_eq!(dict.try_add(format!("s{i}").into()), Some(i));
        }
        assert!(dict.is_full());
        assert_eq!(dict.try_add("overflow".into()), None);
        assert_eq!(dict.try_add("s7".into()), Some(7));
    }

    #[test]
    fn pre_seeded() {
        let dict = UserStringDictionary::with_strings(["a", "b", "a"]);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get_id("b"), Some(1));
    }
}
