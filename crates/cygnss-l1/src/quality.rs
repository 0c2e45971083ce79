//! Quality-flag table: bit positions, names and the screen-out policy.
//!
//! CYGNSS packs per-DDM quality conditions into one unsigned integer per flag
//! group (`quality_flags`, `quality_flags_2`, ...). The table maps each bit of
//! each group to a named flag and says whether a set bit screens the record
//! out of analysis. The table is built once from configuration and never
//! changes afterwards.

use std::collections::HashSet;

use crate::error::{L1Error, Result};

/// Widest flag word supported (CYGNSS flag variables are `uint32`).
pub const MAX_FLAGS_PER_GROUP: usize = 32;

/// One named bit in a flag group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityFlagEntry {
    pub bit: u8,
    pub name: String,
    pub screen_out: bool,
}

impl QualityFlagEntry {
    pub fn mask(&self) -> u32 {
        1u32 << self.bit
    }
}

/// One packed flag word and its bit assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityFlagGroup {
    key: u32,
    variable: String,
    entries: Vec<QualityFlagEntry>,
    screen_mask: u32,
}

impl QualityFlagGroup {
    /// Build a group from `(name, screen_out)` pairs in declaration order.
    /// The first pair is bit 0.
    ///
    /// Group `1` is read from the file variable `quality_flags`, group `n`
    /// from `quality_flags_n`.
    pub fn new(key: u32, flags: Vec<(String, bool)>) -> Result<Self> {
        if key == 0 {
            return Err(L1Error::Config(
                "quality flag group keys start at 1".to_string(),
            ));
        }
        if flags.len() > MAX_FLAGS_PER_GROUP {
            return Err(L1Error::Config(format!(
                "quality flag group {} declares {} flags, at most {} fit in a flag word",
                key,
                flags.len(),
                MAX_FLAGS_PER_GROUP
            )));
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(flags.len());
        let mut screen_mask = 0u32;
        for (bit, (name, screen_out)) in flags.into_iter().enumerate() {
            if name.trim().is_empty() {
                return Err(L1Error::Config(format!(
                    "quality flag group {} has an empty flag name at bit {}",
                    key, bit
                )));
            }
            if !seen.insert(name.clone()) {
                return Err(L1Error::Config(format!(
                    "quality flag group {} declares '{}' more than once",
                    key, name
                )));
            }
            let entry = QualityFlagEntry {
                bit: bit as u8,
                name,
                screen_out,
            };
            if entry.screen_out {
                screen_mask |= entry.mask();
            }
            entries.push(entry);
        }

        let variable = if key == 1 {
            "quality_flags".to_string()
        } else {
            format!("quality_flags_{}", key)
        };

        Ok(Self {
            key,
            variable,
            entries,
            screen_mask,
        })
    }

    pub fn key(&self) -> u32 {
        self.key
    }

    /// File variable holding this group's packed words.
    pub fn variable_name(&self) -> &str {
        &self.variable
    }

    pub fn entries(&self) -> &[QualityFlagEntry] {
        &self.entries
    }

    /// Bits whose `screen_out` is set. Reserved bits are never part of it.
    pub fn screen_mask(&self) -> u32 {
        self.screen_mask
    }

    pub fn entry(&self, name: &str) -> Option<&QualityFlagEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Named flags and their state for one packed word.
    pub fn decode(&self, word: u32) -> Vec<(&str, bool)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), word & e.mask() != 0))
            .collect()
    }
}

/// All flag groups, in ascending group-key order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QualityFlagTable {
    groups: Vec<QualityFlagGroup>,
}

impl QualityFlagTable {
    /// Build the table. Groups are sorted by key; duplicate keys are rejected.
    pub fn new(mut groups: Vec<QualityFlagGroup>) -> Result<Self> {
        groups.sort_by_key(|g| g.key);
        if let Some(pair) = groups.windows(2).find(|w| w[0].key == w[1].key) {
            return Err(L1Error::Config(format!(
                "quality flag group {} declared more than once",
                pair[0].key
            )));
        }
        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[QualityFlagGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// File variables that must be read, one per group, in group order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.variable_name())
    }

    /// Whether a record with these packed words passes screening.
    ///
    /// `words` holds one packed value per group, in group order. The record
    /// fails if any `screen_out` bit is set in any group.
    pub fn passes(&self, words: &[u32]) -> bool {
        debug_assert_eq!(words.len(), self.groups.len());
        self.groups
            .iter()
            .zip(words)
            .all(|(group, &word)| word & group.screen_mask == 0)
    }

    /// Names of the screening flags set in `words`, in table order.
    pub fn screened_flags(&self, words: &[u32]) -> Vec<&str> {
        self.groups
            .iter()
            .zip(words)
            .flat_map(|(group, &word)| {
                group
                    .entries
                    .iter()
                    .filter(move |e| e.screen_out && word & e.mask() != 0)
                    .map(|e| e.name.as_str())
            })
            .collect()
    }

    /// State of one named flag, or `None` if no group declares it.
    pub fn is_set(&self, words: &[u32], name: &str) -> Option<bool> {
        self.groups
            .iter()
            .zip(words)
            .find_map(|(group, &word)| group.entry(name).map(|e| word & e.mask() != 0))
    }

    /// Whether any of the named flags is set.
    pub fn any_set<S: AsRef<str>>(&self, words: &[u32], names: &[S]) -> bool {
        names
            .iter()
            .any(|name| self.is_set(words, name.as_ref()).unwrap_or(false))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.iter().any(|g| g.entry(name).is_some())
    }
}
