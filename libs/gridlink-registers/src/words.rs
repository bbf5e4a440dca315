//! Raw register snapshots
//!
//! One poll cycle's worth of 16-bit words, keyed by register address. The
//! transport that fills it lives outside this crate and is reached through
//! [`RegisterSource`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Immutable snapshot of raw words for one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegisterWords {
    words: BTreeMap<u16, u16>,
}

impl RegisterWords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Word at `address`, `None` if the transport did not supply it
    pub fn get(&self, address: u16) -> Option<u16> {
        self.words.get(&address).copied()
    }

    pub fn insert(&mut self, address: u16, word: u16) {
        self.words.insert(address, word);
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.words.iter().map(|(a, w)| (*a, *w))
    }

    /// Copy of the words whose address is in `addresses`
    pub fn subset(&self, addresses: &BTreeSet<u16>) -> Self {
        Self {
            words: addresses
                .iter()
                .filter_map(|a| self.words.get(a).map(|w| (*a, *w)))
                .collect(),
        }
    }
}

impl FromIterator<(u16, u16)> for RegisterWords {
    fn from_iter<I: IntoIterator<Item = (u16, u16)>>(iter: I) -> Self {
        Self {
            words: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<u16, u16>> for RegisterWords {
    fn from(words: BTreeMap<u16, u16>) -> Self {
        Self { words }
    }
}

/// Supplier of raw register words (the device transport)
///
/// Addresses the transport could not read this cycle are simply absent from
/// the returned snapshot.
pub trait RegisterSource {
    fn read_words(&self, addresses: &BTreeSet<u16>) -> RegisterWords;
}

impl RegisterSource for RegisterWords {
    fn read_words(&self, addresses: &BTreeSet<u16>) -> RegisterWords {
        self.subset(addresses)
    }
}
