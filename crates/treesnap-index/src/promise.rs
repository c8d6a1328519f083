//! Materialization lifecycle of an index entry.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::error::IndexError;

bitflags! {
    /// Promised local state of an index entry.
    ///
    /// A promise tells the virtual file system whether the bytes behind an
    /// entry are present locally, were produced by a local add or update,
    /// or are on their way out.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Promise: u32 {
        /// V: the file exists remotely but has no local bytes yet.
        const VIRTUAL = 1 << 0;
        /// A: materialized after being added locally.
        const ADD = 1 << 1;
        /// U: materialized after being updated locally.
        const UPDATE = 1 << 2;
        /// D: soft removal, bytes may linger until confirmed.
        const DEL = 1 << 3;
        /// N: hard removal, gone for good.
        const UNLINK = 1 << 4;
    }
}

/// Mnemonic letter of every flag, in bit order.
const MNEMONICS: [(char, Promise); 5] = [
    ('V', Promise::VIRTUAL),
    ('A', Promise::ADD),
    ('U', Promise::UPDATE),
    ('D', Promise::DEL),
    ('N', Promise::UNLINK),
];

impl Promise {
    /// Returns `true` if either removal flag is set.
    pub fn deleted(self) -> bool {
        self.intersects(Self::DEL | Self::UNLINK)
    }

    /// Returns `true` if the entry is a placeholder without local bytes.
    pub fn is_virtual(self) -> bool {
        self.contains(Self::VIRTUAL)
    }

    /// Returns `true` if the entry is present locally.
    pub fn exist(self) -> bool {
        !self.deleted() && !self.is_virtual()
    }

    /// Sets the `set` flags and clears the `unset` ones in a single step.
    ///
    /// Flags present in both arguments end up cleared.
    pub fn swap(&mut self, set: Promise, unset: Promise) {
        *self = self.union(set).difference(unset);
    }
}

impl fmt::Display for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: String = MNEMONICS
            .iter()
            .map(|&(c, flag)| if self.contains(flag) { c } else { '-' })
            .collect();
        f.write_str(&rendered)
    }
}

impl FromStr for Promise {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.chars().count() != MNEMONICS.len() {
            return Err(IndexError::InvalidPromise(s.to_string()));
        }

        let mut promise = Promise::empty();
        for (c, &(letter, flag)) in s.chars().zip(MNEMONICS.iter()) {
            match c {
                '-' => {}
                c if c == letter => promise |= flag,
                _ => return Err(IndexError::InvalidPromise(s.to_string())),
            }
        }

        Ok(promise)
    }
}
