//! Symbol alphabets for integer keys.
//!
//! Integer-indexed containers store their indices as trie edges. A decimal
//! encoding gives nodes up to ten children; a binary encoding gives two
//! children per node and more nodes for the same content. Both are fixed
//! width so lexicographic order matches numeric order.

use serde::{Deserialize, Serialize};

use crate::error::{TrieError, TrieResult};

const DECIMAL_WIDTH: usize = 20;
const BINARY_WIDTH: usize = 64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEncoding {
    /// One decimal digit per trie level.
    #[default]
    Decimal,
    /// One bit per trie level.
    Binary,
}

impl KeyEncoding {
    pub fn encode(&self, index: u64) -> String {
        match self {
            KeyEncoding::Decimal => format!("{index:0width$}", width = DECIMAL_WIDTH),
            KeyEncoding::Binary => format!("{index:0width$b}", width = BINARY_WIDTH),
        }
    }

    pub fn decode(&self, key: &str) -> TrieResult<u64> {
        let invalid = || TrieError::InvalidKey(key.to_string());
        let width = match self {
            KeyEncoding::Decimal => DECIMAL_WIDTH,
            KeyEncoding::Binary => BINARY_WIDTH,
        };
        let radix = self.fan_out();
        if key.len() != width || !key.chars().all(|c| c.is_digit(radix)) {
            return Err(invalid());
        }
        u64::from_str_radix(key, radix).map_err(|_| invalid())
    }

    /// Number of distinct symbols per level.
    pub fn fan_out(&self) -> u32 {
        match self {
            KeyEncoding::Decimal => 10,
            KeyEncoding::Binary => 2,
        }
    }
}
