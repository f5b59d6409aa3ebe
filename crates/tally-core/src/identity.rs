//! # Customer Identity
//!
//! Groups credit purchases into debtor accounts.
//!
//! ## Normalization Rules
//! ```text
//! (name, phone)                         IdentityKey
//! ──────────────────────────────────    ─────────────────────
//! ("Amina",  " 555-1 ")            →    Phone("555-1")
//! ("  AMINA   Bello ", "")         →    Name("amina bello")
//! ("", "")                         →    None (no debtor)
//! ```
//!
//! A phone, when present, always wins and is compared exactly. A name is
//! compared case-insensitively with whitespace collapsed. Punctuation is kept
//! as typed.

use std::fmt;

/// The normalized value used to match purchases to a debtor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityKey {
    Phone(String),
    Name(String),
}

impl IdentityKey {
    /// Derives the identity key for a customer, if any.
    ///
    /// ```rust
    /// use tally_core::identity::IdentityKey;
    ///
    /// let a = IdentityKey::for_customer("Amina", "");
    /// let b = IdentityKey::for_customer("  amina ", "  ");
    /// assert_eq!(a, b);
    /// assert!(IdentityKey::for_customer(" ", "").is_none());
    /// ```
    pub fn for_customer(name: &str, phone: &str) -> Option<Self> {
        let phone = phone.trim();
        if !phone.is_empty() {
            return Some(IdentityKey::Phone(phone.to_string()));
        }

        let name = normalize_name(name);
        if name.is_empty() {
            None
        } else {
            Some(IdentityKey::Name(name))
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Phone(p) => write!(f, "phone:{}", p),
            IdentityKey::Name(n) => write!(f, "name:{}", n),
        }
    }
}

/// Trims, collapses internal whitespace, and lowercases.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
