//! Name comparison primitive shared by every resolver
//!
//! Vault file names may arrive in either Unicode composition form (macOS
//! stores decomposed names, most editors type composed ones) and links are
//! written with arbitrary casing, so all name matching goes through [`fold`].

use unicode_normalization::UnicodeNormalization;

/// NFC-normalize and lower-case a string
pub fn fold(s: &str) -> String {
    s.nfc().collect::<String>().to_lowercase()
}

/// Compare two names ignoring case and Unicode composition
pub fn same_name(a: &str, b: &str) -> bool {
    a == b || fold(a) == fold(b)
}
