//! Ordering of input files by their numeric filename prefix
//!
//! A file named like `07 - Appendix.pdf` sorts by the number in front of the
//! hyphen. Files without such a prefix sort after every prefixed file.

use std::cmp::Ordering;
use std::ffi::OsString;

use once_cell::sync::Lazy;
use regex::Regex;

/// `<digits> <ws>* - <ws>* <anything> .pdf`, matched against the lower-cased name
static PREFIX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)\s*-\s*.*\.pdf$").expect("prefix pattern is valid"));

/// Leading number of a filename, kept as its significant digits
///
/// Comparing digit strings (shorter first, then lexically) orders any length
/// of prefix numerically without overflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumericPrefix(String);

impl NumericPrefix {
    fn from_digits(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            NumericPrefix("0".to_string())
        } else {
            NumericPrefix(trimmed.to_string())
        }
    }

    /// The prefix as an integer, if it fits in `u64`
    pub fn value(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl Ord for NumericPrefix {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for NumericPrefix {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort key derived from a filename
///
/// `Unprefixed` is declared last so it compares greater than every prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SortKey {
    Prefix(NumericPrefix),
    Unprefixed,
}

impl SortKey {
    /// Integer value of the prefix; `None` for unprefixed names
    pub fn value(&self) -> Option<u64> {
        match self {
            SortKey::Prefix(prefix) => prefix.value(),
            SortKey::Unprefixed => None,
        }
    }

    pub fn is_unprefixed(&self) -> bool {
        matches!(self, SortKey::Unprefixed)
    }
}

/// Extract the sort key of a filename
///
/// Only ASCII digits `0`-`9` form a prefix. Names starting with other Unicode
/// decimal digits, such as Arabic-Indic `١ - a.pdf`, are `Unprefixed`.
///
/// # Example
///
/// ```
/// use pdf_folder_merge::sort::sort_key;
///
/// assert_eq!(sort_key("2 - Chapter.pdf").value(), Some(2));
/// assert_eq!(sort_key("007 - Intro.PDF").value(), Some(7));
/// assert!(sort_key("notes.pdf").is_unprefixed());
/// ```
pub fn sort_key(filename: &str) -> SortKey {
    let lowered = filename.to_lowercase();
    match PREFIX_PATTERN.captures(&lowered) {
        Some(caps) => SortKey::Prefix(NumericPrefix::from_digits(&caps[1])),
        None => SortKey::Unprefixed,
    }
}

/// How files with equal sort keys are ordered among themselves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// Keep the order the directory listing produced (OS dependent)
    #[default]
    Listing,
    /// Compare file names bytewise
    Name,
}

/// Sort file names ascending by prefix; the sort is stable
pub fn order_candidates(names: &mut [OsString], tie_break: TieBreak) {
    match tie_break {
        TieBreak::Listing => names.sort_by_cached_key(|name| sort_key(&name.to_string_lossy())),
        TieBreak::Name => {
            names.sort_by_cached_key(|name| (sort_key(&name.to_string_lossy()), name.clone()))
        }
    }
}
