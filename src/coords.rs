use std::fmt;

use crate::error::{Error, Result};

/// An absolute cell position, 0-based on both axes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub col: u32,
    pub row: u32,
}

impl Address {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    /// Parses `[$]letters[$]digits`, ignoring `$` markers and letter case.
    pub fn parse(id: &str) -> Result<Self> {
        let invalid = || Error::InvalidCellName(id.to_string());
        let rest = id.strip_prefix('$').unwrap_or(id);
        let split = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .ok_or_else(invalid)?;
        let (letters, rest) = rest.split_at(split);
        let digits = rest.strip_prefix('$').unwrap_or(rest);
        let col = col_to_index(letters).ok_or_else(invalid)?;
        let row = row_to_index(digits).ok_or_else(invalid)?;
        Ok(Self { col, row })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", index_to_col(self.col), index_to_row(self.row))
    }
}

/// Canonical map key for a cell: lowercase, no `$` markers.
pub fn cell_id(raw: &str) -> Result<String> {
    Address::parse(raw).map(|address| address.to_string())
}

/// Maps column letters to a 0-based index: `a` → 0, `z` → 25, `aa` → 26.
pub fn col_to_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut index: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_lowercase() as u32) - ('a' as u32) + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

pub fn index_to_col(index: u32) -> String {
    let mut letters = Vec::new();
    let mut n = u64::from(index) + 1;
    while n > 0 {
        n -= 1;
        letters.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
    }
    letters.iter().rev().collect()
}

/// Maps 1-based row digits to a 0-based index. Row `0` is rejected.
pub fn row_to_index(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok()?.checked_sub(1)
}

pub fn index_to_row(index: u32) -> String {
    (u64::from(index) + 1).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a", Some(0))]
    #[case("Z", Some(25))]
    #[case("aa", Some(26))]
    #[case("az", Some(51))]
    #[case("ba", Some(52))]
    #[case("", None)]
    #[case("a1", None)]
    fn columns_map_to_indexes(#[case] letters: &str, #[case] expected: Option<u32>) {
        assert_eq!(col_to_index(letters), expected);
    }

    #[test]
    fn column_index_round_trips() {
        for index in [0, 1, 25, 26, 27, 51, 52, 701, 702, 18277] {
            assert_eq!(col_to_index(&index_to_col(index)), Some(index));
        }
    }

    #[test]
    fn rows_are_one_based() {
        assert_eq!(row_to_index("1"), Some(0));
        assert_eq!(row_to_index("10"), Some(9));
        assert_eq!(row_to_index("0"), None);
        assert_eq!(row_to_index("-1"), None);
        assert_eq!(index_to_row(4), "5");
    }

    #[test]
    fn address_parses_with_markers() {
        assert_eq!(Address::parse("c4").unwrap(), Address::new(2, 3));
        assert_eq!(Address::parse("$C$4").unwrap(), Address::new(2, 3));
        assert_eq!(Address::parse("c$4").unwrap(), Address::new(2, 3));
        assert_eq!(Address::parse("AB12").unwrap(), Address::new(27, 11));
    }

    #[rstest]
    #[case("")]
    #[case("4")]
    #[case("c")]
    #[case("c0")]
    #[case("$$c4")]
    #[case("c4x")]
    #[case("c-4")]
    fn address_rejects_bad_ids(#[case] id: &str) {
        assert!(matches!(Address::parse(id), Err(Error::InvalidCellName(_))));
    }

    #[test]
    fn cell_ids_are_canonical() {
        assert_eq!(cell_id("$E$9").unwrap(), "e9");
        assert_eq!(cell_id("aa10").unwrap(), "aa10");
    }
}
