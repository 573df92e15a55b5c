//! Spreadsheet column letters (`A`, `Z`, `AA`, ...) and their 1-based numbers.

use crate::error::TicketError;

/// Highest column a worksheet can have (`XFD`).
pub const MAX_COLUMN: u32 = 16_384;

/// Convert a column reference such as `"AA"` to its 1-based number (27).
/// Case and surrounding whitespace are ignored.
///
/// # Errors
///
/// Returns [`TicketError::InvalidColumn`] for empty input, non-letters, or a
/// column past [`MAX_COLUMN`].
pub fn column_to_number(column: &str) -> Result<u32, TicketError> {
    let trimmed = column.trim();
    let invalid = || TicketError::InvalidColumn(column.to_string());
    if trimmed.is_empty() {
        return Err(invalid());
    }
    let mut n: u32 = 0;
    for c in trimmed.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(invalid());
        }
        let digit = u32::from(c.to_ascii_uppercase()) - u32::from('A') + 1;
        n = n
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .filter(|&v| v <= MAX_COLUMN)
            .ok_or_else(invalid)?;
    }
    Ok(n)
}

/// Convert a 1-based column number to its letters (27 → `"AA"`).
///
/// # Errors
///
/// Returns [`TicketError::InvalidColumn`] for 0 or a number past
/// [`MAX_COLUMN`].
pub fn number_to_column(number: u32) -> Result<String, TicketError> {
    if number == 0 || number > MAX_COLUMN {
        return Err(TicketError::InvalidColumn(number.to_string()));
    }
    let mut letters = Vec::new();
    let mut n = number;
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'A' + u8::try_from(n % 26).unwrap_or(0)));
        n /= 26;
    }
    Ok(letters.iter().rev().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_columns() {
        assert_eq!(column_to_number("A").expect("A"), 1);
        assert_eq!(column_to_number("z").expect("z"), 26);
        assert_eq!(column_to_number(" AA ").expect("AA"), 27);
        assert_eq!(column_to_number("ZZ").expect("ZZ"), 702);
        assert_eq!(column_to_number("XFD").expect("XFD"), MAX_COLUMN);
        assert_eq!(number_to_column(1).expect("1"), "A");
        assert_eq!(number_to_column(26).expect("26"), "Z");
        assert_eq!(number_to_column(27).expect("27"), "AA");
        assert_eq!(number_to_column(701).expect("701"), "ZY");
        assert_eq!(number_to_column(703).expect("703"), "AAA");
    }

    #[test]
    fn rejects_bad_references() {
        assert!(column_to_number("").is_err());
        assert!(column_to_number("A1").is_err());
        assert!(column_to_number("XFE").is_err());
        assert!(column_to_number("ZZZZZZZZ").is_err());
        assert!(number_to_column(0).is_err());
        assert!(number_to_column(MAX_COLUMN + 1).is_err());
    }
}
