//! A1-style cell reference conversions. All indexes here are 0-based.

/// Converts column letters ("A", "AB") to a 0-based column index.
pub fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    letters
        .to_ascii_uppercase()
        .bytes()
        .try_fold(0usize, |index, byte| {
            index.checked_mul(26)?.checked_add((byte - b'A') as usize + 1)
        })
        .map(|column| column - 1)
}

/// Converts a 1-based row number string to a 0-based row index.
pub fn row_to_index(number: &str) -> Option<usize> {
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    number
        .parse::<usize>()
        .ok()
        .filter(|row| *row > 0)
        .map(|row| row - 1)
}

/// Converts a 0-based column index to column letters.
pub fn index_to_col(col: usize) -> String {
    let mut column = col + 1;
    let mut letters = Vec::<u8>::new();
    while column > 0 {
        column -= 1;
        letters.push(b'A' + (column % 26) as u8);
        column /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Converts 0-based (row, col) to a reference such as "C14".
pub fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col(col), row + 1)
}

/// Parses a reference such as "C14" (optionally with `$` anchors) to 0-based (row, col).
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    Some((row_to_index(digits)?, col_to_index(letters)?))
}

/// Parses a range such as "A1:C3" to inclusive 0-based corners `((row, col), (row, col))`.
/// A single reference yields a one-cell range.
pub fn range_to_indexes(range: &str) -> Option<((usize, usize), (usize, usize))> {
    match range.split_once(':') {
        Some((start, end)) => {
            let (start_row, start_col) = reference_to_index(start)?;
            let (end_row, end_col) = reference_to_index(end)?;
            Some((
                (start_row.min(end_row), start_col.min(end_col)),
                (start_row.max(end_row), start_col.max(end_col)),
            ))
        }
        None => reference_to_index(range).map(|index| (index, index)),
    }
}
