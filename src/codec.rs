use chrono::{Datelike, NaiveDate};

pub const MIN_YEAR: u32 = 1900;
pub const MAX_YEAR: u32 = 9999;

/// Reorders a canonical `YYYY-MM-DD` string into `DD-MM-YYYY`.
///
/// Only the shape is checked; the components are trusted as-is. Anything
/// that is not exactly four, two and two ASCII digits yields an empty string.
pub fn canonical_to_display(input: &str) -> String {
    match split_digits(input, [4..=4, 2..=2, 2..=2]) {
        Some([year, month, day]) => format!("{}-{}-{}", day, month, year),
        None => String::new(),
    }
}

/// Parses a `D-M-YYYY` / `DD-MM-YYYY` string into zero-padded `YYYY-MM-DD`.
///
/// Returns an empty string for malformed input, out-of-range components, or
/// a date that does not exist in the calendar (`31-04-2024`, `29-02-2023`).
pub fn display_to_canonical(input: &str) -> String {
    let Some([day, month, year]) = split_digits(input, [1..=2, 1..=2, 4..=4]) else {
        return String::new();
    };
    let (Ok(day), Ok(month), Ok(year)) =
        (day.parse::<u32>(), month.parse::<u32>(), year.parse::<u32>())
    else {
        return String::new();
    };
    if !valid_date_parts(day, month, year) {
        return String::new();
    }

    // The constructed date must read back as exactly the parsed parts.
    match NaiveDate::from_ymd_opt(year as i32, month, day) {
        Some(date)
            if date.year() == year as i32 && date.month() == month && date.day() == day =>
        {
            format!("{:04}-{:02}-{:02}", year, month, day)
        }
        _ => String::new(),
    }
}

/// Real calendar date behind a canonical string, if there is one.
pub fn parse_canonical(input: &str) -> Option<NaiveDate> {
    let [year, month, day] = split_digits(input, [4..=4, 2..=2, 2..=2])?;
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

pub fn format_canonical(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn valid_date_parts(day: u32, month: u32, year: u32) -> bool {
    (1..=31).contains(&day) && (1..=12).contains(&month) && (MIN_YEAR..=MAX_YEAR).contains(&year)
}

/// Splits `input` on `-` into exactly three ASCII-digit runs whose lengths
/// fall within the given bounds.
fn split_digits(
    input: &str,
    widths: [std::ops::RangeInclusive<usize>; 3],
) -> Option<[&str; 3]> {
    let mut parts = input.split('-');
    let mut out = [""; 3];
    for (slot, width) in out.iter_mut().zip(widths.iter()) {
        let part = parts.next()?;
        if !width.contains(&part.len()) || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}
