use chrono::{Local, NaiveDate};

/// Plausible capture dates: after the device went into service, up to today.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateWindow {
    /// Exclusive lower bound
    pub start: NaiveDate,
    /// Inclusive upper bound
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window closing at today's local date. Read once per image so every
    /// engine is judged against the same bound.
    pub fn ending_today(start: NaiveDate) -> Self {
        Self::new(start, Local::now().date_naive())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start < date && date <= self.end
    }
}

/// Outcome of checking one canonical digit string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateCheck {
    Valid(NaiveDate),
    /// Not eight digits, or not a real calendar day
    Unparseable,
    /// A real day, but outside the window
    OutOfWindow(NaiveDate),
}

/// Strict `YYYYMMDD` parse. Impossible days such as `20240231` fail rather
/// than roll over.
pub fn parse_yyyymmdd(digits: &str) -> Option<NaiveDate> {
    if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year: i32 = digits[0..4].parse().ok()?;
    let month: u32 = digits[4..6].parse().ok()?;
    let day: u32 = digits[6..8].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn check_date(digits: &str, window: &DateWindow) -> DateCheck {
    match parse_yyyymmdd(digits) {
        None => DateCheck::Unparseable,
        Some(date) if window.contains(date) => DateCheck::Valid(date),
        Some(date) => DateCheck::OutOfWindow(date),
    }
}

/// `Some(date)` only for a parseable date inside the window.
pub fn validate_date(digits: &str, window: &DateWindow) -> Option<NaiveDate> {
    match check_date(digits, window) {
        DateCheck::Valid(date) => Some(date),
        _ => None,
    }
}
