//! Calendar date-times, the accepted textual date patterns and Julian Days.
//!
//! A [`DateValue`] is either *classic*, parsed from text in one of the
//! [`DateFormat`] patterns, or *Julian*, built from a Julian Day number.
//! Operations never mutate in place: [`DateValue::shift`] and
//! [`DateValue::with_format`] return a new value together with the text the
//! owning card should store.

use core::fmt;

use crate::error::DateError;
use crate::value::format_real;

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_DAY: i64 = 86_400 * NANOS_PER_SECOND;

/// Number of fraction digits a Julian-derived value is rendered with.
pub const JULIAN_FRACTION_DIGITS: u8 = 9;

/// Date given to values parsed from a time-only pattern.
const TIME_ONLY_DATE: (i32, u8, u8) = (-4713, 11, 25);

// ── Calendar ──

/// Proleptic Gregorian leap year, astronomical year numbering.
pub fn is_leap_year(year: i32) -> bool {
    year.rem_euclid(4) == 0 && (year.rem_euclid(100) != 0 || year.rem_euclid(400) == 0)
}

pub fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Days since 1970-01-01.
fn days_from_civil(year: i32, month: u8, day: u8) -> i64 {
    let y = i64::from(year) - i64::from(month <= 2);
    let era = y.div_euclid(400);
    let yoe = y.rem_euclid(400);
    let m = i64::from(month);
    let doy = (153 * (m + if m > 2 { -3 } else { 9 }) + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> Option<(i32, u8, u8)> {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    Some((i32::try_from(year).ok()?, month, day))
}

/// A calendar date and time of day with nanosecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanosecond: u32,
}

impl DateTime {
    /// Builds a date-time, returning `None` for out-of-range fields.
    pub fn new(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        nanosecond: u32,
    ) -> Option<DateTime> {
        let valid = (1..=12).contains(&month)
            && day >= 1
            && day <= days_in_month(year, month)
            && hour < 24
            && minute < 60
            && second < 60
            && i64::from(nanosecond) < NANOS_PER_SECOND;
        valid.then_some(DateTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
            nanosecond,
        })
    }

    fn nanos_of_day(&self) -> i64 {
        ((i64::from(self.hour) * 60 + i64::from(self.minute)) * 60 + i64::from(self.second))
            * NANOS_PER_SECOND
            + i64::from(self.nanosecond)
    }

    fn with_epoch_nanos(days: i64, nanos_of_day: i64) -> Option<DateTime> {
        let (year, month, day) = civil_from_days(days)?;
        let seconds = nanos_of_day / NANOS_PER_SECOND;
        Some(DateTime {
            year,
            month,
            day,
            hour: (seconds / 3600) as u8,
            minute: (seconds / 60 % 60) as u8,
            second: (seconds % 60) as u8,
            nanosecond: (nanos_of_day % NANOS_PER_SECOND) as u32,
        })
    }

    /// Adds a signed number of nanoseconds, carrying into the date.
    pub fn plus_nanos(&self, nanos: i128) -> Option<DateTime> {
        let total = i128::from(self.nanos_of_day()) + nanos;
        let carry = i64::try_from(total.div_euclid(i128::from(NANOS_PER_DAY))).ok()?;
        let nanos_of_day = total.rem_euclid(i128::from(NANOS_PER_DAY)) as i64;
        let days = days_from_civil(self.year, self.month, self.day).checked_add(carry)?;
        DateTime::with_epoch_nanos(days, nanos_of_day)
    }

    /// Adds calendar months, clamping the day to the end of the target month.
    pub fn plus_months(&self, months: i64) -> Option<DateTime> {
        let total = i64::from(self.year)
            .checked_mul(12)?
            .checked_add(i64::from(self.month) - 1)?
            .checked_add(months)?;
        let year = i32::try_from(total.div_euclid(12)).ok()?;
        let month = (total.rem_euclid(12) + 1) as u8;
        Some(DateTime {
            year,
            month,
            day: self.day.min(days_in_month(year, month)),
            ..*self
        })
    }
}

// ── Patterns ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateOrder {
    /// `uuuu-MM-dd`
    Iso,
    /// `MM/dd/uuuu`
    Us,
    /// `MM/dd/yyyy`, year of era
    UsEra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HourWidth {
    /// `HH`
    Two,
    /// `H`
    Flexible,
}

/// The accepted textual date patterns, in parse priority order.
///
/// Every pattern with a time part also accepts an optional fraction of a
/// second: a `.` followed by up to nine digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateFormat {
    IsoT,
    IsoTShortHour,
    IsoSpace,
    IsoSpaceShortHour,
    UsSpace,
    UsSpaceShortHour,
    UsT,
    UsTShortHour,
    IsoDate,
    UsDate,
    Time,
    TimeShortHour,
}

impl DateFormat {
    /// All patterns in the order [`parse`] tries them.
    pub const ALL: [DateFormat; 12] = [
        DateFormat::IsoT,
        DateFormat::IsoTShortHour,
        DateFormat::IsoSpace,
        DateFormat::IsoSpaceShortHour,
        DateFormat::UsSpace,
        DateFormat::UsSpaceShortHour,
        DateFormat::UsT,
        DateFormat::UsTShortHour,
        DateFormat::IsoDate,
        DateFormat::UsDate,
        DateFormat::Time,
        DateFormat::TimeShortHour,
    ];

    /// Pattern used for values built from a Julian Day.
    pub const DEFAULT: DateFormat = DateFormat::IsoT;

    /// The pattern in date-time formatter notation.
    pub const fn pattern(self) -> &'static str {
        match self {
            DateFormat::IsoT => "uuuu-MM-dd'T'HH:mm:ss",
            DateFormat::IsoTShortHour => "uuuu-MM-dd'T'H:mm:ss",
            DateFormat::IsoSpace => "uuuu-MM-dd HH:mm:ss",
            DateFormat::IsoSpaceShortHour => "uuuu-MM-dd H:mm:ss",
            DateFormat::UsSpace => "MM/dd/uuuu HH:mm:ss",
            DateFormat::UsSpaceShortHour => "MM/dd/uuuu H:mm:ss",
            DateFormat::UsT => "MM/dd/uuuu'T'HH:mm:ss",
            DateFormat::UsTShortHour => "MM/dd/uuuu'T'H:mm:ss",
            DateFormat::IsoDate => "uuuu-MM-dd",
            DateFormat::UsDate => "MM/dd/yyyy",
            DateFormat::Time => "HH:mm:ss",
            DateFormat::TimeShortHour => "H:mm:ss",
        }
    }

    /// Position in [`DateFormat::ALL`].
    pub fn index(self) -> usize {
        DateFormat::ALL
            .iter()
            .position(|f| *f == self)
            .unwrap_or_default()
    }

    /// Looks a format up by its pattern text.
    pub fn from_pattern(pattern: &str) -> Option<DateFormat> {
        DateFormat::ALL.into_iter().find(|f| f.pattern() == pattern)
    }

    fn date_order(self) -> Option<DateOrder> {
        use DateFormat::*;
        match self {
            IsoT | IsoTShortHour | IsoSpace | IsoSpaceShortHour | IsoDate => Some(DateOrder::Iso),
            UsSpace | UsSpaceShortHour | UsT | UsTShortHour => Some(DateOrder::Us),
            UsDate => Some(DateOrder::UsEra),
            Time | TimeShortHour => None,
        }
    }

    fn separator(self) -> Option<u8> {
        use DateFormat::*;
        match self {
            IsoT | IsoTShortHour | UsT | UsTShortHour => Some(b'T'),
            IsoSpace | IsoSpaceShortHour | UsSpace | UsSpaceShortHour => Some(b' '),
            _ => None,
        }
    }

    fn hour_width(self) -> Option<HourWidth> {
        use DateFormat::*;
        match self {
            IsoT | IsoSpace | UsSpace | UsT | Time => Some(HourWidth::Two),
            IsoTShortHour | IsoSpaceShortHour | UsSpaceShortHour | UsTShortHour
            | TimeShortHour => Some(HourWidth::Flexible),
            IsoDate | UsDate => None,
        }
    }

    /// True if the pattern renders a time of day.
    pub fn has_time(self) -> bool {
        self.hour_width().is_some()
    }

    /// Parses `text` with this pattern alone. Returns the date-time and the
    /// number of fraction digits present.
    fn parse(self, text: &str) -> Option<(DateTime, u8)> {
        let mut sc = Scanner::new(text);
        let (year, month, day) = match self.date_order() {
            Some(DateOrder::Iso) => {
                let year = sc.year()?;
                sc.expect(b'-')?;
                let month = sc.number(2, 2)?;
                sc.expect(b'-')?;
                (year, month, sc.number(2, 2)?)
            }
            Some(order) => {
                let month = sc.number(2, 2)?;
                sc.expect(b'/')?;
                let day = sc.number(2, 2)?;
                sc.expect(b'/')?;
                let year = if order == DateOrder::UsEra {
                    i32::try_from(sc.number(4, 9)?).ok()?
                } else {
                    sc.year()?
                };
                (year, month, day)
            }
            None => {
                let (y, m, d) = TIME_ONLY_DATE;
                (y, u32::from(m), u32::from(d))
            }
        };
        if let Some(sep) = self.separator() {
            sc.expect(sep)?;
        }
        let (hour, minute, second, nanos, digits) = match self.hour_width() {
            Some(width) => {
                let hour = match width {
                    HourWidth::Two => sc.number(2, 2)?,
                    HourWidth::Flexible => sc.number(1, 2)?,
                };
                sc.expect(b':')?;
                let minute = sc.number(2, 2)?;
                sc.expect(b':')?;
                let second = sc.number(2, 2)?;
                let (nanos, digits) = sc.fraction();
                (hour, minute, second, nanos, digits)
            }
            None => (0, 0, 0, 0, 0),
        };
        if !sc.at_end() {
            return None;
        }
        let month = u8::try_from(month).ok().filter(|m| (1..=12).contains(m))?;
        // Days 29 to 31 past the end of the month resolve to its last day.
        let day = u8::try_from(day).ok().filter(|d| (1..=31).contains(d))?;
        let day = day.min(days_in_month(year, month));
        let date = DateTime::new(
            year,
            month,
            day,
            u8::try_from(hour).ok()?,
            u8::try_from(minute).ok()?,
            u8::try_from(second).ok()?,
            nanos,
        )?;
        Some((date, digits))
    }

    /// Renders `date` with this pattern and at least `min_digits` fraction
    /// digits. More digits are used when the nanoseconds need them.
    fn render(self, date: &DateTime, min_digits: u8) -> String {
        let mut out = String::new();
        match self.date_order() {
            Some(DateOrder::Iso) => {
                out.push_str(&format!(
                    "{}-{:02}-{:02}",
                    format_year(date.year),
                    date.month,
                    date.day
                ));
            }
            Some(DateOrder::Us) => {
                out.push_str(&format!(
                    "{:02}/{:02}/{}",
                    date.month,
                    date.day,
                    format_year(date.year)
                ));
            }
            Some(DateOrder::UsEra) => {
                let year_of_era = if date.year > 0 {
                    i64::from(date.year)
                } else {
                    1 - i64::from(date.year)
                };
                out.push_str(&format!("{:02}/{:02}/{:04}", date.month, date.day, year_of_era));
            }
            None => {}
        }
        if let Some(sep) = self.separator() {
            out.push(sep as char);
        }
        if let Some(width) = self.hour_width() {
            match width {
                HourWidth::Two => out.push_str(&format!("{:02}", date.hour)),
                HourWidth::Flexible => out.push_str(&date.hour.to_string()),
            }
            out.push_str(&format!(":{:02}:{:02}", date.minute, date.second));
            let digits = min_digits.max(significant_fraction_digits(date.nanosecond));
            if digits > 0 {
                let scaled = date.nanosecond / 10u32.pow(u32::from(9 - digits));
                out.push_str(&format!(".{:0width$}", scaled, width = usize::from(digits)));
            }
        }
        out
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern())
    }
}

/// Years print with at least four digits; past 9999 they carry a `+`.
fn format_year(year: i32) -> String {
    if year > 9999 {
        format!("+{year}")
    } else if year < 0 {
        format!("-{:04}", year.unsigned_abs())
    } else {
        format!("{year:04}")
    }
}

fn significant_fraction_digits(nanos: u32) -> u8 {
    if nanos == 0 {
        return 0;
    }
    let mut digits = 9;
    let mut n = nanos;
    while n % 10 == 0 {
        n /= 10;
        digits -= 1;
    }
    digits
}

/// Cursor over ASCII date text.
struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Scanner {
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    /// Reads between `min` and `max` digits, greedily.
    fn number(&mut self, min: usize, max: usize) -> Option<u32> {
        let start = self.pos;
        while self.pos - start < max && self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = &self.bytes[start..self.pos];
        if digits.len() < min {
            return None;
        }
        digits
            .iter()
            .try_fold(0u32, |acc, &b| acc.checked_mul(10)?.checked_add(u32::from(b - b'0')))
    }

    /// An optionally signed year of four to nine digits.
    fn year(&mut self) -> Option<i32> {
        let negative = match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                true
            }
            Some(b'+') => {
                self.pos += 1;
                false
            }
            _ => false,
        };
        let magnitude = i32::try_from(self.number(4, 9)?).ok()?;
        Some(if negative { -magnitude } else { magnitude })
    }

    /// An optional `.` followed by zero to nine digits, as nanoseconds and
    /// the digit count.
    fn fraction(&mut self) -> (u32, u8) {
        if self.expect(b'.').is_none() {
            return (0, 0);
        }
        let start = self.pos;
        let value = self.number(0, 9).unwrap_or_default();
        let digits = (self.pos - start) as u8;
        (value * 10u32.pow(u32::from(9 - digits)), digits)
    }

    fn at_end(&self) -> bool {
        self.pos == self.bytes.len()
    }
}

// ── Date values ──

/// Units accepted by [`DateValue::shift`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
    Microsecond,
}

impl TimeUnit {
    fn nanos(self) -> Option<i128> {
        let seconds = match self {
            TimeUnit::Year | TimeUnit::Month => return None,
            TimeUnit::Day => 86_400,
            TimeUnit::Hour => 3_600,
            TimeUnit::Minute => 60,
            TimeUnit::Second => 1,
            TimeUnit::Millisecond => return Some(1_000_000),
            TimeUnit::Microsecond => return Some(1_000),
        };
        Some(seconds * i128::from(NANOS_PER_SECOND))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Origin {
    /// Parsed from text.
    Classic,
    /// Built from `jd`, which produced `date`.
    Julian { jd: f64, date: DateTime },
}

/// A date facet of a card value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateValue {
    date: DateTime,
    format: DateFormat,
    fraction_digits: u8,
    origin: Origin,
}

/// Parses text against every accepted pattern in priority order.
pub fn parse(text: &str) -> Result<DateValue, DateError> {
    DateFormat::ALL
        .into_iter()
        .find_map(|format| {
            format.parse(text).map(|(date, fraction_digits)| DateValue {
                date,
                format,
                fraction_digits,
                origin: Origin::Classic,
            })
        })
        .ok_or_else(|| DateError::UnknownFormat(text.to_string()))
}

/// Parses a Julian Day written as an integer or a decimal number.
pub fn parse_julian(text: &str) -> Result<DateValue, DateError> {
    let jd = if text.contains('.') {
        text.parse::<f64>().ok().filter(|jd| jd.is_finite())
    } else {
        text.parse::<i64>().ok().map(|n| n as f64)
    }
    .ok_or_else(|| DateError::NotANumber(text.to_string()))?;
    if jd < 0.0 {
        return Err(DateError::Negative(text.to_string()));
    }
    Ok(from_julian_day(jd))
}

/// Converts a non-negative Julian Day to a calendar date-time.
///
/// The residual day fraction is split into hours, minutes, seconds and
/// nanoseconds by truncation. A result of 999,999,999 ns is rounded up to
/// the next second. Years before 1 skip year zero.
pub fn from_julian_day(jd: f64) -> DateValue {
    let jdn = (jd + 0.5).floor();
    let mut fraction = (jd + 0.5) % 1.0;
    let f = jdn + 1401.0 + (((4.0 * jdn + 274_277.0) / 146_097.0).floor() * 3.0 / 4.0).floor() - 38.0;
    let e = 4.0 * f + 3.0;
    let g = ((e % 1461.0) / 4.0).floor();
    let h = g * 5.0 + 2.0;
    let day = ((h % 153.0) / 5.0).floor() as u8 + 1;
    let month = (((h / 153.0).floor() + 2.0) % 12.0) as u8 + 1;
    let mut year = (e / 1461.0).floor() as i64 - 4716 + (14 - i64::from(month)) / 12;
    if year < 1 {
        year -= 1;
    }
    let year = year.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;

    let hour = (fraction * 24.0) as u8;
    fraction = fraction * 24.0 - f64::from(hour);
    let minute = (fraction * 60.0) as u8;
    fraction = fraction * 60.0 - f64::from(minute);
    let second = (fraction * 60.0) as u8;
    fraction = fraction * 60.0 - f64::from(second);
    let nanosecond = (fraction * 1e9) as u32;

    let mut date = DateTime {
        year,
        month,
        day: day.min(days_in_month(year, month)),
        hour: hour.min(23),
        minute: minute.min(59),
        second: second.min(59),
        nanosecond: nanosecond.min(999_999_999),
    };
    if date.nanosecond == 999_999_999 {
        date = date.plus_nanos(1).unwrap_or(date);
    }
    DateValue {
        date,
        format: DateFormat::DEFAULT,
        fraction_digits: JULIAN_FRACTION_DIGITS,
        origin: Origin::Julian { jd, date },
    }
}

impl DateValue {
    /// Wraps a calendar date-time as a classic value in `format`.
    pub fn from_date(date: DateTime, format: DateFormat) -> DateValue {
        DateValue {
            date,
            format,
            fraction_digits: 0,
            origin: Origin::Classic,
        }
    }

    pub fn date(&self) -> DateTime {
        self.date
    }

    pub fn format(&self) -> DateFormat {
        self.format
    }

    /// True if the value came from a Julian Day number.
    pub fn is_julian(&self) -> bool {
        matches!(self.origin, Origin::Julian { .. })
    }

    /// True if the value came from date text.
    pub fn is_classic(&self) -> bool {
        !self.is_julian()
    }

    /// The Julian Day of this date-time.
    ///
    /// A value built from a Julian Day whose calendar fields are unchanged
    /// reports that original number verbatim.
    pub fn julian_day(&self) -> f64 {
        if let Origin::Julian { jd, date } = self.origin {
            if date == self.date {
                return jd;
            }
        }
        let d = &self.date;
        let a = (14 - i64::from(d.month)) / 12;
        let mut year = i64::from(d.year);
        if year < 0 {
            year += 1;
        }
        let y = year + 4800 - a;
        let m = i64::from(d.month) + 12 * a - 3;
        let jdn = i64::from(d.day) + (153 * m + 2) / 5 + 365 * y + y / 4 - y / 100 + y / 400 - 32045;
        jdn as f64
            + (f64::from(d.hour) - 12.0) / 24.0
            + f64::from(d.minute) / 1440.0
            + f64::from(d.second) / 86400.0
            + f64::from(d.nanosecond) / 86_400_000_000_000.0
    }

    /// Renders the date-time with `format`.
    pub fn format_with(&self, format: DateFormat) -> String {
        format.render(&self.date, self.fraction_digits)
    }

    /// Text a card stores for this value: the pattern rendering for classic
    /// values, the Julian Day for Julian ones.
    pub fn card_text(&self) -> String {
        if self.is_julian() {
            format_real(self.julian_day())
        } else {
            self.to_string()
        }
    }

    /// Adds `amount` of `unit`. Returns the shifted value and the text its
    /// card should now hold.
    pub fn shift(&self, amount: i64, unit: TimeUnit) -> Result<(DateValue, String), DateError> {
        let out_of_range = || DateError::OutOfRange(format!("{self} shifted by {amount} {unit:?}"));
        let date = match unit {
            TimeUnit::Year => amount
                .checked_mul(12)
                .and_then(|months| self.date.plus_months(months)),
            TimeUnit::Month => self.date.plus_months(amount),
            _ => unit
                .nanos()
                .and_then(|n| self.date.plus_nanos(n * i128::from(amount))),
        }
        .ok_or_else(out_of_range)?;
        let shifted = DateValue { date, ..*self };
        let text = shifted.card_text();
        Ok((shifted, text))
    }

    /// Re-binds the value to another pattern. Returns the new value and the
    /// text its card should now hold.
    pub fn with_format(&self, format: DateFormat) -> (DateValue, String) {
        let value = DateValue { format, ..*self };
        let text = value.card_text();
        (value, text)
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with(self.format))
    }
}

/// Julian Day of a date value.
pub fn to_julian_day(date: &DateValue) -> f64 {
    date.julian_day()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> DateTime {
        DateTime::new(year, month, day, hour, minute, second, 0).unwrap()
    }

    // ---- calendar ----

    #[test]
    fn leap_years() {
        assert!(is_leap_year(2000));
        assert!(is_leap_year(2016));
        assert!(!is_leap_year(1900));
        assert!(is_leap_year(0));
        assert!(is_leap_year(-4));
        assert_eq!(days_in_month(2015, 2), 28);
        assert_eq!(days_in_month(2016, 2), 29);
    }

    #[test]
    fn civil_days_round_trip() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(2000, 3, 1), 11_017);
        for days in [-1_000_000, -1, 0, 59, 10_957, 2_000_000] {
            let (y, m, d) = civil_from_days(days).unwrap();
            assert_eq!(days_from_civil(y, m, d), days);
        }
    }

    #[test]
    fn date_time_rejects_invalid_fields() {
        assert!(DateTime::new(2015, 2, 29, 0, 0, 0, 0).is_none());
        assert!(DateTime::new(2016, 13, 1, 0, 0, 0, 0).is_none());
        assert!(DateTime::new(2016, 1, 1, 24, 0, 0, 0).is_none());
    }

    // ---- parsing ----

    #[test]
    fn parse_iso_date_time() {
        let value = parse("2016-03-04T05:06:07").unwrap();
        assert_eq!(value.date(), dt(2016, 3, 4, 5, 6, 7));
        assert_eq!(value.format(), DateFormat::IsoT);
        assert!(value.is_classic());
    }

    #[test]
    fn parse_priority_and_variants() {
        assert_eq!(parse("2016-03-04T5:06:07").unwrap().format(), DateFormat::IsoTShortHour);
        assert_eq!(parse("2016-03-04 05:06:07").unwrap().format(), DateFormat::IsoSpace);
        assert_eq!(parse("2016-03-04 5:06:07").unwrap().format(), DateFormat::IsoSpaceShortHour);
        assert_eq!(parse("03/04/2016 05:06:07").unwrap().format(), DateFormat::UsSpace);
        assert_eq!(parse("03/04/2016T5:06:07").unwrap().format(), DateFormat::UsTShortHour);
        assert_eq!(parse("2016-03-04").unwrap().format(), DateFormat::IsoDate);
        assert_eq!(parse("03/04/2016").unwrap().format(), DateFormat::UsDate);
        assert_eq!(parse("05:06:07").unwrap().format(), DateFormat::Time);
        assert_eq!(parse("5:06:07").unwrap().format(), DateFormat::TimeShortHour);
    }

    #[test]
    fn parse_us_order_is_month_first() {
        let value = parse("12/31/1999 23:59:59").unwrap();
        assert_eq!(value.date(), dt(1999, 12, 31, 23, 59, 59));
    }

    #[test]
    fn parse_fraction() {
        let value = parse("2016-03-04T05:06:07.25").unwrap();
        assert_eq!(value.date().nanosecond, 250_000_000);
        assert_eq!(value.to_string(), "2016-03-04T05:06:07.25");
        let value = parse("05:06:07.123456789").unwrap();
        assert_eq!(value.date().nanosecond, 123_456_789);
        assert!(parse("05:06:07.1234567891").is_err());
    }

    #[test]
    fn parse_defaults_missing_parts() {
        assert_eq!(parse("2016-03-04").unwrap().date(), dt(2016, 3, 4, 0, 0, 0));
        assert_eq!(parse("10:20:30").unwrap().date(), dt(-4713, 11, 25, 10, 20, 30));
    }

    #[test]
    fn parse_clamps_short_month_days() {
        assert_eq!(parse("2015-02-30").unwrap().date(), dt(2015, 2, 28, 0, 0, 0));
        assert!(parse("2015-02-32").is_err());
        assert!(parse("2015-13-01").is_err());
    }

    #[test]
    fn parse_rejects_unknown_text() {
        for text in ["", "yesterday", "2016/03/04", "2016-3-4", "25:00:00", "2016-03-04T05:06"] {
            assert_eq!(parse(text), Err(DateError::UnknownFormat(text.to_string())), "{text}");
        }
    }

    #[test]
    fn parse_julian_variants() {
        assert!(parse_julian("2451545").unwrap().is_julian());
        assert!(parse_julian("2451545.25").is_ok());
        assert_eq!(parse_julian("abc"), Err(DateError::NotANumber("abc".into())));
        assert_eq!(parse_julian("1e5"), Err(DateError::NotANumber("1e5".into())));
        assert_eq!(parse_julian("-1.5"), Err(DateError::Negative("-1.5".into())));
        assert_eq!(parse_julian("-3"), Err(DateError::Negative("-3".into())));
    }

    // ---- Julian Day ----

    #[test]
    fn j2000_reference() {
        let value = parse("2000-01-01T12:00:00").unwrap();
        assert_eq!(to_julian_day(&value), 2451545.0);
    }

    #[test]
    fn julian_reference_renders_default_format() {
        let value = parse_julian("2451545.0").unwrap();
        assert_eq!(value.date(), dt(2000, 1, 1, 12, 0, 0));
        assert_eq!(value.to_string(), "2000-01-01T12:00:00.000000000");
    }

    #[test]
    fn julian_day_fraction() {
        let value = parse("2000-01-02T00:00:00").unwrap();
        assert_eq!(value.julian_day(), 2451545.5);
        let value = from_julian_day(2451545.75);
        assert_eq!(value.date(), dt(2000, 1, 2, 6, 0, 0));
    }

    #[test]
    fn original_julian_day_is_reported_verbatim() {
        let jd = 2457388.123456789;
        let value = from_julian_day(jd);
        assert_eq!(value.julian_day(), jd);
        let (shifted, _) = value.shift(1, TimeUnit::Day).unwrap();
        assert!((shifted.julian_day() - (jd + 1.0)).abs() < 1e-6);
        let (back, _) = shifted.shift(-1, TimeUnit::Day).unwrap();
        assert_eq!(back.julian_day(), jd);
    }

    #[test]
    fn inverse_consistency() {
        for text in [
            "2016-01-01T00:00:00",
            "1999-12-31 23:59:59",
            "03/15/1582 08:30:00",
            "2024-02-29T12:34:56.5",
            "1066-10-14",
        ] {
            let value = parse(text).unwrap();
            let back = from_julian_day(value.julian_day());
            let instant = |d: DateTime| {
                i128::from(days_from_civil(d.year, d.month, d.day)) * i128::from(NANOS_PER_DAY)
                    + i128::from(d.nanos_of_day())
            };
            let diff = instant(value.date()) - instant(back.date());
            assert!(diff.abs() < 1_000_000, "{text}: {diff}");
        }
    }

    #[test]
    fn epoch_dates_skip_year_zero() {
        let value = from_julian_day(0.0);
        assert_eq!(value.date(), dt(-4714, 11, 24, 12, 0, 0));
        assert_eq!(value.julian_day(), 0.0);
        let rebuilt = DateValue::from_date(value.date(), DateFormat::IsoT);
        assert_eq!(rebuilt.julian_day(), 0.0);
    }

    // ---- shifting and formatting ----

    #[test]
    fn shift_units() {
        let value = parse("2016-01-31T23:59:59").unwrap();
        let cases = [
            (TimeUnit::Year, "2017-01-31T23:59:59"),
            (TimeUnit::Month, "2016-02-29T23:59:59"),
            (TimeUnit::Day, "2016-02-01T23:59:59"),
            (TimeUnit::Hour, "2016-02-01T00:59:59"),
            (TimeUnit::Minute, "2016-02-01T00:00:59"),
            (TimeUnit::Second, "2016-02-01T00:00:00"),
            (TimeUnit::Millisecond, "2016-01-31T23:59:59.001"),
            (TimeUnit::Microsecond, "2016-01-31T23:59:59.000001"),
        ];
        for (unit, expected) in cases {
            let (_, text) = value.shift(1, unit).unwrap();
            assert_eq!(text, expected, "{unit:?}");
        }
    }

    #[test]
    fn shift_backwards_across_year() {
        let value = parse("01/01/2016").unwrap();
        let (shifted, text) = value.shift(-1, TimeUnit::Day).unwrap();
        assert_eq!(text, "12/31/2015");
        assert_eq!(shifted.format(), DateFormat::UsDate);
    }

    #[test]
    fn shift_julian_value_renders_julian_day() {
        let value = parse_julian("2451545").unwrap();
        let (_, text) = value.shift(12, TimeUnit::Hour).unwrap();
        assert_eq!(text, "2451545.5");
    }

    #[test]
    fn shift_out_of_range() {
        let value = parse("2016-01-01").unwrap();
        assert!(matches!(
            value.shift(i64::MAX, TimeUnit::Year),
            Err(DateError::OutOfRange(_))
        ));
    }

    #[test]
    fn with_format_rerenders() {
        let value = parse("2016-03-04T05:06:07").unwrap();
        let (value, text) = value.with_format(DateFormat::UsSpaceShortHour);
        assert_eq!(text, "03/04/2016 5:06:07");
        assert_eq!(value.format_with(DateFormat::IsoDate), "2016-03-04");
        assert_eq!(value.format_with(DateFormat::Time), "05:06:07");
    }

    #[test]
    fn format_negative_and_large_years() {
        let value = DateValue::from_date(dt(-4713, 11, 25, 0, 0, 0), DateFormat::IsoDate);
        assert_eq!(value.to_string(), "-4713-11-25");
        assert_eq!(value.format_with(DateFormat::UsDate), "11/25/4714");
        let value = DateValue::from_date(dt(12345, 1, 2, 0, 0, 0), DateFormat::IsoDate);
        assert_eq!(value.to_string(), "+12345-01-02");
    }

    #[test]
    fn pattern_lookup() {
        assert_eq!(DateFormat::from_pattern("uuuu-MM-dd"), Some(DateFormat::IsoDate));
        assert_eq!(DateFormat::from_pattern("dd.MM.uuuu"), None);
        assert_eq!(DateFormat::TimeShortHour.index(), 11);
        assert!(!DateFormat::UsDate.has_time());
    }
}
