//! Header cards: decoding 80-byte records, validation and encoding.

use tracing::debug;

use crate::block::{BLANK_CARD, CARD_SIZE, CONTINUE_PREFIX, KEYWORD_SIZE};
use crate::date::{self, DateFormat, DateValue, TimeUnit};
use crate::error::{Error, Result};
use crate::keyword::{Keyword, KeywordId, ValueType};
use crate::problem::{CardPart, Problem};
use crate::value::{parse_int_field, parse_real_field, Value};

/// Column where the real-value field starts.
pub const VALUE_START: usize = 10;
/// Column where the imaginary-value field starts and the real field ends.
pub const IMAGINARY_START: usize = 30;
/// Column where the comment of a card with an imaginary value starts.
pub const COMMENT_START: usize = 50;
/// Longest encoded numeric value.
pub const VALUE_WIDTH: usize = IMAGINARY_START - VALUE_START;
/// Room for a literal value and its comment on one card.
pub const PAYLOAD_WIDTH: usize = CARD_SIZE - VALUE_START;
/// Longest COMMENT or HISTORY text.
pub const TEXT_WIDTH: usize = CARD_SIZE - KEYWORD_SIZE;

const COMMENT_SEPARATOR: &str = " / ";
/// Apostrophes and `&` around a non-final literal fragment.
const FRAGMENT_RESERVED: usize = 3;
const BITPIX_VALUES: [i64; 5] = [-64, -32, 8, 16, 32];

// ── Types ──

/// One logical header card, with any CONTINUE records folded in.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    keyword: KeywordId,
    real: Option<Value>,
    imaginary: Option<Value>,
    comment: String,
    continuations: usize,
    date: Option<DateValue>,
}

impl Default for Card {
    fn default() -> Self {
        Card::blank()
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int,
    Real,
}

impl Number {
    fn parse(self, field: &str) -> Option<Value> {
        match self {
            Number::Int => parse_int_field(field).map(Value::Integer),
            Number::Real => parse_real_field(field).map(Value::Real),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Number::Int => "integer",
            Number::Real => "real number",
        }
    }
}

impl Card {
    /// A card with the blank keyword and nothing else.
    pub fn blank() -> Card {
        Card::new(Keyword::Empty)
    }

    /// A card with the given keyword and no value or comment.
    pub fn new(keyword: impl Into<KeywordId>) -> Card {
        Card {
            keyword: keyword.into(),
            real: None,
            imaginary: None,
            comment: String::new(),
            continuations: 0,
            date: None,
        }
    }

    /// A card holding `value`.
    pub fn with_value(keyword: impl Into<KeywordId>, value: Value) -> Card {
        let mut card = Card::new(keyword);
        card.set_real(Some(value));
        card
    }

    /// Builder form of [`Card::set_comment`].
    pub fn with_comment(mut self, comment: &str) -> Card {
        self.set_comment(comment);
        self
    }

    // ── Accessors ──

    pub fn keyword(&self) -> &KeywordId {
        &self.keyword
    }

    /// Keyword name as written in the header.
    pub fn name(&self) -> String {
        self.keyword.name()
    }

    pub fn real(&self) -> Option<&Value> {
        self.real.as_ref()
    }

    pub fn imaginary(&self) -> Option<&Value> {
        self.imaginary.as_ref()
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Number of CONTINUE records folded into this card.
    pub fn continuations(&self) -> usize {
        self.continuations
    }

    /// Date view of the real value, if it reads as one.
    pub fn date(&self) -> Option<&DateValue> {
        self.date.as_ref()
    }

    pub fn is_end(&self) -> bool {
        self.keyword.is(Keyword::End)
    }

    pub fn real_text(&self) -> String {
        self.real.as_ref().map(Value::to_string).unwrap_or_default()
    }

    pub fn imaginary_text(&self) -> String {
        self.imaginary.as_ref().map(Value::to_string).unwrap_or_default()
    }

    /// The data type the card currently carries.
    ///
    /// Structural keywords report [`ValueType::None`]. Otherwise the real
    /// value decides, then the imaginary value, and an empty card counts as
    /// a literal.
    pub fn data_type(&self) -> ValueType {
        if self.keyword.value_type() == ValueType::None {
            return ValueType::None;
        }
        self.real
            .as_ref()
            .or(self.imaginary.as_ref())
            .map_or(ValueType::Literal, Value::value_type)
    }

    /// Human-readable value: complex numbers as `(re, im)`, nothing for
    /// structural keywords other than COMMENT and HISTORY.
    pub fn value_text(&self) -> String {
        match self.data_type() {
            ValueType::Int | ValueType::Real if self.imaginary.is_some() => {
                format!("({}, {})", self.real_text(), self.imaginary_text())
            }
            ValueType::None if !self.is_commentary() => String::new(),
            _ => self.real_text(),
        }
    }

    fn is_commentary(&self) -> bool {
        self.keyword.is(Keyword::Comment) || self.keyword.is(Keyword::History)
    }

    // ── Mutators ──

    /// Sets the real value from typed text (integer, real, logical, then
    /// literal; see [`Value::parse`]) and recomputes the date view.
    pub fn set_real_value(&mut self, text: &str) {
        self.set_real(Some(Value::parse(text)));
    }

    /// Sets the real value and recomputes the date view.
    pub fn set_real(&mut self, value: Option<Value>) {
        self.real = value;
        self.refresh_date();
    }

    /// Sets the imaginary value from typed text; empty text removes it.
    pub fn set_imaginary_value(&mut self, text: &str) {
        self.imaginary = if text.is_empty() {
            None
        } else {
            Some(Value::parse(text))
        };
    }

    /// Sets the comment with trailing whitespace removed.
    pub fn set_comment(&mut self, comment: &str) {
        self.comment = comment.trim_end().to_string();
    }

    /// Renames the card. The value is kept as is.
    pub fn set_keyword(&mut self, name: &str) {
        self.keyword = KeywordId::parse(name);
    }

    /// Shifts the date view and writes the result back as the real value.
    pub fn shift_date(&mut self, amount: i64, unit: TimeUnit) -> Result<()> {
        let date = self.require_date()?;
        let (_, text) = date.shift(amount, unit)?;
        self.set_real_value(&text);
        Ok(())
    }

    /// Re-renders the date view with `format` and writes it back.
    pub fn set_date_format(&mut self, format: DateFormat) -> Result<()> {
        let date = self.require_date()?;
        let (_, text) = date.with_format(format);
        self.set_real_value(&text);
        Ok(())
    }

    fn require_date(&self) -> Result<DateValue> {
        self.date
            .ok_or_else(|| Error::Edit(format!("keyword {} does not hold a date", self.keyword)))
    }

    fn refresh_date(&mut self) {
        self.date = match &self.real {
            Some(value @ (Value::Integer(_) | Value::Real(_))) => value
                .as_f64()
                .filter(|jd| jd.is_finite() && *jd >= 0.0)
                .map(date::from_julian_day),
            Some(Value::Literal(text)) => match date::parse(text) {
                Ok(date) => Some(date),
                Err(e) => {
                    debug!(keyword = %self.keyword, error = %e, "value is not a date");
                    None
                }
            },
            _ => None,
        };
    }

    /// Folds a decoded CONTINUE card into this one.
    pub(crate) fn append_continuation(&mut self, next: &Card) -> Result<()> {
        if self.data_type() != ValueType::Literal {
            return Err(Error::format(
                "CONTINUE",
                format!("previous card {} does not have a literal value", self.keyword),
            ));
        }
        let Some(Value::Literal(text)) = &mut self.real else {
            return Err(Error::format("CONTINUE", "previous card has no value to continue"));
        };
        if text.pop() != Some('&') {
            return Err(Error::format(
                "CONTINUE",
                format!("value of {} does not end with &", self.keyword),
            ));
        }
        text.push_str(&next.real_text());
        let comment = format!("{}{}", self.comment, next.comment);
        self.set_comment(&comment);
        self.continuations += 1;
        self.refresh_date();
        Ok(())
    }

    fn format_error(&self, reason: impl Into<String>) -> Error {
        Error::format(self.keyword.name(), reason)
    }
}

// ── Decoding ──

impl Card {
    /// Decodes one 80-byte record. Shorter input is padded with spaces.
    ///
    /// A CONTINUE record decodes to a standalone card holding its fragment;
    /// the header assembler folds it into the card before it.
    pub fn decode(record: &[u8]) -> Result<Card> {
        let mut entry = BLANK_CARD;
        let len = record.len().min(CARD_SIZE);
        entry[..len].copy_from_slice(&record[..len]);

        let mut card = Card::new(KeywordId::from_card(&entry));
        match card.keyword.value_type() {
            ValueType::Logical => card.decode_logical(&entry)?,
            ValueType::Int => card.decode_number(&entry, Number::Int)?,
            ValueType::Real => card.decode_number(&entry, Number::Real)?,
            ValueType::Literal => {
                if entry[VALUE_START] != b'\'' {
                    return Err(card.format_error("literal value must start with an apostrophe"));
                }
                card.decode_literal(&entry)?;
            }
            ValueType::Custom => card.decode_custom(&entry)?,
            ValueType::None => card.decode_structural(&entry)?,
        }
        card.refresh_date();
        Ok(card)
    }

    fn decode_logical(&mut self, entry: &[u8; CARD_SIZE]) -> Result<()> {
        self.real = Some(match entry[IMAGINARY_START - 1] {
            b'T' => Value::Logical(true),
            b'F' => Value::Logical(false),
            other => {
                return Err(self.format_error(format!(
                    "logical value must be T or F, not '{}'",
                    other as char
                )))
            }
        });
        self.comment = comment_after(entry, IMAGINARY_START);
        Ok(())
    }

    fn decode_number(&mut self, entry: &[u8; CARD_SIZE], kind: Number) -> Result<()> {
        let field = &entry[VALUE_START..IMAGINARY_START];
        // A free-format value may already carry its comment.
        let (field, comment_from) = match field.iter().position(|&b| b == b'/') {
            Some(slash) => (&field[..slash], VALUE_START + slash),
            None => (field, IMAGINARY_START),
        };
        let text = latin1(field);
        self.real = Some(kind.parse(&text).ok_or_else(|| {
            self.format_error(format!("\"{}\" is not {}", text.trim(), kind.describe()))
        })?);

        if comment_from == IMAGINARY_START {
            let imaginary = latin1(&entry[IMAGINARY_START..COMMENT_START]);
            if !imaginary.trim().is_empty() && !imaginary.contains('/') {
                self.imaginary = Some(kind.parse(&imaginary).ok_or_else(|| {
                    self.format_error(format!(
                        "\"{}\" is not {}",
                        imaginary.trim(),
                        kind.describe()
                    ))
                })?);
            }
        }
        self.comment = comment_after(entry, comment_from);
        Ok(())
    }

    fn decode_literal(&mut self, entry: &[u8; CARD_SIZE]) -> Result<()> {
        let close = closing_quote(entry, VALUE_START)
            .ok_or_else(|| self.format_error("literal value must end with an apostrophe"))?;
        let text = unescape(&latin1(&entry[VALUE_START + 1..close]));
        self.real = Some(Value::Literal(text.trim_end().to_string()));
        self.comment = comment_after(entry, close + 1);
        Ok(())
    }

    /// Unregistered keywords are typed by the shape of their value field.
    fn decode_custom(&mut self, entry: &[u8; CARD_SIZE]) -> Result<()> {
        if entry[VALUE_START] == b'\'' && closing_quote(entry, VALUE_START).is_some() {
            self.decode_literal(entry)
        } else if entry[VALUE_START..IMAGINARY_START].contains(&b'.') {
            self.decode_number(entry, Number::Real)
        } else if matches!(entry[IMAGINARY_START - 1], b'T' | b'F') {
            self.decode_logical(entry)
        } else {
            self.decode_number(entry, Number::Int)
        }
    }

    fn decode_structural(&mut self, entry: &[u8; CARD_SIZE]) -> Result<()> {
        match self.keyword.keyword() {
            Some(Keyword::Comment | Keyword::History) => {
                let text = latin1(&entry[KEYWORD_SIZE..]);
                self.real = Some(Value::Literal(text.trim_end().to_string()));
            }
            Some(Keyword::Empty) => {
                let comment = match find(entry, b"/ ", KEYWORD_SIZE) {
                    Some(slash) => latin1(&entry[slash + 2..]),
                    None => latin1(&entry[KEYWORD_SIZE..]).trim_start().to_string(),
                };
                self.set_comment(&comment);
            }
            Some(Keyword::Continue) => {
                let open = find(entry, b"'", VALUE_START)
                    .ok_or_else(|| self.format_error("value must start with an apostrophe"))?;
                let close = closing_quote(entry, open)
                    .ok_or_else(|| self.format_error("value must end with an apostrophe"))?;
                let text = unescape(&latin1(&entry[open + 1..close]));
                self.real = Some(Value::Literal(text.trim_end().to_string()));
                self.comment = comment_after(entry, close + 1);
            }
            _ => {}
        }
        Ok(())
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// Index of the apostrophe closing the literal opened at `open`, skipping
/// doubled apostrophes.
fn closing_quote(entry: &[u8], open: usize) -> Option<usize> {
    let mut i = open + 1;
    while i < entry.len() {
        if entry[i] == b'\'' {
            if entry.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}

fn unescape(text: &str) -> String {
    text.replace("''", "'")
}

/// Comment text after the first `/ ` at or after `start`, else after the
/// first ` /`.
fn comment_after(entry: &[u8], start: usize) -> String {
    find(entry, b"/ ", start)
        .or_else(|| find(entry, b" /", start))
        .map(|at| latin1(&entry[at + 2..]).trim_end().to_string())
        .unwrap_or_default()
}

// ── Validation ──

fn is_printable(text: &str) -> bool {
    text.chars().all(|c| (' '..='~').contains(&c))
}

fn is_keyword_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_'
}

impl Card {
    /// Reports everything that prevents this card from being saved.
    pub fn validate(&self) -> Vec<Problem> {
        let keyword = self.keyword.name();
        let mut problems = Vec::new();
        let registered = self.keyword.value_type();
        let data_type = self.data_type();
        let numeric = matches!(data_type, ValueType::Int | ValueType::Real);
        let real_text = self.real_text();
        let imaginary_text = self.imaginary_text();

        if !matches!(registered, ValueType::None | ValueType::Custom) && data_type != registered {
            problems.push(Problem::TypeMismatch {
                keyword: keyword.clone(),
                found: data_type,
                expected: registered,
            });
        }
        if let Some(imaginary) = self.imaginary.as_ref().filter(|_| !imaginary_text.is_empty()) {
            if numeric && imaginary.value_type() != data_type {
                problems.push(Problem::ImaginaryTypeMismatch {
                    keyword: keyword.clone(),
                    real: data_type,
                    imaginary: imaginary.value_type(),
                });
            }
        }
        if numeric && real_text.len() > VALUE_WIDTH {
            problems.push(Problem::ValueTooLong {
                keyword: keyword.clone(),
                part: CardPart::Real,
                max: VALUE_WIDTH,
            });
        }
        if self.imaginary.as_ref().is_some_and(Value::is_numeric) && imaginary_text.len() > VALUE_WIDTH
        {
            problems.push(Problem::ValueTooLong {
                keyword: keyword.clone(),
                part: CardPart::Imaginary,
                max: VALUE_WIDTH,
            });
        }
        if self.is_commentary() && real_text.len() > TEXT_WIDTH {
            problems.push(Problem::ValueTooLong {
                keyword: keyword.clone(),
                part: CardPart::Real,
                max: TEXT_WIDTH,
            });
        }
        if self.keyword.info().unit && self.comment.is_empty() {
            problems.push(Problem::MissingUnit {
                keyword: keyword.clone(),
            });
        }
        if !imaginary_text.is_empty() {
            if real_text.is_empty() {
                problems.push(Problem::ImaginaryWithoutReal {
                    keyword: keyword.clone(),
                });
            } else if matches!(data_type, ValueType::Literal | ValueType::Logical) {
                problems.push(Problem::ImaginaryNotAllowed {
                    keyword: keyword.clone(),
                    data_type,
                });
            }
        }
        let comment_start = match data_type {
            ValueType::Logical => Some(IMAGINARY_START),
            _ if numeric && imaginary_text.is_empty() => Some(IMAGINARY_START),
            _ if numeric => Some(COMMENT_START),
            _ if self.keyword.is(Keyword::Empty) => Some(IMAGINARY_START),
            _ => None,
        };
        if let Some(start) = comment_start {
            let max = CARD_SIZE - start - COMMENT_SEPARATOR.len();
            if self.comment.len() > max {
                problems.push(Problem::CommentTooLong {
                    keyword: keyword.clone(),
                    len: self.comment.len(),
                    max,
                });
            }
        }
        if self.keyword.index().is_some_and(|n| n < 1) {
            problems.push(Problem::IndexBelowOne {
                keyword: keyword.clone(),
            });
        }
        let value = self.value_text();
        if !is_printable(&value) {
            problems.push(Problem::ForbiddenValueChars {
                keyword: keyword.clone(),
                value,
            });
        }
        if !is_printable(&self.comment) {
            problems.push(Problem::ForbiddenCommentChars {
                keyword: keyword.clone(),
                comment: self.comment.clone(),
            });
        }
        self.validate_keyword_rules(&keyword, &mut problems);
        problems
    }

    fn validate_keyword_rules(&self, keyword: &str, problems: &mut Vec<Problem>) {
        let unexpected = |part: CardPart, text: String| Problem::UnexpectedContent {
            keyword: keyword.to_string(),
            part,
            text,
        };
        let real = self.real_text();
        let imaginary = self.imaginary_text();
        match &self.keyword {
            KeywordId::Custom(name) => {
                if !name.chars().all(is_keyword_char) {
                    problems.push(Problem::InvalidKeywordChars {
                        keyword: name.clone(),
                    });
                }
                if name.len() > KEYWORD_SIZE {
                    problems.push(Problem::KeywordTooLong {
                        keyword: name.clone(),
                    });
                }
            }
            KeywordId::Known(Keyword::Empty) => {
                if !real.is_empty() {
                    problems.push(unexpected(CardPart::Real, real));
                }
                if !imaginary.is_empty() {
                    problems.push(unexpected(CardPart::Imaginary, imaginary));
                }
            }
            KeywordId::Known(Keyword::End) => {
                if !real.is_empty() {
                    problems.push(unexpected(CardPart::Real, real));
                }
                if !imaginary.is_empty() {
                    problems.push(unexpected(CardPart::Imaginary, imaginary));
                }
                if !self.comment.is_empty() {
                    problems.push(unexpected(CardPart::Comment, self.comment.clone()));
                }
            }
            KeywordId::Known(Keyword::Comment | Keyword::History) => {
                if !imaginary.is_empty() {
                    problems.push(unexpected(CardPart::Imaginary, imaginary));
                }
                if !self.comment.is_empty() {
                    problems.push(unexpected(CardPart::Comment, self.comment.clone()));
                }
            }
            KeywordId::Known(Keyword::Continue) => {
                if !imaginary.is_empty() {
                    problems.push(unexpected(CardPart::Imaginary, imaginary));
                }
            }
            KeywordId::Known(Keyword::Bitpix) => {
                if let Some(Value::Integer(value)) = self.real {
                    if !BITPIX_VALUES.contains(&value) {
                        problems.push(Problem::InvalidBitpix { value });
                    }
                }
            }
            KeywordId::Known(Keyword::Naxis) => {
                if let Some(Value::Integer(value)) = self.real {
                    if !(0..=999).contains(&value) {
                        problems.push(Problem::NaxisOutOfRange { value });
                    }
                }
            }
            KeywordId::Indexed(Keyword::NaxisN, _) | KeywordId::Known(Keyword::Pedestal) => {
                if let Some(Value::Integer(value)) = self.real {
                    if value < 0 {
                        problems.push(Problem::Negative {
                            keyword: keyword.to_string(),
                        });
                    }
                }
            }
            _ => {}
        }
    }
}

// ── Encoding ──

fn put(card: &mut [u8], at: usize, text: &[u8]) {
    if at >= card.len() {
        return;
    }
    let end = (at + text.len()).min(card.len());
    card[at..end].copy_from_slice(&text[..end - at]);
}

impl Card {
    /// Encodes the card as one or more 80-byte records.
    ///
    /// Returns `None` if [`Card::validate`] reports any problem. Long literal
    /// values spill into CONTINUE records.
    pub fn encode(&self) -> Option<Vec<u8>> {
        if !self.validate().is_empty() {
            return None;
        }
        let mut out = BLANK_CARD.to_vec();
        put(&mut out, 0, self.keyword.name().as_bytes());
        let data_type = self.data_type();
        if data_type != ValueType::None {
            out[KEYWORD_SIZE] = b'=';
        }

        if self.is_commentary() {
            put(&mut out, KEYWORD_SIZE, self.real_text().as_bytes());
            return Some(out);
        }
        match data_type {
            ValueType::Int | ValueType::Real => {
                let real = self.real_text();
                put(&mut out, IMAGINARY_START - real.len(), real.as_bytes());
                let imaginary = self.imaginary_text();
                let comment_start = if imaginary.is_empty() {
                    IMAGINARY_START
                } else {
                    put(&mut out, COMMENT_START - imaginary.len(), imaginary.as_bytes());
                    COMMENT_START
                };
                self.put_comment(&mut out, comment_start);
            }
            ValueType::Logical => {
                out[IMAGINARY_START - 1] = if self.real == Some(Value::Logical(true)) {
                    b'T'
                } else {
                    b'F'
                };
                self.put_comment(&mut out, IMAGINARY_START);
            }
            ValueType::Literal => self.encode_literal(&mut out),
            _ if self.keyword.is(Keyword::Continue) => self.encode_literal(&mut out),
            _ if self.keyword.is(Keyword::Empty) => self.put_comment(&mut out, IMAGINARY_START),
            _ => {}
        }
        Some(out)
    }

    fn put_comment(&self, card: &mut [u8], at: usize) {
        if !self.comment.is_empty() {
            put(card, at, format!("{COMMENT_SEPARATOR}{}", self.comment).as_bytes());
        }
    }

    /// Writes the quoted value and comment at the value column, continuing
    /// on CONTINUE records while they do not fit.
    fn encode_literal(&self, out: &mut Vec<u8>) {
        let mut value = self.real_text().replace('\'', "''");
        let mut comment = self.comment.clone();
        let mut start = 0;
        loop {
            let value_len = value.len() + 2;
            let comment_len = if comment.is_empty() {
                0
            } else {
                COMMENT_SEPARATOR.len() + comment.len()
            };
            let last = value_len + comment_len <= PAYLOAD_WIDTH;
            let mut payload;
            if last {
                payload = format!("'{value}'");
                if !comment.is_empty() {
                    payload.push_str(COMMENT_SEPARATOR);
                    payload.push_str(&comment);
                }
            } else {
                let (value_cut, comment_cut) = split_points(&value, &comment);
                payload = format!("'{}&'", &value[..value_cut]);
                if comment_cut > 0 {
                    payload.push_str(COMMENT_SEPARATOR);
                    payload.push_str(&comment[..comment_cut]);
                }
                value = value[value_cut..].to_string();
                comment = comment[comment_cut..].to_string();
            }
            put(&mut out[start..], VALUE_START, payload.as_bytes());
            if last {
                return;
            }
            start = out.len();
            out.extend_from_slice(&BLANK_CARD);
            put(&mut out[start..], 0, CONTINUE_PREFIX);
        }
    }
}

/// Where to cut an escaped value and its comment for a non-final fragment.
///
/// Without a comment the value takes the whole payload. With one, the value
/// gets a share proportional to its length and the comment the rest of the
/// record. Values break after a space when possible, comments before one.
fn split_points(value: &str, comment: &str) -> (usize, usize) {
    let value_len = value.len() + 2;
    let value_cut = if comment.is_empty() {
        word_cut(value, PAYLOAD_WIDTH - FRAGMENT_RESERVED)
    } else {
        let total = value_len + COMMENT_SEPARATOR.len() + comment.len();
        let share = ((value_len + 1) as f64 / total as f64 * PAYLOAD_WIDTH as f64) as usize;
        let limit = share.saturating_sub(FRAGMENT_RESERVED);
        if value.len() <= limit {
            value.len()
        } else {
            word_cut(value, limit)
        }
    };
    let value_cut = keep_quote_pairs(value, value_cut);
    if comment.is_empty() {
        return (value_cut, 0);
    }

    let budget =
        PAYLOAD_WIDTH.saturating_sub(value_cut + FRAGMENT_RESERVED + COMMENT_SEPARATOR.len());
    let mut comment_cut = if comment.len() <= budget {
        comment.len()
    } else {
        let window = &comment[..(budget + 1).min(comment.len())];
        let mut cut = window.rfind(' ').filter(|&i| i > 0).unwrap_or(budget);
        // Decoding trims comment ends, so a part must not end in a space.
        while cut > 0 && comment.as_bytes()[cut - 1] == b' ' {
            cut -= 1;
        }
        cut
    };
    if value_cut == 0 && comment_cut == 0 {
        comment_cut = budget.max(1).min(comment.len());
    }
    (value_cut, comment_cut)
}

/// Cut just after the last space before `limit`, or at `limit`.
fn word_cut(text: &str, limit: usize) -> usize {
    let limit = limit.min(text.len());
    text[..limit].rfind(' ').map_or(limit, |i| i + 1)
}

/// Moves `cut` back so that no doubled apostrophe is split.
fn keep_quote_pairs(escaped: &str, cut: usize) -> usize {
    let bytes = escaped.as_bytes();
    let mut i = 0;
    while i < cut {
        if bytes[i] == b'\'' {
            if i + 1 == cut {
                return i;
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    cut
}

// ── Tests ──

#[cfg(test)]
pub(crate) fn make_card(s: &str) -> [u8; CARD_SIZE] {
    let mut buf = BLANK_CARD;
    let bytes = s.as_bytes();
    let len = bytes.len().min(CARD_SIZE);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}



#[cfg(test)]
mod encode_tests {
    use super::*;

    fn text(bytes: &[u8]) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn padded(s: &str) -> String {
        format!("{s:<80}")
    }

    /// Decodes every record of an encoding and folds the continuations.
    fn reassemble(bytes: &[u8]) -> Card {
        let mut records = bytes.chunks_exact(CARD_SIZE);
        let mut card = Card::decode(records.next().unwrap()).unwrap();
        for record in records {
            let next = Card::decode(record).unwrap();
            assert!(next.keyword().is(Keyword::Continue));
            card.append_continuation(&next).unwrap();
        }
        card
    }

    #[test]
    fn encode_integer_right_aligned() {
        let card = Card::with_value(Keyword::Bitpix, Value::Integer(16)).with_comment("bits per pixel");
        let bytes = card.encode().unwrap();
        assert_eq!(text(&bytes), padded(&format!("BITPIX  ={:>21} / bits per pixel", 16)));
    }

    #[test]
    fn encode_logical_at_column_30() {
        let card = Card::with_value(Keyword::Simple, Value::Logical(true));
        assert_eq!(text(&card.encode().unwrap()), padded(&format!("SIMPLE  ={:>21}", "T")));
    }

    #[test]
    fn encode_complex() {
        let mut card = Card::with_value(Keyword::Bzero, Value::Real(1.5)).with_comment("c");
        card.set_imaginary_value("-2.0");
        let expected = format!("BZERO   ={:>21}{:>20} / c", "1.5", "-2.0");
        assert_eq!(text(&card.encode().unwrap()), padded(&expected));
    }

    #[test]
    fn encode_literal_escapes() {
        let card = Card::with_value(Keyword::Observer, Value::Literal("O'Brien".into()))
            .with_comment("who");
        assert_eq!(text(&card.encode().unwrap()), padded("OBSERVER= 'O''Brien' / who"));
    }

    #[test]
    fn encode_structural() {
        let card = Card::with_value(Keyword::History, Value::Literal("reduced".into()));
        assert_eq!(text(&card.encode().unwrap()), padded("HISTORY reduced"));
        let card = Card::blank().with_comment("note");
        assert_eq!(text(&card.encode().unwrap()), padded(&format!("{:30} / note", "")));
        assert_eq!(text(&Card::new(Keyword::End).encode().unwrap()), padded("END"));
    }

    #[test]
    fn invalid_card_does_not_encode() {
        let card = Card::with_value(Keyword::Bitpix, Value::Integer(7));
        assert!(card.encode().is_none());
    }

    #[test]
    fn round_trip_single_records() {
        let mut complex = Card::with_value(Keyword::Bzero, Value::Real(0.5)).with_comment("z");
        complex.set_imaginary_value("0.25");
        let cards = [
            Card::with_value(Keyword::Extend, Value::Logical(false)).with_comment("ext"),
            Card::with_value(Keyword::Naxis, Value::Integer(2)),
            Card::with_value(Keyword::Bscale, Value::Real(6.02e23)),
            Card::with_value(Keyword::Object, Value::Literal("a".repeat(68))),
            Card::with_value(KeywordId::parse("MYKEY"), Value::Literal("it's".into())),
            Card::with_value(Keyword::Comment, Value::Literal("free text".into())),
            complex,
        ];
        for card in cards {
            let bytes = card.encode().unwrap();
            assert_eq!(bytes.len(), CARD_SIZE, "{card:?}");
            assert_eq!(Card::decode(&bytes).unwrap(), card);
        }
    }

    #[test]
    fn long_value_without_comment_continues() {
        let value = "word ".repeat(30).trim_end().to_string();
        let card = Card::with_value(Keyword::Notes, Value::Literal(value.clone()));
        let bytes = card.encode().unwrap();
        assert!(bytes.len() > CARD_SIZE);
        assert_eq!(bytes.len() % CARD_SIZE, 0);
        for record in bytes.chunks_exact(CARD_SIZE).skip(1) {
            assert!(record.starts_with(CONTINUE_PREFIX));
        }
        let back = reassemble(&bytes);
        assert_eq!(back.real_text(), value);
        assert_eq!(back.continuations(), bytes.len() / CARD_SIZE - 1);
    }

    #[test]
    fn long_value_and_comment_reassemble() {
        let value: String = (0..60).map(|i| format!("v{i} ")).collect::<String>();
        let value = value[..200].trim_end().to_string();
        let comment: String = (0..20).map(|i| format!("c{i} ")).collect::<String>();
        let comment = comment[..50].trim_end().to_string();
        let card = Card::with_value(Keyword::Notes, Value::Literal(value.clone()))
            .with_comment(&comment);
        let bytes = card.encode().unwrap();
        assert!(bytes.len() / CARD_SIZE > 1);
        let back = reassemble(&bytes);
        assert_eq!(back.real_text(), value);
        assert_eq!(back.comment(), comment);
    }

    #[test]
    fn long_value_without_spaces_is_hard_cut() {
        let value = "x".repeat(150);
        let card = Card::with_value(Keyword::Notes, Value::Literal(value.clone()))
            .with_comment("no spaces here either_".repeat(3).trim_end());
        let bytes = card.encode().unwrap();
        let back = reassemble(&bytes);
        assert_eq!(back.real_text(), value);
        assert_eq!(back.comment(), card.comment());
    }

    #[test]
    fn split_never_separates_escaped_quotes() {
        let value = "'".repeat(60);
        let card = Card::with_value(Keyword::Notes, Value::Literal(value.clone()));
        let bytes = card.encode().unwrap();
        assert!(bytes.len() > CARD_SIZE);
        assert_eq!(reassemble(&bytes).real_text(), value);
    }

    #[test]
    fn date_helpers_write_back() {
        let mut card = Card::with_value(Keyword::DateObs, Value::Literal("2016-01-31T23:59:59".into()));
        card.shift_date(1, TimeUnit::Day).unwrap();
        assert_eq!(card.real_text(), "2016-02-01T23:59:59");
        card.set_date_format(DateFormat::UsDate).unwrap();
        assert_eq!(card.real_text(), "02/01/2016");
        assert_eq!(card.date().unwrap().format(), DateFormat::UsDate);

        let mut card = Card::with_value(Keyword::Object, Value::Literal("M31".into()));
        assert!(matches!(card.shift_date(1, TimeUnit::Day), Err(Error::Edit(_))));
    }
}
