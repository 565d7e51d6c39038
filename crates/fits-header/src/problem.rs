//! Validation findings that block saving a header.
//!
//! Problems are collected, never thrown: [`crate::card::Card::validate`] and
//! [`crate::header::Header::check`] return every finding at once and a header
//! is only written while the list is empty.

use core::fmt;

use crate::keyword::{ImageType, ValueType};

/// Field of a card a problem refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardPart {
    Real,
    Imaginary,
    Comment,
}

impl fmt::Display for CardPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CardPart::Real => "real value",
            CardPart::Imaginary => "imaginary value",
            CardPart::Comment => "comment",
        })
    }
}

/// One reason a card or header cannot be saved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Problem {
    // ── Card problems ──
    #[error("keyword {keyword} has {found} data type, but it should have {expected} data type")]
    TypeMismatch {
        keyword: String,
        found: ValueType,
        expected: ValueType,
    },
    #[error("keyword {keyword} has {real} real value, but its imaginary value has {imaginary} data type")]
    ImaginaryTypeMismatch {
        keyword: String,
        real: ValueType,
        imaginary: ValueType,
    },
    #[error("keyword {keyword} has a {part} longer than {max} characters")]
    ValueTooLong {
        keyword: String,
        part: CardPart,
        max: usize,
    },
    #[error("keyword {keyword} has a physical unit, but its comment is empty")]
    MissingUnit { keyword: String },
    #[error("keyword {keyword} has {data_type} data type, so it cannot have an imaginary value")]
    ImaginaryNotAllowed {
        keyword: String,
        data_type: ValueType,
    },
    #[error("keyword {keyword} has an imaginary value, but its real value is empty")]
    ImaginaryWithoutReal { keyword: String },
    #[error("keyword {keyword} has too long comment ({len} chars), max allowed chars are {max}")]
    CommentTooLong {
        keyword: String,
        len: usize,
        max: usize,
    },
    #[error("keyword {keyword} cannot have an index lower than 1")]
    IndexBelowOne { keyword: String },
    #[error("value '{value}' in keyword {keyword} contains characters outside the printable ASCII range")]
    ForbiddenValueChars { keyword: String, value: String },
    #[error("comment '{comment}' in keyword {keyword} contains characters outside the printable ASCII range")]
    ForbiddenCommentChars { keyword: String, comment: String },
    #[error("keyword {keyword} contains forbidden characters (allowed: uppercase letters A to Z, digits 0 to 9, hyphen and underscore)")]
    InvalidKeywordChars { keyword: String },
    #[error("keyword {keyword} exceeds max length (8)")]
    KeywordTooLong { keyword: String },
    #[error("{keyword} keyword must be empty, but its {part} is '{text}'")]
    UnexpectedContent {
        keyword: String,
        part: CardPart,
        text: String,
    },
    #[error("BITPIX keyword has invalid value {value}, valid values are: -64, -32, 8, 16, 32")]
    InvalidBitpix { value: i64 },
    #[error("NAXIS keyword must have a value in range 0-999, but it has {value}")]
    NaxisOutOfRange { value: i64 },
    #[error("{keyword} keyword cannot have a negative value")]
    Negative { keyword: String },

    // ── Header problems ──
    #[error("header has {count} cards, but at least 4 are required")]
    TooFewCards { count: usize },
    #[error("keyword number {position} in the header must be {expected}, not {found}")]
    Misplaced {
        position: usize,
        expected: &'static str,
        found: String,
    },
    #[error("NAXIS is {naxis}, so keyword NAXIS1 must follow it")]
    MissingNaxis1 { naxis: i64 },
    #[error("keyword {keyword} is header unique, but it occurs more than once")]
    Duplicate { keyword: String },
    #[error("keyword BLANK can be used only if BITPIX has a positive value")]
    BlankWithoutPositiveBitpix,
    #[error("count of axes is {naxis}, so keyword {keyword} cannot be used")]
    IndexExceedsNaxis { keyword: String, naxis: i64 },
    #[error("keyword {keyword} is not properly ordered, indexed keywords must start at 1 and increment by 1")]
    IndexOutOfOrder { keyword: String },
    #[error("keyword {keyword} is mandatory for {image_type} headers and it is missing")]
    MissingMandatory {
        keyword: &'static str,
        image_type: ImageType,
    },
    #[error("keywords {family} are mandatory for {image_type} headers and they are missing")]
    MissingMandatoryFamily {
        family: &'static str,
        image_type: ImageType,
    },
}

impl Problem {
    /// Name of the keyword the problem is about, if it names one.
    pub fn keyword(&self) -> Option<&str> {
        match self {
            Problem::TypeMismatch { keyword, .. }
            | Problem::ImaginaryTypeMismatch { keyword, .. }
            | Problem::ValueTooLong { keyword, .. }
            | Problem::MissingUnit { keyword }
            | Problem::ImaginaryNotAllowed { keyword, .. }
            | Problem::ImaginaryWithoutReal { keyword }
            | Problem::CommentTooLong { keyword, .. }
            | Problem::IndexBelowOne { keyword }
            | Problem::ForbiddenValueChars { keyword, .. }
            | Problem::ForbiddenCommentChars { keyword, .. }
            | Problem::InvalidKeywordChars { keyword }
            | Problem::KeywordTooLong { keyword }
            | Problem::UnexpectedContent { keyword, .. }
            | Problem::Negative { keyword }
            | Problem::Duplicate { keyword }
            | Problem::IndexExceedsNaxis { keyword, .. }
            | Problem::IndexOutOfOrder { keyword } => Some(keyword),
            Problem::Misplaced { expected, .. } => Some(expected),
            Problem::MissingMandatory { keyword, .. } => Some(keyword),
            Problem::MissingMandatoryFamily { family, .. } => Some(family),
            Problem::InvalidBitpix { .. } => Some("BITPIX"),
            Problem::NaxisOutOfRange { .. } | Problem::MissingNaxis1 { .. } => Some("NAXIS"),
            Problem::BlankWithoutPositiveBitpix => Some("BLANK"),
            Problem::TooFewCards { .. } => None,
        }
    }
}
