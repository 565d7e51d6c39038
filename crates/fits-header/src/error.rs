use crate::problem::Problem;

/// All errors that can occur while decoding, editing or saving FITS headers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A card's bytes cannot be decoded into a valid card.
    #[error("bad format of card {keyword}: {reason}")]
    Format { keyword: String, reason: String },
    /// The input ended before an END card was found.
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// The file is not laid out as a FITS file.
    #[error("invalid FITS file structure: {0}")]
    FileStructure(String),
    /// A date or Julian Day value could not be interpreted.
    #[error(transparent)]
    Date(#[from] DateError),
    /// Saving was refused because a header fails [`crate::header::Header::check`].
    #[error("header of HDU {index} has {} problem(s), first: {}", problems.len(), first_problem(problems))]
    Invalid {
        index: usize,
        problems: Vec<Problem>,
    },
    /// A header edit was refused.
    #[error("{0}")]
    Edit(String),
    /// An I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn first_problem(problems: &[Problem]) -> String {
    problems.first().map(Problem::to_string).unwrap_or_default()
}

impl Error {
    pub(crate) fn format(keyword: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Format {
            keyword: keyword.into(),
            reason: reason.into(),
        }
    }
}

/// Failures of the date model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    /// The text matches none of the accepted date-time patterns.
    #[error("{0} has unknown date format")]
    UnknownFormat(String),
    /// The Julian Day text is not a number.
    #[error("{0} is not a number")]
    NotANumber(String),
    /// Julian Days before the epoch are not representable.
    #[error("julian day should not be negative: {0}")]
    Negative(String),
    /// A shift moved the date outside the representable calendar.
    #[error("date out of range: {0}")]
    OutOfRange(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let e = Error::format("BITPIX", "\"x\" is not integer");
        assert_eq!(e.to_string(), "bad format of card BITPIX: \"x\" is not integer");
    }

    #[test]
    fn display_unexpected_eof() {
        assert_eq!(Error::UnexpectedEof.to_string(), "unexpected end of file");
    }

    #[test]
    fn display_date_is_transparent() {
        let e: Error = DateError::UnknownFormat("tomorrow".into()).into();
        assert_eq!(e.to_string(), "tomorrow has unknown date format");
    }

    #[test]
    fn display_invalid_names_first_problem() {
        let e = Error::Invalid {
            index: 1,
            problems: vec![Problem::BlankWithoutPositiveBitpix, Problem::TooFewCards { count: 2 }],
        };
        assert_eq!(
            e.to_string(),
            "header of HDU 1 has 2 problem(s), first: keyword BLANK can be used only if BITPIX has a positive value"
        );
    }

    #[test]
    fn io_error_from_conversion() {
        let e: Error = std::io::Error::other("oops").into();
        assert!(matches!(e, Error::Io(_)));
        assert_eq!(e.to_string(), "I/O error: oops");
    }

    #[test]
    fn std_error_source() {
        use std::error::Error as StdError;

        assert!(Error::UnexpectedEof.source().is_none());
        let e = Error::Io(std::io::Error::other("inner"));
        assert!(e.source().is_some());
    }
}
