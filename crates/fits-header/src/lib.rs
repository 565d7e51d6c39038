//! Reading, validating and rewriting FITS headers in place.
//!
//! A [`FitsFile`] is a sequence of [`Hdu`]s, each with a [`Header`] of
//! [`Card`]s. Cards decode from and encode to fixed 80-byte records,
//! including long strings spread over CONTINUE records. Header edits are
//! checked with [`Header::check`] and only a clean header is written back.
//! Date and Julian Day values on cards are available through
//! [`Card::date`] and the [`date`] module.

pub mod block;
pub mod card;
pub mod date;
pub mod edit;
pub mod error;
pub mod file;
pub mod hdu;
pub mod header;
pub mod keyword;
pub mod problem;
pub mod value;

pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use card::Card;
pub use date::{DateFormat, DateTime, DateValue, TimeUnit};
pub use error::{DateError, Error, Result};
pub use file::{is_fits_file, FitsFile};
pub use hdu::Hdu;
pub use header::{Header, HeaderKind};
pub use keyword::{ImageType, Keyword, KeywordId, ValueType};
pub use problem::{CardPart, Problem};
pub use value::Value;
