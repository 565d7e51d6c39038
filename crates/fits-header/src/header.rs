//! Header assembly: reading blocks into cards, structural checks and
//! rendering back to blocks.

use std::collections::HashSet;
use std::io::{self, Read};

use crate::block::{cards, pad_header, BLOCK_SIZE};
use crate::card::Card;
use crate::error::{Error, Result};
use crate::keyword::{ImageType, Keyword, KeywordId};
use crate::problem::Problem;
use crate::value::Value;

/// Whether a header opens the file or an extension HDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderKind {
    /// First header; starts with `SIMPLE`.
    #[default]
    Primary,
    /// Any later header; starts with `XTENSION`.
    Extension,
}

impl HeaderKind {
    /// Keyword required in the first card position.
    pub fn first_keyword(self) -> Keyword {
        match self {
            HeaderKind::Primary => Keyword::Simple,
            HeaderKind::Extension => Keyword::Xtension,
        }
    }
}

/// An ordered sequence of cards ending with END.
///
/// The sequence is replaced only as a whole through [`Header::set_cards`];
/// readers get owned copies.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    cards: Vec<Card>,
    kind: HeaderKind,
}

impl Header {
    /// Builds a header; the kind follows from the first card.
    pub fn new(cards: Vec<Card>) -> Header {
        let kind = match cards.first() {
            Some(card) if card.keyword().is(Keyword::Xtension) => HeaderKind::Extension,
            _ => HeaderKind::Primary,
        };
        Header { cards, kind }
    }

    /// Reads whole blocks from `reader` until the END card.
    ///
    /// Returns the header and the number of bytes consumed, always a whole
    /// number of blocks. CONTINUE records are folded into the card before
    /// them.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<(Header, usize)> {
        let mut assembled: Vec<Card> = Vec::new();
        let mut block = [0u8; BLOCK_SIZE];
        let mut consumed = 0;
        loop {
            reader.read_exact(&mut block).map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
                _ => Error::Io(e),
            })?;
            consumed += BLOCK_SIZE;

            for record in cards(&block) {
                let card = Card::decode(record)?;
                if card.keyword().is(Keyword::Continue) {
                    let previous = assembled
                        .last_mut()
                        .ok_or_else(|| Error::format("CONTINUE", "Keyword CONTINUE cannot be first"))?;
                    previous.append_continuation(&card)?;
                    continue;
                }
                let end = card.is_end();
                assembled.push(card);
                if end {
                    return Ok((Header::new(assembled), consumed));
                }
            }
        }
    }

    /// [`Header::read_from`] over an in-memory buffer.
    pub fn parse(data: &[u8]) -> Result<(Header, usize)> {
        let mut reader = data;
        Header::read_from(&mut reader)
    }

    pub fn kind(&self) -> HeaderKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Owned copy of the card sequence.
    pub fn cards(&self) -> Vec<Card> {
        self.cards.clone()
    }

    /// Owned copies of the cards whose keyword is written as `name`.
    pub fn cards_with_keyword(&self, name: &str) -> Vec<Card> {
        self.cards
            .iter()
            .filter(|card| card.name() == name)
            .cloned()
            .collect()
    }

    /// First card whose keyword is written as `name`.
    pub fn find(&self, name: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.name() == name)
    }

    /// Replaces the whole card sequence.
    pub fn set_cards(&mut self, cards: Vec<Card>) {
        self.cards = cards;
    }

    /// Integer value of the first card with the given keyword.
    pub fn integer(&self, keyword: Keyword) -> Option<i64> {
        self.cards
            .iter()
            .find(|card| card.keyword() == &KeywordId::Known(keyword))
            .and_then(|card| card.real())
            .and_then(Value::as_i64)
    }

    /// Image type named by the `IMAGETYP` card, `Unknown` without one.
    pub fn image_type(&self) -> ImageType {
        self.find(Keyword::Imagetyp.name())
            .and_then(|card| card.real())
            .and_then(Value::as_str)
            .map(ImageType::from_value)
            .unwrap_or_default()
    }

    /// Everything that prevents this header from being saved.
    pub fn check(&self) -> Vec<Problem> {
        let mut problems: Vec<Problem> = self.cards.iter().flat_map(Card::validate).collect();
        let mut bitpix_positive = false;
        let mut naxis = -1;

        if self.cards.len() < 4 {
            problems.push(Problem::TooFewCards {
                count: self.cards.len(),
            });
        } else {
            let leading = [self.kind.first_keyword(), Keyword::Bitpix, Keyword::Naxis];
            for (position, expected) in leading.into_iter().enumerate() {
                let card = &self.cards[position];
                if card.keyword() != &KeywordId::Known(expected) {
                    problems.push(Problem::Misplaced {
                        position: position + 1,
                        expected: expected.name(),
                        found: card.name(),
                    });
                }
            }
            if self.cards[1].keyword().is(Keyword::Bitpix) {
                if let Some(Value::Integer(bitpix)) = self.cards[1].real() {
                    bitpix_positive = *bitpix > 0;
                }
            }
            if self.cards[2].keyword() == &KeywordId::Known(Keyword::Naxis) {
                if let Some(Value::Integer(n)) = self.cards[2].real() {
                    if *n >= 0 {
                        naxis = *n;
                    }
                }
            }
            if naxis > 0 && self.cards[3].keyword() != &KeywordId::Indexed(Keyword::NaxisN, 1) {
                problems.push(Problem::MissingNaxis1 { naxis });
            }
            let last = self.cards.len();
            if !self.cards[last - 1].is_end() {
                problems.push(Problem::Misplaced {
                    position: last,
                    expected: Keyword::End.name(),
                    found: self.cards[last - 1].name(),
                });
            }
        }

        let image_type = self.image_type();
        let mut missing: Vec<Keyword> = image_type
            .mandatory_keywords()
            .into_iter()
            .map(|k| match k {
                Keyword::Simple => self.kind.first_keyword(),
                other => other,
            })
            .collect();
        let mut missing_families: Vec<Keyword> = image_type
            .mandatory_families()
            .iter()
            .copied()
            .filter(|family| *family != Keyword::NaxisN || naxis != 0)
            .collect();

        let mut seen = HashSet::new();
        let mut previous: Option<&KeywordId> = None;
        for card in &self.cards {
            let id = card.keyword();
            if let Some(keyword) = id.keyword() {
                missing.retain(|k| *k != keyword);
                missing_families.retain(|k| *k != keyword);
            }
            let name = card.name();
            if id.is_unique() && !seen.insert(name.clone()) {
                problems.push(Problem::Duplicate {
                    keyword: name.clone(),
                });
            }
            if id.is(Keyword::Blank) {
                if !bitpix_positive {
                    problems.push(Problem::BlankWithoutPositiveBitpix);
                }
            } else if let KeywordId::Indexed(family, n) = id {
                if naxis >= 0 && family.is_bounded_by_naxis() && i64::from(*n) > naxis {
                    problems.push(Problem::IndexExceedsNaxis {
                        keyword: name.clone(),
                        naxis,
                    });
                }
            }
            if let KeywordId::Indexed(family, n) = id {
                let follows = matches!(
                    previous,
                    Some(KeywordId::Indexed(f, m)) if f == family && m.checked_add(1) == Some(*n)
                );
                if *n > 1 && !follows {
                    problems.push(Problem::IndexOutOfOrder { keyword: name });
                }
            }
            previous = Some(id);
        }

        problems.extend(missing.into_iter().map(|k| Problem::MissingMandatory {
            keyword: k.name(),
            image_type,
        }));
        problems.extend(
            missing_families
                .into_iter()
                .map(|k| Problem::MissingMandatoryFamily {
                    family: k.name(),
                    image_type,
                }),
        );
        problems
    }

    /// Encodes every card and pads to whole blocks with blank cards.
    ///
    /// Returns `None` while [`Header::check`] reports problems.
    pub fn render(&self) -> Option<Vec<u8>> {
        if !self.check().is_empty() {
            return None;
        }
        let mut out = Vec::new();
        for card in &self.cards {
            out.extend(card.encode()?);
        }
        pad_header(&mut out);
        Some(out)
    }
}

/// Translates a 1-based index, negative to count from the end, into a
/// 0-based position in a sequence of `len` items.
///
/// With `for_insert` the result may equal `len` (append). Index 0 and
/// indices beyond the sequence are rejected, except that `1` and `-1` are
/// always accepted for insertion.
pub fn to_zero_based(index: i64, len: usize, for_insert: bool) -> Option<usize> {
    if index == 0 {
        return None;
    }
    let len = i64::try_from(len).ok()?;
    let magnitude = index.unsigned_abs();
    let out_of_range = magnitude > len.unsigned_abs();
    let position = if for_insert {
        if out_of_range && magnitude != 1 {
            return None;
        }
        if index < 0 {
            (index + len + 1).max(0)
        } else {
            index - 1
        }
    } else {
        if out_of_range {
            return None;
        }
        if index < 0 {
            index + len
        } else {
            index - 1
        }
    };
    usize::try_from(position).ok()
}

#[cfg(test)]
pub(crate) fn make_header(records: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for record in records {
        out.extend_from_slice(&crate::card::make_card(record));
    }
    pad_header(&mut out);
    out
}

#[cfg(test)]
pub(crate) fn header_of(records: &[&str]) -> Header {
    Header::parse(&make_header(records)).unwrap().0
}

#[cfg(test)]
pub(crate) const MINIMAL: &[&str] = &[
    "SIMPLE  =                    T",
    "BITPIX  =                   16",
    "NAXIS   =                    2",
    "NAXIS1  =                   10",
    "NAXIS2  =                   20",
    "END",
];
