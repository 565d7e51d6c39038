//! Edit primitives over a [`Header`].
//!
//! Every operation works on an owned copy of the card sequence and writes it
//! back with [`Header::set_cards`] only when the whole edit succeeded, so a
//! refused edit leaves the header untouched.

use tracing::debug;

use crate::card::Card;
use crate::date::{self, TimeUnit};
use crate::error::{Error, Result};
use crate::header::{to_zero_based, Header};
use crate::keyword::KeywordId;

/// Longest fraction written by [`store_julian_day`].
const JULIAN_DIGITS: usize = 9;

/// Where [`add_card`] puts a new card.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Placement {
    /// 1-based position; negative counts from the end.
    Index(i64),
    /// Right after the first card with this keyword.
    After(String),
    /// Before the final card, normally END.
    #[default]
    BeforeLast,
}

/// Which card [`remove_card`] removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// 1-based position; negative counts from the end.
    Index(i64),
    /// The first card with this keyword.
    Keyword(String),
}

/// Replacement parts for [`change_card`]. `None` keeps the current part.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CardChange {
    pub keyword: Option<String>,
    /// Remove a unique card already named like the new keyword instead of
    /// refusing the rename.
    pub remove_duplicate: bool,
    pub real: Option<String>,
    pub imaginary: Option<String>,
    pub comment: Option<String>,
}

/// Where [`store_julian_day`] takes its date from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JulianSource {
    /// The date view of the first card with this keyword.
    Keyword(String),
    /// Date text in one of the accepted patterns.
    Text(String),
}

/// One piece joined by [`concatenate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// The value text of the first card with this keyword.
    Keyword(String),
    Text(String),
}

fn position_of(cards: &[Card], name: &str) -> Result<usize> {
    cards
        .iter()
        .position(|card| card.name() == name)
        .ok_or_else(|| Error::Edit(format!("keyword {name} not found")))
}

fn bad_index(index: i64) -> Error {
    Error::Edit(format!("index {index} is out of range"))
}

/// Inserts `card`.
///
/// A header-unique keyword that is already present is refused unless
/// `update_existing` is set. Then the new card goes to `placement` and the
/// old one is removed, so an index names the position in the final header.
pub fn add_card(
    header: &mut Header,
    card: Card,
    placement: Placement,
    update_existing: bool,
) -> Result<()> {
    let mut cards = header.cards();
    let name = card.name();
    let existing = if card.keyword().is_unique() {
        cards.iter().position(|c| c.name() == name)
    } else {
        None
    };
    let Some(old) = existing else {
        let at = insert_position(&cards, placement)?;
        cards.insert(at, card);
        header.set_cards(cards);
        return Ok(());
    };
    if !update_existing {
        return Err(Error::Edit(format!("keyword {name} already exists")));
    }

    match placement {
        Placement::Index(index) => {
            // The header keeps its length, so the index is taken as a
            // position among the cards present now.
            let at = to_zero_based(index, cards.len(), false).ok_or_else(|| bad_index(index))?;
            cards.remove(old);
            cards.insert(at, card);
        }
        placement => {
            let at = insert_position(&cards, placement)?;
            cards.insert(at, card);
            cards.remove(if old >= at { old + 1 } else { old });
        }
    }
    debug!(keyword = %name, "replaced unique card");
    header.set_cards(cards);
    Ok(())
}

fn insert_position(cards: &[Card], placement: Placement) -> Result<usize> {
    match placement {
        Placement::Index(index) => {
            to_zero_based(index, cards.len(), true).ok_or_else(|| bad_index(index))
        }
        Placement::After(keyword) => Ok(position_of(cards, &keyword)? + 1),
        Placement::BeforeLast => Ok(to_zero_based(-2, cards.len(), true).unwrap_or(0)),
    }
}

/// Removes a card and returns it.
pub fn remove_card(header: &mut Header, target: Target) -> Result<Card> {
    let mut cards = header.cards();
    let at = match target {
        Target::Index(index) => {
            to_zero_based(index, cards.len(), false).ok_or_else(|| bad_index(index))?
        }
        Target::Keyword(name) => position_of(&cards, &name)?,
    };
    let removed = cards.remove(at);
    header.set_cards(cards);
    Ok(removed)
}

/// Moves the first card with `keyword` so that it ends up at the 1-based
/// `index` of the header; negative counts from the end.
pub fn move_card(header: &mut Header, keyword: &str, index: i64) -> Result<()> {
    let mut cards = header.cards();
    let from = position_of(&cards, keyword)?;
    let to = to_zero_based(index, cards.len(), false).ok_or_else(|| bad_index(index))?;
    let card = cards.remove(from);
    cards.insert(to, card);
    header.set_cards(cards);
    Ok(())
}

/// Renames the first card with `keyword` and/or replaces its parts.
pub fn change_card(header: &mut Header, keyword: &str, change: CardChange) -> Result<()> {
    let mut cards = header.cards();
    let mut at = position_of(&cards, keyword)?;

    if let Some(new_name) = change.keyword.as_deref().filter(|n| *n != keyword) {
        let duplicate = cards.iter().position(|c| c.name() == new_name);
        if let Some(duplicate) = duplicate.filter(|_| KeywordId::parse(new_name).is_unique()) {
            if !change.remove_duplicate {
                return Err(Error::Edit(format!("keyword {new_name} already exists")));
            }
            cards.remove(duplicate);
            if duplicate < at {
                at -= 1;
            }
        }
    }

    let card = &mut cards[at];
    if let Some(new_name) = &change.keyword {
        card.set_keyword(new_name);
    }
    if let Some(real) = &change.real {
        card.set_real_value(real);
    }
    if let Some(imaginary) = &change.imaginary {
        card.set_imaginary_value(imaginary);
    }
    if let Some(comment) = &change.comment {
        card.set_comment(comment);
    }
    header.set_cards(cards);
    Ok(())
}

/// Applies each `(amount, unit)` shift, in order, to the date held by the
/// first card with `keyword`.
pub fn shift_date(header: &mut Header, keyword: &str, shifts: &[(i64, TimeUnit)]) -> Result<()> {
    let mut cards = header.cards();
    let at = position_of(&cards, keyword)?;
    for &(amount, unit) in shifts {
        cards[at].shift_date(amount, unit)?;
    }
    header.set_cards(cards);
    Ok(())
}

/// Stores the Julian Day of `source` as the value of `keyword` and returns
/// it.
///
/// A missing card is created before the last card. An existing one is
/// overwritten only with `update_existing`.
pub fn store_julian_day(
    header: &mut Header,
    keyword: &str,
    source: JulianSource,
    update_existing: bool,
) -> Result<f64> {
    let value = match source {
        JulianSource::Keyword(name) => *header
            .find(&name)
            .ok_or_else(|| Error::Edit(format!("keyword {name} not found")))?
            .date()
            .ok_or_else(|| Error::Edit(format!("keyword {name} does not hold a date")))?,
        JulianSource::Text(text) => date::parse(&text)?,
    };
    let jd = date::to_julian_day(&value);
    store(header, keyword, &julian_text(jd), update_existing)?;
    Ok(jd)
}

/// Joins `parts` with `glue`, stores the result as the value of `keyword`
/// the way [`store_julian_day`] does and returns it.
pub fn concatenate(
    header: &mut Header,
    keyword: &str,
    parts: &[Part],
    glue: &str,
    update_existing: bool,
) -> Result<String> {
    let pieces = parts
        .iter()
        .map(|part| match part {
            Part::Keyword(name) => header
                .find(name)
                .map(Card::value_text)
                .ok_or_else(|| Error::Edit(format!("keyword {name} not found"))),
            Part::Text(text) => Ok(text.clone()),
        })
        .collect::<Result<Vec<_>>>()?;
    let joined = pieces.join(glue);
    store(header, keyword, &joined, update_existing)?;
    Ok(joined)
}

fn store(header: &mut Header, keyword: &str, text: &str, update_existing: bool) -> Result<()> {
    let mut cards = header.cards();
    match cards.iter().position(|c| c.name() == keyword) {
        Some(_) if !update_existing => {
            return Err(Error::Edit(format!("keyword {keyword} already exists")));
        }
        Some(at) => cards[at].set_real_value(text),
        None => {
            let mut card = Card::new(KeywordId::parse(keyword));
            card.set_real_value(text);
            let at = cards.len().saturating_sub(1);
            cards.insert(at, card);
        }
    }
    debug!(keyword, value = text, "stored value");
    header.set_cards(cards);
    Ok(())
}

/// Plain decimal with at most nine fraction digits and at least one.
fn julian_text(jd: f64) -> String {
    let text = format!("{:.*}", JULIAN_DIGITS, jd);
    let trimmed = text.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}
