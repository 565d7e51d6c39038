//! Round trips of cards and headers through their byte form, in memory.

use fits_header::block::{pad_header, BLOCK_SIZE, CARD_SIZE, CONTINUE_PREFIX};
use fits_header::date::{self, DateFormat, TimeUnit};
use fits_header::edit::{self, Placement};
use fits_header::{Card, Header, Keyword, KeywordId, Problem, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn header_bytes(cards: &[Card]) -> Vec<u8> {
    let mut out = Vec::new();
    for card in cards {
        out.extend(card.encode().expect("card should encode"));
    }
    pad_header(&mut out);
    out
}

fn image_header() -> Vec<Card> {
    vec![
        Card::with_value(Keyword::Simple, Value::Logical(true)).with_comment("conforms to FITS"),
        Card::with_value(Keyword::Bitpix, Value::Integer(16)),
        Card::with_value(Keyword::Naxis, Value::Integer(2)),
        Card::with_value(KeywordId::Indexed(Keyword::NaxisN, 1), Value::Integer(640)),
        Card::with_value(KeywordId::Indexed(Keyword::NaxisN, 2), Value::Integer(480)),
        Card::new(Keyword::End),
    ]
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

#[test]
fn every_value_variant_round_trips() {
    let cards = [
        Card::with_value(Keyword::Extend, Value::Logical(true)),
        Card::with_value(KeywordId::parse("EXPOSURE"), Value::Integer(-12)),
        Card::with_value(Keyword::Exptime, Value::Real(0.25)).with_comment("[s] exposure"),
        Card::with_value(Keyword::Object, Value::Literal("b".repeat(68))),
        Card::with_value(Keyword::Notes, Value::Literal("long ".repeat(40).trim_end().into()))
            .with_comment("spills over"),
    ];
    for card in cards {
        let bytes = header_bytes(&[
            Card::with_value(Keyword::Simple, Value::Logical(true)),
            card.clone(),
            Card::new(Keyword::End),
        ]);
        let (header, _) = Header::parse(&bytes).unwrap();
        let back = header.find(&card.name()).unwrap();
        assert_eq!(back.real(), card.real());
        assert_eq!(back.comment(), card.comment());
    }
}

#[test]
fn long_literal_with_long_comment() {
    let value: String = (0..200).map(|i| char::from(b'a' + (i % 7) as u8)).collect();
    let value = value
        .char_indices()
        .map(|(i, c)| if i % 11 == 10 { ' ' } else { c })
        .collect::<String>();
    let comment: String = (0..50).map(|i| if i % 9 == 8 { ' ' } else { 'c' }).collect();
    let card = Card::with_value(Keyword::Notes, Value::Literal(value.clone())).with_comment(&comment);

    let bytes = card.encode().unwrap();
    let records: Vec<&[u8]> = bytes.chunks(CARD_SIZE).collect();
    assert!(records.len() > 1);
    assert!(records[1..].iter().all(|r| r.starts_with(CONTINUE_PREFIX)));

    let mut all = bytes.clone();
    all.extend_from_slice(&Card::new(Keyword::End).encode().unwrap());
    pad_header(&mut all);
    let (header, consumed) = Header::parse(&all).unwrap();
    assert_eq!(consumed, BLOCK_SIZE);
    let back = header.find("NOTES").unwrap();
    assert_eq!(back.real_text(), value);
    assert_eq!(back.comment(), comment);
    assert_eq!(back.continuations(), records.len() - 1);
}

#[test]
fn custom_keyword_with_lowercase_is_rejected() {
    let card = Card::with_value(KeywordId::parse("obsErv"), Value::Literal("x".into()));
    assert!(card
        .validate()
        .iter()
        .any(|p| matches!(p, Problem::InvalidKeywordChars { .. })));
    assert!(card.encode().is_none());
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

#[test]
fn header_render_parse_is_identity() {
    let header = Header::new(image_header());
    assert!(header.check().is_empty());
    let bytes = header.render().unwrap();
    assert_eq!(bytes.len() % BLOCK_SIZE, 0);
    let (back, consumed) = Header::parse(&bytes).unwrap();
    assert_eq!(consumed, bytes.len());
    assert_eq!(back, header);
}

#[test]
fn missing_bitpix_blocks_rendering() {
    let header = Header::new(vec![
        Card::with_value(Keyword::Simple, Value::Logical(true)),
        Card::with_value(Keyword::Naxis, Value::Integer(0)),
        Card::new(Keyword::End),
    ]);
    let problems = header.check();
    assert!(problems.iter().any(|p| p.keyword() == Some("BITPIX")));
    assert!(header.render().is_none());
}

#[test]
fn edits_then_render() {
    let mut header = Header::new(image_header());
    let date_obs = Card::with_value(Keyword::DateObs, Value::Literal("2019-06-30T22:15:00.5".into()));
    edit::add_card(&mut header, date_obs, Placement::default(), false).unwrap();
    edit::shift_date(&mut header, "DATE-OBS", &[(2, TimeUnit::Hour)]).unwrap();
    let card = header.find("DATE-OBS").unwrap();
    assert_eq!(card.real_text(), "2019-07-01T00:15:00.5");

    let jd = edit::store_julian_day(
        &mut header,
        "JD-OBS",
        edit::JulianSource::Keyword("DATE-OBS".into()),
        false,
    )
    .unwrap();
    assert!((jd - 2458665.5104224537).abs() < 1e-6);

    let bytes = header.render().unwrap();
    let (back, _) = Header::parse(&bytes).unwrap();
    assert_eq!(back.len(), 8);
    let stored = back.find("JD-OBS").unwrap().date().unwrap();
    assert!(stored.is_julian());
    assert_eq!(stored.date().day, 1);
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

#[test]
fn j2000_reference() {
    let d = date::parse("2000-01-01T12:00:00").unwrap();
    assert_eq!(date::to_julian_day(&d), 2451545.0);
    let j = date::parse_julian("2451545.0").unwrap();
    assert_eq!(j.format_with(DateFormat::DEFAULT), "2000-01-01T12:00:00.000000000");
    assert_eq!(j.julian_day(), 2451545.0);
}
