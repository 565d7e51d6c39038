//! Header record geometry.
//!
//! A header is read and written as 2880-byte blocks of 36 cards, each card
//! 80 bytes with an 8-byte keyword field. Unused card slots after END are
//! blank cards.

pub const BLOCK_SIZE: usize = 2880;
pub const CARD_SIZE: usize = 80;
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;
pub const KEYWORD_SIZE: usize = 8;

/// Fill byte of header records.
pub const HEADER_PAD_BYTE: u8 = b' ';

pub const BLANK_CARD: [u8; CARD_SIZE] = [HEADER_PAD_BYTE; CARD_SIZE];

/// Keyword field and separator of a record carrying the next fragment of a
/// long string.
pub const CONTINUE_PREFIX: &[u8; 10] = b"CONTINUE  ";

/// Length of `len` header bytes once the last block is filled up.
pub const fn padded_byte_len(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

const fn end_card() -> [u8; CARD_SIZE] {
    let mut card = BLANK_CARD;
    card[0] = b'E';
    card[1] = b'N';
    card[2] = b'D';
    card
}

/// `END` followed by spaces.
pub const END_CARD: [u8; CARD_SIZE] = end_card();

/// True if the card is 80 spaces.
pub fn is_blank_card(card: &[u8]) -> bool {
    card.len() == CARD_SIZE && card.iter().all(|&b| b == HEADER_PAD_BYTE)
}

/// True if the card's keyword field reads `END`.
pub fn is_end_card(card: &[u8]) -> bool {
    card.len() >= KEYWORD_SIZE && card[..KEYWORD_SIZE] == END_CARD[..KEYWORD_SIZE]
}

/// Appends blank cards to `header` until its length is a whole number of
/// blocks. `header` must already be a whole number of cards.
pub fn pad_header(header: &mut Vec<u8>) {
    debug_assert_eq!(header.len() % CARD_SIZE, 0);
    let padded = padded_byte_len(header.len());
    header.resize(padded, HEADER_PAD_BYTE);
}

/// Iterates over the cards of a block-aligned byte slice.
pub fn cards(data: &[u8]) -> impl Iterator<Item = &[u8; CARD_SIZE]> {
    data.chunks_exact(CARD_SIZE).filter_map(|c| c.try_into().ok())
}
