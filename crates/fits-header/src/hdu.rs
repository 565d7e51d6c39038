use crate::block::BLOCK_SIZE;
use crate::error::{Error, Result};
use crate::header::{Header, HeaderKind};
use crate::keyword::Keyword;

/// A header and the location of its data unit in the file.
///
/// `data_len` is the unpadded size the data unit had when the file was
/// read. Editing NAXIS values in memory does not resize the bytes on disk,
/// so saving always carries the original data unit along.
#[derive(Debug, Clone, PartialEq)]
pub struct Hdu {
    header: Header,
    header_start: u64,
    data_start: u64,
    data_len: u64,
}

impl Hdu {
    pub(crate) fn new(header: Header, header_start: u64, data_start: u64) -> Result<Hdu> {
        let data_len = data_byte_len(&header)?;
        Ok(Hdu {
            header,
            header_start,
            data_start,
            data_len,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Byte offset of the first header block.
    pub fn header_start(&self) -> u64 {
        self.header_start
    }

    /// Byte offset of the data unit, right after the last header block.
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Data unit size in bytes, without block padding.
    pub fn data_len(&self) -> u64 {
        self.data_len
    }

    /// Data unit size rounded up to whole blocks.
    pub fn padded_data_len(&self) -> u64 {
        padded(self.data_len)
    }

    /// Offset just past this HDU, where the next one starts.
    pub fn end(&self) -> u64 {
        self.data_start + self.padded_data_len()
    }

    pub(crate) fn relocate(&mut self, header_start: u64, data_start: u64) {
        self.header_start = header_start;
        self.data_start = data_start;
    }
}

fn padded(len: u64) -> u64 {
    let block = BLOCK_SIZE as u64;
    len.div_ceil(block) * block
}

fn required(header: &Header, keyword: Keyword) -> Result<i64> {
    header
        .integer(keyword)
        .ok_or_else(|| Error::format(keyword.name(), "missing or not an integer"))
}

fn non_negative(name: &str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::format(name, format!("negative value {value}")))
}

/// Size in bytes of the data unit described by `header`, without padding.
///
/// Primary headers give `|BITPIX|/8 × NAXIS1 × … × NAXISn`. Extension
/// headers give `|BITPIX|/8 × GCOUNT × (PCOUNT + NAXIS1 × … × NAXISn)`.
/// NAXIS = 0 means there is no data unit.
pub fn data_byte_len(header: &Header) -> Result<u64> {
    let bitpix = required(header, Keyword::Bitpix)?;
    let naxis = required(header, Keyword::Naxis)?;
    let naxis = non_negative(Keyword::Naxis.name(), naxis)?;
    if naxis == 0 {
        return Ok(0);
    }

    let overflow = || Error::format(Keyword::Naxis.name(), "data size overflows");
    let mut pixels: u64 = 1;
    for i in 1..=naxis {
        let name = format!("NAXIS{i}");
        let axis = header
            .find(&name)
            .and_then(|card| card.real())
            .and_then(|value| value.as_i64())
            .ok_or_else(|| Error::format(name.as_str(), "missing or not an integer"))?;
        pixels = pixels
            .checked_mul(non_negative(&name, axis)?)
            .ok_or_else(overflow)?;
    }

    let bytes_per_value = bitpix.unsigned_abs() / 8;
    let (pcount, gcount) = match header.kind() {
        HeaderKind::Primary => (0, 1),
        HeaderKind::Extension => (
            non_negative("PCOUNT", header.integer(Keyword::Pcount).unwrap_or(0))?,
            non_negative("GCOUNT", header.integer(Keyword::Gcount).unwrap_or(1))?,
        ),
    };
    pcount
        .checked_add(pixels)
        .and_then(|n| n.checked_mul(gcount))
        .and_then(|n| n.checked_mul(bytes_per_value))
        .ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::header_of;

    #[test]
    fn primary_image_size() {
        let header = header_of(&[
            "SIMPLE  =                    T",
            "BITPIX  =                  -32",
            "NAXIS   =                    2",
            "NAXIS1  =                  100",
            "NAXIS2  =                   50",
            "END",
        ]);
        assert_eq!(data_byte_len(&header).unwrap(), 4 * 100 * 50);
        let hdu = Hdu::new(header, 0, 2880).unwrap();
        assert_eq!(hdu.padded_data_len(), 7 * 2880);
        assert_eq!(hdu.end(), 8 * 2880);
    }

    #[test]
    fn no_data_without_axes() {
        let header = header_of(&[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    0",
            "END",
        ]);
        let hdu = Hdu::new(header, 0, 2880).unwrap();
        assert_eq!(hdu.data_len(), 0);
        assert_eq!(hdu.end(), 2880);
    }

    #[test]
    fn extension_counts_groups_and_parameters() {
        let header = header_of(&[
            "XTENSION= 'BINTABLE'",
            "BITPIX  =                    8",
            "NAXIS   =                    2",
            "NAXIS1  =                   12",
            "NAXIS2  =                   10",
            "PCOUNT  =                  100",
            "GCOUNT  =                    1",
            "END",
        ]);
        assert_eq!(data_byte_len(&header).unwrap(), 220);
    }

    #[test]
    fn missing_or_bad_values_are_format_errors() {
        let header = header_of(&["SIMPLE  =                    T", "NAXIS   =                    0", "END"]);
        assert!(matches!(
            data_byte_len(&header),
            Err(Error::Format { ref keyword, .. }) if keyword == "BITPIX"
        ));

        let header = header_of(&[
            "SIMPLE  =                    T",
            "BITPIX  =                   16",
            "NAXIS   =                    2",
            "NAXIS1  =                   10",
            "END",
        ]);
        assert!(matches!(
            data_byte_len(&header),
            Err(Error::Format { ref keyword, .. }) if keyword == "NAXIS2"
        ));

        let header = header_of(&[
            "SIMPLE  =                    T",
            "BITPIX  =                   16",
            "NAXIS   =                    1",
            "NAXIS1  =                   -4",
            "END",
        ]);
        assert!(data_byte_len(&header).is_err());
    }

    #[test]
    fn overflow_is_reported() {
        let header = header_of(&[
            "SIMPLE  =                    T",
            "BITPIX  =                   64",
            "NAXIS   =                    3",
            "NAXIS1  =  9000000000000000000",
            "NAXIS2  =  9000000000000000000",
            "NAXIS3  =                    2",
            "END",
        ]);
        assert!(data_byte_len(&header).is_err());
    }
}
