//! FITS files on disk: locating HDUs and saving edited headers in place.
//!
//! Saving rewrites every header at its possibly shifted offset and moves
//! the data units behind it. The original file is copied to a `.old`
//! backup first; the backup is removed only after the whole save
//! succeeded and is used to restore the file when it did not.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::block::{is_blank_card, is_end_card, BLOCK_SIZE, CARD_SIZE};
use crate::card::Card;
use crate::error::{Error, Result};
use crate::hdu::Hdu;
use crate::header::{Header, HeaderKind};
use crate::problem::Problem;

/// Extension appended to the file name of the backup made while saving.
pub const BACKUP_SUFFIX: &str = "old";

/// Prefix of the first card of every FITS file.
const SIMPLE_PREFIX: &[u8] = b"SIMPLE  = ";

/// An open FITS file and its HDUs.
#[derive(Debug)]
pub struct FitsFile {
    path: PathBuf,
    file: File,
    hdus: Vec<Hdu>,
}

impl FitsFile {
    /// Opens a file for reading and in-place saving.
    ///
    /// Reading stops at the first HDU that cannot be parsed. A failure on
    /// the primary HDU is an error; later failures drop that HDU and every
    /// one after it.
    pub fn open(path: impl AsRef<Path>) -> Result<FitsFile> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(Error::FileStructure(format!(
                "{} does not exist",
                path.display()
            )));
        }
        if !is_fits_file(&path) {
            return Err(Error::FileStructure(format!(
                "{} is not a FITS file",
                path.display()
            )));
        }
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        let file_len = file.metadata()?.len();
        let hdus = read_hdus(&mut file, file_len)?;
        info!(path = %path.display(), hdus = hdus.len(), "opened FITS file");
        Ok(FitsFile { path, file, hdus })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of HDUs.
    pub fn len(&self) -> usize {
        self.hdus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hdus.is_empty()
    }

    pub fn hdu(&self, index: usize) -> Option<&Hdu> {
        self.hdus.get(index)
    }

    pub fn hdu_mut(&mut self, index: usize) -> Option<&mut Hdu> {
        self.hdus.get_mut(index)
    }

    pub fn hdus(&self) -> impl Iterator<Item = &Hdu> {
        self.hdus.iter()
    }

    /// Owned copies of the cards of every HDU, in file order.
    pub fn cards(&self) -> Vec<Card> {
        self.hdus.iter().flat_map(|hdu| hdu.header().cards()).collect()
    }

    /// Owned copies of the cards named `name` across all HDUs.
    pub fn cards_with_keyword(&self, name: &str) -> Vec<Card> {
        self.hdus
            .iter()
            .flat_map(|hdu| hdu.header().cards_with_keyword(name))
            .collect()
    }

    /// Problems of every header; saving proceeds only while this is empty.
    pub fn check_ready_to_save(&self) -> Vec<Problem> {
        self.hdus.iter().flat_map(|hdu| hdu.header().check()).collect()
    }

    /// Saves every header and reports whether it worked.
    ///
    /// See [`FitsFile::try_save`] for the error.
    pub fn save(&mut self) -> bool {
        self.try_save().is_ok()
    }

    /// Writes every header back to the file, moving data units as needed.
    pub fn try_save(&mut self) -> Result<()> {
        let mut rendered = Vec::with_capacity(self.hdus.len());
        for (index, hdu) in self.hdus.iter().enumerate() {
            match hdu.header().render() {
                Some(bytes) => rendered.push(bytes),
                None => {
                    let problems = hdu.header().check();
                    warn!(index, problems = problems.len(), "header fails its checks, not saving");
                    return Err(Error::Invalid { index, problems });
                }
            }
        }

        let backup = backup_path(&self.path);
        fs::copy(&self.path, &backup)?;
        debug!(backup = %backup.display(), "created backup");

        match self.write_layout(&rendered, &backup) {
            Ok(layout) => {
                for (hdu, (header_start, data_start)) in self.hdus.iter_mut().zip(layout) {
                    hdu.relocate(header_start, data_start);
                }
                fs::remove_file(&backup)?;
                debug!(backup = %backup.display(), "removed backup");
                info!(path = %self.path.display(), "saved FITS file");
                Ok(())
            }
            Err(e) => {
                error!(path = %self.path.display(), backup = %backup.display(), error = %e, "saving failed, backup kept");
                if let Err(restore) = fs::copy(&backup, &self.path) {
                    error!(error = %restore, "could not restore the file from its backup");
                }
                Err(e)
            }
        }
    }

    /// Writes `rendered` headers and the data units copied from `backup`.
    /// Returns the new `(header_start, data_start)` of every HDU.
    fn write_layout(&mut self, rendered: &[Vec<u8>], backup: &Path) -> Result<Vec<(u64, u64)>> {
        let mut source = File::open(backup)?;
        let mut layout = Vec::with_capacity(rendered.len());
        let mut offset = 0u64;
        for (hdu, header) in self.hdus.iter().zip(rendered) {
            self.file.seek(SeekFrom::Start(offset))?;
            self.file.write_all(header)?;
            let data_start = offset + header.len() as u64;
            let padded = hdu.padded_data_len();
            if data_start != hdu.data_start() && padded > 0 {
                debug!(from = hdu.data_start(), to = data_start, len = hdu.data_len(), "moving data unit");
                source.seek(SeekFrom::Start(hdu.data_start()))?;
                let copied = io::copy(&mut (&mut source).take(padded), &mut self.file)?;
                io::copy(&mut io::repeat(0).take(padded - copied), &mut self.file)?;
            }
            layout.push((offset, data_start));
            offset = data_start + padded;
        }
        // Bytes after the last readable HDU travel with it.
        let old_end = self.hdus.last().map_or(0, Hdu::end);
        if source.metadata()?.len() > old_end {
            source.seek(SeekFrom::Start(old_end))?;
            self.file.seek(SeekFrom::Start(offset))?;
            offset += io::copy(&mut source, &mut self.file)?;
        }
        self.file.set_len(offset)?;
        self.file.sync_all()?;
        Ok(layout)
    }

    /// Releases the file handle.
    pub fn close(self) {
        debug!(path = %self.path.display(), "closed FITS file");
    }
}

/// `<name>.old` next to `path`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(BACKUP_SUFFIX);
    path.with_file_name(name)
}

fn read_hdus(file: &mut File, file_len: u64) -> Result<Vec<Hdu>> {
    let mut hdus: Vec<Hdu> = Vec::new();
    let mut offset = 0u64;
    while offset < file_len {
        let index = hdus.len();
        match read_hdu(file, offset, file_len, index) {
            Ok(hdu) => {
                debug!(
                    index,
                    header_start = hdu.header_start(),
                    data_start = hdu.data_start(),
                    data_len = hdu.data_len(),
                    cards = hdu.header().len(),
                    "parsed HDU"
                );
                offset = hdu.end();
                hdus.push(hdu);
            }
            Err(e) if hdus.is_empty() => return Err(e),
            Err(e) => {
                warn!(index, offset, error = %e, "ignoring everything after the last readable HDU");
                break;
            }
        }
    }
    Ok(hdus)
}

fn read_hdu(file: &mut File, offset: u64, file_len: u64, index: usize) -> Result<Hdu> {
    file.seek(SeekFrom::Start(offset))?;
    let (header, consumed) = Header::read_from(file)?;
    let expected = if index == 0 {
        HeaderKind::Primary
    } else {
        HeaderKind::Extension
    };
    if header.kind() != expected {
        return Err(Error::FileStructure(format!(
            "HDU {index} must start with {}",
            expected.first_keyword().name()
        )));
    }
    let hdu = Hdu::new(header, offset, offset + consumed as u64)?;
    // The padding of the last data unit may be missing, the data may not.
    if hdu.data_start() + hdu.data_len() > file_len {
        return Err(Error::UnexpectedEof);
    }
    Ok(hdu)
}

/// Cheap structural probe: the file starts with a SIMPLE card and the last
/// card of one of its blocks is blank or END.
pub fn is_fits_file(path: impl AsRef<Path>) -> bool {
    probe(path.as_ref()).unwrap_or(false)
}

fn probe(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut card = [0u8; CARD_SIZE];
    file.read_exact(&mut card)?;
    if !card.starts_with(SIMPLE_PREFIX) {
        return Ok(false);
    }
    let len = file.metadata()?.len();
    let mut block_end = BLOCK_SIZE as u64;
    while block_end <= len {
        file.seek(SeekFrom::Start(block_end - CARD_SIZE as u64))?;
        file.read_exact(&mut card)?;
        if is_blank_card(&card) || is_end_card(&card) {
            return Ok(true);
        }
        block_end += BLOCK_SIZE as u64;
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::make_header;

    #[test]
    fn backup_sits_next_to_the_file() {
        assert_eq!(
            backup_path(Path::new("/data/image.fits")),
            PathBuf::from("/data/image.fits.old")
        );
        assert_eq!(backup_path(Path::new("plain")), PathBuf::from("plain.old"));
    }

    #[test]
    fn probe_rejects_short_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let short = dir.path().join("short.fits");
        fs::write(&short, b"SIMPLE  =").unwrap();
        assert!(!is_fits_file(&short));

        let foreign = dir.path().join("foreign.fits");
        fs::write(&foreign, vec![b' '; BLOCK_SIZE]).unwrap();
        assert!(!is_fits_file(&foreign));

        assert!(!is_fits_file(dir.path().join("missing.fits")));
    }

    #[test]
    fn probe_accepts_minimal_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("min.fits");
        fs::write(
            &path,
            make_header(&[
                "SIMPLE  =                    T",
                "BITPIX  =                    8",
                "NAXIS   =                    0",
                "END",
            ]),
        )
        .unwrap();
        assert!(is_fits_file(&path));
        let fits = FitsFile::open(&path).unwrap();
        assert_eq!(fits.len(), 1);
        assert_eq!(fits.hdu(0).unwrap().data_len(), 0);
        fits.close();
    }

    #[test]
    fn open_reports_missing_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FitsFile::open(dir.path().join("none.fits")),
            Err(Error::FileStructure(_))
        ));
        let text = dir.path().join("notes.txt");
        fs::write(&text, "hello").unwrap();
        assert!(matches!(FitsFile::open(&text), Err(Error::FileStructure(_))));
    }
}
