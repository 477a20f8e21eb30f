use crate::error::{Result, XdfError};
use flate2::read::GzDecoder;
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::ops::Deref;
use std::path::Path;

/// Open a file and map it into memory (read-only)
pub fn mmap_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path).map_err(XdfError::IoError)?;
    let mmap = unsafe { Mmap::map(&file).map_err(XdfError::IoError)? };
    Ok(mmap)
}

/// Raw bytes of a recording, mapped for plain files and inflated for `.xdfz`
pub enum FileBytes {
    Mapped(Mmap),
    Inflated(Vec<u8>),
}

impl Deref for FileBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FileBytes::Mapped(mmap) => &mmap[..],
            FileBytes::Inflated(bytes) => bytes.as_slice(),
        }
    }
}

pub fn is_compressed(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xdfz") || e.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Read a recording into memory, decompressing gzipped files
pub fn read_file_bytes(path: &Path) -> Result<FileBytes> {
    if is_compressed(path) {
        let file = File::open(path)?;
        let mut decoder = GzDecoder::new(file);
        let mut bytes = Vec::new();
        decoder.read_to_end(&mut bytes)?;
        log::debug!("Inflated {} to {} bytes", path.display(), bytes.len());
        Ok(FileBytes::Inflated(bytes))
    } else {
        Ok(FileBytes::Mapped(mmap_file(path)?))
    }
}
