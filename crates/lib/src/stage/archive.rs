//! Tar archive inspection and unpacking.
//!
//! Compression is recognized from magic bytes rather than the filename, since
//! forge archive URLs (`.../archive/v2.5.2.tar.gz`) are often renamed in the
//! cache.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use xz2::read::XzDecoder;

use crate::error::BuildError;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";
const XZ_MAGIC: &[u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];
const USTAR_OFFSET: usize = 257;
const USTAR_MAGIC: &[u8] = b"ustar";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
  Gzip,
  Bzip2,
  Xz,
  None,
}

/// Detect the compression of a tar archive from its first bytes.
pub fn detect_compression(path: &Path) -> Result<Compression, BuildError> {
  let mut head = Vec::with_capacity(USTAR_OFFSET + USTAR_MAGIC.len());
  File::open(path)?
    .take((USTAR_OFFSET + USTAR_MAGIC.len()) as u64)
    .read_to_end(&mut head)?;

  if head.starts_with(GZIP_MAGIC) {
    Ok(Compression::Gzip)
  } else if head.starts_with(BZIP2_MAGIC) {
    Ok(Compression::Bzip2)
  } else if head.starts_with(XZ_MAGIC) {
    Ok(Compression::Xz)
  } else if head.get(USTAR_OFFSET..) == Some(USTAR_MAGIC) {
    Ok(Compression::None)
  } else {
    Err(BuildError::UnsupportedArchive(path.to_path_buf()))
  }
}

fn open(path: &Path) -> Result<Archive<Box<dyn Read>>, BuildError> {
  let compression = detect_compression(path)?;
  let reader = BufReader::new(File::open(path)?);
  let decoded: Box<dyn Read> = match compression {
    Compression::Gzip => Box::new(GzDecoder::new(reader)),
    Compression::Bzip2 => Box::new(BzDecoder::new(reader)),
    Compression::Xz => Box::new(XzDecoder::new(reader)),
    Compression::None => Box::new(reader),
  };
  Ok(Archive::new(decoded))
}

/// Distinct first path segments of all entries, ignoring `./` and pax headers.
pub fn top_level_prefixes(path: &Path) -> Result<BTreeSet<String>, BuildError> {
  let mut archive = open(path)?;
  let mut prefixes = BTreeSet::new();

  for entry in archive.entries()? {
    let entry = entry?;
    if matches!(entry.header().entry_type(), EntryType::XGlobalHeader | EntryType::XHeader) {
      continue;
    }
    let entry_path = entry.path()?;
    let first = entry_path.components().find_map(|component| match component {
      Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
      _ => None,
    });
    if let Some(first) = first {
      prefixes.insert(first);
    }
  }

  Ok(prefixes)
}

/// Unpack every entry of the archive below `dest`.
pub fn unpack(path: &Path, dest: &Path) -> Result<(), BuildError> {
  std::fs::create_dir_all(dest)?;
  open(path)?.unpack(dest)?;
  Ok(())
}
