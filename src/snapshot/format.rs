//! Snapshot image encoding
//!
//! Serializes the full bucket set of a snapshot file and parses it back.
//! The image is always written whole; see the module docs for the layout.

use std::collections::BTreeMap;
use std::io::Write;

use crate::error::{Result, StashError};

use super::file::Bucket;

/// Magic bytes identifying a StashKV snapshot file
pub(crate) const MAGIC: &[u8; 4] = b"STKV";

/// Current snapshot format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + BucketCount (4) = 10 bytes
pub(crate) const HEADER_SIZE: usize = 10;

/// Footer size: CRC32 (4)
pub(crate) const FOOTER_SIZE: usize = 4;

// =============================================================================
// Writing
// =============================================================================

/// Writes bytes while accumulating the image CRC
struct ImageWriter<'w, W: Write> {
    writer: &'w mut W,
    hasher: crc32fast::Hasher,
    written: u64,
}

impl<'w, W: Write> ImageWriter<'w, W> {
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.hasher.update(bytes);
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn finish(self) -> Result<u64> {
        let crc = self.hasher.finalize();
        self.writer.write_all(&crc.to_le_bytes())?;
        Ok(self.written + FOOTER_SIZE as u64)
    }
}

/// Write a complete image; returns the number of bytes written
pub(crate) fn write_image<W: Write>(writer: &mut W, buckets: &[(&str, &Bucket)]) -> Result<u64> {
    let bucket_count = u32::try_from(buckets.len())
        .map_err(|_| StashError::Serialization("too many buckets".to_string()))?;

    let mut image = ImageWriter {
        writer,
        hasher: crc32fast::Hasher::new(),
        written: 0,
    };

    image.put(MAGIC)?;
    image.put(&VERSION.to_le_bytes())?;
    image.put(&bucket_count.to_le_bytes())?;

    for (name, bucket) in buckets {
        let name_len = u16::try_from(name.len())
            .map_err(|_| StashError::InvalidBucketName(format!("{} bytes long", name.len())))?;
        image.put(&name_len.to_le_bytes())?;
        image.put(name.as_bytes())?;
        image.put(&(bucket.len() as u64).to_le_bytes())?;

        for (key, value) in bucket.iter() {
            image.put(&length_u32(key.len(), "key")?.to_le_bytes())?;
            image.put(&length_u32(value.len(), "value")?.to_le_bytes())?;
            image.put(key)?;
            image.put(value)?;
        }
    }

    image.finish()
}

fn length_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| StashError::Serialization(format!("{} of {} bytes is too large", what, len)))
}

// =============================================================================
// Parsing
// =============================================================================

/// Bounds-checked little-endian reader over an image
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        let remaining = self.data.len() - self.pos;
        if remaining < n {
            return Err(StashError::Corrupt(format!(
                "truncated {} at offset {}: need {} bytes, {} left",
                what, self.pos, n, remaining
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u16(&mut self, what: &str) -> Result<u16> {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.take(2, what)?);
        Ok(u16::from_le_bytes(buf))
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4, what)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self, what: &str) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8, what)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn is_at_end(&self) -> bool {
        self.pos == self.data.len()
    }
}

/// Parse and verify a complete image
pub(crate) fn parse_image(data: &[u8]) -> Result<BTreeMap<String, Bucket>> {
    if data.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(StashError::Corrupt(format!(
            "snapshot file too short: {} bytes",
            data.len()
        )));
    }

    let (body, footer) = data.split_at(data.len() - FOOTER_SIZE);
    let stored_crc = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
    let actual_crc = crc32fast::hash(body);
    if stored_crc != actual_crc {
        return Err(StashError::Corrupt(format!(
            "snapshot checksum mismatch: stored {:#010x}, computed {:#010x}",
            stored_crc, actual_crc
        )));
    }

    let mut cursor = Cursor { data: body, pos: 0 };

    let magic = cursor.take(MAGIC.len(), "magic")?;
    if magic != MAGIC {
        return Err(StashError::Corrupt(format!(
            "invalid snapshot magic: expected STKV, got {:?}",
            magic
        )));
    }

    let version = cursor.u16("version")?;
    if version != VERSION {
        return Err(StashError::Corrupt(format!(
            "unsupported snapshot version: {}",
            version
        )));
    }

    let bucket_count = cursor.u32("bucket count")?;
    let mut buckets = BTreeMap::new();

    for _ in 0..bucket_count {
        let name_len = cursor.u16("bucket name length")? as usize;
        let name = std::str::from_utf8(cursor.take(name_len, "bucket name")?)
            .map_err(|e| StashError::Corrupt(format!("bucket name is not UTF-8: {}", e)))?
            .to_string();
        let entry_count = cursor.u64("entry count")?;

        let mut bucket = Bucket::default();
        for _ in 0..entry_count {
            let key_len = cursor.u32("key length")? as usize;
            let val_len = cursor.u32("value length")? as usize;
            let key = cursor.take(key_len, "key")?;
            let value = cursor.take(val_len, "value")?;
            if bucket.put(key, value).is_some() {
                return Err(StashError::Corrupt(format!(
                    "duplicate key in bucket {:?}",
                    name
                )));
            }
        }

        if buckets.contains_key(&name) {
            return Err(StashError::Corrupt(format!("duplicate bucket {:?}", name)));
        }
        buckets.insert(name, bucket);
    }

    if !cursor.is_at_end() {
        return Err(StashError::Corrupt(format!(
            "{} trailing bytes after last bucket",
            body.len() - cursor.pos
        )));
    }

    Ok(buckets)
}
