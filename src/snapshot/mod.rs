//! Snapshot Module
//!
//! Whole-store durability: the store is written to disk at shutdown and
//! read back at startup.
//!
//! ## Responsibilities
//! - Frame one entry as bytes and back (`codec`)
//! - Keep a single-file, bucketed key space with atomic commits (`file`)
//! - Transfer a full store to and from one bucket (`manager`)
//!
//! ## File Format
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │ Header (10 bytes)                                         │
//! │   Magic: "STKV" (4) | Version: u16 (2) | Buckets: u32 (4) │
//! ├───────────────────────────────────────────────────────────┤
//! │ Bucket (repeated BucketCount times)                       │
//! │   NameLen: u16 | Name | EntryCount: u64                   │
//! │   [KeyLen: u32][ValLen: u32][Key][Value] × EntryCount     │
//! ├───────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                          │
//! │   CRC32 of everything above                               │
//! └───────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian. The store's bucket maps each key to an
//! encoded entry (see [`codec`]).
//!
//! ## Atomicity
//! Every commit writes a complete new image to `{file}.tmp`, fsyncs it and
//! renames it over the file. Readers only ever see the previous or the new
//! image.

pub mod codec;
mod file;
mod format;
mod manager;

pub use codec::{decode_entry, encode_entry, encoded_len};
pub use file::{Bucket, OpenMode, ReadTxn, SnapshotFile, WriteTxn};
pub use manager::{SnapshotManager, SnapshotStats};
