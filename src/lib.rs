// Copyright 2024 Karpeles Lab Inc.
// QFS/RefPack compression as used by SimCity 4 DBPF archives
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! # QFS Compression
//!
//! This library implements QFS, the RefPack variant of LZ77 that SimCity 4
//! uses for individual entries inside DBPF save and resource archives.
//!
//! QFS provides:
//! - Whole-buffer compression with hash-chain matching and lazy evaluation
//! - Bounds-checked decompression that reports corrupt or truncated blocks
//! - Format detection and size inspection without decoding
//!
//! A compressed block is a 4-byte little-endian block length, the signature
//! `0x10 0xFB`, a 3-byte big-endian uncompressed length, and the opcode
//! stream. Entries that are too small, too large, or that do not shrink are
//! stored raw; [`decompress`] hands raw data back unchanged.
//!
//! ## Example
//!
//! ```rust
//! use qfs::{compress, decompress, decompressed_size, is_compressed};
//!
//! let data = b"Exemplar Name=Exemplar Name=Exemplar Name=Exemplar Name".to_vec();
//! let compressed = compress(&data).expect("compression failed");
//! assert!(is_compressed(&compressed));
//! assert_eq!(decompressed_size(&compressed) as usize, data.len());
//!
//! let decompressed = decompress(&compressed).expect("decompression failed");
//! assert_eq!(data, decompressed);
//! ```

mod constants;
mod copy;
mod decode;
mod encode;
mod error;
mod header;
mod match_finder;
pub mod opcode;

#[cfg(feature = "concurrent")]
mod concurrent;

pub use constants::{MAX_UNCOMPRESSED_SIZE, MIN_UNCOMPRESSED_SIZE, WINDOW_SIZE};
pub use decode::{decompress, Decoder};
pub use encode::{compress, max_compressed_len, Encoder};
pub use error::{Corruption, Error, Result};
pub use header::{decompressed_size, is_compressed, Header};

#[cfg(feature = "concurrent")]
pub use concurrent::{compress_batch, decompress_batch};
