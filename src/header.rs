// Copyright 2024 Karpeles Lab Inc.
// QFS/RefPack compression as used by SimCity 4 DBPF archives
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Block header: format detection and size fields.
//!
//! A compressed entry starts with a 9-byte header:
//!
//! ```text
//! +---------------------+-----------+--------------------------+
//! | block length (LE32) | 0x10 0xFB | uncompressed length BE24 |
//! +---------------------+-----------+--------------------------+
//!   0                     4           6                          9
//! ```

use crate::constants::*;
use crate::error::{Corruption, Result};

/// Returns true if `data` carries the QFS signature at offset 4.
///
/// Detection is heuristic: an uncompressed payload whose bytes 4 and 5
/// happen to be `0x10 0xFB` is reported as compressed. Containers that
/// record a per-entry compression flag should trust that flag instead.
pub fn is_compressed(data: &[u8]) -> bool {
    data.len() > SIGNATURE_OFFSET + 2
        && u16::from_le_bytes([data[SIGNATURE_OFFSET], data[SIGNATURE_OFFSET + 1]]) == SIGNATURE_LE
}

/// Returns the length `data` decompresses to.
///
/// For data that is not compressed, or too short to hold the size field,
/// this is simply `data.len()`.
pub fn decompressed_size(data: &[u8]) -> u32 {
    if is_compressed(data) && data.len() >= HEADER_LEN {
        read_u24_be(&data[6..9])
    } else {
        data.len() as u32
    }
}

/// Parsed block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total block length as recorded in the size prefix
    pub compressed_size: u32,
    /// Length of the decoded data
    pub uncompressed_size: u32,
}

impl Header {
    /// Parse the header at the start of a compressed block
    pub fn parse(data: &[u8]) -> Result<Header> {
        if data.len() < HEADER_LEN || !is_compressed(data) {
            return Err(Corruption::Header.into());
        }

        Ok(Header {
            compressed_size: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            uncompressed_size: read_u24_be(&data[6..9]),
        })
    }

    /// Write the header into the first 9 bytes of `dst`
    ///
    /// # Panics
    ///
    /// Panics if `dst` is shorter than 9 bytes.
    pub fn write(&self, dst: &mut [u8]) {
        dst[..SIZE_PREFIX_LEN].copy_from_slice(&self.compressed_size.to_le_bytes());
        dst[SIGNATURE_OFFSET..SIGNATURE_OFFSET + 2].copy_from_slice(&SIGNATURE);
        let size = self.uncompressed_size;
        dst[6] = (size >> 16) as u8;
        dst[7] = (size >> 8) as u8;
        dst[8] = size as u8;
    }
}

#[inline]
fn read_u24_be(b: &[u8]) -> u32 {
    ((b[0] as u32) << 16) | ((b[1] as u32) << 8) | b[2] as u32
}
