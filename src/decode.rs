// Copyright 2024 Karpeles Lab Inc.
// QFS/RefPack compression as used by SimCity 4 DBPF archives
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use tracing::{debug, warn};

use crate::constants::*;
use crate::copy::{copy_bytes, copy_match};
use crate::error::{Corruption, Error, Result};
use crate::header::{is_compressed, Header};
use crate::opcode::Opcode;

/// Decoder for QFS compressed entries
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    /// Reject blocks whose 4-byte size prefix differs from their length
    verify_size_prefix: bool,
}

impl Decoder {
    /// Create a decoder that tolerates a wrong size prefix (logged, not fatal)
    pub fn new() -> Self {
        Decoder {
            verify_size_prefix: false,
        }
    }

    /// Create a decoder that requires the size prefix to match the block length
    pub fn strict() -> Self {
        Decoder {
            verify_size_prefix: true,
        }
    }

    /// Set whether the size prefix must match the block length
    pub fn verify_size_prefix(mut self, verify: bool) -> Self {
        self.verify_size_prefix = verify;
        self
    }

    /// Decompress `src`.
    ///
    /// Data that does not carry the QFS signature is returned unchanged.
    pub fn decompress(&self, src: &[u8]) -> Result<Vec<u8>> {
        if !is_compressed(src) {
            return Ok(src.to_vec());
        }

        let header = Header::parse(src)?;
        let declared = header.compressed_size as usize;
        if declared != src.len() {
            if self.verify_size_prefix {
                return Err(Corruption::SizePrefix {
                    declared,
                    actual: src.len(),
                }
                .into());
            }
            warn!(declared, actual = src.len(), "qfs size prefix mismatch");
        }

        let mut dst = vec![0u8; header.uncompressed_size as usize];
        qfs_decode(&mut dst, src)?;

        debug!(
            compressed = src.len(),
            decompressed = dst.len(),
            "qfs block decompressed"
        );
        Ok(dst)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decompress returns the decoded form of `src`.
///
/// If `src` is not QFS compressed (see [`is_compressed`]) it is returned
/// unchanged. Otherwise the output is exactly the size declared in the
/// header, or an error.
pub fn decompress(src: &[u8]) -> Result<Vec<u8>> {
    Decoder::new().decompress(src)
}

/// Core QFS decoding loop.
///
/// Reads opcodes from offset 9 until the stop opcode or the end of `src`.
/// Every opcode first copies its literals from `src`, then its
/// back-reference from earlier output. All ranges are validated before any
/// copy. The stop opcode's literals are only taken while output is short.
fn qfs_decode(dst: &mut [u8], src: &[u8]) -> Result<()> {
    let mut s = HEADER_LEN; // source index
    let mut d = 0; // destination index

    while s < src.len() {
        let op = Opcode::parse(src, s)?;
        if let Opcode::Stop { .. } = op {
            if d == dst.len() {
                break;
            }
        }
        s += op.control_len();

        let literals = op.literals();
        if literals > src.len() - s {
            return Err(Corruption::TruncatedLiterals { offset: s }.into());
        }
        if literals > dst.len() - d {
            return Err(Corruption::Overrun { offset: d }.into());
        }
        copy_bytes(dst, d, src, s, literals);
        s += literals;
        d += literals;

        if let Some((length, distance)) = op.back_reference() {
            if distance > d {
                return Err(Corruption::Distance {
                    distance,
                    available: d,
                }
                .into());
            }
            if length > dst.len() - d {
                return Err(Corruption::Overrun { offset: d }.into());
            }
            copy_match(dst, d, distance, length);
            d += length;
        }

        if let Opcode::Stop { .. } = op {
            break;
        }
    }

    if d != dst.len() {
        return Err(Error::SizeMismatch {
            expected: dst.len(),
            actual: d,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(uncompressed: usize, ops: &[u8]) -> Vec<u8> {
        let mut b = vec![0u8; HEADER_LEN];
        b.extend_from_slice(ops);
        Header {
            compressed_size: b.len() as u32,
            uncompressed_size: uncompressed as u32,
        }
        .write(&mut b);
        b
    }

    #[test]
    fn test_not_compressed_is_identity() {
        let data = b"just some plain bytes";
        assert_eq!(decompress(data).unwrap(), data.to_vec());
        assert_eq!(decompress(&[]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_stop_only() {
        let b = block(3, &[0xff, b'x', b'y', b'z']);
        assert_eq!(decompress(&b).unwrap(), b"xyz".to_vec());
    }

    #[test]
    fn test_stop_literals_ignored_when_full() {
        let b = block(4, &[0xe0, b'a', b'b', b'c', b'd', 0xfd, b'z']);
        assert_eq!(decompress(&b).unwrap(), b"abcd".to_vec());

        // Literals missing from the block are not read either
        let b = block(4, &[0xe0, b'a', b'b', b'c', b'd', 0xff]);
        assert_eq!(decompress(&b).unwrap(), b"abcd".to_vec());
    }

    #[test]
    fn test_stop_literals_past_declared_size() {
        let b = block(5, &[0xe0, b'a', b'b', b'c', b'd', 0xfe, b'y', b'z']);
        assert_eq!(decompress(&b), Err(Corruption::Overrun { offset: 4 }.into()));
    }

    #[test]
    fn test_empty_payload() {
        let b = block(0, &[0xfc]);
        assert_eq!(decompress(&b).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_run_expansion() {
        // 1 literal 'A' with a length 10 copy at distance 1, then 5 more via medium
        let b = block(16, &[0x1d, 0x00, b'A', 0x81, 0x00, 0x00, 0xfc]);
        assert_eq!(decompress(&b).unwrap(), vec![b'A'; 16]);
    }

    #[test]
    fn test_long_match() {
        // 4 literals, then a long copy of 1000 at distance 4, stop
        let l = 1000 - 5;
        let b0 = 0xc0 | (((l >> 8) << 2) as u8);
        let b = block(
            1004,
            &[0xe0, b'w', b'x', b'y', b'z', b0, 0x00, 0x03, l as u8, 0xfc],
        );
        let out = decompress(&b).unwrap();
        assert_eq!(out.len(), 1004);
        assert!(out.chunks(4).all(|c| c == b"wxyz"));
    }

    #[test]
    fn test_distance_beyond_output() {
        let b = block(8, &[0x01, 0x05, b'a', 0xfc]);
        assert_eq!(
            decompress(&b),
            Err(Corruption::Distance {
                distance: 6,
                available: 1
            }
            .into())
        );
    }

    #[test]
    fn test_overrun() {
        let b = block(2, &[0xe0, b'a', b'b', b'c', b'd', 0xfc]);
        assert_eq!(decompress(&b), Err(Corruption::Overrun { offset: 0 }.into()));
    }

    #[test]
    fn test_size_mismatch() {
        let b = block(10, &[0xe0, b'a', b'b', b'c', b'd', 0xfc]);
        assert_eq!(
            decompress(&b),
            Err(Error::SizeMismatch {
                expected: 10,
                actual: 4
            })
        );
    }

    #[test]
    fn test_end_without_stop() {
        // Running out of input is fine once the declared size is reached
        let b = block(4, &[0xe0, b'a', b'b', b'c', b'd']);
        assert_eq!(decompress(&b).unwrap(), b"abcd".to_vec());

        let b = block(6, &[0xe0, b'a', b'b', b'c', b'd']);
        assert_eq!(
            decompress(&b),
            Err(Error::SizeMismatch {
                expected: 6,
                actual: 4
            })
        );

        let b = block(0, &[]);
        assert_eq!(decompress(&b).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_truncated_literals() {
        let b = block(4, &[0xe0, b'a', b'b']);
        assert_eq!(
            decompress(&b),
            Err(Corruption::TruncatedLiterals { offset: 10 }.into())
        );
    }

    #[test]
    fn test_truncated_header() {
        let b = [0, 0, 0, 0, 0x10, 0xfb, 0];
        assert_eq!(decompress(&b), Err(Corruption::Header.into()));
    }

    #[test]
    fn test_size_prefix_checks() {
        let mut b = block(3, &[0xff, b'x', b'y', b'z']);
        b[0] = b[0].wrapping_add(1);

        assert_eq!(Decoder::new().decompress(&b).unwrap(), b"xyz".to_vec());
        assert_eq!(
            Decoder::strict().decompress(&b),
            Err(Corruption::SizePrefix {
                declared: 14,
                actual: 13
            }
            .into())
        );
        assert!(Decoder::strict()
            .verify_size_prefix(false)
            .decompress(&b)
            .is_ok());
    }
}
