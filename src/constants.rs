// Copyright 2024 Karpeles Lab Inc.
// QFS/RefPack compression as used by SimCity 4 DBPF archives
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

/// Signature bytes following the 4-byte size prefix
pub const SIGNATURE: [u8; 2] = [0x10, 0xfb];

/// Signature read as a little-endian u16
pub const SIGNATURE_LE: u16 = 0xfb10;

/// Offset of the signature inside a compressed block
pub const SIGNATURE_OFFSET: usize = 4;

/// Length of the outer size prefix
pub const SIZE_PREFIX_LEN: usize = 4;

/// Length of the full header (size prefix, signature, uncompressed size)
pub const HEADER_LEN: usize = 9;

/// Smallest input worth compressing; the header alone costs 9 bytes
pub const MIN_UNCOMPRESSED_SIZE: usize = 10;

/// Largest input the 24-bit size field can describe
pub const MAX_UNCOMPRESSED_SIZE: usize = 0xff_ffff;

/// Maximum match distance (2^17)
pub const WINDOW_SIZE: usize = 1 << 17;

/// Shortest encodable match
pub const MIN_MATCH: usize = 3;

/// Longest encodable match (Long opcode)
pub const MAX_MATCH: usize = 1028;

/// Extra room the encoder allows beyond the input length
pub const OUTPUT_SLACK: usize = 1028;

/// Short opcode limits (2 bytes)
pub const SHORT_MAX_LEN: usize = 10;
pub const SHORT_MAX_DISTANCE: usize = 1024;

/// Medium opcode limits (3 bytes)
pub const MEDIUM_MIN_LEN: usize = 4;
pub const MEDIUM_MAX_LEN: usize = 67;
pub const MEDIUM_MAX_DISTANCE: usize = 16384;

/// Long opcode limits (4 bytes)
pub const LONG_MIN_LEN: usize = 5;

/// First byte ranges of the control codes
pub const OP_MEDIUM: u8 = 0x80;
pub const OP_LONG: u8 = 0xc0;
pub const OP_LITERALS: u8 = 0xe0;
pub const OP_STOP: u8 = 0xfc;

/// Largest literal run a single opcode carries
pub const MAX_LITERAL_RUN: usize = 112;

/// Largest number of literals embedded in a match or stop opcode
pub const MAX_EMBEDDED_LITERALS: usize = 3;
