// Copyright 2024 Karpeles Lab Inc.
// QFS/RefPack compression as used by SimCity 4 DBPF archives
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use thiserror::Error;

/// Result type for QFS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for QFS compression/decompression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The compressed block is malformed
    #[error("qfs: corrupt input: {0}")]
    Corrupt(Corruption),

    /// The opcode stream ended with a different byte count than the header declared
    #[error("qfs: decoded {actual} bytes, header declared {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The compressed output outgrew the input plus the allowed slack
    #[error("qfs: compressed output exceeds {limit} bytes")]
    EncodeOverflow { limit: usize },
}

/// What exactly was wrong with a corrupt block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Corruption {
    /// Block too short to hold the 9-byte header, or signature missing
    #[error("invalid header")]
    Header,

    /// The 4-byte size prefix disagrees with the block length
    #[error("size prefix {declared} does not match block length {actual}")]
    SizePrefix { declared: usize, actual: usize },

    /// An opcode's control bytes run past the end of the block
    #[error("truncated opcode at offset {offset}")]
    TruncatedOpcode { offset: usize },

    /// Literal bytes run past the end of the block
    #[error("truncated literals at offset {offset}")]
    TruncatedLiterals { offset: usize },

    /// A match points before the start of the output
    #[error("match distance {distance} exceeds {available} decoded bytes")]
    Distance { distance: usize, available: usize },

    /// A copy would write past the declared uncompressed size
    #[error("output overrun at offset {offset}")]
    Overrun { offset: usize },
}

impl From<Corruption> for Error {
    fn from(c: Corruption) -> Self {
        Error::Corrupt(c)
    }
}
