// Copyright 2024 Karpeles Lab Inc.
// QFS/RefPack compression as used by SimCity 4 DBPF archives
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use tracing::{debug, trace};

use crate::constants::*;
use crate::copy::copy_bytes;
use crate::error::{Error, Result};
use crate::header::{is_compressed, Header};
use crate::match_finder::{Match, MatchFinder};
use crate::opcode::Opcode;

/// Upper bound for the chain walk, whatever the caller asks for
const MAX_CHAIN_LIMIT: usize = 4096;

/// Encoder for QFS compression
///
/// The wire format is fixed; the settings only trade speed for ratio.
///
/// ```
/// use qfs::{decompress, Encoder};
///
/// let data = b"SimCity 4 SimCity 4 SimCity 4 SimCity 4".repeat(4);
/// let compressed = Encoder::best().compress(&data).unwrap();
/// assert!(compressed.len() < data.len());
/// assert_eq!(decompress(&compressed).unwrap(), data);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoder {
    max_chain: usize,
    nice_length: usize,
    good_length: usize,
    lazy: bool,
    keep_unprofitable: bool,
}

impl Encoder {
    /// Create an encoder with balanced defaults
    pub fn new() -> Self {
        Encoder {
            max_chain: 50,
            nice_length: 128,
            good_length: 32,
            lazy: true,
            keep_unprofitable: false,
        }
    }

    /// Short chain walks and greedy parsing
    pub fn fast() -> Self {
        Encoder {
            max_chain: 8,
            nice_length: 32,
            good_length: 8,
            lazy: false,
            keep_unprofitable: false,
        }
    }

    /// Long chain walks; slowest, smallest output
    pub fn best() -> Self {
        Encoder {
            max_chain: 1024,
            nice_length: MAX_MATCH,
            good_length: 258,
            lazy: true,
            keep_unprofitable: false,
        }
    }

    /// Maximum number of candidates examined per position (1 to 4096)
    pub fn max_chain(mut self, n: usize) -> Self {
        self.max_chain = n.clamp(1, MAX_CHAIN_LIMIT);
        self
    }

    /// Stop searching once a match this long is found (3 to 1028)
    pub fn nice_length(mut self, n: usize) -> Self {
        self.nice_length = n.clamp(MIN_MATCH, MAX_MATCH);
        self
    }

    /// Search a quarter of the chain when the pending match is this long (3 to 1028)
    pub fn good_length(mut self, n: usize) -> Self {
        self.good_length = n.clamp(MIN_MATCH, MAX_MATCH);
        self
    }

    /// Enable or disable one-step lazy matching
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Keep the compressed block even when it is not smaller than the input
    pub fn keep_unprofitable(mut self, keep: bool) -> Self {
        self.keep_unprofitable = keep;
        self
    }

    /// Compress `src` into a QFS block.
    ///
    /// Inputs shorter than 10 bytes or longer than 16 MiB - 1 are returned
    /// unchanged, as are inputs that do not shrink (unless
    /// [`keep_unprofitable`](Self::keep_unprofitable) is set). An input that
    /// would itself be detected as compressed is never returned raw, so
    /// `decompress(compress(x)) == x` holds for every compressible length.
    ///
    /// Fails with [`Error::EncodeOverflow`] only when raw storage is ruled out
    /// and the block would exceed [`max_compressed_len`].
    pub fn compress(&self, src: &[u8]) -> Result<Vec<u8>> {
        if !(MIN_UNCOMPRESSED_SIZE..=MAX_UNCOMPRESSED_SIZE).contains(&src.len()) {
            trace!(len = src.len(), "qfs input outside compressible range, stored raw");
            return Ok(src.to_vec());
        }

        let store_raw = !self.keep_unprofitable && !is_compressed(src);

        let dst = match self.encode_block(src) {
            Ok(dst) => dst,
            Err(Error::EncodeOverflow { .. }) if store_raw => {
                trace!(len = src.len(), "qfs output overflowed, stored raw");
                return Ok(src.to_vec());
            }
            Err(e) => return Err(e),
        };

        if store_raw && dst.len() >= src.len() {
            trace!(
                len = src.len(),
                compressed = dst.len(),
                "qfs output not smaller, stored raw"
            );
            return Ok(src.to_vec());
        }

        debug!(
            uncompressed = src.len(),
            compressed = dst.len(),
            "qfs block compressed"
        );
        Ok(dst)
    }

    /// Encode a block using lazy hash-chain matching
    fn encode_block(&self, src: &[u8]) -> Result<Vec<u8>> {
        let mut out = Emitter::new(src, max_compressed_len(src.len()));
        let mut finder = MatchFinder::new(src, self.max_chain, self.nice_length, self.good_length);

        let mut s = 0;
        // Match found at s - 1, waiting to see whether s does better
        let mut pending: Option<Match> = None;

        while s < src.len() {
            let prev_length = pending.map_or(0, |m| m.length);
            let found = finder.find(s, prev_length);

            if let Some(m) = pending.take() {
                if found.map_or(true, |f| f.length <= m.length) {
                    let base = s - 1;
                    out.emit_match(base, m)?;
                    for p in s + 1..base + m.length {
                        finder.insert(p);
                    }
                    s = base + m.length;
                    continue;
                }
                // s - 1 stays a literal
            }

            match found {
                Some(f) if self.lazy && f.length < self.nice_length && s + 1 < src.len() => {
                    pending = Some(f);
                    s += 1;
                }
                Some(f) => {
                    out.emit_match(s, f)?;
                    for p in s + 1..s + f.length {
                        finder.insert(p);
                    }
                    s += f.length;
                }
                None => s += 1,
            }
        }
        debug_assert!(pending.is_none());

        out.finish()
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Compress returns the QFS encoded form of `src`, using default settings.
///
/// See [`Encoder::compress`] for when the input is returned unchanged.
pub fn compress(src: &[u8]) -> Result<Vec<u8>> {
    Encoder::new().compress(src)
}

/// Returns the largest block the encoder produces for `src_len` input bytes
pub fn max_compressed_len(src_len: usize) -> usize {
    src_len + OUTPUT_SLACK
}

/// Appends opcodes and literals to the output block, enforcing the size limit
struct Emitter<'a> {
    src: &'a [u8],
    dst: Vec<u8>,
    limit: usize,
    /// Start of the literals not yet written
    next_emit: usize,
}

impl<'a> Emitter<'a> {
    fn new(src: &'a [u8], limit: usize) -> Self {
        let mut dst = Vec::with_capacity(limit);
        dst.resize(HEADER_LEN, 0);
        Emitter {
            src,
            dst,
            limit,
            next_emit: 0,
        }
    }

    /// Write an opcode followed by its literals, taken from `next_emit`
    fn emit(&mut self, op: Opcode) -> Result<()> {
        let literals = op.literals();
        let n = op.control_len() + literals;
        if self.dst.len() + n > self.limit {
            return Err(Error::EncodeOverflow { limit: self.limit });
        }

        op.write(&mut self.dst);
        let at = self.dst.len();
        self.dst.resize(at + literals, 0);
        copy_bytes(&mut self.dst, at, self.src, self.next_emit, literals);
        self.next_emit += literals;
        Ok(())
    }

    /// Flush pending literals up to `end` in runs of 4 to 112 bytes,
    /// leaving fewer than 4 behind
    fn emit_literal_runs(&mut self, end: usize) -> Result<()> {
        while end - self.next_emit > MAX_EMBEDDED_LITERALS {
            let run = ((end - self.next_emit) & !3).min(MAX_LITERAL_RUN);
            self.emit(Opcode::Literals { length: run })?;
        }
        Ok(())
    }

    /// Emit the literals before `base`, then the match starting at `base`
    fn emit_match(&mut self, base: usize, m: Match) -> Result<()> {
        self.emit_literal_runs(base)?;
        let op = m.opcode.with_literals(base - self.next_emit);
        self.emit(op)?;
        self.next_emit += m.length;
        Ok(())
    }

    /// Flush the tail, write the stop opcode and patch the header
    fn finish(mut self) -> Result<Vec<u8>> {
        let end = self.src.len();
        self.emit_literal_runs(end)?;
        self.emit(Opcode::Stop {
            literals: end - self.next_emit,
        })?;

        Header {
            compressed_size: self.dst.len() as u32,
            uncompressed_size: end as u32,
        }
        .write(&mut self.dst);
        Ok(self.dst)
    }
}
