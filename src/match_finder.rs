// Copyright 2024 Karpeles Lab Inc.
// QFS/RefPack compression as used by SimCity 4 DBPF archives
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Hash-chain match finder.
//!
//! Every position with at least 3 bytes left is hashed on its 3-byte prefix.
//! `head` maps a hash to the latest position seen with it, and `prev` links
//! each position to the previous one sharing its hash, so walking the chain
//! visits candidates from nearest to farthest.

use crate::constants::*;
use crate::opcode::Opcode;

const NIL: u32 = u32::MAX;

/// Smallest and largest hash table, in bits
const MIN_HASH_BITS: u32 = 8;
const MAX_HASH_BITS: u32 = 16;

/// A back-reference the encoder can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Match {
    pub length: usize,
    pub distance: usize,
    /// Smallest opcode able to carry the match, without literals
    pub opcode: Opcode,
}

pub(crate) struct MatchFinder<'a> {
    src: &'a [u8],
    head: Vec<u32>,
    prev: Vec<u32>,
    prev_mask: usize,
    hash_bits: u32,
    max_chain: usize,
    nice_length: usize,
    good_length: usize,
}

impl<'a> MatchFinder<'a> {
    pub fn new(src: &'a [u8], max_chain: usize, nice_length: usize, good_length: usize) -> Self {
        // Size the tables from the input instead of always paying for 64K heads
        let hash_bits = src
            .len()
            .next_power_of_two()
            .trailing_zeros()
            .clamp(MIN_HASH_BITS, MAX_HASH_BITS);
        let prev_len = src.len().min(WINDOW_SIZE).next_power_of_two();

        MatchFinder {
            src,
            head: vec![NIL; 1 << hash_bits],
            prev: vec![NIL; prev_len],
            prev_mask: prev_len - 1,
            hash_bits,
            max_chain: max_chain.max(1),
            nice_length,
            good_length,
        }
    }

    /// Link `pos` into its hash chain. Returns the previous chain head.
    #[inline]
    pub fn insert(&mut self, pos: usize) -> u32 {
        if pos + MIN_MATCH > self.src.len() {
            return NIL;
        }
        let h = hash3(load24(self.src, pos), self.hash_bits) as usize;
        let older = self.head[h];
        self.prev[pos & self.prev_mask] = older;
        self.head[h] = pos as u32;
        older
    }

    /// Insert `pos` and search its chain for the longest encodable match.
    ///
    /// `prev_length` is the length of a match already pending at `pos - 1`;
    /// a long one shortens the search.
    pub fn find(&mut self, pos: usize, prev_length: usize) -> Option<Match> {
        let mut candidate = self.insert(pos);
        if candidate == NIL {
            return None;
        }

        let max_len = (self.src.len() - pos).min(MAX_MATCH);
        let mut budget = self.max_chain;
        if prev_length >= self.good_length {
            budget = (budget >> 2).max(1);
        }

        let mut best: Option<Match> = None;
        let mut best_len = MIN_MATCH - 1;

        while candidate != NIL && budget > 0 {
            let c = candidate as usize;
            let distance = pos - c;
            // Stay strictly inside the window so masked links never alias
            if distance >= WINDOW_SIZE {
                break;
            }
            budget -= 1;

            if self.src[c + best_len] == self.src[pos + best_len] {
                let length = match_len(self.src, c, pos, max_len);
                if length > best_len {
                    if let Some(opcode) = Opcode::copy(0, length, distance) {
                        best_len = length;
                        best = Some(Match {
                            length,
                            distance,
                            opcode,
                        });
                        if length >= self.nice_length || length == max_len {
                            break;
                        }
                    }
                }
            }

            let next = self.prev[c & self.prev_mask];
            if next == NIL || next as usize >= c {
                break;
            }
            candidate = next;
        }

        best
    }
}

/// Hash function for 3 bytes
#[inline]
fn hash3(u: u32, h: u32) -> u32 {
    const PRIME_3_BYTES: u32 = 506832829;
    ((u << 8).wrapping_mul(PRIME_3_BYTES)) >> ((32 - h) & 31)
}

/// Load 3 bytes as a little-endian u32
#[inline]
fn load24(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], 0])
}

/// Load a u64 from the slice at the given offset
#[inline]
fn load64(data: &[u8], offset: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(b)
}

/// Length of the common run of `src[a..]` and `src[b..]`, at most `max`.
/// Requires `a < b` and `b + max <= src.len()`.
#[inline]
fn match_len(src: &[u8], a: usize, b: usize, max: usize) -> usize {
    let mut n = 0;
    while n + 8 <= max {
        let diff = load64(src, a + n) ^ load64(src, b + n);
        if diff != 0 {
            return n + (diff.trailing_zeros() / 8) as usize;
        }
        n += 8;
    }
    while n < max && src[a + n] == src[b + n] {
        n += 1;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finder(src: &[u8]) -> MatchFinder<'_> {
        MatchFinder::new(src, 64, MAX_MATCH, MAX_MATCH)
    }

    #[test]
    fn test_match_len() {
        let src = b"abcdefgh_abcdefgh_abcdefgX";
        assert_eq!(match_len(src, 0, 9, 17), 16);
        assert_eq!(match_len(src, 9, 18, 8), 7);
        assert_eq!(match_len(src, 0, 1, 10), 0);
    }

    #[test]
    fn test_match_len_overlapping_run() {
        let src = [7u8; 40];
        assert_eq!(match_len(&src, 0, 1, 39), 39);
    }

    #[test]
    fn test_no_match_on_unique_data() {
        let src: Vec<u8> = (0..64).collect();
        let mut f = finder(&src);
        for pos in 0..src.len() {
            assert_eq!(f.find(pos, 0), None);
        }
    }

    #[test]
    fn test_finds_repeat() {
        let src = b"0123456789abcdef0123456789";
        let mut f = finder(src);
        for pos in 0..16 {
            f.insert(pos);
        }
        let m = f.find(16, 0).unwrap();
        assert_eq!(m.distance, 16);
        assert_eq!(m.length, 10);
        assert!(matches!(m.opcode, Opcode::Short { .. }));
    }

    #[test]
    fn test_prefers_longer_farther_match() {
        // "abcX" near, "abcdefgh" far
        let src = b"abcdefgh....abcX....abcdefgh";
        let mut f = finder(src);
        for pos in 0..20 {
            f.insert(pos);
        }
        let m = f.find(20, 0).unwrap();
        assert_eq!(m.distance, 20);
        assert_eq!(m.length, 8);
    }

    #[test]
    fn test_skips_unencodable_three_byte_match() {
        let mut src = vec![0u8; 2000];
        for (i, b) in src.iter_mut().enumerate() {
            *b = (i % 251) as u8 ^ 0x5a;
        }
        src[0..3].copy_from_slice(b"xyz");
        src[1500..1503].copy_from_slice(b"xyz");
        let mut f = finder(&src);
        for pos in 0..1500 {
            f.insert(pos);
        }
        // distance 1500 for a 3-byte match has no opcode
        let m = f.find(1500, 0);
        assert!(m.map_or(true, |m| m.distance <= SHORT_MAX_DISTANCE || m.length > 3));
    }

    #[test]
    fn test_match_capped_at_max() {
        let src = vec![b'q'; 3000];
        let mut f = finder(&src);
        f.insert(0);
        let m = f.find(1, 0).unwrap();
        assert_eq!(m.length, MAX_MATCH);
        assert_eq!(m.distance, 1);
        assert!(matches!(m.opcode, Opcode::Long { .. }));
    }

    #[test]
    fn test_match_capped_at_input_end() {
        let src = b"abcdabcdab";
        let mut f = finder(src);
        for pos in 0..4 {
            f.insert(pos);
        }
        let m = f.find(4, 0).unwrap();
        assert_eq!(m.length, 6);
        assert_eq!(m.distance, 4);
    }

    #[test]
    fn test_tail_positions_not_indexed() {
        let src = b"abcab";
        let mut f = finder(src);
        assert_eq!(f.insert(3), NIL);
        assert_eq!(f.insert(4), NIL);
    }

    #[test]
    fn test_table_sizes_follow_input() {
        let small = vec![0u8; 100];
        let f = MatchFinder::new(&small, 8, 32, 8);
        assert_eq!(f.head.len(), 1 << MIN_HASH_BITS);
        assert_eq!(f.prev.len(), 128);

        let large = vec![0u8; WINDOW_SIZE * 2];
        let f = MatchFinder::new(&large, 8, 32, 8);
        assert_eq!(f.head.len(), 1 << MAX_HASH_BITS);
        assert_eq!(f.prev.len(), WINDOW_SIZE);
    }
}
