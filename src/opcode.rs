// Copyright 2024 Karpeles Lab Inc.
// QFS/RefPack compression as used by SimCity 4 DBPF archives
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Control codes of the QFS opcode stream.
//!
//! | first byte  | bytes | literals     | match length              | match distance                 |
//! |-------------|-------|--------------|---------------------------|--------------------------------|
//! | `0x00-0x7F` | 2     | `b0&3`       | `((b0>>2)&7)+3`           | `((b0>>5)<<8)+b1+1`            |
//! | `0x80-0xBF` | 3     | `(b1>>6)&3`  | `(b0&0x3F)+4`             | `(b1&0x3F)*256+b2+1`           |
//! | `0xC0-0xDF` | 4     | `b0&3`       | `((b0>>2)&3)*256+b3+5`    | `((b0&0x10)<<12)+256*b1+b2+1`  |
//! | `0xE0-0xFB` | 1     | `(b0&0x1F)*4+4` | -                      | -                              |
//! | `0xFC-0xFF` | 1     | `b0&3`       | -                         | -                              |
//!
//! Literal bytes follow the control bytes directly.

use crate::constants::*;
use crate::error::{Corruption, Error, Result};
use crate::header::Header;

/// One control code with its decoded fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// 2-byte match: length 3-10, distance up to 1024
    Short {
        literals: usize,
        length: usize,
        distance: usize,
    },
    /// 3-byte match: length 4-67, distance up to 16384
    Medium {
        literals: usize,
        length: usize,
        distance: usize,
    },
    /// 4-byte match: length 5-1028, distance up to 131072
    Long {
        literals: usize,
        length: usize,
        distance: usize,
    },
    /// Plain literal run, a multiple of 4 between 4 and 112
    Literals { length: usize },
    /// End of stream with 0-3 trailing literals
    Stop { literals: usize },
}

impl Opcode {
    /// Build the smallest match opcode able to carry `length` bytes at `distance`
    /// with `literals` (0-3) embedded literal bytes.
    ///
    /// Returns None when no opcode can encode the match.
    pub fn copy(literals: usize, length: usize, distance: usize) -> Option<Opcode> {
        if literals > MAX_EMBEDDED_LITERALS || distance == 0 {
            return None;
        }
        if (MIN_MATCH..=SHORT_MAX_LEN).contains(&length) && distance <= SHORT_MAX_DISTANCE {
            return Some(Opcode::Short {
                literals,
                length,
                distance,
            });
        }
        if (MEDIUM_MIN_LEN..=MEDIUM_MAX_LEN).contains(&length) && distance <= MEDIUM_MAX_DISTANCE {
            return Some(Opcode::Medium {
                literals,
                length,
                distance,
            });
        }
        if (LONG_MIN_LEN..=MAX_MATCH).contains(&length) && distance <= WINDOW_SIZE {
            return Some(Opcode::Long {
                literals,
                length,
                distance,
            });
        }
        None
    }

    /// Parse the opcode whose first byte is `src[offset]`
    pub fn parse(src: &[u8], offset: usize) -> Result<Opcode> {
        let b = match src.get(offset..) {
            Some(rest) if !rest.is_empty() => rest,
            _ => return Err(Corruption::TruncatedOpcode { offset }.into()),
        };
        let b0 = b[0];
        let need = control_len(b0);
        if b.len() < need {
            return Err(Corruption::TruncatedOpcode { offset }.into());
        }

        let op = if b0 < OP_MEDIUM {
            Opcode::Short {
                literals: (b0 & 3) as usize,
                length: ((b0 >> 2) & 7) as usize + 3,
                distance: (((b0 >> 5) as usize) << 8) + b[1] as usize + 1,
            }
        } else if b0 < OP_LONG {
            Opcode::Medium {
                literals: ((b[1] >> 6) & 3) as usize,
                length: (b0 & 0x3f) as usize + 4,
                distance: ((b[1] & 0x3f) as usize) * 256 + b[2] as usize + 1,
            }
        } else if b0 < OP_LITERALS {
            Opcode::Long {
                literals: (b0 & 3) as usize,
                length: (((b0 >> 2) & 3) as usize) * 256 + b[3] as usize + 5,
                distance: (((b0 & 0x10) as usize) << 12) + 256 * b[1] as usize + b[2] as usize + 1,
            }
        } else if b0 < OP_STOP {
            Opcode::Literals {
                length: ((b0 & 0x1f) as usize) * 4 + 4,
            }
        } else {
            Opcode::Stop {
                literals: (b0 & 3) as usize,
            }
        };

        Ok(op)
    }

    /// Same opcode carrying `n` embedded literals. Literal runs are unchanged.
    pub(crate) fn with_literals(self, n: usize) -> Opcode {
        match self {
            Opcode::Short {
                length, distance, ..
            } => Opcode::Short {
                literals: n,
                length,
                distance,
            },
            Opcode::Medium {
                length, distance, ..
            } => Opcode::Medium {
                literals: n,
                length,
                distance,
            },
            Opcode::Long {
                length, distance, ..
            } => Opcode::Long {
                literals: n,
                length,
                distance,
            },
            Opcode::Stop { .. } => Opcode::Stop { literals: n },
            Opcode::Literals { .. } => self,
        }
    }

    /// Number of control bytes, not counting literals
    pub fn control_len(&self) -> usize {
        match self {
            Opcode::Short { .. } => 2,
            Opcode::Medium { .. } => 3,
            Opcode::Long { .. } => 4,
            Opcode::Literals { .. } | Opcode::Stop { .. } => 1,
        }
    }

    /// Number of literal bytes following the control bytes
    pub fn literals(&self) -> usize {
        match *self {
            Opcode::Short { literals, .. }
            | Opcode::Medium { literals, .. }
            | Opcode::Long { literals, .. }
            | Opcode::Stop { literals } => literals,
            Opcode::Literals { length } => length,
        }
    }

    /// The (length, distance) back-reference, if this is a match opcode
    pub fn back_reference(&self) -> Option<(usize, usize)> {
        match *self {
            Opcode::Short {
                length, distance, ..
            }
            | Opcode::Medium {
                length, distance, ..
            }
            | Opcode::Long {
                length, distance, ..
            } => Some((length, distance)),
            Opcode::Literals { .. } | Opcode::Stop { .. } => None,
        }
    }

    /// Number of bytes this opcode adds to the decoded output
    pub fn output_len(&self) -> usize {
        self.literals() + self.back_reference().map_or(0, |(length, _)| length)
    }

    /// Append the control bytes to `dst`. Fields must be within the
    /// ranges of the variant, as produced by [`Opcode::copy`].
    pub(crate) fn write(&self, dst: &mut Vec<u8>) {
        match *self {
            Opcode::Short {
                literals,
                length,
                distance,
            } => {
                let o = distance - 1;
                dst.push((((o >> 8) << 5) | ((length - 3) << 2) | literals) as u8);
                dst.push(o as u8);
            }
            Opcode::Medium {
                literals,
                length,
                distance,
            } => {
                let o = distance - 1;
                dst.push(OP_MEDIUM | (length - 4) as u8);
                dst.push(((literals << 6) | (o >> 8)) as u8);
                dst.push(o as u8);
            }
            Opcode::Long {
                literals,
                length,
                distance,
            } => {
                let o = distance - 1;
                let l = length - 5;
                dst.push(OP_LONG | (((o >> 16) << 4) | ((l >> 8) << 2) | literals) as u8);
                dst.push((o >> 8) as u8);
                dst.push(o as u8);
                dst.push(l as u8);
            }
            Opcode::Literals { length } => {
                dst.push(OP_LITERALS | (length / 4 - 1) as u8);
            }
            Opcode::Stop { literals } => {
                dst.push(OP_STOP | literals as u8);
            }
        }
    }
}

#[inline]
fn control_len(b0: u8) -> usize {
    if b0 < OP_MEDIUM {
        2
    } else if b0 < OP_LONG {
        3
    } else if b0 < OP_LITERALS {
        4
    } else {
        1
    }
}

/// Iterate over the opcodes of a compressed block.
///
/// Yields `(offset, opcode)` pairs, where `offset` is the position of the
/// opcode's first byte within `block`. Iteration ends after the stop opcode,
/// at the end of `block`, or after the first error.
///
/// ```
/// use qfs::opcode::{opcodes, Opcode};
///
/// let block = qfs::compress(b"abcabcabcabcabcabcabc").unwrap();
/// let ops: Vec<Opcode> = opcodes(&block).map(|r| r.unwrap().1).collect();
/// assert!(matches!(ops.last(), Some(Opcode::Stop { .. })));
/// ```
pub fn opcodes(block: &[u8]) -> Opcodes<'_> {
    Opcodes {
        block,
        offset: HEADER_LEN,
        state: match Header::parse(block) {
            Ok(_) => State::Running,
            Err(e) => State::Failed(Some(e)),
        },
    }
}

/// Iterator returned by [`opcodes`]
pub struct Opcodes<'a> {
    block: &'a [u8],
    offset: usize,
    state: State,
}

enum State {
    Running,
    Failed(Option<Error>),
    Done,
}

impl Iterator for Opcodes<'_> {
    type Item = Result<(usize, Opcode)>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            State::Done => return None,
            State::Failed(e) => {
                let e = e.take()?;
                return Some(Err(e));
            }
            State::Running => {}
        }

        if self.offset >= self.block.len() {
            self.state = State::Done;
            return None;
        }

        let offset = self.offset;
        let op = match Opcode::parse(self.block, offset) {
            Ok(op) => op,
            Err(e) => {
                self.state = State::Done;
                return Some(Err(e));
            }
        };

        let next = offset + op.control_len() + op.literals();
        if next > self.block.len() {
            self.state = State::Done;
            return Some(Err(Corruption::TruncatedLiterals {
                offset: offset + op.control_len(),
            }
            .into()));
        }

        self.offset = next;
        if matches!(op, Opcode::Stop { .. }) {
            self.state = State::Done;
        }
        Some(Ok((offset, op)))
    }
}
