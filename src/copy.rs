// Copyright 2024 Karpeles Lab Inc.
// QFS/RefPack compression as used by SimCity 4 DBPF archives
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Byte-at-a-time copies.
//!
//! QFS matches may overlap their own output: a distance of 1 and a length
//! of 50 repeats the previous byte fifty times. Only a strictly sequential
//! copy reproduces that, so every copy in the codec goes through here.
//! Callers validate ranges before calling.

/// Copy `length` bytes from `src[from..]` to `dst[to..]`.
#[inline]
pub(crate) fn copy_bytes(dst: &mut [u8], to: usize, src: &[u8], from: usize, length: usize) {
    for i in 0..length {
        dst[to + i] = src[from + i];
    }
}

/// Copy `length` bytes starting `distance` bytes behind `pos` to `pos`,
/// within the same buffer. Overlap repeats the pattern.
#[inline]
pub(crate) fn copy_match(buf: &mut [u8], pos: usize, distance: usize, length: usize) {
    let start = pos - distance;
    for i in 0..length {
        buf[pos + i] = buf[start + i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_bytes() {
        let src = b"abcdef";
        let mut dst = [0u8; 8];
        copy_bytes(&mut dst, 2, src, 1, 4);
        assert_eq!(&dst, b"\0\0bcde\0\0");
    }

    #[test]
    fn test_copy_match_distance_one_repeats_byte() {
        let mut buf = vec![0u8; 51];
        buf[0] = b'z';
        copy_match(&mut buf, 1, 1, 50);
        assert!(buf.iter().all(|&b| b == b'z'));
    }

    #[test]
    fn test_copy_match_repeats_pattern() {
        let mut buf = vec![0u8; 9];
        buf[..3].copy_from_slice(b"abc");
        copy_match(&mut buf, 3, 3, 6);
        assert_eq!(&buf, b"abcabcabc");
    }

    #[test]
    fn test_copy_match_partial_overlap() {
        let mut buf = vec![0u8; 7];
        buf[..2].copy_from_slice(b"xy");
        copy_match(&mut buf, 2, 2, 5);
        assert_eq!(&buf, b"xyxyxyx");
    }

    #[test]
    fn test_copy_match_no_overlap() {
        let mut buf = b"hello______".to_vec();
        copy_match(&mut buf, 6, 6, 5);
        assert_eq!(&buf, b"hello_hello");
    }
}
