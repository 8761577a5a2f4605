// Copyright 2024 Karpeles Lab Inc.
// QFS/RefPack compression as used by SimCity 4 DBPF archives
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Concurrent compression support using Rayon

#[cfg(feature = "concurrent")]
use rayon::prelude::*;

#[cfg(feature = "concurrent")]
use crate::decode::Decoder;
#[cfg(feature = "concurrent")]
use crate::encode::Encoder;
#[cfg(feature = "concurrent")]
use crate::error::Result;

/// Compress many independent entries in parallel
///
/// Each entry is encoded on its own with its own tables, so the results are
/// identical to calling [`Encoder::compress`] on each entry in turn. Results
/// keep the order of `entries`.
///
/// # Example
///
/// ```ignore
/// use qfs::{compress_batch, decompress_batch, Encoder};
///
/// let entries: Vec<Vec<u8>> = (0..16).map(|i| vec![i as u8; 4096]).collect();
/// let compressed = compress_batch(&Encoder::new(), &entries);
/// let restored = decompress_batch(&qfs::Decoder::new(), &compressed);
/// ```
#[cfg(feature = "concurrent")]
pub fn compress_batch<T>(encoder: &Encoder, entries: &[T]) -> Vec<Result<Vec<u8>>>
where
    T: AsRef<[u8]> + Sync,
{
    entries
        .par_iter()
        .map(|entry| encoder.compress(entry.as_ref()))
        .collect()
}

/// Decompress many independent entries in parallel
///
/// Entries that are not QFS compressed are returned unchanged, exactly as
/// [`Decoder::decompress`] does. Results keep the order of `entries`.
#[cfg(feature = "concurrent")]
pub fn decompress_batch<T>(decoder: &Decoder, entries: &[T]) -> Vec<Result<Vec<u8>>>
where
    T: AsRef<[u8]> + Sync,
{
    entries
        .par_iter()
        .map(|entry| decoder.decompress(entry.as_ref()))
        .collect()
}
