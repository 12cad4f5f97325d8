//! Compression layer (§4.2).
//!
//! Two tags: `none` (identity) and `br` (Brotli). Decompression is bounded
//! by a caller-supplied ceiling; the decompressor aborts rather than ever
//! materializing an output larger than that ceiling.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{err, ErrorKind, SdlpError};

/// The closed set of supported compression tags.
///
/// Unlike the reference CLI, which accepts `gz`/`zstd` flags it never
/// implements, this enum has no variant for them: an unrecognized tag in
/// incoming metadata JSON fails to deserialize at all, which `verify_link`
/// turns into `E_INVALID_STRUCTURE` before compression is ever touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionTag {
    None,
    Br,
}

impl CompressionTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Br => "br",
        }
    }
}

/// Compress `bytes` under `tag`.
pub fn compress(bytes: &[u8], tag: CompressionTag) -> Result<Vec<u8>, SdlpError> {
    match tag {
        CompressionTag::None => Ok(bytes.to_vec()),
        CompressionTag::Br => {
            let mut out = Vec::new();
            {
                let mut writer =
                    brotli::CompressorWriter::new(&mut out, 4096, 9, 22);
                writer.write_all(bytes).map_err(|e| {
                    err(ErrorKind::PayloadDecompressionFailed)
                        .with_context("algorithm", "br")
                        .with_context("reason", e.to_string())
                })?;
            }
            Ok(out)
        }
    }
}

/// Decompress `bytes` under `tag`, aborting if the produced size would
/// exceed `max_out`.
pub fn decompress(bytes: &[u8], tag: CompressionTag, max_out: u64) -> Result<Vec<u8>, SdlpError> {
    match tag {
        CompressionTag::None => {
            if bytes.len() as u64 > max_out {
                return Err(size_exceeded(tag, bytes.len() as u64, max_out));
            }
            Ok(bytes.to_vec())
        }
        CompressionTag::Br => {
            let mut reader = brotli::Decompressor::new(bytes, 4096);
            let mut out = Vec::new();
            let mut chunk = [0u8; 8192];
            loop {
                let n = reader.read(&mut chunk).map_err(|e| {
                    err(ErrorKind::PayloadDecompressionFailed)
                        .with_context("algorithm", tag.as_str())
                        .with_context("reason", e.to_string())
                })?;
                if n == 0 {
                    break;
                }
                out.extend_from_slice(&chunk[..n]);
                if out.len() as u64 > max_out {
                    return Err(size_exceeded(tag, out.len() as u64, max_out));
                }
            }
            Ok(out)
        }
    }
}

fn size_exceeded(tag: CompressionTag, size: u64, max_out: u64) -> SdlpError {
    err(ErrorKind::PayloadDecompressionFailed)
        .with_context("algorithm", tag.as_str())
        .with_context("reason", "decompressed size exceeds max_payload_size")
        .with_context("size", size)
        .with_context("max", max_out)
}
