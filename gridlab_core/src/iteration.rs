//! Compressed iteration pages.
//!
//! The engine serves simulation history in pages of [`PAGE_SIZE`] iterations.
//! Each page travels as text:
//!
//! ```text
//! base64( deflate( UTF-8 JSON [[[cell, ...], ...row], ...iteration] ) )
//! ```
//!
//! The engine frames the deflate stream as gzip; zlib and raw deflate framings
//! from other revisions are detected from the header and accepted too.

use crate::error::DecodeError;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use flate2::{Compression, Decompress, FlushDecompress, Status};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};
use tracing::debug;

/// Iterations per page.
pub const PAGE_SIZE: u64 = 1000;

/// Output growth step while inflating.
const INFLATE_CHUNK: usize = 64 * 1024;

/// Standard alphabet; padding is optional on input.
const WIRE_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// One grid snapshot: rows of packed cell values.
pub type Snapshot = Vec<Vec<i64>>;

// ============================================================================
// PAGINATION
// ============================================================================

/// User-facing, 1-based page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageNumber(u64);

/// Wire-level, 0-based page index as requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageIndex(pub u64);

impl PageNumber {
    /// Returns `None` for page 0.
    pub fn new(number: u64) -> Option<Self> {
        (number > 0).then_some(Self(number))
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// The only place a user-facing page number becomes a wire index.
    pub fn to_wire(self) -> PageIndex {
        PageIndex(self.0 - 1)
    }
}

impl PageIndex {
    /// The only place a wire index becomes a user-facing page number.
    pub fn to_display(self) -> PageNumber {
        PageNumber(self.0.saturating_add(1))
    }

    /// Page holding the given global iteration number.
    pub fn containing(iteration: u64) -> Self {
        Self(iteration / PAGE_SIZE)
    }

    /// Global iteration number of the first snapshot on this page.
    pub fn first_iteration(&self) -> u64 {
        self.0 * PAGE_SIZE
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of pages needed for `snapshots` iterations.
pub fn page_count(snapshots: u64) -> u64 {
    snapshots.div_ceil(PAGE_SIZE)
}

// ============================================================================
// FRAMING
// ============================================================================

/// Container around the deflate stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    #[default]
    Gzip,
    Zlib,
    Raw,
}

impl Framing {
    /// Sniffs the framing from the first bytes of a stream.
    pub fn detect(bytes: &[u8]) -> Self {
        match bytes {
            [0x1f, 0x8b, ..] => Framing::Gzip,
            [cmf, flg, ..] if cmf & 0x0f == 8 && cmf >> 4 <= 7 && (u16::from(*cmf) << 8 | u16::from(*flg)) % 31 == 0 => {
                Framing::Zlib
            }
            _ => Framing::Raw,
        }
    }

    fn inflate(&self, bytes: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Framing::Gzip => {
                let mut out = Vec::with_capacity(bytes.len() * 4);
                GzDecoder::new(bytes).read_to_end(&mut out)?;
                Ok(out)
            }
            Framing::Zlib => inflate_stream(bytes, true),
            Framing::Raw => inflate_stream(bytes, false),
        }
    }
}

/// Inflates a zlib or raw deflate stream, failing on a missing stream end.
fn inflate_stream(bytes: &[u8], zlib_header: bool) -> io::Result<Vec<u8>> {
    let mut inflater = Decompress::new(zlib_header);
    let mut out = Vec::with_capacity(bytes.len() * 4);

    loop {
        if out.len() == out.capacity() {
            out.reserve(INFLATE_CHUNK);
        }
        let before = (inflater.total_in(), inflater.total_out());
        let input = &bytes[inflater.total_in() as usize..];
        let status = inflater
            .decompress_vec(input, &mut out, FlushDecompress::None)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if matches!(status, Status::StreamEnd) {
            return Ok(out);
        }
        if (inflater.total_in(), inflater.total_out()) == before {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "deflate stream ended before its final block",
            ));
        }
    }
}

// ============================================================================
// DECODE / ENCODE
// ============================================================================

/// Decodes one compressed page into its snapshots.
///
/// An absent, empty or whitespace-only blob is "no data yet" and yields an
/// empty sequence. Any present payload that cannot be decoded is an error.
/// Snapshot shapes are trusted; see [`IterationPage::from_snapshots`].
pub fn decode_iteration_page(blob: Option<&str>) -> Result<Vec<Snapshot>, DecodeError> {
    let Some(text) = blob.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(Vec::new());
    };

    let compressed = WIRE_BASE64.decode(text)?;
    let framing = Framing::detect(&compressed);
    let inflated = framing.inflate(&compressed).map_err(DecodeError::Inflate)?;
    let json = String::from_utf8(inflated)?;
    let snapshots: Vec<Snapshot> = serde_json::from_str(&json)?;

    debug!(
        "Decoded page: {} bytes -> {} bytes ({:?}), {} iterations",
        compressed.len(),
        json.len(),
        framing,
        snapshots.len()
    );
    Ok(snapshots)
}

/// Encodes snapshots the way the engine does.
pub fn encode_iteration_page(snapshots: &[Snapshot], framing: Framing) -> io::Result<String> {
    let json = serde_json::to_vec(snapshots)?;
    let compressed = match framing {
        Framing::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&json)?;
            encoder.finish()?
        }
        Framing::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&json)?;
            encoder.finish()?
        }
        Framing::Raw => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&json)?;
            encoder.finish()?
        }
    };
    Ok(WIRE_BASE64.encode(compressed))
}

// ============================================================================
// VALIDATED PAGE
// ============================================================================

/// A decoded page whose snapshots are all non-empty rectangles.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationPage {
    pub index: PageIndex,
    snapshots: Vec<Snapshot>,
}

impl IterationPage {
    /// Wraps snapshots after checking their shape.
    pub fn from_snapshots(index: PageIndex, snapshots: Vec<Snapshot>) -> Result<Self, DecodeError> {
        for (offset, snapshot) in snapshots.iter().enumerate() {
            let iteration = index.first_iteration() as usize + offset;
            let Some(first) = snapshot.first() else {
                return Err(DecodeError::shape(iteration, "no rows"));
            };
            if first.is_empty() {
                return Err(DecodeError::shape(iteration, "no columns"));
            }
            if let Some(row) = snapshot.iter().position(|r| r.len() != first.len()) {
                return Err(DecodeError::shape(
                    iteration,
                    format!("row {} has {} cells, expected {}", row, snapshot[row].len(), first.len()),
                ));
            }
        }
        Ok(Self { index, snapshots })
    }

    /// Decodes and validates a page blob.
    pub fn decode(index: PageIndex, blob: Option<&str>) -> Result<Self, DecodeError> {
        Self::from_snapshots(index, decode_iteration_page(blob)?)
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Global iteration number of the snapshot at `offset`.
    pub fn iteration_number(&self, offset: usize) -> u64 {
        self.index.first_iteration() + offset as u64
    }

    /// Snapshots paired with their global iteration numbers.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Snapshot)> {
        self.snapshots
            .iter()
            .enumerate()
            .map(move |(offset, s)| (self.iteration_number(offset), s))
    }
}
