//! # H.265/HEVC Sequence Parameter Set Parsing
//!
//! This module extracts the decoder configuration carried by HEVC Sequence
//! Parameter Sets from raw, possibly malformed stream data:
//!
//! - NAL unit discovery in Annex B (start code) and length-prefixed buffers
//! - Emulation prevention removal into a private scratch buffer
//! - `profile_tier_level` and SPS prefix decoding (profile, tier, level,
//!   chroma format, bit depth, picture size)
//! - Range Extensions profile identification
//! - `hvcC` decoder configuration records
//!
//! ## Example Usage
//!
//! ```rust
//! use seqparse::codec::h265::{ChromaFormat, SequenceParser};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // 1280x720 Main profile, level 3.1
//! let stream = [
//!     0x00, 0x00, 0x00, 0x01, 0x42, 0x01, 0x01, 0x01, 0x60, 0x00, 0x00, 0x03,
//!     0x00, 0x90, 0x00, 0x00, 0x03, 0x00, 0x00, 0x03, 0x00, 0x5d, 0xa0, 0x02,
//!     0x80, 0x80, 0x2d, 0x16, 0x59, 0x59, 0xa4, 0x93, 0x2b, 0xc0, 0x5a, 0x70,
//!     0x80, 0x00, 0x01, 0xf4, 0x80, 0x00, 0x3a, 0x98, 0x04,
//! ];
//!
//! let mut parser = SequenceParser::new();
//! let report = parser.parse_nals(&stream, 0)?;
//!
//! assert!(report.succeeded());
//! assert_eq!(parser.sps.profile, 1);
//! assert_eq!(parser.sps.level, 93);
//! assert_eq!(parser.sps.chroma_format, ChromaFormat::Yuv420);
//! assert_eq!(parser.sps.bit_depth, 8);
//! assert_eq!((parser.sps.width, parser.sps.height), (1280, 720));
//! # Ok(())
//! # }
//! ```
//!
//! Parsing never panics and never reads outside the supplied buffer. A unit
//! that cannot be decoded is reported in [`ParseReport::failures`] and the
//! scan continues with the next one.

/// `hvcC` decoder configuration record reader
pub mod hvcc;

/// NAL unit discovery and emulation prevention
pub mod nal;

/// Sequence parser keeping the decoded SPS result
pub mod parser;

/// SPS and profile_tier_level grammar
pub mod sps;

/// Type definitions for H.265/HEVC parameter sets
pub mod types;

#[cfg(test)]
mod tests;

pub use hvcc::HevcDecoderConfigurationRecord;
pub use nal::{add_emulation_prevention, remove_emulation_prevention, NalFraming, NalUnit, NalUnitHeader, NalUnits};
pub use parser::{NalFailure, ParseReport, SequenceParser, SharedSequenceParser};
pub use sps::ProfileTierLevel;
pub use types::{ChromaFormat, ConformanceWindow, NalUnitType, RextProfile, SequenceParameterSetInfo, Tier};
