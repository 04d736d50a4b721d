#![doc(html_root_url = "https://docs.rs/seqparse/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # seqparse - HEVC Sequence Parameter Set Parser
//!
//! `seqparse` recovers the decoder configuration of an H.265/HEVC stream
//! (profile, tier, level, chroma format, bit depth and picture size) from
//! whatever stream data is at hand: an Annex B elementary stream fragment,
//! length-prefixed samples from a container, or an `hvcC` record.
//!
//! Input is treated as untrusted. Every read is bounds checked, every
//! exp-Golomb code is length limited, and no input can make the parser
//! panic, loop without bound or read outside the buffer it was given.
//!
//! ## Quick Start
//!
//! ```rust
//! use seqparse::SequenceParser;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut parser = SequenceParser::new();
//!
//! // data from the demuxer, with a 4-byte NAL length field
//! let packet = vec![0u8; 16];
//! let report = parser.parse_nals(&packet, 4)?;
//!
//! if report.succeeded() {
//!     println!("profile {} level {}", parser.sps.profile, parser.sps.level);
//! } else {
//!     for failure in &report.failures {
//!         println!("skipped unit at {}: {}", failure.offset, failure.error);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `codec`: H.265 NAL discovery, SPS decoding and the [`SequenceParser`]
//! - `config`: parser configuration from code, environment or file
//! - `error`: error type and result alias
//! - `utils`: bit-level reader and writer with exp-Golomb support
//!
//! Diagnostics go through the [`log`] facade; install any logger to see them.

/// Codec parsers
pub mod codec;

/// Configuration module
pub mod config;

/// Error types and utilities
pub mod error;

/// Common utilities and helper functions
pub mod utils;

pub use codec::h265::{ParseReport, SequenceParameterSetInfo, SequenceParser};
pub use error::{Result, SeqParseError};
