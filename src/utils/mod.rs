//! # Utility Functions and Types
//!
//! Bit-level reading and writing shared by the codec parsers.
//!
//! ```rust
//! use seqparse::utils::{BitReader, BitWriter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut writer = BitWriter::new();
//! writer.write_bits(0b101, 3)?;
//! writer.write_ue(5);
//! let data = writer.finish();
//!
//! let mut reader = BitReader::new(&data);
//! assert_eq!(reader.read_bits(3)?, 0b101);
//! assert_eq!(reader.read_ue()?, 5);
//! # Ok(())
//! # }
//! ```

/// Bitstream reading and writing utilities
pub mod bits;

pub use bits::*;
