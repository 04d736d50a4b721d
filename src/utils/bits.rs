use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, SeqParseError};

/// Largest number of leading zero bits accepted in an exp-Golomb prefix.
///
/// Anything longer cannot come from a conforming encoder and would only make
/// a corrupt stream cost more work to reject.
pub const MAX_GOLOMB_LEADING_ZEROS: u32 = 32;

/// A bounded bit-level reader for H.265 style bitstreams.
///
/// Implements the reading primitives used by the RBSP syntax:
/// - fixed width fields, most significant bit first (`u(n)`)
/// - single flags
/// - unsigned exponential Golomb codes (`ue(v)`)
/// - signed exponential Golomb codes (`se(v)`)
///
/// Every read checks the remaining length before touching the buffer and
/// never indexes past the end. A failed fixed-width read leaves the cursor
/// where it was.
///
/// Example:
/// ```
/// use seqparse::utils::BitReader;
///
/// let data = [0b10110011];
/// let mut reader = BitReader::new(&data);
///
/// assert_eq!(reader.read_flag().unwrap(), true);    // 1
/// assert_eq!(reader.read_bits(3).unwrap(), 0b011);  // 011
/// assert_eq!(reader.available_bits(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_offset: usize,
    bit_offset: u8,
}

impl<'a> BitReader<'a> {
    /// Creates a new BitReader positioned at the first bit of `data`
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    /// Total number of bits in the underlying buffer.
    pub fn bit_len(&self) -> usize {
        self.data.len() * 8
    }

    /// Number of bits consumed so far.
    pub fn position(&self) -> usize {
        self.byte_offset * 8 + self.bit_offset as usize
    }

    /// Returns number of bits available to read.
    pub fn available_bits(&self) -> usize {
        self.bit_len() - self.position()
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.bit_offset == 0
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let available = self.available_bits();
        if needed > available {
            return Err(SeqParseError::BitstreamExhausted { needed, available });
        }
        Ok(())
    }

    fn advance(&mut self, n: usize) {
        let position = self.position() + n;
        self.byte_offset = position / 8;
        self.bit_offset = (position % 8) as u8;
    }

    /// Reads a single bit. Returns true for 1, false for 0.
    pub fn read_flag(&mut self) -> Result<bool> {
        self.ensure(1)?;
        let bit = (self.data[self.byte_offset] >> (7 - self.bit_offset)) & 1;
        self.advance(1);
        Ok(bit == 1)
    }

    /// Reads `n` bits (at most 32) and returns them as a number.
    /// The bits are interpreted as big-endian.
    ///
    /// Reading zero bits is allowed and returns 0.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n > 32 {
            return Err(SeqParseError::InvalidBitCount(n));
        }
        Ok(self.read_bits_u64(n)? as u32)
    }

    /// Reads `n` bits (at most 64), for fields wider than a `u32`.
    pub fn read_bits_u64(&mut self, n: u32) -> Result<u64> {
        if n > 64 {
            return Err(SeqParseError::InvalidBitCount(n));
        }
        self.ensure(n as usize)?;

        let mut value = 0u64;
        let mut remaining = n;
        while remaining > 0 {
            let left_in_byte = 8 - self.bit_offset as u32;
            let take = remaining.min(left_in_byte);
            let byte = self.data[self.byte_offset] as u64;
            let bits = (byte >> (left_in_byte - take)) & ((1u64 << take) - 1);
            value = (value << take) | bits;
            self.advance(take as usize);
            remaining -= take;
        }

        Ok(value)
    }

    /// Reads an unsigned exponential Golomb code (ue(v)).
    ///
    /// Format:
    /// 1. M leading zeros followed by a 1
    /// 2. M more INFO bits
    /// 3. Value = 2^M + INFO - 1
    ///
    /// Example: "00110" (M=2, INFO=10)
    /// - Count zeros until 1: M=2
    /// - Read 2 more bits: INFO=10=2
    /// - Value = 2^2 + 2 - 1 = 5
    ///
    /// Fails with [`SeqParseError::BitstreamExhausted`] when the buffer ends
    /// before the code does, and with [`SeqParseError::MalformedCode`] when the
    /// prefix is longer than [`MAX_GOLOMB_LEADING_ZEROS`] or the value does
    /// not fit in a `u32`.
    pub fn read_ue(&mut self) -> Result<u32> {
        let (value, leading_zeros) = self.read_golomb()?;
        u32::try_from(value).map_err(|_| SeqParseError::MalformedCode { leading_zeros })
    }

    /// Reads a signed exponential Golomb code (se(v)).
    ///
    /// The mapping from the unsigned code k is `(-1)^(k+1) * ceil(k/2)`:
    /// odd k is positive, even k is negative, k=0 is 0.
    pub fn read_se(&mut self) -> Result<i32> {
        let (k, leading_zeros) = self.read_golomb()?;
        let magnitude = ((k + 1) >> 1) as i64;
        let value = if k & 1 == 1 { magnitude } else { -magnitude };
        i32::try_from(value).map_err(|_| SeqParseError::MalformedCode { leading_zeros })
    }

    fn read_golomb(&mut self) -> Result<(u64, u32)> {
        let mut leading_zeros = 0u32;
        while !self.read_flag()? {
            leading_zeros += 1;
            if leading_zeros > MAX_GOLOMB_LEADING_ZEROS {
                return Err(SeqParseError::MalformedCode { leading_zeros });
            }
        }

        let info = self.read_bits_u64(leading_zeros)?;
        Ok(((1u64 << leading_zeros) - 1 + info, leading_zeros))
    }

    /// Skips `n` bits in the stream.
    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.advance(n);
        Ok(())
    }

    /// Aligns reader to next byte boundary by skipping remaining bits in current byte.
    pub fn byte_align(&mut self) -> Result<()> {
        if self.bit_offset != 0 {
            self.skip_bits(8 - self.bit_offset as usize)?;
        }
        Ok(())
    }
}

/// Bit-level writer producing the layout [`BitReader`] consumes.
///
/// Used to assemble RBSP payloads, most notably in tests that need a
/// parameter set with specific field values.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    buffer: BytesMut,
    current: u8,
    bits_in_current: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits written so far.
    pub fn bit_len(&self) -> usize {
        self.buffer.len() * 8 + self.bits_in_current as usize
    }

    pub fn write_flag(&mut self, flag: bool) {
        self.current = (self.current << 1) | flag as u8;
        self.bits_in_current += 1;
        if self.bits_in_current == 8 {
            self.buffer.put_u8(self.current);
            self.current = 0;
            self.bits_in_current = 0;
        }
    }

    /// Writes the low `n` bits of `value` (at most 64), most significant first.
    pub fn write_bits(&mut self, value: u64, n: u32) -> Result<()> {
        if n > 64 {
            return Err(SeqParseError::InvalidBitCount(n));
        }
        for i in (0..n).rev() {
            self.write_flag((value >> i) & 1 == 1);
        }
        Ok(())
    }

    /// Writes `value` as an unsigned exp-Golomb code.
    pub fn write_ue(&mut self, value: u32) {
        self.write_golomb(value as u64);
    }

    /// Writes `value` as a signed exp-Golomb code.
    pub fn write_se(&mut self, value: i32) {
        let value = value as i64;
        let k = if value > 0 { 2 * value - 1 } else { -2 * value };
        self.write_golomb(k as u64);
    }

    fn write_golomb(&mut self, value: u64) {
        let code = value + 1;
        let len = 64 - code.leading_zeros();
        for _ in 0..len - 1 {
            self.write_flag(false);
        }
        for i in (0..len).rev() {
            self.write_flag((code >> i) & 1 == 1);
        }
    }

    /// Pads with zero bits up to the next byte boundary.
    pub fn byte_align(&mut self) {
        while self.bits_in_current != 0 {
            self.write_flag(false);
        }
    }

    /// Writes `rbsp_trailing_bits()`: a stop bit followed by alignment zeros.
    pub fn write_rbsp_trailing_bits(&mut self) {
        self.write_flag(true);
        self.byte_align();
    }

    /// Flushes any partial byte (zero padded) and returns the written bytes.
    pub fn finish(mut self) -> Bytes {
        self.byte_align();
        self.buffer.freeze()
    }
}
