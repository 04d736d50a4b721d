use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::types::NalUnitType;
use crate::error::{Result, SeqParseError};

/// Size of the HEVC NAL unit header in bytes
pub const NAL_HEADER_LEN: usize = 2;

const START_CODE: [u8; 3] = [0x00, 0x00, 0x01];

/// How NAL units are delimited inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NalFraming {
    /// Annex B byte stream, units separated by `00 00 01` / `00 00 00 01`
    #[default]
    AnnexB,
    /// Each unit preceded by a big-endian length field of the given width (1..=4 bytes)
    LengthPrefixed(u8),
}

impl NalFraming {
    /// Maps a container's NAL size field width to a framing mode.
    ///
    /// `0` selects start-code delimited input, `1..=4` length-prefixed input.
    pub fn from_size_field_width(width: u8) -> Result<Self> {
        match width {
            0 => Ok(NalFraming::AnnexB),
            1..=4 => Ok(NalFraming::LengthPrefixed(width)),
            _ => Err(SeqParseError::InvalidNalSizeWidth(width)),
        }
    }

    pub fn size_field_width(self) -> u8 {
        match self {
            NalFraming::AnnexB => 0,
            NalFraming::LengthPrefixed(width) => width,
        }
    }
}

/// The 2-byte HEVC NAL unit header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalUnitHeader {
    pub nal_unit_type: NalUnitType,
    pub nuh_layer_id: u8,
    pub nuh_temporal_id_plus1: u8,
}

impl NalUnitHeader {
    /// Parses the header at the start of `data`. `offset` is the position of
    /// `data` inside the caller's buffer and is only used for error reporting.
    pub fn parse(data: &[u8], offset: usize) -> Result<Self> {
        if data.len() < NAL_HEADER_LEN {
            return Err(SeqParseError::MalformedNal {
                offset,
                reason: "shorter than the nal unit header",
            });
        }
        if data[0] & 0x80 != 0 {
            return Err(SeqParseError::MalformedNal {
                offset,
                reason: "forbidden_zero_bit is set",
            });
        }

        Ok(NalUnitHeader {
            nal_unit_type: NalUnitType::from((data[0] >> 1) & 0x3F),
            nuh_layer_id: ((data[0] & 0x01) << 5) | (data[1] >> 3),
            nuh_temporal_id_plus1: data[1] & 0x07,
        })
    }
}

/// A NAL unit borrowed from the buffer it was found in
#[derive(Debug, Clone, Copy)]
pub struct NalUnit<'a> {
    /// Offset of the first header byte in the scanned buffer
    pub offset: usize,
    pub header: NalUnitHeader,
    /// Header and payload, still emulation-prevention encoded
    pub data: &'a [u8],
}

impl<'a> NalUnit<'a> {
    fn parse(data: &'a [u8], offset: usize) -> Result<Self> {
        let header = NalUnitHeader::parse(data, offset)?;
        Ok(NalUnit {
            offset,
            header,
            data,
        })
    }

    pub fn nal_unit_type(&self) -> NalUnitType {
        self.header.nal_unit_type
    }

    /// Bytes following the 2-byte header
    pub fn payload(&self) -> &'a [u8] {
        &self.data[NAL_HEADER_LEN..]
    }
}

/// Iterator over the NAL units of a buffer.
///
/// Yields an error for a unit that cannot be accepted and moves on to the
/// next one. In length-prefixed mode a length running past the end of the
/// buffer leaves no way to find the next unit, so iteration ends after the
/// [`SeqParseError::TruncatedNal`] it produces. A length width outside
/// 1..=4 yields a single [`SeqParseError::InvalidNalSizeWidth`].
#[derive(Debug, Clone)]
pub struct NalUnits<'a> {
    data: &'a [u8],
    framing: NalFraming,
    position: usize,
    started: bool,
}

impl<'a> NalUnits<'a> {
    pub fn new(data: &'a [u8], framing: NalFraming) -> Self {
        NalUnits {
            data,
            framing,
            position: 0,
            started: false,
        }
    }

    fn next_annex_b(&mut self) -> Option<Result<NalUnit<'a>>> {
        if !self.started {
            self.started = true;
            self.position = match find_start_code(self.data, 0) {
                Some(pos) => pos + START_CODE.len(),
                None => self.data.len(),
            };
        }

        loop {
            if self.position >= self.data.len() {
                return None;
            }

            let begin = self.position;
            let end = match find_start_code(self.data, begin) {
                Some(pos) => {
                    self.position = pos + START_CODE.len();
                    pos
                }
                None => {
                    self.position = self.data.len();
                    self.data.len()
                }
            };

            // trailing_zero_8bits and the leading zero of a 4-byte start code
            let mut trimmed = end;
            while trimmed > begin && self.data[trimmed - 1] == 0x00 {
                trimmed -= 1;
            }
            if trimmed == begin {
                continue;
            }

            return Some(NalUnit::parse(&self.data[begin..trimmed], begin));
        }
    }

    fn next_length_prefixed(&mut self, width: u8) -> Option<Result<NalUnit<'a>>> {
        // the variant can be built without from_size_field_width
        if !(1..=4).contains(&width) {
            if self.started {
                return None;
            }
            self.started = true;
            self.position = self.data.len();
            return Some(Err(SeqParseError::InvalidNalSizeWidth(width)));
        }
        let width = width as usize;

        loop {
            let offset = self.position;
            if offset >= self.data.len() {
                return None;
            }

            let remaining = self.data.len() - offset;
            if remaining < width {
                self.position = self.data.len();
                return Some(Err(SeqParseError::TruncatedNal {
                    offset,
                    declared: width,
                    available: remaining,
                }));
            }

            let declared = (&self.data[offset..offset + width]).get_uint(width) as usize;
            let begin = offset + width;
            let available = self.data.len() - begin;
            if declared > available {
                self.position = self.data.len();
                return Some(Err(SeqParseError::TruncatedNal {
                    offset,
                    declared,
                    available,
                }));
            }

            self.position = begin + declared;
            if declared == 0 {
                continue;
            }

            return Some(NalUnit::parse(&self.data[begin..begin + declared], begin));
        }
    }
}

impl<'a> Iterator for NalUnits<'a> {
    type Item = Result<NalUnit<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.framing {
            NalFraming::AnnexB => self.next_annex_b(),
            NalFraming::LengthPrefixed(width) => self.next_length_prefixed(width),
        }
    }
}

/// Position of the next `00 00 01` at or after `from`
fn find_start_code(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(START_CODE.len())
        .position(|window| window == START_CODE)
        .map(|pos| pos + from)
}

/// Removes emulation prevention bytes, writing the RBSP into `out`.
///
/// Every `0x03` that directly follows two zero bytes of the output is
/// dropped. `out` is cleared first so a scratch buffer can be reused across
/// calls.
///
/// # Arguments
///
/// * `data` - NAL unit bytes with emulation prevention, never modified
/// * `out` - Receives the RBSP
pub fn remove_emulation_prevention(data: &[u8], out: &mut BytesMut) {
    out.clear();
    out.reserve(data.len());

    let mut zeros = 0;
    for &byte in data {
        if zeros >= 2 && byte == 0x03 {
            zeros = 0;
            continue;
        }
        out.put_u8(byte);
        zeros = if byte == 0x00 { zeros + 1 } else { 0 };
    }
}

/// Inserts emulation prevention bytes so `rbsp` can be carried in a NAL unit.
pub fn add_emulation_prevention(rbsp: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(rbsp.len() + rbsp.len() / 2);

    let mut zeros = 0;
    for &byte in rbsp {
        if zeros >= 2 && byte <= 0x03 {
            out.put_u8(0x03);
            zeros = 0;
        }
        out.put_u8(byte);
        zeros = if byte == 0x00 { zeros + 1 } else { 0 };
    }
    if rbsp.last() == Some(&0x00) {
        out.put_u8(0x03);
    }

    out.freeze()
}
