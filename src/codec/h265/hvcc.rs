use bytes::{Buf, Bytes};

use super::types::NalUnitType;
use crate::error::{Result, SeqParseError};

/// Length of the fixed part of the record, up to and including `numOfArrays`
pub const HVCC_HEADER_LEN: usize = 23;

/// HEVC Decoder Configuration Record (ISO/IEC 14496-15, 8.3.3.1)
///
/// Carried as codec private data by MP4 (`hvcC`) and Matroska. Only the
/// fields needed to locate parameter sets and size NAL length fields are
/// kept; the SPS itself remains the authoritative source for the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HevcDecoderConfigurationRecord {
    pub configuration_version: u8,
    pub general_profile_idc: u8,
    pub general_level_idc: u8,
    pub chroma_format_idc: u8,
    pub bit_depth_luma_minus8: u8,
    pub length_size_minus_one: u8,
    pub arrays: Vec<NaluArray>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaluArray {
    pub array_completeness: bool,
    pub nal_unit_type: NalUnitType,
    /// Complete NAL units, header included
    pub nalus: Vec<Bytes>,
}

impl HevcDecoderConfigurationRecord {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        ensure_remaining(buf, data.len(), HVCC_HEADER_LEN)?;

        let configuration_version = buf.get_u8();
        let general_profile_idc = buf.get_u8() & 0x1F;
        buf.advance(4 + 6); // compatibility flags, constraint indicator flags
        let general_level_idc = buf.get_u8();
        buf.advance(2 + 1); // min_spatial_segmentation_idc, parallelismType
        let chroma_format_idc = buf.get_u8() & 0x03;
        let bit_depth_luma_minus8 = buf.get_u8() & 0x07;
        buf.advance(1 + 2); // bitDepthChromaMinus8, avgFrameRate
        let length_size_minus_one = buf.get_u8() & 0x03;
        let num_of_arrays = buf.get_u8();

        let mut arrays = Vec::with_capacity(num_of_arrays as usize);
        for _ in 0..num_of_arrays {
            ensure_remaining(buf, data.len(), 3)?;
            let header = buf.get_u8();
            let num_nalus = buf.get_u16();

            let mut nalus = Vec::with_capacity(num_nalus as usize);
            for _ in 0..num_nalus {
                ensure_remaining(buf, data.len(), 2)?;
                let nal_unit_length = buf.get_u16() as usize;
                ensure_remaining(buf, data.len(), nal_unit_length)?;
                nalus.push(Bytes::copy_from_slice(&buf[..nal_unit_length]));
                buf.advance(nal_unit_length);
            }

            arrays.push(NaluArray {
                array_completeness: header & 0x80 != 0,
                nal_unit_type: NalUnitType::from(header & 0x3F),
                nalus,
            });
        }

        Ok(HevcDecoderConfigurationRecord {
            configuration_version,
            general_profile_idc,
            general_level_idc,
            chroma_format_idc,
            bit_depth_luma_minus8,
            length_size_minus_one,
            arrays,
        })
    }

    /// Width of the NAL length fields used by samples described by this record
    pub fn nal_size_field_width(&self) -> u8 {
        self.length_size_minus_one + 1
    }

    /// All NAL units of the given type, in record order
    pub fn nalus_of_type(&self, nal_unit_type: NalUnitType) -> impl Iterator<Item = &Bytes> + '_ {
        self.arrays
            .iter()
            .filter(move |array| array.nal_unit_type == nal_unit_type)
            .flat_map(|array| array.nalus.iter())
    }
}

fn ensure_remaining(buf: &[u8], total: usize, needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(SeqParseError::TruncatedNal {
            offset: total - buf.len(),
            declared: needed,
            available: buf.len(),
        });
    }
    Ok(())
}
