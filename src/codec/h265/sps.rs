use super::types::{ChromaFormat, ConformanceWindow, SequenceParameterSetInfo, Tier};
use crate::error::{Result, SeqParseError};
use crate::utils::BitReader;

/// `general_profile_idc` of the Range Extensions profiles
pub const RANGE_EXTENSIONS_PROFILE_IDC: u8 = 4;

/// Highest luma bit depth the result models (bit_depth_luma_minus8 of 8)
const MAX_BIT_DEPTH_MINUS8: u32 = 8;

/// Width of the constraint block following the four source flags:
/// 43 reserved/constraint bits plus `general_inbld_flag`.
const CONSTRAINT_BLOCK_BITS: u32 = 44;

/// Number of Range Extensions constraint flags at the top of the block.
const REXT_CONSTRAINT_FLAGS: u32 = 9;

/// General profile, tier and level information from `profile_tier_level()`
///
/// Sub-layer profile data is consumed to keep the reader in sync but only the
/// sub-layer levels are retained.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileTierLevel {
    pub profile_space: u8,
    pub tier: Tier,
    pub profile_idc: u8,
    pub profile_compatibility_flags: u32,
    pub progressive_source_flag: bool,
    pub interlaced_source_flag: bool,
    pub non_packed_constraint_flag: bool,
    pub frame_only_constraint_flag: bool,
    /// The 44 bits after the four source flags, right aligned
    pub constraint_flags: u64,
    pub level_idc: u8,
    pub sub_layer_level_idcs: Vec<Option<u8>>,
}

impl ProfileTierLevel {
    /// Parses `profile_tier_level(1, max_sub_layers_minus1)`.
    pub fn parse(reader: &mut BitReader, max_sub_layers_minus1: u8) -> Result<Self> {
        let mut ptl = ProfileTierLevel {
            profile_space: reader.read_bits(2)? as u8,
            tier: if reader.read_flag()? { Tier::High } else { Tier::Main },
            profile_idc: reader.read_bits(5)? as u8,
            profile_compatibility_flags: reader.read_bits(32)?,
            progressive_source_flag: reader.read_flag()?,
            interlaced_source_flag: reader.read_flag()?,
            non_packed_constraint_flag: reader.read_flag()?,
            frame_only_constraint_flag: reader.read_flag()?,
            constraint_flags: reader.read_bits_u64(CONSTRAINT_BLOCK_BITS)?,
            level_idc: reader.read_bits(8)? as u8,
            sub_layer_level_idcs: Vec::with_capacity(max_sub_layers_minus1 as usize),
        };

        let sub_layers = max_sub_layers_minus1 as usize;
        let mut profile_present = Vec::with_capacity(sub_layers);
        let mut level_present = Vec::with_capacity(sub_layers);
        for _ in 0..sub_layers {
            profile_present.push(reader.read_flag()?);
            level_present.push(reader.read_flag()?);
        }

        // reserved_zero_2bits pad the flag pairs out to 8 sub-layers
        if sub_layers > 0 {
            for _ in sub_layers..8 {
                reader.skip_bits(2)?;
            }
        }

        for i in 0..sub_layers {
            if profile_present[i] {
                reader.skip_bits(
                    2 // sub_layer_profile_space
                    + 1 // sub_layer_tier_flag
                    + 5 // sub_layer_profile_idc
                    + 32 // sub_layer_profile_compatibility_flag[32]
                    + 4 // progressive, interlaced, non_packed, frame_only
                    + 43 // sub_layer_reserved_zero_43bits
                    + 1, // sub_layer_inbld_flag
                )?;
            }
            let level = if level_present[i] {
                Some(reader.read_bits(8)? as u8)
            } else {
                None
            };
            ptl.sub_layer_level_idcs.push(level);
        }

        Ok(ptl)
    }

    /// `general_profile_compatibility_flag[j]`
    pub fn is_compatible_with(&self, profile_idc: u8) -> bool {
        profile_idc < 32 && (self.profile_compatibility_flags >> (31 - profile_idc)) & 1 == 1
    }

    /// The 9 Range Extensions constraint flags, or 0 for other profiles.
    pub fn rext_constraint_flags(&self) -> u16 {
        if self.profile_idc != RANGE_EXTENSIONS_PROFILE_IDC
            && !self.is_compatible_with(RANGE_EXTENSIONS_PROFILE_IDC)
        {
            return 0;
        }
        (self.constraint_flags >> (CONSTRAINT_BLOCK_BITS - REXT_CONSTRAINT_FLAGS)) as u16 & 0x1FF
    }
}

/// Decodes the leading fields of `seq_parameter_set_rbsp()`.
///
/// `rbsp` is the NAL payload after the 2-byte header with emulation
/// prevention already removed. Decoding stops after
/// `bit_depth_chroma_minus8`; everything the result needs is known by then.
pub fn parse_sps(rbsp: &[u8]) -> Result<SequenceParameterSetInfo> {
    let mut reader = BitReader::new(rbsp);

    let vps_id = reader.read_bits(4)? as u8;
    let max_sub_layers_minus1 = reader.read_bits(3)? as u8;
    let _temporal_id_nesting_flag = reader.read_flag()?;

    let ptl = ProfileTierLevel::parse(&mut reader, max_sub_layers_minus1)?;

    let sps_id = reader.read_ue()?;

    let chroma_format_idc = reader.read_ue()?;
    let chroma_format = ChromaFormat::from_idc(chroma_format_idc).ok_or(
        SeqParseError::UnsupportedValue {
            field: "chroma_format_idc",
            value: chroma_format_idc,
        },
    )?;
    if chroma_format == ChromaFormat::Yuv444 {
        let _separate_colour_plane_flag = reader.read_flag()?;
    }

    let width = reader.read_ue()?;
    let height = reader.read_ue()?;

    let conformance_window = if reader.read_flag()? {
        Some(ConformanceWindow {
            left_offset: reader.read_ue()?,
            right_offset: reader.read_ue()?,
            top_offset: reader.read_ue()?,
            bottom_offset: reader.read_ue()?,
        })
    } else {
        None
    };

    let bit_depth_luma_minus8 = reader.read_ue()?;
    if bit_depth_luma_minus8 > MAX_BIT_DEPTH_MINUS8 {
        return Err(SeqParseError::UnsupportedValue {
            field: "bit_depth_luma_minus8",
            value: bit_depth_luma_minus8,
        });
    }
    let _bit_depth_chroma_minus8 = reader.read_ue()?;

    Ok(SequenceParameterSetInfo {
        valid: true,
        profile: ptl.profile_idc,
        rext_profile: ptl.rext_constraint_flags(),
        level: ptl.level_idc,
        chroma_format,
        bit_depth: bit_depth_luma_minus8 as u8 + 8,
        vps_id,
        sps_id,
        max_sub_layers: max_sub_layers_minus1 + 1,
        profile_space: ptl.profile_space,
        tier: ptl.tier,
        profile_compatibility_flags: ptl.profile_compatibility_flags,
        width,
        height,
        conformance_window,
    })
}
