// seqparse/src/codec/h265/types.rs

/// HEVC NAL unit types (ITU-T H.265 Table 7-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NalUnitType {
    TrailN,
    TrailR,
    TsaN,
    TsaR,
    StsaN,
    StsaR,
    RadlN,
    RadlR,
    RaslN,
    RaslR,
    BlaWLp,
    BlaWRadl,
    BlaNLp,
    IdrWRadl,
    IdrNLp,
    CraNut,
    /// Video Parameter Set
    Vps,
    /// Sequence Parameter Set
    Sps,
    /// Picture Parameter Set
    Pps,
    Aud,
    Eos,
    Eob,
    Fd,
    PrefixSei,
    SuffixSei,
    /// Reserved VCL (10..=15, 22..=31) and non-VCL (41..=47) codes
    Reserved(u8),
    /// Unspecified codes (48..=63), used by RTP payload formats among others
    Unspecified(u8),
}

impl From<u8> for NalUnitType {
    fn from(value: u8) -> Self {
        match value {
            0 => NalUnitType::TrailN,
            1 => NalUnitType::TrailR,
            2 => NalUnitType::TsaN,
            3 => NalUnitType::TsaR,
            4 => NalUnitType::StsaN,
            5 => NalUnitType::StsaR,
            6 => NalUnitType::RadlN,
            7 => NalUnitType::RadlR,
            8 => NalUnitType::RaslN,
            9 => NalUnitType::RaslR,
            16 => NalUnitType::BlaWLp,
            17 => NalUnitType::BlaWRadl,
            18 => NalUnitType::BlaNLp,
            19 => NalUnitType::IdrWRadl,
            20 => NalUnitType::IdrNLp,
            21 => NalUnitType::CraNut,
            32 => NalUnitType::Vps,
            33 => NalUnitType::Sps,
            34 => NalUnitType::Pps,
            35 => NalUnitType::Aud,
            36 => NalUnitType::Eos,
            37 => NalUnitType::Eob,
            38 => NalUnitType::Fd,
            39 => NalUnitType::PrefixSei,
            40 => NalUnitType::SuffixSei,
            48..=63 => NalUnitType::Unspecified(value),
            _ => NalUnitType::Reserved(value),
        }
    }
}

impl From<NalUnitType> for u8 {
    fn from(value: NalUnitType) -> Self {
        match value {
            NalUnitType::TrailN => 0,
            NalUnitType::TrailR => 1,
            NalUnitType::TsaN => 2,
            NalUnitType::TsaR => 3,
            NalUnitType::StsaN => 4,
            NalUnitType::StsaR => 5,
            NalUnitType::RadlN => 6,
            NalUnitType::RadlR => 7,
            NalUnitType::RaslN => 8,
            NalUnitType::RaslR => 9,
            NalUnitType::BlaWLp => 16,
            NalUnitType::BlaWRadl => 17,
            NalUnitType::BlaNLp => 18,
            NalUnitType::IdrWRadl => 19,
            NalUnitType::IdrNLp => 20,
            NalUnitType::CraNut => 21,
            NalUnitType::Vps => 32,
            NalUnitType::Sps => 33,
            NalUnitType::Pps => 34,
            NalUnitType::Aud => 35,
            NalUnitType::Eos => 36,
            NalUnitType::Eob => 37,
            NalUnitType::Fd => 38,
            NalUnitType::PrefixSei => 39,
            NalUnitType::SuffixSei => 40,
            NalUnitType::Reserved(value) | NalUnitType::Unspecified(value) => value,
        }
    }
}

impl NalUnitType {
    /// VCL NAL units carry coded slice data (codes 0..=31).
    pub fn is_vcl(self) -> bool {
        u8::from(self) < 32
    }

    /// Intra random access point pictures (codes 16..=23).
    pub fn is_irap(self) -> bool {
        (16..=23).contains(&u8::from(self))
    }

    pub fn is_parameter_set(self) -> bool {
        matches!(self, NalUnitType::Vps | NalUnitType::Sps | NalUnitType::Pps)
    }
}

/// Chroma sampling signalled by `chroma_format_idc`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChromaFormat {
    Monochrome,
    #[default]
    Yuv420,
    Yuv422,
    Yuv444,
}

impl ChromaFormat {
    /// Maps `chroma_format_idc` (0..=3) to a chroma format.
    pub fn from_idc(idc: u32) -> Option<Self> {
        match idc {
            0 => Some(ChromaFormat::Monochrome),
            1 => Some(ChromaFormat::Yuv420),
            2 => Some(ChromaFormat::Yuv422),
            3 => Some(ChromaFormat::Yuv444),
            _ => None,
        }
    }

    pub fn idc(self) -> u32 {
        match self {
            ChromaFormat::Monochrome => 0,
            ChromaFormat::Yuv420 => 1,
            ChromaFormat::Yuv422 => 2,
            ChromaFormat::Yuv444 => 3,
        }
    }

    /// `(SubWidthC, SubHeightC)` from H.265 Table 6-1.
    pub fn subsampling(self) -> (u32, u32) {
        match self {
            ChromaFormat::Monochrome | ChromaFormat::Yuv444 => (1, 1),
            ChromaFormat::Yuv420 => (2, 2),
            ChromaFormat::Yuv422 => (2, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tier {
    #[default]
    Main,
    High,
}

/// Named Range Extensions profiles (H.265 Annex A, Table A.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RextProfile {
    Monochrome,
    Monochrome10,
    Monochrome12,
    Monochrome16,
    Main12,
    Main422_10,
    Main422_12,
    Main444,
    Main444_10,
    Main444_12,
    MainIntra,
    Main10Intra,
    Main12Intra,
    Main422_10Intra,
    Main422_12Intra,
    Main444Intra,
    Main444_10Intra,
    Main444_12Intra,
    Main444_16Intra,
    Main444StillPicture,
    Main444_16StillPicture,
}

impl RextProfile {
    /// Looks up a profile from the 9 constraint flags stored in
    /// [`SequenceParameterSetInfo::rext_profile`].
    ///
    /// Flag order, most significant first: `max_12bit`, `max_10bit`,
    /// `max_8bit`, `max_422chroma`, `max_420chroma`, `max_monochrome`,
    /// `intra`, `one_picture_only`, `lower_bit_rate`. The last flag only
    /// selects a bit rate variant and is not part of the match.
    pub fn from_constraint_flags(flags: u16) -> Option<Self> {
        let profile = match (flags >> 1) & 0xFF {
            0b1111_1100 => RextProfile::Monochrome,
            0b1101_1100 => RextProfile::Monochrome10,
            0b1001_1100 => RextProfile::Monochrome12,
            0b0001_1100 => RextProfile::Monochrome16,
            0b1001_1000 => RextProfile::Main12,
            0b1101_0000 => RextProfile::Main422_10,
            0b1001_0000 => RextProfile::Main422_12,
            0b1110_0000 => RextProfile::Main444,
            0b1100_0000 => RextProfile::Main444_10,
            0b1000_0000 => RextProfile::Main444_12,
            0b1111_1010 => RextProfile::MainIntra,
            0b1101_1010 => RextProfile::Main10Intra,
            0b1001_1010 => RextProfile::Main12Intra,
            0b1101_0010 => RextProfile::Main422_10Intra,
            0b1001_0010 => RextProfile::Main422_12Intra,
            0b1110_0010 => RextProfile::Main444Intra,
            0b1100_0010 => RextProfile::Main444_10Intra,
            0b1000_0010 => RextProfile::Main444_12Intra,
            0b0000_0010 => RextProfile::Main444_16Intra,
            0b1110_0011 => RextProfile::Main444StillPicture,
            0b0000_0011 => RextProfile::Main444_16StillPicture,
            _ => return None,
        };
        Some(profile)
    }
}

/// Conformance cropping window, in chroma sample units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConformanceWindow {
    pub left_offset: u32,
    pub right_offset: u32,
    pub top_offset: u32,
    pub bottom_offset: u32,
}

/// Decoder configuration recovered from a Sequence Parameter Set.
///
/// `valid` must be checked before any other field is used: when it is false
/// the remaining fields hold defaults and carry no information.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SequenceParameterSetInfo {
    pub valid: bool,
    /// `general_profile_idc` (1 = Main, 2 = Main 10, 3 = Main Still Picture, 4 = Range Extensions, ...)
    pub profile: u8,
    /// Range Extensions constraint flags, 0 unless the stream signals the
    /// Range Extensions profile. See [`RextProfile::from_constraint_flags`].
    pub rext_profile: u16,
    /// `general_level_idc`, i.e. the level number times 30
    pub level: u8,
    pub chroma_format: ChromaFormat,
    /// Luma bit depth, 8..=16
    pub bit_depth: u8,

    pub vps_id: u8,
    pub sps_id: u32,
    pub max_sub_layers: u8,
    pub profile_space: u8,
    pub tier: Tier,
    pub profile_compatibility_flags: u32,
    /// `pic_width_in_luma_samples`
    pub width: u32,
    /// `pic_height_in_luma_samples`
    pub height: u32,
    pub conformance_window: Option<ConformanceWindow>,
}

impl SequenceParameterSetInfo {
    /// Named Range Extensions profile, if the stream signals one.
    pub fn range_extension_profile(&self) -> Option<RextProfile> {
        if !self.valid {
            return None;
        }
        RextProfile::from_constraint_flags(self.rext_profile)
    }

    /// Output picture size after applying the conformance window.
    pub fn display_size(&self) -> (u32, u32) {
        let Some(window) = self.conformance_window else {
            return (self.width, self.height);
        };
        let (sub_width, sub_height) = self.chroma_format.subsampling();
        let crop_x = sub_width.saturating_mul(window.left_offset.saturating_add(window.right_offset));
        let crop_y = sub_height.saturating_mul(window.top_offset.saturating_add(window.bottom_offset));
        (
            self.width.saturating_sub(crop_x),
            self.height.saturating_sub(crop_y),
        )
    }
}
