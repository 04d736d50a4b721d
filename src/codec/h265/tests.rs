use super::hvcc::test_utils::build_hvcc;
use super::*;
use crate::config::ParserConfig;
use crate::error::SeqParseError;
use crate::utils::BitWriter;
use bytes::Bytes;
use pretty_assertions::assert_eq;
use quickcheck_macros::quickcheck;

/// x265 SPS for 1280x720 Main profile, level 3.1, as found in the stream
const REAL_SPS_NAL: [u8; 41] = [
    0x42, 0x01, 0x01, 0x01, 0x60, 0x00, 0x00, 0x03, 0x00, 0x90, 0x00, 0x00, 0x03, 0x00, 0x00,
    0x03, 0x00, 0x5d, 0xa0, 0x02, 0x80, 0x80, 0x2d, 0x16, 0x59, 0x59, 0xa4, 0x93, 0x2b, 0xc0,
    0x5a, 0x70, 0x80, 0x00, 0x01, 0xf4, 0x80, 0x00, 0x3a, 0x98, 0x04,
];

/// The same SPS after the header, emulation prevention removed
const REAL_SPS_RBSP: [u8; 36] = [
    0x01, 0x01, 0x60, 0x00, 0x00, 0x00, 0x90, 0x00, 0x00, 0x00, 0x00, 0x00, 0x5d, 0xa0, 0x02,
    0x80, 0x80, 0x2d, 0x16, 0x59, 0x59, 0xa4, 0x93, 0x2b, 0xc0, 0x5a, 0x70, 0x80, 0x00, 0x01,
    0xf4, 0x80, 0x00, 0x3a, 0x98, 0x04,
];

/// Bytes of REAL_SPS_RBSP covering every field up to bit_depth_chroma_minus8 (151 bits)
const REAL_SPS_MIN_LEN: usize = 19;

#[derive(Debug, Clone)]
struct SpsFields {
    vps_id: u8,
    max_sub_layers_minus1: u8,
    profile_idc: u8,
    high_tier: bool,
    compatibility_flags: u32,
    constraint_flags: u64,
    level_idc: u8,
    sps_id: u32,
    chroma_format_idc: u32,
    width: u32,
    height: u32,
    conformance_window: Option<[u32; 4]>,
    bit_depth_luma_minus8: u32,
    bit_depth_chroma_minus8: u32,
}

impl Default for SpsFields {
    fn default() -> Self {
        SpsFields {
            vps_id: 0,
            max_sub_layers_minus1: 0,
            profile_idc: 1,
            high_tier: false,
            compatibility_flags: 0x6000_0000,
            constraint_flags: 0,
            level_idc: 93,
            sps_id: 0,
            chroma_format_idc: 1,
            width: 1920,
            height: 1080,
            conformance_window: None,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
        }
    }
}

fn sps_rbsp(fields: &SpsFields) -> Bytes {
    let mut writer = BitWriter::new();
    let sub_layers = fields.max_sub_layers_minus1 as u64;

    writer.write_bits(fields.vps_id as u64, 4).unwrap();
    writer.write_bits(sub_layers, 3).unwrap();
    writer.write_flag(true); // sps_temporal_id_nesting_flag

    writer.write_bits(0, 2).unwrap();
    writer.write_flag(fields.high_tier);
    writer.write_bits(fields.profile_idc as u64, 5).unwrap();
    writer.write_bits(fields.compatibility_flags as u64, 32).unwrap();
    writer.write_bits(0b1001, 4).unwrap(); // progressive, frame only
    writer.write_bits(fields.constraint_flags, 44).unwrap();
    writer.write_bits(fields.level_idc as u64, 8).unwrap();

    for _ in 0..sub_layers {
        writer.write_flag(true);
        writer.write_flag(true);
    }
    if sub_layers > 0 {
        for _ in sub_layers..8 {
            writer.write_bits(0, 2).unwrap();
        }
    }
    for i in 0..sub_layers {
        writer.write_bits(fields.profile_idc as u64, 8).unwrap();
        writer.write_bits(fields.compatibility_flags as u64, 32).unwrap();
        writer.write_bits(0b1001 << 44, 48).unwrap();
        writer.write_bits(30 + i, 8).unwrap();
    }

    writer.write_ue(fields.sps_id);
    writer.write_ue(fields.chroma_format_idc);
    if fields.chroma_format_idc == 3 {
        writer.write_flag(true); // separate_colour_plane_flag
    }
    writer.write_ue(fields.width);
    writer.write_ue(fields.height);
    match fields.conformance_window {
        Some(offsets) => {
            writer.write_flag(true);
            for offset in offsets {
                writer.write_ue(offset);
            }
        }
        None => writer.write_flag(false),
    }
    writer.write_ue(fields.bit_depth_luma_minus8);
    writer.write_ue(fields.bit_depth_chroma_minus8);

    // the rest of a typical SPS, which the parser stops short of
    writer.write_ue(4); // log2_max_pic_order_cnt_lsb_minus4
    writer.write_flag(true); // sps_sub_layer_ordering_info_present_flag
    writer.write_ue(4);
    writer.write_ue(2);
    writer.write_ue(0);
    writer.write_rbsp_trailing_bits();
    writer.finish()
}

fn sps_nal(fields: &SpsFields) -> Vec<u8> {
    let mut nal = vec![0x42, 0x01];
    nal.extend_from_slice(&add_emulation_prevention(&sps_rbsp(fields)));
    nal
}

fn create_test_nalu(nalu_type: u8, payload: &[u8]) -> Vec<u8> {
    let mut data = vec![
        (nalu_type << 1) & 0x7E, // forbidden_zero_bit, nal_unit_type
        0x01,                    // layer id 0, temporal id plus1 1
    ];
    data.extend_from_slice(payload);
    data
}

fn annex_b(nals: &[&[u8]]) -> Vec<u8> {
    let mut stream = Vec::new();
    for nal in nals {
        stream.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
        stream.extend_from_slice(nal);
    }
    stream
}

fn length_prefixed(nals: &[&[u8]], width: usize) -> Vec<u8> {
    let mut stream = Vec::new();
    for nal in nals {
        let len = (nal.len() as u32).to_be_bytes();
        stream.extend_from_slice(&len[4 - width..]);
        stream.extend_from_slice(nal);
    }
    stream
}

#[test]
fn test_real_world_sps() {
    let mut parser = SequenceParser::new();
    let vps = create_test_nalu(32, &[0x0C, 0x01, 0xFF, 0xFF]);
    let stream = annex_b(&[&vps, &REAL_SPS_NAL]);

    let report = parser.parse_nals(&stream, 0).unwrap();
    assert!(report.succeeded());
    assert_eq!(report.nal_units, 2);
    assert_eq!(report.sps_units, 1);
    assert!(report.failures.is_empty());

    let sps = &parser.sps;
    assert!(sps.valid);
    assert_eq!(sps.profile, 1);
    assert_eq!(sps.rext_profile, 0);
    assert_eq!(sps.level, 93);
    assert_eq!(sps.chroma_format, ChromaFormat::Yuv420);
    assert_eq!(sps.bit_depth, 8);
    assert_eq!(sps.tier, Tier::Main);
    assert_eq!(sps.profile_compatibility_flags, 0x6000_0000);
    assert_eq!(sps.max_sub_layers, 1);
    assert_eq!((sps.width, sps.height), (1280, 720));
    assert_eq!(sps.display_size(), (1280, 720));
    assert_eq!(sps.range_extension_profile(), None);
}

#[test]
fn test_crafted_main_sps() {
    let fields = SpsFields {
        compatibility_flags: 0x4000_0000,
        ..Default::default()
    };
    let nal = sps_nal(&fields);
    // the all-zero constraint flags need escaping
    assert!(nal.windows(3).any(|w| w == [0x00, 0x00, 0x03]));

    let mut parser = SequenceParser::new();
    let report = parser.parse_nals(&length_prefixed(&[&nal], 4), 4).unwrap();
    assert!(report.succeeded());
    assert_eq!(
        parser.sps,
        SequenceParameterSetInfo {
            valid: true,
            profile: 1,
            rext_profile: 0,
            level: 93,
            chroma_format: ChromaFormat::Yuv420,
            bit_depth: 8,
            vps_id: 0,
            sps_id: 0,
            max_sub_layers: 1,
            profile_space: 0,
            tier: Tier::Main,
            profile_compatibility_flags: 0x4000_0000,
            width: 1920,
            height: 1080,
            conformance_window: None,
        }
    );
}

#[test]
fn test_sps_truncated_below_minimum_length() {
    assert!(sps::parse_sps(&REAL_SPS_RBSP[..REAL_SPS_MIN_LEN]).is_ok());

    let mut parser = SequenceParser::new();
    parser.parse_sps(&REAL_SPS_RBSP[..REAL_SPS_MIN_LEN]).unwrap();
    assert!(parser.sps.valid);

    let result = parser.parse_sps(&REAL_SPS_RBSP[..REAL_SPS_MIN_LEN - 1]);
    assert!(matches!(
        result,
        Err(SeqParseError::BitstreamExhausted { .. })
    ));
    assert!(!parser.sps.valid);

    for len in 0..REAL_SPS_MIN_LEN {
        assert!(
            sps::parse_sps(&REAL_SPS_RBSP[..len]).is_err(),
            "prefix of {} bytes decoded",
            len
        );
    }
}

#[test]
fn test_main10_high_tier_with_conformance_window() {
    let fields = SpsFields {
        vps_id: 1,
        sps_id: 3,
        profile_idc: 2,
        high_tier: true,
        compatibility_flags: 0x2000_0000,
        level_idc: 153,
        height: 1088,
        conformance_window: Some([0, 0, 0, 4]),
        bit_depth_luma_minus8: 2,
        bit_depth_chroma_minus8: 2,
        ..Default::default()
    };

    let mut parser = SequenceParser::new();
    let report = parser.parse_nals(&annex_b(&[&sps_nal(&fields)]), 0).unwrap();
    assert!(report.succeeded());

    let sps = &parser.sps;
    assert_eq!(sps.profile, 2);
    assert_eq!(sps.tier, Tier::High);
    assert_eq!(sps.level, 153);
    assert_eq!(sps.bit_depth, 10);
    assert_eq!(sps.vps_id, 1);
    assert_eq!(sps.sps_id, 3);
    assert_eq!(
        sps.conformance_window,
        Some(ConformanceWindow {
            bottom_offset: 4,
            ..Default::default()
        })
    );
    assert_eq!(sps.display_size(), (1920, 1080));
}

#[test]
fn test_range_extensions_422_10() {
    let fields = SpsFields {
        profile_idc: 4,
        compatibility_flags: 0x0800_0000,
        constraint_flags: 0b1101_0000_1 << 35,
        chroma_format_idc: 2,
        bit_depth_luma_minus8: 2,
        bit_depth_chroma_minus8: 2,
        ..Default::default()
    };

    let mut parser = SequenceParser::new();
    parser.parse_sps(&sps_nal(&fields)[2..]).unwrap();

    let sps = &parser.sps;
    assert_eq!(sps.profile, 4);
    assert_eq!(sps.rext_profile, 0b1101_0000_1);
    assert_eq!(sps.range_extension_profile(), Some(RextProfile::Main422_10));
    assert_eq!(sps.chroma_format, ChromaFormat::Yuv422);
    assert_eq!(sps.bit_depth, 10);
}

#[test]
fn test_444_reads_separate_colour_plane_flag() {
    let fields = SpsFields {
        profile_idc: 4,
        constraint_flags: 0b1110_0000_1 << 35,
        chroma_format_idc: 3,
        width: 3840,
        height: 2160,
        bit_depth_luma_minus8: 4,
        ..Default::default()
    };

    let mut parser = SequenceParser::new();
    parser.parse_sps(&sps_nal(&fields)[2..]).unwrap();

    let sps = &parser.sps;
    assert_eq!(sps.chroma_format, ChromaFormat::Yuv444);
    assert_eq!((sps.width, sps.height), (3840, 2160));
    assert_eq!(sps.bit_depth, 12);
    assert_eq!(sps.range_extension_profile(), Some(RextProfile::Main444));
}

#[test]
fn test_monochrome_16_bit() {
    let fields = SpsFields {
        chroma_format_idc: 0,
        bit_depth_luma_minus8: 8,
        ..Default::default()
    };

    let mut parser = SequenceParser::new();
    parser.parse_sps(&sps_nal(&fields)[2..]).unwrap();
    assert_eq!(parser.sps.chroma_format, ChromaFormat::Monochrome);
    assert_eq!(parser.sps.bit_depth, 16);

    let fields = SpsFields {
        bit_depth_luma_minus8: 9,
        ..Default::default()
    };
    assert_eq!(
        parser.parse_sps(&sps_nal(&fields)[2..]),
        Err(SeqParseError::UnsupportedValue {
            field: "bit_depth_luma_minus8",
            value: 9
        })
    );
    assert!(!parser.sps.valid);
}

#[test]
fn test_sub_layers() {
    let fields = SpsFields {
        max_sub_layers_minus1: 6,
        level_idc: 120,
        ..Default::default()
    };

    let mut parser = SequenceParser::new();
    parser.parse_sps(&sps_nal(&fields)[2..]).unwrap();
    assert_eq!(parser.sps.max_sub_layers, 7);
    assert_eq!(parser.sps.level, 120);
    assert_eq!((parser.sps.width, parser.sps.height), (1920, 1080));
}

#[test]
fn test_sps_followed_by_truncated_nal() {
    let sps = sps_nal(&SpsFields::default());
    let mut stream = length_prefixed(&[&sps], 4);
    // claims 4096 bytes, three follow
    stream.extend_from_slice(&[0x00, 0x00, 0x10, 0x00, 0x02, 0x01, 0xAF]);

    let mut parser = SequenceParser::new();
    let report = parser.parse_nals(&stream, 4).unwrap();

    assert!(report.succeeded());
    assert_eq!(parser.sps.level, 93);
    assert_eq!(
        report.failures,
        vec![NalFailure {
            offset: 4 + sps.len(),
            nal_unit_type: None,
            error: SeqParseError::TruncatedNal {
                offset: 4 + sps.len(),
                declared: 4096,
                available: 3,
            },
        }]
    );
}

#[test]
fn test_oversized_length_field() {
    let mut stream = vec![0xFF, 0xFF, 0xFF, 0xF0];
    stream.extend_from_slice(&REAL_SPS_NAL);

    let mut parser = SequenceParser::new();
    let report = parser.parse_nals(&stream, 4).unwrap();
    assert!(!report.succeeded());
    assert!(!parser.sps.valid);
    assert_eq!(report.nal_units, 0);
    assert_eq!(
        report.failures[0].error,
        SeqParseError::TruncatedNal {
            offset: 0,
            declared: 0xFFFF_FFF0,
            available: REAL_SPS_NAL.len(),
        }
    );
}

#[test]
fn test_malformed_units_do_not_stop_the_scan() {
    let forbidden = [0xC2, 0x01, 0x01, 0x01];
    let mut broken_sps = REAL_SPS_NAL.to_vec();
    broken_sps.truncate(12);
    let stream = annex_b(&[&forbidden, &broken_sps, &REAL_SPS_NAL]);

    let mut parser = SequenceParser::new();
    let report = parser.parse_nals(&stream, 0).unwrap();

    assert!(report.succeeded());
    assert_eq!(report.nal_units, 2);
    assert_eq!(report.sps_units, 2);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].offset, 4);
    assert!(matches!(
        report.failures[0].error,
        SeqParseError::MalformedNal { .. }
    ));
    assert_eq!(report.failures[1].nal_unit_type, Some(NalUnitType::Sps));
    assert!(matches!(
        report.failures[1].error,
        SeqParseError::BitstreamExhausted { .. }
    ));
    assert_eq!(parser.sps.level, 93);
}

#[test]
fn test_last_sps_wins() {
    let mut broken_sps = REAL_SPS_NAL.to_vec();
    broken_sps.truncate(12);

    let mut parser = SequenceParser::new();
    let report = parser
        .parse_nals(&annex_b(&[&REAL_SPS_NAL, &broken_sps]), 0)
        .unwrap();
    assert!(!report.succeeded());
    assert!(!parser.sps.valid);
    assert_eq!(report.sps_units, 2);

    let main10 = sps_nal(&SpsFields {
        profile_idc: 2,
        ..Default::default()
    });
    let report = parser
        .parse_nals(&annex_b(&[&REAL_SPS_NAL, &main10]), 0)
        .unwrap();
    assert!(report.succeeded());
    assert_eq!(parser.sps.profile, 2);
}

#[test]
fn test_no_sps_resets_result() {
    let mut parser = SequenceParser::new();
    parser.parse_nals(&annex_b(&[&REAL_SPS_NAL]), 0).unwrap();
    assert!(parser.sps.valid);

    let pps = create_test_nalu(34, &[0xC1, 0x72, 0xB4]);
    let report = parser.parse_nals(&annex_b(&[&pps]), 0).unwrap();
    assert!(!report.succeeded());
    assert!(report.failures.is_empty());
    assert!(!parser.sps.valid);
}

#[test]
fn test_parse_is_idempotent() {
    let stream = annex_b(&[&REAL_SPS_NAL, &[0xC2, 0x01], &REAL_SPS_NAL[..20]]);
    let mut parser = SequenceParser::new();

    let first = parser.parse_nals(&stream, 0).unwrap();
    let first_sps = parser.sps.clone();
    let second = parser.parse_nals(&stream, 0).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_sps, parser.sps);
}

#[test]
fn test_invalid_nal_size_field_width() {
    let mut parser = SequenceParser::new();
    assert_eq!(
        parser.parse_nals(&REAL_SPS_NAL, 5),
        Err(SeqParseError::InvalidNalSizeWidth(5))
    );
}

#[test]
fn test_length_prefixed_widths() {
    for width in 1..=4usize {
        let mut parser = SequenceParser::new();
        let stream = length_prefixed(&[&REAL_SPS_NAL], width);
        let report = parser.parse_nals(&stream, width as u8).unwrap();
        assert!(report.succeeded(), "width {}", width);
        assert_eq!(parser.sps.width, 1280);
    }
}

#[test]
fn test_parse_hvcc_then_samples() {
    let vps = create_test_nalu(32, &[0x0C, 0x01]);
    let record = build_hvcc(&[(32, vec![&vps[..]]), (33, vec![&REAL_SPS_NAL[..]])]);

    let mut parser = SequenceParser::new();
    let report = parser.parse_hvcc(&record).unwrap();
    assert!(report.succeeded());
    assert_eq!(report.nal_units, 2);
    assert_eq!(parser.config().framing, NalFraming::LengthPrefixed(4));
    assert_eq!(parser.sps.level, 93);

    let main10 = sps_nal(&SpsFields {
        profile_idc: 2,
        ..Default::default()
    });
    let report = parser.parse(&length_prefixed(&[&main10], 4));
    assert!(report.succeeded());
    assert_eq!(parser.sps.profile, 2);
}

#[test]
fn test_parse_hvcc_with_bad_unit() {
    let record = build_hvcc(&[(33, vec![&[0xC2, 0x01][..], &REAL_SPS_NAL[..]])]);

    let mut parser = SequenceParser::new();
    let report = parser.parse_hvcc(&record).unwrap();
    assert!(report.succeeded());
    assert_eq!(report.failures.len(), 1);

    assert!(parser.sps.valid);
    assert!(matches!(
        parser.parse_hvcc(&record[..20]),
        Err(SeqParseError::TruncatedNal { .. })
    ));
    assert!(!parser.sps.valid);
}

#[test]
fn test_configured_framing_with_unsupported_width() {
    let stream = length_prefixed(&[&REAL_SPS_NAL], 4);

    for width in [0, 5, 9] {
        let mut parser = SequenceParser::with_config(ParserConfig {
            framing: NalFraming::LengthPrefixed(width),
            log_nal_units: false,
        });
        parser.sps.valid = true;

        let report = parser.parse(&stream);
        assert!(!report.succeeded());
        assert!(!parser.sps.valid);
        assert_eq!(report.nal_units, 0);
        assert_eq!(
            report.failures,
            vec![NalFailure {
                offset: 0,
                nal_unit_type: None,
                error: SeqParseError::InvalidNalSizeWidth(width),
            }]
        );
    }
}

#[test]
fn test_shared_parser_across_threads() {
    let shared = SharedSequenceParser::default();
    let stream = annex_b(&[&REAL_SPS_NAL]);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            let stream = stream.clone();
            std::thread::spawn(move || shared.parse_nals(&stream, 0).unwrap())
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().succeeded());
    }
    assert_eq!(shared.sps().level, 93);
    assert_eq!(shared.with(|parser| parser.sps.bit_depth), 8);
}

#[quickcheck]
fn prop_arbitrary_input_is_handled(data: Vec<u8>, width: u8) -> bool {
    let width = width % 6;
    let mut parser = SequenceParser::new();
    match parser.parse_nals(&data, width) {
        Ok(report) => {
            report.succeeded() == parser.sps.valid
                && (!parser.sps.valid || (8..=16).contains(&parser.sps.bit_depth))
        }
        Err(error) => width == 5 && error == SeqParseError::InvalidNalSizeWidth(5),
    }
}

#[quickcheck]
fn prop_arbitrary_sps_payload_is_handled(payload: Vec<u8>) -> bool {
    let mut parser = SequenceParser::new();
    let stream = annex_b(&[&create_test_nalu(33, &payload)]);
    let report = parser.parse_nals(&stream, 0).unwrap();
    report.succeeded() == parser.sps.valid
}
