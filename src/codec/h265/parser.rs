use std::sync::Arc;

use bytes::BytesMut;
use parking_lot::Mutex;

use super::hvcc::HevcDecoderConfigurationRecord;
use super::nal::{remove_emulation_prevention, NalFraming, NalUnit, NalUnitHeader, NalUnits};
use super::sps::parse_sps;
use super::types::{NalUnitType, SequenceParameterSetInfo};
use crate::config::ParserConfig;
use crate::error::{Result, SeqParseError};

/// A NAL unit that could not be used, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NalFailure {
    /// Offset of the unit in the parsed buffer
    pub offset: usize,
    /// Type of the unit, when its header could be read
    pub nal_unit_type: Option<NalUnitType>,
    pub error: SeqParseError,
}

/// Outcome of one parse call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseReport {
    /// NAL units with a readable header
    pub nal_units: usize,
    /// SPS NAL units among them
    pub sps_units: usize,
    /// The stored SPS is valid at the end of the call
    pub sps_found: bool,
    pub failures: Vec<NalFailure>,
}

impl ParseReport {
    /// True when the call left a usable SPS behind.
    ///
    /// A false result means there was not enough information yet; the caller
    /// should try again with the next data it receives.
    pub fn succeeded(&self) -> bool {
        self.sps_found
    }
}

/// HEVC sequence parameter set parser
///
/// Scans buffers for SPS NAL units and keeps the most recently decoded one
/// in [`SequenceParser::sps`]. Nothing else survives between calls, and the
/// caller's buffers are never retained or modified.
///
/// ```
/// use seqparse::codec::h265::SequenceParser;
///
/// let mut parser = SequenceParser::new();
/// let report = parser.parse_nals(&[0x00, 0x00, 0x01, 0x26, 0x01, 0xAF], 0).unwrap();
/// assert_eq!(report.nal_units, 1);
/// assert!(!report.succeeded());
/// assert!(!parser.sps.valid);
/// ```
#[derive(Debug, Default)]
pub struct SequenceParser {
    /// Result of the last SPS decode. Check `valid` before reading anything else.
    pub sps: SequenceParameterSetInfo,
    config: ParserConfig,
    /// Reused RBSP buffer for de-emulated payloads
    scratch: BytesMut,
}

impl SequenceParser {
    /// Creates a parser for Annex B input with an empty SPS result
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses `data` using the configured framing.
    ///
    /// A framing built with an unsupported length width is reported as a
    /// single [`SeqParseError::InvalidNalSizeWidth`] failure.
    pub fn parse(&mut self, data: &[u8]) -> ParseReport {
        self.parse_framed(data, self.config.framing)
    }

    /// Parses every NAL unit in `data` and decodes the SPS units among them.
    ///
    /// Per-unit failures are listed in the report and never stop the scan.
    /// The stored SPS is reset before the scan, so a buffer without a
    /// decodable SPS leaves `sps.valid` false.
    ///
    /// # Arguments
    ///
    /// * `data` - Annex B or length-prefixed stream data
    /// * `nal_size_field_width` - The container's NAL length field width
    ///   (1 to 4 bytes), or 0 for start-code delimited input
    ///
    /// # Returns
    ///
    /// * `Ok(ParseReport)` - Unit counts and per-unit failures of this call
    /// * `Err(SeqParseError::InvalidNalSizeWidth)` - If the width is above 4
    pub fn parse_nals(&mut self, data: &[u8], nal_size_field_width: u8) -> Result<ParseReport> {
        let framing = NalFraming::from_size_field_width(nal_size_field_width)?;
        Ok(self.parse_framed(data, framing))
    }

    fn parse_framed(&mut self, data: &[u8], framing: NalFraming) -> ParseReport {
        self.sps = SequenceParameterSetInfo::default();
        let mut report = ParseReport::default();

        for nal in NalUnits::new(data, framing) {
            match nal {
                Ok(nal) => self.handle_nal(nal, &mut report),
                Err(error) => {
                    log::warn!("Skipping NAL unit: {}", error);
                    report.failures.push(NalFailure {
                        offset: error.nal_offset().unwrap_or_default(),
                        nal_unit_type: None,
                        error,
                    });
                }
            }
        }

        report.sps_found = self.sps.valid;
        report
    }

    fn handle_nal(&mut self, nal: NalUnit<'_>, report: &mut ParseReport) {
        report.nal_units += 1;
        if self.config.log_nal_units {
            log::trace!(
                "NAL unit type {:?} at offset {} ({} bytes)",
                nal.nal_unit_type(),
                nal.offset,
                nal.data.len()
            );
        }

        if nal.nal_unit_type() != NalUnitType::Sps {
            return;
        }

        report.sps_units += 1;
        if let Err(error) = self.parse_sps(nal.payload()) {
            log::warn!("SPS at offset {} rejected: {}", nal.offset, error);
            report.failures.push(NalFailure {
                offset: nal.offset,
                nal_unit_type: Some(NalUnitType::Sps),
                error,
            });
        }
    }

    /// Decodes one SPS payload into [`SequenceParser::sps`].
    ///
    /// The stored result is invalidated first and only replaced once every
    /// tracked field has been decoded, so a failure always leaves `valid`
    /// false.
    ///
    /// # Arguments
    ///
    /// * `payload` - The bytes after the 2-byte NAL header, still
    ///   emulation-prevention encoded
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the SPS was decoded and stored
    /// * `Err(_)` - The bitstream or value error that stopped the decode
    pub fn parse_sps(&mut self, payload: &[u8]) -> Result<()> {
        self.sps = SequenceParameterSetInfo::default();

        remove_emulation_prevention(payload, &mut self.scratch);
        let sps = parse_sps(&self.scratch)?;

        log::debug!(
            "SPS: profile {} level {} {:?} {}-bit {}x{}",
            sps.profile,
            sps.level,
            sps.chroma_format,
            sps.bit_depth,
            sps.width,
            sps.height
        );
        self.sps = sps;
        Ok(())
    }

    /// Reads codec private data in `hvcC` form.
    ///
    /// Decodes the SPS units carried in the record and switches the
    /// configured framing to the record's NAL length size, so that samples
    /// can afterwards be fed to [`SequenceParser::parse`]. The stored SPS is
    /// reset even when the record itself cannot be read.
    ///
    /// # Arguments
    ///
    /// * `record` - An `HEVCDecoderConfigurationRecord` as carried in `hvcC`
    ///
    /// # Returns
    ///
    /// * `Ok(ParseReport)` - Unit counts and per-unit failures of the record arrays
    /// * `Err(SeqParseError::TruncatedNal)` - If the record is cut short
    pub fn parse_hvcc(&mut self, record: &[u8]) -> Result<ParseReport> {
        self.sps = SequenceParameterSetInfo::default();
        let hvcc = HevcDecoderConfigurationRecord::parse(record)?;
        self.config.framing = NalFraming::LengthPrefixed(hvcc.nal_size_field_width());

        let mut report = ParseReport::default();
        for nalu in hvcc.arrays.iter().flat_map(|array| array.nalus.iter()) {
            match NalUnitHeader::parse(nalu, 0) {
                Ok(header) => self.handle_nal(
                    NalUnit {
                        offset: 0,
                        header,
                        data: nalu,
                    },
                    &mut report,
                ),
                Err(error) => report.failures.push(NalFailure {
                    offset: 0,
                    nal_unit_type: None,
                    error,
                }),
            }
        }

        report.sps_found = self.sps.valid;
        Ok(report)
    }
}

/// A [`SequenceParser`] behind a lock, for callers that share one parser
/// between threads.
///
/// Each call holds the lock for the whole parse, so readers never observe a
/// partially written result.
#[derive(Debug, Clone, Default)]
pub struct SharedSequenceParser {
    inner: Arc<Mutex<SequenceParser>>,
}

impl SharedSequenceParser {
    pub fn new(parser: SequenceParser) -> Self {
        Self {
            inner: Arc::new(Mutex::new(parser)),
        }
    }

    pub fn parse_nals(&self, data: &[u8], nal_size_field_width: u8) -> Result<ParseReport> {
        self.inner.lock().parse_nals(data, nal_size_field_width)
    }

    /// Snapshot of the stored SPS result
    pub fn sps(&self) -> SequenceParameterSetInfo {
        self.inner.lock().sps.clone()
    }

    /// Runs `f` with exclusive access to the parser.
    pub fn with<R>(&self, f: impl FnOnce(&mut SequenceParser) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
