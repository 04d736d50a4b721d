use thiserror::Error;

/// Errors raised while reading bits, discovering NAL units or decoding an SPS.
///
/// None of these are fatal to the caller: each one is scoped to a single read,
/// a single NAL unit or a single parse call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeqParseError {
    /// A read asked for more bits than remain in the buffer.
    #[error("bitstream exhausted: needed {needed} bits, {available} available")]
    BitstreamExhausted { needed: usize, available: usize },

    /// An exponential-Golomb code had too many leading zeros or overflowed.
    #[error("malformed exp-golomb code ({leading_zeros} leading zero bits)")]
    MalformedCode { leading_zeros: u32 },

    /// A NAL unit declared a length that runs past the end of the buffer.
    #[error("truncated nal unit at offset {offset}: declared {declared} bytes, {available} available")]
    TruncatedNal {
        offset: usize,
        declared: usize,
        available: usize,
    },

    /// A NAL unit header could not be accepted.
    #[error("malformed nal unit at offset {offset}: {reason}")]
    MalformedNal { offset: usize, reason: &'static str },

    /// A syntax element decoded to a value the format does not allow.
    #[error("unsupported value {value} for {field}")]
    UnsupportedValue { field: &'static str, value: u32 },

    #[error("invalid bit count: {0}")]
    InvalidBitCount(u32),

    #[error("invalid nal size field width: {0} (expected 0 to 4)")]
    InvalidNalSizeWidth(u8),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(String),
}

impl SeqParseError {
    /// Byte offset of the NAL unit this error refers to, for NAL-level errors.
    pub fn nal_offset(&self) -> Option<usize> {
        match self {
            SeqParseError::TruncatedNal { offset, .. } | SeqParseError::MalformedNal { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }
}

impl From<std::io::Error> for SeqParseError {
    fn from(err: std::io::Error) -> Self {
        SeqParseError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SeqParseError>;
