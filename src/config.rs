use std::env;
use std::fs;
use std::path::Path;

use crate::codec::h265::NalFraming;
use crate::error::{Result, SeqParseError};

/// Environment variable overriding [`ParserConfig::framing`] (a NAL size field width, 0 for Annex B)
pub const ENV_NAL_SIZE_FIELD_WIDTH: &str = "SEQPARSE_NAL_SIZE_FIELD_WIDTH";
/// Environment variable overriding [`ParserConfig::log_nal_units`]
pub const ENV_LOG_NAL_UNITS: &str = "SEQPARSE_LOG_NAL_UNITS";

/// Parser settings.
///
/// Defaults suit an Annex B elementary stream. Containers that carry length
/// prefixed NAL units set the framing from their negotiated format, either
/// directly or through `SequenceParser::parse_hvcc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    pub framing: NalFraming,
    /// Emit a trace line for every NAL unit discovered
    pub log_nal_units: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            framing: NalFraming::AnnexB,
            log_nal_units: true,
        }
    }
}

impl ParserConfig {
    /// Default configuration with environment variable overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = ParserConfig::default();

        if let Ok(width) = env::var(ENV_NAL_SIZE_FIELD_WIDTH) {
            config.apply("nal_size_field_width", &width)?;
        }
        if let Ok(enabled) = env::var(ENV_LOG_NAL_UNITS) {
            config.apply("log_nal_units", &enabled)?;
        }

        Ok(config)
    }

    /// Loads a `key = value` configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses `key = value` lines. Blank lines and `#` comments are ignored,
    /// values may be quoted.
    ///
    /// ```
    /// use seqparse::config::ParserConfig;
    /// use seqparse::codec::h265::NalFraming;
    ///
    /// let config = ParserConfig::parse("nal_size_field_width = 4\n").unwrap();
    /// assert_eq!(config.framing, NalFraming::LengthPrefixed(4));
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        let mut config = ParserConfig::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                SeqParseError::InvalidConfig(format!("expected `key = value`, got `{}`", line))
            })?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            config.apply(key.trim(), value)?;
        }

        Ok(config)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "nal_size_field_width" => {
                let width: u8 = value.trim().parse().map_err(|_| {
                    SeqParseError::InvalidConfig(format!("invalid nal_size_field_width `{}`", value))
                })?;
                self.framing = NalFraming::from_size_field_width(width)?;
            }
            "log_nal_units" => {
                self.log_nal_units = match value.trim() {
                    "1" | "true" | "yes" | "on" => true,
                    "0" | "false" | "no" | "off" => false,
                    other => {
                        return Err(SeqParseError::InvalidConfig(format!(
                            "invalid log_nal_units `{}`",
                            other
                        )))
                    }
                };
            }
            other => {
                return Err(SeqParseError::InvalidConfig(format!("unknown key `{}`", other)));
            }
        }
        Ok(())
    }
}
