//! Scan sessions.
//!
//! A session ties a [`FrameSource`](crate::frame::FrameSource), the
//! [`DecoderAdapter`](crate::decoder::DecoderAdapter) and the AAMVA parser
//! together. The [`SessionController`] is the state machine deciding when a
//! frame is captured and what happens to a decode result; the [`Scanner`]
//! drives it on the async-std executor.
use std::time::Duration;

use json_syntax::Parse;
use serde::{Deserialize, Serialize};

use crate::{
    aamva::{self, DuplicatePolicy, LicenseRecord, ParseOptions},
    decoder::{BarcodeFormat, DecodedSymbol, ReaderOptions},
    frame::DEFAULT_FRAME_INTERVAL,
};

mod controller;
pub mod schedule;
mod scanner;

pub use controller::*;
pub use scanner::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Capturing(CapturePhase),
}

impl SessionState {
    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapturePhase {
    /// Ready to capture a frame on the next tick.
    WaitingFrame,

    /// A frame has been submitted to the decoder.
    Decoding,
}

/// What a session does after reading a license.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadPolicy {
    /// Stop capturing and release the camera.
    #[default]
    StopOnRead,

    /// Keep capturing, reporting each distinct license once.
    Continue,
}

/// Result of a successful read, as exposed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutput {
    /// Text decoded from the symbol, before normalization.
    pub raw_text: String,

    pub format: BarcodeFormat,

    pub record: LicenseRecord,
}

impl ScanOutput {
    /// Parses the first symbol carrying text.
    ///
    /// Returns `None` when no symbol has a non-empty payload. The record of
    /// the returned output may be empty.
    pub fn from_symbols(symbols: Vec<DecodedSymbol>, options: &ParseOptions) -> Option<Self> {
        let symbol = symbols.into_iter().find(|s| !s.text.is_empty())?;
        let record = aamva::parse_with(&symbol.text, options);

        Some(Self {
            raw_text: symbol.text,
            format: symbol.format,
            record,
        })
    }
}

/// Counters describing what a session did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Ticks received while capturing.
    pub ticks: u64,

    /// Ticks ignored because a decode was in flight.
    pub dropped_ticks: u64,

    /// Frames submitted to the decoder.
    pub decodes: u64,

    pub decode_errors: u64,

    /// Decodes that recognized no symbol.
    pub empty_decodes: u64,

    /// Records published.
    pub records: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    Syntax(String),

    #[error("invalid scanner configuration: {0}")]
    Invalid(String),
}

/// Scanner configuration.
///
/// Every field has a default, so a partial JSON object is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScannerConfig {
    /// Time between two camera frames, in milliseconds.
    pub frame_interval_ms: u64,

    pub read_policy: ReadPolicy,

    pub duplicate_policy: DuplicatePolicy,

    pub recover_header_line: bool,

    pub reader: ReaderOptions,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: DEFAULT_FRAME_INTERVAL.as_millis() as u64,
            read_policy: ReadPolicy::default(),
            duplicate_policy: DuplicatePolicy::default(),
            recover_header_line: true,
            reader: ReaderOptions::default(),
        }
    }
}

impl ScannerConfig {
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let json = json_syntax::Value::parse_str(content)
            .map_err(|e| ConfigError::Syntax(e.to_string()))?
            .0;
        let config: Self =
            json_syntax::from_value(json).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if config.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid("`frameIntervalMs` must be positive".into()));
        }

        if config.reader.max_number_of_symbols == 0 {
            return Err(ConfigError::Invalid(
                "`reader.maxNumberOfSymbols` must be positive".into(),
            ));
        }

        Ok(config)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            duplicate_policy: self.duplicate_policy,
            recover_header_line: self.recover_header_line,
        }
    }
}
