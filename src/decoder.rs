//! Adapter around the external barcode symbol decoder.
//!
//! The decoding engine itself is a collaborator: it takes encoded image
//! bytes and [`ReaderOptions`] and returns the symbols it recognized. This
//! module encodes [`Frame`]s for it, runs it off the async executor and
//! normalizes its answer.
use std::{io, sync::Arc};

use async_std::task;
use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// Bytes per RGBA pixel.
const PIXEL_SIZE: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("empty frame ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("frame too large ({width}x{height})")]
    FrameTooLarge { width: u32, height: u32 },

    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarcodeFormat {
    Aztec,
    Code128,
    DataMatrix,
    #[serde(rename = "PDF417")]
    Pdf417,
    #[serde(rename = "QRCode")]
    QrCode,
}

/// Strategy used to turn the luminance image into a bit matrix.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Binarizer {
    #[default]
    LocalAverage,
    GlobalHistogram,
    FixedThreshold,
    BoolCast,
}

/// How the payload of a symbol is rendered as text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextMode {
    Plain,
    #[serde(rename = "ECI")]
    Eci,
    /// Human readable interpretation.
    #[default]
    #[serde(rename = "HRI")]
    Hri,
    Hex,
    Escaped,
}

/// Decoder engine configuration.
///
/// The default value is the configuration used for driver's licenses:
/// PDF417 only, at most one symbol, every robustness option enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReaderOptions {
    /// Spend more time looking for a symbol.
    pub try_harder: bool,

    /// Symbologies to look for.
    pub formats: Vec<BarcodeFormat>,

    /// Maximum number of symbols returned per image.
    pub max_number_of_symbols: u8,

    pub binarizer: Binarizer,

    pub text_mode: TextMode,

    pub try_rotate: bool,

    pub try_invert: bool,

    pub try_denoise: bool,

    pub try_downscale: bool,

    /// Scale factor applied at each downscaling step.
    pub downscale_factor: u8,

    /// Images whose size exceeds this many pixels are downscaled.
    pub downscale_threshold: u16,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            try_harder: true,
            formats: vec![BarcodeFormat::Pdf417],
            max_number_of_symbols: 1,
            binarizer: Binarizer::LocalAverage,
            text_mode: TextMode::Hri,
            try_rotate: true,
            try_invert: true,
            try_denoise: true,
            try_downscale: true,
            downscale_factor: 3,
            downscale_threshold: 500,
        }
    }
}

/// A symbol recognized by the decoder engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedSymbol {
    pub text: String,
    pub format: BarcodeFormat,
}

impl DecodedSymbol {
    pub fn new(text: impl Into<String>, format: BarcodeFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }
}

/// External barcode symbol decoder.
///
/// `image` is an encoded (PNG) image. Recognizing nothing is not an error:
/// the engine returns an empty list.
pub trait SymbolDecoder: Send + Sync {
    fn read_barcodes(&self, image: &[u8], options: &ReaderOptions) -> Vec<DecodedSymbol>;
}

impl<F> SymbolDecoder for F
where
    F: Fn(&[u8], &ReaderOptions) -> Vec<DecodedSymbol> + Send + Sync,
{
    fn read_barcodes(&self, image: &[u8], options: &ReaderOptions) -> Vec<DecodedSymbol> {
        self(image, options)
    }
}

/// Runs the decoder engine on frames with a fixed configuration.
///
/// Cloning is cheap and clones share the engine and the options. The adapter
/// keeps no state between calls.
#[derive(Clone)]
pub struct DecoderAdapter {
    engine: Arc<dyn SymbolDecoder>,
    options: Arc<ReaderOptions>,
}

impl DecoderAdapter {
    pub fn new(engine: impl SymbolDecoder + 'static) -> Self {
        Self::with_options(engine, ReaderOptions::default())
    }

    pub fn with_options(engine: impl SymbolDecoder + 'static, options: ReaderOptions) -> Self {
        Self {
            engine: Arc::new(engine),
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Decodes the symbols found in `frame`.
    ///
    /// Encoding and decoding run on the blocking thread pool. Returns an
    /// empty list when nothing is recognized; fails only when the frame
    /// cannot be encoded.
    pub async fn decode(&self, frame: Frame) -> Result<Vec<DecodedSymbol>, DecodeError> {
        check_frame(&frame)?;

        let engine = self.engine.clone();
        let options = self.options.clone();
        task::spawn_blocking(move || {
            let image = encode_png(frame)?;
            let symbols = engine.read_barcodes(&image, &options);
            Ok(normalize_symbols(symbols, &options))
        })
        .await
    }
}

/// Checks that the frame has pixels and that its buffer matches its size.
///
/// Returns the size of the buffer, in bytes.
pub fn check_frame(frame: &Frame) -> Result<usize, DecodeError> {
    let (width, height) = (frame.width(), frame.height());
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyFrame { width, height });
    }

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(PIXEL_SIZE))
        .ok_or(DecodeError::FrameTooLarge { width, height })?;
    let actual = frame.pixels().len();
    if expected != actual {
        return Err(DecodeError::BufferSize { expected, actual });
    }

    Ok(expected)
}

/// Encodes an RGBA frame as PNG.
pub fn encode_png(frame: Frame) -> Result<Vec<u8>, DecodeError> {
    let expected = check_frame(&frame)?;

    let (width, height) = (frame.width(), frame.height());
    let actual = frame.pixels().len();
    let image = RgbaImage::from_raw(width, height, frame.into_pixels())
        .ok_or(DecodeError::BufferSize { expected, actual })?;

    let mut bytes = Vec::new();
    let mut cursor = io::Cursor::new(&mut bytes);
    DynamicImage::ImageRgba8(image).write_to(&mut cursor, ImageOutputFormat::Png)?;
    Ok(bytes)
}

/// Drops symbols outside of the format allow-list and caps their number.
fn normalize_symbols(mut symbols: Vec<DecodedSymbol>, options: &ReaderOptions) -> Vec<DecodedSymbol> {
    symbols.retain(|s| options.formats.contains(&s.format));
    symbols.truncate(options.max_number_of_symbols as usize);
    symbols
}
