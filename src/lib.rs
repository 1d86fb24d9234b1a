//! This library reads driver's licenses from their PDF417 barcode.
//!
//! Frames come from a camera sampled at a fixed cadence, or from a single
//! uploaded image. Each frame is handed to an external symbol decoder and the
//! decoded text is parsed into a [`LicenseRecord`] following the AAMVA data
//! element convention.
//!
//! The `demos` folder contains an example parsing a decoded payload.
pub mod aamva;
pub mod decoder;
pub mod frame;
pub mod session;

pub use aamva::{parse, FieldDesignator, LicenseRecord};
pub use decoder::{DecodeError, DecodedSymbol, DecoderAdapter, ReaderOptions, SymbolDecoder};
pub use frame::{AcquisitionError, CameraSource, CaptureDevice, Frame, FrameSource, StillImage};
pub use session::{
    scan_still, ReadPolicy, ScanOutput, Scanner, ScannerConfig, ScannerHandle, SessionController,
    SessionState,
};
